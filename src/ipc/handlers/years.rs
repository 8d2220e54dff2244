use crate::ipc::helpers::{get_required_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::years;
use rusqlite::Connection;
use serde_json::json;

fn years_list(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    Ok(json!({ "years": years::list_years(conn)? }))
}

fn years_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let year = get_required_str(params, "academicYear")?;
    let out = years::delete_academic_year(conn, &year)?;
    Ok(serde_json::to_value(out)?)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "years.list" => Some(with_db(state, req, |conn, _| years_list(conn))),
        "years.delete" => Some(with_db(state, req, years_delete)),
        _ => None,
    }
}
