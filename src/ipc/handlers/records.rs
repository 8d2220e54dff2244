use crate::ipc::helpers::{get_optional_str, get_required_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::records::{self, RecordsBatch};
use crate::settings;
use rusqlite::Connection;
use serde_json::json;

fn records_sync(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let batch: RecordsBatch = serde_json::from_value(params.clone())?;
    let counts = records::sync(conn, &batch)?;
    Ok(json!({ "synced": counts }))
}

fn terms_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let year = get_optional_str(params, "academicYear");
    let current_id = settings::current_term(conn).ok().map(|t| t.id);
    let terms: Vec<serde_json::Value> = settings::list_terms(conn, year.as_deref())?
        .into_iter()
        .map(|t| {
            json!({
                "isCurrent": current_id.as_deref() == Some(t.id.as_str()),
                "id": t.id,
                "academicYear": t.academic_year,
                "name": t.name,
                "ordering": t.ordering,
            })
        })
        .collect();
    Ok(json!({ "terms": terms }))
}

fn terms_set_current(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let term_id = get_required_str(params, "termId")?;
    let term = settings::set_current_term(conn, &term_id)?;
    Ok(json!({ "currentTerm": term }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "records.sync" => Some(with_db(state, req, records_sync)),
        "terms.list" => Some(with_db(state, req, terms_list)),
        "terms.setCurrent" => Some(with_db(state, req, terms_set_current)),
        _ => None,
    }
}
