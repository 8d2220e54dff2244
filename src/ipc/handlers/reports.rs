use crate::ipc::helpers::{get_optional_str, get_required_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::records;
use crate::reports;
use crate::settings::{self, TermRef};
use rusqlite::Connection;
use serde_json::json;

fn class_and_term(
    conn: &Connection,
    params: &serde_json::Value,
) -> Result<(String, TermRef), HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    records::class(conn, &class_id)?;
    let term_id = get_optional_str(params, "termId");
    let term = settings::resolve_term(conn, term_id.as_deref())?;
    Ok((class_id, term))
}

fn subject_ranking(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (class_id, term) = class_and_term(conn, params)?;
    let subject_id = get_required_str(params, "subjectId")?;
    let rows = reports::subject_ranking(conn, &class_id, &subject_id, &term.id)?;
    Ok(json!({ "term": term, "rows": rows }))
}

fn class_positions(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (class_id, term) = class_and_term(conn, params)?;
    let rows = reports::class_positions(conn, &class_id, &term.id)?;
    Ok(json!({ "term": term, "rows": rows }))
}

fn aggregates(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let (class_id, term) = class_and_term(conn, params)?;
    let rows = reports::class_aggregates(conn, &class_id, &term.id)?;
    Ok(json!({ "term": term, "rows": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.subjectRanking" => Some(with_db(state, req, subject_ranking)),
        "reports.classPositions" => Some(with_db(state, req, class_positions)),
        "reports.aggregates" => Some(with_db(state, req, aggregates)),
        _ => None,
    }
}
