use crate::ipc::helpers::{
    get_optional_f64, get_optional_str, get_required, get_required_str, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::reports;
use crate::settings;
use crate::store::{self, RawEntry};
use rusqlite::Connection;
use serde_json::json;

fn exams_set(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = get_required_str(params, "subjectId")?;
    let entries: Vec<RawEntry> = get_required(params, "entries")?;
    let term_id = get_optional_str(params, "termId");
    let ctx = settings::scoring_context(conn, term_id.as_deref())?;
    let out = store::record_exam_scores(conn, &ctx, &subject_id, &entries)?;
    Ok(serde_json::to_value(out)?)
}

fn scores_upsert(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let subject_id = get_required_str(params, "subjectId")?;
    let class_score = get_optional_f64(params, "classScore")?;
    let exam_score = get_optional_f64(params, "examScore")?;
    let term_id = get_optional_str(params, "termId");
    let ctx = settings::scoring_context(conn, term_id.as_deref())?;
    let stored = store::upsert_score_components(
        conn,
        &ctx,
        &student_id,
        &subject_id,
        class_score,
        exam_score,
    )?;
    Ok(json!({ "score": stored }))
}

fn scores_sheet(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let subject_id = get_required_str(params, "subjectId")?;
    let term_id = get_optional_str(params, "termId");
    let term = settings::resolve_term(conn, term_id.as_deref())?;
    let rows = reports::score_sheet(conn, &class_id, &subject_id, &term.id)?;
    Ok(json!({ "termId": term.id, "rows": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "exams.set" => Some(with_db(state, req, exams_set)),
        "scores.upsert" => Some(with_db(state, req, scores_upsert)),
        "scores.sheet" => Some(with_db(state, req, scores_sheet)),
        _ => None,
    }
}
