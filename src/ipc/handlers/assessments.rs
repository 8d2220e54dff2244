use crate::ipc::helpers::{
    get_optional_str, get_required, get_required_f64, get_required_str, with_db, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::settings;
use crate::store::{self, RawEntry};
use rusqlite::Connection;
use serde_json::json;

fn assessments_create(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = get_required_str(params, "subjectId")?;
    let class_id = get_required_str(params, "classId")?;
    let title = get_required_str(params, "title")?;
    let max_score = get_required_f64(params, "maxScore")?;
    let term_id = get_optional_str(params, "termId");
    let ctx = settings::scoring_context(conn, term_id.as_deref())?;
    let a = store::create_assessment(conn, &ctx, &subject_id, &class_id, &title, max_score)?;
    Ok(json!({ "assessment": a }))
}

fn assessments_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let subject_id = get_required_str(params, "subjectId")?;
    let class_id = get_required_str(params, "classId")?;
    let term_id = get_optional_str(params, "termId");
    let term = settings::resolve_term(conn, term_id.as_deref())?;
    let rows = store::list_assessments(conn, &subject_id, &class_id, &term.id)?;
    Ok(json!({ "termId": term.id, "assessments": rows }))
}

fn assessments_delete(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let assessment_id = get_required_str(params, "assessmentId")?;
    let split = settings::score_split(conn)?.split;
    let out = store::delete_assessment(conn, &split, &assessment_id)?;
    Ok(serde_json::to_value(out)?)
}

fn assessment_scores_set(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let assessment_id = get_required_str(params, "assessmentId")?;
    let entries: Vec<RawEntry> = get_required(params, "entries")?;
    let split = settings::score_split(conn)?.split;
    let out = store::record_assessment_scores(conn, &split, &assessment_id, &entries)?;
    Ok(serde_json::to_value(out)?)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "assessments.create" => Some(with_db(state, req, assessments_create)),
        "assessments.list" => Some(with_db(state, req, assessments_list)),
        "assessments.delete" => Some(with_db(state, req, assessments_delete)),
        "assessmentScores.set" => Some(with_db(state, req, assessment_scores_set)),
        _ => None,
    }
}
