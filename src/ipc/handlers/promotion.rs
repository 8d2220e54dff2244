use crate::decisions::{self, Decision};
use crate::ipc::helpers::{get_optional_str, get_required, get_required_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::promotion::{self, PromotionStatus};
use crate::reports;
use rusqlite::Connection;
use serde_json::json;

fn status_param(params: &serde_json::Value) -> Result<PromotionStatus, HandlerErr> {
    let raw = get_required_str(params, "status")?;
    PromotionStatus::parse(&raw).ok_or_else(|| {
        HandlerErr::bad_params(
            "status must be one of pending, promoted, promoted_probation, repeated, graduated",
        )
    })
}

fn promotion_get(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let year = get_required_str(params, "academicYear")?;
    let record = decisions::get_or_create(conn, &student_id, &year)?;
    Ok(json!({ "record": record }))
}

fn promotion_list(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_id = get_required_str(params, "classId")?;
    let year = get_required_str(params, "academicYear")?;
    let rows = decisions::promotion_list(conn, &class_id, &year)?;
    Ok(json!({ "academicYear": year, "rows": rows }))
}

fn promotion_suggest(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let year = get_required_str(params, "academicYear")?;
    // Validates the student and year before computing anything.
    decisions::get_or_create(conn, &student_id, &year)?;
    let average = reports::yearly_average(conn, &student_id, &year)?;
    Ok(json!({
        "studentId": student_id,
        "academicYear": year,
        "yearlyAverage": average,
        "suggestion": average.map(promotion::suggest),
    }))
}

fn promotion_decide(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_id = get_required_str(params, "studentId")?;
    let year = get_required_str(params, "academicYear")?;
    let status = status_param(params)?;
    let remarks = get_optional_str(params, "remarks");
    let decided_by = get_optional_str(params, "decidedBy");
    let outcome = decisions::execute_decision(
        conn,
        &Decision {
            student_id: &student_id,
            academic_year: &year,
            status,
            remarks: remarks.as_deref(),
            decided_by: decided_by.as_deref(),
        },
    )?;
    Ok(serde_json::to_value(outcome)?)
}

fn promotion_bulk_apply(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student_ids: Vec<String> = get_required(params, "studentIds")?;
    let year = get_required_str(params, "academicYear")?;
    let status = status_param(params)?;
    let remarks = get_optional_str(params, "remarks");
    let decided_by = get_optional_str(params, "decidedBy");
    let out = decisions::bulk_apply(
        conn,
        &student_ids,
        &year,
        status,
        remarks.as_deref(),
        decided_by.as_deref(),
    );
    Ok(serde_json::to_value(out)?)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "promotion.get" => Some(with_db(state, req, promotion_get)),
        "promotion.list" => Some(with_db(state, req, promotion_list)),
        "promotion.suggest" => Some(with_db(state, req, promotion_suggest)),
        "promotion.decide" => Some(with_db(state, req, promotion_decide)),
        "promotion.bulkApply" => Some(with_db(state, req, promotion_bulk_apply)),
        _ => None,
    }
}
