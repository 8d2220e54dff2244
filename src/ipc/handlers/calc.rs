use crate::aggregate::{self, SubjectTotal};
use crate::calc::{self, AssessmentItem};
use crate::grading::{self, Level, SchemeVariant};
use crate::ipc::error::ok;
use crate::ipc::helpers::{get_optional_f64, get_required, get_required_f64, get_required_str, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::settings;
use serde_json::json;

/// An explicit percentage wins; otherwise the workspace split is used, which
/// needs an open workspace.
fn percentage(
    state: &AppState,
    params: &serde_json::Value,
    key: &str,
    pick: fn(&calc::ScoreSplit) -> f64,
) -> Result<f64, HandlerErr> {
    if let Some(p) = get_optional_f64(params, key)? {
        if !(0.0..=100.0).contains(&p) {
            return Err(HandlerErr::bad_params(format!("{} must be between 0 and 100", key)));
        }
        return Ok(p);
    }
    let Some(conn) = state.db.as_ref() else {
        return Err(HandlerErr::new(
            "no_workspace",
            format!("pass {} or select a workspace first", key),
        ));
    };
    Ok(pick(&settings::score_split(conn)?.split))
}

fn class_score(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let items: Vec<AssessmentItem> = get_required(params, "items")?;
    for item in &items {
        calc::validate_max_score(item.max)?;
        calc::validate_raw_score(item.raw, item.max)?;
    }
    let pct = percentage(state, params, "classPercentage", |s| s.class_percentage)?;
    Ok(json!({ "classScore": calc::compute_class_score(&items, pct) }))
}

fn exam_score(state: &AppState, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let raw = get_required_f64(params, "rawScore")?;
    calc::validate_exam_raw(raw)?;
    let pct = percentage(state, params, "examPercentage", |s| s.exam_percentage)?;
    Ok(json!({ "examScore": calc::compute_exam_score(raw, pct) }))
}

fn classify(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let total = get_required_f64(params, "total")?;
    let level_raw = get_required_str(params, "level")?;
    let level = Level::parse(&level_raw)
        .ok_or_else(|| HandlerErr::bad_params("level must be primary or jhs"))?;
    let scheme_raw = get_required_str(params, "scheme")?;
    let scheme = SchemeVariant::parse(&scheme_raw).ok_or_else(|| {
        HandlerErr::bad_params("scheme must be continuous_assessment, proficiency or bece")
    })?;
    Ok(serde_json::to_value(grading::classify(total, level, scheme))?)
}

fn aggregate(params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let subjects: Vec<SubjectTotal> = get_required(params, "subjects")?;
    Ok(serde_json::to_value(aggregate::aggregate(&subjects))?)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let result = match req.method.as_str() {
        "calc.classScore" => class_score(state, &req.params),
        "calc.examScore" => exam_score(state, &req.params),
        "calc.classify" => classify(&req.params),
        "calc.aggregate" => aggregate(&req.params),
        _ => return None,
    };
    Some(match result {
        Ok(v) => ok(&req.id, v),
        Err(e) => e.response(&req.id),
    })
}
