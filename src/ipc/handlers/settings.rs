use crate::calc::ScoreSplit;
use crate::db;
use crate::error::EngineError;
use crate::ipc::helpers::{get_optional_f64, get_optional_str, with_db, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::settings::{self, TeachingModel};
use rusqlite::Connection;
use serde_json::json;

fn settings_snapshot(conn: &Connection) -> Result<serde_json::Value, HandlerErr> {
    let allow_default = settings::allow_default_split(conn)?;
    // A stored split that cannot be used is reported, not replaced, so the
    // settings stay readable until settings.update repairs it.
    let (split, split_error) = match settings::score_split(conn) {
        Ok(s) => (
            json!({
                "classScorePercentage": s.split.class_percentage,
                "examScorePercentage": s.split.exam_percentage,
                "isDefault": s.is_default,
            }),
            serde_json::Value::Null,
        ),
        Err(EngineError::ConfigMissing { .. }) => (serde_json::Value::Null, serde_json::Value::Null),
        Err(e @ EngineError::Validation { .. }) => (
            serde_json::Value::Null,
            json!({ "code": e.code(), "message": e.to_string() }),
        ),
        Err(e) => return Err(e.into()),
    };
    let current_term = match settings::current_term(conn) {
        Ok(t) => serde_json::to_value(t)?,
        Err(EngineError::ConfigMissing { .. }) => serde_json::Value::Null,
        Err(e) => return Err(e.into()),
    };
    Ok(json!({
        "split": split,
        "splitError": split_error,
        "allowDefaultSplit": allow_default,
        "teachingModel": settings::teaching_model(conn)?.as_str(),
        "currentTerm": current_term,
    }))
}

fn settings_update(conn: &Connection, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let class_pct = get_optional_f64(params, "classScorePercentage")?;
    let exam_pct = get_optional_f64(params, "examScorePercentage")?;
    let split = match (class_pct, exam_pct) {
        (Some(c), Some(e)) => Some(ScoreSplit::new(c, e)?),
        (None, None) => None,
        _ => {
            return Err(HandlerErr::bad_params(
                "classScorePercentage and examScorePercentage must be set together",
            ))
        }
    };
    let teaching_model = match get_optional_str(params, "teachingModel") {
        Some(s) => Some(TeachingModel::parse(&s).ok_or_else(|| {
            HandlerErr::bad_params("teachingModel must be class_teacher or subject_teacher")
        })?),
        None => None,
    };
    let allow_default = match params.get("allowDefaultSplit") {
        None => None,
        Some(v) => Some(
            v.as_bool()
                .ok_or_else(|| HandlerErr::bad_params("allowDefaultSplit must be a boolean"))?,
        ),
    };
    let current_term_id = get_optional_str(params, "currentTermId");

    // Validate everything above, then write in one transaction.
    let tx = conn.unchecked_transaction()?;
    let mut rescaled = 0;
    if let Some(split) = split {
        rescaled = settings::set_score_split(&tx, split)?;
    }
    if let Some(model) = teaching_model {
        db::settings_set_json(&tx, settings::KEY_TEACHING_MODEL, &json!(model.as_str()))?;
    }
    if let Some(flag) = allow_default {
        db::settings_set_json(&tx, settings::KEY_ALLOW_DEFAULT_SPLIT, &json!(flag))?;
    }
    if let Some(term_id) = current_term_id {
        settings::set_current_term(&tx, &term_id)?;
    }
    tx.commit()?;
    let mut snapshot = settings_snapshot(conn)?;
    snapshot["rescaledScores"] = json!(rescaled);
    Ok(snapshot)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "settings.get" => Some(with_db(state, req, |conn, _| settings_snapshot(conn))),
        "settings.update" => Some(with_db(state, req, settings_update)),
        _ => None,
    }
}
