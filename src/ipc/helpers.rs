use crate::error::EngineError;
use crate::ipc::error::{engine_err, err, ok};
use crate::ipc::types::{AppState, Request};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
    engine: Option<EngineError>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
            engine: None,
        }
    }

    pub fn bad_params(message: impl Into<String>) -> Self {
        Self::new("bad_params", message)
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        match self.engine {
            Some(e) => engine_err(id, &e),
            None => err(id, self.code, self.message, self.details),
        }
    }
}

impl From<EngineError> for HandlerErr {
    fn from(e: EngineError) -> Self {
        Self {
            code: e.code(),
            message: e.to_string(),
            details: e.details(),
            engine: Some(e),
        }
    }
}

impl From<rusqlite::Error> for HandlerErr {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::from(e).into()
    }
}

impl From<serde_json::Error> for HandlerErr {
    fn from(e: serde_json::Error) -> Self {
        Self::bad_params(e.to_string())
    }
}

/// Runs `f` against the open workspace database and wraps the outcome.
pub fn with_db<F>(state: &AppState, req: &Request, f: F) -> serde_json::Value
where
    F: FnOnce(&Connection, &serde_json::Value) -> Result<serde_json::Value, HandlerErr>,
{
    let Some(conn) = state.db.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    match f(conn, &req.params) {
        Ok(result) => ok(&req.id, result),
        Err(e) => {
            tracing::debug!(method = %req.method, code = e.code, message = %e.message, "request failed");
            e.response(&req.id)
        }
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    match params.get(key).and_then(|v| v.as_str()) {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(HandlerErr {
            code: "bad_params",
            message: format!("missing {}", key),
            details: Some(json!({ "field": key })),
            engine: None,
        }),
    }
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub fn get_required_f64(params: &serde_json::Value, key: &str) -> Result<f64, HandlerErr> {
    get_optional_f64(params, key)?.ok_or_else(|| HandlerErr {
        code: "bad_params",
        message: format!("missing {}", key),
        details: Some(json!({ "field": key })),
        engine: None,
    })
}

pub fn get_optional_f64(params: &serde_json::Value, key: &str) -> Result<Option<f64>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v.as_f64().map(Some).ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: format!("{} must be a number", key),
            details: Some(json!({ "field": key })),
            engine: None,
        }),
    }
}

pub fn get_required<T: DeserializeOwned>(
    params: &serde_json::Value,
    key: &str,
) -> Result<T, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Err(HandlerErr {
            code: "bad_params",
            message: format!("missing {}", key),
            details: Some(json!({ "field": key })),
            engine: None,
        });
    };
    serde_json::from_value(v.clone()).map_err(|e| HandlerErr {
        code: "bad_params",
        message: format!("{}: {}", key, e),
        details: Some(json!({ "field": key })),
        engine: None,
    })
}
