use serde::Serialize;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("configuration missing: {key}")]
    ConfigMissing { key: &'static str },

    #[error("cannot move promotion status from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error(transparent)]
    Storage(#[from] rusqlite::Error),
}

impl EngineError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Stable wire code for IPC responses.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "bad_params",
            Self::NotFound { .. } => "not_found",
            Self::ConfigMissing { .. } => "config_missing",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::Storage(_) => "db_query_failed",
        }
    }

    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation { field, .. } => Some(json!({ "field": field })),
            Self::NotFound { entity, id } => Some(json!({ "entity": entity, "id": id })),
            Self::ConfigMissing { key } => Some(json!({ "key": key })),
            Self::InvalidTransition { from, to } => Some(json!({ "from": from, "to": to })),
            Self::Storage(_) => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// One failed item of a batch whose other items went through.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub student_id: String,
    pub code: &'static str,
    pub message: String,
}

impl ItemFailure {
    pub fn new(student_id: impl Into<String>, error: &EngineError) -> Self {
        Self {
            student_id: student_id.into(),
            code: error.code(),
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(EngineError::validation("raw", "too big").code(), "bad_params");
        assert_eq!(EngineError::not_found("student", "s1").code(), "not_found");
        assert_eq!(
            EngineError::ConfigMissing { key: "terms.current" }.code(),
            "config_missing"
        );
        assert_eq!(
            EngineError::Storage(rusqlite::Error::QueryReturnedNoRows).code(),
            "db_query_failed"
        );
    }

    #[test]
    fn not_found_message_names_entity() {
        let e = EngineError::not_found("academic year", "2030/2031");
        assert_eq!(e.to_string(), "academic year not found: 2030/2031");
        assert_eq!(e.details(), Some(json!({ "entity": "academic year", "id": "2030/2031" })));
    }
}
