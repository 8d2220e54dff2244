use crate::calc::ScoreSplit;
use crate::db;
use crate::error::{EngineError, EngineResult};
use crate::store;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use serde_json::json;

pub const KEY_SPLIT: &str = "scoring.split";
pub const KEY_ALLOW_DEFAULT_SPLIT: &str = "scoring.allowDefaultSplit";
pub const KEY_CURRENT_TERM: &str = "terms.current";
pub const KEY_TEACHING_MODEL: &str = "teaching.model";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeachingModel {
    ClassTeacher,
    SubjectTeacher,
}

impl TeachingModel {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "class_teacher" => Some(Self::ClassTeacher),
            "subject_teacher" => Some(Self::SubjectTeacher),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClassTeacher => "class_teacher",
            Self::SubjectTeacher => "subject_teacher",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TermRef {
    pub id: String,
    pub academic_year: String,
    pub name: String,
    pub ordering: i64,
}

/// Everything a score write needs to know about its surroundings, resolved
/// once per call and passed explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringContext {
    pub term: TermRef,
    pub split: ScoreSplit,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedSplit {
    pub split: ScoreSplit,
    pub is_default: bool,
}

pub fn allow_default_split(conn: &Connection) -> EngineResult<bool> {
    Ok(db::settings_get_json(conn, KEY_ALLOW_DEFAULT_SPLIT)?
        .and_then(|v| v.as_bool())
        .unwrap_or(true))
}

/// The configured split. A stored value that does not parse or validate is an
/// error naming the key; only an absent value may fall back to 40/60.
pub fn score_split(conn: &Connection) -> EngineResult<ResolvedSplit> {
    match db::settings_get_json(conn, KEY_SPLIT)? {
        Some(v) => {
            let split: ScoreSplit = serde_json::from_value(v).map_err(|e| {
                EngineError::validation(KEY_SPLIT, format!("stored value is unreadable: {}", e))
            })?;
            split.validate().map_err(|e| {
                EngineError::validation(KEY_SPLIT, format!("stored value is invalid: {}", e))
            })?;
            Ok(ResolvedSplit {
                split,
                is_default: false,
            })
        }
        None if allow_default_split(conn)? => Ok(ResolvedSplit {
            split: ScoreSplit::default(),
            is_default: true,
        }),
        None => Err(EngineError::ConfigMissing { key: KEY_SPLIT }),
    }
}

/// Stores a new split and moves every existing Score onto it. Joins the
/// caller's transaction when one is open, otherwise opens its own. Returns
/// the number of Score rows rewritten.
pub fn set_score_split(conn: &Connection, split: ScoreSplit) -> EngineResult<usize> {
    split.validate()?;
    let previous = match score_split(conn) {
        Ok(r) => Some(r.split),
        Err(EngineError::Storage(e)) => return Err(e.into()),
        Err(_) => None,
    };
    let own_tx = if conn.is_autocommit() {
        Some(conn.unchecked_transaction()?)
    } else {
        None
    };
    db::settings_set_json(
        conn,
        KEY_SPLIT,
        &json!({
            "classScorePercentage": split.class_percentage,
            "examScorePercentage": split.exam_percentage,
        }),
    )?;
    let rescaled = if previous == Some(split) {
        0
    } else {
        store::rescale_scores(conn, previous.as_ref(), &split)?
    };
    if let Some(tx) = own_tx {
        tx.commit()?;
    }
    tracing::info!(
        class = split.class_percentage,
        exam = split.exam_percentage,
        rescaled,
        "score split updated"
    );
    Ok(rescaled)
}

pub fn teaching_model(conn: &Connection) -> EngineResult<TeachingModel> {
    Ok(db::settings_get_json(conn, KEY_TEACHING_MODEL)?
        .and_then(|v| v.as_str().and_then(TeachingModel::parse))
        .unwrap_or(TeachingModel::ClassTeacher))
}

pub fn find_term(conn: &Connection, term_id: &str) -> EngineResult<Option<TermRef>> {
    Ok(conn
        .query_row(
            "SELECT id, academic_year, name, ordering FROM terms WHERE id = ?",
            [term_id],
            |r| {
                Ok(TermRef {
                    id: r.get(0)?,
                    academic_year: r.get(1)?,
                    name: r.get(2)?,
                    ordering: r.get(3)?,
                })
            },
        )
        .optional()?)
}

pub fn term(conn: &Connection, term_id: &str) -> EngineResult<TermRef> {
    find_term(conn, term_id)?.ok_or_else(|| EngineError::not_found("term", term_id))
}

pub fn list_terms(conn: &Connection, academic_year: Option<&str>) -> EngineResult<Vec<TermRef>> {
    let mut stmt = conn.prepare(
        "SELECT id, academic_year, name, ordering
         FROM terms
         WHERE (?1 IS NULL OR academic_year = ?1)
         ORDER BY academic_year, ordering",
    )?;
    let rows = stmt
        .query_map([academic_year], |r| {
            Ok(TermRef {
                id: r.get(0)?,
                academic_year: r.get(1)?,
                name: r.get(2)?,
                ordering: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The single current term. A pointer to a deleted term counts as missing.
pub fn current_term(conn: &Connection) -> EngineResult<TermRef> {
    let term_id = db::settings_get_json(conn, KEY_CURRENT_TERM)?
        .and_then(|v| v.get("termId").and_then(|t| t.as_str()).map(str::to_string));
    let Some(term_id) = term_id else {
        return Err(EngineError::ConfigMissing {
            key: KEY_CURRENT_TERM,
        });
    };
    find_term(conn, &term_id)?.ok_or(EngineError::ConfigMissing {
        key: KEY_CURRENT_TERM,
    })
}

pub fn set_current_term(conn: &Connection, term_id: &str) -> EngineResult<TermRef> {
    let t = term(conn, term_id)?;
    db::settings_set_json(conn, KEY_CURRENT_TERM, &json!({ "termId": t.id }))?;
    tracing::info!(term = %t.id, year = %t.academic_year, "current term moved");
    Ok(t)
}

/// Uses `term_id` when given, otherwise the current-term pointer.
pub fn resolve_term(conn: &Connection, term_id: Option<&str>) -> EngineResult<TermRef> {
    match term_id {
        Some(id) => term(conn, id),
        None => current_term(conn),
    }
}

pub fn scoring_context(conn: &Connection, term_id: Option<&str>) -> EngineResult<ScoringContext> {
    Ok(ScoringContext {
        term: resolve_term(conn, term_id)?,
        split: score_split(conn)?.split,
    })
}
