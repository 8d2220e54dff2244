use crate::db;
use crate::error::{EngineError, EngineResult};
use crate::records;
use crate::settings;
use rusqlite::Connection;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
    pub name: String,
    pub term_count: i64,
    pub decided_count: i64,
}

pub fn list_years(conn: &Connection) -> EngineResult<Vec<YearSummary>> {
    let mut stmt = conn.prepare(
        "SELECT y.name,
                (SELECT COUNT(*) FROM terms t WHERE t.academic_year = y.name),
                (SELECT COUNT(*) FROM promotion_records p WHERE p.academic_year = y.name)
         FROM academic_years y
         ORDER BY y.name",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(YearSummary {
                name: r.get(0)?,
                term_count: r.get(1)?,
                decided_count: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearDeletion {
    pub academic_year: String,
    pub assessment_scores: usize,
    pub scores: usize,
    pub assessments: usize,
    pub terms: usize,
    pub promotion_records: usize,
    pub class_assignments: usize,
    pub cleared_current_term: bool,
}

const TERMS_OF_YEAR: &str = "SELECT id FROM terms WHERE academic_year = ?1";

/// Removes an academic year with everything scoped to it. The whole cascade
/// is one transaction: if any step fails nothing is removed.
pub fn delete_academic_year(conn: &Connection, academic_year: &str) -> EngineResult<YearDeletion> {
    records::ensure_academic_year(conn, academic_year)?;
    let current = settings::current_term(conn).ok();

    let tx = conn.unchecked_transaction()?;
    let mut out = YearDeletion {
        academic_year: academic_year.to_string(),
        ..YearDeletion::default()
    };

    out.assessment_scores = tx.execute(
        &format!(
            "DELETE FROM assessment_scores WHERE assessment_id IN (
               SELECT id FROM assessments WHERE term_id IN ({})
             )",
            TERMS_OF_YEAR
        ),
        [academic_year],
    )?;
    out.scores = tx.execute(
        &format!("DELETE FROM scores WHERE term_id IN ({})", TERMS_OF_YEAR),
        [academic_year],
    )?;
    out.assessments = tx.execute(
        &format!("DELETE FROM assessments WHERE term_id IN ({})", TERMS_OF_YEAR),
        [academic_year],
    )?;
    out.promotion_records = tx.execute(
        "DELETE FROM promotion_records WHERE academic_year = ?1",
        [academic_year],
    )?;
    out.class_assignments = tx.execute(
        "DELETE FROM class_assignments WHERE academic_year = ?1",
        [academic_year],
    )?;
    out.terms = tx.execute("DELETE FROM terms WHERE academic_year = ?1", [academic_year])?;

    if current.as_ref().map(|t| t.academic_year.as_str()) == Some(academic_year) {
        db::settings_delete(&tx, settings::KEY_CURRENT_TERM)?;
        out.cleared_current_term = true;
    }

    let removed = tx.execute("DELETE FROM academic_years WHERE name = ?1", [academic_year])?;
    if removed != 1 {
        // Dropping the transaction rolls the cascade back.
        return Err(EngineError::not_found("academic year", academic_year));
    }
    tx.commit()?;

    tracing::info!(
        year = academic_year,
        terms = out.terms,
        scores = out.scores,
        assessments = out.assessments,
        promotion_records = out.promotion_records,
        "academic year deleted"
    );
    Ok(out)
}
