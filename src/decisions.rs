use crate::error::{EngineError, EngineResult, ItemFailure};
use crate::promotion::{self, PromotionRecord, PromotionStatus};
use crate::records;
use crate::reports;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

fn load_record(
    conn: &Connection,
    student_id: &str,
    academic_year: &str,
) -> EngineResult<Option<PromotionRecord>> {
    let row: Option<(String, Option<String>, Option<String>, Option<String>)> = conn
        .query_row(
            "SELECT status, remarks, decided_by, decided_at
             FROM promotion_records
             WHERE student_id = ? AND academic_year = ?",
            (student_id, academic_year),
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )
        .optional()?;
    let Some((status, remarks, decided_by, decided_at)) = row else {
        return Ok(None);
    };
    let status = PromotionStatus::parse(&status).ok_or_else(|| {
        EngineError::validation("status", format!("unknown stored status: {}", status))
    })?;
    Ok(Some(PromotionRecord {
        student_id: student_id.to_string(),
        academic_year: academic_year.to_string(),
        status,
        remarks,
        decided_by,
        decided_at,
        persisted: true,
    }))
}

/// The stored record, or a transient pending one. Never writes.
pub fn get_or_create(
    conn: &Connection,
    student_id: &str,
    academic_year: &str,
) -> EngineResult<PromotionRecord> {
    records::ensure_student(conn, student_id)?;
    records::ensure_academic_year(conn, academic_year)?;
    Ok(load_record(conn, student_id, academic_year)?
        .unwrap_or_else(|| PromotionRecord::pending(student_id, academic_year)))
}

#[derive(Debug, Clone)]
pub struct Decision<'a> {
    pub student_id: &'a str,
    pub academic_year: &'a str,
    pub status: PromotionStatus,
    pub remarks: Option<&'a str>,
    pub decided_by: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionOutcome {
    pub record: PromotionRecord,
    /// Transient pending record for the following year when the decision
    /// carries the student forward.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_year: Option<PromotionRecord>,
}

/// Insert-or-update keyed on (student, academic year). Repeating the same
/// decision leaves the same record; a different decision overrides it.
pub fn execute_decision(conn: &Connection, d: &Decision<'_>) -> EngineResult<DecisionOutcome> {
    records::ensure_student(conn, d.student_id)?;
    records::ensure_academic_year(conn, d.academic_year)?;

    let tx = conn.unchecked_transaction()?;
    let current = load_record(&tx, d.student_id, d.academic_year)?
        .map(|r| r.status)
        .unwrap_or(PromotionStatus::Pending);
    current.check_transition(d.status)?;

    let decided_at = chrono::Utc::now().to_rfc3339();
    tx.execute(
        "INSERT INTO promotion_records(student_id, academic_year, status, remarks, decided_by, decided_at)
         VALUES(?, ?, ?, ?, ?, ?)
         ON CONFLICT(student_id, academic_year) DO UPDATE SET
           status = excluded.status,
           remarks = excluded.remarks,
           decided_by = excluded.decided_by,
           decided_at = excluded.decided_at",
        (
            d.student_id,
            d.academic_year,
            d.status.as_str(),
            d.remarks,
            d.decided_by,
            &decided_at,
        ),
    )?;
    tx.commit()?;
    tracing::info!(
        student = d.student_id,
        year = d.academic_year,
        from = current.as_str(),
        to = d.status.as_str(),
        "promotion decided"
    );

    let next_year = if d.status.opens_next_year() {
        promotion::next_academic_year(d.academic_year)
            .map(|y| PromotionRecord::pending(d.student_id, y))
    } else {
        None
    };
    Ok(DecisionOutcome {
        record: PromotionRecord {
            student_id: d.student_id.to_string(),
            academic_year: d.academic_year.to_string(),
            status: d.status,
            remarks: d.remarks.map(str::to_string),
            decided_by: d.decided_by.map(str::to_string),
            decided_at: Some(decided_at),
            persisted: true,
        },
        next_year,
    })
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkOutcome {
    pub applied: Vec<DecisionOutcome>,
    pub failed: Vec<ItemFailure>,
}

/// One independent decision per student. A failed student is reported and
/// the rest still go through.
pub fn bulk_apply(
    conn: &Connection,
    student_ids: &[String],
    academic_year: &str,
    status: PromotionStatus,
    remarks: Option<&str>,
    decided_by: Option<&str>,
) -> BulkOutcome {
    let mut out = BulkOutcome::default();
    for sid in student_ids {
        let d = Decision {
            student_id: sid,
            academic_year,
            status,
            remarks,
            decided_by,
        };
        match execute_decision(conn, &d) {
            Ok(o) => out.applied.push(o),
            Err(e) => {
                tracing::warn!(student = %sid, error = %e, "bulk decision failed");
                out.failed.push(ItemFailure::new(sid.as_str(), &e));
            }
        }
    }
    tracing::info!(
        year = academic_year,
        status = status.as_str(),
        applied = out.applied.len(),
        failed = out.failed.len(),
        "bulk promotion applied"
    );
    out
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRow {
    pub student_id: String,
    pub display_name: String,
    pub record: PromotionRecord,
    pub yearly_average: Option<f64>,
    /// Advisory only; absent when the student has no scores for the year.
    pub suggestion: Option<PromotionStatus>,
}

pub fn promotion_list(
    conn: &Connection,
    class_id: &str,
    academic_year: &str,
) -> EngineResult<Vec<PromotionRow>> {
    records::class(conn, class_id)?;
    records::ensure_academic_year(conn, academic_year)?;
    let mut rows = Vec::new();
    for s in records::cohort(conn, class_id, academic_year)? {
        let record = load_record(conn, &s.student_id, academic_year)?
            .unwrap_or_else(|| PromotionRecord::pending(s.student_id.clone(), academic_year));
        let yearly_average = reports::yearly_average(conn, &s.student_id, academic_year)?;
        rows.push(PromotionRow {
            suggestion: yearly_average.map(promotion::suggest),
            student_id: s.student_id,
            display_name: s.display_name,
            record,
            yearly_average,
        });
    }
    Ok(rows)
}
