//! Reference records owned by the school records system. This side only
//! ingests them (upsert, never delete) and looks them up.

use crate::error::{EngineError, EngineResult};
use crate::grading::Level;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordsBatch {
    pub academic_years: Vec<String>,
    pub terms: Vec<TermInput>,
    pub classes: Vec<ClassInput>,
    pub subjects: Vec<SubjectInput>,
    pub students: Vec<StudentInput>,
    pub class_assignments: Vec<ClassAssignmentInput>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermInput {
    pub id: String,
    pub academic_year: String,
    pub name: String,
    pub ordering: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassInput {
    pub id: String,
    pub name: String,
    pub level: Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectCategory {
    Core,
    Elective,
}

impl SubjectCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Core => "core",
            Self::Elective => "elective",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectInput {
    pub id: String,
    pub name: String,
    pub category: SubjectCategory,
    pub level: Level,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentInput {
    pub id: String,
    pub class_id: String,
    pub last_name: String,
    pub first_name: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAssignmentInput {
    pub student_id: String,
    pub academic_year: String,
    pub class_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCounts {
    pub academic_years: usize,
    pub terms: usize,
    pub classes: usize,
    pub subjects: usize,
    pub students: usize,
    pub class_assignments: usize,
}

/// Upserts a batch in dependency order inside one transaction.
pub fn sync(conn: &Connection, batch: &RecordsBatch) -> EngineResult<SyncCounts> {
    let tx = conn.unchecked_transaction()?;
    let now = chrono::Utc::now().to_rfc3339();
    let mut counts = SyncCounts::default();

    let mut years: Vec<&str> = batch.academic_years.iter().map(String::as_str).collect();
    years.extend(batch.terms.iter().map(|t| t.academic_year.as_str()));
    years.extend(batch.class_assignments.iter().map(|a| a.academic_year.as_str()));
    for name in years {
        if name.trim().is_empty() {
            return Err(EngineError::validation("academicYear", "must not be empty"));
        }
        counts.academic_years += tx.execute(
            "INSERT INTO academic_years(name, created_at) VALUES(?, ?)
             ON CONFLICT(name) DO NOTHING",
            (name, &now),
        )?;
    }

    for t in &batch.terms {
        tx.execute(
            "INSERT INTO terms(id, academic_year, name, ordering) VALUES(?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
               academic_year = excluded.academic_year,
               name = excluded.name,
               ordering = excluded.ordering",
            (&t.id, &t.academic_year, &t.name, t.ordering),
        )?;
        counts.terms += 1;
    }

    for c in &batch.classes {
        tx.execute(
            "INSERT INTO classes(id, name, level) VALUES(?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, level = excluded.level",
            (&c.id, &c.name, c.level.as_str()),
        )?;
        counts.classes += 1;
    }

    for s in &batch.subjects {
        tx.execute(
            "INSERT INTO subjects(id, name, category, level) VALUES(?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
               name = excluded.name,
               category = excluded.category,
               level = excluded.level",
            (&s.id, &s.name, s.category.as_str(), s.level.as_str()),
        )?;
        counts.subjects += 1;
    }

    for s in &batch.students {
        let status = if s.active { "active" } else { "inactive" };
        tx.execute(
            "INSERT INTO students(id, class_id, last_name, first_name, status) VALUES(?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
               class_id = excluded.class_id,
               last_name = excluded.last_name,
               first_name = excluded.first_name,
               status = excluded.status",
            (&s.id, &s.class_id, &s.last_name, &s.first_name, status),
        )?;
        counts.students += 1;
    }

    for a in &batch.class_assignments {
        tx.execute(
            "INSERT INTO class_assignments(student_id, academic_year, class_id) VALUES(?, ?, ?)
             ON CONFLICT(student_id, academic_year) DO UPDATE SET class_id = excluded.class_id",
            (&a.student_id, &a.academic_year, &a.class_id),
        )?;
        counts.class_assignments += 1;
    }

    tx.commit()?;
    tracing::info!(
        terms = counts.terms,
        classes = counts.classes,
        subjects = counts.subjects,
        students = counts.students,
        "records synced"
    );
    Ok(counts)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRef {
    pub id: String,
    pub name: String,
    pub category: String,
    pub level: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassRef {
    pub id: String,
    pub name: String,
    pub level: Level,
}

fn parse_level(s: String) -> Level {
    // The CHECK constraint keeps this to the two known values.
    Level::parse(&s).unwrap_or(Level::Jhs)
}

pub fn subject(conn: &Connection, subject_id: &str) -> EngineResult<SubjectRef> {
    conn.query_row(
        "SELECT id, name, category, level FROM subjects WHERE id = ?",
        [subject_id],
        |r| {
            Ok(SubjectRef {
                id: r.get(0)?,
                name: r.get(1)?,
                category: r.get(2)?,
                level: parse_level(r.get(3)?),
            })
        },
    )
    .optional()?
    .ok_or_else(|| EngineError::not_found("subject", subject_id))
}

pub fn class(conn: &Connection, class_id: &str) -> EngineResult<ClassRef> {
    conn.query_row(
        "SELECT id, name, level FROM classes WHERE id = ?",
        [class_id],
        |r| {
            Ok(ClassRef {
                id: r.get(0)?,
                name: r.get(1)?,
                level: parse_level(r.get(2)?),
            })
        },
    )
    .optional()?
    .ok_or_else(|| EngineError::not_found("class", class_id))
}

pub fn ensure_student(conn: &Connection, student_id: &str) -> EngineResult<()> {
    let exists = conn
        .query_row("SELECT 1 FROM students WHERE id = ?", [student_id], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?
        .is_some();
    if !exists {
        return Err(EngineError::not_found("student", student_id));
    }
    Ok(())
}

pub fn ensure_academic_year(conn: &Connection, year: &str) -> EngineResult<()> {
    let exists = conn
        .query_row("SELECT 1 FROM academic_years WHERE name = ?", [year], |r| {
            r.get::<_, i64>(0)
        })
        .optional()?
        .is_some();
    if !exists {
        return Err(EngineError::not_found("academic year", year));
    }
    Ok(())
}

/// Active students taught in `class_id` during `academic_year`. A year-scoped
/// class assignment overrides the student's home class.
pub const COHORT_CTE: &str = "WITH cohort(student_id) AS (
    SELECT s.id FROM students s
    WHERE s.class_id = :class_id AND s.status = 'active'
      AND NOT EXISTS (
        SELECT 1 FROM class_assignments ca
        WHERE ca.student_id = s.id AND ca.academic_year = :year
      )
    UNION
    SELECT ca.student_id FROM class_assignments ca
    JOIN students s ON s.id = ca.student_id
    WHERE ca.class_id = :class_id AND ca.academic_year = :year AND s.status = 'active'
)";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortStudent {
    pub student_id: String,
    pub display_name: String,
}

pub fn cohort(conn: &Connection, class_id: &str, academic_year: &str) -> EngineResult<Vec<CohortStudent>> {
    let sql = format!(
        "{}
         SELECT s.id, s.last_name, s.first_name
         FROM cohort c JOIN students s ON s.id = c.student_id
         ORDER BY s.last_name, s.first_name, s.id",
        COHORT_CTE
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::named_params! { ":class_id": class_id, ":year": academic_year },
            |r| {
                let last: String = r.get(1)?;
                let first: String = r.get(2)?;
                Ok(CohortStudent {
                    student_id: r.get(0)?,
                    display_name: format!("{}, {}", last, first),
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
