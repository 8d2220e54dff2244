//! Score write paths. Every write re-derives `total` and the stored grade in
//! the same transaction as the component it changes, and leaves the other
//! component as it was.

use crate::calc::{self, AssessmentItem, ScoreComponents, ScoreSplit};
use crate::error::{EngineError, EngineResult, ItemFailure};
use crate::grading::GradingScheme;
use crate::records;
use crate::settings::ScoringContext;
use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    pub id: String,
    pub subject_id: String,
    pub class_id: String,
    pub term_id: String,
    pub title: String,
    pub max_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredScore {
    pub student_id: String,
    pub subject_id: String,
    pub term_id: String,
    pub class_score: f64,
    pub exam_score: f64,
    pub total: f64,
    pub grade: Option<String>,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEntry {
    pub student_id: String,
    pub raw_score: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkScoreOutcome {
    pub scores: Vec<StoredScore>,
    pub failed: Vec<ItemFailure>,
}

pub fn create_assessment(
    conn: &Connection,
    ctx: &ScoringContext,
    subject_id: &str,
    class_id: &str,
    title: &str,
    max_score: f64,
) -> EngineResult<Assessment> {
    calc::validate_max_score(max_score)?;
    if title.trim().is_empty() {
        return Err(EngineError::validation("title", "must not be empty"));
    }
    records::subject(conn, subject_id)?;
    records::class(conn, class_id)?;

    let a = Assessment {
        id: Uuid::new_v4().to_string(),
        subject_id: subject_id.to_string(),
        class_id: class_id.to_string(),
        term_id: ctx.term.id.clone(),
        title: title.trim().to_string(),
        max_score,
    };
    conn.execute(
        "INSERT INTO assessments(id, subject_id, class_id, term_id, title, max_score, created_at)
         VALUES(?, ?, ?, ?, ?, ?, ?)",
        (
            &a.id,
            &a.subject_id,
            &a.class_id,
            &a.term_id,
            &a.title,
            a.max_score,
            chrono::Utc::now().to_rfc3339(),
        ),
    )?;
    tracing::info!(assessment = %a.id, subject = subject_id, class = class_id, term = %a.term_id, "assessment created");
    Ok(a)
}

pub fn assessment(conn: &Connection, assessment_id: &str) -> EngineResult<Assessment> {
    conn.query_row(
        "SELECT id, subject_id, class_id, term_id, title, max_score FROM assessments WHERE id = ?",
        [assessment_id],
        |r| {
            Ok(Assessment {
                id: r.get(0)?,
                subject_id: r.get(1)?,
                class_id: r.get(2)?,
                term_id: r.get(3)?,
                title: r.get(4)?,
                max_score: r.get(5)?,
            })
        },
    )
    .optional()?
    .ok_or_else(|| EngineError::not_found("assessment", assessment_id))
}

pub fn list_assessments(
    conn: &Connection,
    subject_id: &str,
    class_id: &str,
    term_id: &str,
) -> EngineResult<Vec<Assessment>> {
    let mut stmt = conn.prepare(
        "SELECT id, subject_id, class_id, term_id, title, max_score
         FROM assessments
         WHERE subject_id = ? AND class_id = ? AND term_id = ?
         ORDER BY created_at, id",
    )?;
    let rows = stmt
        .query_map((subject_id, class_id, term_id), |r| {
            Ok(Assessment {
                id: r.get(0)?,
                subject_id: r.get(1)?,
                class_id: r.get(2)?,
                term_id: r.get(3)?,
                title: r.get(4)?,
                max_score: r.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn load_score(
    conn: &Connection,
    student_id: &str,
    subject_id: &str,
    term_id: &str,
) -> EngineResult<Option<StoredScore>> {
    Ok(conn
        .query_row(
            "SELECT class_score, exam_score, total, grade, remarks
             FROM scores
             WHERE student_id = ? AND subject_id = ? AND term_id = ?",
            (student_id, subject_id, term_id),
            |r| {
                Ok(StoredScore {
                    student_id: student_id.to_string(),
                    subject_id: subject_id.to_string(),
                    term_id: term_id.to_string(),
                    class_score: r.get(0)?,
                    exam_score: r.get(1)?,
                    total: r.get(2)?,
                    grade: r.get(3)?,
                    remarks: r.get(4)?,
                })
            },
        )
        .optional()?)
}

fn existing_components(
    conn: &Connection,
    student_id: &str,
    subject_id: &str,
    term_id: &str,
) -> EngineResult<ScoreComponents> {
    Ok(load_score(conn, student_id, subject_id, term_id)?
        .map(|s| ScoreComponents::new(s.class_score, s.exam_score))
        .unwrap_or_default())
}

/// Insert-or-update of one Score row with its grade re-derived from `total`.
fn write_score(
    conn: &Connection,
    split: &ScoreSplit,
    student_id: &str,
    subject_id: &str,
    term_id: &str,
    components: ScoreComponents,
) -> EngineResult<StoredScore> {
    components.check_within(split)?;
    let subject = records::subject(conn, subject_id)?;
    let grade = GradingScheme::proficiency(subject.level).classify(components.total);
    conn.execute(
        "INSERT INTO scores(id, student_id, subject_id, term_id, class_score, exam_score, total, grade, remarks, updated_at)
         VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(student_id, subject_id, term_id) DO UPDATE SET
           class_score = excluded.class_score,
           exam_score = excluded.exam_score,
           total = excluded.total,
           grade = excluded.grade,
           remarks = excluded.remarks,
           updated_at = excluded.updated_at",
        (
            Uuid::new_v4().to_string(),
            student_id,
            subject_id,
            term_id,
            components.class_score,
            components.exam_score,
            components.total,
            grade.grade,
            grade.remark,
            chrono::Utc::now().to_rfc3339(),
        ),
    )?;
    Ok(StoredScore {
        student_id: student_id.to_string(),
        subject_id: subject_id.to_string(),
        term_id: term_id.to_string(),
        class_score: components.class_score,
        exam_score: components.exam_score,
        total: components.total,
        grade: Some(grade.grade.to_string()),
        remarks: Some(grade.remark.to_string()),
    })
}

/// Re-derives a student's class score from every assessment mark they hold
/// in the subject+class+term scope.
fn recompute_class_score(
    conn: &Connection,
    split: &ScoreSplit,
    student_id: &str,
    subject_id: &str,
    class_id: &str,
    term_id: &str,
) -> EngineResult<StoredScore> {
    let mut stmt = conn.prepare(
        "SELECT s.raw_score, a.max_score
         FROM assessment_scores s
         JOIN assessments a ON a.id = s.assessment_id
         WHERE s.student_id = ? AND a.subject_id = ? AND a.class_id = ? AND a.term_id = ?",
    )?;
    let items = stmt
        .query_map((student_id, subject_id, class_id, term_id), |r| {
            Ok(AssessmentItem {
                raw: r.get(0)?,
                max: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    let class_score = calc::compute_class_score(&items, split.class_percentage);
    let components =
        existing_components(conn, student_id, subject_id, term_id)?.with_class_score(class_score);
    write_score(conn, split, student_id, subject_id, term_id, components)
}

pub fn record_assessment_score(
    conn: &Connection,
    split: &ScoreSplit,
    assessment_id: &str,
    student_id: &str,
    raw_score: f64,
) -> EngineResult<StoredScore> {
    let a = assessment(conn, assessment_id)?;
    calc::validate_raw_score(raw_score, a.max_score)?;
    records::ensure_student(conn, student_id)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "INSERT INTO assessment_scores(assessment_id, student_id, raw_score) VALUES(?, ?, ?)
         ON CONFLICT(assessment_id, student_id) DO UPDATE SET raw_score = excluded.raw_score",
        (&a.id, student_id, raw_score),
    )?;
    let stored = recompute_class_score(
        &tx,
        split,
        student_id,
        &a.subject_id,
        &a.class_id,
        &a.term_id,
    )?;
    tx.commit()?;
    tracing::info!(
        student = student_id,
        subject = %a.subject_id,
        term = %a.term_id,
        class_score = stored.class_score,
        total = stored.total,
        "class score recomputed"
    );
    Ok(stored)
}

/// Writes each entry on its own; one bad entry does not stop the rest.
pub fn record_assessment_scores(
    conn: &Connection,
    split: &ScoreSplit,
    assessment_id: &str,
    entries: &[RawEntry],
) -> EngineResult<BulkScoreOutcome> {
    assessment(conn, assessment_id)?;
    let mut out = BulkScoreOutcome::default();
    for e in entries {
        match record_assessment_score(conn, split, assessment_id, &e.student_id, e.raw_score) {
            Ok(s) => out.scores.push(s),
            Err(EngineError::Storage(err)) => return Err(EngineError::Storage(err)),
            Err(err) => {
                tracing::debug!(student = %e.student_id, error = %err, "assessment score rejected");
                out.failed.push(ItemFailure::new(&e.student_id, &err));
            }
        }
    }
    Ok(out)
}

pub fn record_exam_score(
    conn: &Connection,
    ctx: &ScoringContext,
    student_id: &str,
    subject_id: &str,
    raw_out_of_100: f64,
) -> EngineResult<StoredScore> {
    calc::validate_exam_raw(raw_out_of_100)?;
    records::subject(conn, subject_id)?;
    records::ensure_student(conn, student_id)?;

    let exam_score = calc::compute_exam_score(raw_out_of_100, ctx.split.exam_percentage);
    let tx = conn.unchecked_transaction()?;
    let components =
        existing_components(&tx, student_id, subject_id, &ctx.term.id)?.with_exam_score(exam_score);
    let stored = write_score(&tx, &ctx.split, student_id, subject_id, &ctx.term.id, components)?;
    tx.commit()?;
    tracing::info!(
        student = student_id,
        subject = subject_id,
        term = %ctx.term.id,
        exam_score = stored.exam_score,
        total = stored.total,
        "exam score recorded"
    );
    Ok(stored)
}

pub fn record_exam_scores(
    conn: &Connection,
    ctx: &ScoringContext,
    subject_id: &str,
    entries: &[RawEntry],
) -> EngineResult<BulkScoreOutcome> {
    records::subject(conn, subject_id)?;
    let mut out = BulkScoreOutcome::default();
    for e in entries {
        match record_exam_score(conn, ctx, &e.student_id, subject_id, e.raw_score) {
            Ok(s) => out.scores.push(s),
            Err(EngineError::Storage(err)) => return Err(EngineError::Storage(err)),
            Err(err) => {
                tracing::debug!(student = %e.student_id, error = %err, "exam score rejected");
                out.failed.push(ItemFailure::new(&e.student_id, &err));
            }
        }
    }
    Ok(out)
}

/// Direct entry of already-scaled components. Omitted components keep their
/// stored value; supplied ones must sit inside their bucket.
pub fn upsert_score_components(
    conn: &Connection,
    ctx: &ScoringContext,
    student_id: &str,
    subject_id: &str,
    class_score: Option<f64>,
    exam_score: Option<f64>,
) -> EngineResult<StoredScore> {
    if class_score.is_none() && exam_score.is_none() {
        return Err(EngineError::validation(
            "classScore",
            "provide classScore, examScore or both",
        ));
    }
    if let Some(v) = class_score {
        calc::validate_component("classScore", v, ctx.split.class_percentage)?;
    }
    if let Some(v) = exam_score {
        calc::validate_component("examScore", v, ctx.split.exam_percentage)?;
    }
    records::subject(conn, subject_id)?;
    records::ensure_student(conn, student_id)?;

    let tx = conn.unchecked_transaction()?;
    let mut components = existing_components(&tx, student_id, subject_id, &ctx.term.id)?;
    if let Some(v) = class_score {
        components = components.with_class_score(v);
    }
    if let Some(v) = exam_score {
        components = components.with_exam_score(v);
    }
    let stored = write_score(&tx, &ctx.split, student_id, subject_id, &ctx.term.id, components)?;
    tx.commit()?;
    tracing::info!(student = student_id, subject = subject_id, term = %ctx.term.id, total = stored.total, "score components written");
    Ok(stored)
}

fn rescale_component(value: f64, from: Option<f64>, to: f64) -> f64 {
    let scaled = match from {
        Some(f) if f > 0.0 => calc::round_2_decimals(value * to / f),
        Some(_) => 0.0,
        None => value,
    };
    scaled.clamp(0.0, to)
}

/// Moves every stored Score onto the buckets of `to`. Class scores backed by
/// assessment marks are re-derived from those marks; everything else is
/// scaled proportionally from `from`, or only clamped when the previous split
/// is unknown. Runs on the caller's connection so it joins the caller's
/// transaction.
pub fn rescale_scores(
    conn: &Connection,
    from: Option<&ScoreSplit>,
    to: &ScoreSplit,
) -> EngineResult<usize> {
    let rows: Vec<(String, String, String, f64, f64)> = {
        let mut stmt = conn.prepare(
            "SELECT student_id, subject_id, term_id, class_score, exam_score
             FROM scores
             ORDER BY term_id, subject_id, student_id",
        )?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    let mut items_stmt = conn.prepare(
        "SELECT s.raw_score, a.max_score
         FROM assessment_scores s
         JOIN assessments a ON a.id = s.assessment_id
         WHERE s.student_id = ? AND a.subject_id = ? AND a.term_id = ?",
    )?;

    for (student_id, subject_id, term_id, class_score, exam_score) in &rows {
        let items = items_stmt
            .query_map((student_id, subject_id, term_id), |r| {
                Ok(AssessmentItem {
                    raw: r.get(0)?,
                    max: r.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        let class_score = if items.is_empty() {
            rescale_component(*class_score, from.map(|s| s.class_percentage), to.class_percentage)
        } else {
            calc::compute_class_score(&items, to.class_percentage)
        };
        let exam_score =
            rescale_component(*exam_score, from.map(|s| s.exam_percentage), to.exam_percentage);
        write_score(
            conn,
            to,
            student_id,
            subject_id,
            term_id,
            ScoreComponents::new(class_score, exam_score),
        )?;
    }
    Ok(rows.len())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentDeletion {
    pub assessment_id: String,
    pub removed_marks: usize,
    pub recomputed: Vec<StoredScore>,
}

/// Removes an assessment with its marks and re-derives every affected class
/// score, all in one transaction.
pub fn delete_assessment(
    conn: &Connection,
    split: &ScoreSplit,
    assessment_id: &str,
) -> EngineResult<AssessmentDeletion> {
    let a = assessment(conn, assessment_id)?;
    let tx = conn.unchecked_transaction()?;
    let student_ids: Vec<String> = {
        let mut stmt =
            tx.prepare("SELECT student_id FROM assessment_scores WHERE assessment_id = ? ORDER BY student_id")?;
        let ids = stmt
            .query_map([&a.id], |r| r.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids
    };
    let removed_marks = tx.execute(
        "DELETE FROM assessment_scores WHERE assessment_id = ?",
        [&a.id],
    )?;
    tx.execute("DELETE FROM assessments WHERE id = ?", [&a.id])?;

    let mut recomputed = Vec::with_capacity(student_ids.len());
    for sid in &student_ids {
        recomputed.push(recompute_class_score(
            &tx,
            split,
            sid,
            &a.subject_id,
            &a.class_id,
            &a.term_id,
        )?);
    }
    tx.commit()?;
    tracing::info!(assessment = %a.id, removed_marks, recomputed = recomputed.len(), "assessment deleted");
    Ok(AssessmentDeletion {
        assessment_id: a.id,
        removed_marks,
        recomputed,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db;
    use crate::records::{sync, RecordsBatch};
    use crate::settings;
    use serde_json::json;

    pub(crate) fn seeded() -> Connection {
        let conn = db::open_in_memory().expect("open");
        let batch: RecordsBatch = serde_json::from_value(json!({
            "academicYears": ["2023/2024", "2024/2025"],
            "terms": [
                { "id": "t1", "academicYear": "2024/2025", "name": "Term 1", "ordering": 1 },
                { "id": "t2", "academicYear": "2024/2025", "name": "Term 2", "ordering": 2 },
                { "id": "old1", "academicYear": "2023/2024", "name": "Term 1", "ordering": 1 }
            ],
            "classes": [{ "id": "jhs3", "name": "JHS 3", "level": "jhs" }],
            "subjects": [
                { "id": "eng", "name": "English Language", "category": "core", "level": "jhs" },
                { "id": "math", "name": "Mathematics", "category": "core", "level": "jhs" },
                { "id": "sci", "name": "Integrated Science", "category": "core", "level": "jhs" },
                { "id": "soc", "name": "Social Studies", "category": "core", "level": "jhs" },
                { "id": "fre", "name": "French", "category": "elective", "level": "jhs" },
                { "id": "rme", "name": "Religious and Moral Education", "category": "elective", "level": "jhs" }
            ],
            "students": [
                { "id": "s1", "classId": "jhs3", "lastName": "Mensah", "firstName": "Ama" },
                { "id": "s2", "classId": "jhs3", "lastName": "Owusu", "firstName": "Kofi" },
                { "id": "s3", "classId": "jhs3", "lastName": "Asante", "firstName": "Yaw" }
            ]
        }))
        .expect("batch");
        sync(&conn, &batch).expect("sync");
        settings::set_current_term(&conn, "t1").expect("current term");
        conn
    }

    pub(crate) fn ctx(conn: &Connection) -> ScoringContext {
        settings::scoring_context(conn, None).expect("context")
    }

    #[test]
    fn end_to_end_class_and_exam_components() {
        let conn = seeded();
        let ctx = ctx(&conn);
        let mut ids = Vec::new();
        for (title, max) in [("Quiz", 10.0), ("Homework", 20.0), ("Project", 50.0)] {
            ids.push(create_assessment(&conn, &ctx, "math", "jhs3", title, max).expect("create").id);
        }
        record_assessment_score(&conn, &ctx.split, &ids[0], "s1", 8.0).expect("quiz");
        record_assessment_score(&conn, &ctx.split, &ids[1], "s1", 15.0).expect("homework");
        let after_ca = record_assessment_score(&conn, &ctx.split, &ids[2], "s1", 40.0).expect("project");
        assert_eq!(after_ca.class_score, 31.5);
        assert_eq!(after_ca.exam_score, 0.0);

        let s = record_exam_score(&conn, &ctx, "s1", "math", 75.0).expect("exam");
        assert_eq!(s.class_score, 31.5);
        assert_eq!(s.exam_score, 45.0);
        assert_eq!(s.total, 76.5);
        assert_eq!(s.grade.as_deref(), Some("2"));
        assert_eq!(s.remarks.as_deref(), Some("Proficient"));

        // Re-entering an assessment mark keeps the exam side.
        let s = record_assessment_score(&conn, &ctx.split, &ids[0], "s1", 10.0).expect("requiz");
        assert_eq!(s.exam_score, 45.0);
        assert_eq!(s.class_score, 32.5);
        assert_eq!(s.total, 77.5);
    }

    fn stored(conn: &Connection, student: &str, subject: &str) -> StoredScore {
        load_score(conn, student, subject, "t1").expect("load").expect("score row")
    }

    #[test]
    fn split_change_moves_stored_scores_onto_new_buckets() {
        let conn = seeded();
        let c = ctx(&conn);
        upsert_score_components(&conn, &c, "s1", "math", Some(40.0), Some(30.0)).expect("direct");
        let a = create_assessment(&conn, &c, "eng", "jhs3", "Quiz", 20.0).expect("create");
        record_assessment_score(&conn, &c.split, &a.id, "s2", 15.0).expect("mark");
        assert_eq!(stored(&conn, "s2", "eng").class_score, 30.0);

        let rescaled =
            settings::set_score_split(&conn, ScoreSplit::new(30.0, 70.0).expect("split")).expect("set");
        assert_eq!(rescaled, 2);

        let s1 = stored(&conn, "s1", "math");
        assert_eq!((s1.class_score, s1.exam_score, s1.total), (30.0, 35.0, 65.0));
        assert_eq!(s1.grade.as_deref(), Some("3"));
        // Backed by marks, so re-derived rather than scaled.
        assert_eq!(stored(&conn, "s2", "eng").class_score, 22.5);

        // The next write under the new split stays inside 100.
        let c = ctx(&conn);
        let s = record_exam_score(&conn, &c, "s1", "math", 100.0).expect("exam");
        assert_eq!((s.class_score, s.exam_score, s.total), (30.0, 70.0, 100.0));
        assert_eq!(s.grade.as_deref(), Some("1"));
    }

    #[test]
    fn carried_component_outside_the_split_blocks_the_write() {
        let conn = seeded();
        let c = ctx(&conn);
        upsert_score_components(&conn, &c, "s1", "math", Some(40.0), Some(30.0)).expect("direct");
        // Split stored without moving the existing row.
        db::settings_set_json(
            &conn,
            settings::KEY_SPLIT,
            &json!({ "classScorePercentage": 30, "examScorePercentage": 70 }),
        )
        .expect("raw split");
        let c = ctx(&conn);

        let e = record_exam_score(&conn, &c, "s1", "math", 100.0).unwrap_err();
        assert_eq!(e.code(), "bad_params");
        assert_eq!(e.details(), Some(json!({ "field": "classScore" })));
        let e = upsert_score_components(&conn, &c, "s1", "math", None, Some(50.0)).unwrap_err();
        assert_eq!(e.code(), "bad_params");

        let s = stored(&conn, "s1", "math");
        assert_eq!((s.class_score, s.exam_score, s.total), (40.0, 30.0, 70.0));
    }

    #[test]
    fn raw_above_max_is_rejected_before_any_write() {
        let conn = seeded();
        let ctx = ctx(&conn);
        let a = create_assessment(&conn, &ctx, "math", "jhs3", "Quiz", 10.0).expect("create");
        let e = record_assessment_score(&conn, &ctx.split, &a.id, "s1", 12.0).unwrap_err();
        assert_eq!(e.code(), "bad_params");
        assert_eq!(db::table_count(&conn, "assessment_scores").expect("count"), 0);
        assert_eq!(db::table_count(&conn, "scores").expect("count"), 0);
    }

    #[test]
    fn zero_max_assessment_cannot_be_created() {
        let conn = seeded();
        let ctx = ctx(&conn);
        let e = create_assessment(&conn, &ctx, "math", "jhs3", "Empty", 0.0).unwrap_err();
        assert_eq!(e.code(), "bad_params");
    }

    #[test]
    fn bulk_entry_reports_failures_and_keeps_going() {
        let conn = seeded();
        let ctx = ctx(&conn);
        let a = create_assessment(&conn, &ctx, "eng", "jhs3", "Essay", 20.0).expect("create");
        let entries = vec![
            RawEntry { student_id: "s1".into(), raw_score: 18.0 },
            RawEntry { student_id: "s2".into(), raw_score: 25.0 },
            RawEntry { student_id: "ghost".into(), raw_score: 5.0 },
            RawEntry { student_id: "s3".into(), raw_score: 10.0 },
        ];
        let out = record_assessment_scores(&conn, &ctx.split, &a.id, &entries).expect("bulk");
        assert_eq!(out.scores.len(), 2);
        assert_eq!(out.failed.len(), 2);
        assert_eq!(out.failed[0].code, "bad_params");
        assert_eq!(out.failed[1].code, "not_found");
        assert_eq!(out.scores[1].class_score, 20.0);
    }

    #[test]
    fn exam_entry_is_bounded_to_100() {
        let conn = seeded();
        let ctx = ctx(&conn);
        assert!(record_exam_score(&conn, &ctx, "s1", "math", 101.0).is_err());
        assert!(record_exam_score(&conn, &ctx, "s1", "math", -1.0).is_err());
    }

    #[test]
    fn direct_components_are_bounded_and_preserve_the_other() {
        let conn = seeded();
        let ctx = ctx(&conn);
        let e = upsert_score_components(&conn, &ctx, "s1", "sci", Some(41.0), None).unwrap_err();
        assert_eq!(e.code(), "bad_params");
        let e = upsert_score_components(&conn, &ctx, "s1", "sci", None, Some(60.5)).unwrap_err();
        assert_eq!(e.code(), "bad_params");

        upsert_score_components(&conn, &ctx, "s1", "sci", Some(30.0), None).expect("class");
        let s = upsert_score_components(&conn, &ctx, "s1", "sci", None, Some(50.0)).expect("exam");
        assert_eq!(s.class_score, 30.0);
        assert_eq!(s.total, 80.0);
        assert_eq!(s.grade.as_deref(), Some("1"));
    }

    #[test]
    fn deleting_an_assessment_recomputes_class_scores() {
        let conn = seeded();
        let ctx = ctx(&conn);
        let quiz = create_assessment(&conn, &ctx, "math", "jhs3", "Quiz", 10.0).expect("quiz");
        let test = create_assessment(&conn, &ctx, "math", "jhs3", "Test", 30.0).expect("test");
        record_assessment_score(&conn, &ctx.split, &quiz.id, "s1", 10.0).expect("quiz mark");
        record_assessment_score(&conn, &ctx.split, &test.id, "s1", 15.0).expect("test mark");
        record_assessment_score(&conn, &ctx.split, &quiz.id, "s2", 5.0).expect("quiz mark");
        record_exam_score(&conn, &ctx, "s2", "math", 50.0).expect("exam");

        let out = delete_assessment(&conn, &ctx.split, &quiz.id).expect("delete");
        assert_eq!(out.removed_marks, 2);
        let s1 = load_score(&conn, "s1", "math", "t1").expect("load").expect("row");
        assert_eq!(s1.class_score, 20.0);
        let s2 = load_score(&conn, "s2", "math", "t1").expect("load").expect("row");
        assert_eq!(s2.class_score, 0.0);
        assert_eq!(s2.exam_score, 30.0);
        assert_eq!(s2.total, 30.0);
        assert_eq!(list_assessments(&conn, "math", "jhs3", "t1").expect("list").len(), 1);
    }
}
