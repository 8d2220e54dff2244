//! Read-side projections over a term's scores: subject ranks, class
//! positions, score review sheets, best-six aggregates and yearly averages.

use crate::aggregate::{self, Aggregate, SubjectTotal};
use crate::error::EngineResult;
use crate::grading::{GradingScheme, SchemeVariant};
use crate::ranking::{self, StudentValue};
use crate::records::{self, COHORT_CTE};
use crate::settings;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

struct ScoreRow {
    student_id: String,
    display_name: String,
    subject_id: String,
    subject_name: String,
    class_score: f64,
    exam_score: f64,
    total: f64,
    grade: Option<String>,
    remarks: Option<String>,
}

/// Score rows of the class cohort for one term, optionally one subject.
fn cohort_scores(
    conn: &Connection,
    class_id: &str,
    term_id: &str,
    subject_id: Option<&str>,
) -> EngineResult<Vec<ScoreRow>> {
    let term = settings::term(conn, term_id)?;
    records::class(conn, class_id)?;
    let sql = format!(
        "{}
         SELECT sc.student_id, st.last_name, st.first_name, sc.subject_id, su.name,
                sc.class_score, sc.exam_score, sc.total, sc.grade, sc.remarks
         FROM scores sc
         JOIN cohort c ON c.student_id = sc.student_id
         JOIN students st ON st.id = sc.student_id
         JOIN subjects su ON su.id = sc.subject_id
         WHERE sc.term_id = :term_id
           AND (:subject_id IS NULL OR sc.subject_id = :subject_id)
         ORDER BY sc.student_id, su.name",
        COHORT_CTE
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(
            rusqlite::named_params! {
                ":class_id": class_id,
                ":year": term.academic_year,
                ":term_id": term.id,
                ":subject_id": subject_id,
            },
            |r| {
                let last: String = r.get(1)?;
                let first: String = r.get(2)?;
                Ok(ScoreRow {
                    student_id: r.get(0)?,
                    display_name: format!("{}, {}", last, first),
                    subject_id: r.get(3)?,
                    subject_name: r.get(4)?,
                    class_score: r.get(5)?,
                    exam_score: r.get(6)?,
                    total: r.get(7)?,
                    grade: r.get(8)?,
                    remarks: r.get(9)?,
                })
            },
        )?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedRow {
    pub rank: u32,
    pub student_id: String,
    pub display_name: String,
    pub value: f64,
}

fn ranked_rows(values: &[StudentValue], names: &HashMap<String, String>) -> Vec<RankedRow> {
    ranking::ranked(values)
        .into_iter()
        .map(|(rank, v)| RankedRow {
            rank,
            display_name: names.get(&v.student_id).cloned().unwrap_or_default(),
            student_id: v.student_id,
            value: v.value,
        })
        .collect()
}

pub fn subject_ranking(
    conn: &Connection,
    class_id: &str,
    subject_id: &str,
    term_id: &str,
) -> EngineResult<Vec<RankedRow>> {
    records::subject(conn, subject_id)?;
    let rows = cohort_scores(conn, class_id, term_id, Some(subject_id))?;
    let names: HashMap<String, String> = rows
        .iter()
        .map(|r| (r.student_id.clone(), r.display_name.clone()))
        .collect();
    let totals: Vec<StudentValue> = rows
        .iter()
        .map(|r| StudentValue::new(r.student_id.clone(), r.total))
        .collect();
    Ok(ranked_rows(&totals, &names))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionRow {
    pub position: u32,
    pub student_id: String,
    pub display_name: String,
    pub average: f64,
    pub subject_count: usize,
}

pub fn class_positions(
    conn: &Connection,
    class_id: &str,
    term_id: &str,
) -> EngineResult<Vec<PositionRow>> {
    let rows = cohort_scores(conn, class_id, term_id, None)?;
    let mut names: HashMap<String, String> = HashMap::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in &rows {
        names.insert(r.student_id.clone(), r.display_name.clone());
        *counts.entry(r.student_id.as_str()).or_insert(0) += 1;
    }
    let averages = ranking::term_averages(rows.iter().map(|r| (r.student_id.as_str(), r.total)));
    let positions = ranking::class_position(&averages);
    let mut out: Vec<PositionRow> = averages
        .into_iter()
        .map(|a| PositionRow {
            position: positions.get(&a.student_id).copied().unwrap_or(0),
            subject_count: counts.get(a.student_id.as_str()).copied().unwrap_or(0),
            display_name: names.get(&a.student_id).cloned().unwrap_or_default(),
            student_id: a.student_id,
            average: a.value,
        })
        .collect();
    out.sort_by_key(|r| r.position);
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRow {
    pub rank: u32,
    pub student_id: String,
    pub display_name: String,
    pub class_score: f64,
    pub exam_score: f64,
    pub total: f64,
    pub grade: Option<String>,
    pub remarks: Option<String>,
    /// Continuous-assessment letter derived on read for score review.
    pub review_grade: &'static str,
    pub review_remark: &'static str,
}

pub fn score_sheet(
    conn: &Connection,
    class_id: &str,
    subject_id: &str,
    term_id: &str,
) -> EngineResult<Vec<SheetRow>> {
    let subject = records::subject(conn, subject_id)?;
    let rows = cohort_scores(conn, class_id, term_id, Some(subject_id))?;
    let totals: Vec<StudentValue> = rows
        .iter()
        .map(|r| StudentValue::new(r.student_id.clone(), r.total))
        .collect();
    let ranks = ranking::rank_subject(&totals);
    let review = GradingScheme::new(SchemeVariant::ContinuousAssessment, subject.level);

    let mut sheet: Vec<SheetRow> = rows
        .into_iter()
        .map(|r| {
            let g = review.classify(r.total);
            SheetRow {
                rank: ranks.get(&r.student_id).copied().unwrap_or(0),
                student_id: r.student_id,
                display_name: r.display_name,
                class_score: r.class_score,
                exam_score: r.exam_score,
                total: r.total,
                grade: r.grade,
                remarks: r.remarks,
                review_grade: g.grade,
                review_remark: g.remark,
            }
        })
        .collect();
    sheet.sort_by_key(|r| r.rank);
    Ok(sheet)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateRow {
    pub student_id: String,
    pub display_name: String,
    #[serde(flatten)]
    pub aggregate: Aggregate,
}

/// Best-six aggregate for every cohort student with at least one score in
/// the term, best (lowest) aggregate first.
pub fn class_aggregates(
    conn: &Connection,
    class_id: &str,
    term_id: &str,
) -> EngineResult<Vec<AggregateRow>> {
    let rows = cohort_scores(conn, class_id, term_id, None)?;
    let mut per_student: BTreeMap<String, (String, Vec<SubjectTotal>)> = BTreeMap::new();
    for r in rows {
        per_student
            .entry(r.student_id)
            .or_insert_with(|| (r.display_name, Vec::new()))
            .1
            .push(SubjectTotal::new(r.subject_name, r.total));
    }
    let mut out: Vec<AggregateRow> = per_student
        .into_iter()
        .map(|(student_id, (display_name, totals))| AggregateRow {
            student_id,
            display_name,
            aggregate: aggregate::aggregate(&totals),
        })
        .collect();
    out.sort_by(|a, b| {
        a.aggregate
            .aggregate
            .cmp(&b.aggregate.aggregate)
            .then_with(|| a.student_id.cmp(&b.student_id))
    });
    Ok(out)
}

/// Mean of the student's per-term averages over the terms of the year that
/// hold at least one score.
pub fn yearly_average(
    conn: &Connection,
    student_id: &str,
    academic_year: &str,
) -> EngineResult<Option<f64>> {
    let mut stmt = conn.prepare(
        "SELECT sc.term_id, sc.total
         FROM scores sc
         JOIN terms t ON t.id = sc.term_id
         WHERE sc.student_id = ? AND t.academic_year = ?",
    )?;
    let rows = stmt
        .query_map((student_id, academic_year), |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, f64>(1)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut per_term: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for (term_id, total) in rows {
        per_term.entry(term_id).or_default().push(total);
    }
    let term_means: Vec<f64> = per_term
        .values()
        .filter_map(|totals| ranking::mean(totals))
        .collect();
    Ok(ranking::mean(&term_means))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{ctx, seeded};
    use crate::store::upsert_score_components;

    fn put(conn: &Connection, student: &str, subject: &str, class_score: f64, exam: f64) {
        let c = ctx(conn);
        upsert_score_components(conn, &c, student, subject, Some(class_score), Some(exam))
            .expect("score");
    }

    #[test]
    fn subject_ranking_orders_by_total() {
        let conn = seeded();
        put(&conn, "s1", "math", 30.0, 40.0);
        put(&conn, "s2", "math", 35.0, 50.0);
        put(&conn, "s3", "math", 10.0, 20.0);
        let rows = subject_ranking(&conn, "jhs3", "math", "t1").expect("ranking");
        let order: Vec<(&str, u32)> = rows.iter().map(|r| (r.student_id.as_str(), r.rank)).collect();
        assert_eq!(order, vec![("s2", 1), ("s1", 2), ("s3", 3)]);
        assert_eq!(rows[0].display_name, "Owusu, Kofi");
    }

    #[test]
    fn students_without_scores_are_left_out() {
        let conn = seeded();
        put(&conn, "s1", "eng", 30.0, 40.0);
        let rows = subject_ranking(&conn, "jhs3", "eng", "t1").expect("ranking");
        assert_eq!(rows.len(), 1);
        assert!(class_positions(&conn, "jhs3", "t1")
            .expect("positions")
            .iter()
            .all(|r| r.student_id == "s1" && r.position == 1));
        assert!(subject_ranking(&conn, "jhs3", "eng", "t2").expect("empty").is_empty());
    }

    #[test]
    fn class_positions_use_term_average() {
        let conn = seeded();
        put(&conn, "s1", "math", 40.0, 60.0); // 100
        put(&conn, "s1", "eng", 0.0, 0.0); // 0 -> avg 50
        put(&conn, "s2", "math", 30.0, 30.0); // 60 -> avg 60
        let rows = class_positions(&conn, "jhs3", "t1").expect("positions");
        assert_eq!(rows[0].student_id, "s2");
        assert_eq!(rows[0].average, 60.0);
        assert_eq!(rows[1].student_id, "s1");
        assert_eq!(rows[1].average, 50.0);
        assert_eq!(rows[1].subject_count, 2);
    }

    #[test]
    fn score_sheet_carries_review_letter() {
        let conn = seeded();
        put(&conn, "s1", "sci", 31.5, 45.0);
        let sheet = score_sheet(&conn, "jhs3", "sci", "t1").expect("sheet");
        assert_eq!(sheet.len(), 1);
        assert_eq!(sheet[0].grade.as_deref(), Some("2"));
        assert_eq!(sheet[0].review_grade, "B");
        assert_eq!(sheet[0].rank, 1);
    }

    #[test]
    fn aggregates_for_leaving_class() {
        let conn = seeded();
        for subject in ["eng", "math", "sci", "soc", "fre", "rme"] {
            put(&conn, "s1", subject, 35.0, 50.0);
        }
        put(&conn, "s2", "math", 20.0, 30.0);
        let rows = class_aggregates(&conn, "jhs3", "t1").expect("aggregates");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].student_id, "s1");
        assert_eq!(rows[0].aggregate.aggregate, 6);
        // 50 -> 5 in maths, everything else missing.
        assert_eq!(rows[1].aggregate.aggregate, 9 * 3 + 5 + 9 + 9);
    }

    #[test]
    fn yearly_average_weights_terms_equally() {
        let conn = seeded();
        put(&conn, "s1", "math", 40.0, 60.0);
        put(&conn, "s1", "eng", 20.0, 20.0);
        let t2 = settings::scoring_context(&conn, Some("t2")).expect("t2");
        upsert_score_components(&conn, &t2, "s1", "math", Some(20.0), Some(30.0)).expect("t2 score");
        // term 1 mean 70, term 2 mean 50
        assert_eq!(yearly_average(&conn, "s1", "2024/2025").expect("avg"), Some(60.0));
        assert_eq!(yearly_average(&conn, "s1", "2023/2024").expect("avg"), None);
    }
}
