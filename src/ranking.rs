use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentValue {
    pub student_id: String,
    pub value: f64,
}

impl StudentValue {
    pub fn new(student_id: impl Into<String>, value: f64) -> Self {
        Self {
            student_id: student_id.into(),
            value,
        }
    }
}

/// Highest value first; equal values fall back to the student id so the
/// order never depends on input order.
fn compare_desc(a: &StudentValue, b: &StudentValue) -> Ordering {
    b.value
        .partial_cmp(&a.value)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.student_id.cmp(&b.student_id))
}

/// Sorted copy of the cohort with its 1-based ranks.
pub fn ranked(values: &[StudentValue]) -> Vec<(u32, StudentValue)> {
    let mut sorted: Vec<StudentValue> = values
        .iter()
        .filter(|v| !v.value.is_nan())
        .cloned()
        .collect();
    sorted.sort_by(compare_desc);
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, v)| ((i + 1) as u32, v))
        .collect()
}

pub fn rank_subject(totals: &[StudentValue]) -> HashMap<String, u32> {
    ranked(totals)
        .into_iter()
        .map(|(rank, v)| (v.student_id, rank))
        .collect()
}

/// Same ordering as [`rank_subject`], applied to per-student term averages.
pub fn class_position(averages: &[StudentValue]) -> HashMap<String, u32> {
    rank_subject(averages)
}

/// Mean of the given totals rounded to 2 decimals, or `None` for no totals.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: f64 = values.iter().sum();
    Some(crate::calc::round_2_decimals(sum / values.len() as f64))
}

/// Per-student averages over `(student_id, total)` rows. Students without
/// rows do not appear.
pub fn term_averages<'a, I>(rows: I) -> Vec<StudentValue>
where
    I: IntoIterator<Item = (&'a str, f64)>,
{
    let mut per_student: HashMap<&str, Vec<f64>> = HashMap::new();
    for (student_id, total) in rows {
        per_student.entry(student_id).or_default().push(total);
    }
    let mut out: Vec<StudentValue> = per_student
        .into_iter()
        .filter_map(|(sid, totals)| mean(&totals).map(|avg| StudentValue::new(sid, avg)))
        .collect();
    out.sort_by(|a, b| a.student_id.cmp(&b.student_id));
    out
}
