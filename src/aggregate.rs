//! Best-six leaving-exam aggregate: the four core subjects plus the two best
//! electives, each on the 9-point scale. Lower is better; the range is 6..=54.

use crate::grading::grade_value_9;
use serde::{Deserialize, Serialize};

pub const WORST_VALUE: u8 = 9;
pub const ELECTIVES_COUNTED: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectBucket {
    English,
    Mathematics,
    Science,
    SocialStudies,
    Elective,
}

impl SubjectBucket {
    pub const CORE: [SubjectBucket; 4] = [
        SubjectBucket::English,
        SubjectBucket::Mathematics,
        SubjectBucket::Science,
        SubjectBucket::SocialStudies,
    ];

    /// Buckets a subject by its name, case-insensitively.
    pub fn from_subject_name(name: &str) -> Self {
        let n = name.to_ascii_lowercase();
        if n.contains("english") {
            Self::English
        } else if n.contains("math") {
            Self::Mathematics
        } else if n.contains("social") {
            Self::SocialStudies
        } else if n.contains("science") {
            Self::Science
        } else {
            Self::Elective
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectTotal {
    pub subject_name: String,
    pub total: f64,
}

impl SubjectTotal {
    pub fn new(subject_name: impl Into<String>, total: f64) -> Self {
        Self {
            subject_name: subject_name.into(),
            total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregate {
    pub english: u8,
    pub mathematics: u8,
    pub science: u8,
    pub social_studies: u8,
    /// The two elective values that counted, best first.
    pub best_electives: Vec<u8>,
    pub aggregate: u32,
}

pub fn aggregate(entries: &[SubjectTotal]) -> Aggregate {
    let mut core = [WORST_VALUE; 4];
    let mut electives: Vec<u8> = Vec::new();

    for e in entries {
        let value = grade_value_9(e.total);
        match SubjectBucket::from_subject_name(&e.subject_name) {
            SubjectBucket::Elective => electives.push(value),
            bucket => {
                if let Some(i) = SubjectBucket::CORE.iter().position(|b| *b == bucket) {
                    core[i] = core[i].min(value);
                }
            }
        }
    }

    while electives.len() < ELECTIVES_COUNTED {
        electives.push(WORST_VALUE);
    }
    electives.sort_unstable();
    electives.truncate(ELECTIVES_COUNTED);

    let total: u32 = core.iter().chain(electives.iter()).map(|v| u32::from(*v)).sum();
    Aggregate {
        english: core[0],
        mathematics: core[1],
        science: core[2],
        social_studies: core[3],
        best_electives: electives,
        aggregate: total,
    }
}
