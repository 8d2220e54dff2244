//! Grade tables. Every table is ordered from the highest threshold down and
//! the first threshold the total reaches wins; totals below the last
//! threshold get the table's floor grade.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Primary,
    Jhs,
}

impl Level {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "primary" => Some(Self::Primary),
            "jhs" => Some(Self::Jhs),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Jhs => "jhs",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemeVariant {
    /// A to F letters shown when teachers review continuous assessment.
    ContinuousAssessment,
    /// Numeric 1-5 (primary) or 1-6 (JHS) stored with every score.
    Proficiency,
    /// 9-point leaving-exam scale feeding the best-six aggregate.
    Bece,
}

impl SchemeVariant {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "continuous_assessment" | "ca" => Some(Self::ContinuousAssessment),
            "proficiency" => Some(Self::Proficiency),
            "bece" => Some(Self::Bece),
            _ => None,
        }
    }
}

struct Band {
    min_total: f64,
    code: &'static str,
    remark: &'static str,
}

const fn band(min_total: f64, code: &'static str, remark: &'static str) -> Band {
    Band {
        min_total,
        code,
        remark,
    }
}

const CONTINUOUS_ASSESSMENT: &[Band] = &[
    band(80.0, "A", "Excellent"),
    band(70.0, "B", "Very Good"),
    band(60.0, "C", "Good"),
    band(50.0, "D", "Credit"),
    band(40.0, "E", "Pass"),
    band(0.0, "F", "Fail"),
];

const PROFICIENCY_PRIMARY: &[Band] = &[
    band(80.0, "1", "Advanced"),
    band(70.0, "2", "Proficient"),
    band(60.0, "3", "Approaching Proficiency"),
    band(50.0, "4", "Developing"),
    band(0.0, "5", "Beginning"),
];

const PROFICIENCY_JHS: &[Band] = &[
    band(80.0, "1", "Highly Proficient"),
    band(70.0, "2", "Proficient"),
    band(60.0, "3", "Approaching Proficiency"),
    band(50.0, "4", "Developing"),
    band(40.0, "5", "Emerging"),
    band(0.0, "6", "Beginning"),
];

const BECE_NINE_POINT: &[Band] = &[
    band(80.0, "1", "Highest"),
    band(70.0, "2", "Higher"),
    band(60.0, "3", "High"),
    band(55.0, "4", "High Average"),
    band(50.0, "5", "Average"),
    band(45.0, "6", "Low Average"),
    band(40.0, "7", "Low"),
    band(35.0, "8", "Lower"),
    band(0.0, "9", "Lowest"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingScheme {
    pub variant: SchemeVariant,
    pub level: Level,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Grade {
    pub grade: &'static str,
    pub remark: &'static str,
    /// 1 is the best band; larger is worse.
    pub points: u8,
}

impl GradingScheme {
    pub fn new(variant: SchemeVariant, level: Level) -> Self {
        Self { variant, level }
    }

    pub fn proficiency(level: Level) -> Self {
        Self::new(SchemeVariant::Proficiency, level)
    }

    fn bands(&self) -> &'static [Band] {
        match (self.variant, self.level) {
            (SchemeVariant::ContinuousAssessment, _) => CONTINUOUS_ASSESSMENT,
            (SchemeVariant::Proficiency, Level::Primary) => PROFICIENCY_PRIMARY,
            (SchemeVariant::Proficiency, Level::Jhs) => PROFICIENCY_JHS,
            (SchemeVariant::Bece, _) => BECE_NINE_POINT,
        }
    }

    pub fn classify(&self, total: f64) -> Grade {
        let bands = self.bands();
        let (idx, b) = bands
            .iter()
            .enumerate()
            .find(|(_, b)| total >= b.min_total)
            .unwrap_or((bands.len() - 1, &bands[bands.len() - 1]));
        Grade {
            grade: b.code,
            remark: b.remark,
            points: (idx + 1) as u8,
        }
    }
}

pub fn classify(total: f64, level: Level, variant: SchemeVariant) -> Grade {
    GradingScheme::new(variant, level).classify(total)
}

/// 9-point value used by the aggregate: 1 best, 9 worst.
pub fn grade_value_9(total: f64) -> u8 {
    GradingScheme::new(SchemeVariant::Bece, Level::Jhs)
        .classify(total)
        .points
}
