use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CLASS_PERCENTAGE: f64 = 40.0;
pub const DEFAULT_EXAM_PERCENTAGE: f64 = 60.0;

/// Half-away-from-zero rounding to 2 decimals, used for class scores and totals.
pub fn round_2_decimals(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Half-away-from-zero rounding to 1 decimal, used for exam scores.
pub fn round_1_decimal(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// How a subject total of 100 is divided between continuous assessment and the exam.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSplit {
    #[serde(rename = "classScorePercentage")]
    pub class_percentage: f64,
    #[serde(rename = "examScorePercentage")]
    pub exam_percentage: f64,
}

impl Default for ScoreSplit {
    fn default() -> Self {
        Self {
            class_percentage: DEFAULT_CLASS_PERCENTAGE,
            exam_percentage: DEFAULT_EXAM_PERCENTAGE,
        }
    }
}

impl ScoreSplit {
    pub fn new(class_percentage: f64, exam_percentage: f64) -> EngineResult<Self> {
        let split = Self {
            class_percentage,
            exam_percentage,
        };
        split.validate()?;
        Ok(split)
    }

    pub fn validate(&self) -> EngineResult<()> {
        for (field, v) in [
            ("classScorePercentage", self.class_percentage),
            ("examScorePercentage", self.exam_percentage),
        ] {
            if !v.is_finite() || !(0.0..=100.0).contains(&v) {
                return Err(EngineError::validation(field, "must be between 0 and 100"));
            }
        }
        if (self.class_percentage + self.exam_percentage - 100.0).abs() > 1e-9 {
            return Err(EngineError::validation(
                "classScorePercentage",
                "class and exam percentages must sum to 100",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentItem {
    pub raw: f64,
    pub max: f64,
}

/// `sum(raw) / sum(max) * class_percentage`, rounded to 2 decimals. Zero when
/// there is nothing to divide by.
pub fn compute_class_score(items: &[AssessmentItem], class_percentage: f64) -> f64 {
    let sum_raw: f64 = items.iter().map(|i| i.raw).sum();
    let sum_max: f64 = items.iter().map(|i| i.max).sum();
    if sum_max <= 0.0 {
        return 0.0;
    }
    round_2_decimals(sum_raw / sum_max * class_percentage)
}

/// Converts a single exam mark out of 100 into the exam component.
pub fn compute_exam_score(raw_out_of_100: f64, exam_percentage: f64) -> f64 {
    round_1_decimal(raw_out_of_100 * exam_percentage / 100.0)
}

pub fn validate_raw_score(raw: f64, max_score: f64) -> EngineResult<()> {
    if !raw.is_finite() || raw < 0.0 {
        return Err(EngineError::validation("rawScore", "must be >= 0"));
    }
    if raw > max_score {
        return Err(EngineError::Validation {
            field: "rawScore".to_string(),
            message: format!("{} exceeds the assessment maximum of {}", raw, max_score),
        });
    }
    Ok(())
}

pub fn validate_max_score(max_score: f64) -> EngineResult<()> {
    if !max_score.is_finite() || max_score <= 0.0 {
        return Err(EngineError::validation("maxScore", "must be > 0"));
    }
    Ok(())
}

pub fn validate_exam_raw(raw: f64) -> EngineResult<()> {
    if !raw.is_finite() || !(0.0..=100.0).contains(&raw) {
        return Err(EngineError::validation("rawScore", "exam marks are out of 100"));
    }
    Ok(())
}

/// Rejects a directly entered component that falls outside `[0, bound]`.
pub fn validate_component(field: &str, value: f64, bound: f64) -> EngineResult<()> {
    if !value.is_finite() || value < 0.0 || value > bound {
        return Err(EngineError::Validation {
            field: field.to_string(),
            message: format!("must be between 0 and {}", bound),
        });
    }
    Ok(())
}

/// The two bounded components of a subject score plus their sum.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreComponents {
    pub class_score: f64,
    pub exam_score: f64,
    pub total: f64,
}

impl ScoreComponents {
    pub fn new(class_score: f64, exam_score: f64) -> Self {
        Self {
            class_score,
            exam_score,
            total: round_2_decimals(class_score + exam_score),
        }
    }

    pub fn with_class_score(self, class_score: f64) -> Self {
        Self::new(class_score, self.exam_score)
    }

    pub fn with_exam_score(self, exam_score: f64) -> Self {
        Self::new(self.class_score, exam_score)
    }

    /// Both components, including one carried over from an earlier write,
    /// must sit inside the buckets of `split`.
    pub fn check_within(&self, split: &ScoreSplit) -> EngineResult<()> {
        validate_component("classScore", self.class_score, split.class_percentage)?;
        validate_component("examScore", self.exam_score, split.exam_percentage)
    }
}
