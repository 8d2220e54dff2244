use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

pub const PROMOTE_THRESHOLD: f64 = 50.0;
pub const PROBATION_THRESHOLD: f64 = 40.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromotionStatus {
    Pending,
    Promoted,
    PromotedProbation,
    Repeated,
    Graduated,
}

impl PromotionStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "promoted" => Some(Self::Promoted),
            "promoted_probation" => Some(Self::PromotedProbation),
            "repeated" => Some(Self::Repeated),
            "graduated" => Some(Self::Graduated),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Promoted => "promoted",
            Self::PromotedProbation => "promoted_probation",
            Self::Repeated => "repeated",
            Self::Graduated => "graduated",
        }
    }

    pub fn is_decided(self) -> bool {
        self != Self::Pending
    }

    /// Whether the student carries on into the next academic year with a
    /// fresh pending record.
    pub fn opens_next_year(self) -> bool {
        matches!(self, Self::Promoted | Self::PromotedProbation)
    }

    /// Any record may move to a decided state, including a different decided
    /// state (manual override). Nothing moves back to pending.
    pub fn check_transition(self, to: PromotionStatus) -> EngineResult<()> {
        if !to.is_decided() {
            return Err(EngineError::InvalidTransition {
                from: self.as_str().to_string(),
                to: to.as_str().to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionRecord {
    pub student_id: String,
    pub academic_year: String,
    pub status: PromotionStatus,
    pub remarks: Option<String>,
    pub decided_by: Option<String>,
    pub decided_at: Option<String>,
    /// False for the transient pending value returned before any decision.
    pub persisted: bool,
}

impl PromotionRecord {
    pub fn pending(student_id: impl Into<String>, academic_year: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            academic_year: academic_year.into(),
            status: PromotionStatus::Pending,
            remarks: None,
            decided_by: None,
            decided_at: None,
            persisted: false,
        }
    }
}

/// Advisory status for a yearly average. Never written by itself.
pub fn suggest(average: f64) -> PromotionStatus {
    if average >= PROMOTE_THRESHOLD {
        PromotionStatus::Promoted
    } else if average >= PROBATION_THRESHOLD {
        PromotionStatus::PromotedProbation
    } else {
        PromotionStatus::Repeated
    }
}

/// `"2024/2025"` -> `"2025/2026"`. Also accepts `-` as the separator and a
/// bare single year.
pub fn next_academic_year(year: &str) -> Option<String> {
    let year = year.trim();
    for sep in ['/', '-'] {
        if let Some((a, b)) = year.split_once(sep) {
            let a: i32 = a.trim().parse().ok()?;
            let b: i32 = b.trim().parse().ok()?;
            return Some(format!("{}{}{}", a.checked_add(1)?, sep, b.checked_add(1)?));
        }
    }
    let y: i32 = year.parse().ok()?;
    Some(y.checked_add(1)?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggestion_thresholds() {
        assert_eq!(suggest(55.0), PromotionStatus::Promoted);
        assert_eq!(suggest(50.0), PromotionStatus::Promoted);
        assert_eq!(suggest(45.0), PromotionStatus::PromotedProbation);
        assert_eq!(suggest(40.0), PromotionStatus::PromotedProbation);
        assert_eq!(suggest(39.99), PromotionStatus::Repeated);
        assert_eq!(suggest(30.0), PromotionStatus::Repeated);
    }

    #[test]
    fn pending_is_not_a_decision_target() {
        assert!(PromotionStatus::Pending
            .check_transition(PromotionStatus::Promoted)
            .is_ok());
        assert!(PromotionStatus::Repeated
            .check_transition(PromotionStatus::Promoted)
            .is_ok());
        let e = PromotionStatus::Promoted
            .check_transition(PromotionStatus::Pending)
            .unwrap_err();
        assert_eq!(e.code(), "invalid_transition");
    }

    #[test]
    fn only_promotions_open_next_year() {
        assert!(PromotionStatus::Promoted.opens_next_year());
        assert!(PromotionStatus::PromotedProbation.opens_next_year());
        assert!(!PromotionStatus::Repeated.opens_next_year());
        assert!(!PromotionStatus::Graduated.opens_next_year());
    }

    #[test]
    fn next_year_formats() {
        assert_eq!(next_academic_year("2024/2025").as_deref(), Some("2025/2026"));
        assert_eq!(next_academic_year("2024-2025").as_deref(), Some("2025-2026"));
        assert_eq!(next_academic_year("2024").as_deref(), Some("2025"));
        assert_eq!(next_academic_year("next year"), None);
    }

    #[test]
    fn next_year_stops_at_the_largest_year() {
        assert_eq!(next_academic_year("2147483646/2147483647"), None);
        assert_eq!(next_academic_year("2147483647-2147483647"), None);
        assert_eq!(next_academic_year("2147483647"), None);
        assert_eq!(next_academic_year("2147483646").as_deref(), Some("2147483647"));
    }

    #[test]
    fn status_round_trips_through_str() {
        for s in [
            PromotionStatus::Pending,
            PromotionStatus::Promoted,
            PromotionStatus::PromotedProbation,
            PromotionStatus::Repeated,
            PromotionStatus::Graduated,
        ] {
            assert_eq!(PromotionStatus::parse(s.as_str()), Some(s));
        }
    }
}
