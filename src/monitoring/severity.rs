use crate::shared_data::RoadConditionRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Presentation emphasis of a road condition, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Maps a road-condition value to its severity. Unknown values fall through to `Info`.
pub fn classify_condition(condition: &str) -> Severity {
    match condition {
        "Wet" | "Slippery" => Severity::Warning,
        "Construction Zone" | "Debris" => Severity::Error,
        _ => Severity::Info,
    }
}

/// A road condition together with its classified severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoadAlert {
    #[serde(rename = "type")]
    pub kind: String,
    pub condition: String,
    pub severity: Severity,
}

impl From<&RoadConditionRecord> for RoadAlert {
    fn from(record: &RoadConditionRecord) -> Self {
        Self {
            kind: record.kind.clone(),
            condition: record.condition.clone(),
            severity: classify_condition(&record.condition),
        }
    }
}

/// Alerts for the given conditions, most severe first. Equal severities keep their input order.
pub fn road_alerts(conditions: &[RoadConditionRecord]) -> Vec<RoadAlert> {
    let mut alerts: Vec<RoadAlert> = conditions.iter().map(RoadAlert::from).collect();
    alerts.sort_by(|a, b| b.severity.cmp(&a.severity));
    alerts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_conditions_match_the_table() {
        assert_eq!(classify_condition("Wet"), Severity::Warning);
        assert_eq!(classify_condition("Slippery"), Severity::Warning);
        assert_eq!(classify_condition("Construction Zone"), Severity::Error);
        assert_eq!(classify_condition("Debris"), Severity::Error);
    }

    #[test]
    fn unknown_conditions_fall_back_to_info() {
        assert_eq!(classify_condition("Fog"), Severity::Info);
        assert_eq!(classify_condition(""), Severity::Info);
        // matching is exact
        assert_eq!(classify_condition("wet"), Severity::Info);
        assert_eq!(classify_condition("Debris "), Severity::Info);
    }

    #[test]
    fn classification_is_idempotent() {
        for condition in ["Wet", "Slippery", "Construction Zone", "Debris", "Fog", "Ice"] {
            assert_eq!(classify_condition(condition), classify_condition(condition));
        }
    }

    #[test]
    fn error_outranks_warning_outranks_info() {
        assert!(Severity::Error > Severity::Warning);
        assert!(Severity::Warning > Severity::Info);
    }

    #[test]
    fn alerts_are_sorted_most_severe_first() {
        let conditions = vec![
            RoadConditionRecord::new("Visibility", "Fog"),
            RoadConditionRecord::new("Surface", "Wet"),
            RoadConditionRecord::new("Hazard", "Construction Zone"),
            RoadConditionRecord::new("Surface", "Slippery"),
        ];
        let alerts = road_alerts(&conditions);
        let order: Vec<&str> = alerts.iter().map(|a| a.condition.as_str()).collect();
        assert_eq!(order, vec!["Construction Zone", "Wet", "Slippery", "Fog"]);
    }

    #[test]
    fn severity_serializes_lowercase() {
        let alert = RoadAlert::from(&RoadConditionRecord::new("Surface", "Wet"));
        let json = serde_json::to_string(&alert).unwrap();
        assert_eq!(
            json,
            r#"{"type":"Surface","condition":"Wet","severity":"warning"}"#
        );
    }
}
