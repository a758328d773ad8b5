//! Configuration validator: schema, semantic, cross-point, and safety
//! checks over a set of I/O points (spec §7).
//!
//! Grounded on `original_source/src/iocontrol/validation.py`'s
//! `ConfigValidator`: JSON-schema-shaped structural checks plus a series
//! of hand-written semantic/safety passes, all folded into one flat
//! `Vec<ValidationIssue>` rather than raising on the first failure. Since
//! points are already strongly typed by the time they reach this crate,
//! the schema pass only covers what serde deserialization doesn't
//! (name shape, non-empty `hardware_ref`); type-compatibility between
//! `initial_state` and `io_type` becomes a structural comparison instead
//! of the original's `isinstance` probing.

use iocontrol_types::{IoPoint, IoType, Value};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationLevel {
    Error,
    Warning,
    Info,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub level: ValidationLevel,
    pub category: String,
    pub message: String,
    pub path: String,
    pub suggestion: Option<String>,
}

impl ValidationIssue {
    fn new(
        level: ValidationLevel,
        category: &str,
        message: impl Into<String>,
        path: impl Into<String>,
        suggestion: Option<&str>,
    ) -> Self {
        Self {
            level,
            category: category.to_string(),
            message: message.into(),
            path: path.into(),
            suggestion: suggestion.map(str::to_string),
        }
    }
}

/// True iff no issue in the set is `Error`-level (spec §7).
pub fn is_valid(issues: &[ValidationIssue]) -> bool {
    !issues.iter().any(|issue| issue.level == ValidationLevel::Error)
}

#[derive(Default)]
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate(&self, points: &[IoPoint]) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for (i, point) in points.iter().enumerate() {
            issues.extend(self.validate_point(point, i));
        }
        issues.extend(Self::check_conflicts(points));
        issues.extend(Self::check_safety_rules(points));
        issues
    }

    fn validate_point(&self, point: &IoPoint, index: usize) -> Vec<ValidationIssue> {
        let path = format!("io_points[{index}]");
        let mut issues = Vec::new();

        if !is_valid_name(&point.name) {
            issues.push(ValidationIssue::new(
                ValidationLevel::Error,
                "schema",
                format!("'{}' is not a valid point name", point.name),
                format!("{path}.name"),
                Some("names must start with a letter and contain only letters, digits, and underscores, up to 64 characters"),
            ));
        }

        if point.hardware_ref.as_str().is_empty() {
            issues.push(ValidationIssue::new(
                ValidationLevel::Error,
                "schema",
                "hardware_ref must not be empty",
                format!("{path}.hardware_ref"),
                None,
            ));
        }

        if let Some(initial) = point.initial_state {
            let mismatched = match (point.io_type.is_digital(), initial) {
                (true, Value::Analog(_)) => true,
                (false, Value::Digital(_)) => true,
                _ => false,
            };
            if mismatched {
                issues.push(ValidationIssue::new(
                    ValidationLevel::Warning,
                    "type_mismatch",
                    format!(
                        "{} I/O should have {} initial_state",
                        if point.io_type.is_digital() { "digital" } else { "analog" },
                        if point.io_type.is_digital() { "boolean" } else { "numeric" },
                    ),
                    format!("{path}.initial_state"),
                    Some("match initial_state's type to io_type"),
                ));
            }

            if point.io_type.is_input() {
                issues.push(ValidationIssue::new(
                    ValidationLevel::Info,
                    "unnecessary_field",
                    "input points don't need initial_state (read from hardware)",
                    format!("{path}.initial_state"),
                    Some("remove initial_state for input points"),
                ));
            }
        }

        issues
    }

    fn check_conflicts(points: &[IoPoint]) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        let mut names_seen = std::collections::HashSet::new();
        for (i, point) in points.iter().enumerate() {
            if !names_seen.insert(point.name.as_str()) {
                issues.push(ValidationIssue::new(
                    ValidationLevel::Error,
                    "duplicate_name",
                    format!("duplicate I/O point name '{}'", point.name),
                    format!("io_points[{i}].name"),
                    Some("each I/O point must have a unique name"),
                ));
            }
        }

        let mut refs_seen = std::collections::HashSet::new();
        for (i, point) in points.iter().enumerate() {
            if !refs_seen.insert(point.hardware_ref.as_str()) {
                issues.push(ValidationIssue::new(
                    ValidationLevel::Error,
                    "duplicate_hardware",
                    format!("duplicate hardware_ref '{}'", point.hardware_ref),
                    format!("io_points[{i}].hardware_ref"),
                    Some("each I/O point must use a unique hardware pin"),
                ));
            }
        }

        issues
    }

    fn check_safety_rules(points: &[IoPoint]) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        let is_emergency_stop = |point: &IoPoint| {
            let name = point.name.to_lowercase();
            name.contains("emergency") && name.contains("stop")
        };

        let mut any_output = false;
        let mut any_emergency_stop = false;

        for (i, point) in points.iter().enumerate() {
            let path = format!("io_points[{i}]");

            if is_emergency_stop(point) {
                any_emergency_stop = true;
                if point.io_type != IoType::DigitalInput {
                    issues.push(ValidationIssue::new(
                        ValidationLevel::Warning,
                        "safety",
                        "emergency stop should be digital_input",
                        format!("{path}.io_type"),
                        Some("emergency stops are typically digital inputs"),
                    ));
                }
                if !point.critical {
                    issues.push(ValidationIssue::new(
                        ValidationLevel::Warning,
                        "safety",
                        "emergency stop should be marked as critical",
                        format!("{path}.critical"),
                        Some("set critical: true for emergency stop points"),
                    ));
                }
            }

            if point.io_type.is_output() {
                any_output = true;
                if point.critical && point.initial_state.is_none() {
                    issues.push(ValidationIssue::new(
                        ValidationLevel::Warning,
                        "safety",
                        "critical output should have explicit initial_state",
                        format!("{path}.initial_state"),
                        Some("set a safe initial state for critical outputs"),
                    ));
                }
            }
        }

        if any_output && !any_emergency_stop {
            issues.push(ValidationIssue::new(
                ValidationLevel::Info,
                "safety",
                "system has outputs but no emergency stop points",
                "io_points",
                Some("consider adding emergency stop inputs for safety"),
            ));
        }

        issues
    }
}

fn is_valid_name(name: &str) -> bool {
    if name.is_empty() || name.len() > 64 {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use iocontrol_types::HardwareRef;
    use std::collections::HashMap;

    fn point(name: &str, io_type: IoType, hardware_ref: &str) -> IoPoint {
        IoPoint {
            name: name.to_string(),
            io_type,
            hardware_ref: HardwareRef::new(hardware_ref),
            critical: false,
            interrupt_enabled: false,
            pull_up: false,
            initial_state: None,
            description: String::new(),
            tags: HashMap::new(),
        }
    }

    #[test]
    fn rejects_malformed_names_and_empty_hardware_refs() {
        let mut bad = point("1bad", IoType::DigitalInput, "");
        bad.hardware_ref = HardwareRef::new("");
        let issues = ConfigValidator::new().validate(std::slice::from_ref(&bad));
        assert!(issues.iter().any(|i| i.category == "schema" && i.path.ends_with(".name")));
        assert!(issues.iter().any(|i| i.category == "schema" && i.path.ends_with(".hardware_ref")));
        assert!(!is_valid(&issues) || issues.iter().any(|i| i.level == ValidationLevel::Error));
    }

    #[test]
    fn flags_duplicate_names_and_hardware_refs() {
        let points = vec![
            point("relay_1", IoType::DigitalOutput, "sim.pin0"),
            point("relay_1", IoType::DigitalOutput, "sim.pin0"),
        ];
        let issues = ConfigValidator::new().validate(&points);
        assert!(issues.iter().any(|i| i.category == "duplicate_name"));
        assert!(issues.iter().any(|i| i.category == "duplicate_hardware"));
        assert!(!is_valid(&issues));
    }

    #[test]
    fn warns_on_initial_state_type_mismatch() {
        let mut p = point("relay_1", IoType::DigitalOutput, "sim.pin0");
        p.initial_state = Some(Value::Analog(1.0));
        let issues = ConfigValidator::new().validate(&[p]);
        assert!(issues.iter().any(|i| i.category == "type_mismatch"));
        assert!(is_valid(&issues)); // warning only, still valid
    }

    #[test]
    fn flags_emergency_stop_not_critical_digital_input() {
        let p = point("emergency_stop", IoType::DigitalOutput, "sim.pin0");
        let issues = ConfigValidator::new().validate(&[p]);
        assert!(issues.iter().any(|i| i.category == "safety" && i.message.contains("digital_input")));
        assert!(issues.iter().any(|i| i.category == "safety" && i.message.contains("critical")));
    }

    #[test]
    fn notes_missing_emergency_stop_when_outputs_exist() {
        let points = vec![point("relay_1", IoType::DigitalOutput, "sim.pin0")];
        let issues = ConfigValidator::new().validate(&points);
        assert!(issues
            .iter()
            .any(|i| i.level == ValidationLevel::Info && i.message.contains("emergency stop")));
    }

    #[test]
    fn is_idempotent() {
        let points = vec![point("relay_1", IoType::DigitalOutput, "sim.pin0")];
        let validator = ConfigValidator::new();
        let first = validator.validate(&points);
        let second = validator.validate(&points);
        assert_eq!(first.len(), second.len());
    }
}
