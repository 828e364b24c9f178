use serde::{Deserialize, Serialize};
use std::fmt;

/// Kinds of mismatch between a schema and an actual configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// A required section declaration matched no actual section
    MissingRequiredSection,
    /// An actual section matched no declaration while others are forbidden
    UnexpectedSection,
    /// A value failed its declared value predicate
    InvalidValue,
    /// An actual key matched no value declaration while others are forbidden
    UnexpectedKey,
    /// A counting predicate rejected the number of matches in a group
    CountMismatch,
    /// A required value declaration matched no key in a section
    MissingRequiredKey,
}

impl ViolationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationKind::MissingRequiredSection => "missing_required_section",
            ViolationKind::UnexpectedSection => "unexpected_section",
            ViolationKind::InvalidValue => "invalid_value",
            ViolationKind::UnexpectedKey => "unexpected_key",
            ViolationKind::CountMismatch => "count_mismatch",
            ViolationKind::MissingRequiredKey => "missing_required_key",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reported mismatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub message: String,
}

impl Violation {
    pub fn missing_required_section(declared: impl fmt::Display) -> Self {
        Self {
            kind: ViolationKind::MissingRequiredSection,
            section: None,
            key: None,
            message: format!("No section matches required declaration {}", declared),
        }
    }

    pub fn unexpected_section(section: &str) -> Self {
        Self {
            kind: ViolationKind::UnexpectedSection,
            section: Some(section.to_string()),
            key: None,
            message: format!("Unexpected section \"{}\"", section),
        }
    }

    pub fn invalid_value(section: &str, key: &str, value: &str, declared: impl fmt::Display) -> Self {
        Self {
            kind: ViolationKind::InvalidValue,
            section: Some(section.to_string()),
            key: Some(key.to_string()),
            message: format!(
                "Wrong value in section \"{}\", key \"{}\": \"{}\" (expected {})",
                section, key, value, declared
            ),
        }
    }

    pub fn unexpected_key(section: &str, key: &str) -> Self {
        Self {
            kind: ViolationKind::UnexpectedKey,
            section: Some(section.to_string()),
            key: Some(key.to_string()),
            message: format!("Unexpected key \"{}\" in section \"{}\"", key, section),
        }
    }

    /// Count rejected over section names (`section` is `None`) or over the
    /// keys of one section
    pub fn count_mismatch(section: Option<&str>, declared: impl fmt::Display, matched: usize) -> Self {
        let message = match section {
            Some(name) => format!(
                "Key count rejected in section \"{}\": {} matched {} key(s)",
                name, declared, matched
            ),
            None => format!(
                "Section count rejected: {} matched {} section(s)",
                declared, matched
            ),
        };

        Self {
            kind: ViolationKind::CountMismatch,
            section: section.map(str::to_string),
            key: None,
            message,
        }
    }

    pub fn missing_required_key(section: &str, declared: impl fmt::Display) -> Self {
        Self {
            kind: ViolationKind::MissingRequiredKey,
            section: Some(section.to_string()),
            key: None,
            message: format!(
                "No key in section \"{}\" matches required declaration {}",
                section, declared
            ),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}

/// Ordered outcome of one validation pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn new(violations: Vec<Violation>) -> Self {
        Self { violations }
    }

    /// A configuration is valid exactly when nothing was reported
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.violations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Violation> {
        self.violations.iter()
    }

    /// Violations of one kind, in report order
    pub fn of_kind(&self, kind: ViolationKind) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.kind == kind)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Turn a non-empty report into an error
    pub fn into_result(self) -> Result<(), ValidationFailed> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationFailed {
                violations: self.violations,
            })
        }
    }
}

impl From<Vec<Violation>> for ValidationReport {
    fn from(violations: Vec<Violation>) -> Self {
        Self::new(violations)
    }
}

impl IntoIterator for ValidationReport {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationReport {
    type Item = &'a Violation;
    type IntoIter = std::slice::Iter<'a, Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.violations.iter()
    }
}

/// Configuration did not satisfy its schema
#[derive(Debug, Clone, thiserror::Error)]
#[error("Configuration failed validation with {} violation(s):\n{}", .violations.len(), render(.violations))]
pub struct ValidationFailed {
    pub violations: Vec<Violation>,
}

fn render(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("  - {}", v))
        .collect::<Vec<_>>()
        .join("\n")
}
