//! Matching engine: pairs schema declarations with actual config entries
//!
//! Declarations are not mutually exclusive. Every section declaration is
//! checked against every actual section its name predicate matches, and
//! every value declaration against every key its key predicate matches.
//! Violations are collected in declaration order, then config order, with
//! unexpected sections reported last.

use super::source::ConfigSource;
use crate::models::{
    schema::{Schema, SectionDeclaration},
    violation::{ValidationFailed, ValidationReport, Violation},
};
use tracing::{debug, debug_span, trace};

/// Validates configurations against one schema.
///
/// Holds no state between calls; the same validator can be reused and
/// shared across threads.
#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator<'a> {
    schema: &'a Schema,
}

impl<'a> SchemaValidator<'a> {
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &'a Schema {
        self.schema
    }

    /// Run a full pass over `config` and return every violation found
    pub fn validate<C: ConfigSource + ?Sized>(&self, config: &C) -> Vec<Violation> {
        let span = debug_span!("validate", declarations = self.schema.sections().len());
        let _enter = span.enter();

        let names = config.section_names();
        let mut claimed = vec![false; names.len()];
        let mut violations = Vec::new();

        for declaration in self.schema.sections() {
            let name = declaration.name();
            let matched: Vec<usize> = names
                .iter()
                .enumerate()
                .filter(|(_, n)| name.test(n))
                .map(|(i, _)| i)
                .collect();

            trace!(declaration = %name, matched = matched.len(), "Matched section declaration");

            // A missing required section is the only finding for its declaration
            if declaration.required() && matched.is_empty() {
                violations.push(Violation::missing_required_section(name));
                continue;
            }

            if let Some(count) = name.as_count() {
                let outcome = count.evaluate(names.iter().copied());
                if !outcome.accepted {
                    violations.push(Violation::count_mismatch(None, name, outcome.matched));
                }
            }

            for &i in &matched {
                claimed[i] = true;
                let entries = config.entries(names[i]);
                check_section(declaration, names[i], &entries, &mut violations);
            }
        }

        if !self.schema.allow_other_sections() {
            for (name, _) in names.iter().zip(&claimed).filter(|(_, c)| !**c) {
                violations.push(Violation::unexpected_section(name));
            }
        }

        debug!(
            sections = names.len(),
            violations = violations.len(),
            "Configuration validated"
        );
        violations
    }

    /// Same as [`SchemaValidator::validate`], wrapped in a report
    pub fn report<C: ConfigSource + ?Sized>(&self, config: &C) -> ValidationReport {
        ValidationReport::new(self.validate(config))
    }

    /// Fail with every violation when `config` does not satisfy the schema
    pub fn check<C: ConfigSource + ?Sized>(&self, config: &C) -> Result<(), ValidationFailed> {
        self.report(config).into_result()
    }
}

/// Validate `config` against `schema` in one call
pub fn validate<C: ConfigSource + ?Sized>(schema: &Schema, config: &C) -> Vec<Violation> {
    SchemaValidator::new(schema).validate(config)
}

fn check_section(
    declaration: &SectionDeclaration,
    section: &str,
    entries: &[(&str, &str)],
    violations: &mut Vec<Violation>,
) {
    let mut claimed = vec![false; entries.len()];

    for value in declaration.values() {
        let key = value.key();
        let matched: Vec<usize> = entries
            .iter()
            .enumerate()
            .filter(|(_, (k, _))| key.test(k))
            .map(|(i, _)| i)
            .collect();

        for &i in &matched {
            claimed[i] = true;
        }

        if value.required() && matched.is_empty() {
            violations.push(Violation::missing_required_key(section, key));
            continue;
        }

        // A counting key predicate speaks about the key population, not about
        // any single key, so its values are not checked.
        if let Some(count) = key.as_count() {
            let outcome = count.evaluate(entries.iter().map(|(k, _)| *k));
            if !outcome.accepted {
                violations.push(Violation::count_mismatch(Some(section), key, outcome.matched));
            }
            continue;
        }

        for &i in &matched {
            let (k, v) = entries[i];
            if !value.value().test(v) {
                trace!(section, key = k, value = v, "Value rejected");
                violations.push(Violation::invalid_value(section, k, v, value.value()));
            }
        }
    }

    if !declaration.allow_other_values() {
        for ((k, _), _) in entries.iter().zip(&claimed).filter(|(_, c)| !**c) {
            violations.push(Violation::unexpected_key(section, k));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::source::Config;
    use crate::models::{predicate::Predicate, violation::ViolationKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn kinds(violations: &[Violation]) -> Vec<ViolationKind> {
        violations.iter().map(|v| v.kind).collect()
    }

    #[test]
    fn test_empty_schema_accepts_anything() {
        let schema = Schema::new();
        let config = Config::new().with_section("A", [("k", "v")]);
        assert!(validate(&schema, &config).is_empty());
    }

    #[test]
    fn test_missing_required_section() {
        let mut schema = Schema::new();
        schema.section("GLOBAL", |_| {});
        schema.section("DATA", |_| {});
        schema.optional_section("OPTIONAL", |_| {});

        let config = Config::new()
            .with_section("GLOBAL", [("key", "value")])
            .with_section("OPTIONAL", Vec::<(String, String)>::new());

        let violations = validate(&schema, &config);
        assert_eq!(kinds(&violations), vec![ViolationKind::MissingRequiredSection]);
        assert!(violations[0].message.contains("\"DATA\""));
    }

    #[test]
    fn test_section_matches_several_declarations() {
        let mut schema = Schema::new();
        schema.section(Predicate::regex(r"SECT_\d+").unwrap(), |s| {
            s.value("key", Predicate::number());
        });
        schema.section("SECT_1", |s| {
            s.key("key").no_other();
        });

        let config = Config::new().with_section("SECT_1", [("key", "x"), ("extra", "1")]);

        let violations = validate(&schema, &config);
        assert_eq!(
            kinds(&violations),
            vec![ViolationKind::InvalidValue, ViolationKind::UnexpectedKey]
        );
        assert_eq!(violations[1].key.as_deref(), Some("extra"));
    }

    #[test]
    fn test_unexpected_keys_judged_per_declaration() {
        let mut schema = Schema::new();
        schema.section("S", |s| {
            s.key("a").no_other();
        });
        schema.section("S", |s| {
            s.key("b");
        });

        let config = Config::new().with_section("S", [("a", "1"), ("b", "2")]);

        let violations = validate(&schema, &config);
        assert_eq!(kinds(&violations), vec![ViolationKind::UnexpectedKey]);
        assert_eq!(violations[0].key.as_deref(), Some("b"));
    }

    #[test]
    fn test_required_value_missing() {
        let mut schema = Schema::new();
        schema.section("GLOBAL", |s| {
            s.required_value("key", Predicate::any())
                .value("optional", Predicate::any())
                .no_other();
        });

        let ok = Config::new().with_section("GLOBAL", [("key", "value")]);
        assert!(validate(&schema, &ok).is_empty());

        let missing = Config::new().with_section("GLOBAL", [("optional", "x")]);
        let violations = validate(&schema, &missing);
        assert_eq!(kinds(&violations), vec![ViolationKind::MissingRequiredKey]);
        assert_eq!(violations[0].section.as_deref(), Some("GLOBAL"));
    }

    #[test]
    fn test_count_on_section_names() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut schema = Schema::new();
        schema.optional_section(
            Predicate::count(Predicate::regex(r"SECT_\d+").unwrap(), move |n| {
                seen.fetch_add(1, Ordering::SeqCst);
                n <= 1
            }),
            |s| {
                s.value("key", "value");
            },
        );

        let config = Config::new()
            .with_section("SECT_1", [("key", "value")])
            .with_section("SECT_2", [("key", "wrong")]);

        let violations = validate(&schema, &config);
        assert_eq!(
            kinds(&violations),
            vec![ViolationKind::CountMismatch, ViolationKind::InvalidValue]
        );
        assert!(violations[0].section.is_none());
        assert!(violations[0].message.contains("matched 2 section(s)"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_count_on_keys_skips_value_checks() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut schema = Schema::new();
        schema.section("S", |s| {
            s.value(
                Predicate::count(Predicate::regex("x.*").unwrap(), move |n| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    n == 1
                }),
                Predicate::number(),
            )
            .no_other();
        });

        let config = Config::new().with_section("S", [("x1", "not a number"), ("x2", "b")]);

        let violations = validate(&schema, &config);
        assert_eq!(kinds(&violations), vec![ViolationKind::CountMismatch]);
        assert_eq!(violations[0].section.as_deref(), Some("S"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_required_count_section_missing_reports_once() {
        let mut schema = Schema::new();
        schema.section(
            Predicate::count(Predicate::regex("REQ.*").unwrap(), |n| n >= 1),
            |_| {},
        );

        let config = Config::new().with_section("OTHER", [("k", "v")]);

        let violations = validate(&schema, &config);
        assert_eq!(kinds(&violations), vec![ViolationKind::MissingRequiredSection]);
    }

    #[test]
    fn test_required_count_key_missing_reports_once() {
        let mut schema = Schema::new();
        schema.section("S", |s| {
            s.required_value(
                Predicate::count(Predicate::regex("x.*").unwrap(), |n| n >= 1),
                Predicate::any(),
            );
        });

        let config = Config::new().with_section("S", [("y", "1")]);

        let violations = validate(&schema, &config);
        assert_eq!(kinds(&violations), vec![ViolationKind::MissingRequiredKey]);
        assert_eq!(violations[0].section.as_deref(), Some("S"));
    }

    #[test]
    fn test_violation_order_follows_declarations_then_config() {
        let mut schema = Schema::new();
        schema.section("A", |s| {
            s.value("k2", "ok").value("k1", "ok");
        });
        schema.section("MISSING", |_| {});
        schema.no_other();

        let config = Config::new()
            .with_section("Z", Vec::<(String, String)>::new())
            .with_section("A", [("k1", "bad"), ("k2", "bad")])
            .with_section("Y", Vec::<(String, String)>::new());

        let violations = validate(&schema, &config);
        let summary: Vec<_> = violations
            .iter()
            .map(|v| (v.kind, v.section.as_deref(), v.key.as_deref()))
            .collect();

        assert_eq!(
            summary,
            vec![
                (ViolationKind::InvalidValue, Some("A"), Some("k2")),
                (ViolationKind::InvalidValue, Some("A"), Some("k1")),
                (ViolationKind::MissingRequiredSection, None, None),
                (ViolationKind::UnexpectedSection, Some("Z"), None),
                (ViolationKind::UnexpectedSection, Some("Y"), None),
            ]
        );
    }

    #[test]
    fn test_check_and_report() {
        let mut schema = Schema::new();
        schema.section("GLOBAL", |_| {});
        let validator = SchemaValidator::new(&schema);

        let config = Config::new().with_section("GLOBAL", [("k", "v")]);
        assert!(validator.check(&config).is_ok());
        assert!(validator.report(&config).is_valid());

        let err = validator.check(&Config::new()).unwrap_err();
        assert_eq!(err.violations.len(), 1);
    }
}
