//! configchecker - declarative schema validation for sectioned configuration
//!
//! A schema is built once from composable predicates over section names, key
//! names and values. It is then matched against any already-parsed
//! configuration that exposes ordered sections of key/value strings. Every
//! validation pass reports the complete, deterministically ordered list of
//! violations.
//!
//! ```
//! use configchecker::{Config, Predicate, Schema, SchemaValidator};
//!
//! let mut schema = Schema::new();
//! schema.section("GLOBAL", |s| {
//!     s.value("key", "value").no_other();
//! });
//! schema.optional_section(Predicate::regex(r"SECT_\d+")?, |s| {
//!     s.value(Predicate::regex(r"item_\d+")?, Predicate::number());
//!     Ok::<_, configchecker::ConfigurationError>(())
//! })?;
//! schema.no_other();
//!
//! let config = Config::new()
//!     .with_section("GLOBAL", [("key", "value")])
//!     .with_section("SECT_1", [("item_1", "10")]);
//!
//! let violations = SchemaValidator::new(&schema).validate(&config);
//! assert!(violations.is_empty());
//! # Ok::<(), configchecker::ConfigCheckerError>(())
//! ```

pub mod config;
pub mod logging;
pub mod models;

pub use config::{validate, Config, ConfigSource, SchemaValidator, Section, SourceError, TomlConfig};
pub use models::*;

/// Result type alias for configchecker operations
pub type Result<T> = std::result::Result<T, ConfigCheckerError>;

/// Error types raised by configchecker operations.
///
/// Validation findings are never raised as errors on their own; they are
/// only turned into [`ValidationFailed`] when a caller asks for it.
#[derive(thiserror::Error, Debug)]
pub enum ConfigCheckerError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Validation(#[from] ValidationFailed),
}
