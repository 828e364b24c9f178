//! Configuration sources and the schema validator

pub mod source;
pub mod toml_source;
pub mod validator;

pub use source::{Config, ConfigSource, Section};
pub use toml_source::{SourceError, TomlConfig};
pub use validator::{validate, SchemaValidator};
