use super::source::{Config, ConfigSource};
use std::path::Path;
use thiserror::Error;
use toml_edit::{DocumentMut, Item, Table, TableLike, Value};
use tracing::debug;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("File IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml_edit::TomlError),
    #[error("Top-level key '{key}' is not a table; only sections may appear at the top level")]
    TopLevelValue { key: String },
}

/// Sectioned view of a TOML document.
///
/// Top-level tables become sections in document order. A table nested inside
/// a section becomes its own section named by the dotted path (`[a.b]` is
/// section `"a.b"`) and is listed right after its parent. A parent that the
/// document only implies through a nested header, such as `server` in a
/// lone `[server.tls]`, is not a section.
///
/// String values are taken verbatim; any other value is kept as written in
/// the document, so `1`, `true` and `[1, 2]` reach the predicates as `"1"`,
/// `"true"` and `"[1, 2]"`.
#[derive(Debug, Clone, Default)]
pub struct TomlConfig {
    config: Config,
}

impl TomlConfig {
    /// Parse TOML text with `toml_edit` and lay it out as sections
    pub fn parse(content: &str) -> Result<Self, SourceError> {
        let document: DocumentMut = content.parse()?;
        Self::from_document(&document)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        debug!(path = %path.display(), "Loaded TOML configuration");
        Self::parse(&content)
    }

    pub fn from_document(document: &DocumentMut) -> Result<Self, SourceError> {
        let mut config = Config::new();

        for (name, item) in document.as_table().iter() {
            match item {
                Item::Table(table) => add_table(&mut config, name.to_string(), table),
                Item::Value(Value::InlineTable(table)) => {
                    add_section(&mut config, name.to_string(), table)
                }
                _ => {
                    return Err(SourceError::TopLevelValue {
                        key: name.to_string(),
                    })
                }
            }
        }

        debug!(sections = config.len(), "Built sections from TOML document");
        Ok(Self { config })
    }

    /// The underlying in-memory configuration
    pub fn into_config(self) -> Config {
        self.config
    }
}

fn add_table(config: &mut Config, name: String, table: &Table) {
    let has_values = table.iter().any(|(_, item)| !is_table(item));
    if table.is_implicit() && !has_values {
        for (key, item) in table.iter() {
            add_nested(config, &name, key, item);
        }
        return;
    }

    add_section(config, name, table);
}

fn add_section(config: &mut Config, name: String, table: &dyn TableLike) {
    let mut entries = Vec::new();
    for (key, item) in table.iter() {
        if let Some(rendered) = render(item) {
            entries.push((key.to_string(), rendered));
        }
    }

    config.set_section(name.clone(), entries);
    for (key, item) in table.iter() {
        add_nested(config, &name, key, item);
    }
}

fn add_nested(config: &mut Config, parent: &str, key: &str, item: &Item) {
    let name = format!("{}.{}", parent, key);
    match item {
        Item::Table(table) => add_table(config, name, table),
        Item::Value(Value::InlineTable(table)) => add_section(config, name, table),
        _ => {}
    }
}

fn is_table(item: &Item) -> bool {
    matches!(item, Item::Table(_) | Item::Value(Value::InlineTable(_)))
}

/// Render a non-table item as the string the predicates see
fn render(item: &Item) -> Option<String> {
    match item {
        Item::Value(Value::InlineTable(_)) | Item::Table(_) | Item::None => None,
        Item::Value(Value::String(s)) => Some(s.value().clone()),
        Item::Value(value) => {
            let mut value = value.clone();
            value.decor_mut().clear();
            Some(value.to_string())
        }
        Item::ArrayOfTables(tables) => Some(tables.clone().into_array().to_string()),
    }
}

impl ConfigSource for TomlConfig {
    fn section_names(&self) -> Vec<&str> {
        self.config.section_names()
    }

    fn entries(&self, section: &str) -> Vec<(&str, &str)> {
        self.config.entries(section)
    }
}
