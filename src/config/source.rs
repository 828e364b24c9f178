use indexmap::IndexMap;

/// Read-only view of an already-parsed sectioned configuration.
///
/// This is the whole contract the validator needs from a parser: section
/// names in document order, and each section's key/value pairs in document
/// order. Validation never mutates a source.
pub trait ConfigSource {
    /// Section names, in order
    fn section_names(&self) -> Vec<&str>;

    /// Key/value pairs of `section`, in order; empty for an unknown section
    fn entries(&self, section: &str) -> Vec<(&str, &str)>;
}

/// One section of an in-memory [`Config`]: ordered key/value pairs
#[derive(Debug, Clone, Default)]
pub struct Section {
    entries: IndexMap<String, String>,
}

impl Section {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Set `key`; an existing key keeps its position
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// In-memory configuration that keeps sections and keys in insertion order.
///
/// Setting a section or key a second time replaces the earlier value but
/// keeps its original position, like an INI parser would.
#[derive(Debug, Clone, Default)]
pub struct Config {
    sections: IndexMap<String, Section>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Config::set_section`]
    pub fn with_section<N, I, K, V>(mut self, name: N, entries: I) -> Self
    where
        N: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.set_section(name, entries);
        self
    }

    /// Add a section, or merge `entries` into an existing one
    pub fn set_section<N, I, K, V>(&mut self, name: N, entries: I) -> &mut Section
    where
        N: Into<String>,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let section = self.sections.entry(name.into()).or_default();
        for (key, value) in entries {
            section.set(key, value);
        }
        section
    }

    /// Set one key, creating the section if needed
    pub fn set(&mut self, section: &str, key: impl Into<String>, value: impl Into<String>) {
        match self.sections.get_mut(section) {
            Some(existing) => existing.set(key, value),
            None => self.sections.entry(section.to_string()).or_default().set(key, value),
        }
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    /// Sections with their names, in order
    pub fn sections(&self) -> impl Iterator<Item = (&str, &Section)> {
        self.sections.iter().map(|(name, s)| (name.as_str(), s))
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl ConfigSource for Config {
    fn section_names(&self) -> Vec<&str> {
        self.sections.keys().map(String::as_str).collect()
    }

    fn entries(&self, section: &str) -> Vec<(&str, &str)> {
        self.section(section)
            .map(|s| s.iter().collect())
            .unwrap_or_default()
    }
}
