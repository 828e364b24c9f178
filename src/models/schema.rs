use super::predicate::Predicate;

/// Expected shape of a configuration: which sections may or must appear and
/// what their keys and values look like.
///
/// A schema is assembled once through [`Schema::section`] and friends and is
/// read-only afterwards, so it can be shared freely between validations and
/// threads. Declarations are not checked for overlap; duplicates all apply.
#[derive(Debug, Clone)]
pub struct Schema {
    sections: Vec<SectionDeclaration>,
    allow_other_sections: bool,
}

impl Schema {
    pub fn new() -> Self {
        Self {
            sections: Vec::new(),
            allow_other_sections: true,
        }
    }

    /// Declare a required section whose name satisfies `name`.
    ///
    /// Value declarations made through the builder handed to `build` belong to
    /// this section. The section is attached once `build` returns, and
    /// whatever `build` returns is passed back so it can propagate errors.
    pub fn section<P, F, R>(&mut self, name: P, build: F) -> R
    where
        P: Into<Predicate>,
        F: FnOnce(&mut SectionBuilder) -> R,
    {
        self.declare(name.into(), true, build)
    }

    /// Declare a section that may be absent
    pub fn optional_section<P, F, R>(&mut self, name: P, build: F) -> R
    where
        P: Into<Predicate>,
        F: FnOnce(&mut SectionBuilder) -> R,
    {
        self.declare(name.into(), false, build)
    }

    /// Reject sections that match no declaration
    pub fn no_other(&mut self) -> &mut Self {
        self.allow_other_sections = false;
        self
    }

    pub fn sections(&self) -> &[SectionDeclaration] {
        &self.sections
    }

    pub fn allow_other_sections(&self) -> bool {
        self.allow_other_sections
    }

    fn declare<F, R>(&mut self, name: Predicate, required: bool, build: F) -> R
    where
        F: FnOnce(&mut SectionBuilder) -> R,
    {
        let mut builder = SectionBuilder {
            declaration: SectionDeclaration {
                name,
                required,
                values: Vec::new(),
                allow_other_values: true,
            },
        };

        let result = build(&mut builder);
        self.sections.push(builder.declaration);
        result
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::new()
    }
}

/// Declared section: a name predicate plus the rules for its entries
#[derive(Debug, Clone)]
pub struct SectionDeclaration {
    name: Predicate,
    required: bool,
    values: Vec<ValueDeclaration>,
    allow_other_values: bool,
}

impl SectionDeclaration {
    pub fn name(&self) -> &Predicate {
        &self.name
    }

    pub fn required(&self) -> bool {
        self.required
    }

    pub fn values(&self) -> &[ValueDeclaration] {
        &self.values
    }

    pub fn allow_other_values(&self) -> bool {
        self.allow_other_values
    }
}

/// Declared key pattern inside a section.
///
/// Every actual key matching `key` must carry a value matching `value`.
#[derive(Debug, Clone)]
pub struct ValueDeclaration {
    key: Predicate,
    value: Predicate,
    required: bool,
}

impl ValueDeclaration {
    pub fn key(&self) -> &Predicate {
        &self.key
    }

    pub fn value(&self) -> &Predicate {
        &self.value
    }

    /// Whether at least one key must match
    pub fn required(&self) -> bool {
        self.required
    }
}

/// Scoped builder for the entries of one section declaration
#[derive(Debug)]
pub struct SectionBuilder {
    declaration: SectionDeclaration,
}

impl SectionBuilder {
    /// Declare that keys matching `key` must hold values matching `value`.
    ///
    /// Keys may be absent; use [`SectionBuilder::required_value`] to demand
    /// at least one.
    pub fn value<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<Predicate>,
        V: Into<Predicate>,
    {
        self.push(key.into(), value.into(), false)
    }

    /// Declare keys matching `key` with any value
    pub fn key<K: Into<Predicate>>(&mut self, key: K) -> &mut Self {
        self.push(key.into(), Predicate::Any, false)
    }

    /// Like [`SectionBuilder::value`], but at least one key must match
    pub fn required_value<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<Predicate>,
        V: Into<Predicate>,
    {
        self.push(key.into(), value.into(), true)
    }

    /// Reject keys that match no value declaration of this section
    pub fn no_other(&mut self) -> &mut Self {
        self.declaration.allow_other_values = false;
        self
    }

    fn push(&mut self, key: Predicate, value: Predicate, required: bool) -> &mut Self {
        self.declaration.values.push(ValueDeclaration {
            key,
            value,
            required,
        });
        self
    }
}
