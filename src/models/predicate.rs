use regex::Regex;
use std::fmt;
use std::ops::{BitAnd, BitOr, Not};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::warn;

/// A pure boolean test over a section name, key name or value.
///
/// Predicates are immutable once built and are cheap to clone. Testing never
/// fails: anything a predicate cannot make sense of is simply a non-match.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Accepts every candidate
    Any,
    /// Exact (or case-insensitive) comparison with a fixed string
    Equals(StringPredicate),
    /// Full match against a compiled regular expression
    Regex(RegexPredicate),
    /// Non-empty string of ASCII digits
    Number,
    /// Logical NOT
    Not(Box<Predicate>),
    /// Logical AND; an empty list accepts everything
    And(Vec<Predicate>),
    /// Logical OR; an empty list accepts nothing
    Or(Vec<Predicate>),
    /// Counts matches over a whole group of siblings
    Count(CountPredicate),
    /// Named caller-supplied test
    Custom(CustomPredicate),
}

impl Predicate {
    /// Predicate that accepts any candidate
    pub fn any() -> Self {
        Predicate::Any
    }

    /// Case-sensitive string equality
    pub fn equals(expected: impl Into<String>) -> Self {
        Predicate::Equals(StringPredicate {
            expected: expected.into(),
            ignore_case: false,
        })
    }

    /// Case-insensitive string equality under full Unicode case folding,
    /// so `"STRASSE"` equals `"straße"`
    pub fn equals_ignore_case(expected: impl Into<String>) -> Self {
        Predicate::Equals(StringPredicate {
            expected: expected.into(),
            ignore_case: true,
        })
    }

    /// Compile a regular expression that must match the whole candidate.
    ///
    /// A malformed pattern is a mistake in the schema itself and is reported
    /// immediately as [`ConfigurationError::InvalidPattern`].
    pub fn regex(pattern: impl Into<String>) -> Result<Self, ConfigurationError> {
        let source = pattern.into();
        let invalid = |e: regex::Error| ConfigurationError::InvalidPattern {
            pattern: source.clone(),
            source: e,
        };

        // Compile unanchored first so an unbalanced pattern cannot escape the anchors
        Regex::new(&source).map_err(invalid)?;
        let regex = Regex::new(&format!("^(?:{})$", source)).map_err(invalid)?;

        Ok(Predicate::Regex(RegexPredicate { source, regex }))
    }

    /// Non-negative integer written with ASCII digits only.
    ///
    /// Signs, whitespace and separators are rejected, the empty string is
    /// rejected, and leading zeros are accepted (`"007"` is a number).
    pub fn number() -> Self {
        Predicate::Number
    }

    /// Logical NOT of `predicate`
    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    /// Accepts a candidate only if every predicate accepts it
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(predicates.into_iter().collect())
    }

    /// Accepts a candidate if at least one predicate accepts it
    pub fn any_of(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(predicates.into_iter().collect())
    }

    /// Count how many siblings satisfy `predicate` and hand the total to
    /// `accept`.
    ///
    /// When used as the top-level name predicate of a section declaration, or
    /// as the key predicate of a value declaration, the validator evaluates
    /// `accept` once over the full group of section names or keys. Tested
    /// against a single string it behaves exactly like `predicate`.
    pub fn count<F>(predicate: Predicate, accept: F) -> Self
    where
        F: Fn(usize) -> bool + Send + Sync + 'static,
    {
        Predicate::Count(CountPredicate {
            inner: Box::new(predicate),
            accept: Arc::new(accept),
        })
    }

    /// Wrap an arbitrary function as a named predicate.
    ///
    /// A panic inside `test` counts as a non-match and is logged as a
    /// warning. The process panic hook still runs first, so the default hook
    /// prints the panic message to stderr on every such call; install a quiet
    /// hook with [`std::panic::set_hook`] if that output is unwanted.
    pub fn custom<F>(name: impl Into<String>, test: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Predicate::Custom(CustomPredicate {
            name: name.into(),
            test: Arc::new(test),
        })
    }

    /// Test a single candidate
    pub fn test(&self, candidate: &str) -> bool {
        match self {
            Predicate::Any => true,
            Predicate::Equals(p) => p.test(candidate),
            Predicate::Regex(p) => p.regex.is_match(candidate),
            Predicate::Number => {
                !candidate.is_empty() && candidate.bytes().all(|b| b.is_ascii_digit())
            }
            Predicate::Not(p) => !p.test(candidate),
            Predicate::And(ps) => ps.iter().all(|p| p.test(candidate)),
            Predicate::Or(ps) => ps.iter().any(|p| p.test(candidate)),
            Predicate::Count(p) => p.inner.test(candidate),
            Predicate::Custom(p) => p.test(candidate),
        }
    }

    /// The counting combinator, if this predicate is one at the top level
    pub fn as_count(&self) -> Option<&CountPredicate> {
        match self {
            Predicate::Count(p) => Some(p),
            _ => None,
        }
    }
}

impl Default for Predicate {
    fn default() -> Self {
        Predicate::Any
    }
}

impl From<&str> for Predicate {
    fn from(expected: &str) -> Self {
        Predicate::equals(expected)
    }
}

impl From<String> for Predicate {
    fn from(expected: String) -> Self {
        Predicate::equals(expected)
    }
}

impl From<&String> for Predicate {
    fn from(expected: &String) -> Self {
        Predicate::equals(expected.as_str())
    }
}

impl Not for Predicate {
    type Output = Predicate;

    fn not(self) -> Predicate {
        Predicate::not(self)
    }
}

impl BitAnd for Predicate {
    type Output = Predicate;

    fn bitand(self, rhs: Predicate) -> Predicate {
        match self {
            Predicate::And(mut ps) => {
                ps.push(rhs);
                Predicate::And(ps)
            }
            lhs => Predicate::And(vec![lhs, rhs]),
        }
    }
}

impl BitOr for Predicate {
    type Output = Predicate;

    fn bitor(self, rhs: Predicate) -> Predicate {
        match self {
            Predicate::Or(mut ps) => {
                ps.push(rhs);
                Predicate::Or(ps)
            }
            lhs => Predicate::Or(vec![lhs, rhs]),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Any => write!(f, "any"),
            Predicate::Equals(p) if p.ignore_case => write!(f, "{:?}i", p.expected),
            Predicate::Equals(p) => write!(f, "{:?}", p.expected),
            Predicate::Regex(p) => write!(f, "/{}/", p.source),
            Predicate::Number => write!(f, "number"),
            Predicate::Not(p) => write!(f, "not({})", p),
            Predicate::And(ps) => write_list(f, "and", ps),
            Predicate::Or(ps) => write_list(f, "or", ps),
            Predicate::Count(p) => write!(f, "count({})", p.inner),
            Predicate::Custom(p) => write!(f, "{}", p.name),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, op: &str, predicates: &[Predicate]) -> fmt::Result {
    write!(f, "{}(", op)?;
    for (i, p) in predicates.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", p)?;
    }
    write!(f, ")")
}

/// String equality test
#[derive(Debug, Clone)]
pub struct StringPredicate {
    expected: String,
    ignore_case: bool,
}

impl StringPredicate {
    fn test(&self, candidate: &str) -> bool {
        if self.ignore_case {
            return unicase::eq(self.expected.as_str(), candidate);
        }

        self.expected == candidate
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn ignore_case(&self) -> bool {
        self.ignore_case
    }
}

/// Anchored regular expression test
#[derive(Debug, Clone)]
pub struct RegexPredicate {
    source: String,
    regex: Regex,
}

impl RegexPredicate {
    /// The pattern as written by the schema author, without anchors
    pub fn pattern(&self) -> &str {
        &self.source
    }
}

/// Counting combinator evaluated over a whole group of candidates
#[derive(Clone)]
pub struct CountPredicate {
    inner: Box<Predicate>,
    accept: Arc<dyn Fn(usize) -> bool + Send + Sync>,
}

/// Result of evaluating a [`CountPredicate`] over a candidate group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountOutcome {
    pub matched: usize,
    pub accepted: bool,
}

impl CountPredicate {
    /// The predicate whose matches are counted
    pub fn inner(&self) -> &Predicate {
        &self.inner
    }

    /// Count matches in `candidates` and run the acceptance function once
    pub fn evaluate<'a, I>(&self, candidates: I) -> CountOutcome
    where
        I: IntoIterator<Item = &'a str>,
    {
        let matched = candidates
            .into_iter()
            .filter(|c| self.inner.test(c))
            .count();

        CountOutcome {
            matched,
            accepted: (self.accept)(matched),
        }
    }
}

impl fmt::Debug for CountPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CountPredicate")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}

/// Named caller-supplied predicate
#[derive(Clone)]
pub struct CustomPredicate {
    name: String,
    test: Arc<dyn Fn(&str) -> bool + Send + Sync>,
}

impl CustomPredicate {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn test(&self, candidate: &str) -> bool {
        match panic::catch_unwind(AssertUnwindSafe(|| (self.test)(candidate))) {
            Ok(result) => result,
            Err(_) => {
                warn!(predicate = %self.name, candidate, "Custom predicate panicked, treating as no match");
                false
            }
        }
    }
}

impl fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomPredicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Mistakes in the schema itself, reported when the schema is built
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid regex pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_any_accepts_everything() {
        let p = Predicate::any();
        assert!(p.test("value"));
        assert!(p.test(""));
        assert!(matches!(Predicate::default(), Predicate::Any));
    }

    #[test]
    fn test_string_equality() {
        let p = Predicate::equals("string");
        assert!(p.test("string"));
        assert!(!p.test("String"));
        assert!(!p.test("wrong"));

        let p = Predicate::equals_ignore_case("string");
        assert!(p.test("string"));
        assert!(p.test("String"));
        assert!(!p.test("wrong"));

        let p = Predicate::equals_ignore_case("STRASSE");
        assert!(p.test("straße"));
        assert!(p.test("Strasse"));
        assert!(!p.test("strase"));
    }

    #[test]
    fn test_literal_is_case_sensitive_equality() {
        let p: Predicate = "GLOBAL".into();
        assert!(p.test("GLOBAL"));
        assert!(!p.test("global"));
    }

    #[test]
    fn test_regex_full_match() {
        let p = Predicate::regex(r"[a-zA-Z]+").unwrap();
        assert!(p.test("string"));
        assert!(p.test("SomeString"));
        assert!(!p.test("some string"));
        assert!(!p.test("str123"));
        assert!(!p.test("123str"));
    }

    #[test]
    fn test_regex_alternation_is_anchored_as_a_whole() {
        let p = Predicate::regex("a|b").unwrap();
        assert!(p.test("a"));
        assert!(p.test("b"));
        assert!(!p.test("ab"));
        assert!(!p.test("xa"));
    }

    #[test]
    fn test_regex_cannot_escape_anchors() {
        assert!(Predicate::regex("a)|(b").is_err());
    }

    #[test]
    fn test_invalid_regex_pattern() {
        let err = Predicate::regex("[invalid regex").unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidPattern { ref pattern, .. } if pattern == "[invalid regex"));
        assert!(err.to_string().contains("Invalid regex pattern"));
    }

    #[test]
    fn test_number_policy() {
        let p = Predicate::number();
        assert!(p.test("42"));
        assert!(p.test("0"));
        assert!(p.test("007"));
        assert!(p.test("000"));
        assert!(p.test("123456789012345678901234567890"));

        assert!(!p.test(""));
        assert!(!p.test("-12"));
        assert!(!p.test("+12"));
        assert!(!p.test(" 12"));
        assert!(!p.test("12 "));
        assert!(!p.test("1_000"));
        assert!(!p.test("1.5"));
        assert!(!p.test("wrong"));
        assert!(!p.test("٣"));
    }

    #[test]
    fn test_not() {
        let p = Predicate::not(Predicate::equals("wrong"));
        assert!(p.test("not wrong"));
        assert!(p.test("ok"));
        assert!(!p.test("wrong"));
    }

    #[test]
    fn test_and_or() {
        let and = Predicate::all([
            Predicate::regex(r".*a.*").unwrap(),
            Predicate::regex(r".*b.*").unwrap(),
        ]);
        assert!(and.test("xxabyy"));
        assert!(and.test("bxxayy"));
        assert!(!and.test("xxayy"));
        assert!(!and.test("xxbyy"));

        let or = Predicate::any_of([Predicate::equals("ok"), Predicate::equals("fail")]);
        assert!(or.test("ok"));
        assert!(or.test("fail"));
        assert!(!or.test("error"));
    }

    #[test]
    fn test_empty_combinators() {
        assert!(Predicate::all(Vec::new()).test("anything"));
        assert!(!Predicate::any_of(Vec::new()).test("anything"));
    }

    #[test]
    fn test_operators_flatten() {
        let p = Predicate::equals("a") | Predicate::equals("b") | Predicate::equals("c");
        assert_eq!(p.to_string(), r#"or("a", "b", "c")"#);

        let p = Predicate::regex("a.*").unwrap() & !Predicate::equals("ab");
        assert_eq!(p.to_string(), r#"and(/a.*/, not("ab"))"#);
        assert!(p.test("ac"));
        assert!(!p.test("ab"));
    }

    #[test]
    fn test_count_evaluates_accept_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let p = Predicate::count(Predicate::equals("ok"), move |n| {
            seen.fetch_add(1, Ordering::SeqCst);
            n > 1
        });
        let count = p.as_count().unwrap();

        let outcome = count.evaluate(["ok", "fail"]);
        assert_eq!(outcome, CountOutcome { matched: 1, accepted: false });

        let outcome = count.evaluate(["ok", "ok", "fail"]);
        assert_eq!(outcome, CountOutcome { matched: 2, accepted: true });

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_count_tests_like_inner() {
        let p = Predicate::count(Predicate::equals("ok"), |n| n == 0);
        assert!(p.test("ok"));
        assert!(!p.test("fail"));
        assert!(Predicate::any().as_count().is_none());
    }

    #[test]
    fn test_custom_predicate() {
        let p = Predicate::custom("even_length", |s| s.len() % 2 == 0);
        assert!(p.test("ab"));
        assert!(!p.test("abc"));
        assert_eq!(p.to_string(), "even_length");
    }

    #[test]
    fn test_custom_predicate_panic_is_no_match() {
        let p = Predicate::custom("explodes", |s| s.parse::<u8>().map(|_| true).unwrap());
        assert!(p.test("12"));
        assert!(!p.test("boom"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Predicate::any().to_string(), "any");
        assert_eq!(Predicate::equals("value").to_string(), r#""value""#);
        assert_eq!(Predicate::equals_ignore_case("value").to_string(), r#""value"i"#);
        assert_eq!(Predicate::regex(r"key_\d+").unwrap().to_string(), r"/key_\d+/");
        assert_eq!(Predicate::number().to_string(), "number");
        assert_eq!(
            Predicate::count(Predicate::regex("x.*").unwrap(), |n| n == 1).to_string(),
            "count(/x.*/)"
        );
    }
}
