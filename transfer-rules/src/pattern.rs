//! Wildcard base patterns
//!
//! A [`BasePattern`] is compiled once, at construction, into a list of
//! literal and wildcard segments per field. Matching walks those segments
//! directly; user text is never interpreted as anything but literal
//! characters.
//!
//! # Syntax
//!
//! ```text
//! meat*-*-kg-2024*-*
//! ```
//!
//! - `*` matches any (possibly empty) run of characters
//! - an empty field, or a field that is exactly `*`, matches anything
//! - the polarity field is `NO_HAT`, `HAT` or `*`

use crate::{Error, Result};
use ledger_core::types::{validate_key_chars, KEY_SEPARATOR, WILDCARD};
use ledger_core::{Base, Polarity};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

const ANY: &str = "*";

/// Piece of a compiled field template
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text that must appear verbatim
    Literal(String),
    /// Any run of characters, including none
    Wildcard,
}

#[derive(Debug, Clone)]
enum Matcher {
    Any,
    Exact,
    Template(Vec<Segment>),
}

/// One compiled field of a pattern
///
/// Equality, hashing and ordering use the source text only.
#[derive(Debug, Clone)]
pub struct FieldPattern {
    source: String,
    matcher: Matcher,
}

impl FieldPattern {
    /// Compile a field template. An empty source means "any".
    pub fn compile(field: &str, source: &str) -> Result<Self> {
        validate_key_chars(field, source, true)?;

        let source = if source.is_empty() { ANY } else { source };
        let segments = split_segments(source);

        let matcher = match segments.as_slice() {
            [Segment::Wildcard] => Matcher::Any,
            [Segment::Literal(_)] => Matcher::Exact,
            _ => Matcher::Template(segments),
        };

        Ok(Self {
            source: source.to_string(),
            matcher,
        })
    }

    /// Source text
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether the field contains no wildcard
    pub fn is_literal(&self) -> bool {
        matches!(self.matcher, Matcher::Exact)
    }

    /// Whether the field matches every value
    pub fn is_any(&self) -> bool {
        matches!(self.matcher, Matcher::Any)
    }

    /// Literal value, if the field has no wildcard
    pub fn literal(&self) -> Option<&str> {
        self.is_literal().then_some(self.source.as_str())
    }

    /// Compiled segments
    pub fn segments(&self) -> Vec<Segment> {
        match &self.matcher {
            Matcher::Any => vec![Segment::Wildcard],
            Matcher::Exact => vec![Segment::Literal(self.source.clone())],
            Matcher::Template(segments) => segments.clone(),
        }
    }

    /// Match a whole field value
    pub fn matches(&self, value: &str) -> bool {
        match &self.matcher {
            Matcher::Any => true,
            Matcher::Exact => self.source == value,
            Matcher::Template(segments) => match_segments(segments, value),
        }
    }

    /// Literal value if present, otherwise `value`
    fn resolve<'a>(&'a self, value: &'a str) -> &'a str {
        self.literal().unwrap_or(value)
    }
}

fn split_segments(source: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();

    for c in source.chars() {
        if c == WILDCARD {
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            if segments.last() != Some(&Segment::Wildcard) {
                segments.push(Segment::Wildcard);
            }
        } else {
            literal.push(c);
        }
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }

    segments
}

/// Leftmost-first glob match. With `*` as the only metacharacter the
/// greedy choice of the earliest occurrence never loses a match.
fn match_segments(segments: &[Segment], value: &str) -> bool {
    let mut rest = value;
    let mut anchored = true;

    for (i, segment) in segments.iter().enumerate() {
        let lit = match segment {
            Segment::Wildcard => {
                anchored = false;
                continue;
            }
            Segment::Literal(lit) => lit.as_str(),
        };
        let last = i + 1 == segments.len();

        match (anchored, last) {
            (true, true) => return rest == lit,
            (false, true) => return rest.ends_with(lit),
            (true, false) => match rest.strip_prefix(lit) {
                Some(tail) => rest = tail,
                None => return false,
            },
            (false, false) => match rest.find(lit) {
                Some(pos) => {
                    rest = &rest[pos + lit.len()..];
                    anchored = true;
                }
                None => return false,
            },
        }
    }

    // Only reachable when the template ends with a wildcard
    !anchored || rest.is_empty()
}

impl PartialEq for FieldPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for FieldPattern {}

impl Hash for FieldPattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
    }
}

impl PartialOrd for FieldPattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for FieldPattern {
    fn cmp(&self, other: &Self) -> Ordering {
        self.source.cmp(&other.source)
    }
}

impl fmt::Display for FieldPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Polarity field of a pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PolarityPattern {
    /// Matches `NO_HAT` only
    NoHat,
    /// Matches `HAT` only
    Hat,
    /// Matches either polarity
    Any,
}

impl PolarityPattern {
    /// Token of the canonical string form
    pub fn token(&self) -> &'static str {
        match self {
            PolarityPattern::NoHat => Polarity::NoHat.token(),
            PolarityPattern::Hat => Polarity::Hat.token(),
            PolarityPattern::Any => ANY,
        }
    }

    /// Whether `polarity` is accepted
    pub fn matches(&self, polarity: Polarity) -> bool {
        match self {
            PolarityPattern::Any => true,
            PolarityPattern::NoHat => polarity == Polarity::NoHat,
            PolarityPattern::Hat => polarity == Polarity::Hat,
        }
    }

    /// Literal polarity, or `fallback` for the wildcard
    pub fn resolve(&self, fallback: Polarity) -> Polarity {
        match self {
            PolarityPattern::NoHat => Polarity::NoHat,
            PolarityPattern::Hat => Polarity::Hat,
            PolarityPattern::Any => fallback,
        }
    }
}

impl From<Polarity> for PolarityPattern {
    fn from(polarity: Polarity) -> Self {
        match polarity {
            Polarity::NoHat => PolarityPattern::NoHat,
            Polarity::Hat => PolarityPattern::Hat,
        }
    }
}

impl PartialOrd for PolarityPattern {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PolarityPattern {
    fn cmp(&self, other: &Self) -> Ordering {
        self.token().cmp(other.token())
    }
}

impl FromStr for PolarityPattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | ANY => Ok(PolarityPattern::Any),
            token => Ok(token.parse::<Polarity>()?.into()),
        }
    }
}

impl fmt::Display for PolarityPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Compiled wildcard pattern over the five fields of a [`Base`]
///
/// Ordering is lexicographic over (name, polarity, unit, time, subject)
/// on the source text of each field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BasePattern {
    name: FieldPattern,
    polarity: PolarityPattern,
    unit: FieldPattern,
    time: FieldPattern,
    subject: FieldPattern,
}

impl BasePattern {
    /// Compile a pattern from its five field templates
    pub fn new(
        name: &str,
        polarity: &str,
        unit: &str,
        time: &str,
        subject: &str,
    ) -> Result<Self> {
        Ok(Self {
            name: FieldPattern::compile("name", name)?,
            polarity: polarity.parse()?,
            unit: FieldPattern::compile("unit", unit)?,
            time: FieldPattern::compile("time", time)?,
            subject: FieldPattern::compile("subject", subject)?,
        })
    }

    /// Pattern matching exactly `base`
    pub fn from_base(base: &Base) -> Self {
        let exact = |value: &str| FieldPattern {
            source: value.to_string(),
            matcher: Matcher::Exact,
        };

        Self {
            name: exact(base.name()),
            polarity: base.polarity().into(),
            unit: exact(base.unit()),
            time: exact(base.time()),
            subject: exact(base.subject()),
        }
    }

    /// Name field
    pub fn name(&self) -> &FieldPattern {
        &self.name
    }

    /// Polarity field
    pub fn polarity(&self) -> PolarityPattern {
        self.polarity
    }

    /// Unit field
    pub fn unit(&self) -> &FieldPattern {
        &self.unit
    }

    /// Time field
    pub fn time(&self) -> &FieldPattern {
        &self.time
    }

    /// Subject field
    pub fn subject(&self) -> &FieldPattern {
        &self.subject
    }

    /// Whether no field contains a wildcard
    pub fn is_literal(&self) -> bool {
        self.polarity != PolarityPattern::Any
            && self.name.is_literal()
            && self.unit.is_literal()
            && self.time.is_literal()
            && self.subject.is_literal()
    }

    /// The base denoted by a wildcard-free pattern, `None` if any field
    /// holds a wildcard
    pub fn to_base(&self) -> Result<Option<Base>> {
        if !self.is_literal() {
            return Ok(None);
        }
        let base = Base::with_keys(
            self.name.source(),
            self.polarity.resolve(Polarity::NoHat),
            self.unit.source(),
            self.time.source(),
            self.subject.source(),
        )?;
        Ok(Some(base))
    }

    /// Whether every field of `base` is matched
    pub fn matches(&self, base: &Base) -> bool {
        self.polarity.matches(base.polarity())
            && self.name.matches(base.name())
            && self.unit.matches(base.unit())
            && self.time.matches(base.time())
            && self.subject.matches(base.subject())
    }

    /// Concrete base taking literal fields from the pattern and the rest
    /// from `base`.
    pub fn translate(&self, base: &Base) -> Result<Base> {
        let translated = Base::with_keys(
            self.name.resolve(base.name()),
            self.polarity.resolve(base.polarity()),
            self.unit.resolve(base.unit()),
            self.time.resolve(base.time()),
            self.subject.resolve(base.subject()),
        )?;
        Ok(translated)
    }
}

impl fmt::Display for BasePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}{sep}{}{sep}{}",
            self.name,
            self.polarity,
            self.unit,
            self.time,
            self.subject,
            sep = KEY_SEPARATOR
        )
    }
}

impl FromStr for BasePattern {
    type Err = Error;

    /// Parse the canonical form. Missing trailing parts match anything.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(KEY_SEPARATOR).collect();
        if parts.len() > 5 {
            return Err(Error::Pattern(format!(
                "'{}' has {} parts, a pattern has at most 5",
                s,
                parts.len()
            )));
        }

        let part = |i: usize| parts.get(i).copied().unwrap_or("");
        Self::new(part(0), part(1), part(2), part(3), part(4))
    }
}

impl TryFrom<String> for BasePattern {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<BasePattern> for String {
    fn from(pattern: BasePattern) -> Self {
        pattern.to_string()
    }
}

impl From<&Base> for BasePattern {
    fn from(base: &Base) -> Self {
        BasePattern::from_base(base)
    }
}
