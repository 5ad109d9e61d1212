//! Core key types for ledger entries
//!
//! A [`Base`] is the immutable five-part key every ledger value is booked
//! under:
//!
//! ```text
//! name-POLARITY-unit-time-subject
//! meat-NO_HAT-kg-2024Q1-tokyo
//! ```
//!
//! All types are designed for:
//! - Strict validation at construction (no invalid key ever exists)
//! - Total, ordinal ordering (deterministic iteration in ordered maps)
//! - Canonical string form (stable serialization)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Sentinel stored in an omitted `unit`, `time` or `subject` key
pub const OMITTED_KEY: &str = "#";

/// Field delimiter of the canonical string form
pub const KEY_SEPARATOR: char = '-';

/// Characters that may never appear inside a key field
pub const RESERVED_CHARS: &[char] = &[
    '<', '>', ',', '^', '%', '&', '?', '\'', '"', '|', '@', '-',
];

/// Wildcard marker, reserved for patterns
pub const WILDCARD: char = '*';

/// Polarity flag ("hat") of a base
///
/// Ordering follows the ordinal order of the token text, so
/// `HAT < NO_HAT`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    /// Plain entry
    #[default]
    #[serde(rename = "NO_HAT")]
    NoHat,
    /// Dual ("hatted") entry
    #[serde(rename = "HAT")]
    Hat,
}

impl Polarity {
    /// Token of the canonical string form
    pub fn token(&self) -> &'static str {
        match self {
            Polarity::NoHat => "NO_HAT",
            Polarity::Hat => "HAT",
        }
    }

    /// The opposite polarity
    pub fn flip(self) -> Self {
        match self {
            Polarity::NoHat => Polarity::Hat,
            Polarity::Hat => Polarity::NoHat,
        }
    }
}

impl PartialOrd for Polarity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Polarity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.token().cmp(other.token())
    }
}

impl FromStr for Polarity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NO_HAT" => Ok(Polarity::NoHat),
            "HAT" => Ok(Polarity::Hat),
            other => Err(Error::Validation(format!(
                "invalid polarity token '{}' (expected NO_HAT or HAT)",
                other
            ))),
        }
    }
}

impl fmt::Display for Polarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

/// Check a key field for characters that are never allowed in a key.
///
/// Whitespace and [`RESERVED_CHARS`] are always rejected; `allow_wildcard`
/// decides whether [`WILDCARD`] is accepted.
pub fn validate_key_chars(field: &str, value: &str, allow_wildcard: bool) -> Result<()> {
    let bad = value.chars().find(|c| {
        c.is_whitespace()
            || RESERVED_CHARS.contains(c)
            || (!allow_wildcard && *c == WILDCARD)
    });

    match bad {
        Some(c) => Err(Error::Validation(format!(
            "{} key '{}' contains forbidden character {:?}",
            field, value, c
        ))),
        None => Ok(()),
    }
}

fn extended_key(field: &str, value: &str) -> Result<String> {
    if value.is_empty() {
        return Ok(OMITTED_KEY.to_string());
    }
    validate_key_chars(field, value, false)?;
    Ok(value.to_string())
}

/// Ledger entry key
///
/// Equality and ordering are ordinal and case-sensitive over
/// (name, polarity, unit, time, subject). See [`Base::cmp_ignore_case`]
/// and [`IgnoreCase`] for the case-insensitive variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Base {
    name: String,
    polarity: Polarity,
    unit: String,
    time: String,
    subject: String,
}

impl Base {
    /// Create a `NO_HAT` base with omitted extended keys
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::with_polarity(name, Polarity::NoHat)
    }

    /// Create a base with omitted extended keys
    pub fn with_polarity(name: impl Into<String>, polarity: Polarity) -> Result<Self> {
        Self::with_keys(name, polarity, OMITTED_KEY, OMITTED_KEY, OMITTED_KEY)
    }

    /// Create a base from all five keys.
    ///
    /// Empty `unit`, `time` or `subject` keys become [`OMITTED_KEY`].
    pub fn with_keys(
        name: impl Into<String>,
        polarity: Polarity,
        unit: impl AsRef<str>,
        time: impl AsRef<str>,
        subject: impl AsRef<str>,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Validation("name key must not be empty".to_string()));
        }
        validate_key_chars("name", &name, false)?;

        Ok(Self {
            name,
            polarity,
            unit: extended_key("unit", unit.as_ref())?,
            time: extended_key("time", time.as_ref())?,
            subject: extended_key("subject", subject.as_ref())?,
        })
    }

    /// Name key
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Polarity
    pub fn polarity(&self) -> Polarity {
        self.polarity
    }

    /// Whether this base is hatted
    pub fn is_hat(&self) -> bool {
        self.polarity == Polarity::Hat
    }

    /// Unit key
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Time key
    pub fn time(&self) -> &str {
        &self.time
    }

    /// Subject key
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Copy of this base with the given polarity
    pub fn with_polarity_of(&self, polarity: Polarity) -> Self {
        Self {
            polarity,
            ..self.clone()
        }
    }

    /// Copy of this base with the opposite polarity
    pub fn flip_polarity(&self) -> Self {
        self.with_polarity_of(self.polarity.flip())
    }

    /// Case-insensitive ordering over the same field order as `Ord`
    pub fn cmp_ignore_case(&self, other: &Self) -> Ordering {
        cmp_ignore_case(&self.name, &other.name)
            .then_with(|| self.polarity.cmp(&other.polarity))
            .then_with(|| cmp_ignore_case(&self.unit, &other.unit))
            .then_with(|| cmp_ignore_case(&self.time, &other.time))
            .then_with(|| cmp_ignore_case(&self.subject, &other.subject))
    }

    /// Case-insensitive equality
    pub fn eq_ignore_case(&self, other: &Self) -> bool {
        self.cmp_ignore_case(other) == Ordering::Equal
    }
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.chars()
        .flat_map(char::to_lowercase)
        .cmp(b.chars().flat_map(char::to_lowercase))
}

impl fmt::Display for Base {
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

impl FromStr for Base {
    type Err = Error;

    /// Parse the canonical form. Trailing parts may be left out.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(KEY_SEPARATOR).collect();
        if parts.len() > 5 {
            return Err(Error::Parse(format!(
                "'{}' has {} parts, a base has at most 5",
                s,
                parts.len()
            )));
        }

        let part = |i: usize| parts.get(i).copied().unwrap_or("");
        let polarity = match part(1) {
            "" => Polarity::NoHat,
            token => token.parse()?,
        };

        Self::with_keys(part(0), polarity, part(2), part(3), part(4))
    }
}

impl TryFrom<String> for Base {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Base> for String {
    fn from(base: Base) -> Self {
        base.to_string()
    }
}

/// Wrapper ordering a [`Base`] case-insensitively
///
/// Useful as a key of `BTreeMap`/`BTreeSet` when keys differing only by
/// case should collapse.
#[derive(Debug, Clone, Copy)]
pub struct IgnoreCase<T>(pub T);

impl<T: std::borrow::Borrow<Base>> PartialEq for IgnoreCase<T> {
    fn eq(&self, other: &Self) -> bool {
        self.0.borrow().eq_ignore_case(other.0.borrow())
    }
}

impl<T: std::borrow::Borrow<Base>> Eq for IgnoreCase<T> {}

impl<T: std::borrow::Borrow<Base>> PartialOrd for IgnoreCase<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T: std::borrow::Borrow<Base>> Ord for IgnoreCase<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.borrow().cmp_ignore_case(other.0.borrow())
    }
}
