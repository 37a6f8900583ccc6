//! Fake-data substitution
//!
//! The registry of `method` generators is closed: a name that does not parse
//! into a [`FakeGenerator`] fails validation before any table is touched.

use fake::faker::phone_number::en::CellNumber;
use fake::Fake;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::OnceLock;

use crate::domain::{ObfuscatorError, Result};
use crate::obfuscation::model::{FakeKind, FakeOverride};

/// Attempts before giving up on finding a phone number not yet issued
const MAX_UNIQUE_ATTEMPTS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeGenerator {
    /// E.164 cell phone number, unique within a run
    PhoneNumber,
    /// Random v4 UUID
    Uuid,
}

impl FakeGenerator {
    pub const ALL: [FakeGenerator; 2] = [FakeGenerator::PhoneNumber, FakeGenerator::Uuid];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PhoneNumber => "phone_number",
            Self::Uuid => "uuid",
        }
    }
}

impl FromStr for FakeGenerator {
    type Err = ObfuscatorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "phone_number" => Ok(Self::PhoneNumber),
            "uuid" => Ok(Self::Uuid),
            other => Err(ObfuscatorError::UnknownFakeGenerator(other.to_string())),
        }
    }
}

/// A fake-data override checked against the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedFake {
    Precise(String),
    Pattern(String),
    Method(FakeGenerator),
}

impl ResolvedFake {
    pub fn resolve(fake: &FakeOverride) -> Result<Self> {
        Ok(match fake.kind {
            FakeKind::Precise => Self::Precise(fake.value.clone()),
            FakeKind::Pattern => Self::Pattern(fake.value.clone()),
            FakeKind::Method => Self::Method(fake.value.parse()?),
        })
    }

    /// Produce the value for one row
    pub fn render(&self, row: &HashMap<&str, &str>, generators: &mut FakeGenerators) -> Result<String> {
        match self {
            Self::Precise(value) => Ok(value.clone()),
            Self::Pattern(template) => render_pattern(template, row),
            Self::Method(generator) => generators.generate(*generator),
        }
    }
}

/// Per-run generator state
#[derive(Debug, Default)]
pub struct FakeGenerators {
    issued_phone_numbers: HashSet<String>,
}

impl FakeGenerators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&mut self, generator: FakeGenerator) -> Result<String> {
        match generator {
            FakeGenerator::PhoneNumber => self.unique_phone_number(),
            FakeGenerator::Uuid => Ok(uuid::Uuid::new_v4().to_string()),
        }
    }

    fn unique_phone_number(&mut self) -> Result<String> {
        for _ in 0..MAX_UNIQUE_ATTEMPTS {
            let raw: String = CellNumber().fake();
            let Some(number) = to_e164(&raw) else {
                continue;
            };
            if self.issued_phone_numbers.insert(number.clone()) {
                return Ok(number);
            }
        }

        Err(ObfuscatorError::FakeData(format!(
            "Could not generate a unique phone number after {MAX_UNIQUE_ATTEMPTS} attempts ({} issued)",
            self.issued_phone_numbers.len()
        )))
    }
}

/// Normalize a North American number to `+1XXXXXXXXXX`
fn to_e164(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let national = match digits.len() {
        10 => digits.as_str(),
        11 if digits.starts_with('1') => &digits[1..],
        _ => return None,
    };
    Some(format!("+1{national}"))
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"%\{([^}]+)\}").expect("placeholder pattern is valid"))
}

/// NULL marker used by every CSV stream
pub const NULL_MARKER: &str = "\\N";

/// Replace every `%{name}` with the value of column `name` in `row`
///
/// A placeholder resolving to NULL makes the whole value NULL.
pub fn render_pattern(template: &str, row: &HashMap<&str, &str>) -> Result<String> {
    let regex = placeholder_regex();
    let mut rendered = String::with_capacity(template.len());
    let mut last = 0;

    for captures in regex.captures_iter(template) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        let value = row.get(name.as_str()).ok_or_else(|| {
            ObfuscatorError::FakeData(format!(
                "Pattern '{template}' references unknown column '{}'",
                name.as_str()
            ))
        })?;
        if *value == NULL_MARKER {
            return Ok(NULL_MARKER.to_string());
        }

        rendered.push_str(&template[last..whole.start()]);
        rendered.push_str(value);
        last = whole.end();
    }

    rendered.push_str(&template[last..]);
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_names() {
        for generator in FakeGenerator::ALL {
            assert_eq!(generator.as_str().parse::<FakeGenerator>().unwrap(), generator);
        }
        let err = "credit_card".parse::<FakeGenerator>().unwrap_err();
        assert!(matches!(err, ObfuscatorError::UnknownFakeGenerator(name) if name == "credit_card"));
    }

    #[test]
    fn test_pattern_substitution() {
        let row = HashMap::from([("id", "42"), ("name", "Ann")]);
        assert_eq!(render_pattern("user-%{id}", &row).unwrap(), "user-42");
        assert_eq!(
            render_pattern("%{name}.%{id}@example.com", &row).unwrap(),
            "Ann.42@example.com"
        );
        assert_eq!(render_pattern("static", &row).unwrap(), "static");
    }

    #[test]
    fn test_pattern_over_null_cell_stays_null() {
        let row = HashMap::from([("id", "42"), ("login", NULL_MARKER)]);
        assert_eq!(render_pattern("user-%{login}", &row).unwrap(), NULL_MARKER);
        assert_eq!(render_pattern("user-%{id}", &row).unwrap(), "user-42");
    }

    #[test]
    fn test_pattern_unknown_placeholder_fails() {
        let row = HashMap::from([("id", "42")]);
        let err = render_pattern("user-%{login}", &row).unwrap_err();
        assert!(matches!(err, ObfuscatorError::FakeData(_)));
    }

    #[test]
    fn test_phone_numbers_are_unique_e164() {
        let mut generators = FakeGenerators::new();
        let mut seen = HashSet::new();
        for _ in 0..200 {
            let number = generators.generate(FakeGenerator::PhoneNumber).unwrap();
            assert!(number.starts_with("+1"));
            assert_eq!(number.len(), 12);
            assert!(seen.insert(number));
        }
    }

    #[test]
    fn test_uuid_generator() {
        let mut generators = FakeGenerators::new();
        let value = generators.generate(FakeGenerator::Uuid).unwrap();
        assert!(uuid::Uuid::parse_str(&value).is_ok());
    }

    #[test]
    fn test_to_e164() {
        assert_eq!(to_e164("(555) 123-4567").as_deref(), Some("+15551234567"));
        assert_eq!(to_e164("1-555-123-4567").as_deref(), Some("+15551234567"));
        assert_eq!(to_e164("123").as_deref(), None);
    }

    #[test]
    fn test_resolve_rejects_unknown_method() {
        let fake = FakeOverride {
            kind: FakeKind::Method,
            value: "ssn".to_string(),
        };
        assert!(ResolvedFake::resolve(&fake).is_err());
    }
}
