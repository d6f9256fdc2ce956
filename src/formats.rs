//! Named string formats used by the `format` validator.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

/// How one format recognizes a conforming string.
#[derive(Clone)]
pub enum FormatTest {
    Pattern(Regex),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl FormatTest {
    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        FormatTest::Predicate(Arc::new(f))
    }

    pub fn is_match(&self, value: &str) -> bool {
        match self {
            FormatTest::Pattern(re) => re.is_match(value),
            FormatTest::Predicate(f) => f(value),
        }
    }
}

impl fmt::Debug for FormatTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatTest::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            FormatTest::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Format name to test lookup.
#[derive(Debug, Clone, Default)]
pub struct FormatTable {
    formats: IndexMap<String, FormatTest>,
}

fn pattern(re: &str) -> FormatTest {
    FormatTest::Pattern(Regex::new(re).expect("valid format pattern"))
}

static STANDARD: Lazy<FormatTable> = Lazy::new(|| {
    let mut table = FormatTable::new();
    table
        .register("date", FormatTest::predicate(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()))
        .register("time", pattern(r"(?i)^[0-2]\d:[0-5]\d:[0-5]\d(?:\.\d+)?(?:z|[+-]\d\d:?\d\d)?$"))
        .register("date-time", FormatTest::predicate(|s| DateTime::parse_from_rfc3339(s).is_ok()))
        .register(
            "email",
            pattern(r"(?i)^[a-z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?)*$"),
        )
        .register(
            "hostname",
            pattern(r"(?i)^[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?(?:\.[a-z0-9](?:[-0-9a-z]{0,61}[0-9a-z])?)*$"),
        )
        .register("ipv4", FormatTest::predicate(|s| s.parse::<Ipv4Addr>().is_ok()))
        .register("ipv6", FormatTest::predicate(|s| s.parse::<Ipv6Addr>().is_ok()))
        .register("uri", pattern(r"(?i)^[a-z][a-z0-9+\-.]*:(?://)?\S*$"))
        .register(
            "uri-reference",
            pattern(r"(?i)^(?:(?:[a-z][a-z0-9+\-.]*:)?/?/)?(?:[^\\\s#][^\s#]*)?(?:#[^\\\s]*)?$"),
        )
        .register(
            "uri-template",
            pattern(r#"(?i)^(?:(?:[^\x00-\x20"'<>%\\^`{|}]|%[0-9a-f]{2})|\{[+#./;?&=,!@|]?(?:[a-z0-9_]|%[0-9a-f]{2})+(?::[1-9][0-9]{0,3}|\*)?(?:,(?:[a-z0-9_]|%[0-9a-f]{2})+(?::[1-9][0-9]{0,3}|\*)?)*\})*$"#),
        )
        .register("url", pattern(r"(?i)^(?:https?|ftp)://[^\s/$.?#][^\s]*$"))
        .register(
            "uuid",
            pattern(r"(?i)^(?:urn:uuid:)?[0-9a-f]{8}-(?:[0-9a-f]{4}-){3}[0-9a-f]{12}$"),
        )
        .register(
            "color",
            pattern(r"(?i)^\s*(?:#(?:[0-9a-f]{3}){1,2}|rgb\((?:\s*\d{1,3}%?\s*,){2}\s*\d{1,3}%?\s*\)|rgba\((?:\s*\d{1,3}%?\s*,){3}\s*(?:\d*\.)?\d+\s*\)|hsl\(\s*\d{1,3}\s*,\s*\d{1,3}%\s*,\s*\d{1,3}%\s*\)|hsla\(\s*\d{1,3}\s*,\s*\d{1,3}%\s*,\s*\d{1,3}%\s*,\s*(?:\d*\.)?\d+\s*\))\s*$"),
        )
        .register("json-pointer", pattern(r"^(?:/(?:[^~/]|~0|~1)*)*$"))
        .register(
            "json-pointer-uri-fragment",
            pattern(r"(?i)^#(?:/(?:[a-z0-9_\-.!$&'()*+,;:=@]|%[0-9a-f]{2}|~0|~1)*)*$"),
        )
        .register(
            "relative-json-pointer",
            pattern(r"^(?:0|[1-9][0-9]*)(?:#|(?:/(?:[^~/]|~0|~1)*)*)$"),
        )
        .register("regex", FormatTest::predicate(|s| Regex::new(s).is_ok()));
    table
});

impl FormatTable {
    /// An empty table; every format is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// The draft-6 formats plus `color` and `url`.
    pub fn standard() -> Self {
        STANDARD.clone()
    }

    /// Add or replace a format.
    pub fn register(&mut self, name: impl Into<String>, test: FormatTest) -> &mut Self {
        self.formats.insert(name.into(), test);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FormatTest> {
        self.formats.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.formats.contains_key(name)
    }

    /// `None` when the format is unknown.
    pub fn is_match(&self, name: &str, value: &str) -> Option<bool> {
        self.get(name).map(|test| test.is_match(value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.formats.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_formats() {
        let table = FormatTable::standard();
        let cases = [
            ("date", "2024-02-29", true),
            ("date", "2023-02-29", false),
            ("time", "12:30:00Z", true),
            ("date-time", "2024-01-01T10:00:00+02:00", true),
            ("date-time", "2024-01-01 10:00", false),
            ("email", "a.b@example.com", true),
            ("email", "not an email", false),
            ("hostname", "example.com", true),
            ("ipv4", "192.168.0.1", true),
            ("ipv4", "256.0.0.1", false),
            ("ipv6", "::1", true),
            ("uri", "https://example.com/x?y", true),
            ("uri", "example", false),
            ("url", "ftp://files.example.com", true),
            ("uuid", "123e4567-e89b-12d3-a456-426614174000", true),
            ("color", "#ff00aa", true),
            ("color", "rgb(1, 2, 3)", true),
            ("json-pointer", "/a/b~1c", true),
            ("json-pointer", "a/b", false),
            ("json-pointer-uri-fragment", "#/a%20b", true),
            ("relative-json-pointer", "1/a", true),
            ("regex", "^a+$", true),
            ("regex", "(", false),
        ];
        for (name, value, expected) in cases {
            assert_eq!(table.is_match(name, value), Some(expected), "{} {:?}", name, value);
        }
    }

    #[test]
    fn unknown_format() {
        assert_eq!(FormatTable::standard().is_match("zipcode", "12345"), None);
        assert!(!FormatTable::new().contains("date"));
    }

    #[test]
    fn custom_format() {
        let mut table = FormatTable::new();
        table.register("zipcode", FormatTest::predicate(|s| s.len() == 5 && s.chars().all(|c| c.is_ascii_digit())));
        assert_eq!(table.is_match("zipcode", "12345"), Some(true));
        assert_eq!(table.is_match("zipcode", "1234"), Some(false));
    }
}
