//! Validated text types shared across the MMS crates.
//!
//! Values of these types are checked once at construction, so code that receives a
//! `NonEmptyText` or an `EmailAddress` never has to re-validate it.

use std::fmt;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,
    /// The input was not of the form `local@domain`
    #[error("invalid email address: '{0}'")]
    InvalidEmail(String),
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, rejecting empty or whitespace-only input.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// An email address with a non-empty local part and domain.
///
/// Only the shape `local@domain` is checked. Addresses are compared case-insensitively
/// by [`EmailAddress::matches`], which is what account lookups use.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Parses an email address, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] for blank input and [`TextError::InvalidEmail`] when the
    /// input has no `@`, more than one `@`, or an empty side.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }

        let mut parts = trimmed.split('@');
        let local = parts.next().unwrap_or_default();
        let domain = parts.next().unwrap_or_default();
        if local.is_empty()
            || domain.is_empty()
            || parts.next().is_some()
            || trimmed.chars().any(char::is_whitespace)
        {
            return Err(TextError::InvalidEmail(trimmed.to_owned()));
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if `other` names the same mailbox, ignoring ASCII case.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for EmailAddress {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for EmailAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        EmailAddress::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Consultation  ").unwrap();
        assert_eq!(text.as_str(), "Consultation");
    }

    #[test]
    fn non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   ").unwrap_err(), TextError::Empty);
        assert_eq!(NonEmptyText::new("").unwrap_err(), TextError::Empty);
    }

    #[test]
    fn email_accepts_short_domains() {
        let email = EmailAddress::parse("jane@x").unwrap();
        assert_eq!(email.as_str(), "jane@x");
    }

    #[test]
    fn email_rejects_malformed_input() {
        assert!(matches!(
            EmailAddress::parse("jane"),
            Err(TextError::InvalidEmail(_))
        ));
        assert!(matches!(
            EmailAddress::parse("@x"),
            Err(TextError::InvalidEmail(_))
        ));
        assert!(matches!(
            EmailAddress::parse("jane@"),
            Err(TextError::InvalidEmail(_))
        ));
        assert!(matches!(
            EmailAddress::parse("a@b@c"),
            Err(TextError::InvalidEmail(_))
        ));
        assert!(matches!(
            EmailAddress::parse("ja ne@x"),
            Err(TextError::InvalidEmail(_))
        ));
        assert_eq!(EmailAddress::parse(" ").unwrap_err(), TextError::Empty);
    }

    #[test]
    fn email_matches_ignores_case() {
        let email = EmailAddress::parse("Admin@MMS.com").unwrap();
        assert!(email.matches("admin@mms.com"));
        assert!(!email.matches("admin@mms.org"));
    }

    #[test]
    fn serde_rejects_empty_text() {
        let err = serde_json::from_str::<NonEmptyText>("\"  \"");
        assert!(err.is_err());

        let ok: EmailAddress = serde_json::from_str("\"jane@x\"").unwrap();
        assert_eq!(ok.as_str(), "jane@x");
    }
}
