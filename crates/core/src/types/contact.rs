//! Customer contact details collected at checkout.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing contact details.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ContactError {
    /// The input string is empty.
    #[error("{0} cannot be empty")]
    Empty(&'static str),
    /// The email is not of the form `local@domain.tld`.
    #[error("invalid email address: {0}")]
    InvalidEmail(String),
    /// The phone number has too few digits or stray characters.
    #[error("invalid phone number: {0}")]
    InvalidPhone(String),
}

/// A customer email address.
///
/// Validation is structural only: one `@`, a non-empty local part, and a
/// dotted domain. Deliverability is the server's concern.
///
/// ```
/// use bakery_core::Email;
///
/// assert!(Email::parse("ana@example.com").is_ok());
/// assert!(Email::parse("ana@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, too long, or structurally invalid.
    pub fn parse(raw: &str) -> Result<Self, ContactError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(ContactError::Empty("email"));
        }
        let invalid = || ContactError::InvalidEmail(s.to_owned());
        if s.len() > Self::MAX_LENGTH || s.chars().any(char::is_whitespace) {
            return Err(invalid());
        }
        let (local, domain) = s.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') {
            return Err(invalid());
        }
        let dotted = domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty() && !tld.ends_with('.'));
        if !dotted {
            return Err(invalid());
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = ContactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Email {
    type Error = ContactError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<Email> for String {
    fn from(value: Email) -> Self {
        value.0
    }
}

/// A customer phone number, kept as typed (spaces and a leading `+` allowed).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Minimum number of digits for a reachable number.
    pub const MIN_DIGITS: usize = 8;

    /// Parse a `Phone`.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains characters other than
    /// digits, spaces, dashes or a leading `+`, or has too few digits.
    pub fn parse(raw: &str) -> Result<Self, ContactError> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(ContactError::Empty("phone"));
        }
        let body = s.strip_prefix('+').unwrap_or(s);
        let allowed = body
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-');
        let digits = body.chars().filter(char::is_ascii_digit).count();
        if !allowed || digits < Self::MIN_DIGITS {
            return Err(ContactError::InvalidPhone(s.to_owned()));
        }
        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = ContactError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Phone {
    type Error = ContactError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl From<Phone> for String {
    fn from(value: Phone) -> Self {
        value.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_email_valid() {
        assert!(Email::parse("cliente@pasteleria.cl").is_ok());
        assert!(Email::parse("  a.b+c@mail.example.com ").is_ok());
    }

    #[test]
    fn test_email_invalid() {
        assert_eq!(Email::parse(""), Err(ContactError::Empty("email")));
        assert!(Email::parse("no-at-symbol").is_err());
        assert!(Email::parse("@example.com").is_err());
        assert!(Email::parse("a@b@example.com").is_err());
        assert!(Email::parse("a@example").is_err());
        assert!(Email::parse("a@.com").is_err());
        assert!(Email::parse("a b@example.com").is_err());
    }

    #[test]
    fn test_phone_valid() {
        assert!(Phone::parse("+56 9 1234 5678").is_ok());
        assert!(Phone::parse("912345678").is_ok());
    }

    #[test]
    fn test_phone_invalid() {
        assert_eq!(Phone::parse(" "), Err(ContactError::Empty("phone")));
        assert!(Phone::parse("12345").is_err());
        assert!(Phone::parse("call me maybe").is_err());
        assert!(Phone::parse("++56912345678").is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let email: Email = serde_json::from_str(r#"" ana@example.cl ""#).unwrap();
        assert_eq!(email.as_str(), "ana@example.cl");
        assert!(serde_json::from_str::<Email>(r#""not-an-email""#).is_err());

        let phone: Phone = serde_json::from_str(r#""+56 9 1234 5678""#).unwrap();
        assert_eq!(serde_json::to_string(&phone).unwrap(), r#""+56 9 1234 5678""#);
        assert!(serde_json::from_str::<Phone>(r#""123""#).is_err());
    }
}
