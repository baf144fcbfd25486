//! Recipient phone number.
//!
//! The courier only accepts 11-digit local mobile numbers (`01XXXXXXXXX`).
//! International forms (`+8801...`, `8801...`) are normalized to that shape.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains characters other than digits, spaces, dashes or a leading `+`.
    #[error("phone number may only contain digits")]
    InvalidCharacters,
    /// The digits are not a valid 11-digit mobile number.
    #[error("phone number must be an 11-digit mobile number starting with 01")]
    InvalidFormat,
}

/// A normalized 11-digit mobile number.
///
/// ```
/// use crumb_core::Phone;
///
/// let phone = Phone::parse("+880 1712-345678").unwrap();
/// assert_eq!(phone.as_str(), "01712345678");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns a [`PhoneError`] when the input is empty, has stray characters,
    /// or does not reduce to `01` followed by nine digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let body = s.strip_prefix('+').unwrap_or(s);
        if !body
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
        {
            return Err(PhoneError::InvalidCharacters);
        }

        let digits: String = body.chars().filter(char::is_ascii_digit).collect();
        let local = digits.strip_prefix("88").unwrap_or(&digits);

        if local.len() != 11 || !local.starts_with("01") {
            return Err(PhoneError::InvalidFormat);
        }

        Ok(Self(local.to_owned()))
    }

    /// Returns the normalized number.
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

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_local_and_international_forms() {
        assert_eq!(Phone::parse("01712345678").unwrap().as_str(), "01712345678");
        assert_eq!(Phone::parse("+8801712345678").unwrap().as_str(), "01712345678");
        assert_eq!(Phone::parse("880 1712 345678").unwrap().as_str(), "01712345678");
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert_eq!(Phone::parse(""), Err(PhoneError::Empty));
        assert_eq!(Phone::parse("0171-ABC"), Err(PhoneError::InvalidCharacters));
        assert_eq!(Phone::parse("0171234567"), Err(PhoneError::InvalidFormat));
        assert_eq!(Phone::parse("02712345678"), Err(PhoneError::InvalidFormat));
    }
}
