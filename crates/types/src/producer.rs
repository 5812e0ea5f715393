//! Producer account identity.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a producer account name.
pub const PRODUCER_NAME_LEN: usize = 12;

/// Errors returned when parsing a [`ProducerName`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProducerNameError {
    #[error("producer account should be {PRODUCER_NAME_LEN} characters, got {0}")]
    InvalidLength(usize),
    #[error("producer account contains invalid character {0:?} (allowed: a-z, 1-5, '.')")]
    InvalidCharacter(char),
}

/// The account name of the producer this process protects.
///
/// Always exactly [`PRODUCER_NAME_LEN`] characters drawn from `a-z`, `1-5`
/// and `.`. Other producers seen on chain are kept as plain strings because
/// system accounts may be shorter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProducerName(String);

impl ProducerName {
    /// Parse and validate an account name.
    pub fn new(name: impl Into<String>) -> Result<Self, ProducerNameError> {
        let name = name.into();
        let len = name.chars().count();
        if len != PRODUCER_NAME_LEN {
            return Err(ProducerNameError::InvalidLength(len));
        }
        if let Some(bad) = name
            .chars()
            .find(|c| !matches!(c, 'a'..='z' | '1'..='5' | '.'))
        {
            return Err(ProducerNameError::InvalidCharacter(bad));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ProducerName {
    type Err = ProducerNameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl fmt::Display for ProducerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProducerName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ProducerName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ProducerName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl PartialEq<String> for ProducerName {
    fn eq(&self, other: &String) -> bool {
        &self.0 == other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_name() {
        let name = ProducerName::new("bp1.standby5").unwrap();
        assert_eq!(name.as_str(), "bp1.standby5");
        assert_eq!(name, "bp1.standby5");
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert_eq!(
            ProducerName::new("short"),
            Err(ProducerNameError::InvalidLength(5))
        );
        assert_eq!(
            ProducerName::new("thisiswaytoolong"),
            Err(ProducerNameError::InvalidLength(16))
        );
    }

    #[test]
    fn test_rejects_invalid_characters() {
        assert_eq!(
            ProducerName::new("Bpaccount123"),
            Err(ProducerNameError::InvalidCharacter('B'))
        );
        assert_eq!(
            ProducerName::new("bpaccount169"),
            Err(ProducerNameError::InvalidCharacter('6'))
        );
    }

    #[test]
    fn test_from_str() {
        let name: ProducerName = "aaaaaaaaaaaa".parse().unwrap();
        assert_eq!(name.to_string(), "aaaaaaaaaaaa");
    }
}
