use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const SUFFIX_LEN: usize = 8;

/// Reference handed to the client after submission, e.g. `BTOWN-2025-3F9A0C1E`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IntakeId {
    prefix: String,
    year: i32,
    suffix: String,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed intake id '{0}'")]
pub struct IntakeIdError(String);

impl IntakeId {
    /// A fresh id whose suffix is the first eight hex digits of a random v4 UUID.
    #[must_use]
    pub fn generate(prefix: &str, year: i32) -> Self {
        let uuid = Uuid::new_v4().simple().to_string();
        Self {
            prefix: prefix.to_owned(),
            year,
            suffix: uuid[..SUFFIX_LEN].to_ascii_uppercase(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub fn suffix(&self) -> &str {
        &self.suffix
    }
}

impl fmt::Display for IntakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.prefix, self.year, self.suffix)
    }
}

impl FromStr for IntakeId {
    type Err = IntakeIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || IntakeIdError(s.to_owned());
        let mut parts = s.rsplitn(3, '-');
        let suffix = parts.next().ok_or_else(malformed)?;
        let year = parts.next().ok_or_else(malformed)?;
        let prefix = parts.next().ok_or_else(malformed)?;

        let suffix_ok = suffix.len() == SUFFIX_LEN
            && suffix
                .chars()
                .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));
        let year_ok = year.len() == 4 && year.chars().all(|c| c.is_ascii_digit());
        let prefix_ok = !prefix.is_empty()
            && prefix
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if !(suffix_ok && year_ok && prefix_ok) {
            return Err(malformed());
        }

        Ok(Self {
            prefix: prefix.to_owned(),
            year: year.parse().map_err(|_| malformed())?,
            suffix: suffix.to_owned(),
        })
    }
}

impl TryFrom<String> for IntakeId {
    type Error = IntakeIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<IntakeId> for String {
    fn from(id: IntakeId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_id_shape() {
        let id = IntakeId::generate("BTOWN", 2025);
        let text = id.to_string();
        assert!(text.starts_with("BTOWN-2025-"));
        assert_eq!(text.len(), "BTOWN-2025-".len() + 8);
        assert_eq!(text.parse::<IntakeId>().unwrap(), id);
    }

    #[test]
    fn generated_ids_differ() {
        let a = IntakeId::generate("BTOWN", 2025);
        let b = IntakeId::generate("BTOWN", 2025);
        assert_ne!(a, b);
    }

    #[test]
    fn parse_accessors() {
        let id: IntakeId = "BTOWN-2024-0A1B2C3D".parse().unwrap();
        assert_eq!(id.prefix(), "BTOWN");
        assert_eq!(id.year(), 2024);
        assert_eq!(id.suffix(), "0A1B2C3D");
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in [
            "",
            "BTOWN",
            "BTOWN-2024",
            "BTOWN-24-0A1B2C3D",
            "BTOWN-2024-0a1b2c3d",
            "BTOWN-2024-0A1B2C3",
            "-2024-0A1B2C3D",
            "btown-2024-0A1B2C3D",
        ] {
            assert!(bad.parse::<IntakeId>().is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn serde_as_string() {
        let id: IntakeId = "BTOWN-2024-0A1B2C3D".parse().unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"BTOWN-2024-0A1B2C3D\"");
        let back: IntakeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
