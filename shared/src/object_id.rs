use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::validation::{ValidationError, ID_LENGTH};

const HEX: &[u8; 16] = b"0123456789abcdef";

/// 24-character lowercase-hex document id: four timestamp bytes followed by
/// eight bytes of entropy, matching the document-store id format the rest of
/// the system keys on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectId(String);

impl ObjectId {
    pub fn generate() -> Self {
        let seconds = OffsetDateTime::now_utc().unix_timestamp() as u32;
        let entropy = Uuid::new_v4();

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..].copy_from_slice(&entropy.as_bytes()[..8]);

        let mut encoded = String::with_capacity(ID_LENGTH);
        for byte in bytes {
            encoded.push(HEX[(byte >> 4) as usize] as char);
            encoded.push(HEX[(byte & 0x0f) as usize] as char);
        }
        Self(encoded)
    }

    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        if value.len() != ID_LENGTH {
            return Err(ValidationError::InvalidIdLength(value.len()));
        }
        if let Some(bad) = value.chars().find(|c| !c.is_ascii_hexdigit() || c.is_ascii_uppercase()) {
            return Err(ValidationError::InvalidIdCharacter(bad));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ObjectId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ObjectId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ObjectId> for String {
    fn from(id: ObjectId) -> Self {
        id.0
    }
}
