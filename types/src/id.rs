//! Opaque entity identifiers.
//!
//! Ids are 16 random bytes, rendered as 32 hex characters on every external
//! surface (JSON, logs, URLs). They carry no ordering or timestamp meaning.

use crate::TypeError;
use rand::RngExt;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name([u8; 16]);

        impl $name {
            pub fn from_bytes(bytes: [u8; 16]) -> Self {
                Self(bytes)
            }

            /// Generate a fresh random id.
            pub fn random() -> Self {
                let mut bytes = [0u8; 16];
                rand::rng().fill(&mut bytes);
                Self(bytes)
            }

            /// Parse an id from its 32-char hex rendering.
            pub fn parse(s: &str) -> Result<Self, TypeError> {
                let raw = hex::decode(s).map_err(|_| TypeError::InvalidId(s.to_string()))?;
                let bytes: [u8; 16] = raw
                    .try_into()
                    .map_err(|_| TypeError::InvalidId(s.to_string()))?;
                Ok(Self(bytes))
            }

            pub fn as_bytes(&self) -> &[u8; 16] {
                &self.0
            }

            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::parse(&s).map_err(D::Error::custom)
            }
        }
    };
}

entity_id!(
    /// Identifies a primary stake session.
    SessionId
);
entity_id!(
    /// Identifies a secondary stake.
    StakeId
);
entity_id!(
    /// Identifies a quiz category.
    CategoryId
);
entity_id!(
    /// Identifies a quiz question.
    QuestionId
);
entity_id!(
    /// Identifies one answer option of a question.
    AnswerId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let id = SessionId::random();
        let parsed = SessionId::parse(&id.to_hex()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn parse_rejects_bad_hex() {
        assert!(SessionId::parse("zz").is_err());
        assert!(SessionId::parse("abcd").is_err()); // wrong length
    }

    #[test]
    fn serde_uses_hex_string() {
        let id = QuestionId::from_bytes([0xAB; 16]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(16)));
        let back: QuestionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn random_ids_differ() {
        assert_ne!(SessionId::random(), SessionId::random());
    }
}
