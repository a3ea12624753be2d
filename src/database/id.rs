use std::fmt;
use std::str::FromStr;

use bson::oid::ObjectId;
use thiserror::Error;

/// Number of hex characters in the external form of a document key
pub const KEY_HEX_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid identifier: {0:?}")]
pub struct IdError(pub String);

/// Store-assigned document key, externally represented as 24 hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(ObjectId);

impl ResourceId {
    /// Decode a path parameter into a key. Never touches the store.
    pub fn decode(raw: &str) -> Result<Self, IdError> {
        if raw.len() != KEY_HEX_LEN || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(IdError(raw.to_string()));
        }
        ObjectId::parse_str(raw)
            .map(ResourceId)
            .map_err(|_| IdError(raw.to_string()))
    }

    pub fn encode(&self) -> String {
        self.0.to_hex()
    }

    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

impl From<ObjectId> for ResourceId {
    fn from(oid: ObjectId) -> Self {
        ResourceId(oid)
    }
}

impl FromStr for ResourceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}
