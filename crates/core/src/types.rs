use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! newtype_string {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new instance from a string value.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Return the inner string as a str slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

newtype_string!(ObjectId, "Identifier of an object on the ledger (`0x`-prefixed hex).");
newtype_string!(Address, "A ledger account address (`0x`-prefixed hex).");
newtype_string!(BlobId, "Content identifier assigned by the blob store.");
newtype_string!(
    PolicyId,
    "Identifier of the access-control object a ciphertext is bound to."
);

impl PolicyId {
    /// Decode the hex body of the identifier into raw bytes.
    ///
    /// Accepts an optional `0x` prefix and odd-length bodies (left padded
    /// with a zero nibble, as ledger ids are often printed without leading
    /// zeros).
    pub fn to_bytes(&self) -> Result<Vec<u8>, hex::FromHexError> {
        decode_hex_id(&self.0)
    }

    /// Build a policy id from raw bytes, rendered as lowercase `0x` hex.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Canonical lowercase form used for equality checks between the
    /// identifier embedded in a ciphertext and a caller-supplied one.
    #[must_use]
    pub fn normalized(&self) -> String {
        normalize_hex_id(&self.0)
    }

    /// Returns `true` if both ids name the same object regardless of case or
    /// `0x` prefix.
    #[must_use]
    pub fn same_as(&self, other: &PolicyId) -> bool {
        self.normalized() == other.normalized()
    }
}

impl From<ObjectId> for PolicyId {
    fn from(id: ObjectId) -> Self {
        Self(id.0)
    }
}

impl From<&ObjectId> for PolicyId {
    fn from(id: &ObjectId) -> Self {
        Self(id.0.clone())
    }
}

impl ObjectId {
    /// Canonical lowercase form with the `0x` prefix and no leading zeros
    /// stripped.
    #[must_use]
    pub fn normalized(&self) -> String {
        normalize_hex_id(&self.0)
    }
}

fn normalize_hex_id(raw: &str) -> String {
    let body = raw
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X")
        .to_ascii_lowercase();
    format!("0x{body}")
}

fn decode_hex_id(raw: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let body = raw
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    if body.len() % 2 == 1 {
        hex::decode(format!("0{body}"))
    } else {
        hex::decode(body)
    }
}
