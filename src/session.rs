//! Session identity for correlating a widget's requests.
//!
//! One identity is generated per widget instance (a page load in the browser,
//! one run of the terminal front-end) and sent with every chat and upload
//! request. It is an opaque correlation key, not a credential.

use std::fmt;

use serde::Serialize;
use uuid::Uuid;

/// Prefix shared by every generated identity.
pub const SESSION_PREFIX: &str = "user_";

/// Number of base-36 characters after the prefix.
pub const SUFFIX_LEN: usize = 9;

const ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Opaque `user_<9 base-36 chars>` token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionIdentity(String);

impl SessionIdentity {
    /// Generate a fresh identity from a random v4 UUID.
    ///
    /// Not cryptographically meaningful; collisions are merely unlikely.
    pub fn generate() -> Self {
        let mut value = Uuid::new_v4().as_u128();
        let mut suffix = [0u8; SUFFIX_LEN];
        for slot in &mut suffix {
            *slot = ALPHABET[(value % 36) as usize];
            value /= 36;
        }

        let mut id = String::with_capacity(SESSION_PREFIX.len() + SUFFIX_LEN);
        id.push_str(SESSION_PREFIX);
        id.extend(suffix.iter().map(|b| char::from(*b)));
        Self(id)
    }

    /// Borrow the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
