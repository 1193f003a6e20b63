//! Account records as persisted by the store.
//!
//! Entry kinds are a tagged variant rather than a sentinel share number, so
//! the login and unlock paths are checked for exhaustiveness at compile time.

use serde::{Deserialize, Serialize};

use crate::crypto::SALT_LEN;

/// How an entry's payload protects the password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    /// Pre-secret account: payload is the bare salted hash. Promoted to
    /// `Shielded` when the secret is established.
    Bootstrap,
    /// Payload is the salted hash encrypted under the store secret, plus the
    /// isolated-validation suffix. Consumes no share index.
    Shielded,
    /// Payload is the salted hash XORed with the sharer's share at this
    /// index, plus the isolated-validation suffix.
    Share(u8),
}

/// One credential entry. An account owns one entry per share it was granted
/// (admin accounts hold several), or a single bootstrap/shielded entry.
/// Entries are created atomically with the account and never modified
/// afterwards, except for bootstrap promotion at unlock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountEntry {
    /// Protection scheme for this entry
    pub kind: EntryKind,
    /// Per-entry random salt
    pub salt: [u8; SALT_LEN],
    /// Protected hash, layout depending on `kind`
    pub payload: Vec<u8>,
}

impl AccountEntry {
    /// The payload with the isolated-validation suffix stripped (bootstrap
    /// entries carry no suffix). Empty if the payload is shorter than the
    /// suffix, which only happens on a corrupted store.
    pub fn payload_body(&self, isolated_check_bits: usize) -> &[u8] {
        match self.kind {
            EntryKind::Bootstrap => &self.payload,
            EntryKind::Shielded | EntryKind::Share(_) => {
                let body_len = self.payload.len().saturating_sub(isolated_check_bits);
                &self.payload[..body_len]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_body_strips_suffix() {
        let entry = AccountEntry {
            kind: EntryKind::Share(3),
            salt: [0; SALT_LEN],
            payload: vec![1, 2, 3, 4, 5],
        };
        assert_eq!(entry.payload_body(2), &[1, 2, 3]);
        assert_eq!(entry.payload_body(0), &[1, 2, 3, 4, 5]);
        assert_eq!(entry.payload_body(9), &[] as &[u8]);
    }

    #[test]
    fn test_bootstrap_payload_has_no_suffix() {
        let entry = AccountEntry {
            kind: EntryKind::Bootstrap,
            salt: [0; SALT_LEN],
            payload: vec![1, 2, 3],
        };
        assert_eq!(entry.payload_body(2), &[1, 2, 3]);
    }

    #[test]
    fn test_entry_serde_roundtrip() {
        let entry = AccountEntry {
            kind: EntryKind::Share(17),
            salt: [9; SALT_LEN],
            payload: vec![0xde, 0xad],
        };
        let json = serde_json::to_string(&entry).unwrap();
        let back: AccountEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.kind, EntryKind::Share(17));
        assert_eq!(back.salt, entry.salt);
        assert_eq!(back.payload, entry.payload);
    }
}
