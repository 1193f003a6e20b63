//! The threshold password store.
//!
//! Passwords are protected so that checking any single credential requires
//! the store secret, and the secret itself is recoverable only from at least
//! `threshold` correct passwords. A freshly created store knows its secret
//! and can issue shares immediately; a store loaded from disk starts out
//! bootstrapping (secret unknown) until [`PasswordStore::unlock`] recombines
//! enough shares.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use polypass_shamir::{SecretSharer, ShamirError, Share};

use crate::account::{AccountEntry, EntryKind};
use crate::crypto::{
    integrity_fingerprint, isolated_matches, isolated_suffix, random_salt, random_secret,
    salted_hash, shield, xor_bytes, DIGEST_LEN, SECRET_LEN,
};
use crate::StoreError;

/// Serialized subset of store state. The secret and the live sharing
/// polynomials are not part of this type at all — there is nothing to scrub
/// around persistence.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedStore {
    /// Format version (for future compatibility)
    version: u32,
    /// Username -> credential entries
    accounts: BTreeMap<String, Vec<AccountEntry>>,
    /// Stretched hash of the secret + coefficient prefixes
    fingerprint: [u8; DIGEST_LEN],
}

const PERSIST_VERSION: u32 = 1;

/// Threshold password store.
pub struct PasswordStore {
    threshold: u8,
    isolated_check_bits: usize,
    accounts: BTreeMap<String, Vec<AccountEntry>>,
    /// Usernames with bootstrap entries awaiting promotion at unlock
    bootstrap_pending: Vec<String>,
    sharer: SecretSharer,
    /// The 256-bit protected secret; present exactly when the store is out
    /// of bootstrapping.
    shielded_key: Option<Zeroizing<[u8; SECRET_LEN]>>,
    fingerprint: [u8; DIGEST_LEN],
    /// Next unissued share index. Monotone; indices are never reclaimed,
    /// and the field caps usable shares at 255.
    next_share_index: u16,
}

impl PasswordStore {
    /// Create a fresh store with a newly generated secret.
    ///
    /// `isolated_check_bits` is the number of truncated-digest **bytes**
    /// appended to each protected entry for approximate validation while
    /// bootstrapping; 0 disables the feature.
    pub fn new(threshold: u8, isolated_check_bits: usize) -> Result<Self, StoreError> {
        if isolated_check_bits > DIGEST_LEN {
            return Err(StoreError::InvalidCheckBits(isolated_check_bits));
        }

        let secret = Zeroizing::new(random_secret());
        let sharer = SecretSharer::with_secret(threshold, secret.as_ref())?;
        let fingerprint = fingerprint_of(&sharer)?;

        Ok(Self {
            threshold,
            isolated_check_bits,
            accounts: BTreeMap::new(),
            bootstrap_pending: Vec::new(),
            sharer,
            shielded_key: Some(secret),
            fingerprint,
            next_share_index: 1,
        })
    }

    /// Load a store from a serialized blob. The result is bootstrapping: the
    /// secret is unknown until [`unlock`](Self::unlock) succeeds, so only
    /// bootstrap-account creation and isolated validation are available.
    pub fn load(
        threshold: u8,
        isolated_check_bits: usize,
        blob: &[u8],
    ) -> Result<Self, StoreError> {
        if isolated_check_bits > DIGEST_LEN {
            return Err(StoreError::InvalidCheckBits(isolated_check_bits));
        }

        let persisted: PersistedStore = serde_json::from_slice(blob)?;
        let sharer = SecretSharer::new(threshold)?;

        // Resume the share counter past everything ever issued. Doubling the
        // highest observed index (rather than continuing at max + 1) is the
        // historical on-disk-compatible behavior; the gap also covers
        // indices handed out after the last persist. See DESIGN.md.
        let max_issued = persisted
            .accounts
            .values()
            .flatten()
            .filter_map(|entry| match entry.kind {
                EntryKind::Share(index) => Some(index as u16),
                _ => None,
            })
            .max();
        let next_share_index = match max_issued {
            Some(max) => max * 2,
            None => 1,
        };

        // Bootstrap entries in the file are still pending promotion.
        let bootstrap_pending = persisted
            .accounts
            .iter()
            .filter(|(_, entries)| entries.iter().any(|e| e.kind == EntryKind::Bootstrap))
            .map(|(username, _)| username.clone())
            .collect();

        Ok(Self {
            threshold,
            isolated_check_bits,
            accounts: persisted.accounts,
            bootstrap_pending,
            sharer,
            shielded_key: None,
            fingerprint: persisted.fingerprint,
            next_share_index,
        })
    }

    /// Whether the secret is still unknown.
    pub fn is_bootstrapping(&self) -> bool {
        self.shielded_key.is_none()
    }

    /// The sharing threshold.
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Create an account protected by `shares` threshold shares (0 = a
    /// shielded account while the secret is known, a bootstrap account while
    /// bootstrapping).
    ///
    /// Validates everything before touching store state: a failed creation
    /// allocates no share indices and leaves no partial account.
    pub fn create_account(
        &mut self,
        username: &str,
        password: &[u8],
        shares: u8,
    ) -> Result<(), StoreError> {
        if self.accounts.contains_key(username) {
            return Err(StoreError::DuplicateUser(username.to_string()));
        }
        if shares as u16 + self.next_share_index > 255 {
            return Err(StoreError::ShareSpaceExhausted {
                requested: shares,
                next_index: self.next_share_index,
            });
        }

        let key = match &self.shielded_key {
            None => {
                // Bootstrapping: threshold shares cannot exist before the
                // secret does.
                if shares != 0 {
                    return Err(StoreError::StillBootstrapping);
                }
                let salt = random_salt();
                let hash = salted_hash(&salt, password);
                self.accounts.insert(
                    username.to_string(),
                    vec![AccountEntry {
                        kind: EntryKind::Bootstrap,
                        salt,
                        payload: hash.to_vec(),
                    }],
                );
                self.bootstrap_pending.push(username.to_string());
                return Ok(());
            }
            Some(key) => key,
        };

        if shares == 0 {
            // Shielded account: encrypt the salted hash under the store
            // secret. Consumes no share index.
            let salt = random_salt();
            let hash = salted_hash(&salt, password);
            let mut payload = shield(key, &hash).to_vec();
            payload.extend(isolated_suffix(&hash, self.isolated_check_bits));
            self.accounts.insert(
                username.to_string(),
                vec![AccountEntry {
                    kind: EntryKind::Shielded,
                    salt,
                    payload,
                }],
            );
            return Ok(());
        }

        // Threshold-share entries: one per consecutive index, each payload
        // the salted hash XORed with the share at that index.
        let mut entries = Vec::with_capacity(shares as usize);
        for index in self.next_share_index..self.next_share_index + shares as u16 {
            let share = self.sharer.compute_share(index as u8)?;
            let salt = random_salt();
            let hash = salted_hash(&salt, password);
            let mut payload = xor_bytes(&hash, &share.data);
            payload.extend(isolated_suffix(&hash, self.isolated_check_bits));
            entries.push(AccountEntry {
                kind: EntryKind::Share(index as u8),
                salt,
                payload,
            });
        }

        self.accounts.insert(username.to_string(), entries);
        self.next_share_index += shares as u16;
        Ok(())
    }

    /// Check a password. `Ok(false)` is an ordinary wrong password; errors
    /// mean the check could not be performed at all.
    ///
    /// Each entry is checked independently and the first entry decides: a
    /// bootstrap entry authoritatively, other entries via the isolated bits
    /// while bootstrapping (approximate), or via the secret once known.
    pub fn is_valid_login(&self, username: &str, password: &[u8]) -> Result<bool, StoreError> {
        let entries = self
            .accounts
            .get(username)
            .ok_or_else(|| StoreError::UnknownUser(username.to_string()))?;

        if self.shielded_key.is_none() && self.isolated_check_bits == 0 {
            return Err(StoreError::StillBootstrapping);
        }

        for entry in entries {
            let hash = salted_hash(&entry.salt, password);

            if entry.kind == EntryKind::Bootstrap {
                // Plain salted hash, exact comparison.
                return Ok(entry.payload.as_slice() == hash.as_slice());
            }

            let key = match &self.shielded_key {
                Some(key) => key,
                None => {
                    // Bootstrapping: the isolated bits are the only signal.
                    // False accepts happen with probability 2^-(8 * bytes).
                    return Ok(isolated_matches(
                        &hash,
                        &entry.payload,
                        self.isolated_check_bits,
                    ));
                }
            };

            let body = entry.payload_body(self.isolated_check_bits);
            let matched = match entry.kind {
                EntryKind::Bootstrap => unreachable!("handled above"),
                EntryKind::Shielded => {
                    // Re-encrypt and compare ciphertexts; decryption is
                    // never needed.
                    body == shield(key, &hash).as_slice()
                }
                EntryKind::Share(index) => {
                    let candidate = Share {
                        index,
                        data: xor_bytes(&hash, body),
                    };
                    self.sharer.is_valid_share(&candidate)?
                }
            };

            if !matched && isolated_matches(&hash, &entry.payload, self.isolated_check_bits) {
                // The truncated digest agrees but the authoritative check
                // does not: either an astronomically unlucky wrong password
                // or somebody rewrote the stored payload.
                log::warn!(
                    "isolated check matched but full verification failed for '{}' — possible break-in",
                    username
                );
            }
            return Ok(matched);
        }

        Ok(false)
    }

    /// Recover the store secret from a set of (username, password)
    /// credentials and leave bootstrapping.
    ///
    /// Candidate shares are recomputed from every threshold-share entry of
    /// the named accounts (shielded entries need the secret and bootstrap
    /// entries carry no share; both are skipped). Recombination errors
    /// propagate from the sharer; a structurally valid recombination that
    /// fails the integrity fingerprint is rejected as
    /// [`StoreError::WrongRecombination`]. A failed unlock leaves the store
    /// unchanged.
    pub fn unlock(&mut self, credentials: &[(&str, &[u8])]) -> Result<(), StoreError> {
        if self.shielded_key.is_some() {
            return Err(StoreError::AlreadyUnlocked);
        }

        let mut shares = Vec::new();
        for (username, password) in credentials {
            let entries = self
                .accounts
                .get(*username)
                .ok_or_else(|| StoreError::UnknownUser(username.to_string()))?;

            for entry in entries {
                if let EntryKind::Share(index) = entry.kind {
                    let hash = salted_hash(&entry.salt, password);
                    let body = entry.payload_body(self.isolated_check_bits);
                    shares.push(Share {
                        index,
                        data: xor_bytes(&hash, body),
                    });
                }
            }
        }

        // Recover on a scratch sharer so the store's own sharer stays
        // pristine (and retryable) if anything below fails.
        let mut candidate = SecretSharer::new(self.threshold)?;
        candidate.recover_secretdata(&shares)?;

        if fingerprint_of(&candidate)? != self.fingerprint {
            return Err(StoreError::WrongRecombination);
        }
        let secret = candidate.secret().ok_or(ShamirError::NotInitialized)?;
        let key: [u8; SECRET_LEN] = secret
            .try_into()
            .map_err(|_| StoreError::WrongRecombination)?;
        let key = Zeroizing::new(key);

        // Promote pending bootstrap entries: encrypt the stored salted hash
        // under the recovered key and derive the isolated suffix from it.
        for username in std::mem::take(&mut self.bootstrap_pending) {
            let Some(entries) = self.accounts.get_mut(&username) else {
                continue;
            };
            for entry in entries {
                if entry.kind != EntryKind::Bootstrap {
                    continue;
                }
                let Ok(hash) = <[u8; DIGEST_LEN]>::try_from(entry.payload.as_slice()) else {
                    continue;
                };
                let mut payload = shield(&key, &hash).to_vec();
                payload.extend(isolated_suffix(&hash, self.isolated_check_bits));
                entry.payload = payload;
                entry.kind = EntryKind::Shielded;
            }
        }

        self.sharer = candidate;
        self.shielded_key = Some(key);
        Ok(())
    }

    /// Serialize account records and the integrity fingerprint to an opaque
    /// blob. The secret and the live polynomials are never written.
    ///
    /// Fails if fewer than `threshold` share indices have been issued:
    /// persisting then would produce a file that no set of credentials could
    /// ever unlock.
    pub fn serialize(&self) -> Result<Vec<u8>, StoreError> {
        if self.threshold as u16 >= self.next_share_index {
            return Err(StoreError::UndecodableStore {
                threshold: self.threshold,
                issued: self.next_share_index - 1,
            });
        }

        let persisted = PersistedStore {
            version: PERSIST_VERSION,
            accounts: self.accounts.clone(),
            fingerprint: self.fingerprint,
        };
        Ok(serde_json::to_vec(&persisted)?)
    }
}

/// Fingerprint of a sharer's secret and coefficient vectors.
fn fingerprint_of(sharer: &SecretSharer) -> Result<[u8; DIGEST_LEN], StoreError> {
    let secret = sharer.secret().ok_or(ShamirError::NotInitialized)?;
    let coefficients = sharer.coefficients().ok_or(ShamirError::NotInitialized)?;
    Ok(integrity_fingerprint(
        secret,
        coefficients,
        sharer.threshold(),
    ))
}
