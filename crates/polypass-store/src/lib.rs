//! Polypass Store
//!
//! A threshold password store: stolen password data is useless below a
//! threshold of correct credentials.
//!
//! Every account's salted hash is masked with a Shamir share of a 256-bit
//! store secret (or encrypted directly under it, for zero-share "shielded"
//! accounts). Checking any one password therefore requires the secret, and
//! the secret can only be recombined from at least `threshold` correct
//! passwords — an attacker with a copy of the store on disk cannot crack
//! accounts offline one at a time.
//!
//! # Example
//!
//! ```
//! use polypass_store::PasswordStore;
//!
//! // any 2 correct passwords recombine the store secret
//! let mut store = PasswordStore::new(2, 0).unwrap();
//! store.create_account("admin", b"correct horse", 2).unwrap();
//! store.create_account("alice", b"kitten", 1).unwrap();
//! store.create_account("eve", b"iamevil", 0).unwrap(); // shielded
//!
//! assert!(store.is_valid_login("alice", b"kitten").unwrap());
//! assert!(!store.is_valid_login("alice", b"nyancat!").unwrap());
//!
//! // persist, reload: the file alone can't validate anything...
//! let blob = store.serialize().unwrap();
//! let mut reloaded = PasswordStore::load(2, 0, &blob).unwrap();
//! assert!(reloaded.is_valid_login("alice", b"kitten").is_err());
//!
//! // ...until enough credentials recombine the secret
//! reloaded
//!     .unlock(&[("admin", b"correct horse")])
//!     .unwrap();
//! assert!(reloaded.is_valid_login("alice", b"kitten").unwrap());
//! ```

pub mod account;
pub mod crypto;
pub mod store;

// Re-exports
pub use account::{AccountEntry, EntryKind};
pub use store::PasswordStore;

use polypass_shamir::ShamirError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("user '{0}' already exists")]
    DuplicateUser(String),
    #[error("unknown user '{0}'")]
    UnknownUser(String),
    #[error("secret not yet recovered (unlock the store first)")]
    StillBootstrapping,
    #[error("store already holds its secret")]
    AlreadyUnlocked,
    #[error("cannot issue {requested} shares starting at index {next_index}: the field caps indices at 255")]
    ShareSpaceExhausted { requested: u8, next_index: u16 },
    #[error("isolated check bits {0} exceeds the digest width of 32 bytes")]
    InvalidCheckBits(usize),
    #[error("recombination succeeded structurally but does not match the integrity fingerprint")]
    WrongRecombination,
    #[error("refusing to persist: only {issued} shares issued, below the threshold of {threshold}")]
    UndecodableStore { threshold: u8, issued: u16 },
    #[error(transparent)]
    Shamir(#[from] ShamirError),
    #[error("persistence format error: {0}")]
    Persistence(#[from] serde_json::Error),
}
