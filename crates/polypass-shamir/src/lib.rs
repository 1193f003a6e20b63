//! Polypass Shamir Module
//!
//! Incremental Shamir's Secret Sharing over GF(256), built for a threshold
//! password store: shares are issued one index at a time, individual shares
//! can be validated against the live polynomials, and recovery rebuilds the
//! full coefficient vectors so a recovered sharer keeps working.
//!
//! # Example
//!
//! ```
//! use polypass_shamir::SecretSharer;
//!
//! // seed a sharer with a secret; any 2 shares recover it
//! let sharer = SecretSharer::with_secret(2, b"my shared secret").unwrap();
//! let a = sharer.compute_share(4).unwrap();
//! let b = sharer.compute_share(6).unwrap();
//! let c = sharer.compute_share(1).unwrap();
//!
//! // rebuild from shares alone
//! let mut recovered = SecretSharer::new(2).unwrap();
//! recovered.recover_secretdata(&[a, b]).unwrap();
//! assert_eq!(recovered.secret(), Some(&b"my shared secret"[..]));
//!
//! // a recovered sharer validates shares it never saw
//! assert!(recovered.is_valid_share(&c).unwrap());
//! ```

pub mod gf256;
pub mod poly;
pub mod sharer;

// Re-exports
pub use sharer::{SecretSharer, Share};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ShamirError {
    #[error("threshold must be at least 1")]
    InvalidThreshold,
    #[error("share index {0} out of range (must be 1-255)")]
    InvalidIndex(u8),
    #[error("sharer has no secret data yet")]
    NotInitialized,
    #[error("sharer already holds secret data")]
    AlreadyInitialized,
    #[error("share has {got} value bytes, expected {expected}")]
    MalformedShare { expected: usize, got: usize },
    #[error("not enough unique shares: have {have}, need {need}")]
    InsufficientShares { have: usize, need: usize },
    #[error("inconsistent shares: {0}")]
    InconsistentShares(String),
    #[error("shares do not lie on a single degree-(threshold-1) polynomial")]
    TamperedShares,
}
