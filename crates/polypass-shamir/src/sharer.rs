//! Incremental secret sharer.
//!
//! Unlike one-shot split/reconstruct APIs, the sharer keeps its per-byte
//! polynomials so shares can be issued one at a time, individual shares can
//! be validated against the live polynomials, and a sharer rebuilt from
//! shares keeps working exactly like a freshly seeded one.

use crate::poly::{full_lagrange, poly_eval};
use crate::ShamirError;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// A single share: an x-coordinate and one polynomial evaluation per secret
/// byte. Index 0 is reserved (evaluating there would reveal the secret).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Share {
    /// Share index (1..=255, never 0)
    pub index: u8,
    /// One field element per secret byte
    pub data: Vec<u8>,
}

/// Shamir secret sharer over GF(256).
///
/// Lifecycle: constructed uninitialized (threshold only) and populated exactly
/// once via [`recover_secretdata`](Self::recover_secretdata), or constructed
/// seeded via [`with_secret`](Self::with_secret). Either way, once secret data
/// is present it is never overwritten.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretSharer {
    threshold: u8,
    secret: Option<Vec<u8>>,
    /// One coefficient vector per secret byte; constant term is the secret
    /// byte, the `threshold - 1` above it are random.
    coefficients: Option<Vec<Vec<u8>>>,
}

impl SecretSharer {
    /// Create an uninitialized sharer that can later recover a secret from
    /// shares.
    pub fn new(threshold: u8) -> Result<Self, ShamirError> {
        if threshold == 0 {
            return Err(ShamirError::InvalidThreshold);
        }
        Ok(Self {
            threshold,
            secret: None,
            coefficients: None,
        })
    }

    /// Create a sharer seeded with a known secret, generating one random
    /// polynomial per secret byte.
    pub fn with_secret(threshold: u8, secret: &[u8]) -> Result<Self, ShamirError> {
        let mut sharer = Self::new(threshold)?;

        let mut coefficients = Vec::with_capacity(secret.len());
        for &secret_byte in secret {
            let mut coeffs = vec![0u8; threshold as usize];
            coeffs[0] = secret_byte;
            OsRng.fill_bytes(&mut coeffs[1..]);
            coefficients.push(coeffs);
        }

        sharer.secret = Some(secret.to_vec());
        sharer.coefficients = Some(coefficients);
        Ok(sharer)
    }

    /// The threshold this sharer was created with.
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// The secret bytes, if seeded or recovered.
    pub fn secret(&self) -> Option<&[u8]> {
        self.secret.as_deref()
    }

    /// The per-byte coefficient vectors. The protocol layer folds prefixes of
    /// these into its integrity fingerprint.
    pub fn coefficients(&self) -> Option<&[Vec<u8>]> {
        self.coefficients.as_deref()
    }

    /// Compute the share at index `x` by evaluating every byte's polynomial.
    pub fn compute_share(&self, x: u8) -> Result<Share, ShamirError> {
        if x == 0 {
            return Err(ShamirError::InvalidIndex(x));
        }
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(ShamirError::NotInitialized)?;

        let data = coefficients.iter().map(|c| poly_eval(c, x)).collect();
        Ok(Share { index: x, data })
    }

    /// Check a share against the live polynomials.
    ///
    /// A malformed share (index 0, or a value vector whose length doesn't
    /// match the secret) is a caller bug and surfaces as an error; a
    /// well-formed share with wrong values is an expected negative and
    /// returns `Ok(false)`.
    pub fn is_valid_share(&self, share: &Share) -> Result<bool, ShamirError> {
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or(ShamirError::NotInitialized)?;
        if share.index == 0 {
            return Err(ShamirError::InvalidIndex(share.index));
        }
        if share.data.len() != coefficients.len() {
            return Err(ShamirError::MalformedShare {
                expected: coefficients.len(),
                got: share.data.len(),
            });
        }

        let correct = self.compute_share(share.index)?;
        Ok(correct == *share)
    }

    /// Recover the secret and the full per-byte coefficient vectors from at
    /// least `threshold` shares. One-shot: fails if secret data is already
    /// present rather than silently overwriting it.
    ///
    /// When more shares than the threshold are supplied, the reconstructed
    /// polynomials must have zero coefficients at degree >= threshold; a
    /// nonzero high coefficient means the shares are mutually inconsistent
    /// even though each is well-formed, and recovery fails with
    /// [`ShamirError::TamperedShares`]. With *exactly* threshold shares that
    /// check has no slack — tampering then yields a structurally valid but
    /// wrong secret, which only an external fingerprint can catch.
    pub fn recover_secretdata(&mut self, shares: &[Share]) -> Result<(), ShamirError> {
        if self.secret.is_some() || self.coefficients.is_some() {
            return Err(ShamirError::AlreadyInitialized);
        }

        // Discard exact duplicates (same index *and* same data); a repeated
        // index with different data is caught below.
        let mut unique: Vec<&Share> = Vec::new();
        for share in shares {
            if !unique.iter().any(|u| *u == share) {
                unique.push(share);
            }
        }

        if unique.len() < self.threshold as usize {
            return Err(ShamirError::InsufficientShares {
                have: unique.len(),
                need: self.threshold as usize,
            });
        }

        let len = unique[0].data.len();
        let mut xs = Vec::with_capacity(unique.len());
        for share in &unique {
            if share.index == 0 {
                return Err(ShamirError::InvalidIndex(share.index));
            }
            if xs.contains(&share.index) {
                return Err(ShamirError::InconsistentShares(format!(
                    "different shares with the same index {}",
                    share.index
                )));
            }
            if share.data.len() != len {
                return Err(ShamirError::InconsistentShares(
                    "shares have different lengths".into(),
                ));
            }
            xs.push(share.index);
        }

        let threshold = self.threshold as usize;
        let mut secret = Vec::with_capacity(len);
        let mut coefficients = Vec::with_capacity(len);

        for byte_idx in 0..len {
            let fxs: Vec<u8> = unique.iter().map(|s| s.data[byte_idx]).collect();
            let mut recovered = full_lagrange(&xs, &fxs);

            if recovered[threshold.min(recovered.len())..]
                .iter()
                .any(|&c| c != 0)
            {
                return Err(ShamirError::TamperedShares);
            }

            // Trim the zero tail from over-threshold interpolation so a
            // recovered sharer carries exactly `threshold` coefficients per
            // byte, same as a seeded one.
            recovered.truncate(threshold);
            secret.push(recovered[0]);
            coefficients.push(recovered);
        }

        self.secret = Some(secret);
        self.coefficients = Some(coefficients);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"my shared secret";

    #[test]
    fn test_share_roundtrip_every_index() {
        let sharer = SecretSharer::with_secret(2, SECRET).unwrap();
        for x in 1..=255u8 {
            let share = sharer.compute_share(x).unwrap();
            assert_eq!(share.index, x);
            assert_eq!(share.data.len(), SECRET.len());
            assert!(sharer.is_valid_share(&share).unwrap());
        }
    }

    #[test]
    fn test_tampered_share_is_invalid() {
        let sharer = SecretSharer::with_secret(3, SECRET).unwrap();
        let mut share = sharer.compute_share(7).unwrap();
        share.data[3] ^= 1;
        assert!(!sharer.is_valid_share(&share).unwrap());
    }

    #[test]
    fn test_malformed_share_is_an_error_not_false() {
        let sharer = SecretSharer::with_secret(2, SECRET).unwrap();
        let mut share = sharer.compute_share(1).unwrap();
        share.data.pop();
        assert!(matches!(
            sharer.is_valid_share(&share),
            Err(ShamirError::MalformedShare { .. })
        ));
        assert!(matches!(
            sharer.is_valid_share(&Share {
                index: 0,
                data: vec![0; SECRET.len()]
            }),
            Err(ShamirError::InvalidIndex(0))
        ));
    }

    #[test]
    fn test_compute_share_index_zero_rejected() {
        let sharer = SecretSharer::with_secret(2, SECRET).unwrap();
        assert!(matches!(
            sharer.compute_share(0),
            Err(ShamirError::InvalidIndex(0))
        ));
    }

    #[test]
    fn test_uninitialized_sharer_errors() {
        let sharer = SecretSharer::new(2).unwrap();
        assert!(matches!(
            sharer.compute_share(1),
            Err(ShamirError::NotInitialized)
        ));
    }

    #[test]
    fn test_recover_roundtrip() {
        let sharer = SecretSharer::with_secret(2, SECRET).unwrap();
        let shares: Vec<Share> = [4u8, 6, 1, 2]
            .iter()
            .map(|&x| sharer.compute_share(x).unwrap())
            .collect();

        let mut recovered = SecretSharer::new(2).unwrap();
        recovered.recover_secretdata(&shares[..3]).unwrap();
        assert_eq!(recovered.secret(), Some(SECRET));

        // a recovered sharer validates shares it never saw
        assert!(recovered.is_valid_share(&shares[3]).unwrap());
    }

    #[test]
    fn test_recovered_sharer_issues_matching_shares() {
        let sharer = SecretSharer::with_secret(3, SECRET).unwrap();
        let shares: Vec<Share> = (1..=3)
            .map(|x| sharer.compute_share(x).unwrap())
            .collect();

        let mut recovered = SecretSharer::new(3).unwrap();
        recovered.recover_secretdata(&shares).unwrap();
        assert_eq!(
            recovered.compute_share(200).unwrap(),
            sharer.compute_share(200).unwrap()
        );
    }

    #[test]
    fn test_insufficient_shares() {
        let sharer = SecretSharer::with_secret(3, SECRET).unwrap();
        let shares: Vec<Share> = (1..=2)
            .map(|x| sharer.compute_share(x).unwrap())
            .collect();

        let mut recovered = SecretSharer::new(3).unwrap();
        assert!(matches!(
            recovered.recover_secretdata(&shares),
            Err(ShamirError::InsufficientShares { have: 2, need: 3 })
        ));
    }

    #[test]
    fn test_duplicate_shares_deduped_before_counting() {
        let sharer = SecretSharer::with_secret(2, SECRET).unwrap();
        let share = sharer.compute_share(9).unwrap();

        // two copies of the same share are one unique share
        let mut recovered = SecretSharer::new(2).unwrap();
        assert!(matches!(
            recovered.recover_secretdata(&[share.clone(), share]),
            Err(ShamirError::InsufficientShares { have: 1, need: 2 })
        ));
    }

    #[test]
    fn test_same_index_different_data_inconsistent() {
        let sharer = SecretSharer::with_secret(2, SECRET).unwrap();
        let a = sharer.compute_share(5).unwrap();
        let mut b = a.clone();
        b.data[0] ^= 0xff;
        let c = sharer.compute_share(6).unwrap();

        let mut recovered = SecretSharer::new(2).unwrap();
        assert!(matches!(
            recovered.recover_secretdata(&[a, b, c]),
            Err(ShamirError::InconsistentShares(_))
        ));
    }

    #[test]
    fn test_over_threshold_tampering_detected() {
        let sharer = SecretSharer::with_secret(2, SECRET).unwrap();
        let mut shares: Vec<Share> = (1..=3)
            .map(|x| sharer.compute_share(x).unwrap())
            .collect();
        shares[1].data[0] ^= 1;

        let mut recovered = SecretSharer::new(2).unwrap();
        assert!(matches!(
            recovered.recover_secretdata(&shares),
            Err(ShamirError::TamperedShares)
        ));
    }

    #[test]
    fn test_exactly_threshold_tampering_gives_wrong_secret() {
        // With no spare shares the consistency check has nothing to work
        // with: recovery "succeeds" into a wrong secret. Callers that need to
        // catch this must verify the result against an external fingerprint.
        let sharer = SecretSharer::with_secret(2, SECRET).unwrap();
        let mut shares: Vec<Share> = (1..=2)
            .map(|x| sharer.compute_share(x).unwrap())
            .collect();
        shares[0].data[0] ^= 1;

        let mut recovered = SecretSharer::new(2).unwrap();
        recovered.recover_secretdata(&shares).unwrap();
        assert_ne!(recovered.secret(), Some(SECRET));
    }

    #[test]
    fn test_recovery_is_one_shot() {
        let sharer = SecretSharer::with_secret(2, SECRET).unwrap();
        let shares: Vec<Share> = (1..=2)
            .map(|x| sharer.compute_share(x).unwrap())
            .collect();

        let mut recovered = SecretSharer::new(2).unwrap();
        recovered.recover_secretdata(&shares).unwrap();
        assert!(matches!(
            recovered.recover_secretdata(&shares),
            Err(ShamirError::AlreadyInitialized)
        ));

        let mut seeded = SecretSharer::with_secret(2, SECRET).unwrap();
        assert!(matches!(
            seeded.recover_secretdata(&shares),
            Err(ShamirError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_threshold_one_is_allowed() {
        let sharer = SecretSharer::with_secret(1, SECRET).unwrap();
        let share = sharer.compute_share(1).unwrap();
        // threshold 1 means every share *is* the secret
        assert_eq!(share.data, SECRET);

        assert!(matches!(
            SecretSharer::new(0),
            Err(ShamirError::InvalidThreshold)
        ));
    }
}
