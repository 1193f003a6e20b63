//! Polynomial arithmetic over GF(256).
//!
//! A polynomial is a coefficient vector in increasing degree order:
//! `coeffs[i]` multiplies `x^i`. The sharer keeps one such polynomial per
//! secret byte; Lagrange recovery here rebuilds *whole coefficient vectors*
//! rather than just the value at x = 0, so a recovered sharer can keep
//! issuing and validating shares afterwards.

use crate::gf256::{gf_add, gf_div, gf_mul, gf_sub};

/// Evaluate a polynomial at `x` using Horner's method.
///
/// Evaluating at 0 would hand back the constant term (the secret byte), so a
/// zero `x` is an invariant violation; every caller range-checks first.
pub fn poly_eval(coeffs: &[u8], x: u8) -> u8 {
    assert!(x != 0, "polynomial evaluation at 0 would expose the secret");
    let mut acc = 0u8;
    for &c in coeffs.iter().rev() {
        acc = gf_add(gf_mul(acc, x), c);
    }
    acc
}

/// Multiply two polynomials (convolution over the field).
pub fn poly_mul(a: &[u8], b: &[u8]) -> Vec<u8> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let mut result = vec![0u8; a.len() + b.len() - 1];
    for (i, &ai) in a.iter().enumerate() {
        for (j, &bj) in b.iter().enumerate() {
            result[i + j] = gf_add(result[i + j], gf_mul(ai, bj));
        }
    }
    result
}

/// Add two polynomials, zero-padding the shorter operand.
pub fn poly_add(a: &[u8], b: &[u8]) -> Vec<u8> {
    let len = a.len().max(b.len());
    let mut result = Vec::with_capacity(len);
    for i in 0..len {
        let ai = a.get(i).copied().unwrap_or(0);
        let bi = b.get(i).copied().unwrap_or(0);
        result.push(gf_add(ai, bi));
    }
    result
}

/// Full Lagrange interpolation: reconstruct the entire coefficient vector of
/// the unique degree-(n−1) polynomial through the given points.
///
/// For each basis index i this builds `prod_{j≠i} (x - x_j)/(x_i - x_j)` as
/// an explicit polynomial, scales it by `fxs[i]`, and sums. The x-coordinates
/// must be distinct and nonzero (the sharer validates both); a duplicate
/// would divide by zero in the field.
pub fn full_lagrange(xs: &[u8], fxs: &[u8]) -> Vec<u8> {
    assert_eq!(xs.len(), fxs.len());
    let mut coeffs = Vec::new();

    for i in 0..xs.len() {
        let mut basis = vec![1u8];
        for j in 0..xs.len() {
            if i == j {
                continue;
            }
            let denominator = gf_sub(xs[i], xs[j]);
            // (x - x_j) / denominator; negation is identity in GF(256)
            let term = [gf_div(xs[j], denominator), gf_div(1, denominator)];
            basis = poly_mul(&basis, &term);
        }
        basis = poly_mul(&basis, &[fxs[i]]);
        coeffs = poly_add(&coeffs, &basis);
    }

    coeffs
}
