//! Scaled DCT-II and DCT-IV kernel for power-of-two `N` (component B).
//!
//! `DCT2` is the classical radix-2 divide-and-conquer factorization: split
//! into a sum-half and a difference-half, recurse on each, interleave the
//! two half-transforms back together. `DCT4` is built on top of `DCT2` via
//! the identity `DCT4(x)[k] = DCT2(pad(x, 2N))[2k+1]` — the odd bins of a
//! double-length DCT-II of the zero-padded input are exactly the DCT-IV of
//! the original (checked directly against both definitions; see
//! `DESIGN.md`).
//!
//! "Scaled" means the orthonormal transform multiplied by `sqrt(N/2)`. For
//! DCT2 this reduces to a single division of bin 0 by `sqrt(2)`; DCT4's
//! orthonormal basis has no DC special case, so no correction is needed
//! there at all.

use crate::trig::twiddle_table;

const MIN_SIZE: usize = 8;

/// In-place scaled DCT-II. `tmp` must be distinct from `buf` and at least as
/// long. `buf.len()` must be a power of two, `>= 8`.
pub fn dct2(buf: &mut [f32], tmp: &mut [f32]) {
    let n = buf.len();
    assert!(n >= MIN_SIZE && n.is_power_of_two(), "dct2: N must be a power of two >= 8");
    assert!(tmp.len() >= n, "dct2: tmp too short");
    dct2_unscaled(buf, &mut tmp[..n]);
    buf[0] *= std::f32::consts::FRAC_1_SQRT_2;
}

/// In-place scaled DCT-IV. `tmp` must be distinct from `buf` and at least
/// `4 * buf.len()` long (a zero-padded working copy of size `2N`, plus that
/// copy's own `2N`-sized DCT2 scratch). `buf.len()` must be a power of two,
/// `>= 8`.
pub fn dct4(buf: &mut [f32], tmp: &mut [f32]) {
    let n = buf.len();
    assert!(n >= MIN_SIZE && n.is_power_of_two(), "dct4: N must be a power of two >= 8");
    let m = 2 * n;
    assert!(tmp.len() >= 4 * n, "dct4: tmp too short");
    let (padded, rest) = tmp.split_at_mut(m);
    let dct2_scratch = &mut rest[..m];
    padded[..n].copy_from_slice(buf);
    padded[n..].fill(0.0);
    dct2_unscaled(padded, dct2_scratch);
    for k in 0..n {
        buf[k] = padded[2 * k + 1];
    }
}

/// Returns the scratch length `dct4` requires for a given `buf` length.
pub fn dct4_scratch_len(n: usize) -> usize {
    4 * n
}

fn dct2_unscaled(x: &mut [f32], tmp: &mut [f32]) {
    let n = x.len();
    if n <= 1 {
        return;
    }
    let half = n / 2;
    let tbl = twiddle_table(half);
    for i in 0..half {
        let a = x[i];
        let b = x[n - 1 - i];
        tmp[i] = a + b;
        tmp[half + i] = (a - b) / (2.0 * tbl[i]);
    }
    x.copy_from_slice(tmp);
    let (alpha, beta) = x.split_at_mut(half);
    let (alpha_tmp, beta_tmp) = tmp.split_at_mut(half);
    dct2_unscaled(alpha, alpha_tmp);
    dct2_unscaled(beta, beta_tmp);

    for i in 0..half {
        tmp[2 * i] = x[i];
    }
    for i in 0..half.saturating_sub(1) {
        tmp[2 * i + 1] = x[half + i] + x[half + i + 1];
    }
    if half >= 1 {
        tmp[n - 1] = x[n - 1];
    }
    x.copy_from_slice(tmp);
}
