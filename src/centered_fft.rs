//! Real-to-complex and complex-to-real centered DFT (component C), built on
//! two half-size DCT-IVs.
//!
//! The *centered* DFT treats the `N` real input samples as indexed from
//! `-N/2..N/2-1` rather than `0..N-1`, which shifts the frequency grid by
//! half a bin and makes it symmetric about DC — exactly what phase-coherent
//! freezing needs (`spec.md` §4.C).
//!
//! Implementation shape: split the input around its midpoint into an
//! even-symmetric half (summed) and an odd-antisymmetric half (differenced,
//! with an alternating sign flip to make it DST-IV-compatible), run one
//! DCT-IV on each half for the real and imaginary coefficients, and
//! interleave them — with the antisymmetric half's output reversed and
//! sign-flipped per the DST-IV convention. The inverse is the exact
//! structural dual and fully self-normalizes (it divides out the DCT-IV
//! involution factor explicitly), so `ifft_centered(fft_centered(x)) == x`
//! up to floating-point error with no residual gain left for callers to
//! absorb elsewhere.

use crate::dct::{dct4, dct4_scratch_len};

const MIN_SIZE: usize = 16;

/// Scratch length required by [`fft_centered`] / [`ifft_centered`] for a
/// frame of length `n`.
pub fn centered_fft_scratch_len(n: usize) -> usize {
    let half = n / 2;
    2 * half + dct4_scratch_len(half)
}

/// Forward centered DFT. `x` has `n` real samples; `out` receives `n/2`
/// complex pairs packed as `[Re0, Im0, Re1, Im1, ...]`. `n` must be a power
/// of two, `n >= 16`. `scratch` must be at least
/// [`centered_fft_scratch_len`] long.
pub fn fft_centered(x: &[f32], out: &mut [f32], scratch: &mut [f32]) {
    let n = x.len();
    assert!(n >= MIN_SIZE && n.is_power_of_two(), "fft_centered: N must be a power of two >= 16");
    assert_eq!(out.len(), n, "fft_centered: out must hold N/2 complex pairs");
    assert!(scratch.len() >= centered_fft_scratch_len(n));
    let half = n / 2;

    let (sym, rest) = scratch.split_at_mut(half);
    let (anti, dct4_tmp) = rest.split_at_mut(half);

    for m in 0..half {
        let a = x[m];
        let b = x[n - 1 - m];
        sym[m] = a + b;
        let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
        anti[m] = sign * (a - b);
    }

    dct4(sym, dct4_tmp);
    dct4(anti, dct4_tmp);

    for b in 0..half {
        out[2 * b] = sym[b];
        out[2 * b + 1] = -anti[half - 1 - b];
    }
}

/// Inverse centered DFT: the exact structural dual of [`fft_centered`].
/// `spectrum` holds `n/2` complex pairs; `out` receives `n` real samples.
pub fn ifft_centered(spectrum: &[f32], out: &mut [f32], scratch: &mut [f32]) {
    let n = out.len();
    assert!(n >= MIN_SIZE && n.is_power_of_two(), "ifft_centered: N must be a power of two >= 16");
    assert_eq!(spectrum.len(), n, "ifft_centered: spectrum must hold N/2 complex pairs");
    assert!(scratch.len() >= centered_fft_scratch_len(n));
    let half = n / 2;

    let (rc, rest) = scratch.split_at_mut(half);
    let (ic, dct4_tmp) = rest.split_at_mut(half);

    for b in 0..half {
        rc[b] = spectrum[2 * b];
    }
    for m in 0..half {
        ic[m] = -spectrum[2 * (half - 1 - m) + 1];
    }

    dct4(rc, dct4_tmp);
    dct4(ic, dct4_tmp);

    // DCT4 applied twice to a size-`half` array returns `(half/2) * input`;
    // divide that factor back out to fully recover `sym`/`anti`.
    let factor = half as f32 / 2.0;
    for m in 0..half {
        rc[m] /= factor;
        ic[m] /= factor;
    }

    for m in 0..half {
        let sign = if m % 2 == 0 { 1.0 } else { -1.0 };
        let sum = rc[m];
        let diff = sign * ic[m];
        out[m] = (sum + diff) * 0.5;
        out[n - 1 - m] = (sum - diff) * 0.5;
    }
}
