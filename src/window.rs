//! Half-length analysis/synthesis window builder (component D).
//!
//! Only the half-window `Window[0..N/2)` is ever stored; the full window is
//! the implicit even extension `full[N-1-n] = full[n] = Window[n]`, which
//! the freeze engine reconstructs on the fly rather than materializing.

use crate::error::SpectriceError;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Analysis/synthesis window shape. Each kind has a minimum hop count below
/// which constant-overlap-add reconstruction is not guaranteed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Sine,
    Hann,
    Hamming,
    Blackman,
    Nuttall,
}

impl WindowKind {
    /// Minimum hop count (`H`) this window shape supports.
    pub fn min_hop_count(self) -> usize {
        match self {
            WindowKind::Sine => 2,
            WindowKind::Hann => 3,
            WindowKind::Hamming => 3,
            WindowKind::Blackman => 5,
            WindowKind::Nuttall => 7,
        }
    }

    fn raw(self, x: f64) -> f64 {
        match self {
            WindowKind::Sine => (x / 2.0).sin(),
            WindowKind::Hann => 0.5 - 0.5 * x.cos(),
            WindowKind::Hamming => 25.0 / 46.0 - 21.0 / 46.0 * x.cos(),
            WindowKind::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
            WindowKind::Nuttall => {
                0.3635819 - 0.4891775 * x.cos() + 0.1365995 * (2.0 * x).cos()
                    - 0.0106411 * (3.0 * x).cos()
            }
        }
    }
}

/// Builds the normalized half-window for `kind` at block size `n` with hop
/// count `h`. Fails with [`SpectriceError::InvalidConfiguration`] if `h` is
/// below the shape's minimum.
pub fn build_window(kind: WindowKind, n: usize, h: usize) -> Result<Vec<f32>, SpectriceError> {
    let min_h = kind.min_hop_count();
    if h < min_h {
        return Err(SpectriceError::InvalidConfiguration(format!(
            "{:?} window requires at least {} hops, got {}",
            kind, min_h, h
        )));
    }

    let half = n / 2;
    let mut window: Vec<f64> = (0..half)
        .map(|k| {
            let x = (k as f64 + 0.5) * 2.0 * PI / n as f64;
            kind.raw(x)
        })
        .collect();

    let sum_sq: f64 = window.iter().map(|v| v * v).sum();
    let scale = (1.0 / (2.0 * sum_sq * h as f64)).sqrt();
    for v in window.iter_mut() {
        *v *= scale;
    }

    Ok(window.into_iter().map(|v| v as f32).collect())
}
