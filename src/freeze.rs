//! Per-channel, per-hop freeze state machine (component E).
//!
//! This is the centerpiece: window the analysis frame, transform it,
//! freeze/blend each bin against stored or snapshot references, transform
//! back, and overlap-add into the synthesis ring. Everything here runs on
//! the `process` hot path, so nothing allocates and nothing logs.

use crate::centered_fft::{centered_fft_scratch_len, fft_centered, ifft_centered};
use std::f32::consts::PI;

/// One channel's worth of freeze state: the magnitude reference and, when
/// phase freezing is enabled, the phase-tracking buffers. Borrowed as plain
/// slices out of the session's single backing allocation.
pub struct ChannelState<'a> {
    pub fwd_lap: &'a mut [f32],
    pub inv_lap: &'a mut [f32],
    pub abs: &'a mut [f32],
    pub arg_accum: Option<&'a mut [f32]>,
    pub arg_prev: Option<&'a mut [f32]>,
    pub arg_step: Option<&'a mut [f32]>,
    /// Mirrors the session-wide `HaveSnapshot` flag (`spec.md` §3); passed
    /// in per call rather than stored, since the session is the sole owner
    /// of that bit of state.
    pub have_snapshot: bool,
}

/// Parameters that don't change hop to hop, passed in by the session.
pub struct FreezeParams<'a> {
    pub window: &'a [f32],
    pub hop_size: usize,
    pub hop_count: usize,
    pub freeze_start: usize,
    pub freeze_peak: usize,
    pub freeze_factor: f32,
    pub freeze_amp: bool,
    pub freeze_phase: bool,
}

/// Scratch a single hop needs: a full analysis/synthesis frame, the
/// interleaved complex spectrum, and the centered-FFT's own scratch.
pub fn hop_scratch_len(n: usize) -> usize {
    n + n + centered_fft_scratch_len(n)
}

fn wrap01(mut v: f32) -> f32 {
    v -= v.floor();
    if v >= 1.0 {
        v -= 1.0;
    }
    if v < 0.0 {
        v += 1.0;
    }
    v
}

/// Runs a single hop for one channel: windowing, forward transform,
/// per-bin freeze update, inverse transform, and OLA accumulate. `hop_idx`
/// is the hop's index within the current block (`0..hop_count`), used
/// together with `block_idx` to compute the crossfade position.
///
/// Does not perform the emit/shift step (§4.E.1 step 7) — that is the
/// session's job since it also owns the next input ingestion.
pub fn run_hop(
    params: &FreezeParams,
    block_idx: u64,
    hop_idx: usize,
    state: &mut ChannelState,
    scratch: &mut [f32],
) {
    let n = params.window.len() * 2;
    let half = n / 2;
    assert!(scratch.len() >= hop_scratch_len(n));

    let (frame, rest) = scratch.split_at_mut(n);
    let (spectrum, fft_scratch) = rest.split_at_mut(n);

    for k in 0..n {
        let w = if k < half { params.window[k] } else { params.window[n - 1 - k] };
        frame[k] = w * state.fwd_lap[k];
    }

    fft_centered(frame, spectrum, fft_scratch);

    let idx = block_idx as i64 * n as i64 + hop_idx as i64 * params.hop_size as i64;
    let lambda = mix_ratio(idx, params);

    for b in 0..half {
        let re = spectrum[2 * b];
        let im = spectrum[2 * b + 1];
        let mut abs_b = (re * re + im * im).sqrt();
        // atan2 returns (-pi, pi]; wrap to [0,1) cycles so every phase this
        // engine stores satisfies the same invariant.
        let mut arg_b = wrap01(im.atan2(re) / (2.0 * PI));

        if params.freeze_amp {
            if !state.have_snapshot {
                state.abs[b] = abs_b;
            } else {
                abs_b = lambda * state.abs[b] + (1.0 - lambda) * abs_b;
            }
        }

        if params.freeze_phase {
            let arg_prev = state.arg_prev.as_mut().expect("phase freeze requires arg_prev");
            let arg_step = state.arg_step.as_mut().expect("phase freeze requires arg_step");
            let arg_accum = state.arg_accum.as_mut().expect("phase freeze requires arg_accum");

            let mut d_arg = arg_b - arg_prev[b];
            arg_prev[b] = arg_b;

            let expected = b as f32 / params.hop_count as f32;
            d_arg += expected;
            d_arg = wrap01(d_arg);

            d_arg = lambda * arg_step[b] + (1.0 - lambda) * d_arg;
            arg_step[b] = d_arg;
            d_arg -= expected;

            arg_accum[b] = wrap01(arg_accum[b] + d_arg);
            arg_b = arg_accum[b];
        }

        let phase = 2.0 * PI * arg_b;
        spectrum[2 * b] = abs_b * phase.cos();
        spectrum[2 * b + 1] = abs_b * phase.sin();
    }

    ifft_centered(spectrum, frame, fft_scratch);

    for k in 0..n {
        let w = if k < half { params.window[k] } else { params.window[n - 1 - k] };
        state.inv_lap[k] += w * frame[k];
    }
}

fn mix_ratio(idx: i64, params: &FreezeParams) -> f32 {
    let s = params.freeze_start as i64;
    let p = params.freeze_peak as i64;
    let raw = if idx >= p { 1.0 } else { (idx - s) as f32 / (p - s) as f32 };
    (raw * params.freeze_factor).clamp(0.0, 1.0)
}

/// Windows and transforms a snapshot frame, writing its per-bin magnitude
/// into `abs` (§4.E.3). Does not touch phase-tracking state: a snapshot
/// only ever feeds the amplitude reference.
pub fn analyze_snapshot(window: &[f32], frame_samples: &[f32], abs: &mut [f32], scratch: &mut [f32]) {
    let n = window.len() * 2;
    let half = n / 2;
    assert_eq!(frame_samples.len(), n);
    assert_eq!(abs.len(), half);
    assert!(scratch.len() >= n + n + centered_fft_scratch_len(n));

    let (frame, rest) = scratch.split_at_mut(n);
    let (spectrum, fft_scratch) = rest.split_at_mut(n);

    for k in 0..n {
        let w = if k < half { window[k] } else { window[n - 1 - k] };
        frame[k] = w * frame_samples[k];
    }

    fft_centered(frame, spectrum, fft_scratch);

    for b in 0..half {
        let re = spectrum[2 * b];
        let im = spectrum[2 * b + 1];
        abs[b] = (re * re + im * im).sqrt();
    }
}
