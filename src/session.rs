//! Session wrapper (component F): configuration validation, the single
//! aligned backing allocation, snapshot pre-analysis, priming, and the
//! public `process` entry point.

use crate::error::SpectriceError;
use crate::freeze::{analyze_snapshot, hop_scratch_len, run_hop, ChannelState, FreezeParams};
use crate::window::{build_window, WindowKind};
use serde::{Deserialize, Serialize};
use std::alloc::{alloc_zeroed, dealloc, Layout};
use std::ptr::NonNull;

const ALIGNMENT: usize = 64;

/// Immutable session configuration. Every field from `spec.md` §3's
/// "Immutable config" list; derives [`serde::Serialize`]/[`Deserialize`] so
/// the CLI can round-trip it through a JSON preset file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FreezeConfig {
    pub channels: u8,
    pub block_size: usize,
    pub hop_count: usize,
    pub window: WindowKind,
    pub freeze_start: usize,
    pub freeze_peak: usize,
    pub freeze_factor: f32,
    pub freeze_amp: bool,
    pub freeze_phase: bool,
}

impl FreezeConfig {
    /// `HopSize = N / H`, the stride in samples between successive hops.
    pub fn hop_size(&self) -> usize {
        self.block_size / self.hop_count
    }

    fn validate(&self, snapshot: Option<&[f32]>) -> Result<(), SpectriceError> {
        if self.channels == 0 {
            return Err(SpectriceError::InvalidConfiguration("channels must be >= 1".into()));
        }
        let n = self.block_size;
        if n < 16 || n > 65536 || !n.is_power_of_two() {
            return Err(SpectriceError::InvalidConfiguration(format!(
                "block_size must be a power of two in 16..=65536, got {}",
                n
            )));
        }
        let h = self.hop_count;
        if h < 2 || h > n || !h.is_power_of_two() {
            return Err(SpectriceError::InvalidConfiguration(format!(
                "hop_count must be a power of two in 2..={}, got {}",
                n, h
            )));
        }
        if self.freeze_start > self.freeze_peak {
            return Err(SpectriceError::InvalidConfiguration(
                "freeze_peak must be >= freeze_start".into(),
            ));
        }
        if self.freeze_start < n {
            return Err(SpectriceError::InvalidConfiguration(format!(
                "freeze_start must be >= block_size ({}), got {}",
                n, self.freeze_start
            )));
        }
        if !(0.0..=1.0).contains(&self.freeze_factor) {
            return Err(SpectriceError::InvalidConfiguration(
                "freeze_factor must be in [0,1]".into(),
            ));
        }
        if snapshot.is_some() && self.freeze_phase {
            return Err(SpectriceError::InvalidConfiguration(
                "snapshot and phase freezing cannot be combined".into(),
            ));
        }
        Ok(())
    }
}

/// Single 64-byte-aligned backing allocation for a session's mutable
/// per-hop state: the analysis/synthesis rings, the freeze references, and
/// the hop scratch area. The only `unsafe` in this crate lives here: a
/// manual `Layout`-based allocation so the alignment invariant (`spec.md`
/// §3 invariant 5) is a fact about the allocator call, not a hope about
/// `Vec`'s default alignment.
struct AlignedSlab {
    ptr: NonNull<f32>,
    len: usize,
    layout: Layout,
}

impl AlignedSlab {
    fn try_new(len: usize) -> Result<Self, SpectriceError> {
        let size = len.checked_mul(std::mem::size_of::<f32>()).ok_or(SpectriceError::OutOfMemory)?;
        let layout = Layout::from_size_align(size, ALIGNMENT).map_err(|_| SpectriceError::OutOfMemory)?;
        let raw = unsafe { alloc_zeroed(layout) };
        let ptr = NonNull::new(raw as *mut f32).ok_or(SpectriceError::OutOfMemory)?;
        Ok(AlignedSlab { ptr, len, layout })
    }

    fn as_mut_slice(&mut self) -> &mut [f32] {
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl Drop for AlignedSlab {
    fn drop(&mut self) {
        unsafe { dealloc(self.ptr.as_ptr() as *mut u8, self.layout) };
    }
}

// The slab owns its memory exclusively and is never aliased outside
// `FreezeSession`, which itself opts out of `Sync` (no interior mutability
// is ever shared between threads without the caller's own `Mutex`).
unsafe impl Send for AlignedSlab {}

#[derive(Clone, Copy)]
struct SlabLayout {
    fwd_lap: usize,
    inv_lap: usize,
    abs: usize,
    arg_accum: Option<usize>,
    arg_prev: Option<usize>,
    arg_step: Option<usize>,
    scratch: usize,
    scratch_len: usize,
    total: usize,
}

fn plan_layout(channels: usize, n: usize, freeze_phase: bool) -> SlabLayout {
    let half = n / 2;
    let mut offset = 0usize;
    let mut region = |len: usize| {
        let start = offset;
        offset += len;
        start
    };

    let fwd_lap = region(channels * n);
    let inv_lap = region(channels * n);
    let abs = region(channels * half);
    let (arg_accum, arg_prev, arg_step) = if freeze_phase {
        (Some(region(channels * half)), Some(region(channels * half)), Some(region(channels * half)))
    } else {
        (None, None, None)
    };
    let scratch_len = hop_scratch_len(n);
    let scratch = region(scratch_len);

    SlabLayout { fwd_lap, inv_lap, abs, arg_accum, arg_prev, arg_step, scratch, scratch_len, total: offset }
}

/// Opaque handle over one freeze run. Owns its state exclusively: `Send`
/// but not `Sync`, so sharing one session across threads needs the
/// caller's own `Mutex` (the idiomatic spelling of "exclusive owner, no
/// internal synchronization").
pub struct FreezeSession {
    config: FreezeConfig,
    layout: SlabLayout,
    slab: AlignedSlab,
    /// The half-window, read-only for the session's lifetime. Kept out of
    /// the aligned slab deliberately: it is never written after `init`, so
    /// splitting it out avoids carving a live immutable borrow out of a
    /// buffer the hot path also borrows mutably every hop.
    window: Box<[f32]>,
    block_idx: u64,
    have_snapshot: bool,
}

impl FreezeSession {
    /// Validates `config`, allocates the session's single backing buffer,
    /// builds the window, optionally pre-analyses a snapshot frame, and
    /// optionally consumes one priming block.
    pub fn init(
        config: FreezeConfig,
        priming: Option<&[f32]>,
        snapshot: Option<&[f32]>,
    ) -> Result<Self, SpectriceError> {
        config.validate(snapshot)?;

        let channels = config.channels as usize;
        let n = config.block_size;
        let layout = plan_layout(channels, n, config.freeze_phase);
        let slab = AlignedSlab::try_new(layout.total)?;
        let window: Box<[f32]> = build_window(config.window, n, config.hop_count)?.into();

        let mut session =
            FreezeSession { config, layout, slab, window, block_idx: 0, have_snapshot: false };

        if let Some(snap) = snapshot {
            session.analyze_snapshot_block(snap);
            session.have_snapshot = true;
        }

        log::info!(
            "spectrice session initialised: N={} H={} C={} window={:?}",
            n,
            session.config.hop_count,
            channels,
            session.config.window
        );

        if let Some(priming) = priming {
            let expected = n * channels;
            if priming.len() < expected {
                log::warn!(
                    "priming block shorter than N*C ({} < {}), zero-padding",
                    priming.len(),
                    expected
                );
            }
            let mut padded = vec![0.0f32; expected];
            let copy_len = priming.len().min(expected);
            padded[..copy_len].copy_from_slice(&priming[..copy_len]);
            session.process(&padded, None);
        }

        Ok(session)
    }

    fn analyze_snapshot_block(&mut self, snapshot: &[f32]) {
        let channels = self.config.channels as usize;
        let n = self.config.block_size;
        let half = n / 2;
        let abs_off = self.layout.abs;
        let scratch_off = self.layout.scratch;
        let scratch_len = self.layout.scratch_len;

        let buf = self.slab.as_mut_slice();
        let (abs_all, rest) = buf[abs_off..].split_at_mut(channels * half);
        let scratch = &mut rest[scratch_off - abs_off - channels * half..][..scratch_len];

        for c in 0..channels {
            let frame_start = c * n;
            if frame_start + n > snapshot.len() {
                // Short snapshot: remaining channels stay silent references.
                break;
            }
            let frame = &snapshot[frame_start..frame_start + n];
            let abs = &mut abs_all[c * half..(c + 1) * half];
            analyze_snapshot(&self.window, frame, abs, scratch);
        }
    }

    /// Consumes one block (`N*C` interleaved samples, channel-minor) and,
    /// when `output_block` is provided, emits the corresponding `N*C`
    /// synthesized samples. Infallible: no allocation, no I/O, no logging.
    pub fn process(&mut self, input_block: &[f32], mut output_block: Option<&mut [f32]>) {
        let channels = self.config.channels as usize;
        let n = self.config.block_size;
        let h = self.config.hop_count;
        let hop_size = n / h;
        let half = n / 2;

        debug_assert_eq!(input_block.len(), n * channels);
        if let Some(ref out) = output_block {
            debug_assert_eq!(out.len(), n * channels);
        }

        let freeze_phase = self.config.freeze_phase;
        let params = FreezeParams {
            window: &self.window,
            hop_size,
            hop_count: h,
            freeze_start: self.config.freeze_start,
            freeze_peak: self.config.freeze_peak,
            freeze_factor: self.config.freeze_factor,
            freeze_amp: self.config.freeze_amp,
            freeze_phase,
        };

        let buf = self.slab.as_mut_slice();
        let (fwd_lap_all, rest) = buf.split_at_mut(self.layout.inv_lap);
        let (inv_lap_all, rest) = rest.split_at_mut(channels * n);
        let (abs_all, rest) = rest.split_at_mut(channels * half);
        let (arg_accum_all, arg_prev_all, arg_step_all, rest) = if freeze_phase {
            let (a, rest) = rest.split_at_mut(channels * half);
            let (p, rest) = rest.split_at_mut(channels * half);
            let (s, rest) = rest.split_at_mut(channels * half);
            (Some(a), Some(p), Some(s), rest)
        } else {
            (None, None, None, rest)
        };
        let scratch = &mut rest[..self.layout.scratch_len];

        for hop in 0..h {
            for c in 0..channels {
                let fwd_lap = &mut fwd_lap_all[c * n..(c + 1) * n];
                let inv_lap = &mut inv_lap_all[c * n..(c + 1) * n];
                let abs = &mut abs_all[c * half..(c + 1) * half];
                let arg_accum = arg_accum_all.as_mut().map(|a| &mut a[c * half..(c + 1) * half]);
                let arg_prev = arg_prev_all.as_mut().map(|a| &mut a[c * half..(c + 1) * half]);
                let arg_step = arg_step_all.as_mut().map(|a| &mut a[c * half..(c + 1) * half]);

                let mut state = ChannelState {
                    fwd_lap,
                    inv_lap,
                    abs,
                    arg_accum,
                    arg_prev,
                    arg_step,
                    have_snapshot: self.have_snapshot,
                };

                run_hop(&params, self.block_idx, hop, &mut state, scratch);

                if let Some(ref mut out) = output_block {
                    for i in 0..hop_size {
                        out[(hop * hop_size + i) * channels + c] = state.inv_lap[i];
                    }
                }

                state.inv_lap.copy_within(hop_size.., 0);
                for v in &mut state.inv_lap[n - hop_size..] {
                    *v = 0.0;
                }

                state.fwd_lap.copy_within(hop_size.., 0);
                for i in 0..hop_size {
                    state.fwd_lap[n - hop_size + i] = input_block[(hop * hop_size + i) * channels + c];
                }
            }
        }

        self.block_idx += 1;
    }

    /// Thin, explicit wrapper over `Drop` for callers that want the
    /// lifecycle operation spelled out at the call site.
    pub fn destroy(self) {}
}
