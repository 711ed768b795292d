//! Spectrice: an STFT-based spectral freezing engine for building seamless
//! sample loops.
//!
//! Given an audio stream and a freeze point, [`FreezeSession`] produces an
//! output stream that, as playback crosses the freeze point, settles into a
//! quasi-stationary signal whose short-time magnitude spectrum (and,
//! optionally, phase advance) matches the spectrum observed at that point.
//!
//! The engine is built from six layers, leaves first: a process-wide
//! [`trig`] table registry, a scaled [`dct`]-II/IV kernel, a [`centered_fft`]
//! built on two half-size DCT-IVs, a [`window`] table builder, the per-hop
//! [`freeze`] state machine, and the [`session`] wrapper that owns
//! configuration, the single aligned allocation, and the public API.

mod centered_fft;
mod dct;
mod error;
mod freeze;
mod session;
mod trig;
mod window;

pub use error::{Result, SpectriceError};
pub use session::{FreezeConfig, FreezeSession};
pub use window::WindowKind;
