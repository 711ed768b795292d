//! Minimal RIFF `smpl` chunk reader.
//!
//! `hound` exposes PCM sample data only, not arbitrary RIFF chunks, so the
//! loop-point lookup this CLI wants (§12.3) walks the chunk list by hand.
//! This never touches sample data itself — just chunk headers — so it is a
//! handful of lines rather than a parser.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;

/// The first loop region recorded in a WAV file's `smpl` chunk, in sample
/// frames from the start of the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleLoop {
    pub start: u32,
    pub end: u32,
}

/// Scans the RIFF chunk list for a `smpl` chunk and returns its first loop
/// region, if any. Returns `None` on any I/O or format surprise rather than
/// failing the whole run — this is a convenience lookup, not a contract.
pub fn read_first_loop(path: &Path) -> Option<SampleLoop> {
    let mut file = File::open(path).ok()?;
    let mut riff_header = [0u8; 12];
    file.read_exact(&mut riff_header).ok()?;
    if &riff_header[0..4] != b"RIFF" || &riff_header[8..12] != b"WAVE" {
        return None;
    }

    loop {
        let mut chunk_header = [0u8; 8];
        if file.read_exact(&mut chunk_header).is_err() {
            return None;
        }
        let chunk_id = &chunk_header[0..4];
        let chunk_size = u32::from_le_bytes(chunk_header[4..8].try_into().unwrap());

        if chunk_id == b"smpl" {
            return parse_smpl_body(&mut file, chunk_size);
        }

        let padded = chunk_size + (chunk_size & 1);
        if file.seek(SeekFrom::Current(padded as i64)).is_err() {
            return None;
        }
    }
}

fn parse_smpl_body(file: &mut File, chunk_size: u32) -> Option<SampleLoop> {
    // Fixed fields before the loop list: 9 u32s, then `num_sample_loops`
    // (u32) and `sampler_data` (u32), then one `SampleLoop` struct per
    // entry (6 u32s each; we only need the first entry's start/end).
    const FIXED_LEN: usize = 9 * 4;
    if chunk_size < (FIXED_LEN as u32) + 8 {
        return None;
    }
    let mut fixed = [0u8; FIXED_LEN];
    file.read_exact(&mut fixed).ok()?;

    let mut counts = [0u8; 8];
    file.read_exact(&mut counts).ok()?;
    let num_loops = u32::from_le_bytes(counts[0..4].try_into().unwrap());
    if num_loops == 0 {
        return None;
    }

    let mut loop_entry = [0u8; 24];
    file.read_exact(&mut loop_entry).ok()?;
    let start = u32::from_le_bytes(loop_entry[8..12].try_into().unwrap());
    let end = u32::from_le_bytes(loop_entry[12..16].try_into().unwrap());
    Some(SampleLoop { start, end })
}
