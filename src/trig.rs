//! Process-wide trig table registry (component A).
//!
//! Every DCT-II/DCT-IV recursion level of size `2N` needs the divisor table
//! `cos((n+1/2)*pi/(2N))` for `n` in `0..N`. Tables are immutable once built
//! and shared across every session in the process, keyed by `N`.
//!
//! First use at a given size is serialized behind a mutex; two threads
//! racing to build the same size both compute the same bit-identical table,
//! so a race costs a duplicate computation, never a correctness problem.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type Table = Arc<[f32]>;

static REGISTRY: Lazy<Mutex<HashMap<usize, Table>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Returns the twiddle table for half-size `n`: `table[i] = cos((i+0.5)*pi/(2n))`
/// for `i` in `0..n`. Builds and caches it on first use.
pub fn twiddle_table(n: usize) -> Table {
    debug_assert!(n > 0);
    let mut registry = REGISTRY.lock().expect("trig table registry poisoned");
    if let Some(table) = registry.get(&n) {
        return Arc::clone(table);
    }
    let table: Table = build_table(n).into();
    registry.insert(n, Arc::clone(&table));
    table
}

fn build_table(n: usize) -> Vec<f32> {
    let scale = std::f64::consts::PI / (2.0 * n as f64);
    (0..n)
        .map(|i| (((i as f64) + 0.5) * scale).cos() as f32)
        .collect()
}
