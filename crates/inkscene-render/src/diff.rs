//! The properties diff contract shared by every backend.

use crate::backend::{NodePayload, setter_for};
use inkscene_core::{PropKey, PropertyBag};
use std::collections::HashMap;

/// Per-key count of setter invocations.
#[derive(Debug, Clone, Default)]
pub struct SetterStats {
    calls: HashMap<PropKey, usize>,
    total: usize,
}

impl SetterStats {
    pub fn record(&mut self, key: PropKey) {
        *self.calls.entry(key).or_default() += 1;
        self.total += 1;
    }

    pub fn calls(&self, key: PropKey) -> usize {
        self.calls.get(&key).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn reset(&mut self) {
        self.calls.clear();
        self.total = 0;
    }
}

/// Apply `next` to a payload whose last applied bag is `cached`.
///
/// Runs the setter of every key whose value differs from the cache (keys
/// missing from `next` run with `None`), then makes `next` the cache. The
/// payload's `finish_apply` runs once if any setter ran. Returns the number
/// of setters invoked.
pub fn apply_properties<P: NodePayload>(
    payload: &mut P,
    cached: &mut PropertyBag,
    next: PropertyBag,
    stats: &mut SetterStats,
) -> usize {
    let mut applied = 0;
    for (key, value) in next.changes(cached) {
        if let Some(setter) = setter_for::<P>(key) {
            setter(payload, value);
            stats.record(key);
            applied += 1;
        }
    }
    if applied > 0 {
        payload.finish_apply();
    }
    *cached = next;
    applied
}
