//! Shape-position matching.
//!
//! Shape names assigned by the authoring tool change on every duplication and
//! re-export, but the visual layout of a fixed template does not. Fields are
//! therefore bound to shapes by the distance between each field's expected
//! top-left corner and each shape's actual one.

use std::collections::{BTreeMap, HashSet};

use crate::geometry::{round_to, Position};

/// Decimal places used when indexing shapes by position.
pub const INDEX_DECIMALS: u32 = 1;

/// Integer grid cell of a rounded position.
fn grid_key(position: Position, decimals: u32) -> (i64, i64) {
    let factor = 10f64.powi(decimals as i32);
    (
        (position.x * factor).round() as i64,
        (position.y * factor).round() as i64,
    )
}

/// Shapes keyed by their top-left corner rounded to one decimal place.
///
/// Two shapes rounding to the same cell collapse into one entry; the shape
/// with the lower key is kept so the index does not depend on insertion order.
#[derive(Debug, Clone)]
pub struct PositionIndex<K> {
    entries: BTreeMap<(i64, i64), (Position, K)>,
}

impl<K: Ord + Clone + std::fmt::Debug> PositionIndex<K> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Build an index from `(position, key)` pairs.
    pub fn build(shapes: impl IntoIterator<Item = (Position, K)>) -> Self {
        let mut index = Self::new();
        for (position, key) in shapes {
            index.insert(position, key);
        }
        index
    }

    pub fn insert(&mut self, position: Position, key: K) {
        let rounded = Position::new(
            round_to(position.x, INDEX_DECIMALS),
            round_to(position.y, INDEX_DECIMALS),
        );
        let cell = grid_key(rounded, INDEX_DECIMALS);
        match self.entries.get(&cell) {
            Some((_, existing)) if *existing <= key => {
                log::debug!(
                    "shape {:?} shares position ({}, {}) with {:?}, ignored",
                    key,
                    rounded.x,
                    rounded.y,
                    existing
                );
            }
            _ => {
                self.entries.insert(cell, (rounded, key));
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Indexed shapes as matching candidates.
    pub fn candidates(&self) -> Vec<(Position, K)> {
        self.entries.values().cloned().collect()
    }
}

impl<K: Ord + Clone + std::fmt::Debug> Default for PositionIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// A field bound to a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding<S> {
    pub shape: S,
    /// Position of the bound shape.
    pub actual: Position,
    /// Distance from the expected position.
    pub distance: f64,
}

/// Outcome of binding expected field positions to shapes.
#[derive(Debug, Clone)]
pub struct Assignment<F, S> {
    pub bindings: BTreeMap<F, Binding<S>>,
    /// Fields with no shape within tolerance, in field order.
    pub missing: Vec<F>,
    /// Shapes bound to no field, top-to-bottom then left-to-right.
    pub unmatched: Vec<(Position, S)>,
}

impl<F: Ord, S> Assignment<F, S> {
    pub fn get(&self, field: &F) -> Option<&Binding<S>> {
        self.bindings.get(field)
    }

    pub fn matched_count(&self) -> usize {
        self.bindings.len()
    }
}

/// Bind each expected position to its nearest shape within `tolerance`.
///
/// Every `(field, shape)` pair within tolerance is ranked by distance, ties
/// broken by field then shape key, and pairs are taken greedily while both
/// sides are free. Each shape is bound to at most one field and the result is
/// the same for any ordering of the inputs as long as shape keys are unique.
pub fn assign_nearest<F, S>(
    expected: &[(F, Position)],
    candidates: &[(Position, S)],
    tolerance: f64,
) -> Assignment<F, S>
where
    F: Ord + Copy,
    S: Ord + Clone,
{
    let mut pairs: Vec<(f64, F, usize)> = Vec::new();
    for (field, target) in expected {
        for (idx, (position, _)) in candidates.iter().enumerate() {
            let distance = target.distance(position);
            if distance <= tolerance {
                pairs.push((distance, *field, idx));
            }
        }
    }

    pairs.sort_by(|a, b| {
        a.0.total_cmp(&b.0)
            .then_with(|| a.1.cmp(&b.1))
            .then_with(|| candidates[a.2].1.cmp(&candidates[b.2].1))
    });

    let mut bindings = BTreeMap::new();
    let mut taken: HashSet<usize> = HashSet::new();
    for (distance, field, idx) in pairs {
        if bindings.contains_key(&field) || taken.contains(&idx) {
            continue;
        }
        taken.insert(idx);
        let (actual, shape) = &candidates[idx];
        bindings.insert(
            field,
            Binding {
                shape: shape.clone(),
                actual: *actual,
                distance,
            },
        );
    }

    let mut missing: Vec<F> = expected
        .iter()
        .map(|(field, _)| *field)
        .filter(|field| !bindings.contains_key(field))
        .collect();
    missing.sort();
    missing.dedup();

    let mut unmatched: Vec<(Position, S)> = candidates
        .iter()
        .enumerate()
        .filter(|(idx, _)| !taken.contains(idx))
        .map(|(_, candidate)| candidate.clone())
        .collect();
    unmatched.sort_by(|a, b| {
        a.0.y
            .total_cmp(&b.0.y)
            .then_with(|| a.0.x.total_cmp(&b.0.x))
            .then_with(|| a.1.cmp(&b.1))
    });

    Assignment {
        bindings,
        missing,
        unmatched,
    }
}
