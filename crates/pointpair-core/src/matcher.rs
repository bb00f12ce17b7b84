//! Positional point matching between the two images.
//!
//! Pairing is purely by order: the i-th point of the first image is
//! matched with the i-th point of the second. Points beyond the length
//! of the shorter list stay unmatched. No image content is consulted.

use serde::{Deserialize, Serialize};

use crate::types::{Point, PointId, Side};

/// An association between one point of each image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchPair {
    /// Point id in the first image's store.
    pub first: PointId,
    /// Point id in the second image's store.
    pub second: PointId,
}

impl MatchPair {
    /// The id this pair holds for `side`.
    #[must_use]
    pub const fn id(&self, side: Side) -> &PointId {
        match side {
            Side::First => &self.first,
            Side::Second => &self.second,
        }
    }
}

/// Pair points by index: `min(first.len(), second.len())` pairs in order.
#[must_use]
pub fn match_points(first: &[Point], second: &[Point]) -> Vec<MatchPair> {
    first
        .iter()
        .zip(second)
        .map(|(a, b)| MatchPair {
            first: a.id().clone(),
            second: b.id().clone(),
        })
        .collect()
}

/// The current set of match pairs, in pair order.
///
/// A snapshot taken when matching ran. It is not updated by later
/// edits, except that [`Matches::remove_point`] drops pairs touching a
/// deleted point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matches(Vec<MatchPair>);

impl Matches {
    /// Recompute the pairs from scratch for the given point lists.
    pub fn rematch(&mut self, first: &[Point], second: &[Point]) {
        self.0 = match_points(first, second);
    }

    /// Remove every pair whose `side` end is `id`. Returns how many were removed.
    ///
    /// The two stores are separate id namespaces, so only `side` is checked.
    pub fn remove_point(&mut self, side: Side, id: &PointId) -> usize {
        let before = self.0.len();
        self.0.retain(|pair| pair.id(side) != id);
        before - self.0.len()
    }

    /// Remove all pairs.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Returns `true` if the point `id` of `side` is part of any pair.
    #[must_use]
    pub fn is_matched(&self, side: Side, id: &PointId) -> bool {
        self.0.iter().any(|pair| pair.id(side) == id)
    }

    /// The partner of point `id` of `side`, if it is matched.
    #[must_use]
    pub fn partner(&self, side: Side, id: &PointId) -> Option<&PointId> {
        let other = match side {
            Side::First => Side::Second,
            Side::Second => Side::First,
        };
        self.0
            .iter()
            .find(|pair| pair.id(side) == id)
            .map(|pair| pair.id(other))
    }

    /// All pairs in order.
    #[must_use]
    pub fn pairs(&self) -> &[MatchPair] {
        &self.0
    }

    /// Number of pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if there are no pairs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
