//! Ordered storage of the points placed on one image.
//!
//! A [`PointStore`] keeps points in insertion order (which drives both
//! list display and positional matching) and guarantees that every
//! stored coordinate lies in `[0, 1]` and every id is unique within the
//! store. It also tracks the store's current selection, which is never
//! persisted.

use std::collections::HashSet;

use crate::id::{IdGenerator, TimestampIds};
use crate::types::{Point, PointId};

/// Generator draws tried before falling back to a numbered suffix.
const MAX_ID_DRAWS: usize = 16;

/// Result of a successful [`PointStore::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    /// The point as stored after the edit.
    pub point: Point,
    /// `true` if clamping changed either of the requested coordinates.
    pub clamped: bool,
}

/// Ordered, id-unique collection of normalized points for one image.
#[derive(Debug, Clone)]
pub struct PointStore<G = TimestampIds> {
    points: Vec<Point>,
    selected: Option<PointId>,
    ids: G,
}

impl PointStore {
    /// Create an empty store using timestamp-based ids.
    #[must_use]
    pub fn new() -> Self {
        Self::with_generator(TimestampIds::default())
    }
}

impl Default for PointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: IdGenerator> PointStore<G> {
    /// Create an empty store drawing ids from `ids`.
    #[must_use]
    pub const fn with_generator(ids: G) -> Self {
        Self {
            points: Vec::new(),
            selected: None,
            ids,
        }
    }

    /// Add a point at `(x, y)`, clamped into `[0, 1]`, with a fresh id.
    ///
    /// The point is appended after all existing points.
    pub fn create(&mut self, x: f64, y: f64) -> Point {
        let id = self.fresh_id();
        let point = Point::new(id, x, y);
        self.points.push(point.clone());
        point
    }

    /// Draw an id from the generator that no stored point uses yet.
    ///
    /// Loaded points may already hold ids the generator will produce, so
    /// taken ids are skipped. A generator stuck on taken ids gets a
    /// `_<n>` suffix appended to its last id.
    fn fresh_id(&mut self) -> PointId {
        let mut id = self.ids.next_id();
        for _ in 1..MAX_ID_DRAWS {
            if self.get(&id).is_none() {
                return id;
            }
            log::debug!("generated id {id} is taken, drawing again");
            id = self.ids.next_id();
        }
        if self.get(&id).is_none() {
            return id;
        }

        log::warn!("id generator keeps producing taken ids, suffixing {id}");
        let mut n: u64 = 2;
        loop {
            let candidate = PointId::from_trusted(format!("{id}_{n}"));
            if self.get(&candidate).is_none() {
                return candidate;
            }
            n += 1;
        }
    }

    /// Move the point `id` to `(x, y)`, clamped into `[0, 1]`.
    ///
    /// Returns `None` (and changes nothing) if no point has that id.
    pub fn update(&mut self, id: &PointId, x: f64, y: f64) -> Option<Edit> {
        let point = self.points.iter_mut().find(|p| p.id() == id)?;
        point.set_position(x, y);
        let clamped = point.x().to_bits() != x.to_bits() || point.y().to_bits() != y.to_bits();
        if clamped {
            log::debug!(
                "clamped edit of {id}: requested ({x}, {y}), stored ({}, {})",
                point.x(),
                point.y()
            );
        }
        Some(Edit {
            point: point.clone(),
            clamped,
        })
    }

    /// Remove the point `id`, returning it if it existed.
    ///
    /// Clears the selection if the removed point was selected. Match
    /// pairs referencing the point are the caller's responsibility.
    pub fn delete(&mut self, id: &PointId) -> Option<Point> {
        let index = self.position(id)?;
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        Some(self.points.remove(index))
    }

    /// Replace every point, keeping the order of `points`.
    ///
    /// Later points whose id repeats an earlier one are dropped. The
    /// selection is cleared. Returns the number of dropped duplicates.
    pub fn replace_all(&mut self, points: impl IntoIterator<Item = Point>) -> usize {
        let mut seen = HashSet::new();
        let mut dropped = 0;
        self.points.clear();
        for point in points {
            if seen.insert(point.id().clone()) {
                self.points.push(point);
            } else {
                log::warn!("dropping duplicate point id {}", point.id());
                dropped += 1;
            }
        }
        self.selected = None;
        dropped
    }

    /// Remove every point and clear the selection.
    pub fn clear(&mut self) {
        self.points.clear();
        self.selected = None;
    }

    /// All points in insertion order.
    #[must_use]
    pub fn list(&self) -> &[Point] {
        &self.points
    }

    /// Look up a point by id.
    #[must_use]
    pub fn get(&self, id: &PointId) -> Option<&Point> {
        self.points.iter().find(|p| p.id() == id)
    }

    /// Index of the point `id` in insertion order.
    #[must_use]
    pub fn position(&self, id: &PointId) -> Option<usize> {
        self.points.iter().position(|p| p.id() == id)
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the store holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The currently selected point id, if any.
    #[must_use]
    pub const fn selected(&self) -> Option<&PointId> {
        self.selected.as_ref()
    }

    /// Select `id`. Returns `false` (leaving the selection unchanged) if
    /// no point has that id.
    pub fn select(&mut self, id: &PointId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.selected = Some(id.clone());
        true
    }

    /// Select `id`, or deselect it if it is already selected.
    ///
    /// Returns the selection after the toggle. Unknown ids leave the
    /// selection unchanged.
    pub fn toggle_selection(&mut self, id: &PointId) -> Option<&PointId> {
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        } else {
            self.select(id);
        }
        self.selected.as_ref()
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::id::SequentialIds;

    fn store() -> PointStore<SequentialIds> {
        PointStore::with_generator(SequentialIds::new("p"))
    }

    fn id(s: &str) -> PointId {
        PointId::new(s).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < f64::EPSILON
    }

    // --- create ---

    #[test]
    fn create_appends_in_order() {
        let mut s = store();
        let a = s.create(0.1, 0.2);
        let b = s.create(0.8, 0.9);
        assert_eq!(s.len(), 2);
        assert_eq!(s.list()[0].id(), a.id());
        assert_eq!(s.list()[1].id(), b.id());
        assert_eq!(a.id().as_str(), "p1");
    }

    #[test]
    fn create_clamps_out_of_range() {
        let mut s = store();
        let p = s.create(-0.3, 4.0);
        assert!(close(p.x(), 0.0));
        assert!(close(p.y(), 1.0));
        assert_eq!(s.list()[0], p);
    }

    #[test]
    fn create_after_load_skips_taken_ids() {
        let mut s = store();
        s.replace_all([
            Point::new(id("p1"), 0.1, 0.1),
            Point::new(id("p3"), 0.3, 0.3),
        ]);
        let a = s.create(0.5, 0.5);
        let b = s.create(0.6, 0.6);
        assert_eq!(a.id().as_str(), "p2");
        assert_eq!(b.id().as_str(), "p4");
        for p in s.list() {
            assert_eq!(s.list().iter().filter(|q| q.id() == p.id()).count(), 1);
        }
    }

    struct Stuck;

    impl IdGenerator for Stuck {
        fn next_id(&mut self) -> PointId {
            PointId::new("same").unwrap()
        }
    }

    #[test]
    fn create_with_stuck_generator_suffixes_id() {
        let mut s = PointStore::with_generator(Stuck);
        assert_eq!(s.create(0.1, 0.1).id().as_str(), "same");
        assert_eq!(s.create(0.2, 0.2).id().as_str(), "same_2");
        assert_eq!(s.create(0.3, 0.3).id().as_str(), "same_3");
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn default_store_generates_prefixed_ids() {
        let mut s = PointStore::new();
        assert!(s.create(0.5, 0.5).id().as_str().starts_with("point_"));
    }

    // --- update ---

    #[test]
    fn update_moves_point_in_place() {
        let mut s = store();
        let a = s.create(0.1, 0.1);
        s.create(0.2, 0.2);
        let edit = s.update(a.id(), 0.6, 0.7).unwrap();
        assert!(!edit.clamped);
        assert_eq!(s.position(a.id()), Some(0));
        assert!(close(s.list()[0].x(), 0.6));
        assert!(close(s.list()[0].y(), 0.7));
    }

    #[test]
    fn update_reports_clamped_values() {
        let mut s = store();
        let a = s.create(0.1, 0.1);
        let edit = s.update(a.id(), 1.5, -2.0).unwrap();
        assert!(edit.clamped);
        assert!(close(edit.point.x(), 1.0));
        assert!(close(edit.point.y(), 0.0));
        assert_eq!(s.get(a.id()), Some(&edit.point));
    }

    #[test]
    fn update_unknown_id_is_noop() {
        let mut s = store();
        s.create(0.1, 0.1);
        let before = s.list().to_vec();
        assert!(s.update(&id("missing"), 0.5, 0.5).is_none());
        assert_eq!(s.list(), before.as_slice());
    }

    // --- delete ---

    #[test]
    fn delete_removes_point() {
        let mut s = store();
        let a = s.create(0.1, 0.1);
        let b = s.create(0.2, 0.2);
        assert_eq!(s.delete(a.id()), Some(a));
        assert_eq!(s.list(), &[b]);
    }

    #[test]
    fn delete_unknown_id_is_noop() {
        let mut s = store();
        s.create(0.1, 0.1);
        assert!(s.delete(&id("missing")).is_none());
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn delete_clears_selection_of_removed_point() {
        let mut s = store();
        let a = s.create(0.1, 0.1);
        let b = s.create(0.2, 0.2);
        assert!(s.select(a.id()));
        s.delete(b.id());
        assert_eq!(s.selected(), Some(a.id()));
        s.delete(a.id());
        assert_eq!(s.selected(), None);
    }

    // --- replace_all ---

    #[test]
    fn replace_all_discards_previous_points_and_selection() {
        let mut s = store();
        let a = s.create(0.1, 0.1);
        s.select(a.id());
        let loaded = vec![
            Point::new(id("x"), 0.3, 0.3),
            Point::new(id("y"), 0.4, 0.4),
        ];
        assert_eq!(s.replace_all(loaded.clone()), 0);
        assert_eq!(s.list(), loaded.as_slice());
        assert_eq!(s.selected(), None);
    }

    #[test]
    fn replace_all_drops_duplicate_ids() {
        let mut s = store();
        let dropped = s.replace_all(vec![
            Point::new(id("x"), 0.1, 0.1),
            Point::new(id("x"), 0.9, 0.9),
            Point::new(id("y"), 0.5, 0.5),
        ]);
        assert_eq!(dropped, 1);
        assert_eq!(s.len(), 2);
        assert!(close(s.get(&id("x")).unwrap().x(), 0.1));
    }

    #[test]
    fn clear_empties_store() {
        let mut s = store();
        let a = s.create(0.1, 0.1);
        s.select(a.id());
        s.clear();
        assert!(s.is_empty());
        assert!(s.selected().is_none());
    }

    // --- selection ---

    #[test]
    fn select_unknown_id_fails() {
        let mut s = store();
        assert!(!s.select(&id("missing")));
        assert!(s.selected().is_none());
    }

    #[test]
    fn toggle_selection_selects_then_deselects() {
        let mut s = store();
        let a = s.create(0.1, 0.1);
        let b = s.create(0.2, 0.2);
        assert_eq!(s.toggle_selection(a.id()), Some(a.id()));
        assert_eq!(s.toggle_selection(b.id()).cloned(), Some(b.id().clone()));
        assert_eq!(s.toggle_selection(b.id()), None);
    }

    #[test]
    fn toggle_selection_unknown_keeps_current() {
        let mut s = store();
        let a = s.create(0.1, 0.1);
        s.select(a.id());
        assert_eq!(s.toggle_selection(&id("missing")), Some(a.id()));
    }

    #[test]
    fn clear_selection_resets() {
        let mut s = store();
        let a = s.create(0.1, 0.1);
        s.select(a.id());
        s.clear_selection();
        assert!(s.selected().is_none());
    }
}
