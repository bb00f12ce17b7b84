//! Editing session: two image slots and the pairs between them.
//!
//! The session is the single owner of all mutable editor state. Each
//! [`Slot`] holds one image's source descriptor and point store; the
//! session additionally holds the current [`Matches`]. Operations that
//! remove points (delete, reload, new image) keep the match pairs
//! consistent by dropping pairs that reference removed points.

use serde::{Deserialize, Serialize};

use crate::coords::Viewport;
use crate::id::{IdGenerator, TimestampIds};
use crate::matcher::Matches;
use crate::store::{Edit, PointStore};
use crate::types::{
    Dimensions, EditorConfig, FitMode, Point, PointId, Side, SurfacePos, SurfaceSize,
};

/// Descriptor of an image loaded into a slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    /// Display name (typically the file name).
    pub name: String,
    /// Natural size of the image in pixels.
    pub dimensions: Dimensions,
}

/// One image slot: the image shown and the points placed on it.
#[derive(Debug, Clone)]
pub struct Slot<G = TimestampIds> {
    image: Option<ImageSource>,
    store: PointStore<G>,
}

impl<G: IdGenerator> Slot<G> {
    const fn new(ids: G) -> Self {
        Self {
            image: None,
            store: PointStore::with_generator(ids),
        }
    }

    /// The loaded image, if any.
    #[must_use]
    pub const fn image(&self) -> Option<&ImageSource> {
        self.image.as_ref()
    }

    /// The slot's points.
    #[must_use]
    pub const fn store(&self) -> &PointStore<G> {
        &self.store
    }
}

/// Outcome of [`Session::match_points`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOutcome {
    /// This many pairs were produced.
    Matched(usize),
    /// At least one image has no points; the pair list is now empty.
    NothingToMatch,
}

/// Whether a point currently takes part in a match pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchStatus {
    /// The point is in a pair.
    Matched,
    /// The point is not in any pair.
    Unmatched,
}

/// A match pair resolved back to the points it refers to.
///
/// Either end may be `None` if the point was edited away without a
/// cascade, which the session itself never does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedPair<'a> {
    /// Zero-based pair index.
    pub index: usize,
    /// The first image's point.
    pub first: Option<&'a Point>,
    /// The second image's point.
    pub second: Option<&'a Point>,
}

/// Editor state for one pair of images.
#[derive(Debug, Clone)]
pub struct Session<G = TimestampIds> {
    first: Slot<G>,
    second: Slot<G>,
    matches: Matches,
    fit: FitMode,
}

impl Session {
    /// Create a session with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&EditorConfig::default())
    }

    /// Create a session with timestamp ids using the configured prefix.
    #[must_use]
    pub fn with_config(config: &EditorConfig) -> Self {
        let ids = TimestampIds::from_config(config);
        let mut session = Self::with_generators(ids.clone(), ids);
        session.fit = config.fit;
        session
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl<G: IdGenerator> Session<G> {
    /// Create a session whose slots draw ids from the given generators.
    #[must_use]
    pub fn with_generators(first: G, second: G) -> Self {
        Self {
            first: Slot::new(first),
            second: Slot::new(second),
            matches: Matches::default(),
            fit: FitMode::default(),
        }
    }

    /// Set how images are fitted into their surfaces.
    pub const fn set_fit(&mut self, fit: FitMode) {
        self.fit = fit;
    }

    /// The slot for `side`.
    #[must_use]
    pub const fn slot(&self, side: Side) -> &Slot<G> {
        match side {
            Side::First => &self.first,
            Side::Second => &self.second,
        }
    }

    const fn slot_mut(&mut self, side: Side) -> &mut Slot<G> {
        match side {
            Side::First => &mut self.first,
            Side::Second => &mut self.second,
        }
    }

    /// Points of `side` in insertion order.
    #[must_use]
    pub fn points(&self, side: Side) -> &[Point] {
        self.slot(side).store.list()
    }

    /// Show a new image in `side`.
    ///
    /// The slot's points belonged to the previous image, so they are
    /// discarded along with the selection and every pair touching them.
    pub fn load_image(&mut self, side: Side, image: ImageSource) {
        log::debug!(
            "{}: loading image {} ({}x{})",
            side.label(),
            image.name,
            image.dimensions.width,
            image.dimensions.height
        );
        let slot = self.slot_mut(side);
        slot.image = Some(image);
        slot.store.clear();
        // Every pair has an end on this side.
        self.matches.clear();
    }

    /// The viewport used to map clicks and draw points for `side`.
    #[must_use]
    pub fn viewport(&self, side: Side, surface: SurfaceSize) -> Viewport {
        Viewport {
            surface,
            image: self.slot(side).image.as_ref().map(|image| image.dimensions),
            fit: self.fit,
        }
    }

    /// Place a point where the user clicked on `side`'s surface.
    pub fn place_point(&mut self, side: Side, click: SurfacePos, surface: SurfaceSize) -> Point {
        let (x, y) = self.viewport(side, surface).to_normalized(click);
        self.add_point(side, x, y)
    }

    /// Add a point at normalized `(x, y)` (clamped) to `side`.
    pub fn add_point(&mut self, side: Side, x: f64, y: f64) -> Point {
        self.slot_mut(side).store.create(x, y)
    }

    /// Move a point of `side`. `None` if the id is unknown.
    pub fn edit_point(&mut self, side: Side, id: &PointId, x: f64, y: f64) -> Option<Edit> {
        self.slot_mut(side).store.update(id, x, y)
    }

    /// Delete a point of `side` and every pair that references it.
    pub fn delete_point(&mut self, side: Side, id: &PointId) -> Option<Point> {
        let removed = self.slot_mut(side).store.delete(id)?;
        let dropped = self.matches.remove_point(side, id);
        if dropped > 0 {
            log::debug!("{}: deleting {id} dropped {dropped} pair(s)", side.label());
        }
        Some(removed)
    }

    /// Replace `side`'s points with loaded ones and reset all pairs.
    ///
    /// Returns the number of points dropped for repeating an id.
    pub fn load_points(&mut self, side: Side, points: impl IntoIterator<Item = Point>) -> usize {
        let dropped = self.slot_mut(side).store.replace_all(points);
        self.matches.clear();
        log::debug!(
            "{}: loaded {} point(s)",
            side.label(),
            self.slot(side).store.len()
        );
        dropped
    }

    /// Pair the two images' points by position, replacing previous pairs.
    pub fn match_points(&mut self) -> MatchOutcome {
        self.matches
            .rematch(self.first.store.list(), self.second.store.list());
        if self.matches.is_empty() {
            MatchOutcome::NothingToMatch
        } else {
            MatchOutcome::Matched(self.matches.len())
        }
    }

    /// The current match pairs.
    #[must_use]
    pub const fn matches(&self) -> &Matches {
        &self.matches
    }

    /// Pairs resolved to points, for display.
    pub fn resolved_pairs(&self) -> impl Iterator<Item = ResolvedPair<'_>> {
        self.matches
            .pairs()
            .iter()
            .enumerate()
            .map(|(index, pair)| ResolvedPair {
                index,
                first: self.first.store.get(&pair.first),
                second: self.second.store.get(&pair.second),
            })
    }

    /// Whether point `id` of `side` is currently matched.
    #[must_use]
    pub fn match_status(&self, side: Side, id: &PointId) -> MatchStatus {
        if self.matches.is_matched(side, id) {
            MatchStatus::Matched
        } else {
            MatchStatus::Unmatched
        }
    }

    /// Points of `side` to hand to the serializer, or `None` if there is
    /// nothing to save.
    #[must_use]
    pub fn points_to_save(&self, side: Side) -> Option<&[Point]> {
        let points = self.points(side);
        (!points.is_empty()).then_some(points)
    }

    /// The selected point id of `side`.
    #[must_use]
    pub const fn selected(&self, side: Side) -> Option<&PointId> {
        self.slot(side).store.selected()
    }

    /// Select a point of `side`; `false` if the id is unknown.
    pub fn select(&mut self, side: Side, id: &PointId) -> bool {
        self.slot_mut(side).store.select(id)
    }

    /// Toggle selection of a point of `side`, returning the new selection.
    pub fn toggle_selection(&mut self, side: Side, id: &PointId) -> Option<&PointId> {
        self.slot_mut(side).store.toggle_selection(id)
    }

    /// Clear `side`'s selection.
    pub fn clear_selection(&mut self, side: Side) {
        self.slot_mut(side).store.clear_selection();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::id::SequentialIds;
    use crate::matcher::MatchPair;

    fn session() -> Session<SequentialIds> {
        Session::with_generators(SequentialIds::new("a"), SequentialIds::new("b"))
    }

    fn id(s: &str) -> PointId {
        PointId::new(s).unwrap()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn image(width: u32, height: u32) -> ImageSource {
        ImageSource {
            name: "img.png".to_owned(),
            dimensions: Dimensions { width, height },
        }
    }

    #[test]
    fn match_scenario_leaves_excess_unmatched() {
        let mut s = session();
        let a = s.add_point(Side::First, 0.1, 0.2);
        let b = s.add_point(Side::First, 0.8, 0.9);
        let c = s.add_point(Side::Second, 0.3, 0.4);
        assert_eq!(s.match_points(), MatchOutcome::Matched(1));
        assert_eq!(s.matches().pairs(), &[MatchPair {
            first: a.id().clone(),
            second: c.id().clone(),
        }]);
        assert_eq!(s.match_status(Side::First, b.id()), MatchStatus::Unmatched);
        assert_eq!(s.match_status(Side::First, a.id()), MatchStatus::Matched);
    }

    #[test]
    fn match_with_empty_side_reports_nothing_to_match() {
        let mut s = session();
        s.add_point(Side::First, 0.1, 0.2);
        assert_eq!(s.match_points(), MatchOutcome::NothingToMatch);
        assert!(s.matches().is_empty());
    }

    #[test]
    fn delete_cascades_into_pairs() {
        let mut s = session();
        s.add_point(Side::First, 0.1, 0.1);
        let a2 = s.add_point(Side::First, 0.2, 0.2);
        s.add_point(Side::Second, 0.3, 0.3);
        let b2 = s.add_point(Side::Second, 0.4, 0.4);
        s.match_points();
        assert_eq!(s.matches().len(), 2);

        s.delete_point(Side::Second, b2.id());
        assert_eq!(s.matches().len(), 1);
        assert!(!s.matches().is_matched(Side::First, a2.id()));
    }

    #[test]
    fn delete_unknown_point_keeps_pairs() {
        let mut s = session();
        s.add_point(Side::First, 0.1, 0.1);
        s.add_point(Side::Second, 0.3, 0.3);
        s.match_points();
        assert!(s.delete_point(Side::First, &id("nope")).is_none());
        assert_eq!(s.matches().len(), 1);
    }

    #[test]
    fn edits_do_not_touch_pairs() {
        let mut s = session();
        let a = s.add_point(Side::First, 0.1, 0.1);
        s.add_point(Side::Second, 0.3, 0.3);
        s.match_points();
        let edit = s.edit_point(Side::First, a.id(), 2.0, 0.5).unwrap();
        assert!(edit.clamped);
        assert!(close(s.points(Side::First)[0].x(), 1.0));
        assert_eq!(s.matches().len(), 1);
    }

    #[test]
    fn load_points_replaces_store_and_resets_pairs() {
        let mut s = session();
        let a = s.add_point(Side::First, 0.1, 0.1);
        s.add_point(Side::Second, 0.3, 0.3);
        s.select(Side::First, a.id());
        s.match_points();

        let loaded = vec![Point::new(id("x"), 0.5, 0.5)];
        assert_eq!(s.load_points(Side::First, loaded.clone()), 0);
        assert_eq!(s.points(Side::First), loaded.as_slice());
        assert!(s.matches().is_empty());
        assert!(s.selected(Side::First).is_none());
        assert_eq!(s.points(Side::Second).len(), 1);
    }

    #[test]
    fn load_image_clears_slot_and_its_pairs() {
        let mut s = session();
        s.add_point(Side::First, 0.1, 0.1);
        s.add_point(Side::Second, 0.3, 0.3);
        s.match_points();

        s.load_image(Side::Second, image(640, 480));
        assert!(s.points(Side::Second).is_empty());
        assert_eq!(s.points(Side::First).len(), 1);
        assert!(s.matches().is_empty());
        assert_eq!(s.slot(Side::Second).image(), Some(&image(640, 480)));
        assert!(s.slot(Side::First).image().is_none());
    }

    #[test]
    fn place_point_without_image_is_surface_relative() {
        let mut s = session();
        let p = s.place_point(
            Side::First,
            SurfacePos::new(250.0, 50.0),
            SurfaceSize::new(200.0, 100.0),
        );
        assert!(close(p.x(), 1.0));
        assert!(close(p.y(), 0.5));
    }

    #[test]
    fn place_point_with_image_uses_contain_fit() {
        let mut s = session();
        s.load_image(Side::First, image(800, 400));
        let surface = SurfaceSize::new(400.0, 400.0);
        let p = s.place_point(Side::First, SurfacePos::new(100.0, 150.0), surface);
        assert!(close(p.x(), 0.25));
        assert!(close(p.y(), 0.25));
        let drawn = s.viewport(Side::First, surface).to_display(&p);
        assert!(close(drawn.x, 100.0));
        assert!(close(drawn.y, 150.0));
    }

    #[test]
    fn stretch_fit_ignores_image_size() {
        let mut s = session();
        s.set_fit(FitMode::Stretch);
        s.load_image(Side::First, image(800, 400));
        let p = s.place_point(
            Side::First,
            SurfacePos::new(100.0, 150.0),
            SurfaceSize::new(400.0, 400.0),
        );
        assert!(close(p.y(), 0.375));
    }

    #[test]
    fn resolved_pairs_point_back_to_points() {
        let mut s = session();
        let a = s.add_point(Side::First, 0.1, 0.1);
        let b = s.add_point(Side::Second, 0.9, 0.9);
        s.match_points();
        let pairs: Vec<_> = s.resolved_pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].index, 0);
        assert_eq!(pairs[0].first, Some(&a));
        assert_eq!(pairs[0].second, Some(&b));
    }

    #[test]
    fn points_to_save_signals_empty() {
        let mut s = session();
        assert!(s.points_to_save(Side::First).is_none());
        s.add_point(Side::First, 0.5, 0.5);
        assert_eq!(s.points_to_save(Side::First).map(<[Point]>::len), Some(1));
    }

    #[test]
    fn selections_are_independent_per_side() {
        let mut s = session();
        let a = s.add_point(Side::First, 0.1, 0.1);
        let b = s.add_point(Side::Second, 0.2, 0.2);
        assert!(s.select(Side::First, a.id()));
        assert!(!s.select(Side::First, b.id()));
        assert_eq!(s.toggle_selection(Side::Second, b.id()), Some(b.id()));
        assert_eq!(s.selected(Side::First), Some(a.id()));
        s.clear_selection(Side::First);
        assert!(s.selected(Side::First).is_none());
        assert_eq!(s.selected(Side::Second), Some(b.id()));
    }

    #[test]
    fn stores_are_independent_namespaces() {
        let mut s = Session::with_generators(SequentialIds::new("p"), SequentialIds::new("p"));
        let a = s.add_point(Side::First, 0.1, 0.1);
        let b = s.add_point(Side::Second, 0.2, 0.2);
        s.add_point(Side::Second, 0.3, 0.3);
        assert_eq!(a.id(), b.id());
        s.match_points();
        s.delete_point(Side::Second, &id("p2"));
        assert_eq!(s.matches().len(), 1);
        s.delete_point(Side::First, a.id());
        assert_eq!(s.points(Side::Second).len(), 1);
        assert!(s.matches().is_empty());
    }

    #[test]
    fn default_session_uses_config_prefix() {
        let config = EditorConfig {
            id_prefix: "kp_".to_owned(),
            fit: FitMode::Stretch,
        };
        let mut s = Session::with_config(&config);
        assert!(s.add_point(Side::First, 0.5, 0.5).id().as_str().starts_with("kp_"));
        assert_eq!(s.viewport(Side::First, SurfaceSize::new(1.0, 1.0)).fit, FitMode::Stretch);
    }
}
