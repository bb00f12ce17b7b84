//! pointpair-core: Point model and correspondence engine (sans-IO).
//!
//! Annotated points are stored per image in normalized `[0, 1]`
//! coordinates and paired across two images by position:
//!
//! click -> [`coords`] -> normalized coordinate -> [`store`] ->
//! [`matcher`] pairs.
//!
//! [`Session`] ties the pieces together for an editor with two image
//! slots. This crate has **no I/O dependencies**: file reading and
//! writing, image decoding, and rendering are left to callers. The text
//! file format lives in `pointpair-export`.

pub mod coords;
pub mod id;
pub mod matcher;
pub mod session;
pub mod store;
pub mod types;

pub use coords::{ContainFit, Viewport};
pub use id::{IdGenerator, SequentialIds, TimestampIds};
pub use matcher::{MatchPair, Matches, match_points};
pub use session::{ImageSource, MatchOutcome, MatchStatus, ResolvedPair, Session, Slot};
pub use store::{Edit, PointStore};
pub use types::{
    Dimensions, EditorConfig, FitMode, InvalidPointId, Point, PointId, Side, SurfacePos,
    SurfaceSize, clamp_unit,
};
