//! pointpair-export: Pure point file serializer and parser (sans-IO).
//!
//! Converts the points of one image to the line-oriented point file
//! format and back. Reading and writing files is left to callers.

pub mod points;

pub use points::{
    Axis, HEADER, ParsedPoints, SkipReason, SkippedBlock, parse_points, to_points_text,
};
