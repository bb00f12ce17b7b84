//! Point file serializer and parser.
//!
//! A point file holds the points of one image as plain UTF-8 text
//! (conventionally `.txt`). Each point is a block of three lines:
//!
//! ```text
//! <id>
//! <x>
//! <y>
//! ```
//!
//! Blocks are separated by one blank line. `x` and `y` are normalized
//! coordinates in `[0, 1]`, written with Rust's shortest round-trip
//! `f64` formatting so a save/load cycle reproduces them exactly.
//!
//! Lines beginning with `#` are comments. The serializer emits a single
//! header comment, followed by a blank line; the parser discards any
//! block whose first line is a comment.
//!
//! Parsing never fails as a whole. Blocks that cannot be read are
//! skipped and reported as [`SkippedBlock`] diagnostics alongside the
//! recovered points.
//!
//! Both directions are pure functions with no I/O.

use std::collections::HashSet;
use std::fmt::{self, Write};

use pointpair_core::{InvalidPointId, Point, PointId};
use serde::{Deserialize, Serialize};

/// Header comment written at the top of every point file.
pub const HEADER: &str = "# pointpair points: id, x, y (normalized 0-1)";

/// Serialize points into the point file format.
///
/// The output always ends with a newline. An empty slice produces the
/// header line only.
///
/// # Examples
///
/// ```
/// use pointpair_core::{Point, PointId};
/// use pointpair_export::to_points_text;
///
/// let id = PointId::new("point_1").unwrap();
/// let text = to_points_text(&[Point::new(id, 0.25, 0.5)]);
/// assert!(text.ends_with("point_1\n0.25\n0.5\n"));
/// ```
#[must_use]
pub fn to_points_text(points: &[Point]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{HEADER}");
    for point in points {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", point.id());
        let _ = writeln!(out, "{}", point.x());
        let _ = writeln!(out, "{}", point.y());
    }
    out
}

/// Which coordinate line of a block failed to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    /// The second line of a block.
    X,
    /// The third line of a block.
    Y,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::X => "x",
            Self::Y => "y",
        })
    }
}

/// Why a block was skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SkipReason {
    /// The block does not have exactly three non-empty lines.
    #[error("expected 3 lines (id, x, y), found {found}")]
    WrongLineCount {
        /// Number of non-empty lines found.
        found: usize,
    },

    /// A coordinate line is not a finite decimal number.
    #[error("{axis} coordinate {value:?} is not a finite number")]
    InvalidCoordinate {
        /// Which coordinate failed.
        axis: Axis,
        /// The offending text.
        value: String,
    },

    /// The id line is not a usable point id.
    #[error("invalid id {value:?}: {reason}")]
    InvalidId {
        /// The offending text.
        value: String,
        /// Which id rule it breaks.
        reason: InvalidPointId,
    },

    /// The block starts with a comment line, so it is discarded even
    /// though it carries data lines.
    #[error("block starts with a comment; {data_lines} data line(s) ignored")]
    CommentedOut {
        /// Number of non-comment lines in the block.
        data_lines: usize,
    },

    /// An earlier block already used this id.
    #[error("duplicate id {id:?}")]
    DuplicateId {
        /// The repeated id.
        id: String,
    },
}

/// A block that could not be turned into a point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedBlock {
    /// Zero-based ordinal of the block among all blank-line separated
    /// blocks in the text.
    pub index: usize,
    /// One-based line number where the block starts.
    pub line: usize,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Points recovered from a point file plus diagnostics for the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedPoints {
    /// Successfully parsed points in file order.
    pub points: Vec<Point>,
    /// Blocks that were skipped, in file order.
    pub skipped: Vec<SkippedBlock>,
}

impl ParsedPoints {
    /// Returns `true` if every data block was recovered.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }
}

/// A run of consecutive non-blank lines.
struct Block<'a> {
    /// One-based line number of the first line.
    line: usize,
    lines: Vec<&'a str>,
}

/// Split text into blank-line separated blocks of trimmed lines.
fn blocks(text: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut current: Option<Block<'_>> = None;
    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            if let Some(block) = current.take() {
                blocks.push(block);
            }
            continue;
        }
        current
            .get_or_insert_with(|| Block {
                line: i + 1,
                lines: Vec::new(),
            })
            .lines
            .push(line);
    }
    if let Some(block) = current {
        blocks.push(block);
    }
    blocks
}

/// Parse a coordinate line as a finite number.
fn parse_coordinate(value: &str, axis: Axis) -> Result<f64, SkipReason> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| SkipReason::InvalidCoordinate {
            axis,
            value: value.to_owned(),
        })
}

/// Turn the data lines of one block into a point.
fn parse_block(lines: &[&str], seen: &HashSet<PointId>) -> Result<Point, SkipReason> {
    let &[id, x, y] = lines else {
        return Err(SkipReason::WrongLineCount { found: lines.len() });
    };
    let x = parse_coordinate(x, Axis::X)?;
    let y = parse_coordinate(y, Axis::Y)?;
    let id = PointId::new(id).map_err(|reason| SkipReason::InvalidId {
        value: id.to_owned(),
        reason,
    })?;
    if seen.contains(&id) {
        return Err(SkipReason::DuplicateId {
            id: id.as_str().to_owned(),
        });
    }
    Ok(Point::new(id, x, y))
}

/// Parse a point file, recovering every well-formed block.
///
/// - Blocks are separated by blank (or whitespace-only) lines.
/// - Blocks whose first line is a comment (`#`) are discarded. Blocks
///   made only of comments are ignored without a diagnostic; commented
///   blocks that still hold data lines are reported as skipped.
/// - Each remaining block must be exactly `id`, `x`, `y`.
/// - `x` and `y` must be finite decimals and are clamped into `[0, 1]`.
/// - An id already recovered earlier in the text is skipped.
///
/// CRLF line endings and a leading byte-order mark are accepted.
///
/// # Examples
///
/// ```
/// use pointpair_export::parse_points;
///
/// let parsed = parse_points("a\n0.1\n0.2\n\nb\n0.3\n");
/// assert_eq!(parsed.points.len(), 1);
/// assert_eq!(parsed.skipped.len(), 1);
/// ```
#[must_use]
pub fn parse_points(text: &str) -> ParsedPoints {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut parsed = ParsedPoints::default();
    let mut seen = HashSet::new();

    for (index, block) in blocks(text).into_iter().enumerate() {
        let data_lines = block
            .lines
            .iter()
            .filter(|line| !line.starts_with('#'))
            .count();
        let starts_with_comment = block.lines.first().is_some_and(|l| l.starts_with('#'));
        let result = match (starts_with_comment, data_lines) {
            (true, 0) => continue,
            (true, data_lines) => Err(SkipReason::CommentedOut { data_lines }),
            (false, _) => parse_block(&block.lines, &seen),
        };

        match result {
            Ok(point) => {
                seen.insert(point.id().clone());
                parsed.points.push(point);
            }
            Err(reason) => {
                let line = block.line;
                log::debug!("skipping point block {index} at line {line}: {reason}");
                parsed.skipped.push(SkippedBlock {
                    index,
                    line,
                    reason,
                });
            }
        }
    }

    log::debug!(
        "parsed {} point(s), skipped {} block(s)",
        parsed.points.len(),
        parsed.skipped.len()
    );
    parsed
}
