//! pointpair: command-line front end for point files.
//!
//! Reads and writes the point file format, reads image sizes for
//! letterboxed click mapping, and drives the editing session from
//! `pointpair-core`. Useful for:
//!
//! - Validating hand-edited or legacy point files
//! - Scripting point placement from recorded click positions
//! - Inspecting positional matches between two images' point files
//!
//! # Usage
//!
//! ```text
//! pointpair check points1.txt
//! pointpair place points1.txt --surface 400x300 --click 120,80 --image left.png
//! pointpair match points1.txt points2.txt --json
//! ```
//!
//! Set `RUST_LOG=debug` for detailed logging.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use pointpair_core::{
    Dimensions, Edit, EditorConfig, FitMode, ImageSource, MatchOutcome, MatchStatus, Point, PointId,
    Session, Side, SurfacePos, SurfaceSize,
};
use pointpair_export::{ParsedPoints, SkippedBlock, parse_points, to_points_text};
use serde::Serialize;

/// Place, edit, validate, and match annotated points stored in text files.
#[derive(Parser)]
#[command(name = "pointpair", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// How images are fitted into the display surface.
    #[arg(long, value_enum, global = true, default_value_t = Fit::Contain)]
    fit: Fit,

    /// Prefix for generated point ids.
    #[arg(long, global = true, default_value = EditorConfig::DEFAULT_ID_PREFIX)]
    id_prefix: String,

    /// Full editor config as a JSON string.
    ///
    /// When provided, `--fit` and `--id-prefix` are ignored. The JSON
    /// must be a valid `EditorConfig` serialization; missing fields take
    /// their defaults.
    #[arg(long, global = true)]
    config_json: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Parse a point file and report recovered points and skipped blocks.
    ///
    /// Exits with failure if any block was skipped.
    Check {
        /// Point file to check.
        file: PathBuf,

        /// Output the report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Rewrite a point file in canonical form.
    ///
    /// Unreadable blocks and duplicate ids are dropped; coordinates are
    /// clamped into [0, 1]. Other rewriting commands refuse to drop
    /// blocks unless given `--force`.
    Normalize {
        /// Point file to read.
        file: PathBuf,

        /// Where to write the result (defaults to overwriting FILE).
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Map a click on a display surface to a new point and append it.
    ///
    /// The file is created if it does not exist.
    Place {
        /// Point file to append to.
        file: PathBuf,

        /// Click offset from the surface's top-left corner, as `X,Y`.
        #[arg(long, value_parser = parse_pos)]
        click: SurfacePos,

        #[command(flatten)]
        surface: SurfaceArgs,

        /// Rewrite the file even if some blocks could not be read.
        ///
        /// Unreadable blocks are dropped from the rewritten file.
        #[arg(long)]
        force: bool,
    },

    /// Move an existing point to new normalized coordinates.
    Edit {
        /// Point file to modify.
        file: PathBuf,

        /// Id of the point to move.
        id: String,

        /// New normalized x (clamped into [0, 1]).
        #[arg(allow_negative_numbers = true)]
        x: f64,

        /// New normalized y (clamped into [0, 1]).
        #[arg(allow_negative_numbers = true)]
        y: f64,

        /// Rewrite the file even if some blocks could not be read.
        ///
        /// Unreadable blocks are dropped from the rewritten file.
        #[arg(long)]
        force: bool,
    },

    /// Remove a point.
    Delete {
        /// Point file to modify.
        file: PathBuf,

        /// Id of the point to remove.
        id: String,

        /// Rewrite the file even if some blocks could not be read.
        ///
        /// Unreadable blocks are dropped from the rewritten file.
        #[arg(long)]
        force: bool,
    },

    /// Print where each point is drawn on a display surface.
    Locate {
        /// Point file to read.
        file: PathBuf,

        #[command(flatten)]
        surface: SurfaceArgs,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Pair two images' points by position.
    Match {
        /// Point file of the first image.
        first: PathBuf,

        /// Point file of the second image.
        second: PathBuf,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Display surface geometry shared by `place` and `locate`.
#[derive(Args)]
struct SurfaceArgs {
    /// Rendered surface size, as `WIDTHxHEIGHT`.
    #[arg(long, value_parser = parse_size)]
    surface: SurfaceSize,

    /// Image file to read the natural size from.
    #[arg(long, conflicts_with = "natural")]
    image: Option<PathBuf>,

    /// Natural image size in pixels, as `WIDTHxHEIGHT`.
    #[arg(long, value_parser = parse_dimensions)]
    natural: Option<Dimensions>,
}

/// Fit mode selection.
#[derive(Clone, Copy, ValueEnum)]
enum Fit {
    /// Letterboxed, aspect-preserving fit.
    Contain,
    /// Image stretched to fill the surface.
    Stretch,
}

/// Errors reported by the command-line front end.
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("error reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error writing {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("error reading image size of {}: {source}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },

    #[error("error parsing --config-json: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid point id: {0}")]
    InvalidId(#[from] pointpair_core::InvalidPointId),

    #[error("no point with id {0:?}")]
    UnknownPoint(String),

    #[error("{count} block(s) skipped")]
    SkippedBlocks { count: usize },

    #[error(
        "{} has {count} unreadable block(s); rerun with --force to drop them, or use `normalize`",
        path.display()
    )]
    WouldDropBlocks { path: PathBuf, count: usize },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let config = config_from_cli(cli)?;
    log::debug!("config: {config:?}");

    match &cli.command {
        Command::Check { file, json } => check(file, *json),
        Command::Normalize { file, output } => {
            let session = load_session(&config, file, true)?;
            write_points(output.as_deref().unwrap_or(file), &session, Side::First)
        }
        Command::Place {
            file,
            click,
            surface,
            force,
        } => place(&config, file, *click, surface, *force),
        Command::Edit {
            file,
            id,
            x,
            y,
            force,
        } => {
            let edit = edit(&config, file, id, *x, *y, *force)?;
            if edit.clamped {
                eprintln!(
                    "Coordinates clamped: requested ({x}, {y}), stored ({}, {})",
                    edit.point.x(),
                    edit.point.y(),
                );
            }
            Ok(())
        }
        Command::Delete { file, id, force } => {
            let id = PointId::new(id.as_str())?;
            let mut session = load_session(&config, file, *force)?;
            session
                .delete_point(Side::First, &id)
                .ok_or_else(|| CliError::UnknownPoint(id.to_string()))?;
            write_points(file, &session, Side::First)
        }
        Command::Locate {
            file,
            surface,
            json,
        } => locate(&config, file, surface, *json),
        Command::Match {
            first,
            second,
            json,
        } => match_files(&config, first, second, *json),
    }
}

/// Build an [`EditorConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and the
/// individual flags are ignored.
fn config_from_cli(cli: &Cli) -> Result<EditorConfig, CliError> {
    if let Some(ref json) = cli.config_json {
        return Ok(serde_json::from_str(json)?);
    }
    Ok(EditorConfig {
        id_prefix: cli.id_prefix.clone(),
        fit: match cli.fit {
            Fit::Contain => FitMode::Contain,
            Fit::Stretch => FitMode::Stretch,
        },
    })
}

fn read_points(path: &Path) -> Result<ParsedPoints, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_points(&text))
}

fn skip_message(path: &Path, block: &SkippedBlock) -> String {
    format!(
        "{}:{}: skipped block {}: {}",
        path.display(),
        block.line,
        block.index,
        block.reason,
    )
}

fn report_skipped(path: &Path, skipped: &[SkippedBlock]) {
    for block in skipped {
        eprintln!("{}", skip_message(path, block));
    }
}

/// Report skipped blocks and refuse to go on with a rewrite that would
/// lose them, unless `force` is set.
fn guard_rewrite(path: &Path, parsed: &ParsedPoints, force: bool) -> Result<(), CliError> {
    report_skipped(path, &parsed.skipped);
    if parsed.is_clean() || force {
        return Ok(());
    }
    Err(CliError::WouldDropBlocks {
        path: path.to_path_buf(),
        count: parsed.skipped.len(),
    })
}

/// Load a point file into the first slot of a fresh session for rewriting.
fn load_session(config: &EditorConfig, path: &Path, force: bool) -> Result<Session, CliError> {
    let parsed = read_points(path)?;
    guard_rewrite(path, &parsed, force)?;
    let mut session = Session::with_config(config);
    session.load_points(Side::First, parsed.points);
    Ok(session)
}

fn edit(
    config: &EditorConfig,
    file: &Path,
    id: &str,
    x: f64,
    y: f64,
    force: bool,
) -> Result<Edit, CliError> {
    let id = PointId::new(id)?;
    let mut session = load_session(config, file, force)?;
    let edit = session
        .edit_point(Side::First, &id, x, y)
        .ok_or_else(|| CliError::UnknownPoint(id.to_string()))?;
    write_points(file, &session, Side::First)?;
    Ok(edit)
}

fn write_points(path: &Path, session: &Session, side: Side) -> Result<(), CliError> {
    if session.points_to_save(side).is_none() {
        eprintln!("No points to save; writing header only");
    }
    let text = to_points_text(session.points(side));
    std::fs::write(path, &text).map_err(|source| CliError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    eprintln!(
        "{} point(s) written to {}",
        session.points(side).len(),
        path.display()
    );
    Ok(())
}

/// Resolve the natural image size from `--image` or `--natural`.
fn image_source(args: &SurfaceArgs) -> Result<Option<ImageSource>, CliError> {
    if let Some(path) = &args.image {
        let (width, height) = image::image_dimensions(path).map_err(|source| CliError::Image {
            path: path.clone(),
            source,
        })?;
        return Ok(Some(ImageSource {
            name: path.display().to_string(),
            dimensions: Dimensions { width, height },
        }));
    }
    Ok(args.natural.map(|dimensions| ImageSource {
        name: String::from("(given size)"),
        dimensions,
    }))
}

fn check(file: &Path, json: bool) -> Result<(), CliError> {
    let parsed = read_points(file)?;
    if json {
        println!("{}", to_json(&parsed)?);
    } else {
        println!("{}: {} point(s)", file.display(), parsed.points.len());
        for (i, point) in parsed.points.iter().enumerate() {
            println!(
                "  {:>4}  {:<32} ({:.4}, {:.4})",
                i + 1,
                point.id(),
                point.x(),
                point.y()
            );
        }
        report_skipped(file, &parsed.skipped);
    }
    if parsed.is_clean() {
        Ok(())
    } else {
        Err(CliError::SkippedBlocks {
            count: parsed.skipped.len(),
        })
    }
}

fn place(
    config: &EditorConfig,
    file: &Path,
    click: SurfacePos,
    args: &SurfaceArgs,
    force: bool,
) -> Result<(), CliError> {
    let parsed = match std::fs::read_to_string(file) {
        Ok(text) => parse_points(&text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            log::info!("{} does not exist, starting empty", file.display());
            ParsedPoints::default()
        }
        Err(source) => {
            return Err(CliError::Read {
                path: file.to_path_buf(),
                source,
            });
        }
    };
    guard_rewrite(file, &parsed, force)?;

    let mut session = Session::with_config(config);
    if let Some(image) = image_source(args)? {
        session.load_image(Side::First, image);
    }
    session.load_points(Side::First, parsed.points);

    let point = session.place_point(Side::First, click, args.surface);
    println!("{}\t{}\t{}", point.id(), point.x(), point.y());
    write_points(file, &session, Side::First)
}

/// One row of `locate` output.
#[derive(Serialize)]
struct Located<'a> {
    id: &'a PointId,
    x: f64,
    y: f64,
    surface_x: f64,
    surface_y: f64,
}

fn locate(
    config: &EditorConfig,
    file: &Path,
    args: &SurfaceArgs,
    json: bool,
) -> Result<(), CliError> {
    let mut session = Session::with_config(config);
    if let Some(image) = image_source(args)? {
        session.load_image(Side::First, image);
    }
    let parsed = read_points(file)?;
    report_skipped(file, &parsed.skipped);
    session.load_points(Side::First, parsed.points);

    let viewport = session.viewport(Side::First, args.surface);
    let rows: Vec<Located<'_>> = session
        .points(Side::First)
        .iter()
        .map(|point| {
            let pos = viewport.to_display(point);
            Located {
                id: point.id(),
                x: point.x(),
                y: point.y(),
                surface_x: pos.x,
                surface_y: pos.y,
            }
        })
        .collect();

    if json {
        println!("{}", to_json(&rows)?);
    } else {
        if let Some(fit) = viewport.contain_fit() {
            println!(
                "Displayed image: {:.1}x{:.1} at offset ({:.1}, {:.1}), scale {:.4}",
                fit.width, fit.height, fit.offset_x, fit.offset_y, fit.scale,
            );
        }
        for row in &rows {
            println!(
                "{:<32} ({:.4}, {:.4}) -> ({:.1}, {:.1})",
                row.id, row.x, row.y, row.surface_x, row.surface_y
            );
        }
    }
    Ok(())
}

/// `match` output: pairs plus the points left over on each side.
#[derive(Serialize)]
struct MatchReport<'a> {
    pairs: Vec<(&'a Point, &'a Point)>,
    unmatched_first: Vec<&'a Point>,
    unmatched_second: Vec<&'a Point>,
}

fn match_files(
    config: &EditorConfig,
    first: &Path,
    second: &Path,
    json: bool,
) -> Result<(), CliError> {
    let mut session = Session::with_config(config);
    for (side, path) in [(Side::First, first), (Side::Second, second)] {
        let parsed = read_points(path)?;
        report_skipped(path, &parsed.skipped);
        session.load_points(side, parsed.points);
    }

    let outcome = session.match_points();
    let report = MatchReport {
        pairs: session
            .resolved_pairs()
            .filter_map(|pair| pair.first.zip(pair.second))
            .collect(),
        unmatched_first: unmatched(&session, Side::First),
        unmatched_second: unmatched(&session, Side::Second),
    };

    if json {
        println!("{}", to_json(&report)?);
        return Ok(());
    }

    match outcome {
        MatchOutcome::NothingToMatch => {
            println!("Nothing to match: add points to both images first.");
        }
        MatchOutcome::Matched(count) => {
            println!("{count} pair(s)");
            for (i, (a, b)) in report.pairs.iter().enumerate() {
                println!(
                    "  Pair {}: {} ({:.3}, {:.3}) <-> {} ({:.3}, {:.3})",
                    i + 1,
                    a.id().short_label(),
                    a.x(),
                    a.y(),
                    b.id().short_label(),
                    b.x(),
                    b.y(),
                );
            }
        }
    }
    for (side, points) in [
        (Side::First, &report.unmatched_first),
        (Side::Second, &report.unmatched_second),
    ] {
        if !points.is_empty() {
            let labels: Vec<&str> = points.iter().map(|p| p.id().short_label()).collect();
            println!("{} unmatched: {}", side.label(), labels.join(", "));
        }
    }
    Ok(())
}

fn unmatched(session: &Session, side: Side) -> Vec<&Point> {
    session
        .points(side)
        .iter()
        .filter(|p| session.match_status(side, p.id()) == MatchStatus::Unmatched)
        .collect()
}

fn to_json(value: &impl Serialize) -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Parse `A<sep>B` into two finite numbers.
fn parse_pair(s: &str, sep: char) -> Result<(f64, f64), String> {
    let (a, b) = s
        .split_once(sep)
        .ok_or_else(|| format!("expected two numbers separated by '{sep}'"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("{v:?} is not a finite number"))
    };
    Ok((parse(a)?, parse(b)?))
}

fn parse_pos(s: &str) -> Result<SurfacePos, String> {
    let (x, y) = parse_pair(s, ',')?;
    Ok(SurfacePos::new(x, y))
}

fn parse_size(s: &str) -> Result<SurfaceSize, String> {
    let (width, height) = parse_pair(s, 'x')?;
    Ok(SurfaceSize::new(width, height))
}

fn parse_dimensions(s: &str) -> Result<Dimensions, String> {
    let (width, height) = s
        .split_once('x')
        .ok_or_else(|| "expected WIDTHxHEIGHT".to_owned())?;
    let parse = |v: &str| {
        v.trim()
            .parse::<u32>()
            .map_err(|e| format!("{v:?}: {e}"))
    };
    Ok(Dimensions {
        width: parse(width)?,
        height: parse(height)?,
    })
}
