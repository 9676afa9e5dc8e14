//! Command-line front end for the patrol simulator: load a map, walk it,
//! count loop-inducing obstructions, and print the report.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use patrolbots_core::{
    LoopDetector, ObstructionSearch, Patrol, PatrolGrid, PatrolOutcome, PatrolReport,
};
use tracing::info;

/// Command-line options.
#[derive(Parser, Debug)]
#[command(
    name = "patrolbots",
    version,
    about = "Walk a guard patrol map and count loop-inducing obstruction placements"
)]
pub struct Cli {
    /// Path to the patrol map.
    #[arg(env = "PATROLBOTS_INPUT", default_value = "input.txt")]
    pub input: PathBuf,

    /// Emit the report as JSON instead of the two-line text format.
    #[arg(long)]
    pub json: bool,

    /// Also print the walked map with every visited tile painted.
    #[arg(long)]
    pub route: bool,
}

/// Everything the front end needs from one full analysis pass.
#[derive(Debug)]
pub struct Analysis {
    pub report: PatrolReport,
    pub route: PatrolGrid,
}

/// Read and parse the patrol map at `path`.
pub fn load_grid(path: &Path) -> Result<PatrolGrid> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read patrol map {}", path.display()))?;
    PatrolGrid::parse(&raw)
        .with_context(|| format!("patrol map {} is not a valid grid", path.display()))
}

/// Walk the map once, then search every visited tile for loop-inducing
/// obstruction placements.
///
/// The baseline walk runs under a detector so a map that boxes the guard in
/// fails with an error instead of turning forever.
pub fn analyze(grid: &PatrolGrid) -> Result<Analysis> {
    let start = grid.guard_start()?;

    let walk_started = Instant::now();
    let baseline = Patrol::with_monitor(grid.clone(), start, LoopDetector::new()).run();
    let walk_ms = walk_started.elapsed().as_millis() as u64;
    if baseline.outcome() == PatrolOutcome::Looping {
        bail!("the unmodified patrol never leaves the map");
    }

    let visited_tiles = baseline.visited_count();
    let search_started = Instant::now();
    let looping_obstructions =
        ObstructionSearch::new(grid, start).count_looping(baseline.visited())?;
    let search_ms = search_started.elapsed().as_millis() as u64;
    info!(
        visited = visited_tiles,
        looping = looping_obstructions,
        turns = baseline.turn_events(),
        walk_ms,
        search_ms,
        "patrol analysis complete",
    );

    Ok(Analysis {
        report: PatrolReport {
            visited_tiles,
            looping_obstructions,
        },
        route: baseline.into_route(),
    })
}

/// Two-line text format, one part per line.
#[must_use]
pub fn render_text(report: &PatrolReport) -> String {
    format!(
        "Part 1: {}\nPart 2: {}\n",
        report.visited_tiles, report.looping_obstructions
    )
}

/// Pretty-printed JSON rendering of the report.
pub fn render_json(report: &PatrolReport) -> Result<String> {
    let mut rendered =
        serde_json::to_string_pretty(report).context("failed to encode report as JSON")?;
    rendered.push('\n');
    Ok(rendered)
}

/// Execute the CLI: load, analyze, print.
pub fn run(cli: &Cli) -> Result<()> {
    let grid = load_grid(&cli.input)?;
    info!(
        input = %cli.input.display(),
        width = grid.width(),
        height = grid.height(),
        "loaded patrol map",
    );

    let analysis = analyze(&grid)?;
    if cli.json {
        print!("{}", render_json(&analysis.report)?);
    } else {
        print!("{}", render_text(&analysis.report));
    }
    if cli.route {
        print!("{}", analysis.route);
    }
    Ok(())
}
