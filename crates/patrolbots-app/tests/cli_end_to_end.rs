use std::io::Write;
use std::path::{Path, PathBuf};

use clap::Parser;
use patrolbots_app::{Cli, analyze, load_grid, render_json, render_text};
use patrolbots_core::{PatrolGrid, PatrolReport};
use tempfile::NamedTempFile;

const EXAMPLE: &str = "\
....#.....
.........#
..........
..#.......
.......#..
..........
.#..^.....
........#.
#.........
......#...";

fn example_on_disk() -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    write!(file, "{EXAMPLE}").expect("write map");
    file
}

#[test]
fn loads_and_analyzes_a_map_from_disk() {
    let file = example_on_disk();
    let grid = load_grid(file.path()).expect("load");
    assert_eq!(grid.width(), 10);
    assert_eq!(grid.height(), 10);

    let analysis = analyze(&grid).expect("analysis");
    assert_eq!(analysis.report.visited_tiles, 41);
    assert_eq!(analysis.report.looping_obstructions, 6);
}

#[test]
fn missing_input_reports_the_path() {
    let err = load_grid(Path::new("definitely-not-here.txt")).expect_err("missing file");
    assert!(format!("{err:#}").contains("definitely-not-here.txt"));
}

#[test]
fn malformed_input_reports_the_grid_error() {
    let mut file = NamedTempFile::new().expect("temp file");
    write!(file, "....\n..\n....").expect("write map");
    let err = load_grid(file.path()).expect_err("ragged map");
    let chain = format!("{err:#}");
    assert!(chain.contains("is not a valid grid"), "chain={chain}");
    assert!(chain.contains("row 1"), "chain={chain}");
}

#[test]
fn maps_without_a_guard_fail_to_analyze() {
    let grid = PatrolGrid::parse("....\n....").expect("grid");
    let err = analyze(&grid).expect_err("no guard");
    assert!(format!("{err:#}").contains("no guard start marker"));
}

#[test]
fn boxed_in_patrols_fail_to_analyze() {
    let grid = PatrolGrid::parse(".#..\n#^#.\n.#..").expect("grid");
    let err = analyze(&grid).expect_err("boxed in");
    assert!(format!("{err:#}").contains("never leaves the map"));
}

#[test]
fn text_rendering_uses_the_two_line_format() {
    let report = PatrolReport {
        visited_tiles: 41,
        looping_obstructions: 6,
    };
    assert_eq!(render_text(&report), "Part 1: 41\nPart 2: 6\n");
}

#[test]
fn json_rendering_round_trips() {
    let report = PatrolReport {
        visited_tiles: 41,
        looping_obstructions: 6,
    };
    let rendered = render_json(&report).expect("render");
    let parsed: PatrolReport = serde_json::from_str(&rendered).expect("parse");
    assert_eq!(parsed, report);
}

#[test]
fn route_paints_as_many_tiles_as_were_visited() {
    let grid = PatrolGrid::parse(EXAMPLE).expect("grid");
    let analysis = analyze(&grid).expect("analysis");
    let painted = analysis
        .route
        .to_string()
        .chars()
        .filter(|c| *c == 'X')
        .count();
    assert_eq!(painted, analysis.report.visited_tiles);
}

#[test]
fn cli_defaults_to_input_txt() {
    let cli = Cli::try_parse_from(["patrolbots"]).expect("parse");
    assert_eq!(cli.input, PathBuf::from("input.txt"));
    assert!(!cli.json);
    assert!(!cli.route);
}

#[test]
fn cli_accepts_a_path_and_flags() {
    let cli = Cli::try_parse_from(["patrolbots", "maps/today.txt", "--json", "--route"])
        .expect("parse");
    assert_eq!(cli.input, PathBuf::from("maps/today.txt"));
    assert!(cli.json);
    assert!(cli.route);
}
