//! Core simulation types for the PatrolBots workspace: the patrol grid, the
//! guard walker, loop detection, and the obstruction search.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

/// Contents of a single grid tile.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Cell {
    /// Traversable floor.
    #[default]
    Empty,
    /// Permanent wall.
    Obstruction,
    /// The guard's start tile.
    GuardStart,
    /// Tile the guard has walked over.
    Visited,
    /// Speculative obstruction planted during a search run.
    Hypothetical,
}

impl Cell {
    /// Whether forward motion into this tile triggers a turn instead.
    #[must_use]
    pub const fn blocks(self) -> bool {
        matches!(self, Self::Obstruction | Self::Hypothetical)
    }

    /// Character used for this cell in the textual map format.
    #[must_use]
    pub const fn to_char(self) -> char {
        match self {
            Self::Empty => '.',
            Self::Obstruction => '#',
            Self::GuardStart => '^',
            Self::Visited => 'X',
            Self::Hypothetical => 'O',
        }
    }

    /// Parse one map character, or `None` outside the alphabet.
    #[must_use]
    pub const fn from_char(tile: char) -> Option<Self> {
        match tile {
            '.' => Some(Self::Empty),
            '#' => Some(Self::Obstruction),
            '^' => Some(Self::GuardStart),
            'X' => Some(Self::Visited),
            'O' => Some(Self::Hypothetical),
            _ => None,
        }
    }
}

/// Compass facing of the guard. The map's y axis grows downward, so `North`
/// is the (0, -1) unit vector.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Facing {
    /// Up, (0, -1). The canonical initial facing.
    #[default]
    North,
    /// Right, (1, 0).
    East,
    /// Down, (0, 1).
    South,
    /// Left, (-1, 0).
    West,
}

impl Facing {
    /// Unit step vector for this facing.
    #[must_use]
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Facing after one clockwise quarter turn: (dx, dy) -> (-dy, dx).
    /// Four successive turns return to the original facing.
    #[must_use]
    pub const fn turned_right(self) -> Self {
        match self {
            Self::North => Self::East,
            Self::East => Self::South,
            Self::South => Self::West,
            Self::West => Self::North,
        }
    }
}

/// Integer tile coordinate. Components are signed so that one step past any
/// edge ("about to exit") stays representable.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    /// Construct a new position.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The adjacent position one step along `facing`.
    #[must_use]
    pub const fn stepped(self, facing: Facing) -> Self {
        let (dx, dy) = facing.delta();
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Complete guard state. The unit of cycle detection is this pair, not the
/// position alone: the guard may cross a tile many times with different
/// facings before its motion actually repeats.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GuardState {
    pub pos: GridPos,
    pub facing: Facing,
}

impl GuardState {
    /// Construct a new guard state.
    #[must_use]
    pub const fn new(pos: GridPos, facing: Facing) -> Self {
        Self { pos, facing }
    }
}

/// Errors raised while building or walking a patrol grid.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatrolError {
    /// A strict accessor was handed coordinates outside the grid. Always a
    /// caller defect: the stepping hot path probes exits through the safe
    /// accessors instead.
    #[error("coordinates ({x}, {y}) fall outside the {width}x{height} grid")]
    OutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },
    /// No guard start marker anywhere in the grid.
    #[error("no guard start marker in the grid")]
    GuardNotFound,
    /// Rows of unequal length would silently break the bounds contract.
    #[error("row {row} is {found} tiles wide, expected {expected}")]
    MalformedGrid {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// Input with no usable rows or columns.
    #[error("grid must have at least one row and one column")]
    EmptyGrid,
    /// Character outside the map alphabet.
    #[error("unknown tile {tile:?} at ({x}, {y})")]
    UnknownTile { tile: char, x: usize, y: usize },
}

/// Bounds-checked rectangular map of cells, stored row-major.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatrolGrid {
    width: u32,
    height: u32,
    cells: Vec<Cell>,
}

impl PatrolGrid {
    /// Construct a grid with `width * height` tiles initialised to `fill`.
    pub fn new(width: u32, height: u32, fill: Cell) -> Result<Self, PatrolError> {
        if width == 0 || height == 0 {
            return Err(PatrolError::EmptyGrid);
        }
        Ok(Self {
            width,
            height,
            cells: vec![fill; (width as usize) * (height as usize)],
        })
    }

    /// Parse the textual map format: one row per line, lines trimmed, empty
    /// lines dropped, every remaining row the same width.
    pub fn parse(input: &str) -> Result<Self, PatrolError> {
        let rows: Vec<&str> = input
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        let height = rows.len();
        let width = rows.first().map_or(0, |row| row.chars().count());
        if width == 0 || height == 0 {
            return Err(PatrolError::EmptyGrid);
        }
        let mut cells = Vec::with_capacity(width * height);
        for (y, row) in rows.iter().enumerate() {
            let found = row.chars().count();
            if found != width {
                return Err(PatrolError::MalformedGrid {
                    row: y,
                    expected: width,
                    found,
                });
            }
            for (x, tile) in row.chars().enumerate() {
                cells.push(Cell::from_char(tile).ok_or(PatrolError::UnknownTile { tile, x, y })?);
            }
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
            cells,
        })
    }

    /// Grid width in tiles.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in tiles.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Whether `pos` lies inside [0, width) x [0, height).
    #[must_use]
    pub const fn contains(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Flat index for an in-bounds position.
    #[inline]
    fn offset(&self, pos: GridPos) -> usize {
        (pos.y as usize) * (self.width as usize) + (pos.x as usize)
    }

    fn out_of_bounds(&self, pos: GridPos) -> PatrolError {
        PatrolError::OutOfBounds {
            x: pos.x,
            y: pos.y,
            width: self.width,
            height: self.height,
        }
    }

    /// Read a cell, or `None` when `pos` is outside the grid. The walker's
    /// hot path reads through this accessor, where out of bounds means
    /// "about to exit" rather than an error.
    #[must_use]
    pub fn get(&self, pos: GridPos) -> Option<Cell> {
        if self.contains(pos) {
            Some(self.cells[self.offset(pos)])
        } else {
            None
        }
    }

    /// Strict read; out of bounds is a caller defect.
    pub fn must_get(&self, pos: GridPos) -> Result<Cell, PatrolError> {
        self.get(pos).ok_or_else(|| self.out_of_bounds(pos))
    }

    /// Write a cell when `pos` is inside the grid, reporting whether the
    /// write landed. No-op past the edge, so exit probing and route painting
    /// can share the hot path.
    pub fn try_set(&mut self, pos: GridPos, cell: Cell) -> bool {
        if self.contains(pos) {
            let idx = self.offset(pos);
            self.cells[idx] = cell;
            true
        } else {
            false
        }
    }

    /// Strict write; out of bounds is a caller defect.
    pub fn must_set(&mut self, pos: GridPos, cell: Cell) -> Result<(), PatrolError> {
        if self.try_set(pos, cell) {
            Ok(())
        } else {
            Err(self.out_of_bounds(pos))
        }
    }

    /// First position satisfying `predicate`, scanning rows top to bottom
    /// and tiles left to right.
    pub fn find(&self, mut predicate: impl FnMut(Cell) -> bool) -> Option<GridPos> {
        self.cells.iter().position(|cell| predicate(*cell)).map(|idx| {
            GridPos::new(
                (idx % self.width as usize) as i32,
                (idx / self.width as usize) as i32,
            )
        })
    }

    /// The guard's start state: position of the start marker plus the
    /// canonical initial facing.
    pub fn guard_start(&self) -> Result<GuardState, PatrolError> {
        self.find(|cell| cell == Cell::GuardStart)
            .map(|pos| GuardState::new(pos, Facing::North))
            .ok_or(PatrolError::GuardNotFound)
    }

    /// Raw cell slice, row-major.
    #[must_use]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

impl fmt::Display for PatrolGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.width as usize) {
            for cell in row {
                write!(f, "{}", cell.to_char())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Terminal outcome of a walk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PatrolOutcome {
    /// The guard stepped past an edge of the grid.
    Exited,
    /// The guard's motion became periodic.
    Looping,
}

/// Single primitive action taken by [`Patrol::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepEvent {
    /// Advanced one tile along the current facing.
    Moved,
    /// Blocked ahead; rotated right in place.
    Turned,
    /// Terminal: the guard left the grid.
    Exited,
    /// Terminal: the monitor saw a repeated pre-turn state.
    Looped,
}

impl StepEvent {
    /// Whether the walk has reached a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Exited | Self::Looped)
    }
}

/// Decorator seam consulted immediately before every turn-event with the
/// pre-turn guard state.
pub trait TurnMonitor {
    /// Record `state` and report whether this exact state was already
    /// observed during the current walk.
    fn observe_turn(&mut self, state: GuardState) -> bool;
}

/// Monitor that never reports a repeat: the undecorated baseline walk. A
/// guard boxed in on all four sides would turn forever under this monitor;
/// [`LoopDetector`] exists for exactly that reason.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullMonitor;

impl TurnMonitor for NullMonitor {
    fn observe_turn(&mut self, _state: GuardState) -> bool {
        false
    }
}

/// Cycle detector over the walk's turn-events.
///
/// Only turn-events are recorded, not every step: a repeated (position,
/// facing) pair proves the path between the repetitions repeats as well, and
/// the number of such events is bounded by width x height x 4, so the
/// history stays small and the walk is guaranteed to terminate.
#[derive(Debug, Clone, Default)]
pub struct LoopDetector {
    seen: HashSet<GuardState>,
}

impl LoopDetector {
    /// Fresh detector with an empty history.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct turn-events recorded so far.
    #[must_use]
    pub fn recorded_turns(&self) -> usize {
        self.seen.len()
    }
}

impl TurnMonitor for LoopDetector {
    fn observe_turn(&mut self, state: GuardState) -> bool {
        !self.seen.insert(state)
    }
}

/// One guard walk over one privately owned grid.
///
/// The walker owns its grid and paints visited tiles in place as it goes.
/// Callers clone the canonical grid before constructing a walk, so
/// speculative runs can never leak marks into each other; the visited set
/// and the monitor history are created fresh here and returned through
/// [`PatrolSummary`], never shared across walks.
#[derive(Debug)]
pub struct Patrol<M = NullMonitor> {
    grid: PatrolGrid,
    guard: GuardState,
    visited: HashSet<GridPos>,
    turn_events: usize,
    monitor: M,
    outcome: Option<PatrolOutcome>,
}

impl Patrol<NullMonitor> {
    /// Baseline walk: locate the start marker and walk undecorated.
    pub fn new(grid: PatrolGrid) -> Result<Self, PatrolError> {
        let start = grid.guard_start()?;
        Ok(Self::with_monitor(grid, start, NullMonitor))
    }
}

impl<M: TurnMonitor> Patrol<M> {
    /// Walk `grid` from `start`, consulting `monitor` before every turn.
    /// The start tile is visited immediately.
    pub fn with_monitor(mut grid: PatrolGrid, start: GuardState, monitor: M) -> Self {
        let mut visited = HashSet::new();
        visited.insert(start.pos);
        grid.try_set(start.pos, Cell::Visited);
        Self {
            grid,
            guard: start,
            visited,
            turn_events: 0,
            monitor,
            outcome: None,
        }
    }

    /// Current guard state.
    #[must_use]
    pub const fn guard(&self) -> GuardState {
        self.guard
    }

    /// Advance by exactly one primitive action.
    ///
    /// Per step: probe the tile ahead; past the edge terminates with
    /// [`StepEvent::Exited`]; a blocking tile asks the monitor about the
    /// pre-turn state (a repeat terminates with [`StepEvent::Looped`] without
    /// turning again) and otherwise rotates right in place; a free tile is
    /// visited and becomes the new position. Calling again after a terminal
    /// event returns that event unchanged.
    pub fn step(&mut self) -> StepEvent {
        if let Some(outcome) = self.outcome {
            return match outcome {
                PatrolOutcome::Exited => StepEvent::Exited,
                PatrolOutcome::Looping => StepEvent::Looped,
            };
        }
        let next = self.guard.pos.stepped(self.guard.facing);
        match self.grid.get(next) {
            None => {
                self.outcome = Some(PatrolOutcome::Exited);
                StepEvent::Exited
            }
            Some(cell) if cell.blocks() => {
                if self.monitor.observe_turn(self.guard) {
                    self.outcome = Some(PatrolOutcome::Looping);
                    return StepEvent::Looped;
                }
                self.turn_events += 1;
                self.guard.facing = self.guard.facing.turned_right();
                StepEvent::Turned
            }
            Some(_) => {
                self.visited.insert(next);
                self.grid.try_set(next, Cell::Visited);
                self.guard.pos = next;
                StepEvent::Moved
            }
        }
    }

    /// Drive the walk to a terminal event and hand back the summary.
    pub fn run(mut self) -> PatrolSummary {
        let outcome = loop {
            match self.step() {
                StepEvent::Exited => break PatrolOutcome::Exited,
                StepEvent::Looped => break PatrolOutcome::Looping,
                StepEvent::Moved | StepEvent::Turned => {}
            }
        };
        PatrolSummary {
            outcome,
            visited: self.visited,
            turn_events: self.turn_events,
            grid: self.grid,
        }
    }
}

/// Artifact of one finished walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatrolSummary {
    outcome: PatrolOutcome,
    visited: HashSet<GridPos>,
    turn_events: usize,
    grid: PatrolGrid,
}

impl PatrolSummary {
    /// Terminal outcome of the walk.
    #[must_use]
    pub const fn outcome(&self) -> PatrolOutcome {
        self.outcome
    }

    /// Distinct tiles the guard occupied, start tile included.
    #[must_use]
    pub fn visited(&self) -> &HashSet<GridPos> {
        &self.visited
    }

    /// Size of the visited set.
    #[must_use]
    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Rotations performed before termination.
    #[must_use]
    pub const fn turn_events(&self) -> usize {
        self.turn_events
    }

    /// The walked grid with every visited tile painted.
    #[must_use]
    pub fn route(&self) -> &PatrolGrid {
        &self.grid
    }

    /// Take ownership of the visited set (the obstruction-search candidate
    /// universe).
    #[must_use]
    pub fn into_visited(self) -> HashSet<GridPos> {
        self.visited
    }

    /// Take ownership of the walked grid.
    #[must_use]
    pub fn into_route(self) -> PatrolGrid {
        self.grid
    }
}

/// Counts single-tile obstruction placements that trap the guard in a cycle.
///
/// Borrows the canonical grid immutably; every candidate evaluation walks a
/// private clone with its own fresh detector, so evaluations are independent
/// and safe to run concurrently. Candidates come from the baseline visited
/// set: a tile the guard never reaches cannot be the first obstruction
/// encountered on any prefix of the original path, and the search is defined
/// relative to the original start state.
#[derive(Debug, Clone, Copy)]
pub struct ObstructionSearch<'a> {
    grid: &'a PatrolGrid,
    start: GuardState,
}

impl<'a> ObstructionSearch<'a> {
    /// Search over `grid` with walks replayed from `start`.
    #[must_use]
    pub const fn new(grid: &'a PatrolGrid, start: GuardState) -> Self {
        Self { grid, start }
    }

    /// Evaluate one candidate: plant a hypothetical obstruction on a private
    /// clone and replay the walk with a fresh detector. An out-of-bounds
    /// candidate is a caller defect and propagates.
    pub fn induces_loop(&self, candidate: GridPos) -> Result<bool, PatrolError> {
        let mut grid = self.grid.clone();
        grid.must_set(candidate, Cell::Hypothetical)?;
        let summary = Patrol::with_monitor(grid, self.start, LoopDetector::new()).run();
        Ok(summary.outcome() == PatrolOutcome::Looping)
    }

    /// Count the candidates whose obstruction forces a Looping outcome. The
    /// start tile is excluded from the universe: placing an obstruction on
    /// the guard's own tile is undefined. Candidates are dispatched across
    /// the rayon pool and combined with an order-independent sum; the first
    /// defect short-circuits the whole search.
    pub fn count_looping(&self, candidates: &HashSet<GridPos>) -> Result<usize, PatrolError> {
        candidates
            .par_iter()
            .filter(|pos| **pos != self.start.pos)
            .map(|pos| self.induces_loop(*pos).map(usize::from))
            .try_reduce(|| 0, |a, b| Ok(a + b))
    }
}

/// The two published counts for one patrol map.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatrolReport {
    /// Distinct tiles the baseline walk visits, start tile included.
    pub visited_tiles: usize,
    /// Obstruction placements that trap the guard in a cycle.
    pub looping_obstructions: usize,
}

impl PatrolReport {
    /// Run the baseline walk and the obstruction search over `grid`.
    ///
    /// The canonical grid is never mutated: the baseline walks a clone and
    /// the search clones again per candidate. The baseline runs under a
    /// detector, so a grid whose patrol never exits still yields a finite
    /// report: once a state repeats, the visited set is already complete.
    pub fn from_grid(grid: &PatrolGrid) -> Result<Self, PatrolError> {
        let start = grid.guard_start()?;
        let baseline = Patrol::with_monitor(grid.clone(), start, LoopDetector::new()).run();
        let looping_obstructions =
            ObstructionSearch::new(grid, start).count_looping(baseline.visited())?;
        Ok(Self {
            visited_tiles: baseline.visited_count(),
            looping_obstructions,
        })
    }

    /// Parse `input` and report on it.
    pub fn from_input(input: &str) -> Result<Self, PatrolError> {
        Self::from_grid(&PatrolGrid::parse(input)?)
    }
}
