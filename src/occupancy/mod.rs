//! # Occupancy
//!
//! A probabilistic occupancy layer stored in a sparse [`VoxelGrid`].
//!
//! Each cell keeps its occupancy as an integer log-odds value, scaled by
//! [`LOG_ODDS_SCALE`], together with the number of observations folded into
//! it. Cells never observed stay default and cost nothing.
//!
//! | Log-odds | Probability |
//! |----------|-------------|
//! | -2.0     | ~12%        |
//! | 0.0      | 50%         |
//! | 0.85     | ~70%        |
//! | 3.5      | ~97%        |

use std::collections::HashSet;

use bytemuck::{Pod, Zeroable};
use cgmath::{InnerSpace, Point3};
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::error::GridError;
use crate::voxels::coord::Coord;
use crate::voxels::grid::VoxelGrid;

mod ray;

pub use ray::CellLine;

/// Fixed-point scale applied to log-odds before they are stored.
pub const LOG_ODDS_SCALE: f64 = 1e6;

/// One occupancy cell.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct OccupancyCell {
    /// Log-odds of occupancy, scaled by [`LOG_ODDS_SCALE`].
    pub log_odds: i32,
    /// Number of hit and miss updates applied.
    pub observations: u32,
}

/// Sensor model parameters, as probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OccupancyOptions {
    /// Probability that a cell holding a ray endpoint is occupied.
    pub prob_hit: f64,
    /// Probability that a cell crossed by a ray is occupied.
    pub prob_miss: f64,
    /// Lower bound on a cell's probability.
    pub clamp_min: f64,
    /// Upper bound on a cell's probability.
    pub clamp_max: f64,
    /// Cells above this probability are occupied, below it free.
    pub occupancy_threshold: f64,
}

impl Default for OccupancyOptions {
    fn default() -> Self {
        OccupancyOptions {
            prob_hit: 0.7,
            prob_miss: 0.4,
            clamp_min: 0.12,
            clamp_max: 0.97,
            occupancy_threshold: 0.5,
        }
    }
}

impl OccupancyOptions {
    /// Checks that the options describe a usable sensor model.
    ///
    /// Every probability must lie strictly between 0 and 1, a hit must raise
    /// occupancy and a miss lower it, and the clamp range must not be inverted.
    ///
    /// # Errors
    /// Returns [`GridError::InvalidOptions`] naming the violated constraint.
    pub fn validate(&self) -> Result<(), GridError> {
        let probabilities = [
            ("prob_hit", self.prob_hit),
            ("prob_miss", self.prob_miss),
            ("clamp_min", self.clamp_min),
            ("clamp_max", self.clamp_max),
            ("occupancy_threshold", self.occupancy_threshold),
        ];
        for (name, p) in probabilities {
            if !(p > 0.0 && p < 1.0) {
                return Err(invalid_options(format!("{} must lie in (0, 1), got {}", name, p)));
            }
        }
        if self.clamp_min > self.clamp_max {
            return Err(invalid_options(format!(
                "clamp_min {} exceeds clamp_max {}",
                self.clamp_min, self.clamp_max
            )));
        }
        if self.prob_hit <= 0.5 {
            return Err(invalid_options(format!("prob_hit must exceed 0.5, got {}", self.prob_hit)));
        }
        if self.prob_miss >= 0.5 {
            return Err(invalid_options(format!("prob_miss must be below 0.5, got {}", self.prob_miss)));
        }
        Ok(())
    }
}

fn invalid_options(reason: String) -> GridError {
    GridError::InvalidOptions { reason }
}

/// Options converted to scaled log-odds once, at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LogOddsModel {
    hit: i32,
    miss: i32,
    min: i32,
    max: i32,
    threshold: i32,
}

impl LogOddsModel {
    fn from_options(options: &OccupancyOptions) -> Self {
        LogOddsModel {
            hit: probability_to_log_odds(options.prob_hit),
            miss: probability_to_log_odds(options.prob_miss),
            min: probability_to_log_odds(options.clamp_min),
            max: probability_to_log_odds(options.clamp_max),
            threshold: probability_to_log_odds(options.occupancy_threshold),
        }
    }
}

/// Converts a probability to scaled log-odds.
///
/// The probability is clamped away from 0 and 1 to keep the result finite.
pub fn probability_to_log_odds(probability: f64) -> i32 {
    let p = probability.clamp(0.001, 0.999);
    ((p / (1.0 - p)).ln() * LOG_ODDS_SCALE).round() as i32
}

/// Converts scaled log-odds back to a probability.
pub fn log_odds_to_probability(log_odds: i32) -> f64 {
    1.0 / (1.0 + (-f64::from(log_odds) / LOG_ODDS_SCALE).exp())
}

/// A probabilistic occupancy map backed by a sparse voxel grid.
///
/// # Examples
///
/// ```
/// use cgmath::Point3;
/// use sparse_voxel_grid::OccupancyMap;
///
/// let mut map = OccupancyMap::new(0.1);
/// let origin = Point3::new(0.05, 0.05, 0.05);
/// map.insert_point_cloud(origin, &[Point3::new(1.05, 0.05, 0.05)], 10.0).unwrap();
///
/// assert!(map.is_occupied(Point3::new(10, 0, 0)));
/// assert!(map.is_free(Point3::new(5, 0, 0)));
/// assert!(map.is_unknown(Point3::new(0, 5, 0)));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyMap {
    grid: VoxelGrid<OccupancyCell>,
    options: OccupancyOptions,
    model: LogOddsModel,
}

impl OccupancyMap {
    /// Creates an empty map with default sensor options.
    pub fn new(resolution: f64) -> Self {
        Self::from_parts(VoxelGrid::new(resolution), OccupancyOptions::default())
    }

    /// Wraps an existing grid, e.g. one read back with
    /// [`deserialize`](crate::serialization::deserialize).
    ///
    /// # Arguments
    /// * `grid` - The cells to start from
    /// * `options` - The sensor model applied to later updates
    ///
    /// # Errors
    /// Returns [`GridError::InvalidOptions`] if `options` fail
    /// [`OccupancyOptions::validate`].
    pub fn with_options(grid: VoxelGrid<OccupancyCell>, options: OccupancyOptions) -> Result<Self, GridError> {
        options.validate()?;
        Ok(Self::from_parts(grid, options))
    }

    fn from_parts(grid: VoxelGrid<OccupancyCell>, options: OccupancyOptions) -> Self {
        let model = LogOddsModel::from_options(&options);
        debug!("occupancy model: {:?}", model);
        OccupancyMap { grid, options, model }
    }

    /// The sensor options.
    pub fn options(&self) -> &OccupancyOptions {
        &self.options
    }

    /// The underlying grid.
    pub fn grid(&self) -> &VoxelGrid<OccupancyCell> {
        &self.grid
    }

    /// Consumes the map, returning the underlying grid.
    pub fn into_grid(self) -> VoxelGrid<OccupancyCell> {
        self.grid
    }

    /// Returns the raw cell at `coord`; default if never observed.
    pub fn cell(&self, coord: Coord) -> OccupancyCell {
        self.grid.get(coord)
    }

    /// Records an occupied observation.
    ///
    /// # Errors
    /// Returns [`GridError::OutOfBounds`] if `coord` lies outside the grid.
    pub fn add_hit(&mut self, coord: Coord) -> Result<(), GridError> {
        self.update(coord, self.model.hit)
    }

    /// Records a free observation.
    ///
    /// # Errors
    /// Returns [`GridError::OutOfBounds`] if `coord` lies outside the grid.
    pub fn add_miss(&mut self, coord: Coord) -> Result<(), GridError> {
        self.update(coord, self.model.miss)
    }

    fn update(&mut self, coord: Coord, delta: i32) -> Result<(), GridError> {
        let cell = self.grid.get(coord);
        let updated = OccupancyCell {
            log_odds: cell.log_odds.saturating_add(delta).clamp(self.model.min, self.model.max),
            observations: cell.observations.saturating_add(1),
        };
        self.grid.set(coord, updated)?;
        Ok(())
    }

    /// Integrates one sensor scan taken from `origin`.
    ///
    /// Every cell a ray crosses receives a miss and the cell holding the
    /// endpoint a hit. A point farther than `max_range` only clears cells up to
    /// that range. Each cell is updated at most once per scan and a hit wins
    /// over a miss. Rays are clipped to the grid extent before they are walked,
    /// so endpoints outside it give no hit, and non-finite points are skipped.
    ///
    /// # Errors
    /// Returns [`GridError`] if a cell update fails.
    pub fn insert_point_cloud(
        &mut self,
        origin: Point3<f64>,
        points: &[Point3<f64>],
        max_range: f64,
    ) -> Result<(), GridError> {
        let layout = self.grid.layout();
        let half_extent = layout.half_extent() as f64;
        let inv_resolution = 1.0 / self.grid.resolution();
        let to_cells = |p: Point3<f64>| [p.x * inv_resolution, p.y * inv_resolution, p.z * inv_resolution];
        let start = to_cells(origin);

        let mut hits: HashSet<Coord> = HashSet::new();
        let mut misses: HashSet<Coord> = HashSet::new();
        let mut skipped = 0usize;

        for point in points {
            let ray = point - origin;
            let distance = ray.magnitude();
            if !distance.is_finite() {
                continue;
            }

            let (end, hit) = if distance > max_range {
                (origin + ray * (max_range / distance), None)
            } else {
                let hit = self.grid.world_to_coord(*point).filter(|cell| layout.contains(*cell));
                if hit.is_none() {
                    skipped += 1;
                }
                (*point, hit)
            };

            let Some((from, to)) = clip_segment(start, to_cells(end), -half_extent, half_extent) else {
                continue;
            };
            let line = CellLine::new(clamped_cell(from, half_extent), clamped_cell(to, half_extent));
            misses.extend(line.filter(|cell| Some(*cell) != hit));
            hits.extend(hit);
        }

        for cell in misses.iter().filter(|cell| !hits.contains(*cell)) {
            self.add_miss(*cell)?;
        }
        for cell in &hits {
            self.add_hit(*cell)?;
        }

        trace!("scan of {} points: {} hits, {} misses", points.len(), hits.len(), misses.len());
        if skipped > 0 {
            debug!("scan skipped {} endpoints outside the grid extent", skipped);
        }
        Ok(())
    }

    /// The occupancy probability at `coord`; 0.5 if never observed.
    pub fn probability(&self, coord: Coord) -> f64 {
        log_odds_to_probability(self.grid.get(coord).log_odds)
    }

    /// Whether `coord` was observed and lies above the threshold.
    pub fn is_occupied(&self, coord: Coord) -> bool {
        let cell = self.grid.get(coord);
        cell.observations > 0 && cell.log_odds > self.model.threshold
    }

    /// Whether `coord` was observed and lies below the threshold.
    pub fn is_free(&self, coord: Coord) -> bool {
        let cell = self.grid.get(coord);
        cell.observations > 0 && cell.log_odds < self.model.threshold
    }

    /// Whether `coord` has never been observed.
    pub fn is_unknown(&self, coord: Coord) -> bool {
        self.grid.get(coord).observations == 0
    }

    /// Iterates over the occupied cells.
    pub fn occupied_cells(&self) -> impl Iterator<Item = Coord> + '_ {
        let threshold = self.model.threshold;
        self.grid
            .iter()
            .filter(move |(_, cell)| cell.log_odds > threshold)
            .map(|(coord, _)| coord)
    }

    /// Iterates over the free cells.
    pub fn free_cells(&self) -> impl Iterator<Item = Coord> + '_ {
        let threshold = self.model.threshold;
        self.grid
            .iter()
            .filter(move |(_, cell)| cell.log_odds < threshold)
            .map(|(coord, _)| coord)
    }

    /// Forgets every observation.
    pub fn clear(&mut self) {
        self.grid.clear();
    }
}

/// Clips the segment `a..b` to the cube `[lo, hi]` on every axis.
///
/// # Returns
/// The clipped endpoints, or `None` if the segment misses the cube.
fn clip_segment(a: [f64; 3], b: [f64; 3], lo: f64, hi: f64) -> Option<([f64; 3], [f64; 3])> {
    let mut t_enter = 0.0f64;
    let mut t_exit = 1.0f64;
    for axis in 0..3 {
        let delta = b[axis] - a[axis];
        if delta == 0.0 {
            if a[axis] < lo || a[axis] > hi {
                return None;
            }
            continue;
        }
        let t_lo = (lo - a[axis]) / delta;
        let t_hi = (hi - a[axis]) / delta;
        t_enter = t_enter.max(t_lo.min(t_hi));
        t_exit = t_exit.min(t_lo.max(t_hi));
        if t_enter > t_exit {
            return None;
        }
    }
    let at = |t: f64| [a[0] + (b[0] - a[0]) * t, a[1] + (b[1] - a[1]) * t, a[2] + (b[2] - a[2]) * t];
    Some((at(t_enter), at(t_exit)))
}

/// The cell holding a point already clipped to the extent.
fn clamped_cell(p: [f64; 3], half_extent: f64) -> Coord {
    let axis = |v: f64| v.floor().clamp(-half_extent, half_extent - 1.0) as i32;
    Point3::new(axis(p[0]), axis(p[1]), axis(p[2]))
}
