//! The escape-time engine.
//!
//! Every grid point is iterated independently: apply the map, and the
//! first time the iterate's magnitude exceeds the escape radius, clear
//! the point's convergence flag and record the iteration index.  Points
//! that never escape keep the `max_iterations - 1` sentinel their
//! divergence entry was filled with.
//!
//! An iterate whose magnitude is not finite (a zero denominator, or
//! overflow) counts as escaping at that index.  Those escapes are
//! tallied in `RunStats::non_finite` and reported once per run.
//!
//! For threading, the grid and its two output buffers are cut into
//! matching runs of whole rows.  Workers pull chunks from a shared
//! queue; each chunk's output slices belong to exactly one worker, so
//! the result is the same whatever the thread count or chunk size.

use std::ops::AddAssign;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam::thread::ScopedJoinHandle;
use num::complex::Complex64;
use tracing::{debug, warn};

use crate::errors::{QuantumJuliaError, Result};
use crate::maps::{FractalMap, RationalMap, ScheduledMap};
use crate::planes::{
    build_convergence_mask, build_divergence_grid, ConvergenceMask, DivergenceGrid, Grid,
};
use crate::schedule::CoefficientSchedule;

/// Iteration budget and escape threshold for one run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EscapeParams {
    /// Iterations attempted per point before giving up.
    pub max_iterations: u32,
    /// A point escapes once its magnitude is strictly greater than this.
    pub escape_radius: f64,
}

impl Default for EscapeParams {
    fn default() -> Self {
        EscapeParams {
            max_iterations: 100,
            escape_radius: 2.0,
        }
    }
}

impl EscapeParams {
    /// Validated constructor.
    pub fn new(max_iterations: u32, escape_radius: f64) -> Result<Self> {
        let params = EscapeParams {
            max_iterations,
            escape_radius,
        };
        params.validate()?;
        Ok(params)
    }

    /// Requires at least one iteration and a positive, finite radius.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(QuantumJuliaError::InvalidParameter {
                reason: "max_iterations must be at least 1".to_string(),
            });
        }
        if !(self.escape_radius.is_finite() && self.escape_radius > 0.0) {
            return Err(QuantumJuliaError::InvalidParameter {
                reason: format!(
                    "escape_radius must be positive and finite, got {}",
                    self.escape_radius
                ),
            });
        }
        Ok(())
    }

    /// Divergence value of a point that never escaped.
    pub fn sentinel(&self) -> u32 {
        self.max_iterations.saturating_sub(1)
    }
}

/// Tallies for one run.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Points visited, including ones that had escaped before the run.
    pub points: usize,
    /// Points that escaped during this run.
    pub escaped: usize,
    /// Of those, points whose escaping iterate was not finite.
    pub non_finite: usize,
}

impl AddAssign for RunStats {
    fn add_assign(&mut self, other: RunStats) {
        self.points += other.points;
        self.escaped += other.escaped;
        self.non_finite += other.non_finite;
    }
}

/// The buffers of a finished run, handed over to whoever renders them.
#[derive(Clone, Debug)]
pub struct EscapeResult {
    /// Escape index per point, or the sentinel.
    pub divergence: DivergenceGrid,
    /// `true` for points that never escaped.
    pub converging: ConvergenceMask,
    /// Tallies of the run.
    pub stats: RunStats,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Fate {
    AlreadyEscaped,
    Survived,
    Escaped,
    EscapedNonFinite,
}

/// Runs one point to escape or to the end of its budget.
fn escape_point<M: RationalMap>(
    map: &M,
    params: &EscapeParams,
    start: Complex64,
    converging: &mut bool,
    divergence: &mut u32,
) -> Fate {
    if !*converging {
        return Fate::AlreadyEscaped;
    }
    let mut z = start;
    for j in 0..params.max_iterations {
        z = map.apply(z);
        let magnitude = z.norm();
        if !magnitude.is_finite() {
            *converging = false;
            *divergence = j;
            return Fate::EscapedNonFinite;
        }
        if magnitude > params.escape_radius {
            *converging = false;
            *divergence = j;
            return Fate::Escaped;
        }
    }
    Fate::Survived
}

fn iterate_chunk<M: RationalMap>(
    map: &M,
    params: &EscapeParams,
    points: &[Complex64],
    converging: &mut [bool],
    divergence: &mut [u32],
) -> RunStats {
    let mut stats = RunStats::default();
    for ((start, flag), div) in points
        .iter()
        .zip(converging.iter_mut())
        .zip(divergence.iter_mut())
    {
        stats.points += 1;
        match escape_point(map, params, *start, flag, div) {
            Fate::Escaped => stats.escaped += 1,
            Fate::EscapedNonFinite => {
                stats.escaped += 1;
                stats.non_finite += 1;
            }
            Fate::AlreadyEscaped | Fate::Survived => {}
        }
    }
    stats
}

type Chunk<'a> = (&'a [Complex64], &'a mut [bool], &'a mut [u32]);
type ChunkQueue<'a> = Arc<Mutex<std::vec::IntoIter<Chunk<'a>>>>;

/// Iterates rational maps over grids, optionally across a pool of
/// scoped worker threads.
#[derive(Clone, Debug)]
pub struct EscapeTimeEngine {
    params: EscapeParams,
    threads: usize,
    rows_per_chunk: usize,
    cancel: Option<Arc<AtomicBool>>,
}

impl EscapeTimeEngine {
    /// An engine using every available core, one row per chunk.
    pub fn new(params: EscapeParams) -> Result<Self> {
        params.validate()?;
        Ok(EscapeTimeEngine {
            params,
            threads: num_cpus::get(),
            rows_per_chunk: 1,
            cancel: None,
        })
    }

    /// Worker count; `1` runs on the calling thread.
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Rows handed to a worker at a time.
    pub fn with_rows_per_chunk(mut self, rows: usize) -> Self {
        self.rows_per_chunk = rows.max(1);
        self
    }

    /// A flag polled before every chunk.  Once raised, the run stops
    /// with `Cancelled` and its buffers must be discarded.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Iteration budget and escape radius.
    pub fn params(&self) -> &EscapeParams {
        &self.params
    }

    /// Worker count.
    pub fn threads(&self) -> usize {
        self.threads
    }

    fn check_shapes(
        grid: &Grid,
        converging: &ConvergenceMask,
        divergence: &DivergenceGrid,
    ) -> Result<()> {
        let expected = grid.shape();
        for actual in &[converging.shape(), divergence.shape()] {
            if *actual != expected {
                return Err(QuantumJuliaError::ShapeMismatch {
                    expected,
                    actual: *actual,
                });
            }
        }
        Ok(())
    }

    /// Iterates `map` over every point of `grid`, updating `converging`
    /// and `divergence` in place.  Nothing is written unless the shapes
    /// agree.
    pub fn iterate<M: RationalMap>(
        &self,
        map: &M,
        grid: &Grid,
        converging: &mut ConvergenceMask,
        divergence: &mut DivergenceGrid,
    ) -> Result<RunStats> {
        Self::check_shapes(grid, converging, divergence)?;
        let shape = grid.shape();
        let chunk_len = (shape.width * self.rows_per_chunk).max(1);

        let chunks: Vec<Chunk<'_>> = grid
            .as_slice()
            .chunks(chunk_len)
            .zip(converging.as_mut_slice().chunks_mut(chunk_len))
            .zip(divergence.as_mut_slice().chunks_mut(chunk_len))
            .map(|((points, flags), divs)| (points, flags, divs))
            .collect();
        let workers = self.threads.min(chunks.len()).max(1);
        debug!(
            shape = %shape,
            chunks = chunks.len(),
            workers = workers,
            max_iterations = self.params.max_iterations,
            "starting escape-time run"
        );

        let stats = if workers == 1 {
            self.run_sequential(map, chunks)?
        } else {
            self.run_threaded(map, chunks, workers)?
        };

        debug!(
            points = stats.points,
            escaped = stats.escaped,
            "finished escape-time run"
        );
        if stats.non_finite > 0 {
            warn!(
                non_finite = stats.non_finite,
                "points escaped through a non-finite iterate"
            );
        }
        Ok(stats)
    }

    fn is_cancelled(&self) -> bool {
        match &self.cancel {
            Some(flag) => flag.load(Ordering::Relaxed),
            None => false,
        }
    }

    fn run_sequential<M: RationalMap>(&self, map: &M, chunks: Vec<Chunk<'_>>) -> Result<RunStats> {
        let mut stats = RunStats::default();
        for (points, flags, divs) in chunks {
            if self.is_cancelled() {
                return Err(QuantumJuliaError::Cancelled);
            }
            stats += iterate_chunk(map, &self.params, points, flags, divs);
        }
        Ok(stats)
    }

    fn run_threaded<M: RationalMap>(
        &self,
        map: &M,
        chunks: Vec<Chunk<'_>>,
        workers: usize,
    ) -> Result<RunStats> {
        let queue: ChunkQueue<'_> = Arc::new(Mutex::new(chunks.into_iter()));
        let outcomes = crossbeam::scope(|spawner| {
            let handles: Vec<ScopedJoinHandle<'_, Result<RunStats>>> = (0..workers)
                .map(|_| {
                    let queue = queue.clone();
                    spawner.spawn(move |_| {
                        let mut stats = RunStats::default();
                        loop {
                            if self.is_cancelled() {
                                return Err(QuantumJuliaError::Cancelled);
                            }
                            let chunk = { queue.lock().ok().and_then(|mut rest| rest.next()) };
                            match chunk {
                                Some((points, flags, divs)) => {
                                    stats += iterate_chunk(map, &self.params, points, flags, divs);
                                }
                                None => {
                                    break;
                                }
                            }
                        }
                        Ok(stats)
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|handle| handle.join())
                .collect::<Vec<_>>()
        })
        .map_err(|_| QuantumJuliaError::WorkerPanicked)?;

        let mut stats = RunStats::default();
        for outcome in outcomes {
            stats += outcome.map_err(|_| QuantumJuliaError::WorkerPanicked)??;
        }
        Ok(stats)
    }

    /// The schedule-driven form of `iterate`: checks the coefficient
    /// vector against the schedule before touching any buffer.
    pub fn iterate_scheduled(
        &self,
        coefficients: &[Complex64],
        grid: &Grid,
        converging: &mut ConvergenceMask,
        divergence: &mut DivergenceGrid,
        schedule: &CoefficientSchedule,
    ) -> Result<RunStats> {
        let map = ScheduledMap::new(schedule, coefficients)?;
        self.iterate(&map, grid, converging, divergence)
    }

    /// Dispatches on the bound map once, then iterates the concrete type.
    pub fn iterate_map(
        &self,
        map: &FractalMap<'_>,
        grid: &Grid,
        converging: &mut ConvergenceMask,
        divergence: &mut DivergenceGrid,
    ) -> Result<RunStats> {
        match map {
            FractalMap::General(m) => self.iterate(m, grid, converging, divergence),
            FractalMap::Quadratic(m) => self.iterate(m, grid, converging, divergence),
            FractalMap::PairA(m) => self.iterate(m, grid, converging, divergence),
            FractalMap::PairB(m) => self.iterate(m, grid, converging, divergence),
        }
    }

    /// Allocates fresh buffers for `grid`, runs `map` over them and
    /// hands them back.  On error the buffers are dropped.
    pub fn render(&self, map: &FractalMap<'_>, grid: &Grid) -> Result<EscapeResult> {
        let shape = grid.shape();
        let mut converging = build_convergence_mask(shape);
        let mut divergence = build_divergence_grid(shape, self.params.max_iterations)?;
        let stats = self.iterate_map(map, grid, &mut converging, &mut divergence)?;
        Ok(EscapeResult {
            divergence,
            converging,
            stats,
        })
    }
}

/// Replays a single point outside of any grid: the divergence value it
/// would be given and whether it is still converging.
pub fn escape_time<M: RationalMap>(map: &M, params: &EscapeParams, start: Complex64) -> (u32, bool) {
    let mut converging = true;
    let mut divergence = params.sentinel();
    escape_point(map, params, start, &mut converging, &mut divergence);
    (divergence, converging)
}
