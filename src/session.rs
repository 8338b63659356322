//! A rendering session: one viewport, one qubit count, many frames.
//! The grid is rebuilt only when the viewport changes and schedules
//! come out of a cache, so a frame costs one engine run plus two fresh
//! output buffers.

use std::sync::Arc;

use tracing::debug;

use crate::engine::{EscapeParams, EscapeResult, EscapeTimeEngine};
use crate::errors::Result;
use crate::maps::MapKind;
use crate::planes::{Grid, Viewport};
use crate::schedule::{CoefficientSchedule, ScheduleCache};
use crate::statevector::CoefficientSource;

/// The state carried between frames of one animation.
pub struct Session {
    viewport: Viewport,
    grid: Grid,
    kind: MapKind,
    qubits: u32,
    power_offset: u32,
    schedules: ScheduleCache,
    schedule: Arc<CoefficientSchedule>,
    engine: EscapeTimeEngine,
}

impl Session {
    /// Builds the grid and the schedule up front, so a bad viewport or
    /// qubit count fails here rather than on the first frame.
    pub fn new(
        viewport: Viewport,
        kind: MapKind,
        qubits: u32,
        power_offset: u32,
        engine: EscapeTimeEngine,
    ) -> Result<Self> {
        let grid = viewport.build_grid()?;
        let schedules = ScheduleCache::new();
        let schedule = schedules.get(qubits, power_offset)?;
        Ok(Session {
            viewport,
            grid,
            kind,
            qubits,
            power_offset,
            schedules,
            schedule,
            engine,
        })
    }

    /// The current window.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Sample points of the current window.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Schedule for the current qubit count and power offset.
    pub fn schedule(&self) -> &CoefficientSchedule {
        &self.schedule
    }

    /// Iteration budget and escape radius of every frame.
    pub fn params(&self) -> &EscapeParams {
        self.engine.params()
    }

    /// Moves or zooms the window.  The grid is only rebuilt when the
    /// viewport actually differs; an invalid viewport leaves the
    /// session untouched.
    pub fn set_viewport(&mut self, viewport: Viewport) -> Result<()> {
        if viewport == self.viewport {
            return Ok(());
        }
        let grid = viewport.build_grid()?;
        debug!(shape = %grid.shape(), zoom = viewport.zoom, "rebuilt sample grid");
        self.viewport = viewport;
        self.grid = grid;
        Ok(())
    }

    /// Switches the general map's degree.  On error the previous
    /// schedule stays in place.
    pub fn set_qubits(&mut self, qubits: u32, power_offset: u32) -> Result<()> {
        self.schedule = self.schedules.get(qubits, power_offset)?;
        self.qubits = qubits;
        self.power_offset = power_offset;
        Ok(())
    }

    /// Switches the map family for later frames.
    pub fn set_map_kind(&mut self, kind: MapKind) {
        self.kind = kind;
    }

    /// Renders one frame with coefficients pulled from `source`.
    pub fn render_frame<S: CoefficientSource + ?Sized>(
        &self,
        source: &S,
        frame: usize,
    ) -> Result<EscapeResult> {
        let coefficients = source.coefficients(frame)?;
        let map = self.kind.bind(&self.schedule, &coefficients)?;
        debug!(
            frame = frame,
            qubits = self.qubits,
            power_offset = self.power_offset,
            "rendering frame"
        );
        self.engine.render(&map, &self.grid)
    }
}
