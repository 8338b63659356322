#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Quantum Julia renderer
//!
//! A one-qubit statevector `(a, b)` gives the classical Julia map
//! `z -> z^2 + c` a constant to play with.  Larger statevectors go
//! further: the `2^n` amplitudes of an `n`-qubit state become the
//! coefficients of a rational map whose numerator is built from the
//! even amplitudes and whose denominator is built from the odd ones,
//! a "mating" of two polynomial Julia maps of degree `2^(n-1)`.
//!
//! This crate is the numerical heart of rendering those maps.  A
//! `Viewport` is sampled into a grid of complex points; every point is
//! iterated under the map until it leaves a disc of fixed radius, and
//! the iteration at which it left is written into a divergence grid
//! that a renderer turns into colour.  The statevector itself comes
//! from outside, through `CoefficientSource`.
//!
//! Points never talk to each other, so the grid is cut into row chunks
//! and spread over a pool of scoped threads.  The output does not
//! depend on how it was cut.

extern crate crossbeam;
extern crate itertools;
extern crate num;
extern crate num_cpus;

pub mod engine;
pub mod errors;
pub mod logging;
pub mod maps;
pub mod planes;
pub mod schedule;
pub mod session;
pub mod statevector;

pub use engine::{EscapeParams, EscapeResult, EscapeTimeEngine, RunStats};
pub use errors::{QuantumJuliaError, Result};
pub use maps::{
    FractalMap, MapKind, Quadratic, RationalMap, RationalPairA, RationalPairB, ScheduledMap,
};
pub use planes::{ConvergenceMask, DivergenceGrid, Grid, Pixel, Shape, Viewport};
pub use schedule::{CoefficientSchedule, ScheduleCache};
pub use session::Session;
pub use statevector::{CoefficientSource, FixedCoefficients, Rotate};
