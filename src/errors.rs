// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The error taxonomy shared by every stage of a render.  Structural
//! and parameter errors are raised once, before any worker starts;
//! per-point numeric trouble is never an error (see `engine`).

use failure::Fail;
use std::io;

use crate::planes::Shape;

/// Everything that can stop a grid build, a schedule build, or an
/// engine run.
#[derive(Debug, Fail)]
pub enum QuantumJuliaError {
    /// Non-positive pixel dimensions or a non-positive zoom.
    #[fail(display = "invalid geometry: {}", reason)]
    InvalidGeometry {
        /// What was wrong with the viewport.
        reason: String,
    },

    /// A qubit count below one, or too large to allocate a
    /// coefficient vector for.
    #[fail(display = "invalid qubit count {}: must be between 1 and {}", qubits, max)]
    InvalidQubitCount {
        /// The rejected count.
        qubits: u32,
        /// The largest count accepted.
        max: u32,
    },

    /// The coefficient vector is shorter than the map requires.
    #[fail(
        display = "coefficient vector too short: expected at least {}, got {}",
        expected, actual
    )]
    CoefficientLengthMismatch {
        /// Minimum length the map indexes into.
        expected: usize,
        /// Length that was supplied.
        actual: usize,
    },

    /// The grid, mask and divergence buffers of one run disagree.
    #[fail(display = "shape mismatch: expected {}, got {}", expected, actual)]
    ShapeMismatch {
        /// Shape of the sample grid.
        expected: Shape,
        /// Shape of the offending buffer.
        actual: Shape,
    },

    /// An iteration budget or escape radius that cannot drive a run.
    #[fail(display = "invalid parameter: {}", reason)]
    InvalidParameter {
        /// What was wrong with the parameter.
        reason: String,
    },

    /// A case-insensitive name did not match any known variant.
    #[fail(display = "unknown {} '{}'", kind, value)]
    UnknownSelection {
        /// The family being selected from ("map", "rotation").
        kind: &'static str,
        /// The rejected input.
        value: String,
    },

    /// The caller raised the cancellation flag before the run finished.
    /// Whatever the workers wrote so far must be thrown away.
    #[fail(display = "run cancelled")]
    Cancelled,

    /// A worker thread panicked; the run's buffers are unusable.
    #[fail(display = "a worker thread panicked")]
    WorkerPanicked,

    /// Writing rendered output failed.
    #[fail(display = "i/o error: {}", _0)]
    Io(#[cause] io::Error),
}

impl From<io::Error> for QuantumJuliaError {
    fn from(err: io::Error) -> Self {
        QuantumJuliaError::Io(err)
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, QuantumJuliaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offending_values() {
        let err = QuantumJuliaError::CoefficientLengthMismatch {
            expected: 4,
            actual: 2,
        };
        assert_eq!(
            err.to_string(),
            "coefficient vector too short: expected at least 4, got 2"
        );

        let err = QuantumJuliaError::ShapeMismatch {
            expected: Shape::new(10, 20),
            actual: Shape::new(20, 10),
        };
        assert_eq!(err.to_string(), "shape mismatch: expected 10x20, got 20x10");
    }

    #[test]
    fn io_errors_convert() {
        let err: QuantumJuliaError = io::Error::new(io::ErrorKind::Other, "disk full").into();
        match err {
            QuantumJuliaError::Io(_) => {}
            other => panic!("unexpected variant {:?}", other),
        }
    }
}
