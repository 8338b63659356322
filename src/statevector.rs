//! Where coefficient vectors come from.  Circuit simulation happens
//! elsewhere; this module holds the interface the engine is fed
//! through, and the small pure calculations that sit around it: which
//! qubits a frame rotates, by how much, and how a one-qubit statevector
//! collapses to a single Julia constant.

use std::f64::consts::PI;
use std::str::FromStr;

use num::complex::Complex64;

use crate::errors::{QuantumJuliaError, Result};

/// Supplies one coefficient vector per animation frame.
pub trait CoefficientSource {
    /// Coefficients for `frame`, amplitude `i` at index `i`.
    fn coefficients(&self, frame: usize) -> Result<Vec<Complex64>>;
}

/// The same vector for every frame.
#[derive(Clone, Debug, PartialEq)]
pub struct FixedCoefficients(pub Vec<Complex64>);

impl CoefficientSource for FixedCoefficients {
    fn coefficients(&self, _frame: usize) -> Result<Vec<Complex64>> {
        Ok(self.0.clone())
    }
}

/// Which qubits receive the per-frame Rz rotation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Rotate {
    /// Qubit 0 only.
    First,
    /// The highest-numbered qubit only.
    Last,
    /// Every qubit.
    All,
}

impl Rotate {
    /// Qubit indices rotated in an `qubits`-qubit circuit.
    pub fn targets(self, qubits: usize) -> Vec<usize> {
        match self {
            Rotate::First => vec![0],
            Rotate::Last => vec![qubits.saturating_sub(1)],
            Rotate::All => (0..qubits.max(1)).collect(),
        }
    }
}

impl FromStr for Rotate {
    type Err = QuantumJuliaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "FIRST" => Ok(Rotate::First),
            "LAST" => Ok(Rotate::Last),
            "ALL" => Ok(Rotate::All),
            _ => Err(QuantumJuliaError::UnknownSelection {
                kind: "rotation",
                value: s.to_string(),
            }),
        }
    }
}

/// Rotation angle for `frame` out of `total_frames`: one full turn over
/// the whole animation.
pub fn frame_phase(frame: usize, total_frames: usize) -> Result<f64> {
    if total_frames == 0 {
        return Err(QuantumJuliaError::InvalidParameter {
            reason: "total_frames must be at least 1".to_string(),
        });
    }
    Ok(frame as f64 * 2.0 * PI / total_frames as f64)
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// The Julia constant of a one-qubit state, `sv[0] / sv[1]`, rounded to
/// two decimals.  Zero when `sv[1]` is exactly zero.
pub fn julia_constant(statevector: &[Complex64]) -> Result<Complex64> {
    if statevector.len() < 2 {
        return Err(QuantumJuliaError::CoefficientLengthMismatch {
            expected: 2,
            actual: statevector.len(),
        });
    }
    let (a, b) = (statevector[0], statevector[1]);
    if b.re == 0.0 && b.im == 0.0 {
        return Ok(Complex64::new(0.0, 0.0));
    }
    let ratio = a / b;
    Ok(Complex64::new(round2(ratio.re), round2(ratio.im)))
}

/// Parses `"re,im;re,im;..."` into a coefficient vector.
pub fn parse_coefficients(s: &str) -> Option<Vec<Complex64>> {
    s.split(';')
        .filter(|part| !part.trim().is_empty())
        .map(|part| {
            let mut halves = part.splitn(2, ',');
            let re = halves.next()?.trim().parse::<f64>().ok()?;
            let im = halves.next()?.trim().parse::<f64>().ok()?;
            Some(Complex64::new(re, im))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rotate_parses_in_any_case() {
        assert_eq!("first".parse::<Rotate>().unwrap(), Rotate::First);
        assert_eq!("LaSt".parse::<Rotate>().unwrap(), Rotate::Last);
        assert_eq!("ALL".parse::<Rotate>().unwrap(), Rotate::All);
        assert!("middle".parse::<Rotate>().is_err());
    }

    #[test]
    fn rotate_targets() {
        assert_eq!(Rotate::First.targets(3), vec![0]);
        assert_eq!(Rotate::Last.targets(3), vec![2]);
        assert_eq!(Rotate::All.targets(3), vec![0, 1, 2]);
    }

    #[test]
    fn phase_completes_one_turn() {
        assert_eq!(frame_phase(0, 60).unwrap(), 0.0);
        assert!((frame_phase(30, 60).unwrap() - PI).abs() < 1e-12);
        assert!((frame_phase(60, 60).unwrap() - 2.0 * PI).abs() < 1e-12);
        assert!(frame_phase(1, 0).is_err());
    }

    #[test]
    fn julia_constant_rounds_the_amplitude_ratio() {
        let h = std::f64::consts::FRAC_1_SQRT_2;
        let sv = [Complex64::new(h, 0.0), Complex64::new(0.0, h)];
        // 1 / i = -i
        assert_eq!(julia_constant(&sv).unwrap(), Complex64::new(0.0, -1.0));

        let sv = [Complex64::new(0.3, 0.0), Complex64::new(0.7, 0.0)];
        assert_eq!(julia_constant(&sv).unwrap(), Complex64::new(0.43, 0.0));

        let sv = [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)];
        assert_eq!(julia_constant(&sv).unwrap(), Complex64::new(0.0, 0.0));

        assert!(julia_constant(&sv[..1]).is_err());
    }

    #[test]
    fn coefficient_lists_parse() {
        let k = parse_coefficients("-0.8,0.156; 0.25,-1").unwrap();
        assert_eq!(k, vec![Complex64::new(-0.8, 0.156), Complex64::new(0.25, -1.0)]);
        assert!(parse_coefficients("1.0").is_none());
        assert!(parse_coefficients("a,b").is_none());
    }

    #[test]
    fn fixed_source_repeats_its_vector() {
        let source = FixedCoefficients(vec![Complex64::new(0.1, 0.2)]);
        assert_eq!(source.coefficients(0).unwrap(), source.coefficients(42).unwrap());
    }
}
