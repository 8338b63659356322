//! The rational maps an escape-time run can iterate.
//!
//! `ScheduledMap` evaluates the general mating map term by term from a
//! `CoefficientSchedule`.  The three fused maps are fixed degree-2
//! instances with the arithmetic inlined:
//!
//! * `Quadratic`:     `z^2 + c`, the classical Julia map
//! * `RationalPairA`: `(z^2 + c0) / (z^2 + c1)`
//! * `RationalPairB`: `(c0 z^2 + 1 - c0) / (c1 z^2 + 1 - c1)`
//!
//! `RationalPairA` performs exactly the operations `ScheduledMap` does
//! for one qubit with a power offset of one, so `MapKind::General`
//! swaps it in for that schedule.

use std::str::FromStr;

use num::complex::Complex64;

use crate::errors::{QuantumJuliaError, Result};
use crate::schedule::CoefficientSchedule;

/// One step of an escape-time iteration.  Implementations are shared
/// read-only between worker threads.
pub trait RationalMap: Sync {
    /// The image of `z`.  May be infinite or NaN; the engine treats
    /// either as an escape.
    fn apply(&self, z: Complex64) -> Complex64;
}

fn check_len(coefficients: &[Complex64], expected: usize) -> Result<()> {
    if coefficients.len() < expected {
        return Err(QuantumJuliaError::CoefficientLengthMismatch {
            expected,
            actual: coefficients.len(),
        });
    }
    Ok(())
}

/// The general mating map, driven by a schedule and a statevector.
#[derive(Copy, Clone, Debug)]
pub struct ScheduledMap<'a> {
    schedule: &'a CoefficientSchedule,
    coefficients: &'a [Complex64],
}

impl<'a> ScheduledMap<'a> {
    /// Fails when the vector is shorter than `2^qubits`; extra entries
    /// are never read.  Schedules only come out of
    /// `CoefficientSchedule::build`, so every index they hold is in
    /// range once the length check passes.
    pub fn new(schedule: &'a CoefficientSchedule, coefficients: &'a [Complex64]) -> Result<Self> {
        check_len(coefficients, schedule.coefficient_len())?;
        Ok(ScheduledMap {
            schedule,
            coefficients,
        })
    }

    /// The schedule this map evaluates.
    pub fn schedule(&self) -> &CoefficientSchedule {
        self.schedule
    }
}

impl<'a> RationalMap for ScheduledMap<'a> {
    fn apply(&self, z: Complex64) -> Complex64 {
        let s = self.schedule;
        let c = self.coefficients;
        let last = s.terms() - 1;

        let (up, ui) = (s.upper_powers(), s.upper_indices());
        let (lp, li) = (s.lower_powers(), s.lower_indices());

        let mut upper = num::pow(z, up[0] as usize);
        let mut lower = num::pow(z, lp[0] as usize);
        for i in 0..last {
            upper = upper + c[ui[i]] * num::pow(z, up[i + 1] as usize);
            lower = lower + c[li[i]] * num::pow(z, lp[i + 1] as usize);
        }
        upper = upper + c[ui[last]];
        lower = lower + c[li[last]];

        upper / lower
    }
}

/// `z^2 + c`
#[inline]
pub fn quadratic(c: Complex64, z: Complex64) -> Complex64 {
    z * z + c
}

/// `(z^2 + c0) / (z^2 + c1)`
#[inline]
pub fn rational_pair_a(c0: Complex64, c1: Complex64, z: Complex64) -> Complex64 {
    let z2 = z * z;
    (z2 + c0) / (z2 + c1)
}

/// `(c0 z^2 + 1 - c0) / (c1 z^2 + 1 - c1)`
#[inline]
pub fn rational_pair_b(c0: Complex64, c1: Complex64, z: Complex64) -> Complex64 {
    let one = Complex64::new(1.0, 0.0);
    let z2 = z * z;
    (c0 * z2 + one - c0) / (c1 * z2 + one - c1)
}

/// The classical Julia map `z^2 + c`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Quadratic {
    /// The Julia constant.
    pub c: Complex64,
}

impl RationalMap for Quadratic {
    #[inline]
    fn apply(&self, z: Complex64) -> Complex64 {
        quadratic(self.c, z)
    }
}

/// `(z^2 + c0) / (z^2 + c1)`, the general map for one qubit with a
/// power offset of one.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RationalPairA {
    /// Numerator constant.
    pub c0: Complex64,
    /// Denominator constant.
    pub c1: Complex64,
}

impl RationalMap for RationalPairA {
    #[inline]
    fn apply(&self, z: Complex64) -> Complex64 {
        rational_pair_a(self.c0, self.c1, z)
    }
}

/// `(c0 z^2 + 1 - c0) / (c1 z^2 + 1 - c1)`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RationalPairB {
    /// Weight of `z^2` in the numerator.
    pub c0: Complex64,
    /// Weight of `z^2` in the denominator.
    pub c1: Complex64,
}

impl RationalMap for RationalPairB {
    #[inline]
    fn apply(&self, z: Complex64) -> Complex64 {
        rational_pair_b(self.c0, self.c1, z)
    }
}

/// Which family of map to iterate, chosen by name at runtime.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MapKind {
    /// The scheduled mating map of degree `2^(n-1)`.
    General,
    /// `z^2 + c[0]`.
    Quadratic,
    /// `RationalPairA` over `c[0]`, `c[1]`.
    PairA,
    /// `RationalPairB` over `c[0]`, `c[1]`.
    PairB,
}

impl MapKind {
    /// How many coefficients the map reads.
    pub fn coefficient_len(self, qubits: u32) -> usize {
        match self {
            MapKind::General => 1usize << qubits,
            MapKind::Quadratic => 1,
            MapKind::PairA | MapKind::PairB => 2,
        }
    }

    /// Binds coefficients (and, for `General`, a schedule) into a
    /// concrete map.
    pub fn bind<'a>(
        self,
        schedule: &'a CoefficientSchedule,
        coefficients: &'a [Complex64],
    ) -> Result<FractalMap<'a>> {
        match self {
            MapKind::General => {
                let map = ScheduledMap::new(schedule, coefficients)?;
                if schedule.qubits() == 1 && schedule.power_offset() == 1 {
                    return Ok(FractalMap::PairA(RationalPairA {
                        c0: coefficients[0],
                        c1: coefficients[1],
                    }));
                }
                Ok(FractalMap::General(map))
            }
            MapKind::Quadratic => {
                check_len(coefficients, 1)?;
                Ok(FractalMap::Quadratic(Quadratic { c: coefficients[0] }))
            }
            MapKind::PairA => {
                check_len(coefficients, 2)?;
                Ok(FractalMap::PairA(RationalPairA {
                    c0: coefficients[0],
                    c1: coefficients[1],
                }))
            }
            MapKind::PairB => {
                check_len(coefficients, 2)?;
                Ok(FractalMap::PairB(RationalPairB {
                    c0: coefficients[0],
                    c1: coefficients[1],
                }))
            }
        }
    }
}

impl FromStr for MapKind {
    type Err = QuantumJuliaError;

    /// Case-insensitive; `-` and `_` are interchangeable.
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "general" => Ok(MapKind::General),
            "quadratic" => Ok(MapKind::Quadratic),
            "pair-a" => Ok(MapKind::PairA),
            "pair-b" => Ok(MapKind::PairB),
            _ => Err(QuantumJuliaError::UnknownSelection {
                kind: "map",
                value: s.to_string(),
            }),
        }
    }
}

/// A bound map of any kind.  The engine matches on this once per run
/// and then iterates the concrete type.
#[derive(Copy, Clone, Debug)]
pub enum FractalMap<'a> {
    /// Evaluated term by term.
    General(ScheduledMap<'a>),
    /// Fused `z^2 + c`.
    Quadratic(Quadratic),
    /// Fused `(z^2 + c0) / (z^2 + c1)`.
    PairA(RationalPairA),
    /// Fused `(c0 z^2 + 1 - c0) / (c1 z^2 + 1 - c1)`.
    PairB(RationalPairB),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn scheduled_map_rejects_short_vectors() {
        let s = CoefficientSchedule::build(2, 0).unwrap();
        let coefficients = vec![c(0.1, 0.0); 3];
        match ScheduledMap::new(&s, &coefficients) {
            Err(QuantumJuliaError::CoefficientLengthMismatch {
                expected: 4,
                actual: 3,
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn built_schedules_only_index_inside_the_statevector() {
        for n in 1..=6 {
            let s = CoefficientSchedule::build(n, 0).unwrap();
            let len = s.coefficient_len();
            assert!(!s.upper_powers().is_empty());
            assert!(s.upper_indices().iter().chain(s.lower_indices()).all(|&i| i < len));

            let k = vec![c(0.25, -0.125); len];
            let map = ScheduledMap::new(&s, &k).unwrap();
            assert!(map.apply(c(0.5, 0.5)).norm().is_finite());
        }
    }

    #[test]
    fn two_qubit_map_expands_by_hand() {
        let s = CoefficientSchedule::build(2, 0).unwrap();
        let k = [c(0.1, 0.2), c(-0.3, 0.4), c(0.5, -0.6), c(0.7, 0.8)];
        let map = ScheduledMap::new(&s, &k).unwrap();
        let z = c(0.3, -0.2);
        let expected = (z * z + k[2] * z + k[0]) / (z * z + k[3] * z + k[1]);
        assert!((map.apply(z) - expected).norm() < 1e-12);
    }

    #[test]
    fn one_qubit_offset_one_schedule_is_pair_a_exactly() {
        let s = CoefficientSchedule::build(1, 1).unwrap();
        let k = [c(-0.8, 0.156), c(0.3, -0.7)];
        let map = ScheduledMap::new(&s, &k).unwrap();
        let fused = RationalPairA { c0: k[0], c1: k[1] };
        for &z in &[c(0.0, 0.0), c(1.25, -0.5), c(-0.01, 3.0), c(1e3, 1e-3)] {
            assert_eq!(map.apply(z), fused.apply(z));
        }
    }

    #[test]
    fn fused_maps_match_their_formulas() {
        let z = c(0.5, 0.25);
        let (c0, c1) = (c(0.2, -0.1), c(-0.4, 0.3));
        assert_eq!(Quadratic { c: c0 }.apply(z), z * z + c0);
        let one = c(1.0, 0.0);
        let expected = (c0 * z * z + one - c0) / (c1 * z * z + one - c1);
        assert!((RationalPairB { c0, c1 }.apply(z) - expected).norm() < 1e-12);
    }

    #[test]
    fn zero_denominator_is_not_finite() {
        let fused = RationalPairA {
            c0: c(1.0, 0.0),
            c1: c(0.0, 0.0),
        };
        let z = fused.apply(c(0.0, 0.0));
        assert!(!z.norm().is_finite());
    }

    #[test]
    fn map_kind_parses_case_insensitively() {
        assert_eq!("GENERAL".parse::<MapKind>().unwrap(), MapKind::General);
        assert_eq!("Quadratic".parse::<MapKind>().unwrap(), MapKind::Quadratic);
        assert_eq!("pair_A".parse::<MapKind>().unwrap(), MapKind::PairA);
        assert_eq!(" pair-b ".parse::<MapKind>().unwrap(), MapKind::PairB);
        assert!("cubic".parse::<MapKind>().is_err());
    }

    #[test]
    fn general_kind_takes_the_fast_path_for_degree_two() {
        let s = CoefficientSchedule::build(1, 1).unwrap();
        let k = [c(0.1, 0.0), c(0.2, 0.0)];
        match MapKind::General.bind(&s, &k).unwrap() {
            FractalMap::PairA(_) => {}
            other => panic!("unexpected {:?}", other),
        }
        let s = CoefficientSchedule::build(1, 0).unwrap();
        match MapKind::General.bind(&s, &k).unwrap() {
            FractalMap::General(_) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bind_checks_lengths_per_kind() {
        let s = CoefficientSchedule::build(1, 0).unwrap();
        let one = [c(0.1, 0.0)];
        assert!(MapKind::Quadratic.bind(&s, &one).is_ok());
        assert!(MapKind::PairA.bind(&s, &one).is_err());
        assert!(MapKind::PairB.bind(&s, &one).is_err());
        assert!(MapKind::General.bind(&s, &one).is_err());
        assert_eq!(MapKind::General.coefficient_len(3), 8);
    }
}
