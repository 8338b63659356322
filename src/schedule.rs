//! The coefficient schedule lays out the generalised rational map
//! ("Julia set mating") for an `n`-qubit statevector:
//!
//! ```text
//!      z^k + c[d-2] z^(k-1) + c[d-4] z^(k-2) + ... + c[2] z + c[0]
//! z -> ------------------------------------------------------------
//!      z^k + c[d-1] z^(k-1) + c[d-3] z^(k-2) + ... + c[3] z + c[1]
//! ```
//!
//! where `d = 2^n` is the statevector length and `k = d / 2`.  Even
//! amplitudes feed the numerator, odd amplitudes the denominator.  A
//! `power_offset` lifts every exponent by the same amount.
//!
//! Schedules depend only on `(n, power_offset)`, so the `ScheduleCache`
//! hands out shared copies instead of rebuilding them every frame.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::errors::{QuantumJuliaError, Result};

/// Largest qubit count a schedule is built for.  A 24-qubit
/// statevector already holds sixteen million amplitudes.
pub const MAX_QUBITS: u32 = 24;

/// Exponents and coefficient indices for both halves of the map.
///
/// A schedule is only ever produced by `build`, so every index it holds
/// is below `coefficient_len()` and each half has at least one term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoefficientSchedule {
    qubits: u32,
    power_offset: u32,
    upper_powers: Vec<u32>,
    upper_indices: Vec<usize>,
    lower_powers: Vec<u32>,
    lower_indices: Vec<usize>,
}

impl CoefficientSchedule {
    /// Builds the schedule for `qubits` qubits.  Fails when `qubits` is
    /// outside `1..=MAX_QUBITS` or the top exponent does not fit a `u32`.
    pub fn build(qubits: u32, power_offset: u32) -> Result<Self> {
        if qubits < 1 || qubits > MAX_QUBITS {
            return Err(QuantumJuliaError::InvalidQubitCount {
                qubits,
                max: MAX_QUBITS,
            });
        }
        let degree = 1usize << qubits;
        let terms = degree / 2;
        let top_power = (terms as u32).checked_add(power_offset).ok_or_else(|| {
            QuantumJuliaError::InvalidParameter {
                reason: format!("power offset {} overflows the top exponent", power_offset),
            }
        })?;

        let powers: Vec<u32> = (0..terms as u32).map(|i| top_power - i).collect();
        let upper_indices = (0..terms).map(|i| degree - 2 - 2 * i).collect();
        let lower_indices = (0..terms).map(|i| degree - 1 - 2 * i).collect();

        Ok(CoefficientSchedule {
            qubits,
            power_offset,
            upper_powers: powers.clone(),
            upper_indices,
            lower_powers: powers,
            lower_indices,
        })
    }

    /// Qubit count `n` the schedule was built for.
    pub fn qubits(&self) -> u32 {
        self.qubits
    }

    /// Amount added to every exponent.
    pub fn power_offset(&self) -> u32 {
        self.power_offset
    }

    /// Strictly decreasing, from `d/2 + offset` down to `1 + offset`.
    pub fn upper_powers(&self) -> &[u32] {
        &self.upper_powers
    }

    /// Even indices, `d - 2` down to `0`.
    pub fn upper_indices(&self) -> &[usize] {
        &self.upper_indices
    }

    /// Identical to `upper_powers`.
    pub fn lower_powers(&self) -> &[u32] {
        &self.lower_powers
    }

    /// Odd indices, `d - 1` down to `1`.
    pub fn lower_indices(&self) -> &[usize] {
        &self.lower_indices
    }

    /// Number of sub-expressions in each half, `2^(n-1)`.
    pub fn terms(&self) -> usize {
        self.upper_powers.len()
    }

    /// Length of the coefficient vector this schedule indexes into, `2^n`.
    pub fn coefficient_len(&self) -> usize {
        1usize << self.qubits
    }
}

fn write_half(
    f: &mut fmt::Formatter<'_>,
    powers: &[u32],
    indices: &[usize],
) -> fmt::Result {
    write!(f, "z^{}", powers[0])?;
    for i in 0..powers.len() - 1 {
        write!(f, " + c[{}]*z^{}", indices[i], powers[i + 1])?;
    }
    write!(f, " + c[{}]", indices[powers.len() - 1])
}

/// Renders the map as a two-line fraction, numerator over denominator.
impl fmt::Display for CoefficientSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_half(f, &self.upper_powers, &self.upper_indices)?;
        writeln!(f)?;
        write!(f, "/ ")?;
        write_half(f, &self.lower_powers, &self.lower_indices)
    }
}

/// Thread-safe memo of schedules keyed by `(qubits, power_offset)`.
#[derive(Debug, Default)]
pub struct ScheduleCache {
    schedules: Mutex<HashMap<(u32, u32), Arc<CoefficientSchedule>>>,
}

impl ScheduleCache {
    /// An empty cache.
    pub fn new() -> Self {
        ScheduleCache::default()
    }

    /// Returns the cached schedule, building it on first request.
    pub fn get(&self, qubits: u32, power_offset: u32) -> Result<Arc<CoefficientSchedule>> {
        let mut schedules = match self.schedules.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(schedule) = schedules.get(&(qubits, power_offset)) {
            return Ok(Arc::clone(schedule));
        }
        let schedule = Arc::new(CoefficientSchedule::build(qubits, power_offset)?);
        info!(qubits = qubits, power_offset = power_offset, "built coefficient schedule");
        schedules.insert((qubits, power_offset), Arc::clone(&schedule));
        Ok(schedule)
    }

    /// Number of distinct schedules built so far.
    pub fn len(&self) -> usize {
        match self.schedules.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// True before the first successful `get`.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
