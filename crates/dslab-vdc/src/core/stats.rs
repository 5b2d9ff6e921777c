//! Data center statistics and energy accounting.

use serde::Serialize;

/// Counters of data center events.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct DataCenterStats {
    pub admitted_vms: u64,
    pub failed_admissions: u64,
    pub finished_vms: u64,
    pub migrations_started: u64,
    pub migrations_completed: u64,
    pub migrations_rejected: u64,
    /// Number of placements computed by the fallback strategy after the primary one failed.
    pub solver_fallbacks: u64,
    pub solver_retries: u64,
}

/// Accumulates host energy consumption between power changes.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EnergyMeter {
    energy_consumed: f64,
    current_power: f64,
    prev_time: f64,
}

impl EnergyMeter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accounts energy consumed at the previous power since the last update and sets the new power.
    pub fn update(&mut self, time: f64, power: f64) {
        self.energy_consumed += (time - self.prev_time).max(0.) * self.current_power;
        self.current_power = power;
        self.prev_time = time;
    }

    pub fn current_power(&self) -> f64 {
        self.current_power
    }

    /// Returns the energy consumed up to `time`, including the not yet accounted interval.
    pub fn energy_consumed(&self, time: f64) -> f64 {
        self.energy_consumed + (time - self.prev_time).max(0.) * self.current_power
    }
}
