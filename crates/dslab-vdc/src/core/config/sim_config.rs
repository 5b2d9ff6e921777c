//! Simulation configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};

/// Holds raw simulation config parsed from YAML file.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
struct RawSimulationConfig {
    pub sampling_period: Option<f64>,
    pub network_throughput: Option<f64>,
    pub solver_retry_limit: Option<u32>,
    pub initial_placement: Option<String>,
    pub incremental_placement: Option<String>,
    pub fallback_placement: Option<String>,
    pub migration: Option<MigrationConfig>,
    pub hosts: Option<Vec<HostConfig>>,
}

/// Holds configuration of a single physical resource.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    /// Resource category: cpu, memory or storage.
    pub category: String,
    /// Resource capacity.
    pub capacity: f64,
    /// Fraction of capacity which can be used by VMs, 1 by default.
    pub utilization_threshold: Option<f64>,
    /// Energy model config string, e.g. `Linear[idle=70,max=250]`. Zero constant power by default.
    pub energy_model: Option<String>,
}

/// Holds configuration of a single physical host or a set of identical hosts.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    /// Host name.
    /// Should be set if count = 1.
    pub name: Option<String>,
    /// Host name prefix.
    /// Full name is produced by appending host instance number to the prefix.
    /// Should be set if count > 1.
    pub name_prefix: Option<String>,
    /// Host resources.
    pub resources: Vec<ResourceConfig>,
    /// Machine controller config string, e.g. `Proportional[sampling_time=5]`.
    pub controller: Option<String>,
    /// Number of such hosts.
    pub count: Option<u32>,
}

impl HostConfig {
    /// Returns names of the hosts described by this config.
    pub fn host_names(&self) -> Result<Vec<String>> {
        let count = self.count.unwrap_or(1);
        match (&self.name, &self.name_prefix) {
            (Some(name), None) if count == 1 => Ok(vec![name.clone()]),
            (None, Some(prefix)) => Ok((1..=count).map(|i| format!("{}{}", prefix, i)).collect()),
            _ => Err(Error::Configuration(
                "host config should have either name (if count = 1) or name_prefix".to_string(),
            )),
        }
    }

    pub fn controller(&self) -> &str {
        self.controller.as_deref().unwrap_or(DEFAULT_CONTROLLER)
    }
}

/// Holds configuration of the migration controller.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct MigrationConfig {
    /// Period in seconds between placement re-evaluations.
    pub sampling_time: f64,
    /// Placement strategy config string used to compute target placements.
    pub strategy: String,
}

const DEFAULT_CONTROLLER: &str = "Proportional";

/// Represents simulation configuration.
#[derive(Debug, PartialEq, Serialize, Deserialize, Clone)]
pub struct SimulationConfig {
    /// Period in seconds of data center sampling (energy accounting).
    pub sampling_period: f64,
    /// Network throughput in memory units per second, used to compute VM migration duration.
    pub network_throughput: f64,
    /// How many times a placement is retried after the solver hits an iteration or resource limit.
    pub solver_retry_limit: u32,
    /// Strategy used to place the initial batch of VMs.
    pub initial_placement: String,
    /// Strategy used to place VMs arriving during the simulation.
    pub incremental_placement: String,
    /// Strategy used when the primary strategy fails with a solver error.
    pub fallback_placement: Option<String>,
    /// Migration controller configuration, migrations are disabled if absent.
    pub migration: Option<MigrationConfig>,
    /// Configurations of physical hosts.
    pub hosts: Vec<HostConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sampling_period: 1.,
            network_throughput: 1.,
            solver_retry_limit: 1,
            initial_placement: "FirstFit".to_string(),
            incremental_placement: "BestFit".to_string(),
            fallback_placement: None,
            migration: None,
            hosts: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Creates simulation config by reading parameter values from YAML file
    /// (uses default values if some parameters are absent).
    pub fn from_file(file_name: &str) -> Result<Self> {
        let data = std::fs::read_to_string(file_name)
            .map_err(|e| Error::Configuration(format!("can't read file {}: {}", file_name, e)))?;
        data.parse()
    }

    fn from_raw(raw: RawSimulationConfig) -> Self {
        let default = Self::default();
        Self {
            sampling_period: raw.sampling_period.unwrap_or(default.sampling_period),
            network_throughput: raw.network_throughput.unwrap_or(default.network_throughput),
            solver_retry_limit: raw.solver_retry_limit.unwrap_or(default.solver_retry_limit),
            initial_placement: raw.initial_placement.unwrap_or(default.initial_placement),
            incremental_placement: raw.incremental_placement.unwrap_or(default.incremental_placement),
            fallback_placement: raw.fallback_placement,
            migration: raw.migration,
            hosts: raw.hosts.unwrap_or_default(),
        }
    }

    /// Checks value ranges and host naming rules.
    pub fn validate(&self) -> Result<()> {
        if !(self.sampling_period > 0.) {
            return Err(Error::Configuration(format!(
                "sampling_period must be positive, got {}",
                self.sampling_period
            )));
        }
        if !(self.network_throughput > 0.) {
            return Err(Error::Configuration(format!(
                "network_throughput must be positive, got {}",
                self.network_throughput
            )));
        }
        if let Some(migration) = &self.migration {
            if !(migration.sampling_time > 0.) {
                return Err(Error::Configuration(format!(
                    "migration sampling_time must be positive, got {}",
                    migration.sampling_time
                )));
            }
        }
        for host in &self.hosts {
            host.host_names()?;
        }
        Ok(())
    }
}

impl FromStr for SimulationConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let raw: RawSimulationConfig =
            serde_yaml::from_str(s).map_err(|e| Error::Configuration(format!("can't parse YAML config: {}", e)))?;
        let config = Self::from_raw(raw);
        config.validate()?;
        Ok(config)
    }
}
