//! Resource energy consumption models.

use dyn_clone::{clone_trait_object, DynClone};

use crate::core::config::options::parse_config_value;
use crate::core::error::{Error, Result};

/// Energy model is a function, which computes the power consumption of a physical resource
/// based on its current utilization and simulation time.
pub trait EnergyModel: DynClone {
    /// Returns the current power consumption of a resource.
    ///
    /// - `time` - current simulation time.
    /// - `utilization` - ratio of allocated to total resource capacity.
    fn power(&self, time: f64, utilization: f64) -> f64;
}

clone_trait_object!(EnergyModel);

/// Resource consuming the same power regardless of its utilization.
#[derive(Clone)]
pub struct ConstantEnergyModel {
    power: f64,
}

impl ConstantEnergyModel {
    pub fn new(power: f64) -> Self {
        Self { power }
    }
}

impl EnergyModel for ConstantEnergyModel {
    fn power(&self, _time: f64, _utilization: f64) -> f64 {
        self.power
    }
}

/// Linear model: `idle_power + utilization * (max_power - idle_power)`.
///
/// Utilization above 1 (possible with overcommitting controllers) is capped.
#[derive(Clone)]
pub struct LinearEnergyModel {
    idle_power: f64,
    max_power: f64,
}

impl LinearEnergyModel {
    pub fn new(idle_power: f64, max_power: f64) -> Self {
        Self { idle_power, max_power }
    }
}

impl EnergyModel for LinearEnergyModel {
    fn power(&self, _time: f64, utilization: f64) -> f64 {
        let utilization = utilization.clamp(0., 1.);
        self.idle_power + utilization * (self.max_power - self.idle_power)
    }
}

/// Creates energy model from config string like `Constant[power=10]` or `Linear[idle=70,max=250]`.
pub fn energy_model_resolver(config_str: &str) -> Result<Box<dyn EnergyModel>> {
    let (model_name, options) = parse_config_value(config_str)?;
    match model_name.as_str() {
        "Constant" => {
            options.ensure_only(&["power"])?;
            Ok(Box::new(ConstantEnergyModel::new(options.get_or("power", 0.)?)))
        }
        "Linear" => {
            options.ensure_only(&["idle", "max"])?;
            let idle = options.require::<f64>("idle")?;
            let max = options.require::<f64>("max")?;
            if max < idle {
                return Err(Error::Configuration(format!(
                    "max power {} is less than idle power {} in '{}'",
                    max, idle, config_str
                )));
            }
            Ok(Box::new(LinearEnergyModel::new(idle, max)))
        }
        _ => Err(Error::Configuration(format!("unknown energy model: {}", config_str))),
    }
}
