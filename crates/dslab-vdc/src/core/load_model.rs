//! Resource load models.

use dyn_clone::{clone_trait_object, DynClone};

/// A resource load model is a function, which defines the fraction of the requested resource amount a VM actually
/// demands at the moment.
///
/// `time` is the current simulation time, `time_from_start` is the time since the VM was (re)started, it is reset
/// when VM migration completes.
pub trait LoadModel: DynClone {
    fn load(&self, time: f64, time_from_start: f64) -> f64;
}

clone_trait_object!(LoadModel);

/// The simplest load model, the constant load.
#[derive(Clone)]
pub struct ConstantLoadModel {
    load: f64,
}

impl ConstantLoadModel {
    pub fn new(load: f64) -> Self {
        Self { load }
    }
}

impl LoadModel for ConstantLoadModel {
    fn load(&self, _time: f64, _time_from_start: f64) -> f64 {
        self.load
    }
}

/// Load switching from one level to another at the given simulation time.
#[derive(Clone)]
pub struct StepLoadModel {
    before: f64,
    after: f64,
    switch_time: f64,
}

impl StepLoadModel {
    pub fn new(before: f64, after: f64, switch_time: f64) -> Self {
        Self {
            before,
            after,
            switch_time,
        }
    }
}

impl LoadModel for StepLoadModel {
    fn load(&self, time: f64, _time_from_start: f64) -> f64 {
        if time < self.switch_time {
            self.before
        } else {
            self.after
        }
    }
}
