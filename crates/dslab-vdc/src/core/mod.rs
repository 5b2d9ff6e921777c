pub mod common;
pub mod config;
pub mod data_center;
pub mod energy_model;
pub mod error;
pub mod events;
pub mod host_controller;
pub mod load_model;
pub mod machine_controller;
pub mod machine_controllers;
pub mod migration_controller;
pub mod physical_machine;
pub mod placement;
pub mod placement_strategies;
pub mod placement_strategy;
pub mod resource;
pub mod snapshot;
pub mod solver;
pub mod stats;
pub mod vm;
