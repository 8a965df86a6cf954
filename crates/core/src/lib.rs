//! `simfleet-core` -- pure domain logic for the simulation fan-out engine.
//!
//! Nothing in this crate touches an async runtime. Configuration
//! validation, the run command template, worker status vocabulary,
//! artifact naming and grid script rendering all live here so the
//! engine crate and its tests share one definition of each.

pub mod config;
pub mod error;
pub mod grid_script;
pub mod naming;
pub mod run_spec;
pub mod settings;
pub mod status;
