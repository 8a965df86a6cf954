//! Async fan-out engine for simulation instances.
//!
//! The [`dispatcher::Dispatcher`] builds one workspace per instance, runs
//! each instance through a local or grid [`backend`] under a shared
//! [`gate::ConcurrencyGate`], reports progress through the
//! [`monitor::StatusBus`], and hands the results to the [`collector`].

pub mod archive;
pub mod backend;
pub mod collector;
pub mod dispatcher;
pub mod error;
pub mod gate;
pub mod handle;
pub mod monitor;
pub mod workspace;
