//! Command handlers

pub mod backend;
pub mod config;
pub mod inspect;
pub mod run;

pub use backend::{execute_health, execute_reset, execute_setup, normalize_scenario};
pub use config::{execute_config, render_config};
pub use inspect::{execute_inspect, render_nodes};
pub use run::{execute_run, run_journey, run_with};
