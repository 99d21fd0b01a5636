//! Unit test harness for stepper-planner.
//!
//! Groups the configuration tests and the planner property tests into one
//! test binary.

#[path = "../common/mod.rs"]
mod common;

mod config_parsing;
mod config_validation;
mod planner_props;
