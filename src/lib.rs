//! Workout tracking: routines, a live session with set logging and rest
//! timers, workout history, body-weight progress and an AI chat proxy.

pub mod ai;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod kv;
pub mod logging;
pub mod models;
pub mod onboarding;
pub mod session;
pub mod stats;
pub mod storage;
pub mod types;
pub mod utils;

pub use error::{Error, Result};
