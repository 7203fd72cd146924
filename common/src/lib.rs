// Shared library for the poll detector and its helper binaries

pub mod alert;
pub mod config;
pub mod detection;
pub mod errors;
pub mod export;
pub mod models;
pub mod runner;
pub mod schedule;
pub mod state;
pub mod telegram;
pub mod telemetry;
pub mod twitter;
