//! ABOUTME: Command-line interface library for forgeflow
//! ABOUTME: CLI argument parsing, workflow-state persistence, and the three
//! ABOUTME: mode handlers dispatched from `main`

pub mod cli;
pub mod commands;
pub mod state;
