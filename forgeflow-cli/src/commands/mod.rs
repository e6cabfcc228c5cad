//! ABOUTME: Per-mode command handlers dispatched from `main`

pub mod client;
pub mod service;
pub mod workflow;
