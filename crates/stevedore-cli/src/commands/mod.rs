//! CLI commands

// Container engine commands
pub mod build;
pub mod push;
pub mod run;

// Kubernetes commands
pub mod deploy;
pub mod pods;
pub mod service;
