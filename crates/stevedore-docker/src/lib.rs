//! Stevedore Docker - container engine integration for Stevedore
//!
//! This crate provides:
//! - **Client Factory**: Explicit engine host with fallback to environment defaults
//! - **Container Runner**: Create, start, wait, collect logs and always remove a one-shot container
//! - **Image Builder**: Tar a context directory, build, tag, and detect failures from the build log
//! - **Image Pusher**: Push with registry credentials and the same log handling

pub mod client;
pub mod container;
pub mod error;
pub mod image;
pub mod output;

pub use client::{DEFAULT_TIMEOUT_SECS, EngineConfig, connect, connect_to_host};
pub use container::{ResourceLimits, RunOptions, RunOutput, run, run_container};
pub use error::{DockerError, Result};
pub use image::{
    BuildOptions, DEFAULT_TAG, PushOptions, build, build_image, push, push_image, split_reference,
    tar_context,
};
pub use output::{ErrorLine, StreamLog, build_info_line, push_info_line};
