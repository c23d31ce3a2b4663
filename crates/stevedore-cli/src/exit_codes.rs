//! Standard exit codes for CLI operations
//!
//! `run` exits with the container's own exit code when the container ran;
//! every other outcome uses one of these.

/// Success - operation completed without errors
pub const SUCCESS: i32 = 0;

/// General error - engine failures, failed runs, unspecified failures
pub const ERROR: i32 = 1;

/// Input error - invalid pod spec file, quantity or option value
pub const INPUT_ERROR: i32 = 2;

/// Cluster error - Kubernetes API or kubeconfig failure
pub const CLUSTER_ERROR: i32 = 3;

/// Timeout - the deploy deadline expired
pub const TIMEOUT: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;
