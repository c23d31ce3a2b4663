//! Run command - run a one-shot container and relay its output

use std::io::Write;

use console::style;
use stevedore_docker::{EngineConfig, RunOptions, run_container};

use crate::error::Result;
use crate::exit_codes;

/// Run the container; the returned code is the container's exit code
pub async fn run(engine: &EngineConfig, options: &RunOptions) -> Result<i32> {
    tracing::debug!(image = %options.image, "running container");
    let result = run_container(engine, options).await?;

    print!("{}", result.output);
    std::io::stdout().flush()?;

    if result.exit_code != 0 {
        eprintln!(
            "{} container exited with code {}",
            style("!").yellow().bold(),
            style(result.exit_code).yellow()
        );
    }
    Ok(exit_status(result.exit_code))
}

/// Process exit status for a container exit code; out-of-range codes are errors
fn exit_status(code: i64) -> i32 {
    i32::try_from(code).unwrap_or(exit_codes::ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_status() {
        assert_eq!(exit_status(0), 0);
        assert_eq!(exit_status(137), 137);
        assert_eq!(exit_status(-1), -1);
        assert_eq!(exit_status(i64::from(i32::MAX) + 1), exit_codes::ERROR);
        assert_eq!(exit_status(i64::MIN), exit_codes::ERROR);
    }
}
