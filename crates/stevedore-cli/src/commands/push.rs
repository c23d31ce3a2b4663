//! Push command - push an image to its registry

use console::style;
use stevedore_docker::{DockerError, EngineConfig, PushOptions, push_image};

use crate::display::print_progress;
use crate::error::Result;
use crate::exit_codes;

/// Run the push command
pub async fn run(engine: &EngineConfig, options: &PushOptions) -> Result<i32> {
    println!("{} Pushing {}", style("→").cyan(), style(&options.reference).bold());

    match push_image(engine, options).await {
        Ok(log) => {
            print_progress(&log);
            println!("{} Pushed {}", style("✓").green().bold(), options.reference);
            Ok(exit_codes::SUCCESS)
        }
        Err(err @ DockerError::StreamFailed { .. }) => {
            if let Some(log) = err.output() {
                print_progress(log);
            }
            Err(err.into())
        }
        Err(err) => Err(err.into()),
    }
}
