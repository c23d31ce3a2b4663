//! Build command - build an image from a context directory

use console::style;
use stevedore_docker::{BuildOptions, DockerError, EngineConfig, build_image};

use crate::display::print_progress;
use crate::error::Result;
use crate::exit_codes;

/// Run the build command
pub async fn run(engine: &EngineConfig, options: &BuildOptions) -> Result<i32> {
    println!(
        "{} Building {} from {}",
        style("→").cyan(),
        style(&options.tags.join(", ")).bold(),
        options.context.display()
    );

    match build_image(engine, options).await {
        Ok(log) => {
            print_progress(&log);
            println!("{} Built {}", style("✓").green().bold(), options.tags.join(", "));
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
