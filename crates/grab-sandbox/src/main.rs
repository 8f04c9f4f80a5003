//! Grab sandbox command line

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use grab_sandbox::{Runner, SandboxError, Scenario, Step};

#[derive(Parser)]
#[command(name = "grab-sandbox")]
#[command(about = "Play grab interaction scenarios against a headless world")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play a scenario and print per-frame reports as JSON
    Run {
        /// Scenario file (RON); the built-in demo when omitted
        scenario: Option<PathBuf>,
        /// Extra frames to tick after the script
        #[arg(long, default_value = "0")]
        frames: u32,
        /// Write the reports here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
        /// Only report the final frame
        #[arg(long)]
        last: bool,
    },
    /// Write the built-in demo scenario
    Demo {
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<(), SandboxError> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grab_sandbox=info,grab_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match Cli::parse().command {
        Commands::Run {
            scenario,
            frames,
            out,
            last,
        } => {
            let mut scenario = match scenario {
                Some(path) => Scenario::load(path)?,
                None => Scenario::demo(),
            };
            if frames > 0 {
                scenario.steps.push(Step::Tick { frames });
            }
            tracing::info!("Playing '{}'", scenario.name);

            let mut runner = Runner::new(&scenario)?;
            let mut reports = runner.run()?;
            if last {
                reports = reports.pop().into_iter().collect();
            }
            let json = serde_json::to_string_pretty(&reports)
                .map_err(|e| SandboxError::Serialize(e.to_string()))?;
            match out {
                Some(path) => {
                    std::fs::write(&path, json).map_err(|e| SandboxError::Io(e.to_string()))?;
                    tracing::info!("Wrote {} reports to {}", reports.len(), path.display());
                }
                None => println!("{json}"),
            }
        }
        Commands::Demo { out } => {
            Scenario::demo().save(&out)?;
            tracing::info!("Wrote demo scenario to {}", out.display());
        }
    }
    Ok(())
}
