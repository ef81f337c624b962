use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use tripful_verify::{report, runner, utils::HarnessConfig};

#[derive(Parser)]
#[command(name = "tripful-verify")]
#[command(version = "0.1.0")]
#[command(about = "End-to-end verification harness for the Tripful web app", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Seed fixtures, drive the browser and print the verification report
    Run {
        /// Suite to run (messaging, itinerary, invitation, all)
        #[arg(short, long, default_value = "messaging")]
        suite: String,

        /// REST API base URL, including the /api prefix
        #[arg(long)]
        api_base: Option<String>,

        /// Web front-end base URL
        #[arg(long)]
        web_base: Option<String>,

        /// Directory for screenshots and reports
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Show the browser window
        #[arg(long, default_value = "false")]
        headed: bool,

        /// Also write JSON, HTML and JUnit reports
        #[arg(long, default_value = "false")]
        report: bool,
    },

    /// Generate report from a saved results file
    Report {
        /// Path to <suite>-results.json
        results: PathBuf,

        /// Output format (console, json, html, junit)
        #[arg(short, long, default_value = "html")]
        format: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check which screenshots of a suite exist, without running it
    Manifest {
        /// Suite whose artifacts to inspect
        #[arg(short, long, default_value = "messaging")]
        suite: String,

        /// Screenshot directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            suite,
            api_base,
            web_base,
            output,
            headed,
            report,
        } => {
            let mut config = HarnessConfig::from_env();
            if let Some(base) = api_base {
                config.api_base = base;
            }
            if let Some(base) = web_base {
                config.web_base = base;
            }
            if let Some(dir) = output {
                config.screenshots_dir = dir;
            }
            if headed {
                config.headless = false;
            }

            println!("{} Running suite: {}", "▶".green().bold(), suite.cyan());
            println!("  API: {}", config.api_base.cyan());
            println!("  Web: {}", config.web_base.cyan());
            println!("  Output: {}", config.screenshots_dir.display().to_string().cyan());
            if report {
                println!("  Reports: {}", "Enabled".green());
            }

            if !runner::run_suites(config, &suite, report).await? {
                std::process::exit(1);
            }
        }

        Commands::Report {
            results,
            format,
            output,
        } => {
            println!(
                "{} Generating {} report from: {}",
                "📊".to_string().blue(),
                format.cyan(),
                results.display()
            );
            report::generate_report(&results, &format, output.as_deref())?;
        }

        Commands::Manifest { suite, output } => {
            let dir = output.unwrap_or_else(|| HarnessConfig::from_env().screenshots_dir);
            if !runner::inspect_artifacts(&suite, &dir)? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
