use super::state::{CheckResult, Outcome, RunSummary};
use tokio::sync::broadcast;

/// Run progress events for live console output
#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        suite: String,
        run_id: String,
        group_count: usize,
    },
    GroupStarted {
        group: String,
    },
    CheckRecorded {
        result: CheckResult,
    },
    /// `error` is set when the group was cut short
    GroupFinished {
        group: String,
        duration_ms: u64,
        error: Option<String>,
    },
    RunFinished {
        suite: String,
        summary: RunSummary,
        duration_ms: u64,
    },
}

/// Event emitter for broadcasting run events
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<RunEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<RunEvent>) {
        let (sender, receiver) = broadcast::channel(100);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: RunEvent) {
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self { sender }
    }
}

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener printing live progress
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    /// Runs until every emitter is dropped
    pub async fn listen(mut receiver: broadcast::Receiver<RunEvent>) {
        use colored::Colorize;
        use indicatif::ProgressDrawTarget;
        use std::io::IsTerminal;

        // Piped output gets no spinner escape codes
        let multi = if std::io::stdout().is_terminal() {
            MultiProgress::new()
        } else {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        };

        let mut spinner: Option<ProgressBar> = None;

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Console listener skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                RunEvent::RunStarted {
                    suite,
                    run_id,
                    group_count,
                } => {
                    println!(
                        "\n{} Verification run started: {} ({} groups) [{}]",
                        "▶".green().bold(),
                        suite.white().bold(),
                        group_count,
                        run_id.dimmed()
                    );
                }

                RunEvent::GroupStarted { group } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("\n  {} {}", "→".blue(), group.white().bold());

                    let pb = multi.add(ProgressBar::new_spinner());
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                    {
                        pb.set_style(style);
                    }
                    pb.set_message(format!("{}...", group).dimmed().to_string());
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                RunEvent::CheckRecorded { result } => {
                    let marker = match result.outcome {
                        Outcome::Pass => "✓".green(),
                        Outcome::Fail => "✗".red(),
                        Outcome::Warn => "!".yellow(),
                    };
                    let line = format!("    {} {}", marker, result.name);
                    match &spinner {
                        Some(_) => {
                            multi.println(line).ok();
                        }
                        None => println!("{}", line),
                    }
                }

                RunEvent::GroupFinished {
                    group,
                    duration_ms,
                    error,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    match error {
                        Some(e) => println!(
                            "  {} {} aborted after {}ms: {}",
                            "←".blue(),
                            group,
                            duration_ms,
                            e.red()
                        ),
                        None => println!("  {} {} ({}ms)", "←".blue(), group, duration_ms),
                    }
                }

                RunEvent::RunFinished {
                    suite,
                    summary,
                    duration_ms,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("\n{} Verification run finished: {}", "■".blue().bold(), suite);
                    println!(
                        "  {} passed, {} failed, {} warned ({}ms)",
                        summary.passed.to_string().green(),
                        summary.failed.to_string().red(),
                        summary.warned.to_string().yellow(),
                        duration_ms
                    );
                }
            }
        }
    }
}
