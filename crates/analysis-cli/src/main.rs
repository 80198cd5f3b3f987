//! Command-line interface for the analysis backend
//!
//! # Usage
//!
//! ```bash
//! export ANALYSIS_API_BASE="http://localhost:8000"
//!
//! # Submit a job and follow it to the end (Ctrl-C cancels)
//! cargo run -p analysis-cli -- run AAPL --analysis-type buying --workflow 13-agent
//!
//! # Inspect the backend
//! cargo run -p analysis-cli -- health
//! cargo run -p analysis-cli -- --format json history
//! ```

mod output;

use analysis_client::{AnalysisBackend, AnalysisSession, HttpBackend};
use analysis_core::{JobId, PhaseStatus, SessionView};
use analysis_utils::ClientConfig;
use clap::{Parser, Subcommand};
use output::OutputFormat;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "analysis-cli")]
#[command(about = "Submit and follow multi-agent stock analyses", long_about = None)]
struct Cli {
    /// Backend base URL (overrides ANALYSIS_API_BASE)
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Table, global = true)]
    format: OutputFormat,

    /// Tracing filter directives (overrides RUST_LOG)
    #[arg(long, global = true)]
    log_filter: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Submit an analysis and follow it until it finishes
    Run {
        /// Stock symbol to analyse
        symbol: String,

        /// Analysis type id (see `types`)
        #[arg(short, long, default_value = "buying")]
        analysis_type: String,

        /// Agent workflow: 7-agent or 13-agent
        #[arg(short, long, default_value = "7-agent")]
        workflow: String,

        /// Print the job id and return instead of following progress
        #[arg(long)]
        detach: bool,
    },
    /// Show the current state of a job
    Status {
        job_id: String,

        /// Also list the job's phases
        #[arg(long)]
        phases: bool,
    },
    /// Ask the backend to cancel a job
    Cancel { job_id: String },
    /// List jobs known to the backend
    History,
    /// Check backend health
    Health,
    /// List available analysis types
    Types,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    analysis_utils::init_tracing_with(cli.log_filter.as_deref(), cli.json_logs);

    let mut config = ClientConfig::from_env()?;
    if let Some(api_base) = cli.api_base {
        config.api_base = api_base;
        config.validate()?;
    }
    info!(api_base = %config.api_base, "Starting analysis-cli");

    let backend = Arc::new(HttpBackend::new(&config)?);
    let format = cli.format;

    match cli.command {
        Commands::Run {
            symbol,
            analysis_type,
            workflow,
            detach,
        } => {
            let session = AnalysisSession::new(backend, &config);
            run(&session, symbol, analysis_type, workflow, detach, format).await
        }
        Commands::Status { job_id, phases } => {
            let job = backend.fetch_job(&JobId::from(job_id)).await?;
            output::emit(&job, format, output::job_table)?;
            if phases && format == OutputFormat::Table {
                println!("{}", output::phases_table(&job.phases));
            }
            Ok(())
        }
        Commands::Cancel { job_id } => {
            let job_id = JobId::from(job_id);
            let accepted = backend.cancel(&job_id).await?;
            if format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "analysis_id": job_id, "success": accepted }));
            } else if accepted {
                println!("Cancel accepted for {job_id}");
            } else {
                println!("Backend declined to cancel {job_id}");
            }
            Ok(())
        }
        Commands::History => {
            let jobs = backend.history().await?;
            output::emit(&jobs, format, |jobs| output::jobs_table(jobs))
        }
        Commands::Health => {
            let health = backend.health().await?;
            output::emit(&health, format, output::health_table)
        }
        Commands::Types => {
            let types = backend.analysis_types().await?;
            output::emit(&types, format, |types| output::types_table(types))
        }
    }
}

async fn run(
    session: &AnalysisSession,
    symbol: String,
    analysis_type: String,
    workflow: String,
    detach: bool,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let mut views = session.subscribe();
    let job_id = session.submit(symbol, analysis_type, workflow).await?;

    if detach {
        println!("{job_id}");
        return Ok(());
    }
    if format == OutputFormat::Table {
        println!("Submitted {job_id}, following progress (Ctrl-C to cancel)");
    }

    let mut reported: HashMap<String, PhaseStatus> = HashMap::new();
    let mut cancel_sent = false;
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let view = views.borrow_and_update().clone();
                if format == OutputFormat::Table {
                    report_phases(&view, &mut reported);
                }
                if is_finished(&view) {
                    break;
                }
            }
            _ = &mut ctrl_c, if !cancel_sent => {
                cancel_sent = true;
                debug!(%job_id, "interrupt received, cancelling");
                match session.cancel(&job_id).await {
                    Ok(true) => eprintln!("Cancel accepted"),
                    Ok(false) => eprintln!("Backend declined to cancel"),
                    Err(e) => eprintln!("Cancel failed: {e}"),
                }
                if is_finished(&session.snapshot()) {
                    break;
                }
            }
        }
    }

    let view = session.snapshot();
    output::emit(&view, format, output::view_table)?;
    if let Some(error) = view.last_error.as_deref() {
        anyhow::bail!("{error}");
    }
    Ok(())
}

/// Nothing more will arrive for the followed job
///
/// Without a push transport the poll loop is the only source of updates, so
/// an error recorded against a still-active job means it has stopped.
fn is_finished(view: &SessionView) -> bool {
    let Some(job) = &view.job else {
        return !view.running;
    };
    if view.cancelling {
        return false;
    }
    !view.running || (!job.is_terminal() && view.last_error.is_some())
}

fn report_phases(view: &SessionView, reported: &mut HashMap<String, PhaseStatus>) {
    let Some(job) = &view.job else {
        return;
    };
    for phase in &job.phases {
        let key = phase.id.clone().unwrap_or_else(|| phase.name.clone());
        if reported.get(&key) != Some(&phase.status) {
            reported.insert(key, phase.status);
            println!("{}", output::phase_line(view.progress_percent, phase));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analysis_core::{AnalysisRequest, Job, JobStatus, Phase};

    fn view(status: JobStatus) -> SessionView {
        let request = AnalysisRequest::new("AAPL", "buying", "7-agent");
        let mut job: Job = serde_json::from_value(serde_json::json!({
            "id": "J1",
            "stock_symbol": request.subject,
            "analysis_type": request.analysis_type,
            "workflow_type": "7-agent",
            "status": "pending",
            "created_at": "2025-03-14T09:26:53"
        }))
        .unwrap();
        job.status = status;
        SessionView {
            running: !status.is_terminal(),
            job: Some(job),
            ..SessionView::default()
        }
    }

    #[test]
    fn test_parse_run_defaults() {
        let cli = Cli::try_parse_from(["analysis-cli", "run", "AAPL"]).unwrap();
        match cli.command {
            Commands::Run {
                symbol,
                analysis_type,
                workflow,
                detach,
            } => {
                assert_eq!(symbol, "AAPL");
                assert_eq!(analysis_type, "buying");
                assert_eq!(workflow, "7-agent");
                assert!(!detach);
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert_eq!(cli.format, OutputFormat::Table);
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "analysis-cli",
            "history",
            "--format",
            "json",
            "--api-base",
            "http://10.0.0.2:8000",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.api_base.as_deref(), Some("http://10.0.0.2:8000"));
        assert!(matches!(cli.command, Commands::History));
    }

    #[test]
    fn test_finished_detection() {
        assert!(!is_finished(&view(JobStatus::Running)));
        assert!(is_finished(&view(JobStatus::Completed)));
        assert!(is_finished(&SessionView::default()));

        let mut stalled = view(JobStatus::Running);
        stalled.last_error = Some("status polling stopped".to_string());
        assert!(is_finished(&stalled));

        let mut cancelling = view(JobStatus::Running);
        cancelling.cancelling = true;
        assert!(!is_finished(&cancelling));
    }

    #[test]
    fn test_report_phases_only_on_change() {
        let mut reported = HashMap::new();
        let mut view = view(JobStatus::Running);
        if let Some(job) = view.job.as_mut() {
            job.phases.push(Phase::new("DataAnalyst", "AutoGen").with_status(PhaseStatus::Running));
        }

        report_phases(&view, &mut reported);
        report_phases(&view, &mut reported);
        assert_eq!(reported.get("DataAnalyst"), Some(&PhaseStatus::Running));

        if let Some(job) = view.job.as_mut() {
            job.phases[0].status = PhaseStatus::Completed;
        }
        report_phases(&view, &mut reported);
        assert_eq!(reported.get("DataAnalyst"), Some(&PhaseStatus::Completed));
    }
}
