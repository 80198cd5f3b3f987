//! Rendering of backend responses for the terminal

use analysis_client::{AnalysisType, HealthStatus};
use analysis_core::{Job, Phase, SessionView};
use clap::ValueEnum;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{ContentArrangement, Table};
use serde::Serialize;

/// Output mode shared by every command
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Print `value` as pretty JSON, or through `table` otherwise
pub fn emit<T: Serialize>(
    value: &T,
    format: OutputFormat,
    table: impl FnOnce(&T) -> Table,
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => println!("{}", table(value)),
    }
    Ok(())
}

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or("-").to_string()
}

pub fn job_table(job: &Job) -> Table {
    let mut table = table();
    table.set_header(vec!["field", "value"]);
    table.add_row(vec!["id".to_string(), job.id.to_string()]);
    table.add_row(vec!["symbol".to_string(), job.subject.clone()]);
    table.add_row(vec!["analysis".to_string(), job.analysis_type.clone()]);
    table.add_row(vec!["workflow".to_string(), job.workflow.to_string()]);
    table.add_row(vec!["status".to_string(), job.status.to_string()]);
    table.add_row(vec!["recommendation".to_string(), or_dash(job.recommendation.as_deref())]);
    table.add_row(vec![
        "confidence".to_string(),
        job.confidence_score.map_or_else(|| "-".to_string(), |c| format!("{c}%")),
    ]);
    table.add_row(vec!["created".to_string(), job.created_at.to_rfc3339()]);
    table.add_row(vec![
        "completed".to_string(),
        job.completed_at.map_or_else(|| "-".to_string(), |t| t.to_rfc3339()),
    ]);
    if let Some(error) = &job.error {
        table.add_row(vec!["error".to_string(), error.clone()]);
    }
    if let Some(summary) = &job.summary {
        table.add_row(vec!["summary".to_string(), summary.clone()]);
    }
    table
}

pub fn phases_table(phases: &[Phase]) -> Table {
    let mut table = table();
    table.set_header(vec!["phase", "agent", "status"]);
    for phase in phases {
        table.add_row(vec![phase.name.clone(), phase.agent.clone(), phase.status.to_string()]);
    }
    table
}

pub fn jobs_table(jobs: &[Job]) -> Table {
    let mut table = table();
    table.set_header(vec![
        "id",
        "symbol",
        "analysis",
        "workflow",
        "status",
        "recommendation",
        "created",
    ]);
    for job in jobs {
        table.add_row(vec![
            job.id.to_string(),
            job.subject.clone(),
            job.analysis_type.clone(),
            job.workflow.to_string(),
            job.status.to_string(),
            or_dash(job.recommendation.as_deref()),
            job.created_at.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table
}

pub fn health_table(health: &HealthStatus) -> Table {
    let mut table = table();
    table.set_header(vec!["field", "value"]);
    table.add_row(vec!["status".to_string(), health.status.clone()]);
    table.add_row(vec!["version".to_string(), or_dash(health.version.as_deref())]);
    table.add_row(vec!["service".to_string(), or_dash(health.service.as_deref())]);
    table.add_row(vec!["agents available".to_string(), health.ai_agents_available.to_string()]);
    table.add_row(vec!["workflows".to_string(), health.supported_workflows.join(", ")]);
    table.add_row(vec!["frameworks".to_string(), health.frameworks.join(", ")]);
    table
}

pub fn types_table(types: &[AnalysisType]) -> Table {
    let mut table = table();
    table.set_header(vec!["id", "name", "description"]);
    for kind in types {
        table.add_row(vec![kind.id.clone(), kind.name.clone(), kind.description.clone()]);
    }
    table
}

/// Final summary of a followed job
pub fn view_table(view: &SessionView) -> Table {
    match &view.job {
        Some(job) => {
            let mut table = job_table(job);
            table.add_row(vec!["progress".to_string(), format!("{}%", view.progress_percent)]);
            table
        }
        None => {
            let mut table = table();
            table.set_header(vec!["status"]);
            table.add_row(vec!["no job tracked"]);
            table
        }
    }
}

/// One progress line for a phase change
pub fn phase_line(percent: u8, phase: &Phase) -> String {
    if phase.agent.is_empty() {
        format!("[{percent:>3}%] {}: {}", phase.name, phase.status)
    } else {
        format!("[{percent:>3}%] {} ({}): {}", phase.name, phase.agent, phase.status)
    }
}
