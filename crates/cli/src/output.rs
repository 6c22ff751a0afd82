//! Output formatting utilities

use crate::client::{HealthResponse, SyncResult, SyncStatus};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Key/value row for detail tables
#[derive(Tabled)]
struct FieldRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Value")]
    value: String,
}

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Failures")]
    failures: u32,
    #[tabled(rename = "Message")]
    message: String,
}

fn row(field: &str, value: impl Into<String>) -> FieldRow {
    FieldRow {
        field: field.to_string(),
        value: value.into(),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Format a timestamp with its age, e.g. `2024-06-01 12:00:00 UTC (5m ago)`
pub fn format_timestamp(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(timestamp);
    let ago = if age.num_seconds() < 0 {
        "in the future".to_string()
    } else if age.num_minutes() < 1 {
        format!("{}s ago", age.num_seconds())
    } else if age.num_hours() < 1 {
        format!("{}m ago", age.num_minutes())
    } else if age.num_days() < 1 {
        format!("{}h ago", age.num_hours())
    } else {
        format!("{}d ago", age.num_days())
    };
    format!("{} ({})", timestamp.format("%Y-%m-%d %H:%M:%S UTC"), ago)
}

/// Format an interval in seconds, e.g. `5m` or `1h30m`
pub fn format_interval(secs: u64) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;

    let mut out = String::new();
    if hours > 0 {
        out.push_str(&format!("{}h", hours));
    }
    if minutes > 0 {
        out.push_str(&format!("{}m", minutes));
    }
    if seconds > 0 || out.is_empty() {
        out.push_str(&format!("{}s", seconds));
    }
    out
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "running" | "success" | "enabled" => status.green().to_string(),
        "degraded" | "stopped" | "disabled" => status.yellow().to_string(),
        "unhealthy" | "error" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

fn result_rows(result: &SyncResult, now: DateTime<Utc>) -> Vec<FieldRow> {
    let outcome = if result.success { "success" } else { "failed" };
    let mut rows = vec![
        row("Last sync", format_timestamp(result.timestamp, now)),
        row("Result", color_status(outcome)),
        row("Clusters found", result.clusters_found.to_string()),
        row("Zones created", result.zones_created.to_string()),
        row("Zones updated", result.zones_updated.to_string()),
        row("Zones deleted", result.zones_deleted.to_string()),
        row("Duration", format!("{}ms", result.duration_ms)),
    ];
    if let Some(error) = &result.error_message {
        rows.push(row("Error", error.red().to_string()));
    }
    rows
}

fn print_rows(rows: Vec<FieldRow>) {
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_status(status: &SyncStatus, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(status),
        OutputFormat::Table => {
            println!("{}", "Zone Sync Status".bold());

            let mut rows = vec![
                row(
                    "Sync",
                    color_status(if status.enabled { "enabled" } else { "disabled" }),
                ),
                row(
                    "Scheduler",
                    color_status(if status.running { "running" } else { "stopped" }),
                ),
                row("Interval", format_interval(status.interval_secs)),
            ];

            match &status.last_result {
                Some(result) => rows.extend(result_rows(result, Utc::now())),
                None => rows.push(row("Last sync", "never")),
            }

            print_rows(rows);
            Ok(())
        }
    }
}

pub fn print_sync_result(result: &SyncResult, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(result),
        OutputFormat::Table => {
            if result.success {
                print_success(&format!(
                    "Sync completed: {} created, {} updated, {} deleted",
                    result.zones_created, result.zones_updated, result.zones_deleted
                ));
            } else {
                print_error("Sync cycle failed");
            }
            print_rows(result_rows(result, Utc::now()));
            Ok(())
        }
    }
}

fn component_rows(health: &HealthResponse) -> Vec<ComponentRow> {
    health
        .components
        .iter()
        .map(|(name, component)| ComponentRow {
            name: name.clone(),
            status: color_status(&component.status),
            failures: component.consecutive_failures,
            message: component
                .message
                .clone()
                .or_else(|| {
                    component
                        .last_error
                        .as_ref()
                        .map(|e| format!("recovered from: {}", e))
                })
                .unwrap_or_default(),
        })
        .collect()
}

pub fn print_health(health: &HealthResponse, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(health),
        OutputFormat::Table => {
            println!("Overall: {}", color_status(&health.status));

            if health.components.is_empty() {
                print_warning("No components registered");
                return Ok(());
            }

            let table = Table::new(component_rows(health)).with(Style::rounded()).to_string();
            println!("{}", table);
            Ok(())
        }
    }
}
