//! Load command - concurrent sessions against the eviction window.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context as _, Result, bail};
use clap::Args;
use console::{Style, style};
use lapse_session::{Payload, SessionManager};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use super::Context;

/// Arguments for the load command.
#[derive(Args, Debug)]
pub struct LoadArgs {
    /// Number of sessions to create and update concurrently
    #[arg(short = 'n', long, default_value_t = 100)]
    pub sessions: usize,

    /// Allowed lateness past the idle timeout, in milliseconds
    #[arg(long, default_value_t = 2000)]
    pub slack_ms: u64,
}

/// Load result for JSON output.
#[derive(Debug, Serialize)]
struct LoadOutput {
    sessions: usize,
    evicted: usize,
    idle_timeout_ms: u64,
    slack_ms: u64,
    min_latency_ms: Option<u64>,
    max_latency_ms: Option<u64>,
    within_window: bool,
}

/// Run the load command.
pub async fn run(args: LoadArgs, ctx: &Context) -> Result<()> {
    if !ctx.store.enable_sweeper {
        bail!("load needs the background sweeper, but it is disabled in the config");
    }

    let manager = Arc::new(SessionManager::new(ctx.store.clone())?);
    let idle_timeout = ctx.store.idle_timeout;
    let slack = Duration::from_millis(args.slack_ms);

    let ids = (0..args.sessions)
        .map(|_| manager.create_session())
        .collect::<lapse_session::Result<Vec<_>>>()?;
    info!(sessions = ids.len(), "Created sessions");

    let mut tasks = Vec::with_capacity(ids.len());
    for (n, id) in ids.into_iter().enumerate() {
        let manager = Arc::clone(&manager);
        tasks.push(tokio::spawn(async move {
            let mut data = Payload::new();
            data.insert("n".to_string(), json!(n));
            manager.update_session_data(&id, data)?;
            let stamped = manager
                .store()
                .last_access(&id)
                .ok_or_else(|| lapse_session::Error::NotFound(id.clone()))?;
            Ok::<_, lapse_session::Error>((id, stamped))
        }));
    }

    let mut pending = Vec::with_capacity(tasks.len());
    for task in tasks {
        pending.push(task.await.context("update task panicked")??);
    }
    info!(sessions = pending.len(), "Updated sessions concurrently");

    let latencies = watch_evictions(&manager, pending, idle_timeout + slack).await;

    let min = latencies.iter().min().copied();
    let max = latencies.iter().max().copied();
    let within_window = latencies.len() == args.sessions
        && latencies
            .iter()
            .all(|l| *l >= idle_timeout && *l <= idle_timeout + slack);

    let output = LoadOutput {
        sessions: args.sessions,
        evicted: latencies.len(),
        idle_timeout_ms: idle_timeout.as_millis() as u64,
        slack_ms: args.slack_ms,
        min_latency_ms: min.map(|d| d.as_millis() as u64),
        max_latency_ms: max.map(|d| d.as_millis() as u64),
        within_window,
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_human(&output);
    }

    if let Ok(manager) = Arc::try_unwrap(manager) {
        manager.shutdown().await;
    }

    if !within_window {
        bail!(
            "{} of {} sessions left the window [{}ms, {}ms]",
            args.sessions - count_inside(&latencies, idle_timeout, slack),
            args.sessions,
            idle_timeout.as_millis(),
            (idle_timeout + slack).as_millis()
        );
    }
    Ok(())
}

/// Poll until every session is gone or the window has closed for all of
/// them, returning each observed eviction latency.
async fn watch_evictions(
    manager: &SessionManager,
    mut pending: Vec<(String, Instant)>,
    window_end: Duration,
) -> Vec<Duration> {
    let poll = Duration::from_millis(10);
    let deadline = pending
        .iter()
        .map(|(_, at)| *at + window_end + Duration::from_secs(1))
        .max();
    let mut latencies = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        if deadline.is_some_and(|d| Instant::now() > d) {
            debug!(remaining = pending.len(), "Gave up waiting for evictions");
            break;
        }
        tokio::time::sleep(poll).await;

        let now = Instant::now();
        pending.retain(|(id, updated_at)| {
            if manager.store().contains(id) {
                true
            } else {
                latencies.push(now.duration_since(*updated_at));
                false
            }
        });
    }

    latencies
}

fn count_inside(latencies: &[Duration], idle_timeout: Duration, slack: Duration) -> usize {
    latencies
        .iter()
        .filter(|l| **l >= idle_timeout && **l <= idle_timeout + slack)
        .count()
}

fn print_human(output: &LoadOutput) {
    let dim = Style::new().dim();
    let verdict = if output.within_window {
        Style::new().green().apply_to("● all inside window")
    } else {
        Style::new().red().apply_to("● outside window")
    };
    let fmt_ms = |v: Option<u64>| v.map_or_else(|| "-".to_string(), |ms| format!("{ms}ms"));

    println!();
    println!("{}", style("Eviction Load Check").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!(
        "  {} {}/{}",
        dim.apply_to("Evicted:"),
        output.evicted,
        output.sessions
    );
    println!(
        "  {} [{}ms, {}ms]",
        dim.apply_to("Window:"),
        output.idle_timeout_ms,
        output.idle_timeout_ms + output.slack_ms
    );
    println!("  {} {}", dim.apply_to("Fastest:"), fmt_ms(output.min_latency_ms));
    println!("  {} {}", dim.apply_to("Slowest:"), fmt_ms(output.max_latency_ms));
    println!("  {} {}", dim.apply_to("Result:"), verdict);
    println!();
}
