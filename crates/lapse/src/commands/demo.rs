//! Demo command - one session through its whole life.

use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use clap::Args;
use console::{Style, style};
use lapse_session::{Error, Payload, SessionManager};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::Context;

/// Arguments for the demo command.
#[derive(Args, Debug)]
pub struct DemoArgs {
    /// Key to store in the session
    #[arg(long, default_value = "website")]
    pub key: String,

    /// Value to store under the key
    #[arg(long, default_value = "longhoang.de")]
    pub value: String,

    /// Keep polling until the session is evicted
    #[arg(short, long)]
    pub wait: bool,
}

/// Demo result for JSON output.
#[derive(Debug, Serialize)]
struct DemoOutput {
    session_id: String,
    data: Payload,
    idle_timeout_ms: u64,
    sweep_interval_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    evicted_after_ms: Option<u64>,
}

/// Run the demo command.
pub async fn run(args: DemoArgs, ctx: &Context) -> Result<()> {
    if args.wait && !ctx.store.enable_sweeper {
        bail!("--wait needs the background sweeper, but it is disabled in the config");
    }

    let manager = SessionManager::new(ctx.store.clone())?;

    let session_id = manager.create_session()?;
    info!(session_id = %session_id, "Created new session");

    let mut data = Payload::new();
    data.insert(args.key.clone(), Value::String(args.value.clone()));
    manager.update_session_data(&session_id, data)?;
    let updated_at = manager
        .store()
        .last_access(&session_id)
        .unwrap_or_else(Instant::now);
    info!(session_id = %session_id, key = %args.key, "Updated session data");

    let data = manager.get_session_data(&session_id)?;

    let evicted_after = if args.wait {
        Some(wait_for_eviction(&manager, &session_id, updated_at).await?)
    } else {
        None
    };

    let output = DemoOutput {
        session_id,
        data,
        idle_timeout_ms: ctx.store.idle_timeout.as_millis() as u64,
        sweep_interval_ms: ctx.store.sweep_interval.as_millis() as u64,
        evicted_after_ms: evicted_after.map(|d| d.as_millis() as u64),
    };

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_human(&output, ctx.verbose);
    }

    manager.shutdown().await;
    Ok(())
}

/// Poll until reads report the session gone.
async fn wait_for_eviction(
    manager: &SessionManager,
    session_id: &str,
    updated_at: Instant,
) -> Result<Duration> {
    let poll = (manager.store().config().sweep_interval / 4).max(Duration::from_millis(5));

    loop {
        tokio::time::sleep(poll).await;
        match manager.get_session_data(session_id) {
            Ok(_) => continue,
            Err(Error::NotFound(_)) => return Ok(updated_at.elapsed()),
            Err(e) => return Err(e.into()),
        }
    }
}

fn print_human(output: &DemoOutput, verbose: bool) {
    let dim = Style::new().dim();
    let green = Style::new().green();

    println!();
    println!("{}", style("Session Demo").bold());
    println!("{}", dim.apply_to("─".repeat(40)));
    println!();
    println!("  {} {}", dim.apply_to("Session:"), output.session_id);
    println!(
        "  {} {}",
        dim.apply_to("Data:"),
        Value::Object(output.data.clone())
    );
    println!(
        "  {} {}ms",
        dim.apply_to("Idle timeout:"),
        output.idle_timeout_ms
    );
    if verbose {
        println!(
            "  {} {}ms",
            dim.apply_to("Sweep interval:"),
            output.sweep_interval_ms
        );
    }

    if let Some(ms) = output.evicted_after_ms {
        println!(
            "  {} {}",
            dim.apply_to("Status:"),
            green.apply_to(format!("evicted {ms}ms after last update"))
        );
    }
    println!();
}
