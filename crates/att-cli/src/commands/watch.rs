//! `att watch`: live view of one subject's day until Ctrl-C.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use att_core::{LiveMonitorConfig, LiveState, SystemClock, format_duration, spawn_live_monitor};
use att_db::{Database, SharedDatabase};
use chrono_tz::Tz;
use tokio_util::sync::CancellationToken;

use super::util::{format_local, subject_key};

/// One status line for a published state.
pub fn format_live(state: &LiveState, zone: Tz) -> String {
    let stamp = state
        .evaluated_at
        .map_or_else(|| "-".to_string(), |at| format_local(at, zone));

    let mut line = match &state.record {
        None => format!("[{stamp}] {}: no data yet", state.subject_key),
        Some(record) => {
            let mut flags = Vec::new();
            flags.push(if record.is_active_now { "working" } else { "not working" });
            if record.is_late_login {
                flags.push("late");
            }
            if record.is_early_logout {
                flags.push("left early");
            }
            format!(
                "[{stamp}] {}: {} ({})",
                state.subject_key,
                format_duration(record.total_duration_ms),
                flags.join(", ")
            )
        }
    };
    if let Some(error) = &state.last_error {
        line.push_str(&format!(" [refresh failed: {error}]"));
    }
    line
}

pub fn run(db: Database, subject: &str, zone: Tz, refresh_interval: Duration) -> Result<()> {
    let config = LiveMonitorConfig {
        subject: subject_key(subject)?,
        zone,
        refresh_interval,
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    runtime.block_on(async move {
        let cancel = CancellationToken::new();
        let (mut updates, handle) = spawn_live_monitor(
            Arc::new(SharedDatabase::new(db)),
            Arc::new(SystemClock),
            config,
            cancel.clone(),
        );

        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let state = updates.borrow_and_update().clone();
                    println!("{}", format_live(&state, zone));
                }
                signal = tokio::signal::ctrl_c() => {
                    signal.context("failed to listen for Ctrl-C")?;
                    tracing::debug!("interrupt received, stopping live monitor");
                    cancel.cancel();
                    break;
                }
            }
        }

        handle.await.context("live monitor task failed")?;
        Ok::<(), anyhow::Error>(())
    })
}
