//! `att policy`: show or change working hours.

use anyhow::{Context, Result};
use att_core::PolicyConfig;
use att_db::Database;

pub fn format_policy(policy: &PolicyConfig) -> String {
    format!(
        "Work start: {}\nWork end:   {}\n",
        policy.work_start.format("%H:%M:%S"),
        policy.work_end.format("%H:%M:%S")
    )
}

pub fn set(db: &mut Database, start: &str, end: &str) -> Result<PolicyConfig> {
    let policy = PolicyConfig::new(start, end)?;
    if policy.work_start >= policy.work_end {
        tracing::warn!(
            work_start = %policy.work_start,
            work_end = %policy.work_end,
            "work start is not before work end"
        );
    }
    db.save_policy(&policy).context("failed to save policy")?;
    tracing::info!(work_start = %policy.work_start, work_end = %policy.work_end, "policy updated");
    Ok(policy)
}

pub fn run_show(db: &Database) -> Result<()> {
    let policy = db.load_policy().context("failed to load policy")?;
    print!("{}", format_policy(&policy));
    Ok(())
}

pub fn run_set(db: &mut Database, start: &str, end: &str) -> Result<()> {
    let policy = set(db, start, end)?;
    print!("{}", format_policy(&policy));
    Ok(())
}
