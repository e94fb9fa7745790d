use std::cmp::Ordering;

use anyhow::{bail, Context, Result};
use log::info;
use rusqlite::Connection;

/// Schema scripts in order; script `i` upgrades the store to version `i + 1`.
const MIGRATIONS: &[&str] = &[include_str!("schemas/schema_v1.sql")];

fn target_version() -> i32 {
    i32::try_from(MIGRATIONS.len()).unwrap_or(i32::MAX)
}

/// Brings the store schema up to date inside one transaction, tracking the
/// applied version in SQLite's `user_version` pragma.
pub fn run_migrations(conn: &mut Connection) -> Result<()> {
    let target = target_version();
    let current: i32 = conn
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .context("failed to read store schema version")?;

    match current.cmp(&target) {
        Ordering::Greater => bail!(
            "store schema v{current} is newer than this build understands (v{target})"
        ),
        Ordering::Equal => return Ok(()),
        Ordering::Less => {}
    }

    let tx = conn
        .transaction()
        .context("failed to begin schema upgrade")?;
    let already_applied = usize::try_from(current).unwrap_or(0);
    for (index, script) in MIGRATIONS.iter().enumerate().skip(already_applied) {
        tx.execute_batch(script)
            .with_context(|| format!("schema upgrade to v{} failed", index + 1))?;
    }
    tx.pragma_update(None, "user_version", target)
        .context("failed to record store schema version")?;
    tx.commit().context("failed to commit schema upgrade")?;

    info!("Store schema upgraded from v{current} to v{target}");
    Ok(())
}
