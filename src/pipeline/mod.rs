//! The two-stage ETL pipeline
//!
//! The song-catalog stage derives `songs` and `artists` from raw song
//! metadata; the event-log stage derives `users`, `time` and `songplays`
//! from activity logs. Both stages share one [`LakeSession`] and run
//! sequentially. The event-log stage consumes the catalog stage's
//! [`CatalogTables`] commit token and re-reads the persisted catalog
//! output for the songplays join, so the join can only execute after the
//! catalog writes are durable. Every table write is overwrite-mode, which
//! makes a failed run safe to re-execute from the top.

pub mod catalog;
pub mod events;

pub use catalog::CatalogTables;

use crate::config::LakeConfig;
use crate::error::{Error, Result};
use crate::model::Table;
use crate::session::LakeSession;
use crate::storage::StorageRoot;
use datafusion::prelude::DataFrame;
use std::time::Instant;
use tracing::{debug, info};

/// Run the full pipeline described by `config`
pub async fn run(session: &LakeSession, config: &LakeConfig) -> Result<()> {
    let started = Instant::now();

    let input = StorageRoot::parse(&config.locations.input_url, &config.storage)?;
    let output = StorageRoot::parse(&config.locations.output_url, &config.storage)?;
    session.register_root(&input);
    session.register_root(&output);

    let catalog = catalog::run(session, &input, &output).await?;
    events::run(session, &input, &output, catalog, config.pipeline.songplay_join).await?;

    info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "pipeline run complete"
    );
    Ok(())
}

/// Overwrite-mode commit of one output table: clear the table prefix, then
/// write the frame Hive-partitioned into it.
pub(crate) async fn persist(
    session: &LakeSession,
    output: &StorageRoot,
    table: Table,
    df: DataFrame,
) -> Result<u64> {
    let cleared = output
        .clear_prefix(table.name())
        .await
        .map_err(|e| Error::table(table, e))?;
    if cleared > 0 {
        debug!(table = table.name(), files = cleared, "cleared previous output");
    }

    let dest = output.table_url(table).map_err(|e| Error::table(table, e))?;
    let rows = session
        .write_parquet(df, dest.as_str(), table.partition_names())
        .await
        .map_err(|e| Error::table(table, e))?;

    info!(table = table.name(), rows, "table committed");
    Ok(rows)
}
