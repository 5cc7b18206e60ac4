//! Song-catalog pipeline stage
//!
//! Loads raw song-metadata records and derives the `songs` and `artists`
//! dimensions. The two extracts are independent projections over the same
//! frame; the stage returns its commit token only after both are durable.

use crate::error::{Error, Result};
use crate::model::{self, Table};
use crate::pipeline::persist;
use crate::session::LakeSession;
use crate::storage::StorageRoot;
use datafusion::prelude::*;
use tracing::info;
use url::Url;

pub(crate) const STAGE: &str = "song-catalog";

/// Proof that the song-catalog outputs are durably committed.
///
/// [`events::run`](crate::pipeline::events::run) takes this by value, so
/// the songplays join cannot be expressed before both catalog writes have
/// completed and are visible to a fresh read.
#[derive(Debug)]
pub struct CatalogTables {
    /// Committed `songs` table directory
    pub songs: Url,
    /// Committed `artists` table directory
    pub artists: Url,
}

/// Run the song-catalog stage
pub async fn run(
    session: &LakeSession,
    input: &StorageRoot,
    output: &StorageRoot,
) -> Result<CatalogTables> {
    let song_data = input
        .join("song_data/")
        .map_err(|e| Error::stage(STAGE, "song_data", e))?;
    info!(url = %song_data, "loading song catalog");

    let schema = model::song_schema();
    let metadata = session
        .read_json(song_data.as_str(), &schema)
        .await
        .map_err(|e| Error::stage(STAGE, "song_data", e))?;

    extract_songs(session, output, metadata.clone()).await?;
    extract_artists(session, output, metadata).await?;

    Ok(CatalogTables {
        songs: output
            .table_url(Table::Songs)
            .map_err(|e| Error::table(Table::Songs, e))?,
        artists: output
            .table_url(Table::Artists)
            .map_err(|e| Error::table(Table::Artists, e))?,
    })
}

async fn extract_songs(
    session: &LakeSession,
    output: &StorageRoot,
    metadata: DataFrame,
) -> Result<u64> {
    let songs = project_songs(metadata).map_err(|e| Error::table(Table::Songs, e))?;
    persist(session, output, Table::Songs, songs).await
}

async fn extract_artists(
    session: &LakeSession,
    output: &StorageRoot,
    metadata: DataFrame,
) -> Result<u64> {
    let artists = project_artists(metadata).map_err(|e| Error::table(Table::Artists, e))?;
    persist(session, output, Table::Artists, artists).await
}

/// `songs`: one row per song, exact duplicates removed
fn project_songs(metadata: DataFrame) -> Result<DataFrame> {
    Ok(metadata
        .select_columns(&["song_id", "title", "artist_id", "year", "duration"])?
        .distinct()?)
}

/// `artists`: one row per artist, null ids dropped, exact duplicates removed
fn project_artists(metadata: DataFrame) -> Result<DataFrame> {
    Ok(metadata
        .select_columns(&[
            "artist_id",
            "artist_name",
            "artist_location",
            "artist_latitude",
            "artist_longitude",
        ])?
        .filter(col("artist_id").is_not_null())?
        .distinct()?)
}
