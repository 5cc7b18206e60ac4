//! Event-log pipeline stage
//!
//! Loads raw activity-log records, keeps actual play events, and derives
//! the `users` and `time` dimensions plus the `songplays` fact table. The
//! songplays step re-reads the catalog tables persisted by the
//! song-catalog stage rather than reusing in-memory frames, so the stages
//! stay independent across runs.

use crate::config::JoinPolicy;
use crate::error::{Error, Result};
use crate::model::{self, Table};
use crate::pipeline::{persist, CatalogTables};
use crate::session::LakeSession;
use crate::storage::StorageRoot;
use arrow::datatypes::DataType;
use datafusion::common::JoinType;
use datafusion::functions::expr_fn::{date_part, date_trunc};
use datafusion::functions_window::expr_fn::row_number;
use datafusion::prelude::*;
use tracing::{info, warn};

pub(crate) const STAGE: &str = "event-log";

/// Run the event-log stage
pub async fn run(
    session: &LakeSession,
    input: &StorageRoot,
    output: &StorageRoot,
    catalog: CatalogTables,
    policy: JoinPolicy,
) -> Result<()> {
    let log_data = input
        .join("log_data/")
        .map_err(|e| Error::stage(STAGE, "log_data", e))?;
    info!(url = %log_data, "loading activity logs");

    let schema = model::event_schema();
    let logs = session
        .read_json(log_data.as_str(), &schema)
        .await
        .map_err(|e| Error::stage(STAGE, "log_data", e))?;

    let plays = filter_plays(logs).map_err(|e| Error::stage(STAGE, "log_data", e))?;

    extract_users(session, output, plays.clone()).await?;

    let plays = with_event_times(plays).map_err(|e| Error::stage(STAGE, "log_data", e))?;
    extract_time(session, output, plays.clone()).await?;
    extract_songplays(session, output, plays, &catalog, policy).await?;

    Ok(())
}

async fn extract_users(
    session: &LakeSession,
    output: &StorageRoot,
    plays: DataFrame,
) -> Result<u64> {
    let users = project_users(plays).map_err(|e| Error::table(Table::Users, e))?;
    persist(session, output, Table::Users, users).await
}

async fn extract_time(
    session: &LakeSession,
    output: &StorageRoot,
    plays: DataFrame,
) -> Result<u64> {
    let time = project_time(plays).map_err(|e| Error::table(Table::Time, e))?;
    persist(session, output, Table::Time, time).await
}

async fn extract_songplays(
    session: &LakeSession,
    output: &StorageRoot,
    plays: DataFrame,
    catalog: &CatalogTables,
    policy: JoinPolicy,
) -> Result<u64> {
    let catalog_df = load_catalog(session, catalog)
        .await
        .map_err(|e| Error::table(Table::Songplays, e))?;
    let matched =
        match_plays(plays, catalog_df, policy).map_err(|e| Error::table(Table::Songplays, e))?;

    if policy == JoinPolicy::Left {
        let unmatched = matched
            .clone()
            .filter(col("song_id").is_null())?
            .count()
            .await?;
        if unmatched > 0 {
            warn!(unmatched, "play events had no catalog match");
        }
    }

    let songplays = project_songplays(matched).map_err(|e| Error::table(Table::Songplays, e))?;
    persist(session, output, Table::Songplays, songplays).await
}

/// Keep actual play events only
fn filter_plays(logs: DataFrame) -> Result<DataFrame> {
    Ok(logs.filter(col("page").eq(lit("NextSong")))?)
}

/// `users`: one row per distinct user row observed, null ids dropped,
/// sorted ascending by last name. Dedup is on full-row identity: a user
/// whose level changed mid-log keeps one row per distinct combination.
fn project_users(plays: DataFrame) -> Result<DataFrame> {
    Ok(plays
        .select(vec![
            col("userId").alias("user_id"),
            col("firstName").alias("first_name"),
            col("lastName").alias("last_name"),
            col("gender"),
            col("level"),
        ])?
        .filter(col("user_id").is_not_null())?
        .distinct()?
        .sort(vec![col("last_name").sort(true, false)])?)
}

/// Derive the event timestamp and its calendar date from the raw epoch
/// milliseconds.
fn with_event_times(plays: DataFrame) -> Result<DataFrame> {
    Ok(plays
        .with_column("start_time", cast(col("ts"), model::start_time_type()))?
        .with_column("event_date", date_trunc(lit("day"), col("start_time")))?)
}

/// `time`: one row per distinct play timestamp with derived calendar
/// components. The hour comes from the timestamp itself; the calendar
/// parts come from the day-truncated date. Weekday is 1 (Sunday) through
/// 7 (Saturday).
fn project_time(plays: DataFrame) -> Result<DataFrame> {
    Ok(plays
        .select(vec![col("start_time"), col("event_date")])?
        .distinct()?
        .select(vec![
            col("start_time"),
            part(col("start_time"), "hour").alias("hour"),
            part(col("event_date"), "day").alias("day"),
            part(col("event_date"), "week").alias("week"),
            part(col("event_date"), "month").alias("month"),
            part(col("event_date"), "year").alias("year"),
            (part(col("event_date"), "dow") + lit(1)).alias("weekday"),
        ])?)
}

/// Fresh read of the committed catalog output, not the in-memory frames
async fn load_catalog(session: &LakeSession, catalog: &CatalogTables) -> Result<DataFrame> {
    let songs = session
        .read_parquet(catalog.songs.as_str(), Table::Songs.partition_cols())
        .await?;
    let artists = session
        .read_parquet(catalog.artists.as_str(), Table::Artists.partition_cols())
        .await?;
    catalog_with_artist_names(songs, artists)
}

/// The persisted `songs` table carries `artist_id` but not `artist_name`;
/// recover the name from the `artists` dimension so plays can be matched
/// on the (title, artist name) pair.
fn catalog_with_artist_names(songs: DataFrame, artists: DataFrame) -> Result<DataFrame> {
    let names = artists.select(vec![
        col("artist_id").alias("catalog_artist_id"),
        col("artist_name"),
    ])?;

    Ok(songs
        .select_columns(&["song_id", "title", "artist_id"])?
        .join_on(
            names,
            JoinType::Inner,
            [col("artist_id").eq(col("catalog_artist_id"))],
        )?
        .select(vec![
            col("song_id"),
            col("title"),
            col("artist_id"),
            col("artist_name"),
        ])?)
}

/// Match play events against the catalog on (artist name, song title)
fn match_plays(plays: DataFrame, catalog: DataFrame, policy: JoinPolicy) -> Result<DataFrame> {
    let join_type = match policy {
        JoinPolicy::Inner => JoinType::Inner,
        JoinPolicy::Left => JoinType::Left,
    };

    Ok(plays.join_on(
        catalog,
        join_type,
        [
            col("artist").eq(col("artist_name")),
            col("song").eq(col("title")),
        ],
    )?)
}

/// `songplays`: one row per matched play event with a synthetic id.
/// The id is unique and strictly increasing within a run; its assignment
/// order carries no meaning across runs.
fn project_songplays(matched: DataFrame) -> Result<DataFrame> {
    Ok(matched
        .window(vec![row_number().alias("songplay_id")])?
        .select(vec![
            cast(col("songplay_id"), DataType::Int64).alias("songplay_id"),
            col("start_time"),
            part(col("event_date"), "month").alias("month"),
            part(col("event_date"), "year").alias("year"),
            col("userId").alias("user_id"),
            col("level"),
            col("song_id"),
            col("artist_id"),
            col("sessionId").alias("session_id"),
            col("location"),
            col("userAgent").alias("user_agent"),
        ])?)
}

/// Calendar component of `expr` as Int32
fn part(expr: Expr, unit: &str) -> Expr {
    cast(date_part(lit(unit), expr), DataType::Int32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, Int64Array, StringArray, TimestampMillisecondArray};
    use arrow::datatypes::{Field, Schema};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    // 2020-09-13T12:26:40Z, a Sunday
    const TS: i64 = 1_600_000_000_000;

    fn frame(batch: RecordBatch) -> DataFrame {
        SessionContext::new().read_batch(batch).unwrap()
    }

    async fn rows(df: DataFrame) -> Vec<RecordBatch> {
        df.collect().await.unwrap()
    }

    fn row_count(batches: &[RecordBatch]) -> usize {
        batches.iter().map(RecordBatch::num_rows).sum()
    }

    #[tokio::test]
    async fn filter_plays_keeps_next_song_only() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("page", DataType::Utf8, false),
            Field::new("ts", DataType::Int64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec!["NextSong", "Home", "Logout"])),
                Arc::new(Int64Array::from(vec![TS, TS + 1, TS + 2])),
            ],
        )
        .unwrap();

        let plays = rows(filter_plays(frame(batch)).unwrap()).await;
        assert_eq!(row_count(&plays), 1);
    }

    #[tokio::test]
    async fn users_are_deduped_filtered_and_sorted() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("userId", DataType::Utf8, true),
            Field::new("firstName", DataType::Utf8, true),
            Field::new("lastName", DataType::Utf8, true),
            Field::new("gender", DataType::Utf8, true),
            Field::new("level", DataType::Utf8, true),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                Arc::new(StringArray::from(vec![
                    Some("2"),
                    Some("1"),
                    Some("1"),
                    Some("1"),
                    None,
                ])),
                Arc::new(StringArray::from(vec!["Bo", "Al", "Al", "Al", "Nil"])),
                Arc::new(StringArray::from(vec![
                    "Zimmer", "Adams", "Adams", "Adams", "Nobody",
                ])),
                Arc::new(StringArray::from(vec!["M", "F", "F", "F", "M"])),
                Arc::new(StringArray::from(vec![
                    "paid", "free", "free", "paid", "free",
                ])),
            ],
        )
        .unwrap();

        let users = rows(project_users(frame(batch)).unwrap()).await;
        // One row per distinct combination: Adams/free, Adams/paid, Zimmer.
        // The null-id row is dropped.
        assert_eq!(row_count(&users), 3);

        let merged =
            arrow::compute::concat_batches(&users[0].schema(), &users).unwrap();
        let last_names = merged
            .column_by_name("last_name")
            .unwrap()
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(last_names.value(0), "Adams");
        assert_eq!(last_names.value(1), "Adams");
        assert_eq!(last_names.value(2), "Zimmer");
    }

    #[tokio::test]
    async fn time_components_derive_from_timestamp() {
        let schema = Arc::new(Schema::new(vec![Field::new(
            "ts",
            DataType::Int64,
            false,
        )]));
        // The same timestamp twice collapses to one time row.
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(Int64Array::from(vec![TS, TS]))],
        )
        .unwrap();

        let time = project_time(with_event_times(frame(batch)).unwrap()).unwrap();
        let batches = rows(time).await;
        assert_eq!(row_count(&batches), 1);

        let batch = &batches[0];
        let int32 = |name: &str| {
            batch
                .column_by_name(name)
                .unwrap()
                .as_any()
                .downcast_ref::<Int32Array>()
                .unwrap()
                .value(0)
        };
        assert_eq!(int32("hour"), 12);
        assert_eq!(int32("day"), 13);
        assert_eq!(int32("week"), 37);
        assert_eq!(int32("month"), 9);
        assert_eq!(int32("year"), 2020);
        // Sunday
        assert_eq!(int32("weekday"), 1);

        let start = batch
            .column_by_name("start_time")
            .unwrap()
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>()
            .unwrap();
        assert_eq!(start.value(0), TS);
    }

    #[tokio::test]
    async fn catalog_join_recovers_artist_names() {
        let songs_schema = Arc::new(Schema::new(vec![
            Field::new("song_id", DataType::Utf8, false),
            Field::new("title", DataType::Utf8, false),
            Field::new("artist_id", DataType::Utf8, true),
            Field::new("year", DataType::Int32, true),
            Field::new("duration", DataType::Float64, true),
        ]));
        let songs = RecordBatch::try_new(
            songs_schema,
            vec![
                Arc::new(StringArray::from(vec!["S1"])),
                Arc::new(StringArray::from(vec!["Halo"])),
                Arc::new(StringArray::from(vec!["A1"])),
                Arc::new(Int32Array::from(vec![2008])),
                Arc::new(arrow::array::Float64Array::from(vec![210.0])),
            ],
        )
        .unwrap();

        let artists_schema = Arc::new(Schema::new(vec![
            Field::new("artist_id", DataType::Utf8, false),
            Field::new("artist_name", DataType::Utf8, true),
        ]));
        let artists = RecordBatch::try_new(
            artists_schema,
            vec![
                Arc::new(StringArray::from(vec!["A1"])),
                Arc::new(StringArray::from(vec!["Beyonce"])),
            ],
        )
        .unwrap();

        let ctx = SessionContext::new();
        let catalog = catalog_with_artist_names(
            ctx.read_batch(songs).unwrap(),
            ctx.read_batch(artists).unwrap(),
        )
        .unwrap();
        let batches = rows(catalog).await;
        assert_eq!(row_count(&batches), 1);

        let schema = batches[0].schema();
        let names: Vec<&str> = schema
            .fields()
            .iter()
            .map(|f| f.name().as_str())
            .collect();
        assert_eq!(names, vec!["song_id", "title", "artist_id", "artist_name"]);
    }
}
