//! Star-schema table model and raw input schemas
//!
//! The five output tables are fixed: one fact table (`songplays`) and four
//! dimensions (`songs`, `artists`, `users`, `time`). Each table owns its
//! name, the pipeline stage that produces it, and its Hive partition
//! columns. Raw input schemas are declared explicitly so the JSON reader
//! fails fast on records that do not match the expected shape instead of
//! inferring a drifting schema per run.

use arrow::datatypes::{DataType, Field, Schema, TimeUnit};

/// An output table of the star schema
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    /// One row per song in the catalog
    Songs,
    /// One row per artist in the catalog
    Artists,
    /// One row per distinct user row observed in play events
    Users,
    /// One row per distinct play-event timestamp
    Time,
    /// Fact table: one row per play event matched to the catalog
    Songplays,
}

impl Table {
    /// Table name, also the output directory name under the output root
    pub fn name(&self) -> &'static str {
        match self {
            Table::Songs => "songs",
            Table::Artists => "artists",
            Table::Users => "users",
            Table::Time => "time",
            Table::Songplays => "songplays",
        }
    }

    /// Name of the pipeline stage that writes this table
    pub fn stage(&self) -> &'static str {
        match self {
            Table::Songs | Table::Artists => "song-catalog",
            Table::Users | Table::Time | Table::Songplays => "event-log",
        }
    }

    /// Hive partition columns with the types they are restored to on read.
    /// Partition values live in directory names, not in the Parquet files,
    /// so re-reads must declare them.
    pub fn partition_cols(&self) -> Vec<(String, DataType)> {
        match self {
            Table::Songs => vec![
                ("year".to_string(), DataType::Int32),
                ("artist_id".to_string(), DataType::Utf8),
            ],
            Table::Time | Table::Songplays => vec![
                ("year".to_string(), DataType::Int32),
                ("month".to_string(), DataType::Int32),
            ],
            Table::Artists | Table::Users => vec![],
        }
    }

    /// Partition column names, in write order
    pub fn partition_names(&self) -> Vec<String> {
        self.partition_cols().into_iter().map(|(name, _)| name).collect()
    }
}

/// Timestamp type used for `start_time`
pub fn start_time_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, None)
}

/// Schema of raw song-metadata records (one JSON object per file).
///
/// `song_id`, `title`, `year` and `duration` are required; a record missing
/// any of them fails the catalog stage. `artist_id` is nullable because
/// null-artist rows are filtered out of `artists` rather than rejected.
pub fn song_schema() -> Schema {
    Schema::new(vec![
        Field::new("song_id", DataType::Utf8, false),
        Field::new("title", DataType::Utf8, false),
        Field::new("artist_id", DataType::Utf8, true),
        Field::new("artist_name", DataType::Utf8, true),
        Field::new("artist_location", DataType::Utf8, true),
        Field::new("artist_latitude", DataType::Float64, true),
        Field::new("artist_longitude", DataType::Float64, true),
        Field::new("year", DataType::Int32, false),
        Field::new("duration", DataType::Float64, false),
    ])
}

/// Schema of raw activity-log records (newline-delimited JSON).
///
/// `page` and `ts` are required by every downstream step. The remaining
/// columns are nullable; null `userId` rows are filtered out of `users`.
/// Fields present in raw logs but absent here (`auth`, `itemInSession`,
/// `status`, ...) are ignored by the reader.
pub fn event_schema() -> Schema {
    Schema::new(vec![
        Field::new("userId", DataType::Utf8, true),
        Field::new("firstName", DataType::Utf8, true),
        Field::new("lastName", DataType::Utf8, true),
        Field::new("gender", DataType::Utf8, true),
        Field::new("level", DataType::Utf8, true),
        Field::new("page", DataType::Utf8, false),
        Field::new("ts", DataType::Int64, false),
        Field::new("artist", DataType::Utf8, true),
        Field::new("song", DataType::Utf8, true),
        Field::new("sessionId", DataType::Int64, true),
        Field::new("location", DataType::Utf8, true),
        Field::new("userAgent", DataType::Utf8, true),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Table::Songs, "songs", "song-catalog")]
    #[test_case(Table::Artists, "artists", "song-catalog")]
    #[test_case(Table::Users, "users", "event-log")]
    #[test_case(Table::Time, "time", "event-log")]
    #[test_case(Table::Songplays, "songplays", "event-log")]
    fn table_names_and_stages(table: Table, name: &str, stage: &str) {
        assert_eq!(table.name(), name);
        assert_eq!(table.stage(), stage);
    }

    #[test_case(Table::Songs, &["year", "artist_id"])]
    #[test_case(Table::Time, &["year", "month"])]
    #[test_case(Table::Songplays, &["year", "month"])]
    #[test_case(Table::Artists, &[])]
    #[test_case(Table::Users, &[])]
    fn partition_layout(table: Table, expected: &[&str]) {
        assert_eq!(table.partition_names(), expected);
    }

    #[test]
    fn song_schema_requires_key_fields() {
        let schema = song_schema();
        assert!(!schema.field_with_name("song_id").unwrap().is_nullable());
        assert!(!schema.field_with_name("title").unwrap().is_nullable());
        assert!(schema.field_with_name("artist_id").unwrap().is_nullable());
        assert_eq!(
            schema.field_with_name("duration").unwrap().data_type(),
            &DataType::Float64
        );
    }

    #[test]
    fn event_schema_requires_page_and_ts() {
        let schema = event_schema();
        assert!(!schema.field_with_name("page").unwrap().is_nullable());
        assert_eq!(
            schema.field_with_name("ts").unwrap().data_type(),
            &DataType::Int64
        );
        assert!(schema.field_with_name("userId").unwrap().is_nullable());
    }
}
