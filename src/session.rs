//! Execution session
//!
//! [`LakeSession`] is a thin wrapper over the DataFusion `SessionContext`.
//! The handle is created once per run and passed explicitly into every
//! pipeline stage; all distributed work (scan, shuffle, join, partitioned
//! write) happens inside the engine. Reads take explicit schemas so a
//! malformed record fails the read instead of bending the schema.

use crate::error::Result;
use crate::storage::StorageRoot;
use arrow::array::UInt64Array;
use arrow::datatypes::{DataType, Schema};
use datafusion::dataframe::DataFrameWriteOptions;
use datafusion::prelude::{DataFrame, NdJsonReadOptions, ParquetReadOptions, SessionContext};

/// Execution-context handle threaded through the pipeline stages
pub struct LakeSession {
    ctx: SessionContext,
}

impl LakeSession {
    /// Create a fresh session
    pub fn new() -> Self {
        Self {
            ctx: SessionContext::new(),
        }
    }

    /// Register a storage root's object store so the engine can reach it
    pub fn register_root(&self, root: &StorageRoot) {
        self.ctx.register_object_store(root.url(), root.store());
    }

    /// Read every newline-delimited `.json` file under `url` with an
    /// explicit schema. Records that do not decode into the schema fail
    /// the scan.
    pub async fn read_json(&self, url: &str, schema: &Schema) -> Result<DataFrame> {
        let options = NdJsonReadOptions::default().schema(schema);
        Ok(self.ctx.read_json(url, options).await?)
    }

    /// Read a persisted Parquet table, restoring typed Hive partition
    /// columns from the directory layout.
    pub async fn read_parquet(
        &self,
        url: &str,
        partition_cols: Vec<(String, DataType)>,
    ) -> Result<DataFrame> {
        let mut options = ParquetReadOptions::default();
        if !partition_cols.is_empty() {
            options = options.table_partition_cols(partition_cols);
        }
        Ok(self.ctx.read_parquet(url, options).await?)
    }

    /// Write a frame as Parquet under `url`, Hive-partitioned by
    /// `partition_by`. Returns the engine-reported row count.
    pub async fn write_parquet(
        &self,
        df: DataFrame,
        url: &str,
        partition_by: Vec<String>,
    ) -> Result<u64> {
        let mut options = DataFrameWriteOptions::new();
        if !partition_by.is_empty() {
            options = options.with_partition_by(partition_by);
        }

        let report = df.write_parquet(url, options, None).await?;
        Ok(written_rows(&report))
    }

    /// The underlying engine context
    pub fn ctx(&self) -> &SessionContext {
        &self.ctx
    }
}

impl Default for LakeSession {
    fn default() -> Self {
        Self::new()
    }
}

/// The write plan reports its row count as a single `count` batch
fn written_rows(report: &[arrow::record_batch::RecordBatch]) -> u64 {
    report
        .iter()
        .filter_map(|batch| {
            batch
                .column_by_name("count")
                .and_then(|col| col.as_any().downcast_ref::<UInt64Array>())
                .map(|arr| arr.iter().flatten().sum::<u64>())
        })
        .sum()
}
