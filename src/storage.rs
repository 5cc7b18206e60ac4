//! Object storage roots
//!
//! A [`StorageRoot`] binds a dataset root URL to the object store that
//! serves it: `s3://bucket/prefix/` (or any S3-compatible endpoint) and
//! plain local paths are supported. The root also implements overwrite mode
//! for table writes: [`StorageRoot::clear_prefix`] deletes every object
//! under a table prefix so a fresh partitioned write fully replaces the
//! previous run's output.

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::model::Table;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use std::sync::Arc;
use url::Url;

/// A dataset root bound to its object store
#[derive(Debug, Clone)]
pub struct StorageRoot {
    /// The store serving this root
    store: Arc<dyn ObjectStore>,
    /// Fully-qualified base URL, always ending in `/`
    url: Url,
}

impl StorageRoot {
    /// Parse a dataset root and build the matching object store
    ///
    /// Supported formats:
    /// - `s3://bucket/prefix/` - Amazon S3 or any S3-compatible endpoint
    /// - `/local/path/` or `file:///local/path/` - local filesystem
    pub fn parse(raw: &str, storage: &StorageConfig) -> Result<Self> {
        if raw.starts_with("s3://") {
            Self::parse_s3(raw, storage)
        } else {
            Self::parse_local(raw)
        }
    }

    fn parse_s3(raw: &str, storage: &StorageConfig) -> Result<Self> {
        let mut url = Url::parse(raw)?;
        let bucket = url
            .host_str()
            .filter(|bucket| !bucket.is_empty())
            .ok_or_else(|| Error::config(format!("Invalid s3 URL (no bucket): {raw}")))?
            .to_string();

        let mut builder = AmazonS3Builder::from_env().with_bucket_name(&bucket);
        if let Some(key) = &storage.aws_access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(secret) = &storage.aws_secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(region) = &storage.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &storage.endpoint {
            builder = builder.with_endpoint(endpoint);
        }
        if storage.allow_http {
            builder = builder.with_allow_http(true);
        }
        let store = builder.build()?;

        if !url.path().ends_with('/') {
            url.set_path(&format!("{}/", url.path()));
        }

        Ok(Self {
            store: Arc::new(store),
            url,
        })
    }

    fn parse_local(raw: &str) -> Result<Self> {
        let path = raw.strip_prefix("file://").unwrap_or(raw);

        // Roots are directories; create so canonicalization succeeds on
        // first use of an output location.
        std::fs::create_dir_all(path)?;
        let canonical = std::fs::canonicalize(path)?;
        let url = Url::from_directory_path(&canonical).map_err(|()| {
            Error::config(format!("Not an absolute path: {}", canonical.display()))
        })?;

        Ok(Self {
            store: Arc::new(LocalFileSystem::new()),
            url,
        })
    }

    /// The root URL, ending in `/`
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The object store serving this root
    pub fn store(&self) -> Arc<dyn ObjectStore> {
        Arc::clone(&self.store)
    }

    /// Join a relative dataset or table path onto the root.
    /// `rel` should end in `/` when it names a directory.
    pub fn join(&self, rel: &str) -> Result<Url> {
        Ok(self.url.join(rel)?)
    }

    /// URL of one output table's directory under this root
    pub fn table_url(&self, table: Table) -> Result<Url> {
        self.join(&format!("{}/", table.name()))
    }

    /// Delete every object under `subpath`, returning how many were removed.
    ///
    /// A missing prefix is not an error: clearing a table that has never
    /// been written removes nothing.
    pub async fn clear_prefix(&self, subpath: &str) -> Result<usize> {
        let prefix = self.object_path(subpath)?;
        let locations = self
            .store
            .list(Some(&prefix))
            .map_ok(|meta| meta.location)
            .boxed();

        match self
            .store
            .delete_stream(locations)
            .try_collect::<Vec<_>>()
            .await
        {
            Ok(deleted) => Ok(deleted.len()),
            Err(object_store::Error::NotFound { .. }) => Ok(0),
            Err(e) => Err(e.into()),
        }
    }

    /// Store-relative path of a location under this root
    fn object_path(&self, subpath: &str) -> Result<ObjectPath> {
        let joined = self.join(subpath)?;
        ObjectPath::from_url_path(joined.path())
            .map_err(|e| Error::storage(format!("Invalid object path '{subpath}': {e}")))
    }
}
