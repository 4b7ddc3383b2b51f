//! Object storage backed by [`object_store`]
//!
//! The stage handlers read from the pipeline's artifact bucket and write to a
//! script bucket, so stores are opened per bucket and cached for the life of
//! the process.

use async_trait::async_trait;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use crate::AwsConfig;
use crate::error::Result;

/// Object storage operations used by the stage handlers
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Downloads an object to a local file
    ///
    /// # Returns
    /// Number of bytes written
    async fn download(&self, bucket: &str, key: &str, destination: &Path) -> Result<u64>;

    /// Uploads a local file as an object
    async fn upload(&self, source: &Path, bucket: &str, key: &str) -> Result<()>;
}

/// Opens an [`ObjectStore`] for a bucket name
pub type StoreConnector = Box<dyn Fn(&str) -> Result<Arc<dyn ObjectStore>> + Send + Sync>;

/// [`ObjectStorage`] over one cached [`ObjectStore`] per bucket
pub struct BucketStorage {
    connect: StoreConnector,
    stores: Mutex<HashMap<String, Arc<dyn ObjectStore>>>,
}

impl BucketStorage {
    /// S3 storage using the shared AWS configuration
    pub fn s3(config: &AwsConfig) -> Self {
        let config = config.clone();

        Self::with_connector(Box::new(move |bucket| {
            let mut builder = AmazonS3Builder::new()
                .with_bucket_name(bucket)
                .with_region(&config.region)
                .with_access_key_id(&config.credentials.access_key_id)
                .with_secret_access_key(&config.credentials.secret_access_key);

            if let Some(token) = &config.credentials.session_token {
                builder = builder.with_token(token);
            }

            if let Some(endpoint) = &config.endpoint_url {
                builder = builder
                    .with_endpoint(endpoint)
                    .with_virtual_hosted_style_request(false);
                if endpoint.starts_with("http://") {
                    builder = builder.with_allow_http(true);
                }
            }

            Ok(Arc::new(builder.build()?) as Arc<dyn ObjectStore>)
        }))
    }

    /// Storage with a custom connector, e.g. in-memory stores for tests
    pub fn with_connector(connect: StoreConnector) -> Self {
        Self {
            connect,
            stores: Mutex::new(HashMap::new()),
        }
    }

    fn store(&self, bucket: &str) -> Result<Arc<dyn ObjectStore>> {
        let mut stores = self.stores.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(store) = stores.get(bucket) {
            return Ok(Arc::clone(store));
        }

        debug!("Opening object store for bucket {}", bucket);
        let store = (self.connect)(bucket)?;
        stores.insert(bucket.to_string(), Arc::clone(&store));
        Ok(store)
    }
}

#[async_trait]
impl ObjectStorage for BucketStorage {
    async fn download(&self, bucket: &str, key: &str, destination: &Path) -> Result<u64> {
        let store = self.store(bucket)?;

        let bytes = store.get(&ObjectPath::from(key)).await?.bytes().await?;
        tokio::fs::write(destination, &bytes).await?;

        info!(
            "Downloaded s3://{}/{} ({} bytes) to {}",
            bucket,
            key,
            bytes.len(),
            destination.display()
        );
        Ok(bytes.len() as u64)
    }

    async fn upload(&self, source: &Path, bucket: &str, key: &str) -> Result<()> {
        let store = self.store(bucket)?;

        let contents = tokio::fs::read(source).await?;
        let size = contents.len();
        store
            .put(&ObjectPath::from(key), PutPayload::from(contents))
            .await?;

        info!(
            "Uploaded {} ({} bytes) to s3://{}/{}",
            source.display(),
            size,
            bucket,
            key
        );
        Ok(())
    }
}
