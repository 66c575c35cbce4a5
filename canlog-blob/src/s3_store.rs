use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::{primitives::ByteStream as AwsByteStream, Client};
use bytes::{Bytes, BytesMut};
use std::env;
use tracing::{debug, instrument};

use crate::store::once_stream;
use crate::{BlobError, BlobResult, BlockId, BlockStore, ByteStream};

/// Key prefix under which staged blocks are kept until their object commits
const BLOCKS_PREFIX: &str = "__blocks";

/// S3-compatible connection settings
#[derive(Debug, Clone)]
pub struct S3Config {
    pub region: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

impl S3Config {
    /// Read `CANLOG_S3_*` environment variables
    pub fn from_env() -> BlobResult<Self> {
        fn get_env(key: &str) -> BlobResult<String> {
            env::var(key).map_err(|_| BlobError::invalid(format!("{} environment variable required", key)))
        }

        Ok(Self {
            region: env::var("CANLOG_S3_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            access_key_id: get_env("CANLOG_S3_ACCESS_KEY_ID")?,
            secret_access_key: get_env("CANLOG_S3_SECRET_ACCESS_KEY")?,
            endpoint_url: env::var("CANLOG_S3_ENDPOINT_URL").ok(),
            force_path_style: env::var("CANLOG_S3_FORCE_PATH_STYLE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(true),
        })
    }
}

/// Block store over an S3-compatible service.
///
/// Containers map to buckets. S3 has no uncommitted-block pool, so blocks are staged
/// as ordinary objects under `__blocks/<object>/<block_id>` and a commit assembles
/// them into `<object>` before deleting them.
#[derive(Clone)]
pub struct S3BlockStore {
    client: Client,
}

impl S3BlockStore {
    pub async fn new(config: S3Config) -> Self {
        Self {
            client: Self::create_client(config).await,
        }
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn create_client(config: S3Config) -> Client {
        let credentials = Credentials::new(
            config.access_key_id,
            config.secret_access_key,
            None,
            None,
            "canlog",
        );

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region))
            .credentials_provider(credentials);
        if let Some(endpoint) = config.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let aws_config = loader.load().await;

        Client::from_conf(
            aws_sdk_s3::config::Builder::from(&aws_config)
                .force_path_style(config.force_path_style)
                .build(),
        )
    }

    fn blocks_prefix(object: &str) -> String {
        format!("{}/{}/", BLOCKS_PREFIX, object)
    }

    fn block_key(object: &str, block_id: &BlockId) -> String {
        format!("{}{}", Self::blocks_prefix(object), block_id)
    }

    fn map_aws_error(err: impl std::error::Error + Send + Sync + 'static) -> BlobError {
        BlobError::backend(err)
    }

    async fn list_keys(&self, bucket: &str, prefix: &str) -> BlobResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation: Option<String> = None;
        loop {
            let result = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(prefix)
                .set_continuation_token(continuation.take())
                .send()
                .await
                .map_err(Self::map_aws_error)?;

            if let Some(objects) = result.contents {
                keys.extend(objects.into_iter().filter_map(|object| object.key));
            }
            match result.next_continuation_token {
                Some(token) => continuation = Some(token),
                None => break,
            }
        }
        Ok(keys)
    }

    async fn get_bytes(&self, bucket: &str, key: &str) -> BlobResult<Bytes> {
        let result = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().map_or(false, |e| e.is_no_such_key()) {
                    BlobError::not_found(key)
                } else {
                    Self::map_aws_error(err)
                }
            })?;
        let body = result.body.collect().await.map_err(Self::map_aws_error)?;
        Ok(body.into_bytes())
    }

    async fn put_bytes(&self, bucket: &str, key: &str, data: Bytes) -> BlobResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(AwsByteStream::from(data))
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        Ok(())
    }

    async fn delete_key(&self, bucket: &str, key: &str) -> BlobResult<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        Ok(())
    }

    async fn delete_blocks(&self, bucket: &str, object: &str) -> BlobResult<usize> {
        let keys = self.list_keys(bucket, &Self::blocks_prefix(object)).await?;
        for key in &keys {
            self.delete_key(bucket, key).await?;
        }
        Ok(keys.len())
    }
}

#[async_trait]
impl BlockStore for S3BlockStore {
    async fn create_container(&self, container: &str) -> BlobResult<()> {
        match self.client.create_bucket().bucket(container).send().await {
            Ok(_) => Ok(()),
            Err(err)
                if err.as_service_error().map_or(false, |e| {
                    e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists()
                }) =>
            {
                Ok(())
            }
            Err(err) => Err(Self::map_aws_error(err)),
        }
    }

    #[instrument(skip(self, data), fields(len = data.len()))]
    async fn stage_block(
        &self,
        container: &str,
        object: &str,
        block_id: &BlockId,
        data: Bytes,
    ) -> BlobResult<()> {
        self.put_bytes(container, &Self::block_key(object, block_id), data).await
    }

    async fn list_uncommitted_blocks(&self, container: &str, object: &str) -> BlobResult<Vec<BlockId>> {
        let prefix = Self::blocks_prefix(object);
        let mut ids: Vec<BlockId> = self
            .list_keys(container, &prefix)
            .await?
            .into_iter()
            .filter_map(|key| {
                let id = key.strip_prefix(&prefix)?;
                // Blocks of a nested object name share this prefix
                (!id.contains('/')).then(|| BlockId::from_raw(id))
            })
            .collect();
        ids.sort();
        Ok(ids)
    }

    #[instrument(skip(self, block_ids), fields(blocks = block_ids.len()))]
    async fn commit_block_list(
        &self,
        container: &str,
        object: &str,
        block_ids: &[BlockId],
    ) -> BlobResult<()> {
        let mut content = BytesMut::new();
        for id in block_ids {
            let data = self
                .get_bytes(container, &Self::block_key(object, id))
                .await
                .map_err(|err| match err {
                    BlobError::NotFound { .. } => {
                        BlobError::invalid(format!("unknown block id {id} for {object}"))
                    }
                    other => other,
                })?;
            content.extend_from_slice(&data);
        }

        self.put_bytes(container, object, content.freeze()).await?;
        let removed = self.delete_blocks(container, object).await?;
        debug!(removed, "assembled staged blocks");
        Ok(())
    }

    async fn copy_object(&self, container: &str, source: &str, destination: &str) -> BlobResult<()> {
        self.client
            .copy_object()
            .bucket(container)
            .copy_source(format!("{}/{}", container, source))
            .key(destination)
            .send()
            .await
            .map_err(Self::map_aws_error)?;
        Ok(())
    }

    async fn delete_object(&self, container: &str, object: &str) -> BlobResult<()> {
        self.delete_blocks(container, object).await?;
        self.delete_key(container, object).await
    }

    async fn read_object(&self, container: &str, object: &str) -> BlobResult<ByteStream> {
        let data = self.get_bytes(container, object).await?;
        Ok(once_stream(data))
    }

    async fn list_objects(&self, container: &str, prefix: &str) -> BlobResult<Vec<String>> {
        let blocks = format!("{}/", BLOCKS_PREFIX);
        let mut names: Vec<String> = self
            .list_keys(container, prefix)
            .await?
            .into_iter()
            .filter(|key| !key.starts_with(&blocks))
            .collect();
        names.sort();
        Ok(names)
    }
}
