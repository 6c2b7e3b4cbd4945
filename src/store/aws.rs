//! AWS Secrets Manager and S3 stores.
//!
//! Clients are built from the default credential chain. Retries are handled
//! by the SDK's standard retry mode, not by the batch fetcher.

use super::{ObjectStore, SecretRequest, SecretStore, StoreProvider, StoreResult};
use crate::error::StoreError;
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_secretsmanager::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_secretsmanager::types::{Filter, FilterNameStringType};
use std::sync::Arc;
use tracing::debug;

/// Attempts per request, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

const NOT_FOUND_CODES: &[&str] = &["ResourceNotFoundException", "NoSuchKey", "NoSuchBucket"];
const ACCESS_DENIED_CODES: &[&str] = &["AccessDeniedException", "AccessDenied"];

/// Provider building AWS clients per region hint.
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsStores;

impl AwsStores {
    pub fn new() -> Self {
        Self
    }

    async fn load_config(&self, region: Option<&str>) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .retry_config(RetryConfig::standard().with_max_attempts(DEFAULT_MAX_ATTEMPTS));
        if let Some(region) = region {
            loader = loader.region(Region::new(region.to_string()));
        }
        loader.load().await
    }
}

#[async_trait]
impl StoreProvider for AwsStores {
    async fn secret_store(&self, region: Option<&str>) -> StoreResult<Arc<dyn SecretStore>> {
        let config = self.load_config(region).await;
        debug!(region = ?config.region(), "Built Secrets Manager client");
        Ok(Arc::new(AwsSecretStore {
            client: aws_sdk_secretsmanager::Client::new(&config),
        }))
    }

    async fn object_store(&self, region: Option<&str>) -> StoreResult<Arc<dyn ObjectStore>> {
        let config = self.load_config(region).await;
        debug!(region = ?config.region(), "Built S3 client");
        Ok(Arc::new(AwsObjectStore {
            client: aws_sdk_s3::Client::new(&config),
        }))
    }
}

/// Secrets Manager backed [`SecretStore`].
#[derive(Debug, Clone)]
pub struct AwsSecretStore {
    client: aws_sdk_secretsmanager::Client,
}

#[async_trait]
impl SecretStore for AwsSecretStore {
    async fn get_secret_value(&self, request: &SecretRequest) -> StoreResult<String> {
        let output = self
            .client
            .get_secret_value()
            .secret_id(&request.secret_id)
            .set_version_stage(request.version.stage.clone())
            .set_version_id(request.version.id.clone())
            .send()
            .await
            .map_err(|err| classify(&request.secret_id, err))?;

        output
            .secret_string()
            .map(str::to_string)
            .ok_or_else(|| StoreError::Unsupported(request.secret_id.clone()))
    }

    async fn list_secrets_by_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        let mut names = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let filter = Filter::builder()
                .key(FilterNameStringType::Name)
                .values(prefix)
                .build();
            let response = self
                .client
                .list_secrets()
                .filters(filter)
                .set_next_token(token.take())
                .send()
                .await
                .map_err(|err| classify(prefix, err))?;

            // The name filter is not strictly a prefix match.
            names.extend(
                response
                    .secret_list()
                    .iter()
                    .filter_map(|entry| entry.name())
                    .filter(|name| name.starts_with(prefix))
                    .map(str::to_string),
            );

            match response.next_token() {
                Some(next) => token = Some(next.to_string()),
                None => break,
            }
        }

        debug!(prefix, count = names.len(), "Listed secrets");
        Ok(names)
    }
}

/// S3 backed [`ObjectStore`].
#[derive(Debug, Clone)]
pub struct AwsObjectStore {
    client: aws_sdk_s3::Client,
}

#[async_trait]
impl ObjectStore for AwsObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<Vec<u8>> {
        let location = format!("s3://{bucket}/{key}");
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| classify(&location, err))?;

        let body = output
            .body
            .collect()
            .await
            .map_err(|err| StoreError::Client(format!("reading {location}: {err}")))?;
        Ok(body.into_bytes().to_vec())
    }
}

/// Map an SDK error onto the store taxonomy by its service error code.
fn classify<E, R>(target: &str, err: SdkError<E, R>) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    if let SdkError::ServiceError(context) = &err {
        let code = context.err().code();
        if code.is_some_and(|c| NOT_FOUND_CODES.contains(&c)) {
            return StoreError::NotFound(target.to_string());
        }
        if code.is_some_and(|c| ACCESS_DENIED_CODES.contains(&c)) {
            return StoreError::AccessDenied(target.to_string());
        }
    }
    StoreError::Client(DisplayErrorContext(&err).to_string())
}
