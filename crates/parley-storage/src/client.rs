//! Process-wide shared S3 client.
//!
//! Every history instance in a process reuses one client. Initialization is
//! guarded by a `OnceCell`: concurrent first callers await the same
//! initialization instead of racing a check-then-create.

use aws_sdk_s3::Client;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config::{CredentialSource, StoreConfig};
use crate::error::StorageError;

static CLIENT: OnceCell<Client> = OnceCell::const_new();

/// Resolve the shared client, building and verifying it on first use.
///
/// The first caller's config wins; later callers reuse the established
/// client regardless of the config they pass.
pub async fn shared(config: &StoreConfig) -> Result<Client, StorageError> {
    let client = CLIENT
        .get_or_try_init(|| connect(config))
        .await?;
    Ok(client.clone())
}

/// Build a fresh client and verify the bucket is reachable.
pub async fn connect(config: &StoreConfig) -> Result<Client, StorageError> {
    if config.bucket.is_empty() {
        return Err(StorageError::Connection("bucket name is empty".to_string()));
    }

    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    match &config.credentials {
        CredentialSource::Inline {
            access_key_id,
            secret_access_key,
            session_token,
        } => {
            builder = builder.credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key_id,
                secret_access_key,
                session_token.clone(),
                None,
                "parley-config",
            ));
        }
        CredentialSource::Profile { profile_name } => {
            builder = builder.profile_name(profile_name);
        }
        CredentialSource::DefaultChain => {}
    }

    let sdk_config = builder.load().await;
    let client = Client::new(&sdk_config);

    client
        .head_bucket()
        .bucket(&config.bucket)
        .send()
        .await
        .map_err(|e| StorageError::Connection(e.into_service_error().to_string()))?;

    info!(bucket = %config.bucket, region = %config.region, "document store connected");

    Ok(client)
}
