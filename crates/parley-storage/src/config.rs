use serde::{Deserialize, Serialize};

/// Connection settings for the backing document store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub region: String,
    pub bucket: String,
    #[serde(default)]
    pub credentials: CredentialSource,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialSource {
    Inline {
        access_key_id: String,
        secret_access_key: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        session_token: Option<String>,
    },
    Profile {
        profile_name: String,
    },
    #[default]
    DefaultChain,
}
