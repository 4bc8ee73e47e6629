use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CacheSetBody {
    pub value: String,
    /// Seconds; the configured default when absent.
    pub ttl: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CacheEntryView {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CacheSetResponse {
    pub key: String,
    pub ttl: u64,
}

#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CacheDeleteResponse {
    pub deleted: bool,
}
