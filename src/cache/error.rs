use thiserror::Error;

pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    RedisError(#[from] redis::RedisError),
    #[error("json error: {0}")]
    SerdeError(#[from] serde_json::Error),
    #[error("ttl must be between one second and thirty days")]
    InvalidTtl,
}
