//! Error types for the resource pool

use crate::handle::ResourceKey;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Pool '{0}' is exhausted - no instances available")]
    Exhausted(ResourceKey),

    #[error("A pool for '{0}' already exists")]
    DuplicatePool(ResourceKey),

    #[error("Metrics export failed: {0}")]
    Metrics(String),
}

pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_pool() {
        let err = PoolError::Exhausted(ResourceKey::from("arrow"));
        assert_eq!(err.to_string(), "Pool 'arrow' is exhausted - no instances available");

        let err = PoolError::DuplicatePool("coin".into());
        assert!(err.to_string().contains("'coin'"));
    }
}
