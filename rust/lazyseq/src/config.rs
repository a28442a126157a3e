//! Tuning knobs for materializer nodes.

use lazyseq_common::{Error, Result};
use lazyseq_index_cache::CachePolicy;

/// Default maximum sequence length for which per-index caches are allocated densely.
pub const DENSE_CACHE_LIMIT: usize = 4096;

/// Default fraction of a known size that a sparse cache must reach before it is
/// converted to a dense one.
pub const SPARSE_PROMOTION_RATIO: f64 = 0.5;

/// Default initial capacity of growing buffers.
pub const BUFFER_RESERVE: usize = 16;

/// Configuration shared by the nodes created through a [`Seq`](crate::Seq) handle.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializeConfig {
    /// Per-index caches of map-like nodes are pre-sized densely when the upstream
    /// size is known and does not exceed this limit.
    pub dense_cache_limit: usize,
    /// A sparse per-index cache switches to dense storage once it holds at least
    /// this fraction of the known upstream size.
    pub sparse_promotion_ratio: f64,
    /// Initial capacity of the buffers used by filter-like nodes and iterator sources.
    pub buffer_reserve: usize,
}

impl Default for MaterializeConfig {
    fn default() -> Self {
        MaterializeConfig {
            dense_cache_limit: DENSE_CACHE_LIMIT,
            sparse_promotion_ratio: SPARSE_PROMOTION_RATIO,
            buffer_reserve: BUFFER_RESERVE,
        }
    }
}

impl MaterializeConfig {
    pub fn with_dense_cache_limit(mut self, limit: usize) -> Self {
        self.dense_cache_limit = limit;
        self
    }

    pub fn with_sparse_promotion_ratio(mut self, ratio: f64) -> Self {
        self.sparse_promotion_ratio = ratio;
        self
    }

    pub fn with_buffer_reserve(mut self, reserve: usize) -> Self {
        self.buffer_reserve = reserve;
        self
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if !self.sparse_promotion_ratio.is_finite() || self.sparse_promotion_ratio <= 0.0 {
            return Err(Error::invalid_arg(
                "sparse_promotion_ratio",
                format!(
                    "must be a positive number, got {}",
                    self.sparse_promotion_ratio
                ),
            ));
        }
        if self.buffer_reserve > isize::MAX as usize {
            return Err(Error::invalid_arg(
                "buffer_reserve",
                "must not exceed isize::MAX",
            ));
        }
        Ok(())
    }

    /// Returns the policy for per-index caches built under this configuration.
    pub fn cache_policy(&self) -> CachePolicy {
        CachePolicy {
            dense_limit: self.dense_cache_limit,
            promotion_ratio: self.sparse_promotion_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = MaterializeConfig::default();
        config.validate().unwrap();
        assert_eq!(config.cache_policy(), CachePolicy::default());
    }

    #[test]
    fn test_builders() {
        let config = MaterializeConfig::default()
            .with_dense_cache_limit(8)
            .with_sparse_promotion_ratio(0.75)
            .with_buffer_reserve(0);
        config.validate().unwrap();
        assert_eq!(config.cache_policy().dense_limit, 8);
        assert_eq!(config.cache_policy().promotion_ratio, 0.75);
        assert_eq!(config.buffer_reserve, 0);
    }

    #[test]
    fn test_invalid_ratio() {
        for ratio in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = MaterializeConfig::default()
                .with_sparse_promotion_ratio(ratio)
                .validate()
                .unwrap_err();
            assert!(err.to_string().contains("sparse_promotion_ratio"));
        }
    }
}
