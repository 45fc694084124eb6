use crate::cache::CompressionCache;
use crate::compressor::{CompressorKind, DEFAULT_LEVEL};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default number of matrix rows per work chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 16;

/// Scheduling configuration for the distance engine.
///
/// The engine never picks a compressor: it compresses with whatever the
/// [`CompressionCache`] it is handed was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rows of the upper triangle handed to one worker task.
    pub chunk_size: usize,
    /// Worker threads; `None` uses the available parallelism.
    pub workers: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            workers: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunk_size must be positive".to_string()));
        }
        if self.workers == Some(0) {
            return Err(Error::InvalidConfig("workers must be positive".to_string()));
        }
        Ok(())
    }

    /// Worker count after resolving the default.
    pub fn resolved_workers(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// Compressor and bound of a [`CompressionCache`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub compressor: CompressorKind,
    pub level: u32,
    /// Bound on cached singleton sizes; `None` keeps every entry.
    pub capacity: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            compressor: CompressorKind::Zlib,
            level: DEFAULT_LEVEL,
            capacity: None,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<()> {
        if self.level > 9 {
            return Err(Error::InvalidConfig(format!(
                "compression level must be in 0..=9, got {}",
                self.level
            )));
        }
        if self.capacity == Some(0) {
            return Err(Error::InvalidConfig("cache capacity must be positive".to_string()));
        }
        Ok(())
    }

    /// Fresh cache bound to the configured compressor.
    pub fn build(&self) -> Result<CompressionCache> {
        self.validate()?;
        let compressor = self.compressor.build(self.level)?;
        Ok(match self.capacity {
            Some(capacity) => CompressionCache::with_capacity_bound(compressor, capacity),
            None => CompressionCache::new(compressor),
        })
    }
}

/// Settings file layout: `{"engine": {...}, "cache": {...}}`, both optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NcdConfig {
    pub engine: EngineConfig,
    pub cache: CacheConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = NcdConfig::default();
        assert!(config.engine.validate().is_ok());
        assert!(config.engine.resolved_workers() >= 1);
        assert_eq!(config.cache.build().unwrap().compressor().name(), "zlib");
    }

    #[test]
    fn test_rejects_zero_chunk_size() {
        let config = EngineConfig {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_cache_rejects_bad_level_and_capacity() {
        let config = CacheConfig {
            level: 12,
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(Error::InvalidConfig(_))));

        let config = CacheConfig {
            capacity: Some(0),
            ..Default::default()
        };
        assert!(matches!(config.build(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_cache_uses_configured_compressor() {
        let config = CacheConfig {
            compressor: CompressorKind::Gzip,
            capacity: Some(8),
            ..Default::default()
        };
        assert_eq!(config.build().unwrap().compressor().name(), "gzip");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: NcdConfig =
            serde_json::from_str(r#"{"cache": {"compressor": "gzip"}, "engine": {"workers": 2}}"#)
                .unwrap();
        assert_eq!(config.cache.compressor, CompressorKind::Gzip);
        assert_eq!(config.cache.level, DEFAULT_LEVEL);
        assert_eq!(config.engine.workers, Some(2));
        assert_eq!(config.engine.chunk_size, DEFAULT_CHUNK_SIZE);
    }
}
