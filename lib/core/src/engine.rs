//! Normalized Compression Distance engine
//!
//! Splits the upper triangle of the N×N matrix into row bands, computes each
//! band on a rayon pool and merges the bands once every task has joined:
//!
//! ```text
//! C(x)     = compressed size of x (cached, once per item)
//! C(xy)    = compressed size of x ++ y (never cached)
//! NCD(x,y) = (C(xy) - min(C(x), C(y))) / max(C(x), C(y))
//! ```

use crate::cache::{CacheStats, CompressionCache};
use crate::compressor::Compressor;
use crate::config::EngineConfig;
use crate::item::Item;
use crate::matrix::DistanceMatrix;
use crate::{Error, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// A contiguous band of matrix rows `start..end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub start: usize,
    pub end: usize,
}

impl Chunk {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Upper-triangle rows computed by one chunk task. `rows[k]` holds the
/// distances from row `start + k` to every later index.
#[derive(Debug)]
struct ChunkResult {
    start: usize,
    rows: Vec<Vec<f64>>,
}

/// Summary of one matrix computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeStats {
    /// Name of the compressor the cache was built with.
    pub compressor: String,
    pub items: usize,
    pub pairs: usize,
    pub chunks: usize,
    pub chunk_size: usize,
    pub workers: usize,
    pub elapsed_ms: f64,
    /// Cache activity during this computation only.
    pub cache: CacheStats,
    /// Total compressed size of the items over their total raw size.
    pub compression_ratio: f64,
}

/// Split rows `0..n-1` into bands of at most `chunk_size` rows. The last row
/// has no pairs above the diagonal and is never scheduled.
pub fn plan_chunks(n: usize, chunk_size: usize) -> Vec<Chunk> {
    let rows = n.saturating_sub(1);
    let chunk_size = chunk_size.max(1);
    (0..rows)
        .step_by(chunk_size)
        .map(|start| Chunk {
            start,
            end: (start + chunk_size).min(rows),
        })
        .collect()
}

/// NCD from the three compressed sizes.
#[inline]
pub fn ncd(cx: usize, cy: usize, cxy: usize) -> f64 {
    let (lo, hi) = if cx <= cy { (cx, cy) } else { (cy, cx) };
    (cxy as f64 - lo as f64) / hi as f64
}

/// Distance engine; cheap to construct, holds only its configuration.
#[derive(Debug, Clone, Default)]
pub struct NcdEngine {
    config: EngineConfig,
}

impl NcdEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Compute the distance matrix of `items`, compressing with the
    /// compressor `cache` is bound to.
    pub fn compute(&self, items: &[Item], cache: &CompressionCache) -> Result<DistanceMatrix> {
        self.compute_with_stats(items, cache).map(|(matrix, _)| matrix)
    }

    /// Compute the distance matrix together with run statistics.
    ///
    /// Any failure aborts the whole computation; no partial matrix is
    /// returned.
    pub fn compute_with_stats(
        &self,
        items: &[Item],
        cache: &CompressionCache,
    ) -> Result<(DistanceMatrix, ComputeStats)> {
        let n = items.len();
        if n < 2 {
            return Err(Error::InsufficientItems { found: n });
        }

        let started = Instant::now();
        let cache_before = cache.stats();
        let workers = self.config.resolved_workers();
        let chunks = plan_chunks(n, self.config.chunk_size);
        let pairs = n * (n - 1) / 2;

        info!(
            "Computing NCD matrix: {} items, {} pairs, {} chunks on {} workers ({})",
            n,
            pairs,
            chunks.len(),
            workers,
            cache.compressor().name()
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("ncd-worker-{}", i))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("worker pool: {}", e)))?;

        let (sizes, results) = pool.install(|| -> Result<(Vec<usize>, Vec<ChunkResult>)> {
            let sizes = items
                .par_iter()
                .map(|item| cache.size_of(item.content()))
                .collect::<Result<Vec<usize>>>()?;

            if let Some(pos) = sizes.iter().position(|&s| s == 0) {
                return Err(Error::DegenerateItem {
                    label: items[pos].label().to_string(),
                });
            }

            let compressor = cache.compressor().as_ref();
            let results = chunks
                .par_iter()
                .map(|chunk| compute_chunk(*chunk, items, &sizes, compressor))
                .collect::<Result<Vec<ChunkResult>>>()?;
            Ok((sizes, results))
        })?;

        let labels = items.iter().map(|item| item.label().to_string()).collect();
        let mut matrix = DistanceMatrix::zeros(labels);
        for result in results {
            for (k, row) in result.rows.into_iter().enumerate() {
                let i = result.start + k;
                for (offset, value) in row.into_iter().enumerate() {
                    matrix.set(i, i + 1 + offset, value);
                }
            }
        }
        matrix.mirror_upper();

        let cache_after = cache.stats();
        let raw_total: usize = items.iter().map(|item| item.content().len()).sum();
        let compressed_total: usize = sizes.iter().sum();
        let stats = ComputeStats {
            compressor: cache.compressor().name().to_string(),
            items: n,
            pairs,
            chunks: chunks.len(),
            chunk_size: self.config.chunk_size,
            workers,
            elapsed_ms: started.elapsed().as_secs_f64() * 1000.0,
            cache: CacheStats {
                hits: cache_after.hits - cache_before.hits,
                misses: cache_after.misses - cache_before.misses,
                evictions: cache_after.evictions - cache_before.evictions,
                entries: cache_after.entries,
            },
            compression_ratio: if raw_total == 0 {
                0.0
            } else {
                compressed_total as f64 / raw_total as f64
            },
        };

        info!(
            "NCD matrix done in {:.1}ms (cache hits {}, misses {})",
            stats.elapsed_ms, stats.cache.hits, stats.cache.misses
        );
        Ok((matrix, stats))
    }
}

fn compute_chunk(
    chunk: Chunk,
    items: &[Item],
    sizes: &[usize],
    compressor: &dyn Compressor,
) -> Result<ChunkResult> {
    let n = items.len();
    let mut rows = Vec::with_capacity(chunk.len());
    let mut buffer = Vec::new();

    for i in chunk.start..chunk.end {
        let x = items[i].content().as_bytes();
        let mut row = Vec::with_capacity(n - i - 1);
        for j in (i + 1)..n {
            buffer.clear();
            buffer.extend_from_slice(x);
            buffer.extend_from_slice(items[j].content().as_bytes());
            let cxy = compressor.compressed_len(&buffer)?;
            row.push(ncd(sizes[i], sizes[j], cxy));
        }
        rows.push(row);
    }

    debug!("Chunk {}..{} done", chunk.start, chunk.end);
    Ok(ChunkResult {
        start: chunk.start,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compressor::FlateCompressor;
    use std::sync::Arc;

    fn items(contents: &[&str]) -> Vec<Item> {
        contents
            .iter()
            .enumerate()
            .map(|(i, c)| Item::new(i, format!("item{}", i), *c))
            .collect()
    }

    fn engine(chunk_size: usize, workers: usize) -> NcdEngine {
        NcdEngine::new(EngineConfig {
            chunk_size,
            workers: Some(workers),
            ..Default::default()
        })
        .unwrap()
    }

    fn cache() -> CompressionCache {
        CompressionCache::new(Arc::new(FlateCompressor::default()))
    }

    #[test]
    fn test_plan_chunks_covers_upper_rows() {
        let chunks = plan_chunks(10, 4);
        assert_eq!(
            chunks,
            vec![
                Chunk { start: 0, end: 4 },
                Chunk { start: 4, end: 8 },
                Chunk { start: 8, end: 9 },
            ]
        );
        assert!(plan_chunks(1, 4).is_empty());
        assert_eq!(plan_chunks(2, 100), vec![Chunk { start: 0, end: 1 }]);
    }

    #[test]
    fn test_ncd_formula() {
        assert_eq!(ncd(10, 20, 25), 0.75);
        assert_eq!(ncd(20, 10, 25), 0.75);
    }

    #[test]
    fn test_insufficient_items() {
        let result = engine(4, 2).compute(&items(&["1,2,3"]), &cache());
        assert!(matches!(result, Err(Error::InsufficientItems { found: 1 })));
        let result = engine(4, 2).compute(&[], &cache());
        assert!(matches!(result, Err(Error::InsufficientItems { found: 0 })));
    }

    #[test]
    fn test_matrix_invariants() {
        let items = items(&["1,2,3,4,5", "5,4,3,2,1", "1,2,3,4,5", "10,20,30"]);
        let (matrix, stats) = engine(1, 3).compute_with_stats(&items, &cache()).unwrap();

        assert_eq!(matrix.len(), 4);
        assert!(matrix.is_symmetric());
        for i in 0..4 {
            assert_eq!(matrix.get(i, i), 0.0);
        }
        assert!(matrix.get(0, 2) < matrix.get(0, 1));
        assert_eq!(stats.pairs, 6);
        assert_eq!(stats.chunks, 3);
        // two identical items share one cache entry
        assert_eq!(stats.cache.entries, 3);
        assert_eq!(stats.cache.hits + stats.cache.misses, 4);
    }

    #[test]
    fn test_chunking_and_workers_do_not_change_result() {
        let contents: Vec<String> = (0..9)
            .map(|i| (0..40).map(|k| ((k * (i + 1)) % 17).to_string()).collect::<Vec<_>>().join(","))
            .collect();
        let refs: Vec<&str> = contents.iter().map(String::as_str).collect();
        let items = items(&refs);

        let reference = engine(100, 1).compute(&items, &cache()).unwrap();
        for (chunk_size, workers) in [(1, 4), (2, 2), (3, 8)] {
            let other = engine(chunk_size, workers).compute(&items, &cache()).unwrap();
            assert_eq!(reference, other);
        }
    }

    struct EmptyCompressor;

    impl Compressor for EmptyCompressor {
        fn name(&self) -> &str {
            "empty"
        }

        fn compressed_len(&self, _data: &[u8]) -> Result<usize> {
            Ok(0)
        }
    }

    #[test]
    fn test_degenerate_item() {
        let cache = CompressionCache::new(Arc::new(EmptyCompressor));
        let result = engine(4, 2).compute(&items(&["1,2", "3,4"]), &cache);
        assert!(matches!(result, Err(Error::DegenerateItem { .. })));
    }

    /// Fails on anything longer than `limit` bytes, i.e. on pair inputs.
    struct LimitedCompressor {
        limit: usize,
    }

    impl Compressor for LimitedCompressor {
        fn name(&self) -> &str {
            "limited"
        }

        fn compressed_len(&self, data: &[u8]) -> Result<usize> {
            if data.len() > self.limit {
                Err(Error::CompressionFailure("input too large".to_string()))
            } else {
                FlateCompressor::default().compressed_len(data)
            }
        }
    }

    #[test]
    fn test_cache_decides_compressor() {
        use crate::compressor::CompressorKind;
        use crate::config::CacheConfig;

        let items = items(&["1,2,3,4,5,6", "6,5,4,3,2,1", "1,1,2,2,3,3"]);
        let gzip = CacheConfig {
            compressor: CompressorKind::Gzip,
            ..Default::default()
        };
        let (from_config, stats) = engine(2, 2)
            .compute_with_stats(&items, &gzip.build().unwrap())
            .unwrap();
        let gzip_compressor = FlateCompressor::new(CompressorKind::Gzip, 6);
        let injected = CompressionCache::new(Arc::new(gzip_compressor));
        let (direct, _) = engine(1, 1).compute_with_stats(&items, &injected).unwrap();

        assert_eq!(stats.compressor, "gzip");
        assert_eq!(from_config, direct);
        let zlib = engine(2, 2).compute(&items, &cache()).unwrap();
        assert_ne!(from_config, zlib);
    }

    #[test]
    fn test_pair_failure_aborts() {
        let cache = CompressionCache::new(Arc::new(LimitedCompressor { limit: 8 }));
        let result = engine(1, 2).compute(&items(&["1,2,3", "4,5,6", "7,8,9"]), &cache);
        assert!(matches!(result, Err(Error::CompressionFailure(_))));
    }
}
