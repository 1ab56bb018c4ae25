//! Snapshot sources
//!
//! The analysis core only needs "give me a snapshot for this symbol".
//! `CachedSource` puts a [`SnapshotCache`] in front of any source with an
//! explicit staleness bound.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};

use crate::core::{ChainData, ChainSnapshot, LiquidityError, LiquidityResult};

use super::cache::SnapshotCache;

/// Anything that can produce a chain snapshot for a symbol
pub trait SnapshotSource {
    fn fetch_snapshot(&self, symbol: &str) -> LiquidityResult<ChainSnapshot>;
}

/// Reads a chain payload previously exported to a JSON file
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw payload as stored in the file
    pub fn read(&self) -> LiquidityResult<ChainData> {
        let file = File::open(&self.path)?;
        serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            LiquidityError::Serialization(format!("{}: {}", self.path.display(), e))
        })
    }
}

impl SnapshotSource for JsonFileSource {
    fn fetch_snapshot(&self, symbol: &str) -> LiquidityResult<ChainSnapshot> {
        let data = self.read()?;

        if !data.underlying_symbol.eq_ignore_ascii_case(symbol) {
            return Err(LiquidityError::data(format!(
                "{} holds a {} chain, not {}",
                self.path.display(),
                data.underlying_symbol,
                symbol
            )));
        }

        Ok(ChainSnapshot::from_raw(data))
    }
}

/// Cache-first wrapper around a snapshot source
pub struct CachedSource<S> {
    source: S,
    cache: SnapshotCache,
}

impl<S: SnapshotSource> CachedSource<S> {
    pub fn new(source: S, cache: SnapshotCache) -> Self {
        Self { source, cache }
    }

    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }

    /// Cached snapshot no older than `max_staleness` (the cache's configured
    /// max age when None), otherwise a fresh one from the source
    pub fn get_snapshot(
        &self,
        symbol: &str,
        max_staleness: Option<Duration>,
    ) -> LiquidityResult<ChainSnapshot> {
        self.get_snapshot_at(symbol, max_staleness, Utc::now())
    }

    /// [`get_snapshot`](Self::get_snapshot) with an explicit clock
    pub fn get_snapshot_at(
        &self,
        symbol: &str,
        max_staleness: Option<Duration>,
        now: DateTime<Utc>,
    ) -> LiquidityResult<ChainSnapshot> {
        let max_age = max_staleness.unwrap_or_else(|| self.cache.config().max_age());

        if let Some(snapshot) = self.cache.load_fresh(symbol, max_age, now)? {
            return Ok(snapshot);
        }

        tracing::info!("Fetching fresh data for {}", symbol);
        self.fetch_and_store(symbol)
    }

    /// Force a fetch from the source (bypass cache)
    pub fn refresh(&self, symbol: &str) -> LiquidityResult<ChainSnapshot> {
        self.fetch_and_store(symbol)
    }

    fn fetch_and_store(&self, symbol: &str) -> LiquidityResult<ChainSnapshot> {
        let snapshot = self.source.fetch_snapshot(symbol)?;
        self.cache.save(&snapshot)?;
        Ok(snapshot)
    }
}
