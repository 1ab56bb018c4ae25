//! Local snapshot caching
//!
//! Keeps fetched chains on disk so repeated analysis does not hit the data
//! provider. One directory per symbol and fetch time:
//!
//! `{cache_dir}/{SYMBOL}/{YYYY-MM-DD-HH-MM-SS}/options_chain.json`
//!
//! next to a small `metadata.json` describing the entry.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{ChainData, ChainSnapshot, LiquidityError, LiquidityResult};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";
const CHAIN_FILE: &str = "options_chain.json";
const METADATA_FILE: &str = "metadata.json";

/// Cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Cache directory
    pub cache_dir: PathBuf,
    /// Default maximum age of a reusable entry (in minutes)
    pub max_age_minutes: i64,
    /// Whether to use cache
    pub enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./data"),
            max_age_minutes: 15,
            enabled: true,
        }
    }
}

impl CacheConfig {
    /// Maximum entry age; saturates for ages beyond the `Duration` range
    pub fn max_age(&self) -> Duration {
        Duration::try_minutes(self.max_age_minutes).unwrap_or(Duration::MAX)
    }

    /// Validate parameters
    pub fn validate(&self) -> LiquidityResult<()> {
        if self.max_age_minutes <= 0 {
            return Err(LiquidityError::invalid_input(format!(
                "max age must be a positive number of minutes, got {}",
                self.max_age_minutes
            )));
        }
        if Duration::try_minutes(self.max_age_minutes).is_none() {
            return Err(LiquidityError::invalid_input(format!(
                "max age of {} minutes is out of range",
                self.max_age_minutes
            )));
        }
        Ok(())
    }
}

/// Entry summary written beside each cached chain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMetadata {
    pub ticker: String,
    pub underlying_price: f64,
    pub fetch_timestamp: DateTime<Utc>,
    pub total_contracts: usize,
    pub expirations_count: usize,
    pub strikes_count: usize,
    pub calls_count: usize,
    pub puts_count: usize,
}

impl CacheMetadata {
    fn from_snapshot(snapshot: &ChainSnapshot) -> Self {
        Self {
            ticker: snapshot.underlying_symbol().to_uppercase(),
            underlying_price: snapshot.underlying_price(),
            fetch_timestamp: snapshot.observed_at(),
            total_contracts: snapshot.len(),
            expirations_count: snapshot.expirations().len(),
            strikes_count: snapshot.strikes().len(),
            calls_count: snapshot.calls().len(),
            puts_count: snapshot.puts().len(),
        }
    }
}

/// Snapshot cache manager
pub struct SnapshotCache {
    config: CacheConfig,
}

impl SnapshotCache {
    pub fn new(config: CacheConfig) -> LiquidityResult<Self> {
        config.validate()?;

        if config.enabled && !config.cache_dir.exists() {
            fs::create_dir_all(&config.cache_dir)?;
        }

        Ok(Self { config })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn symbol_dir(&self, symbol: &str) -> PathBuf {
        self.config.cache_dir.join(symbol.to_uppercase())
    }

    fn entry_dir(&self, symbol: &str, at: DateTime<Utc>) -> PathBuf {
        self.symbol_dir(symbol).join(at.format(TIMESTAMP_FORMAT).to_string())
    }

    /// Save a snapshot; returns the entry directory, or None when disabled
    pub fn save(&self, snapshot: &ChainSnapshot) -> LiquidityResult<Option<PathBuf>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let dir = self.entry_dir(snapshot.underlying_symbol(), snapshot.observed_at());
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(&snapshot.to_raw())
            .map_err(|e| LiquidityError::Serialization(e.to_string()))?;
        fs::write(dir.join(CHAIN_FILE), json)?;

        let metadata = serde_json::to_string_pretty(&CacheMetadata::from_snapshot(snapshot))
            .map_err(|e| LiquidityError::Serialization(e.to_string()))?;
        fs::write(dir.join(METADATA_FILE), metadata)?;

        tracing::info!("Cached {} snapshot at {:?}", snapshot.underlying_symbol(), dir);
        Ok(Some(dir))
    }

    /// Load the entry fetched at `at`
    pub fn load(&self, symbol: &str, at: DateTime<Utc>) -> LiquidityResult<Option<ChainSnapshot>> {
        if !self.config.enabled {
            return Ok(None);
        }
        read_entry(&self.entry_dir(symbol, at))
    }

    /// Load the newest entry for a symbol
    pub fn load_latest(&self, symbol: &str) -> LiquidityResult<Option<ChainSnapshot>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let symbol_dir = self.symbol_dir(symbol);
        if !symbol_dir.exists() {
            return Ok(None);
        }

        let mut names: Vec<String> = Vec::new();
        for entry in fs::read_dir(&symbol_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        // the timestamp format sorts lexically
        names.sort_unstable_by(|a, b| b.cmp(a));

        for name in names {
            if let Some(snapshot) = read_entry(&symbol_dir.join(&name))? {
                tracing::info!("Loaded {} snapshot {} from cache", symbol, name);
                return Ok(Some(snapshot));
            }
        }

        Ok(None)
    }

    /// Newest entry if it is no older than `max_age` at `now`
    pub fn load_fresh(
        &self,
        symbol: &str,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> LiquidityResult<Option<ChainSnapshot>> {
        Ok(self
            .load_latest(symbol)?
            .filter(|snapshot| now - snapshot.observed_at() <= max_age))
    }

    /// Cached fetch times for a symbol, newest first
    pub fn list_cached(&self, symbol: &str) -> LiquidityResult<Vec<DateTime<Utc>>> {
        let symbol_dir = self.symbol_dir(symbol);
        if !symbol_dir.exists() {
            return Ok(Vec::new());
        }

        let mut timestamps = Vec::new();
        for entry in fs::read_dir(&symbol_dir)? {
            let entry = entry?;
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(ts) = parse_entry_name(&entry.file_name().to_string_lossy()) {
                timestamps.push(ts);
            }
        }

        timestamps.sort_unstable_by(|a, b| b.cmp(a));
        Ok(timestamps)
    }

    /// Total bytes on disk, for one symbol or the whole cache
    pub fn cache_size(&self, symbol: Option<&str>) -> LiquidityResult<u64> {
        let dir = match symbol {
            Some(s) => self.symbol_dir(s),
            None => self.config.cache_dir.clone(),
        };
        if !dir.exists() {
            return Ok(0);
        }
        dir_size(&dir)
    }

    /// Remove entries for one symbol (or all), optionally only those fetched
    /// before `older_than`. Returns the number of entries removed.
    pub fn clear(
        &self,
        symbol: Option<&str>,
        older_than: Option<DateTime<Utc>>,
    ) -> LiquidityResult<usize> {
        let symbol_dirs: Vec<PathBuf> = match symbol {
            Some(s) => vec![self.symbol_dir(s)],
            None => {
                if !self.config.cache_dir.exists() {
                    return Ok(0);
                }
                let mut dirs = Vec::new();
                for entry in fs::read_dir(&self.config.cache_dir)? {
                    let path = entry?.path();
                    if path.is_dir() {
                        dirs.push(path);
                    }
                }
                dirs
            }
        };

        let mut cleared = 0;
        for symbol_dir in symbol_dirs.iter().filter(|d| d.exists()) {
            for entry in fs::read_dir(symbol_dir)? {
                let path = entry?.path();
                if !path.is_dir() {
                    continue;
                }

                let should_clear = match older_than {
                    None => true,
                    Some(cutoff) => path
                        .file_name()
                        .and_then(|n| parse_entry_name(&n.to_string_lossy()))
                        .map(|ts| ts < cutoff)
                        .unwrap_or(false),
                };

                if should_clear {
                    fs::remove_dir_all(&path)?;
                    cleared += 1;
                }
            }
        }

        if cleared > 0 {
            tracing::info!("Cleared {} cache entries", cleared);
        }
        Ok(cleared)
    }
}

fn parse_entry_name(name: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(name, TIMESTAMP_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

fn read_entry(dir: &Path) -> LiquidityResult<Option<ChainSnapshot>> {
    let path = dir.join(CHAIN_FILE);
    if !path.exists() {
        return Ok(None);
    }

    let json = fs::read_to_string(&path)?;
    let data: ChainData = serde_json::from_str(&json)
        .map_err(|e| LiquidityError::Serialization(format!("{}: {}", path.display(), e)))?;

    Ok(Some(ChainSnapshot::from_raw(data)))
}

fn dir_size(dir: &Path) -> LiquidityResult<u64> {
    let mut total = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += metadata.len();
        }
    }
    Ok(total)
}
