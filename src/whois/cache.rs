//! On-disk cache of WHOIS lookups.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::WHOIS_CACHE_TTL_SECS;

use super::types::WhoisRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    record: WhoisRecord,
    cached_at: SystemTime,
}

fn cache_file(cache_dir: &Path, domain: &str) -> PathBuf {
    cache_dir.join(format!("{}.json", domain.replace('.', "_")))
}

/// Loads a cached record, removing it when older than the TTL.
pub(crate) fn load_from_cache(cache_dir: &Path, domain: &str) -> Result<Option<WhoisRecord>> {
    let path = cache_file(cache_dir, domain);
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).context("Failed to read cache file")?;
    let entry: CacheEntry = serde_json::from_str(&content).context("Failed to parse cache file")?;

    let age = entry.cached_at.elapsed().unwrap_or_default();
    if age.as_secs() > WHOIS_CACHE_TTL_SECS {
        let _ = std::fs::remove_file(&path);
        return Ok(None);
    }
    Ok(Some(entry.record))
}

pub(crate) fn save_to_cache(cache_dir: &Path, record: &WhoisRecord) -> Result<()> {
    std::fs::create_dir_all(cache_dir).context("Failed to create cache directory")?;
    let entry = CacheEntry {
        record: record.clone(),
        cached_at: SystemTime::now(),
    };
    let content = serde_json::to_string_pretty(&entry).context("Failed to serialize cache entry")?;
    std::fs::write(cache_file(cache_dir, &record.domain), content)
        .context("Failed to write cache file")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_round_trip_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let record = WhoisRecord {
            domain: "leaks.example".into(),
            registrar: Some("Porkbun LLC".into()),
            ..Default::default()
        };
        save_to_cache(dir.path(), &record).unwrap();
        assert_eq!(load_from_cache(dir.path(), "leaks.example").unwrap(), Some(record));
        assert_eq!(load_from_cache(dir.path(), "other.example").unwrap(), None);
    }

    #[test]
    fn test_expired_entry_is_removed() {
        let dir = tempfile::TempDir::new().unwrap();
        let entry = CacheEntry {
            record: WhoisRecord {
                domain: "old.example".into(),
                ..Default::default()
            },
            cached_at: SystemTime::now() - Duration::from_secs(WHOIS_CACHE_TTL_SECS + 60),
        };
        let path = cache_file(dir.path(), "old.example");
        std::fs::write(&path, serde_json::to_string(&entry).unwrap()).unwrap();
        assert_eq!(load_from_cache(dir.path(), "old.example").unwrap(), None);
        assert!(!path.exists());
    }
}
