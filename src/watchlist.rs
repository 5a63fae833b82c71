// src/watchlist.rs
//! Static watchlist configuration: which sources to poll each run.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "PULSE_WATCHLIST_PATH";

fn default_category() -> String {
    "general".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WatchlistSource {
    pub feed: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub description: String,
}

/// Source name -> source config. BTreeMap keeps iteration order stable
/// across runs, which keeps aggregation output order stable.
pub type Watchlist = BTreeMap<String, WatchlistSource>;

#[derive(Debug, Deserialize)]
struct WatchlistFile {
    sources: Watchlist,
}

/// Load a watchlist from an explicit path. Supports TOML or JSON.
pub fn load_watchlist_from(path: &Path) -> Result<Watchlist> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading watchlist from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_watchlist(&content, ext.as_str())
}

/// Load the watchlist using env var + fallbacks:
/// 1) $PULSE_WATCHLIST_PATH
/// 2) config/watchlist.toml
/// 3) config/watchlist.json
///
/// No file at all yields an empty watchlist (and therefore an empty
/// knowledge base), not an error.
pub fn load_watchlist_default() -> Result<Watchlist> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_watchlist_from(&pb);
        } else {
            return Err(anyhow!("PULSE_WATCHLIST_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/watchlist.toml");
    if toml_p.exists() {
        return load_watchlist_from(&toml_p);
    }
    let json_p = PathBuf::from("config/watchlist.json");
    if json_p.exists() {
        return load_watchlist_from(&json_p);
    }
    tracing::warn!("no watchlist config found; knowledge base will be empty");
    Ok(Watchlist::new())
}

fn parse_watchlist(s: &str, hint_ext: &str) -> Result<Watchlist> {
    let try_toml = hint_ext == "toml" || s.contains("[sources");
    if try_toml {
        if let Ok(v) = toml::from_str::<WatchlistFile>(s) {
            return Ok(v.sources);
        }
    }
    if let Ok(v) = serde_json::from_str::<WatchlistFile>(s) {
        return Ok(v.sources);
    }
    if !try_toml {
        if let Ok(v) = toml::from_str::<WatchlistFile>(s) {
            return Ok(v.sources);
        }
    }
    Err(anyhow!("unsupported watchlist format"))
}
