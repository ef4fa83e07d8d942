//! Runtime configuration for the error instrumentation layer.
//!
//! Values come from an optional JSON file (`PERFSCHEMA_CONFIG`) and are then
//! overridden by environment variables:
//! - `PERFSCHEMA_MAX_SERVER_ERRORS`: item slots per error class (default: the
//!   built-in error table size, slot 0 included)
//! - `PERFSCHEMA_ERROR_CLASSES`: comma separated `name` or `name:items` entries

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::instrument::{ErrorCatalog, ErrorClass};

/// Upper bound on items per class. Every shard entry allocates one stat per item.
pub const MAX_ERROR_ITEMS: u32 = 65_536;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSpec {
    pub name: String,
    /// Overrides `max_server_errors` for this class.
    #[serde(default)]
    pub items: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PfsConfig {
    #[serde(default = "PfsConfig::default_max_server_errors")]
    pub max_server_errors: u32,
    #[serde(default = "PfsConfig::default_classes")]
    pub classes: Vec<ClassSpec>,
}

impl Default for PfsConfig {
    fn default() -> Self {
        Self { max_server_errors: Self::default_max_server_errors(), classes: Self::default_classes() }
    }
}

impl PfsConfig {
    fn default_max_server_errors() -> u32 { ErrorCatalog::builtin().len() as u32 }

    fn default_classes() -> Vec<ClassSpec> {
        vec![ClassSpec { name: "error".into(), items: None }]
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).with_context(|| format!("reading config '{}'", path.display()))?;
        let cfg: PfsConfig = serde_json::from_str(&text).with_context(|| format!("parsing config '{}'", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from `PERFSCHEMA_CONFIG` (if set) and apply environment overrides.
    pub fn from_env() -> Result<Self> {
        let mut cfg = match std::env::var("PERFSCHEMA_CONFIG") {
            Ok(p) if !p.trim().is_empty() => Self::from_json_file(p.trim())?,
            _ => Self::default(),
        };
        if let Ok(v) = std::env::var("PERFSCHEMA_MAX_SERVER_ERRORS") {
            cfg.max_server_errors = v.trim().parse::<u32>()
                .with_context(|| format!("PERFSCHEMA_MAX_SERVER_ERRORS='{}' is not a number", v))?;
        }
        if let Ok(v) = std::env::var("PERFSCHEMA_ERROR_CLASSES") {
            cfg.classes = parse_class_list(&v)?;
        }
        cfg.validate()?;
        debug!(target: "perfschema::config", "loaded config: max_server_errors={} classes={}", cfg.max_server_errors, cfg.classes.len());
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_server_errors == 0 {
            return Err(anyhow!("max_server_errors must be at least 1"));
        }
        if self.max_server_errors > MAX_ERROR_ITEMS {
            return Err(anyhow!("max_server_errors={} exceeds the limit of {}", self.max_server_errors, MAX_ERROR_ITEMS));
        }
        for c in &self.classes {
            if c.name.trim().is_empty() {
                return Err(anyhow!("error class names must not be empty"));
            }
            if let Some(items) = c.items.filter(|n| *n > MAX_ERROR_ITEMS) {
                return Err(anyhow!("error class '{}' has {} items, the limit is {}", c.name, items, MAX_ERROR_ITEMS));
            }
        }
        Ok(())
    }

    pub fn error_classes(&self) -> Vec<ErrorClass> {
        self.classes
            .iter()
            .enumerate()
            .map(|(i, c)| ErrorClass {
                index: i as u32,
                name: c.name.clone(),
                items: c.items.unwrap_or(self.max_server_errors),
            })
            .collect()
    }
}

/// Parse `error,warning:0,note:12`.
pub fn parse_class_list(s: &str) -> Result<Vec<ClassSpec>> {
    let mut out = Vec::new();
    for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.split_once(':') {
            Some((name, items)) => {
                let items = items.trim().parse::<u32>()
                    .with_context(|| format!("class '{}' has invalid item count '{}'", name, items))?;
                out.push(ClassSpec { name: name.trim().to_string(), items: Some(items) });
            }
            None => out.push(ClassSpec { name: part.to_string(), items: None }),
        }
    }
    Ok(out)
}
