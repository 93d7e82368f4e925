//! CLI configuration.

use anyhow::{Context, Result};
use ppool_common::{FieldElement, Scope};
use ppool_witness::DEFAULT_TREE_DEPTH;
use std::{env, path::PathBuf};

/// Pool used when neither `--scope` nor `PPOOL_SCOPE` is given.
pub const DEFAULT_SCOPE_LABEL: &str = "0XBOW_ETH_ETHEREUM_POOL";

/// CLI configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CliConfig {
    /// Event history file.
    pub history_path: PathBuf,
    /// Depth of the commitment tree used for witness paths.
    pub tree_depth: usize,
    /// Scope label, or a `0x`-prefixed scope id.
    pub scope: String,
}

impl CliConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let history_path = get("PPOOL_HISTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("history.json"));

        let tree_depth = match get("PPOOL_TREE_DEPTH") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("PPOOL_TREE_DEPTH must be an integer, got {:?}", raw))?,
            None => DEFAULT_TREE_DEPTH,
        };

        let scope = get("PPOOL_SCOPE").unwrap_or_else(|| DEFAULT_SCOPE_LABEL.to_string());

        Ok(Self {
            history_path,
            tree_depth,
            scope,
        })
    }

    pub fn scope(&self) -> Result<Scope> {
        parse_scope(&self.scope)
    }
}

/// `0x…` is read as a raw scope id, anything else as a pool label.
pub fn parse_scope(raw: &str) -> Result<Scope> {
    if raw.starts_with("0x") {
        let id = FieldElement::parse_padded(raw)
            .with_context(|| format!("invalid scope id {}", raw))?;
        Ok(Scope::new(id))
    } else {
        Ok(Scope::from_label(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = CliConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.history_path, PathBuf::from("history.json"));
        assert_eq!(config.tree_depth, DEFAULT_TREE_DEPTH);
        assert_eq!(config.scope().unwrap(), Scope::from_label(DEFAULT_SCOPE_LABEL));
    }

    #[test]
    fn overrides() {
        let config = CliConfig::from_lookup(lookup(&[
            ("PPOOL_HISTORY", "/tmp/h.json"),
            ("PPOOL_TREE_DEPTH", "8"),
            ("PPOOL_SCOPE", "0x2a"),
        ]))
        .unwrap();
        assert_eq!(config.history_path, PathBuf::from("/tmp/h.json"));
        assert_eq!(config.tree_depth, 8);
        assert_eq!(config.scope().unwrap(), Scope::new(FieldElement::from(42u64)));
    }

    #[test]
    fn bad_depth_is_an_error() {
        assert!(CliConfig::from_lookup(lookup(&[("PPOOL_TREE_DEPTH", "deep")])).is_err());
    }
}
