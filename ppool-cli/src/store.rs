//! History file persistence.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use ppool_common::{FieldElement, PoseidonOracle};
use ppool_ledger::Wallet;
use tracing::{debug, info};

pub type PoolWallet = Wallet<PoseidonOracle>;

/// Replay the history file, or start empty if it does not exist yet.
pub fn load_wallet(path: &Path) -> Result<PoolWallet> {
    if !path.exists() {
        debug!(path = %path.display(), "no history file, starting empty");
        return Ok(Wallet::new(PoseidonOracle));
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let wallet = Wallet::from_json(PoseidonOracle, &json)
        .with_context(|| format!("failed to replay {}", path.display()))?;
    info!(path = %path.display(), events = wallet.log().len(), "history loaded");
    Ok(wallet)
}

/// Write the history through a sibling temp file so a crash never truncates it.
pub fn save_wallet(path: &Path, wallet: &PoolWallet) -> Result<()> {
    let json = wallet.export_json().context("failed to serialize history")?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("failed to write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("failed to replace {}", path.display()))?;
    debug!(path = %path.display(), events = wallet.log().len(), "history saved");
    Ok(())
}

/// Read a JSON array of hex leaves (short hex is left-padded).
pub fn load_leaves(path: &Path) -> Result<Vec<FieldElement>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let raw: Vec<String> =
        serde_json::from_str(&json).context("leaves file must be a JSON array of hex strings")?;
    raw.iter()
        .enumerate()
        .map(|(i, s)| {
            FieldElement::parse_padded(s).with_context(|| format!("invalid leaf #{}: {}", i, s))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ppool_common::Scope;

    #[test]
    fn missing_history_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let wallet = load_wallet(&dir.path().join("history.json")).unwrap();
        assert!(wallet.log().is_empty());
    }

    #[test]
    fn saved_history_replays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        let scope = Scope::from_label("P");

        let mut wallet = Wallet::new(PoseidonOracle);
        let c0 = wallet
            .deposit(scope, FieldElement::from(0xau64), 100, FieldElement::from(1u64), FieldElement::from(2u64))
            .unwrap();
        wallet
            .withdraw(scope, c0, 40, FieldElement::from(3u64), FieldElement::from(4u64))
            .unwrap();
        save_wallet(&path, &wallet).unwrap();

        let loaded = load_wallet(&path).unwrap();
        assert_eq!(loaded.state(), wallet.state());
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn corrupt_history_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        fs::write(&path, r#"[{"type":"burn"}]"#).unwrap();
        let err = load_wallet(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("malformed event at position 0"));
    }

    #[test]
    fn leaves_accept_short_hex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("leaves.json");
        fs::write(&path, r#"["0x01", "0x0a"]"#).unwrap();
        let leaves = load_leaves(&path).unwrap();
        assert_eq!(leaves, vec![FieldElement::from(1u64), FieldElement::from(10u64)]);
    }
}
