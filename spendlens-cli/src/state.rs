use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use spendlens_finance::MemoryStore;

pub fn spendlens_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".spendlens"))
}

pub fn ensure_spendlens_home() -> Result<PathBuf> {
    let dir = spendlens_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

pub fn ledger_path() -> Result<PathBuf> {
    Ok(ensure_spendlens_home()?.join("ledger.json"))
}

/// Load the ledger snapshot (empty on first use).
pub fn open_store() -> Result<MemoryStore> {
    let p = ledger_path()?;
    MemoryStore::open(&p).with_context(|| format!("read {}", p.display()))
}

pub fn save_store(store: &MemoryStore) -> Result<()> {
    let p = ledger_path()?;
    store.save(&p).with_context(|| format!("write {}", p.display()))?;
    tracing::debug!(path = %p.display(), "ledger saved");
    Ok(())
}
