use std::path::Path;

use anyhow::Result;

use relay::config::RelayConfig;
use relay::store::LedgerStore;

/// Validate the ledger file in the working clone.
pub fn run(root: &Path, config: &RelayConfig) -> Result<()> {
    let store = LedgerStore::new(root.join(&config.store.path));
    let exists = store.path().exists();
    let ledger = store.load()?;

    if exists {
        println!("[OK] {}: {} id(s)", store.path().display(), ledger.len());
    } else {
        println!(
            "[OK] {}: not created yet (first run starts empty)",
            store.path().display()
        );
    }
    Ok(())
}
