//! Plain directory jail roots.

use crate::StoreError;
use jmgr_runtime::{tools, Invocation, ProcessGateway};
use std::os::unix::fs::DirBuilderExt;
use std::path::Path;
use tracing::info;

/// Create `path` and any missing parents with mode 0755.
pub fn create_root(path: &Path) -> Result<(), StoreError> {
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o755)
        .create(path)?;
    Ok(())
}

/// Clear file flags (`schg` is set on parts of the base system) and remove
/// the tree.
pub fn remove_root(gw: &dyn ProcessGateway, path: &Path) -> Result<(), StoreError> {
    let target = path.display().to_string();
    gw.output(&Invocation::new(tools::CHFLAGS).args(["-R", "0", target.as_str()]))?;
    gw.output(&Invocation::new(tools::RM).args(["-rf", target.as_str()]))?;
    info!("removed {target}");
    Ok(())
}
