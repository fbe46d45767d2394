//! Wallet backup to the local filesystem.

use std::fs;
use std::path::{Path, PathBuf};

use splitchain_fork::{expand_backup_path, ForkError, WalletBackup};

/// Copies the wallet file from the data directory to the expanded backup path.
///
/// An existing file at the target is moved aside to `<target>.old` first.
#[derive(Clone, Debug)]
pub struct FileWalletBackup {
    data_dir: PathBuf,
    wallet_file: String,
}

impl FileWalletBackup {
    pub fn new(data_dir: impl Into<PathBuf>, wallet_file: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            wallet_file: wallet_file.into(),
        }
    }
}

impl WalletBackup for FileWalletBackup {
    fn backup(&self, destination: &str, height: u32) -> Result<PathBuf, ForkError> {
        let source = self.data_dir.join(&self.wallet_file);
        let target = expand_backup_path(destination, &self.wallet_file, height, &self.data_dir);

        if source == target {
            return Err(ForkError::BackupFailed {
                height,
                reason: format!("backup target {} is the wallet itself", target.display()),
            });
        }

        copy_wallet(&source, &target).map_err(|err| ForkError::BackupFailed {
            height,
            reason: format!("{} -> {}: {err}", source.display(), target.display()),
        })?;
        Ok(target)
    }
}

fn copy_wallet(source: &Path, target: &Path) -> std::io::Result<()> {
    if let Some(dir) = target.parent() {
        fs::create_dir_all(dir)?;
    }
    if target.exists() {
        let mut old = target.as_os_str().to_owned();
        old.push(".old");
        tracing::info!(path = %target.display(), "moving existing backup aside");
        fs::rename(target, PathBuf::from(old))?;
    }
    fs::copy(source, target)?;
    Ok(())
}
