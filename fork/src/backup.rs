//! Pre-fork wallet backup.

use std::path::{Path, PathBuf};

use crate::ForkError;

/// Placeholder replaced by the backup block height in paths.
pub const HEIGHT_PLACEHOLDER: char = '@';

/// Suffix appended to the wallet file name when no file name is given.
pub const DEFAULT_BACKUP_SUFFIX: &str = "auto.@.bak";

/// Takes a backup of the wallet when the fork activates.
pub trait WalletBackup: Send + Sync {
    /// Back up the wallet to `destination` (unexpanded, may contain `@`) for
    /// block `height`, returning the file written.
    fn backup(&self, destination: &str, height: u32) -> Result<PathBuf, ForkError>;
}

/// Resolve a configured backup destination into a file path.
///
/// Every `@` in `destination` and `wallet_file` becomes `height`. An empty
/// destination means the data directory; a relative one is taken under it. A
/// destination whose last component has an extension names the backup file
/// itself; otherwise it is a directory and `<wallet>.auto.<height>.bak` is
/// appended.
pub fn expand_backup_path(
    destination: &str,
    wallet_file: &str,
    height: u32,
    data_dir: &Path,
) -> PathBuf {
    let height = height.to_string();
    let wallet = wallet_file.replace(HEIGHT_PLACEHOLDER, &height);
    let suffix = DEFAULT_BACKUP_SUFFIX.replace(HEIGHT_PLACEHOLDER, &height);
    let default_name = format!("{wallet}.{suffix}");

    let destination = destination.replace(HEIGHT_PLACEHOLDER, &height);
    if destination.is_empty() {
        return data_dir.join(default_name);
    }

    let destination = PathBuf::from(destination);
    let destination = if destination.is_absolute() {
        destination
    } else {
        data_dir.join(destination)
    };

    if destination.extension().is_some() {
        destination
    } else {
        destination.join(default_name)
    }
}
