//! Persisted record of a past fork activation.
//!
//! Presence of the marker tells a restarting node that the one-off activation
//! actions already ran, and its values pin the fork parameters that were in
//! force at the time.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::conf::ConfFile;
use crate::ForkError;

/// Contents of the marker file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationMarker {
    pub fork_height: u32,
    pub fork_id: u32,
    /// Present once the pre-fork wallet backup completed.
    pub auto_backup_block: Option<u32>,
    /// Present when the backup failed during activation.
    pub error: Option<String>,
}

impl ActivationMarker {
    pub fn new(fork_height: u32, fork_id: u32) -> Self {
        Self {
            fork_height,
            fork_id,
            auto_backup_block: None,
            error: None,
        }
    }

    pub fn parse(text: &str) -> Result<Self, ForkError> {
        let conf = ConfFile::parse(text);
        Ok(Self {
            fork_height: conf
                .parse_value("forkheight")?
                .ok_or(ForkError::MissingKey("forkheight"))?,
            fork_id: conf
                .parse_value("forkid")?
                .ok_or(ForkError::MissingKey("forkid"))?,
            auto_backup_block: conf.parse_value("autobackupblock")?,
            error: conf.get("error").map(str::to_string),
        })
    }

    /// Serialize as `key=value` lines.
    pub fn to_conf_string(&self) -> String {
        let mut out = format!("forkheight={}\nforkid={}\n", self.fork_height, self.fork_id);
        if let Some(block) = self.auto_backup_block {
            out.push_str(&format!("autobackupblock={block}\n"));
        }
        if let Some(error) = &self.error {
            // Keep the record line-oriented whatever the error text holds.
            let error = error.replace(['\r', '\n'], " ");
            out.push_str(&format!("error={error}\n"));
        }
        out
    }
}

/// Persistence for the activation marker.
pub trait MarkerStore: Send + Sync {
    /// Read the marker, or `None` if no activation has been recorded.
    fn load(&self) -> Result<Option<ActivationMarker>, ForkError>;

    /// Replace any existing marker with `marker`.
    fn save(&self, marker: &ActivationMarker) -> Result<(), ForkError>;
}

/// Marker kept as `forkmarker.conf` in the node's data directory.
///
/// Saves write a sibling temporary file and rename it over the old marker, so
/// a crash leaves either the previous record or the new one, never neither.
#[derive(Clone, Debug)]
pub struct FileMarkerStore {
    path: PathBuf,
}

impl FileMarkerStore {
    pub const FILE_NAME: &'static str = "forkmarker.conf";

    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(Self::FILE_NAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension("conf.tmp")
    }
}

impl MarkerStore for FileMarkerStore {
    fn load(&self) -> Result<Option<ActivationMarker>, ForkError> {
        match fs::read_to_string(&self.path) {
            Ok(text) => ActivationMarker::parse(&text).map(Some),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn save(&self, marker: &ActivationMarker) -> Result<(), ForkError> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(marker.to_conf_string().as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), "activation marker written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_keys() {
        let marker = ActivationMarker::parse(
            "forkheight=1000\nforkid=5592405\nautobackupblock=999\nerror=disk full\n",
        )
        .unwrap();
        assert_eq!(marker.fork_height, 1_000);
        assert_eq!(marker.fork_id, 0x55_5555);
        assert_eq!(marker.auto_backup_block, Some(999));
        assert_eq!(marker.error.as_deref(), Some("disk full"));
    }

    #[test]
    fn requires_height_and_id() {
        assert!(matches!(
            ActivationMarker::parse("forkid=1\n"),
            Err(ForkError::MissingKey("forkheight"))
        ));
        assert!(matches!(
            ActivationMarker::parse("forkheight=1\n"),
            Err(ForkError::MissingKey("forkid"))
        ));
        assert!(matches!(
            ActivationMarker::parse("forkheight=-4\nforkid=1\n"),
            Err(ForkError::InvalidValue { .. })
        ));
    }

    #[test]
    fn text_form_is_stable() {
        let mut marker = ActivationMarker::new(100, 0);
        assert_eq!(marker.to_conf_string(), "forkheight=100\nforkid=0\n");
        marker.auto_backup_block = Some(99);
        marker.error = Some("line one\nline two".into());
        assert_eq!(
            marker.to_conf_string(),
            "forkheight=100\nforkid=0\nautobackupblock=99\nerror=line one line two\n"
        );
        assert_eq!(ActivationMarker::parse(&marker.to_conf_string()).unwrap().fork_height, 100);
    }

    #[test]
    fn file_store_replaces_marker() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMarkerStore::new(dir.path());
        assert_eq!(store.load().unwrap(), None);

        store.save(&ActivationMarker::new(10, 1)).unwrap();
        store.save(&ActivationMarker::new(20, 2)).unwrap();
        assert_eq!(store.load().unwrap(), Some(ActivationMarker::new(20, 2)));
        assert!(!store.temp_path().exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("forkmarker.conf")).unwrap(),
            "forkheight=20\nforkid=2\n"
        );
    }

    #[test]
    fn file_store_reports_corrupt_marker() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileMarkerStore::new(dir.path());
        fs::write(store.path(), "garbage\n").unwrap();
        assert!(matches!(store.load(), Err(ForkError::MissingKey(_))));
    }
}
