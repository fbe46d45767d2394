//! Line-oriented `key=value` parser for the marker file.

use std::collections::HashMap;
use std::str::FromStr;

use crate::ForkError;

/// Parsed `key=value` lines.
///
/// Blank lines, `#` comments and lines without `=` are skipped. Keys may carry
/// a leading `-` (as on a command line). The first occurrence of a key wins in
/// [`get`](Self::get); every occurrence is kept for [`get_all`](Self::get_all).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConfFile {
    values: HashMap<String, String>,
    multi: HashMap<String, Vec<String>>,
}

impl ConfFile {
    pub fn parse(text: &str) -> Self {
        let mut conf = Self::default();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim().trim_start_matches('-');
            if key.is_empty() {
                continue;
            }
            let value = value.trim().to_string();
            conf.values
                .entry(key.to_string())
                .or_insert_with(|| value.clone());
            conf.multi.entry(key.to_string()).or_default().push(value);
        }
        conf
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_all(&self, key: &str) -> &[String] {
        self.multi.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Parse the first value of `key`, or `None` if the key is absent.
    pub fn parse_value<T: FromStr>(&self, key: &str) -> Result<Option<T>, ForkError> {
        match self.get(key) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| ForkError::InvalidValue {
                key: key.to_string(),
                value: raw.to_string(),
            }),
        }
    }
}
