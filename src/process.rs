//! The process-discovery collaborator's fixed record shape (spec'd
//! interface only — discovery itself lives outside this crate).

use serde::{Deserialize, Serialize};

/// Lifecycle state of a discovered process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Online,
    Offline,
}

/// What the (out-of-scope) process-discovery collaborator hands us.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: u32,
    pub exe_path: String,
    pub data_dir: Option<String>,
    pub account_name: Option<String>,
    pub status: ProcessStatus,
    pub version: u8,
    pub full_version: Option<String>,
}

impl ProcessRecord {
    /// Pick the record the extractor should target: the first online
    /// record with a known data directory, else the first record at all.
    pub fn pick_target(records: &[ProcessRecord]) -> Option<&ProcessRecord> {
        records
            .iter()
            .find(|r| r.status == ProcessStatus::Online && r.data_dir.is_some())
            .or_else(|| records.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pid: u32, status: ProcessStatus, data_dir: Option<&str>) -> ProcessRecord {
        ProcessRecord {
            pid,
            exe_path: "/bin/wechat".into(),
            data_dir: data_dir.map(String::from),
            account_name: None,
            status,
            version: 4,
            full_version: None,
        }
    }

    #[test]
    fn prefers_online_with_data_dir() {
        let records = vec![
            record(1, ProcessStatus::Offline, Some("/a")),
            record(2, ProcessStatus::Online, None),
            record(3, ProcessStatus::Online, Some("/c")),
        ];
        assert_eq!(ProcessRecord::pick_target(&records).unwrap().pid, 3);
    }

    #[test]
    fn falls_back_to_first() {
        let records = vec![record(1, ProcessStatus::Offline, None)];
        assert_eq!(ProcessRecord::pick_target(&records).unwrap().pid, 1);
    }

    #[test]
    fn empty_yields_none() {
        assert!(ProcessRecord::pick_target(&[]).is_none());
    }
}
