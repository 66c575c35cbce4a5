use serde::{Deserialize, Serialize};

/// One summary document found in the container
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SummaryEntry {
    pub summary_file: String,
    pub folder: String,
    pub timestamp: String,
    pub file_name: String,
}

impl SummaryEntry {
    /// Parse `<folder>/<timestamp>/<file>` where `<file>` starts with `su` or `st` and
    /// ends with `.json`. The folder may itself contain `/`.
    pub fn parse(object_name: &str) -> Option<Self> {
        let mut parts = object_name.rsplitn(3, '/');
        let file_name = parts.next()?;
        let timestamp = parts.next()?;
        let folder = parts.next()?;

        let is_summary = (file_name.starts_with("su") || file_name.starts_with("st"))
            && file_name.ends_with(".json");
        if !is_summary {
            return None;
        }

        Some(Self {
            summary_file: object_name.to_string(),
            folder: folder.to_string(),
            timestamp: timestamp.to_string(),
            file_name: file_name.to_string(),
        })
    }

    /// An empty filter matches every folder
    pub fn matches_folder(&self, filter: Option<&str>) -> bool {
        match filter {
            None | Some("") => true,
            Some(folder) => self.folder == folder,
        }
    }
}
