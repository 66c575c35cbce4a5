use std::sync::Arc;

use canlog_blob::ObjectKeyStrategy;
use canlog_header::HeaderRecord;
use serde::{Deserialize, Serialize};

use crate::ServiceConfig;

/// Outcome recorded in a summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStatus {
    Uploaded,
    Failed,
}

/// Metadata document describing one processed recording
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub file_identifier: String,
    pub format_identifier: String,
    pub program_identifier: String,
    pub version_number: u16,
    pub code_page_number: u16,
    pub author_name: String,
    pub organization_name: String,
    pub project_name: String,
    pub subject_name: String,
    pub recording_date: String,
    pub recording_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_channels: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_size: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number_of_records: Option<u32>,
    pub timestamp: String,
    pub status: ProcessingStatus,
    pub container_name: String,
    pub blob_name: String,
    pub account_name: String,
    pub queue_name: String,
    pub file_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_file_name: Option<String>,
}

impl Summary {
    pub fn to_json_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}

/// Builds summaries from decoded headers and the pipeline's storage context
#[derive(Clone)]
pub struct SummaryAssembler {
    config: ServiceConfig,
    keys: Arc<dyn ObjectKeyStrategy>,
}

impl SummaryAssembler {
    pub fn new(config: ServiceConfig, keys: Arc<dyn ObjectKeyStrategy>) -> Self {
        Self { config, keys }
    }

    /// Summary for a recording in `folder`, marked `uploaded`
    pub fn assemble(&self, record: &HeaderRecord, folder: &str) -> Summary {
        Summary {
            file_identifier: record.file_identifier.clone(),
            format_identifier: record.format_identifier.clone(),
            program_identifier: record.program_identifier.clone(),
            version_number: record.version_number,
            code_page_number: record.code_page_number,
            author_name: record.author_name.clone(),
            organization_name: record.organization_name.clone(),
            project_name: record.project_name.clone(),
            subject_name: record.subject_name.clone(),
            recording_date: record.recording_date.clone(),
            recording_time: record.recording_time.clone(),
            number_of_channels: record.number_of_channels(),
            record_size: record.record_size(),
            number_of_records: record.number_of_records(),
            timestamp: record.timestamp.clone(),
            status: ProcessingStatus::Uploaded,
            container_name: self.config.container().to_string(),
            blob_name: self.final_object(folder, &record.timestamp),
            account_name: self.config.account_name.clone(),
            queue_name: self.config.queue_name.clone(),
            file_name: self.config.final_file_name.clone(),
            summary_file_name: None,
        }
    }

    /// Object a processed recording is copied to
    pub fn final_object(&self, folder: &str, timestamp: &str) -> String {
        self.keys
            .final_object(folder, timestamp, &self.config.final_file_name)
    }

    /// Object a summary is persisted as
    pub fn summary_object(&self, folder: &str, timestamp: &str) -> String {
        self.keys
            .summary_object(folder, timestamp, &self.config.summary_file_name)
    }
}
