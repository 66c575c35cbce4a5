use canlog_blob::BlobConfig;

/// Configuration for the ingestion pipeline
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Storage account name reported in summaries
    pub account_name: String,

    /// Queue every summary is published to
    pub queue_name: String,

    /// Name a processed recording is stored under, inside its timestamp folder
    pub final_file_name: String,

    /// Name of the summary document written next to the recording
    pub summary_file_name: String,

    /// Upload settings; container and folder are shared with the pipeline
    pub blob: BlobConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            account_name: "canlog".to_string(),
            queue_name: "canlog-summaries".to_string(),
            final_file_name: "can.log".to_string(),
            summary_file_name: "summary.json".to_string(),
            blob: BlobConfig::default(),
        }
    }
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn container(&self) -> &str {
        &self.blob.container
    }

    pub fn default_folder(&self) -> &str {
        &self.blob.default_folder
    }

    pub fn with_account_name<S: Into<String>>(mut self, name: S) -> Self {
        self.account_name = name.into();
        self
    }

    pub fn with_queue_name<S: Into<String>>(mut self, name: S) -> Self {
        self.queue_name = name.into();
        self
    }

    pub fn with_container<S: Into<String>>(mut self, container: S) -> Self {
        self.blob = self.blob.with_container(container);
        self
    }

    pub fn with_default_folder<S: Into<String>>(mut self, folder: S) -> Self {
        self.blob = self.blob.with_default_folder(folder);
        self
    }

    pub fn with_final_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.final_file_name = name.into();
        self
    }

    pub fn with_summary_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.summary_file_name = name.into();
        self
    }

    pub fn with_blob_config(mut self, blob: BlobConfig) -> Self {
        self.blob = blob;
        self
    }
}
