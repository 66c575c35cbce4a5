use serde::{Deserialize, Serialize};

/// Channel-group block reached through the data-group pointer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelGroup {
    /// Absolute offset of the block
    pub offset: u64,
    pub record_id_count: u16,
    pub channel_count: u16,
    pub record_size: u16,
    pub record_count: u32,
}

/// Decoded header of one assembled recording.
///
/// Identifier and name fields are sanitized to `[A-Za-z0-9]`. The recording date and
/// time are kept as read, after validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRecord {
    pub file_identifier: String,
    pub format_identifier: String,
    pub program_identifier: String,
    pub byte_order: u16,
    pub floating_point_format: u16,
    pub version_number: u16,
    pub code_page_number: u16,
    pub reserved_01: [u8; 2],
    pub reserved_02: [u8; 26],
    pub standard_cg_flags: u16,
    pub standard_sr_flags: u16,

    pub hd_block_size: u16,
    pub data_group_pointer: u32,
    pub file_comment_pointer: u32,
    pub program_block_pointer: u32,
    pub data_group_count: u16,

    pub recording_date: String,
    pub recording_time: String,
    pub author_name: String,
    pub organization_name: String,
    pub project_name: String,
    pub subject_name: String,

    /// Recording start in epoch seconds (UTC)
    pub epoch_seconds: i64,
    /// Epoch seconds as text, cut at the decimal point; used as a path segment
    pub timestamp: String,

    /// `None` when the file links no data group or the data group links no channel group
    pub channel_group: Option<ChannelGroup>,
}

impl HeaderRecord {
    pub fn number_of_channels(&self) -> Option<u16> {
        self.channel_group.map(|cg| cg.channel_count)
    }

    pub fn record_size(&self) -> Option<u16> {
        self.channel_group.map(|cg| cg.record_size)
    }

    pub fn number_of_records(&self) -> Option<u32> {
        self.channel_group.map(|cg| cg.record_count)
    }
}
