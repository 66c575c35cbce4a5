//! Builder for synthetic header bytes.

use crate::layout::*;

const DG_OFFSET: u64 = FIXED_HEADER_LEN;
const DG_LEN: u64 = 28;
const CG_OFFSET: u64 = DG_OFFSET + DG_LEN;
const CG_LEN: u64 = 30;

/// Channel-group values a fixture writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixtureChannelGroup {
    pub channel_count: u16,
    pub record_size: u16,
    pub record_count: u32,
}

/// Builds a well-formed header (optionally followed by DG and CG blocks and a payload),
/// with setters to break individual fields.
#[derive(Debug, Clone)]
pub struct HeaderFixture {
    file_identifier: Vec<u8>,
    format_identifier: Vec<u8>,
    program_identifier: Vec<u8>,
    version_number: u16,
    code_page_number: u16,
    recording_date: Vec<u8>,
    recording_time: Vec<u8>,
    author_name: Vec<u8>,
    organization_name: Vec<u8>,
    project_name: Vec<u8>,
    subject_name: Vec<u8>,
    channel_group: Option<FixtureChannelGroup>,
    data_group_pointer: Option<u32>,
    channel_group_pointer: Option<u32>,
    payload: Vec<u8>,
}

impl Default for HeaderFixture {
    fn default() -> Self {
        Self {
            file_identifier: b"MDF     ".to_vec(),
            format_identifier: b"3.30    ".to_vec(),
            program_identifier: b"CANlog  ".to_vec(),
            version_number: 330,
            code_page_number: 0,
            recording_date: b"15:03:2024".to_vec(),
            recording_time: b"10:20:05".to_vec(),
            author_name: b"Test Driver".to_vec(),
            organization_name: b"Fleet Ops".to_vec(),
            project_name: b"Bench-42".to_vec(),
            subject_name: b"Vehicle 7".to_vec(),
            channel_group: Some(FixtureChannelGroup {
                channel_count: 12,
                record_size: 16,
                record_count: 4096,
            }),
            data_group_pointer: None,
            channel_group_pointer: None,
            payload: Vec::new(),
        }
    }
}

impl HeaderFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_identifier(mut self, raw: &[u8]) -> Self {
        self.file_identifier = raw.to_vec();
        self
    }

    pub fn with_format_identifier(mut self, raw: &[u8]) -> Self {
        self.format_identifier = raw.to_vec();
        self
    }

    pub fn with_program_identifier(mut self, raw: &[u8]) -> Self {
        self.program_identifier = raw.to_vec();
        self
    }

    pub fn with_version_number(mut self, version: u16) -> Self {
        self.version_number = version;
        self
    }

    pub fn with_recording_date(mut self, raw: &[u8]) -> Self {
        self.recording_date = raw.to_vec();
        self
    }

    pub fn with_recording_time(mut self, raw: &[u8]) -> Self {
        self.recording_time = raw.to_vec();
        self
    }

    pub fn with_author_name(mut self, raw: &[u8]) -> Self {
        self.author_name = raw.to_vec();
        self
    }

    pub fn with_organization_name(mut self, raw: &[u8]) -> Self {
        self.organization_name = raw.to_vec();
        self
    }

    pub fn with_project_name(mut self, raw: &[u8]) -> Self {
        self.project_name = raw.to_vec();
        self
    }

    pub fn with_subject_name(mut self, raw: &[u8]) -> Self {
        self.subject_name = raw.to_vec();
        self
    }

    pub fn with_channel_group(mut self, channel_count: u16, record_size: u16, record_count: u32) -> Self {
        self.channel_group = Some(FixtureChannelGroup {
            channel_count,
            record_size,
            record_count,
        });
        self
    }

    pub fn without_channel_group(mut self) -> Self {
        self.channel_group = None;
        self
    }

    /// Override the HD block's data-group pointer
    pub fn with_data_group_pointer(mut self, pointer: u32) -> Self {
        self.data_group_pointer = Some(pointer);
        self
    }

    /// Override the DG block's channel-group pointer
    pub fn with_channel_group_pointer(mut self, pointer: u32) -> Self {
        self.channel_group_pointer = Some(pointer);
        self
    }

    /// Bytes appended after the header blocks
    pub fn with_payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut out = vec![0u8; FIXED_HEADER_LEN as usize];
        put_field(&mut out, FILE_IDENTIFIER, &self.file_identifier);
        put_field(&mut out, FORMAT_IDENTIFIER, &self.format_identifier);
        put_field(&mut out, PROGRAM_IDENTIFIER, &self.program_identifier);
        put_u16(&mut out, VERSION_NUMBER, self.version_number);
        put_u16(&mut out, CODE_PAGE_NUMBER, self.code_page_number);

        put_field(&mut out, (HD_BLOCK, 2), HD_ID);
        put_u16(&mut out, HD_BLOCK_SIZE, (FIXED_HEADER_LEN - HD_BLOCK) as u16);
        let default_dg = if self.channel_group.is_some() { DG_OFFSET as u32 } else { 0 };
        put_u32(
            &mut out,
            HD_DATA_GROUP_POINTER,
            self.data_group_pointer.unwrap_or(default_dg),
        );
        put_u16(&mut out, HD_DATA_GROUP_COUNT, u16::from(self.channel_group.is_some()));
        put_field(&mut out, RECORDING_DATE, &self.recording_date);
        put_field(&mut out, RECORDING_TIME, &self.recording_time);
        put_field(&mut out, AUTHOR_NAME, &self.author_name);
        put_field(&mut out, ORGANIZATION_NAME, &self.organization_name);
        put_field(&mut out, PROJECT_NAME, &self.project_name);
        put_field(&mut out, SUBJECT_NAME, &self.subject_name);

        if let Some(cg) = self.channel_group {
            out.resize((CG_OFFSET + CG_LEN) as usize, 0);
            put_field(&mut out, (DG_OFFSET, 2), DG_ID);
            put_u16(&mut out, DG_OFFSET + 2, DG_LEN as u16);
            put_u32(
                &mut out,
                DG_OFFSET + DG_CHANNEL_GROUP_POINTER_FIELD,
                self.channel_group_pointer.unwrap_or(CG_OFFSET as u32),
            );

            put_field(&mut out, (CG_OFFSET, 2), CG_ID);
            put_u16(&mut out, CG_OFFSET + 2, CG_LEN as u16);
            put_u16(&mut out, CG_OFFSET + CG_CHANNEL_COUNT_FIELD, cg.channel_count);
            put_u16(&mut out, CG_OFFSET + CG_RECORD_SIZE_FIELD, cg.record_size);
            put_u32(&mut out, CG_OFFSET + CG_RECORD_COUNT_FIELD, cg.record_count);
        }

        out.extend_from_slice(&self.payload);
        out
    }
}

/// Write `raw` into a fixed-width field, zero padded and cut to width
fn put_field(out: &mut [u8], (offset, width): (u64, usize), raw: &[u8]) {
    let start = offset as usize;
    let n = raw.len().min(width);
    out[start..start + n].copy_from_slice(&raw[..n]);
}

fn put_u16(out: &mut [u8], offset: u64, value: u16) {
    put_field(out, (offset, 2), &value.to_le_bytes());
}

fn put_u32(out: &mut [u8], offset: u64, value: u32) {
    put_field(out, (offset, 4), &value.to_le_bytes());
}
