use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;

use tracing::{debug, instrument};

use crate::layout::*;
use crate::reader::HeaderReader;
use crate::sanitize::sanitize;
use crate::timestamp::{epoch_seconds, epoch_text};
use crate::{ChannelGroup, FormatError, FormatResult, HeaderRecord};

/// Decode the header of an in-memory recording
pub fn decode_bytes(data: &[u8]) -> FormatResult<HeaderRecord> {
    decode(Cursor::new(data))
}

/// Decode the header of a recording on disk
#[instrument(skip_all, fields(path = %path.display()))]
pub fn decode_file(path: &Path) -> FormatResult<HeaderRecord> {
    let file = File::open(path).map_err(|e| FormatError::Io {
        offset: 0,
        message: e.to_string(),
    })?;
    decode(BufReader::new(file))
}

/// Decode the header from any seekable source.
///
/// Reads only; the source position is left wherever the last read ended.
pub fn decode<R: Read + Seek>(source: R) -> FormatResult<HeaderRecord> {
    let mut reader = HeaderReader::new(source)?;
    if reader.len() < FIXED_HEADER_LEN {
        debug!(len = reader.len(), "source shorter than the fixed header");
    }

    let file_identifier = reader.read_field("file_identifier", FILE_IDENTIFIER)?;
    let format_identifier = reader.read_field("format_identifier", FORMAT_IDENTIFIER)?;
    let program_identifier = reader.read_field("program_identifier", PROGRAM_IDENTIFIER)?;
    let byte_order = reader.read_u16("byte_order", BYTE_ORDER)?;
    let floating_point_format = reader.read_u16("floating_point_format", FLOATING_POINT_FORMAT)?;
    let version_number = reader.read_u16("version_number", VERSION_NUMBER)?;
    let code_page_number = reader.read_u16("code_page_number", CODE_PAGE_NUMBER)?;
    let reserved_01 = reader.read_array::<2>("reserved_01", RESERVED_01.0)?;
    let reserved_02 = reader.read_array::<26>("reserved_02", RESERVED_02.0)?;
    let standard_cg_flags = reader.read_u16("standard_cg_flags", STANDARD_CG_FLAGS)?;
    let standard_sr_flags = reader.read_u16("standard_sr_flags", STANDARD_SR_FLAGS)?;

    expect_block(&mut reader, HD_ID, "HD", HD_BLOCK)?;
    let hd_block_size = reader.read_u16("hd_block_size", HD_BLOCK_SIZE)?;
    let data_group_pointer = reader.read_u32("data_group_pointer", HD_DATA_GROUP_POINTER)?;
    let file_comment_pointer = reader.read_u32("file_comment_pointer", HD_FILE_COMMENT_POINTER)?;
    let program_block_pointer = reader.read_u32("program_block_pointer", HD_PROGRAM_BLOCK_POINTER)?;
    let data_group_count = reader.read_u16("data_group_count", HD_DATA_GROUP_COUNT)?;

    let recording_date = read_ascii(&mut reader, "recording_date", RECORDING_DATE)?;
    let recording_time = read_ascii(&mut reader, "recording_time", RECORDING_TIME)?;
    let author_name = reader.read_field("author_name", AUTHOR_NAME)?;
    let organization_name = reader.read_field("organization_name", ORGANIZATION_NAME)?;
    let project_name = reader.read_field("project_name", PROJECT_NAME)?;
    let subject_name = reader.read_field("subject_name", SUBJECT_NAME)?;

    let seconds = epoch_seconds(&recording_date, &recording_time)?;
    let channel_group = read_channel_group(&mut reader, data_group_pointer)?;

    let record = HeaderRecord {
        file_identifier: sanitize(&file_identifier),
        format_identifier: sanitize(&format_identifier),
        program_identifier: sanitize(&program_identifier),
        byte_order,
        floating_point_format,
        version_number,
        code_page_number,
        reserved_01,
        reserved_02,
        standard_cg_flags,
        standard_sr_flags,
        hd_block_size,
        data_group_pointer,
        file_comment_pointer,
        program_block_pointer,
        data_group_count,
        recording_date,
        recording_time,
        author_name: sanitize(&author_name),
        organization_name: sanitize(&organization_name),
        project_name: sanitize(&project_name),
        subject_name: sanitize(&subject_name),
        epoch_seconds: seconds,
        timestamp: epoch_text(seconds),
        channel_group,
    };

    debug!(
        file_identifier = %record.file_identifier,
        timestamp = %record.timestamp,
        channels = ?record.number_of_channels(),
        "decoded header"
    );
    Ok(record)
}

fn expect_block<R: Read + Seek>(
    reader: &mut HeaderReader<R>,
    expected_id: &[u8; 2],
    expected: &'static str,
    offset: u64,
) -> FormatResult<()> {
    let found = reader.read_array::<2>("block_id", offset)?;
    if &found != expected_id {
        return Err(FormatError::UnexpectedBlock {
            expected,
            found: String::from_utf8_lossy(&found).into_owned(),
            offset,
        });
    }
    Ok(())
}

fn read_ascii<R: Read + Seek>(
    reader: &mut HeaderReader<R>,
    field: &'static str,
    (offset, width): (u64, usize),
) -> FormatResult<String> {
    let raw = reader.read_field(field, (offset, width))?;
    if let Some(pos) = raw.iter().position(|b| !b.is_ascii()) {
        return Err(FormatError::invalid_ascii(field, offset + pos as u64));
    }
    // ASCII is valid UTF-8
    Ok(raw.into_iter().map(char::from).collect())
}

/// Follow HD → DG → CG. A zero pointer at either hop means the block is absent.
fn read_channel_group<R: Read + Seek>(
    reader: &mut HeaderReader<R>,
    data_group_pointer: u32,
) -> FormatResult<Option<ChannelGroup>> {
    if data_group_pointer == 0 {
        return Ok(None);
    }
    let dg = reader.check_pointer("DG", HD_DATA_GROUP_POINTER, data_group_pointer, DG_MIN_LEN)?;
    expect_block(reader, DG_ID, "DG", dg)?;

    let cg_pointer_offset = dg + DG_CHANNEL_GROUP_POINTER_FIELD;
    let cg_pointer = reader.read_u32("channel_group_pointer", cg_pointer_offset)?;
    if cg_pointer == 0 {
        return Ok(None);
    }
    let cg = reader.check_pointer("CG", cg_pointer_offset, cg_pointer, CG_MIN_LEN)?;
    expect_block(reader, CG_ID, "CG", cg)?;

    Ok(Some(ChannelGroup {
        offset: cg,
        record_id_count: reader.read_u16("record_id_count", cg + CG_RECORD_ID_FIELD)?,
        channel_count: reader.read_u16("channel_count", cg + CG_CHANNEL_COUNT_FIELD)?,
        record_size: reader.read_u16("record_size", cg + CG_RECORD_SIZE_FIELD)?,
        record_count: reader.read_u32("record_count", cg + CG_RECORD_COUNT_FIELD)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HeaderFixture;

    #[test]
    fn decodes_fixture_header() {
        let record = decode_bytes(&HeaderFixture::new().build()).unwrap();
        assert_eq!(record.file_identifier, "MDF");
        assert_eq!(record.format_identifier, "330");
        assert_eq!(record.program_identifier, "CANlog");
        assert_eq!(record.version_number, 330);
        assert_eq!(record.recording_date, "15:03:2024");
        assert_eq!(record.recording_time, "10:20:05");
        assert_eq!(record.author_name, "TestDriver");
        assert_eq!(record.project_name, "Bench42");
        assert_eq!(record.epoch_seconds, 1710498005);
        assert_eq!(record.timestamp, "1710498005");
        assert_eq!(record.number_of_channels(), Some(12));
        assert_eq!(record.record_size(), Some(16));
        assert_eq!(record.number_of_records(), Some(4096));
    }

    #[test]
    fn zero_data_group_pointer_means_no_channel_group() {
        let record = decode_bytes(&HeaderFixture::new().without_channel_group().build()).unwrap();
        assert_eq!(record.data_group_pointer, 0);
        assert_eq!(record.channel_group, None);
    }

    #[test]
    fn zero_channel_group_pointer_means_no_channel_group() {
        let bytes = HeaderFixture::new().with_channel_group_pointer(0).build();
        assert_eq!(decode_bytes(&bytes).unwrap().channel_group, None);
    }

    #[test]
    fn wrong_block_id_is_rejected() {
        let mut bytes = HeaderFixture::new().build();
        bytes[HD_BLOCK as usize] = b'X';
        assert!(matches!(
            decode_bytes(&bytes),
            Err(FormatError::UnexpectedBlock { expected: "HD", offset: 64, .. })
        ));
    }
}
