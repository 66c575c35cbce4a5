//! Byte layout of the header. All offsets are absolute from the start of the file
//! except the `*_FIELD` offsets of linked blocks, which are relative to the block start.

pub const FILE_IDENTIFIER: (u64, usize) = (0, 8);
pub const FORMAT_IDENTIFIER: (u64, usize) = (8, 8);
pub const PROGRAM_IDENTIFIER: (u64, usize) = (16, 8);
pub const BYTE_ORDER: u64 = 24;
pub const FLOATING_POINT_FORMAT: u64 = 26;
pub const VERSION_NUMBER: u64 = 28;
pub const CODE_PAGE_NUMBER: u64 = 30;
pub const RESERVED_01: (u64, usize) = (32, 2);
pub const RESERVED_02: (u64, usize) = (34, 26);
pub const STANDARD_CG_FLAGS: u64 = 60;
pub const STANDARD_SR_FLAGS: u64 = 62;

/// Start of the header (HD) block
pub const HD_BLOCK: u64 = 64;
pub const HD_BLOCK_SIZE: u64 = 66;
pub const HD_DATA_GROUP_POINTER: u64 = 68;
pub const HD_FILE_COMMENT_POINTER: u64 = 72;
pub const HD_PROGRAM_BLOCK_POINTER: u64 = 76;
pub const HD_DATA_GROUP_COUNT: u64 = 80;
pub const RECORDING_DATE: (u64, usize) = (82, 10);
pub const RECORDING_TIME: (u64, usize) = (92, 8);
pub const AUTHOR_NAME: (u64, usize) = (100, 32);
pub const ORGANIZATION_NAME: (u64, usize) = (132, 32);
pub const PROJECT_NAME: (u64, usize) = (164, 32);
pub const SUBJECT_NAME: (u64, usize) = (196, 32);

/// First byte past the fixed header
pub const FIXED_HEADER_LEN: u64 = 228;

pub const DG_ID: &[u8; 2] = b"DG";
pub const DG_CHANNEL_GROUP_POINTER_FIELD: u64 = 8;
/// Bytes of a data-group block the decoder reads
pub const DG_MIN_LEN: u64 = 12;

pub const CG_ID: &[u8; 2] = b"CG";
pub const CG_RECORD_ID_FIELD: u64 = 16;
pub const CG_CHANNEL_COUNT_FIELD: u64 = 18;
pub const CG_RECORD_SIZE_FIELD: u64 = 20;
pub const CG_RECORD_COUNT_FIELD: u64 = 22;
/// Bytes of a channel-group block the decoder reads
pub const CG_MIN_LEN: u64 = 26;

pub const HD_ID: &[u8; 2] = b"HD";

/// `strftime` pattern of the joined recording date and time
pub const TIMESTAMP_FORMAT: &str = "%d:%m:%Y %H:%M:%S";
