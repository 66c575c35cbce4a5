use std::io::Write;

use canlog_header::{decode, decode_bytes, decode_file, FormatError, HeaderFixture, FIXED_HEADER_LEN};
use proptest::prelude::*;

#[test]
fn test_identifier_fields_are_sanitized() {
    let bytes = HeaderFixture::new()
        .with_file_identifier(b"CAN\x00\x00log!!")
        .with_subject_name(b"  run #7 (cold) \xff")
        .build();
    let record = decode_bytes(&bytes).unwrap();
    assert_eq!(record.file_identifier, "CANlog");
    assert_eq!(record.subject_name, "run7cold");
}

#[test]
fn test_decoding_is_deterministic() {
    let bytes = HeaderFixture::new().with_payload(b"AAAABBBBCCCC").build();
    assert_eq!(decode_bytes(&bytes).unwrap(), decode_bytes(&bytes).unwrap());
}

#[test]
fn test_payload_after_header_does_not_change_record() {
    let bare = HeaderFixture::new().build();
    let with_payload = HeaderFixture::new().with_payload(&[0xAB; 1024]).build();
    assert_eq!(decode_bytes(&bare).unwrap(), decode_bytes(&with_payload).unwrap());
}

#[test]
fn test_non_ascii_date_is_a_format_error() {
    let bytes = HeaderFixture::new().with_recording_date(b"15:03:\xc3\xa9024").build();
    assert_eq!(
        decode_bytes(&bytes),
        Err(FormatError::InvalidAscii {
            field: "recording_date",
            offset: 88,
        })
    );
}

#[test]
fn test_unparsable_time_is_a_format_error() {
    let bytes = HeaderFixture::new().with_recording_time(b"10-20-05").build();
    assert!(matches!(decode_bytes(&bytes), Err(FormatError::InvalidTimestamp { .. })));
}

#[test]
fn test_truncated_header_names_first_missing_field() {
    let bytes = HeaderFixture::new().build();
    let err = decode_bytes(&bytes[..120]).unwrap_err();
    assert_eq!(err, FormatError::truncated("author_name", 100, 32, 20));

    let err = decode_bytes(&bytes[..4]).unwrap_err();
    assert!(matches!(err, FormatError::Truncated { field: "file_identifier", .. }));
}

#[test]
fn test_data_group_pointer_past_end_is_out_of_bounds() {
    let bytes = HeaderFixture::new().with_data_group_pointer(0x10_0000).build();
    let err = decode_bytes(&bytes).unwrap_err();
    assert!(matches!(
        err,
        FormatError::PointerOutOfBounds { block: "DG", offset: 68, pointer: 0x10_0000, .. }
    ));
    assert_eq!(err.offset(), Some(68));
}

#[test]
fn test_channel_group_pointer_past_end_is_out_of_bounds() {
    let bytes = HeaderFixture::new().with_channel_group_pointer(u32::MAX).build();
    assert!(matches!(
        decode_bytes(&bytes),
        Err(FormatError::PointerOutOfBounds { block: "CG", .. })
    ));
}

#[test]
fn test_file_and_memory_decode_identically() {
    let bytes = HeaderFixture::new()
        .with_channel_group(3, 8, 77)
        .with_payload(b"AAAABBBBCCCC")
        .build();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&bytes).unwrap();
    file.flush().unwrap();

    let from_file = decode_file(file.path()).unwrap();
    let from_reader = decode(std::io::Cursor::new(bytes.clone())).unwrap();
    assert_eq!(from_file, from_reader);
    assert_eq!(from_file.number_of_records(), Some(77));
}

#[test]
fn test_missing_file_is_an_io_format_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        decode_file(&dir.path().join("absent.log")),
        Err(FormatError::Io { .. })
    ));
}

proptest! {
    /// Arbitrary bytes never panic the decoder
    #[test]
    fn arbitrary_bytes_decode_or_fail_cleanly(bytes in prop::collection::vec(any::<u8>(), 0..400)) {
        let _ = decode_bytes(&bytes);
    }

    /// Corrupting any byte of a name field keeps the header decodable
    #[test]
    fn name_bytes_never_break_decoding(
        author in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        let bytes = HeaderFixture::new().with_author_name(&author).build();
        let record = decode_bytes(&bytes).unwrap();
        prop_assert!(record.author_name.bytes().all(|b| b.is_ascii_alphanumeric()));
        prop_assert!(bytes.len() as u64 >= FIXED_HEADER_LEN);
    }
}
