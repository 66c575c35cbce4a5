//! # canlog-header
//!
//! Decoder for the fixed-layout binary header at the start of a CAN measurement log.
//!
//! The header is a 64-byte file identification block followed by an `HD` block holding
//! the recording date and time, free-text names, and a pointer to the first data group.
//! When present, the data group points at a channel group carrying the channel count,
//! record size and record count. All integers are little-endian.
//!
//! ```rust
//! # fn main() -> canlog_header::FormatResult<()> {
//! # let bytes = vec![0u8; 16];
//! match canlog_header::decode_bytes(&bytes) {
//!     Ok(record) => println!("recorded at {}", record.timestamp),
//!     Err(e) => println!("not a recording: {e}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Decoding is a pure function of the input bytes.

mod decode;
mod error;
mod layout;
mod reader;
mod record;
mod sanitize;
mod timestamp;

#[cfg(any(test, feature = "test-util"))]
mod fixture;

pub use decode::{decode, decode_bytes, decode_file};
pub use error::{FormatError, FormatResult};
pub use layout::FIXED_HEADER_LEN;
pub use record::{ChannelGroup, HeaderRecord};
pub use sanitize::sanitize;
pub use timestamp::{epoch_seconds, epoch_text, truncate_epoch_text};

#[cfg(any(test, feature = "test-util"))]
pub use fixture::{FixtureChannelGroup, HeaderFixture};
