use std::io::{Read, Seek, SeekFrom};

use crate::{FormatError, FormatResult};

/// Bounds-checked little-endian reads over a seekable source
pub(crate) struct HeaderReader<R> {
    inner: R,
    len: u64,
}

impl<R: Read + Seek> HeaderReader<R> {
    pub fn new(mut inner: R) -> FormatResult<Self> {
        let len = inner.seek(SeekFrom::End(0)).map_err(|e| io_error(0, e))?;
        Ok(Self { inner, len })
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    /// Read `N` bytes at an absolute offset
    pub fn read_array<const N: usize>(&mut self, field: &'static str, offset: u64) -> FormatResult<[u8; N]> {
        let available = self.len.saturating_sub(offset);
        if available < N as u64 {
            return Err(FormatError::truncated(field, offset, N, available));
        }
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(|e| io_error(offset, e))?;
        let mut buf = [0u8; N];
        self.inner.read_exact(&mut buf).map_err(|e| io_error(offset, e))?;
        Ok(buf)
    }

    /// Read a fixed-width field described by `(offset, width)`
    pub fn read_field(&mut self, field: &'static str, (offset, width): (u64, usize)) -> FormatResult<Vec<u8>> {
        let available = self.len.saturating_sub(offset);
        if available < width as u64 {
            return Err(FormatError::truncated(field, offset, width, available));
        }
        self.inner
            .seek(SeekFrom::Start(offset))
            .map_err(|e| io_error(offset, e))?;
        let mut buf = vec![0u8; width];
        self.inner.read_exact(&mut buf).map_err(|e| io_error(offset, e))?;
        Ok(buf)
    }

    pub fn read_u16(&mut self, field: &'static str, offset: u64) -> FormatResult<u16> {
        self.read_array::<2>(field, offset).map(u16::from_le_bytes)
    }

    pub fn read_u32(&mut self, field: &'static str, offset: u64) -> FormatResult<u32> {
        self.read_array::<4>(field, offset).map(u32::from_le_bytes)
    }

    /// Validate a block pointer read at `offset`: the block it names must fit
    /// `min_len` bytes inside the file
    pub fn check_pointer(
        &self,
        block: &'static str,
        offset: u64,
        pointer: u32,
        min_len: u64,
    ) -> FormatResult<u64> {
        let pointer = u64::from(pointer);
        match pointer.checked_add(min_len) {
            Some(end) if end <= self.len => Ok(pointer),
            _ => Err(FormatError::pointer_out_of_bounds(block, offset, pointer, self.len)),
        }
    }
}

fn io_error(offset: u64, err: std::io::Error) -> FormatError {
    FormatError::Io {
        offset,
        message: err.to_string(),
    }
}
