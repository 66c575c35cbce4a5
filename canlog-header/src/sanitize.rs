/// Keep only `[A-Za-z0-9]` bytes of a raw text field
pub fn sanitize(raw: &[u8]) -> String {
    raw.iter()
        .filter(|b| b.is_ascii_alphanumeric())
        .map(|&b| char::from(b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_everything_but_alphanumerics() {
        assert_eq!(sanitize(b"CAN\x00\x00log!!"), "CANlog");
        assert_eq!(sanitize(b"MDF     "), "MDF");
        assert_eq!(sanitize(b"V3.30\xff\xfe"), "V330");
        assert_eq!(sanitize(b"\x00\x00"), "");
    }
}
