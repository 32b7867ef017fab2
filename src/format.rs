//! Magic-byte format detection (spec.md §4.1).

use crate::error::{Result, XlImgError};

const ZIP_MAGIC: [u8; 2] = [0x50, 0x4B];
const CFB_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    Ooxml,
    Legacy,
}

/// Reads the first four bytes and dispatches by signature.
///
/// Files shorter than four bytes, and files whose signature matches
/// neither ZIP nor CFB, fail with `InvalidRequest`.
pub(crate) fn detect(data: &[u8]) -> Result<Format> {
    if data.len() < 4 {
        return Err(XlImgError::InvalidRequest(
            "File too short to be a valid workbook".into(),
        ));
    }
    if data[..2] == ZIP_MAGIC {
        return Ok(Format::Ooxml);
    }
    if data[..4] == CFB_MAGIC {
        return Ok(Format::Legacy);
    }
    Err(XlImgError::InvalidRequest(
        "Unrecognized file signature (not ZIP or CFB)".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_zip() {
        let data = [0x50, 0x4B, 0x03, 0x04];
        assert_eq!(detect(&data).unwrap(), Format::Ooxml);
    }

    #[test]
    fn detects_cfb() {
        let data = [0xD0, 0xCF, 0x11, 0xE0, 0, 0, 0, 0];
        assert_eq!(detect(&data).unwrap(), Format::Legacy);
    }

    #[test]
    fn rejects_short_file() {
        let data = [0x50, 0x4B];
        assert!(matches!(detect(&data), Err(XlImgError::InvalidRequest(_))));
    }

    #[test]
    fn rejects_unknown_signature() {
        let data = [0x25, 0x50, 0x44, 0x46];
        assert!(matches!(detect(&data), Err(XlImgError::InvalidRequest(_))));
    }
}
