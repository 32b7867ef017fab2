//! Windows codepage to `encoding_rs` encoding mapping.
//!
//! Provides a function to decode 8-bit text using a Windows codepage ID,
//! used when decoding compressed (non-Unicode) `BOUNDSHEET` sheet names
//! in the legacy `.xls` path. Falls back to cp1252 (Western European)
//! for unknown or unsupported codepages.

use encoding_rs::Encoding;

/// Decode a single byte using the given Windows codepage, returning its
/// Unicode code point.
///
/// For ASCII bytes (< 0x80), returns the byte value directly (all Windows
/// codepages are ASCII-compatible). For high bytes, decodes through
/// `encoding_rs`. Used for compressed (8-bit) BIFF8 `BOUNDSHEET` strings.
pub(crate) fn decode_byte(byte: u8, codepage: u16) -> char {
    if byte < 0x80 {
        return char::from(byte);
    }
    let encoding = codepage_to_encoding(codepage);
    let buf = [byte];
    let (cow, _encoding_used, _had_errors) = encoding.decode(&buf);
    cow.chars().next().unwrap_or('\u{FFFD}')
}

/// Map a Windows codepage ID to an `encoding_rs` encoding.
///
/// Covers the codepages most commonly encountered in Office documents.
/// Unknown codepages fall back to Windows-1252 (Western European), which
/// is the most common encoding in legacy Office files.
fn codepage_to_encoding(codepage: u16) -> &'static Encoding {
    match codepage {
        437 => encoding_rs::IBM866, // DOS US — closest available; not perfect
        874 => encoding_rs::WINDOWS_874,
        932 => encoding_rs::SHIFT_JIS,
        936 => encoding_rs::GBK,
        949 => encoding_rs::EUC_KR,
        950 => encoding_rs::BIG5,
        1250 => encoding_rs::WINDOWS_1250,
        1251 => encoding_rs::WINDOWS_1251,
        1253 => encoding_rs::WINDOWS_1253,
        1254 => encoding_rs::WINDOWS_1254,
        1255 => encoding_rs::WINDOWS_1255,
        1256 => encoding_rs::WINDOWS_1256,
        1257 => encoding_rs::WINDOWS_1257,
        1258 => encoding_rs::WINDOWS_1258,
        10000 => encoding_rs::MACINTOSH,
        20866 => encoding_rs::KOI8_R,
        21866 => encoding_rs::KOI8_U,
        28592 => encoding_rs::ISO_8859_2,
        28595 => encoding_rs::ISO_8859_5,
        28597 => encoding_rs::ISO_8859_7,
        28598 => encoding_rs::ISO_8859_8,
        65001 => encoding_rs::UTF_8,
        _ => encoding_rs::WINDOWS_1252, // cp1252 / ISO-8859-1 / default
    }
}
