//! Legacy BIFF8 `.xls` pipeline (spec.md §4.1-§4.5): open the OLE2
//! compound file, split the BIFF8 stream into sub-streams, pull the
//! global BLIP store and per-sheet shape anchors out of the Escher
//! records embedded in `MsoDrawingGroup`/`MsoDrawing`, then correlate.
//!
//! Grounded on the teacher's `xls.rs` for the OLE2 entry point
//! (`/Workbook`/`/Book` stream lookup) and `BoundSheet8` string
//! decoding (Unicode vs. codepage-compressed); the Escher/BLIP side has
//! no teacher analog and comes from `biff.rs`/`escher.rs`/`blip.rs`/
//! `legacy_anchor.rs` instead.

use crate::biff;
use crate::blip::{self, LegacyImage};
use crate::codepage;
use crate::correlator::{self, AnchorEntry, ImageKey, ImageOrder, RawImage};
use crate::error::{Result, XlImgError};
use crate::legacy_anchor;
use crate::ExtractionResult;
use cfb::CompoundFile;
use std::collections::BTreeSet;
use std::io::{Cursor, Read};

const REC_CODEPAGE: u16 = 0x0042;

pub(crate) fn extract(data: &[u8], sheet_name: Option<&str>) -> Result<ExtractionResult> {
    let cfb = CompoundFile::open(Cursor::new(data))
        .map_err(|e| XlImgError::InvalidFormat(format!("not a valid OLE2 compound file: {e}")));
    let mut cfb = cfb?;

    let stream_name = if cfb.exists("/Workbook") {
        "/Workbook"
    } else if cfb.exists("/Book") {
        "/Book"
    } else {
        return Err(XlImgError::InvalidFormat(
            "not an Excel file (no Workbook or Book stream)".into(),
        ));
    };

    let mut stream = cfb.open_stream(stream_name)?;
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf)?;

    let records = biff::read_all_records(&buf);
    let substreams = biff::split_substreams(records);

    let globals = substreams
        .iter()
        .find(|s| s.index == 0)
        .ok_or_else(|| XlImgError::InvalidFormat("no workbook globals sub-stream".into()))?;

    let codepage = globals
        .records
        .iter()
        .find(|r| r.rec_type == REC_CODEPAGE)
        .and_then(|r| r.data.get(0..2))
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .unwrap_or(1252);

    let sheet_names: Vec<String> = globals
        .records
        .iter()
        .filter(|r| r.rec_type == biff::REC_BOUNDSHEET)
        .filter_map(|r| parse_boundsheet_name(&r.data, codepage))
        .collect();

    if sheet_names.is_empty() {
        return Err(XlImgError::InvalidFormat(
            "no BOUNDSHEET records in workbook globals".into(),
        ));
    }

    if let Some(filter) = sheet_name {
        if !sheet_names.iter().any(|n| n == filter) {
            return Err(XlImgError::InvalidRequest(format!("Sheet not found: {filter}")));
        }
    }

    let dgg_data: Vec<u8> = globals
        .records
        .iter()
        .filter(|r| r.rec_type == biff::REC_MSO_DRAWING_GROUP)
        .flat_map(|r| r.data.iter().copied())
        .collect();
    let legacy_images: Vec<LegacyImage> = blip::extract_blip_store(&dgg_data);

    let mut anchors: Vec<AnchorEntry> = Vec::new();
    let mut referenced_bse: BTreeSet<usize> = BTreeSet::new();

    for substream in substreams.iter().filter(|s| s.index >= 1) {
        let sheet_index = substream.index as usize - 1;
        let Some(sheet_display_name) = sheet_names.get(sheet_index) else {
            log::debug!("xls: sub-stream {} has no matching BOUNDSHEET entry, skipping", substream.index);
            continue;
        };
        if let Some(filter) = sheet_name {
            if sheet_display_name != filter {
                continue;
            }
        }

        let mso_data: Vec<u8> = substream
            .records
            .iter()
            .filter(|r| r.rec_type == biff::REC_MSO_DRAWING)
            .flat_map(|r| r.data.iter().copied())
            .collect();
        if mso_data.is_empty() {
            continue;
        }

        for anchor in legacy_anchor::parse_sheet_anchors(&mso_data) {
            referenced_bse.insert(anchor.bse_index);
            anchors.push(AnchorEntry {
                sheet: sheet_display_name.clone(),
                key: ImageKey::LegacyBse(anchor.bse_index),
                from_row: anchor.from_row,
                from_col: anchor.from_col,
                to_row: anchor.to_row,
                to_col: anchor.to_col,
            });
        }
    }

    let images: Vec<RawImage> = legacy_images
        .into_iter()
        .filter(|img| referenced_bse.contains(&img.bse_index))
        .map(|img| RawImage {
            key: ImageKey::LegacyBse(img.bse_index),
            mime: img.mime,
            bytes: img.bytes,
        })
        .collect();

    let referenced: Vec<ImageKey> = referenced_bse.into_iter().map(ImageKey::LegacyBse).collect();
    let order = ImageOrder {
        referenced,
        unreferenced: Vec::new(),
    };

    Ok(correlator::correlate(images, &anchors, sheet_name, order, false))
}

/// `BoundSheet8`: `bof_offset:u32, visibility:u8, sheet_type:u8,
/// str_len:u8, options:u8`, then the name — Unicode (`options & 0x01`)
/// or codepage-compressed. Only the name is needed; sub-stream order
/// already tells us which BOF/EOF block belongs to which sheet.
fn parse_boundsheet_name(data: &[u8], codepage: u16) -> Option<String> {
    if data.len() < 8 {
        return None;
    }
    let str_len = data[6] as usize;
    let options = data[7];
    if options & 0x01 != 0 {
        let byte_len = str_len * 2;
        let bytes = data.get(8..8 + byte_len)?;
        Some(decode_utf16le(bytes))
    } else {
        let bytes = data.get(8..8 + str_len)?;
        Some(
            bytes
                .iter()
                .map(|&b| codepage::decode_byte(b, codepage))
                .collect(),
        )
    }
}

fn decode_utf16le(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boundsheet_compressed(name: &str) -> Vec<u8> {
        let mut out = vec![0u8; 8];
        out[6] = name.len() as u8;
        out[7] = 0x00;
        out.extend_from_slice(name.as_bytes());
        out
    }

    fn boundsheet_unicode(name: &str) -> Vec<u8> {
        let mut out = vec![0u8; 8];
        out[6] = name.chars().count() as u8;
        out[7] = 0x01;
        for ch in name.encode_utf16() {
            out.extend_from_slice(&ch.to_le_bytes());
        }
        out
    }

    #[test]
    fn parses_compressed_boundsheet_name() {
        let data = boundsheet_compressed("Sheet1");
        assert_eq!(parse_boundsheet_name(&data, 1252).as_deref(), Some("Sheet1"));
    }

    #[test]
    fn parses_unicode_boundsheet_name() {
        let data = boundsheet_unicode("Blätter");
        assert_eq!(parse_boundsheet_name(&data, 1252).as_deref(), Some("Blätter"));
    }

    #[test]
    fn truncated_boundsheet_yields_none() {
        let data = vec![0u8; 4];
        assert!(parse_boundsheet_name(&data, 1252).is_none());
    }
}
