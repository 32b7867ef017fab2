//! Sheet-anchor parsing for the legacy path (spec.md §4.5).
//!
//! Walks the Escher tree built from a worksheet's concatenated
//! `MsoDrawing` payloads, finds every `SpContainer` (0xF004), and pairs
//! its `ClientAnchor` with the `pib` property from its `OPT`/`FOPT`
//! table. Record type constants are grounded on `DevExzh-litchi`'s
//! `ole/escher` family; the tagged `ShapeKind` variant follows spec.md
//! §9's explicit design note rather than an untyped property lookup.

use crate::byte_reader::ByteReader;
use crate::escher::{self, EscherIter};

/// Whether an `SpContainer`'s OPT table identifies it as a picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ShapeKind {
    /// Carries the 1-based BSE index from the `pib` (0x0104) property.
    Picture(usize),
    Other,
}

/// One resolved anchor: a BSE index plus the cell rectangle it's bound
/// to. Sheet attribution happens in the caller (`xls.rs`), which knows
/// which worksheet this drawing payload belongs to.
pub(crate) struct LegacyAnchor {
    pub(crate) bse_index: usize,
    pub(crate) from_col: u32,
    pub(crate) from_row: u32,
    pub(crate) to_col: u32,
    pub(crate) to_row: u32,
}

/// Parse every anchor in one worksheet's concatenated `MsoDrawing`
/// payload. An `SpContainer` contributes an anchor iff it has both a
/// `ClientAnchor` and a positive `pib` property; otherwise it's
/// silently skipped (spec.md §4.5, §7).
pub(crate) fn parse_sheet_anchors(mso_drawing_data: &[u8]) -> Vec<LegacyAnchor> {
    let mut anchors = Vec::new();
    escher::for_each_sp_container(mso_drawing_data, &mut |sp_payload| {
        if let Some(anchor) = parse_sp_container(sp_payload) {
            anchors.push(anchor);
        } else {
            log::debug!("legacy_anchor: SpContainer without anchor+pib, skipping");
        }
    });
    anchors
}

fn parse_sp_container(data: &[u8]) -> Option<LegacyAnchor> {
    let mut rect = None;
    let mut shape_kind = ShapeKind::Other;

    for rec in EscherIter::new(data) {
        match rec.header.rec_type {
            escher::REC_TYPE_CLIENT_ANCHOR => {
                rect = parse_client_anchor(rec.payload);
            }
            escher::REC_TYPE_OPT | escher::REC_TYPE_FOPT => {
                shape_kind = parse_opt_table(rec.header.instance, rec.payload);
            }
            _ => {}
        }
    }

    let (from_col, from_row, to_col, to_row) = rect?;
    match shape_kind {
        ShapeKind::Picture(bse_index) => Some(LegacyAnchor {
            bse_index,
            from_col,
            from_row,
            to_col,
            to_row,
        }),
        ShapeKind::Other => None,
    }
}

/// `flag:u16, col1:u16, dx1:u16, row1:u16, dy1:u16, col2:u16, dx2:u16,
/// row2:u16, dy2:u16` (18 bytes). Returns `(col1, row1, col2, row2)`.
fn parse_client_anchor(data: &[u8]) -> Option<(u32, u32, u32, u32)> {
    let r = ByteReader::new(data);
    let col1 = r.u16_at(2)?;
    let row1 = r.u16_at(6)?;
    let col2 = r.u16_at(10)?;
    let row2 = r.u16_at(14)?;
    Some((col1 as u32, row1 as u32, col2 as u32, row2 as u32))
}

/// `instance` entries of `propId:u16, value:i32` (6 bytes each). The
/// property whose low 14 bits equal `0x0104` (pib) carries the 1-based
/// BSE index.
fn parse_opt_table(instance: u16, data: &[u8]) -> ShapeKind {
    let r = ByteReader::new(data);
    for i in 0..instance as usize {
        let off = i * 6;
        let Some(prop_id) = r.u16_at(off) else {
            break;
        };
        let Some(value) = r.i32_at(off + 2) else {
            break;
        };
        if prop_id & 0x3FFF == 0x0104 && value > 0 {
            return ShapeKind::Picture(value as usize);
        }
    }
    ShapeKind::Other
}
