//! BLIP extraction from the legacy global image store (spec.md §4.4).
//!
//! Grounded on `DevExzh-litchi`'s `src/images/bse.rs` (36-byte BSE
//! header field layout) and `src/images/blip.rs`, which uses
//! `flate2::read::ZlibDecoder`/`DeflateDecoder` to decompress metafile
//! BLIP payloads — the exact "attempt inflate, fall back to raw"
//! behavior spec.md §4.4 requires. `flate2` is a new dependency added
//! for this reason; the teacher has no compression crate beyond zip's
//! built-in deflate.

use crate::byte_reader::ByteReader;
use crate::escher::{self, EscherIter};
use std::io::Read;

pub(crate) const REC_TYPE_EMF: u16 = 0xF01A;
pub(crate) const REC_TYPE_WMF: u16 = 0xF01B;
pub(crate) const REC_TYPE_PICT: u16 = 0xF01C;
pub(crate) const REC_TYPE_JPEG: u16 = 0xF01D;
pub(crate) const REC_TYPE_PNG: u16 = 0xF01E;
pub(crate) const REC_TYPE_DIB: u16 = 0xF01F;
pub(crate) const REC_TYPE_TIFF: u16 = 0xF029;
pub(crate) const REC_TYPE_JPEG2: u16 = 0xF02A;

/// One decoded image from the legacy global BLIP store, keyed by its
/// 1-based BSE index (spec.md §3's `BseEntry`).
pub(crate) struct LegacyImage {
    pub(crate) bse_index: usize,
    pub(crate) mime: String,
    pub(crate) bytes: Vec<u8>,
}

/// Walk `DggContainer(0xF000) → BStoreContainer(0xF001) → BSE(0xF007)*`
/// in `dgg_data` (the concatenated `MsoDrawingGroup` payloads from the
/// globals sub-stream) and decode each BSE's embedded BLIP.
///
/// BSE records are indexed in iteration order starting at 1. A BSE that
/// fails to decode (prelude underflow, unsupported structure) is
/// skipped — its index is still consumed so later indices stay
/// correctly aligned with sheet-anchor `pib` references.
pub(crate) fn extract_blip_store(dgg_data: &[u8]) -> Vec<LegacyImage> {
    let mut images = Vec::new();

    let Some(dgg) = escher::find_first(dgg_data, escher::REC_TYPE_DGG_CONTAINER) else {
        log::debug!("blip: no DggContainer found in drawing group data");
        return images;
    };
    let Some(bstore) = escher::find_first(dgg.payload, escher::REC_TYPE_BSTORE_CONTAINER) else {
        log::debug!("blip: no BStoreContainer found under DggContainer");
        return images;
    };

    let mut index = 0usize;
    for rec in EscherIter::new(bstore.payload) {
        if rec.header.rec_type != escher::REC_TYPE_BSE {
            continue;
        }
        index += 1;
        match parse_bse(rec.payload) {
            Some((mime, bytes)) => images.push(LegacyImage {
                bse_index: index,
                mime,
                bytes,
            }),
            None => log::debug!("blip: BSE #{index} failed to decode, skipping"),
        }
    }

    images
}

/// Parse one BSE payload: the fixed 36-byte header, the optional name,
/// then the embedded BLIP record (its own Escher header followed by a
/// per-type prelude and the raw image bytes).
fn parse_bse(payload: &[u8]) -> Option<(String, Vec<u8>)> {
    let r = ByteReader::new(payload);
    if payload.len() < 36 {
        return None;
    }
    let cb_name = r.u8_at(33)? as usize;
    let embedded_start = 36 + cb_name;
    let embedded = payload.get(embedded_start..)?;

    let blip_rec = EscherIter::new(embedded).next()?;
    decode_blip(blip_rec.header.rec_type, blip_rec.header.instance, blip_rec.payload)
}

/// Strip the per-type UID/tag prelude from a BLIP record payload and
/// return `(mime, raw_bytes)`. Returns `None` if the prelude underflows
/// the available data (spec.md §7: skip, don't error).
fn decode_blip(rec_type: u16, instance: u16, payload: &[u8]) -> Option<(String, Vec<u8>)> {
    match rec_type {
        REC_TYPE_EMF | REC_TYPE_WMF | REC_TYPE_PICT => {
            let mime = match rec_type {
                REC_TYPE_EMF => "image/x-emf",
                REC_TYPE_WMF => "image/x-wmf",
                _ => "image/pict",
            };
            let mut offset = 16;
            if matches!(instance, 0x3D5 | 0x217 | 0x543) {
                offset += 16;
            }
            offset += 34; // metafile header
            let remainder = payload.get(offset..)?;
            Some((mime.to_string(), inflate_or_raw(remainder)))
        }
        REC_TYPE_JPEG | REC_TYPE_JPEG2 => {
            let mut offset = 16;
            if matches!(instance, 0x46B | 0x6E3) {
                offset += 16;
            }
            offset += 1;
            Some(("image/jpeg".to_string(), payload.get(offset..)?.to_vec()))
        }
        REC_TYPE_PNG => {
            let mut offset = 16;
            if instance == 0x6E1 {
                offset += 16;
            }
            offset += 1;
            Some(("image/png".to_string(), payload.get(offset..)?.to_vec()))
        }
        REC_TYPE_DIB => {
            let mut offset = 16;
            if instance == 0x7A9 {
                offset += 16;
            }
            offset += 1;
            Some(("image/bmp".to_string(), payload.get(offset..)?.to_vec()))
        }
        REC_TYPE_TIFF => {
            let mut offset = 16;
            if instance == 0x6E5 {
                offset += 16;
            }
            offset += 1;
            Some(("image/tiff".to_string(), payload.get(offset..)?.to_vec()))
        }
        _ => Some(("application/octet-stream".to_string(), payload.get(17..)?.to_vec())),
    }
}

/// Attempt zlib inflate; on any failure (not actually compressed, or
/// corrupt stream) fall back to the raw bytes unchanged.
fn inflate_or_raw(data: &[u8]) -> Vec<u8> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    match decoder.read_to_end(&mut out) {
        Ok(_) if !out.is_empty() => out,
        _ => data.to_vec(),
    }
}
