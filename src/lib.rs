//! Embedded image extraction engine for Excel workbooks.
//!
//! Extracts raster images embedded in `.xlsx` (OOXML package) and `.xls`
//! (OLE2 compound file with BIFF8 + Escher/Office-Art records) workbooks,
//! correlating each image with the cell anchor(s) that place it on a
//! worksheet. See [`extract`] for the single public entry point.
//!
//! Out of scope: tabular cell data, sheet listing, chart/non-picture
//! drawing objects, pixel decoding, and metafile rendering. Those are
//! left to other collaborators; this crate only extracts raw image
//! bytes and their positions.

mod biff;
mod blip;
mod byte_reader;
mod codepage;
mod correlator;
mod error;
mod escher;
mod format;
mod legacy_anchor;
mod ooxml;
mod xls;
mod xml_util;

use std::path::Path;

pub use error::{Result, XlImgError};

/// Upper bound on the cumulative base64-encoded length of emitted images.
pub(crate) const SIZE_BUDGET_BYTES: usize = 10 * 1024 * 1024;

/// The cell rectangle a shape is anchored to on a named worksheet.
///
/// For one-cell anchors (OOXML `oneCellAnchor`), `to_row == from_row` and
/// `to_col == from_col`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ImagePosition {
    pub sheet: String,
    #[serde(rename = "fromRow")]
    pub from_row: u32,
    #[serde(rename = "fromCol")]
    pub from_col: u32,
    #[serde(rename = "toRow")]
    pub to_row: u32,
    #[serde(rename = "toCol")]
    pub to_col: u32,
}

/// One distinct embedded image plus every cell position it's anchored at.
///
/// Two images are never merged even if byte-identical; `name` is a
/// synthetic `image<N><extension>` assigned at emission time.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ExtractedImage {
    pub name: String,
    #[serde(rename = "mimeType")]
    pub mime_type: String,
    /// Raw image bytes, base64-encoded for transport.
    pub data: String,
    pub positions: Vec<ImagePosition>,
}

/// The result of one `extract()` call.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ExtractionResult {
    pub images: Vec<ExtractedImage>,
    /// True iff the 10 MiB cumulative base64 size budget was reached and
    /// one or more further images were omitted. When `true`, the omitted
    /// images are not otherwise reported; callers that need them must
    /// re-run against a filtered subset of sheets.
    pub truncated: bool,
}

/// Extract every embedded image from the workbook at `file_path`.
///
/// `sheet_name`, if given, restricts the result to images anchored on
/// that worksheet; an image anchored on multiple sheets keeps only the
/// positions on the requested sheet. Passing a name that is not one of
/// the workbook's worksheets is an [`XlImgError::InvalidRequest`].
///
/// Format is detected by magic bytes, not by file extension. The whole
/// file is read into memory; there is no streaming mode and no
/// cancellation support (see the crate-level resource model notes in
/// `SPEC_FULL.md`).
pub fn extract(file_path: &Path, sheet_name: Option<&str>) -> Result<ExtractionResult> {
    if !file_path.is_file() {
        return Err(XlImgError::InvalidRequest(format!(
            "File not found: {}",
            file_path.display()
        )));
    }
    let data = std::fs::read(file_path)?;
    extract_bytes(&data, sheet_name)
}

/// Same as [`extract`] but operating on in-memory bytes. Exposed
/// crate-wide for tests that build synthetic fixtures without touching
/// the filesystem.
pub(crate) fn extract_bytes(data: &[u8], sheet_name: Option<&str>) -> Result<ExtractionResult> {
    match format::detect(data)? {
        format::Format::Ooxml => ooxml::extract(data, sheet_name),
        format::Format::Legacy => xls::extract(data, sheet_name),
    }
}
