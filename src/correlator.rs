//! Correlator & budgeter (spec.md §4.7): groups anchors by image,
//! applies the optional sheet filter, enforces the cumulative size
//! ceiling, and emits the final `ExtractionResult`.
//!
//! No direct teacher analog exists (the teacher never aggregates
//! extracted assets against a budget); the shape below follows
//! spec.md's prose directly, using the same plain `Vec`/`HashMap`
//! accumulate-then-finalize idiom as the teacher's `GridBuilder` in
//! `xls.rs`.

use crate::{ExtractedImage, ExtractionResult, ImagePosition, SIZE_BUDGET_BYTES};
use base64::Engine;
use std::collections::HashMap;

/// Identifies one distinct image across both pipelines.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum ImageKey {
    /// 1-based index into the legacy global BLIP store.
    LegacyBse(usize),
    /// Normalized archive path under `xl/media/`.
    OoxmlMedia(String),
}

/// One decoded image available for emission.
pub(crate) struct RawImage {
    pub(crate) key: ImageKey,
    pub(crate) mime: String,
    pub(crate) bytes: Vec<u8>,
}

/// One anchor binding an image to a cell rectangle on a sheet.
pub(crate) struct AnchorEntry {
    pub(crate) sheet: String,
    pub(crate) key: ImageKey,
    pub(crate) from_row: u32,
    pub(crate) from_col: u32,
    pub(crate) to_row: u32,
    pub(crate) to_col: u32,
}

/// The order in which images should be considered for emission.
pub(crate) struct ImageOrder {
    /// Images with at least one anchor, in discovery order. For the
    /// legacy path this is BSE-index ascending (spec.md §8); for OOXML
    /// it's the order anchors were first encountered while walking
    /// drawings.
    pub(crate) referenced: Vec<ImageKey>,
    /// Remaining images with no anchor at all, in their natural
    /// (media-directory) order. Only appended when `append_unreferenced`
    /// is set on the `correlate` call — i.e. OOXML with no sheet filter.
    pub(crate) unreferenced: Vec<ImageKey>,
}

/// Group anchors by image, apply the sheet filter, and enforce the 10
/// MiB cumulative base64 budget.
///
/// `legacy`: for the legacy path, an image with zero anchors at all is
/// always dropped regardless of filter (spec.md §9's documented
/// asymmetry); for OOXML an unfiltered unreferenced image is still
/// emitted with an empty position list.
pub(crate) fn correlate(
    images: Vec<RawImage>,
    anchors: &[AnchorEntry],
    sheet_filter: Option<&str>,
    order: ImageOrder,
    append_unreferenced: bool,
) -> ExtractionResult {
    let mut images_by_key: HashMap<ImageKey, RawImage> =
        images.into_iter().map(|img| (img.key.clone(), img)).collect();

    let mut positions_by_key: HashMap<ImageKey, Vec<ImagePosition>> = HashMap::new();
    for anchor in anchors {
        positions_by_key
            .entry(anchor.key.clone())
            .or_default()
            .push(ImagePosition {
                sheet: anchor.sheet.clone(),
                from_row: anchor.from_row,
                from_col: anchor.from_col,
                to_row: anchor.to_row,
                to_col: anchor.to_col,
            });
    }

    let mut emit_order = order.referenced;
    if append_unreferenced {
        emit_order.extend(order.unreferenced);
    }

    let mut result_images = Vec::new();
    let mut truncated = false;
    let mut running_total = 0usize;
    let mut counter = 0usize;
    let encoder = base64::engine::general_purpose::STANDARD;

    for key in emit_order {
        let Some(raw) = images_by_key.remove(&key) else {
            continue;
        };
        let all_positions = positions_by_key.remove(&key).unwrap_or_default();

        let positions = match sheet_filter {
            Some(filter) => {
                let filtered: Vec<ImagePosition> = all_positions
                    .into_iter()
                    .filter(|p| p.sheet == filter)
                    .collect();
                if filtered.is_empty() {
                    continue;
                }
                filtered
            }
            None => all_positions,
        };

        let encoded = encoder.encode(&raw.bytes);
        if running_total + encoded.len() > SIZE_BUDGET_BYTES {
            truncated = true;
            break;
        }
        running_total += encoded.len();

        counter += 1;
        let name = format!("image{counter}{}", extension_for_mime(&raw.mime));
        result_images.push(ExtractedImage {
            name,
            mime_type: raw.mime,
            data: encoded,
            positions,
        });
    }

    ExtractionResult {
        images: result_images,
        truncated,
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => ".png",
        "image/jpeg" => ".jpeg",
        "image/gif" => ".gif",
        "image/bmp" => ".bmp",
        "image/tiff" => ".tiff",
        "image/x-emf" => ".emf",
        "image/x-wmf" => ".wmf",
        "image/pict" => ".pict",
        "image/svg+xml" => ".svg",
        _ => ".bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png(key: ImageKey, bytes: &[u8]) -> RawImage {
        RawImage {
            key,
            mime: "image/png".into(),
            bytes: bytes.to_vec(),
        }
    }

    #[test]
    fn groups_positions_across_sheets() {
        let images = vec![png(ImageKey::OoxmlMedia("xl/media/image1.png".into()), b"abc")];
        let anchors = vec![
            AnchorEntry {
                sheet: "Sheet1".into(),
                key: ImageKey::OoxmlMedia("xl/media/image1.png".into()),
                from_row: 0,
                from_col: 0,
                to_row: 3,
                to_col: 2,
            },
            AnchorEntry {
                sheet: "Sheet2".into(),
                key: ImageKey::OoxmlMedia("xl/media/image1.png".into()),
                from_row: 1,
                from_col: 1,
                to_row: 4,
                to_col: 4,
            },
        ];
        let order = ImageOrder {
            referenced: vec![ImageKey::OoxmlMedia("xl/media/image1.png".into())],
            unreferenced: vec![],
        };
        let result = correlate(images, &anchors, None, order, false);
        assert_eq!(result.images.len(), 1);
        assert_eq!(result.images[0].positions.len(), 2);
        assert!(!result.truncated);
    }

    #[test]
    fn sheet_filter_drops_nonmatching_image() {
        let key1 = ImageKey::OoxmlMedia("xl/media/image1.png".into());
        let key2 = ImageKey::OoxmlMedia("xl/media/image2.png".into());
        let images = vec![png(key1.clone(), b"a"), png(key2.clone(), b"b")];
        let anchors = vec![
            AnchorEntry {
                sheet: "Sheet1".into(),
                key: key1.clone(),
                from_row: 0,
                from_col: 0,
                to_row: 1,
                to_col: 1,
            },
            AnchorEntry {
                sheet: "Sheet2".into(),
                key: key2.clone(),
                from_row: 0,
                from_col: 0,
                to_row: 1,
                to_col: 1,
            },
        ];
        let order = ImageOrder {
            referenced: vec![key1, key2],
            unreferenced: vec![],
        };
        let result = correlate(images, &anchors, Some("Sheet1"), order, false);
        assert_eq!(result.images.len(), 1);
    }

    #[test]
    fn unreferenced_appended_only_when_requested() {
        let key1 = ImageKey::OoxmlMedia("xl/media/image1.png".into());
        let images = vec![png(key1.clone(), b"a")];
        let order = ImageOrder {
            referenced: vec![],
            unreferenced: vec![key1],
        };
        let result = correlate(images, &[], None, order, false);
        assert!(result.images.is_empty());
    }

    #[test]
    fn budget_exhaustion_sets_truncated() {
        let mut images = Vec::new();
        let mut order_keys = Vec::new();
        for i in 0..20 {
            let key = ImageKey::LegacyBse(i + 1);
            images.push(RawImage {
                key: key.clone(),
                mime: "image/png".into(),
                bytes: vec![0u8; 1024 * 1024],
            });
            order_keys.push(key);
        }
        let order = ImageOrder {
            referenced: order_keys,
            unreferenced: vec![],
        };
        let result = correlate(images, &[], None, order, false);
        assert!(result.truncated);
        let total: usize = result.images.iter().map(|i| i.data.len()).sum();
        assert!(total <= SIZE_BUDGET_BYTES);
    }

    #[test]
    fn legacy_drops_images_without_any_anchor() {
        let key1 = ImageKey::LegacyBse(1);
        let images = vec![png(key1.clone(), b"a")];
        // No anchors at all for key1 — referenced list built by the
        // legacy pipeline would never include it; simulate that here.
        let order = ImageOrder {
            referenced: vec![],
            unreferenced: vec![],
        };
        let result = correlate(images, &[], None, order, false);
        assert!(result.images.is_empty());
    }
}
