//! Shared XML/ZIP utility functions for the OOXML pipeline.
//!
//! Grounded on the teacher's `xml_util.rs` (`get_attr`, `rels_path`) and
//! `xlsx.rs` (`normalize_dotdot`). The teacher's `parse_rels_xml` only
//! captured hyperlink/External relationships, since it existed to
//! support hyperlink rendering; this crate needs every relationship
//! (drawing, image) regardless of type, so `parse_all_rels` replaces it.

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use zip::ZipArchive;

/// Relationship map: rId → Target.
pub(crate) type Rels = HashMap<String, String>;

/// Get an attribute value from an XML element by name.
pub(crate) fn get_attr(e: &quick_xml::events::BytesStart, attr_name: &[u8]) -> Option<String> {
    for attr in e.attributes().flatten() {
        if attr.key.as_ref() == attr_name {
            return std::str::from_utf8(&attr.value).ok().map(String::from);
        }
    }
    None
}

/// Parse an OOXML relationships XML string into an rId → Target map,
/// keeping every relationship regardless of type or target mode.
pub(crate) fn parse_all_rels(xml: &str) -> Rels {
    let mut rels = Rels::new();
    let mut reader = Reader::from_str(xml);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e) | Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = get_attr(e, b"Id").unwrap_or_default();
                let target = get_attr(e, b"Target").unwrap_or_default();
                if !id.is_empty() && !target.is_empty() {
                    rels.insert(id, target);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }

    rels
}

/// Load a relationships file from a ZIP archive and parse it into a
/// `Rels` map. Returns an empty map if the file doesn't exist or can't
/// be read (spec.md §7: absent rels file contributes no anchors).
pub(crate) fn load_rels(archive: &mut ZipArchive<Cursor<&[u8]>>, path: &str) -> Rels {
    let mut xml = String::new();
    match archive.by_name(path) {
        Ok(mut entry) => {
            if entry.read_to_string(&mut xml).is_err() {
                return Rels::new();
            }
        }
        Err(_) => return Rels::new(),
    }
    parse_all_rels(&xml)
}

/// Compute the `_rels` file path for a given OOXML part path.
///
/// For `xl/worksheets/sheet1.xml`, returns `xl/worksheets/_rels/sheet1.xml.rels`.
pub(crate) fn rels_path(part_path: &str) -> String {
    if let Some((dir, file)) = part_path.rsplit_once('/') {
        format!("{dir}/_rels/{file}.rels")
    } else {
        format!("_rels/{part_path}.rels")
    }
}

/// Resolve a relationship `Target` relative to the directory containing
/// the part that referenced it, per spec.md §4.6's path resolver: an
/// absolute target (leading `/`) is the archive path with the slash
/// stripped; otherwise `..` pops a base segment, `.` is a no-op, and
/// anything else is pushed.
pub(crate) fn resolve_path(base_dir: &str, target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        return stripped.to_string();
    }

    let mut parts: Vec<&str> = if base_dir.is_empty() {
        Vec::new()
    } else {
        base_dir.split('/').collect()
    };

    for segment in target.split('/') {
        match segment {
            ".." => {
                parts.pop();
            }
            "." | "" => {}
            other => parts.push(other),
        }
    }

    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_all_rels_captures_every_relationship() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type=".../worksheet" Target="worksheets/sheet1.xml"/>
  <Relationship Id="rId2" Type=".../drawing" Target="../drawings/drawing1.xml"/>
  <Relationship Id="rId3" Type=".../image" Target="../media/image1.png"/>
</Relationships>"#;
        let rels = parse_all_rels(xml);
        assert_eq!(rels.len(), 3);
        assert_eq!(rels.get("rId2").unwrap(), "../drawings/drawing1.xml");
    }

    #[test]
    fn rels_path_nested() {
        assert_eq!(
            rels_path("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
    }

    #[test]
    fn rels_path_no_dir() {
        assert_eq!(rels_path("sheet1.xml"), "_rels/sheet1.xml.rels");
    }

    #[test]
    fn resolve_relative_with_dotdot() {
        assert_eq!(
            resolve_path("xl/worksheets", "../drawings/drawing1.xml"),
            "xl/drawings/drawing1.xml"
        );
    }

    #[test]
    fn resolve_relative_from_drawing_to_media() {
        assert_eq!(
            resolve_path("xl/drawings", "../media/image1.png"),
            "xl/media/image1.png"
        );
    }

    #[test]
    fn resolve_absolute_path_strips_leading_slash() {
        assert_eq!(resolve_path("xl/worksheets", "/xl/media/image1.png"), "xl/media/image1.png");
    }

    #[test]
    fn resolve_dot_is_noop() {
        assert_eq!(resolve_path("xl", "./media/image1.png"), "xl/media/image1.png");
    }
}
