//! Office-Art (Escher) record walker (spec.md §4.3).
//!
//! Grounded on `DevExzh-litchi`'s `src/ole/escher/parser.rs` — the only
//! repo in the example pack with any Escher/Office-Art code. Per
//! spec.md §9's design note, this is an iterator that yields
//! `(header, payload, is_container)` at a single container level and
//! leaves recursion to the caller, rather than eagerly building a tree
//! (litchi's own `EscherContainer`/`find_recursive` does build a tree;
//! this engine's narrower read-only walk doesn't need that machinery).

use crate::byte_reader::ByteReader;

pub(crate) const REC_TYPE_DGG_CONTAINER: u16 = 0xF000;
pub(crate) const REC_TYPE_BSTORE_CONTAINER: u16 = 0xF001;
pub(crate) const REC_TYPE_DG_CONTAINER: u16 = 0xF002;
pub(crate) const REC_TYPE_SPGR_CONTAINER: u16 = 0xF003;
pub(crate) const REC_TYPE_SP_CONTAINER: u16 = 0xF004;
pub(crate) const REC_TYPE_BSE: u16 = 0xF007;
pub(crate) const REC_TYPE_SP: u16 = 0xF00A;
pub(crate) const REC_TYPE_OPT: u16 = 0xF00B;
pub(crate) const REC_TYPE_CLIENT_ANCHOR: u16 = 0xF010;
pub(crate) const REC_TYPE_FOPT: u16 = 0xF122;

/// Parsed Escher record header: `ver_inst:u16 LE` (low nibble = version,
/// high 12 bits = instance), `type:u16 LE`, `length:i32 LE`.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EscherHeader {
    pub(crate) version: u8,
    pub(crate) instance: u16,
    pub(crate) rec_type: u16,
    pub(crate) length: usize,
}

/// One Escher record at a given nesting level: its header, its payload
/// slice (length-bounded, not including the 8-byte header), and whether
/// it is a container (`version == 0x0F`) that the caller may recurse
/// into by constructing a fresh `EscherIter` over `payload`.
pub(crate) struct EscherRecord<'a> {
    pub(crate) header: EscherHeader,
    pub(crate) payload: &'a [u8],
}

impl<'a> EscherRecord<'a> {
    pub(crate) fn is_container(&self) -> bool {
        self.header.version == 0x0F
    }
}

/// Iterates the Escher records at one container level. Does not
/// recurse — the caller decides whether and how to descend into a
/// container's payload.
pub(crate) struct EscherIter<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> EscherIter<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }
}

impl<'a> Iterator for EscherIter<'a> {
    type Item = EscherRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let r = ByteReader::new(self.data);
        let ver_inst = r.u16_at(self.offset)?;
        let rec_type = r.u16_at(self.offset + 2)?;
        let length = r.i32_at(self.offset + 4)?;
        if length < 0 {
            log::debug!("escher: negative length at offset {}, stopping", self.offset);
            return None;
        }
        let length = length as usize;
        let payload_start = self.offset + 8;
        let payload = r.bytes_at(payload_start, length).or_else(|| {
            log::debug!(
                "escher: record type {rec_type:#06x} at offset {} declares length {length} \
                 exceeding remaining data; stopping this level",
                self.offset
            );
            None
        })?;

        let header = EscherHeader {
            version: (ver_inst & 0x000F) as u8,
            instance: ver_inst >> 4,
            rec_type,
            length,
        };

        self.offset = payload_start + length;
        Some(EscherRecord { header, payload })
    }
}

/// Depth-first search through nested containers for the first record of
/// `target_type`, entering every container along the way. Stops
/// descending into a subtree once a match is returned from it.
pub(crate) fn find_first<'a>(data: &'a [u8], target_type: u16) -> Option<EscherRecord<'a>> {
    for rec in EscherIter::new(data) {
        if rec.header.rec_type == target_type {
            return Some(rec);
        }
        if rec.is_container() {
            if let Some(found) = find_first(rec.payload, target_type) {
                return Some(found);
            }
        }
    }
    None
}

/// Depth-first walk invoking `visit` on every `SpContainer` (0xF004)
/// found anywhere in the tree rooted at `data`.
pub(crate) fn for_each_sp_container<'a>(data: &'a [u8], visit: &mut dyn FnMut(&'a [u8])) {
    for rec in EscherIter::new(data) {
        if rec.header.rec_type == REC_TYPE_SP_CONTAINER {
            visit(rec.payload);
        }
        if rec.is_container() {
            for_each_sp_container(rec.payload, visit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container_header(rec_type: u16, instance: u16, length: i32) -> Vec<u8> {
        let ver_inst: u16 = 0x000F | (instance << 4);
        let mut out = Vec::new();
        out.extend_from_slice(&ver_inst.to_le_bytes());
        out.extend_from_slice(&rec_type.to_le_bytes());
        out.extend_from_slice(&length.to_le_bytes());
        out
    }

    fn atom_header(rec_type: u16, instance: u16, length: i32) -> Vec<u8> {
        let ver_inst: u16 = 0x0000 | (instance << 4);
        let mut out = Vec::new();
        out.extend_from_slice(&ver_inst.to_le_bytes());
        out.extend_from_slice(&rec_type.to_le_bytes());
        out.extend_from_slice(&length.to_le_bytes());
        out
    }

    #[test]
    fn distinguishes_container_from_atom() {
        let mut data = container_header(REC_TYPE_DG_CONTAINER, 2, 4);
        data.extend_from_slice(&[1, 2, 3, 4]);
        let rec = EscherIter::new(&data).next().unwrap();
        assert!(rec.is_container());
        assert_eq!(rec.header.rec_type, REC_TYPE_DG_CONTAINER);
        assert_eq!(rec.payload, &[1, 2, 3, 4]);
    }

    #[test]
    fn atom_is_not_container() {
        let mut data = atom_header(REC_TYPE_SP, 0, 4);
        data.extend_from_slice(&[0xAA; 4]);
        let rec = EscherIter::new(&data).next().unwrap();
        assert!(!rec.is_container());
    }

    #[test]
    fn truncated_length_ends_iteration() {
        let mut data = container_header(REC_TYPE_DG_CONTAINER, 0, 100);
        data.extend_from_slice(&[1, 2, 3]); // far short of declared 100
        let mut it = EscherIter::new(&data);
        assert!(it.next().is_none());
    }

    #[test]
    fn find_first_descends_into_containers() {
        let inner = atom_header(REC_TYPE_BSE, 0, 2);
        let mut inner_full = inner.clone();
        inner_full.extend_from_slice(&[9, 9]);

        let mut outer = container_header(REC_TYPE_BSTORE_CONTAINER, 0, inner_full.len() as i32);
        outer.extend_from_slice(&inner_full);

        let found = find_first(&outer, REC_TYPE_BSE).unwrap();
        assert_eq!(found.payload, &[9, 9]);
    }

    #[test]
    fn for_each_sp_container_collects_nested() {
        let sp1 = container_header(REC_TYPE_SP_CONTAINER, 0, 0);
        let sp2 = container_header(REC_TYPE_SP_CONTAINER, 0, 0);
        let mut spgr_payload = sp1.clone();
        spgr_payload.extend_from_slice(&sp2);
        let mut spgr = container_header(REC_TYPE_SPGR_CONTAINER, 0, spgr_payload.len() as i32);
        spgr.extend_from_slice(&spgr_payload);

        let mut count = 0;
        for_each_sp_container(&spgr, &mut |_| count += 1);
        assert_eq!(count, 2);
    }
}
