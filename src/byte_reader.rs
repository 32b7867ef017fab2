//! Little-endian primitive accessors over a bounded byte slice.
//!
//! Used by the BIFF, Escher, and BSE/BLIP parsers to read fixed-width
//! fields without manual bounds-check boilerplate at every call site.

/// A cursor-free set of bounds-checked little-endian readers.
///
/// All functions return `None` rather than panicking when the requested
/// field would read past the end of `data`; callers treat `None` as "this
/// record/container ends here" per the forward-progress recovery policy.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub(crate) fn u8_at(&self, offset: usize) -> Option<u8> {
        self.data.get(offset).copied()
    }

    pub(crate) fn u16_at(&self, offset: usize) -> Option<u16> {
        let b = self.data.get(offset..offset + 2)?;
        Some(u16::from_le_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32_at(&self, offset: usize) -> Option<u32> {
        let b = self.data.get(offset..offset + 4)?;
        Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn i32_at(&self, offset: usize) -> Option<i32> {
        self.u32_at(offset).map(|v| v as i32)
    }

    pub(crate) fn bytes_at(&self, offset: usize, len: usize) -> Option<&'a [u8]> {
        self.data.get(offset..offset + len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fields_in_bounds() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
        let r = ByteReader::new(&data);
        assert_eq!(r.u8_at(0), Some(0x01));
        assert_eq!(r.u16_at(0), Some(0x0201));
        assert_eq!(r.u32_at(4), Some(0x0807_0605));
    }

    #[test]
    fn out_of_bounds_returns_none() {
        let data = [0x01, 0x02];
        let r = ByteReader::new(&data);
        assert_eq!(r.u16_at(1), None);
        assert_eq!(r.u32_at(0), None);
        assert_eq!(r.bytes_at(0, 10), None);
    }

    #[test]
    fn negative_i32_roundtrip() {
        let data = (-5i32).to_le_bytes();
        assert_eq!(ByteReader::new(&data).i32_at(0), Some(-5));
    }
}
