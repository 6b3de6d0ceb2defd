//! Bounds-checked little-endian cursor over a byte slice.

use crate::ConvertError;

pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Reader positioned at `pos`.
    pub(crate) fn at(data: &'a [u8], pos: usize) -> Self {
        Self { data, pos }
    }

    #[cfg(test)]
    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Fail unless `n` bytes are available from the cursor.
    pub(crate) fn need(&self, n: usize) -> Result<(), ConvertError> {
        match self.pos.checked_add(n) {
            Some(end) if end <= self.data.len() => Ok(()),
            _ => Err(ConvertError::BufferTooShort {
                offset: self.pos,
                len: n,
                available: self.data.len(),
            }),
        }
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<(), ConvertError> {
        self.need(n)?;
        self.pos += n;
        Ok(())
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8, ConvertError> {
        self.need(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub(crate) fn read_u16_le(&mut self) -> Result<u16, ConvertError> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_u32_le(&mut self) -> Result<u32, ConvertError> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub(crate) fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ConvertError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], ConvertError> {
        self.need(n)?;
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }
}

/// Sign-extend a 24-bit little-endian value.
pub(crate) fn i24_from_le(bytes: [u8; 3]) -> i32 {
    (i32::from_le_bytes([bytes[0], bytes[1], bytes[2], 0]) << 8) >> 8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07];
        let mut r = ByteReader::new(&data);
        assert_eq!(r.read_u8().unwrap(), 0x01);
        assert_eq!(r.read_u16_le().unwrap(), 0x0302);
        assert_eq!(r.read_u32_le().unwrap(), 0x07060504);
        assert_eq!(r.pos(), 7);
    }

    #[test]
    fn short_read_reports_position() {
        let data = [0u8; 6];
        let mut r = ByteReader::at(&data, 4);
        assert_eq!(
            r.read_u32_le(),
            Err(ConvertError::BufferTooShort { offset: 4, len: 4, available: 6 })
        );
        // A failed read leaves the cursor alone.
        assert_eq!(r.pos(), 4);
    }

    #[test]
    fn huge_skip_does_not_overflow() {
        let data = [0u8; 2];
        let mut r = ByteReader::at(&data, 1);
        assert!(r.skip(usize::MAX).is_err());
    }

    #[test]
    fn i24_sign_extension() {
        assert_eq!(i24_from_le([0x10, 0x00, 0x00]), 16);
        assert_eq!(i24_from_le([0xFF, 0xFF, 0xFF]), -1);
        assert_eq!(i24_from_le([0x00, 0x00, 0x80]), -0x80_0000);
    }
}
