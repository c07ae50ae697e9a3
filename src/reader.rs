use std::fmt::Display;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ByteOrder {
    Big,
    Little,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eof;

impl Display for Eof {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Eof")
    }
}

impl std::error::Error for Eof {}

macro_rules! read_num {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> Result<$ty, Eof> {
                let bytes: [u8; std::mem::size_of::<$ty>()] = self.read_array()?;
                Ok(match self.order {
                    ByteOrder::Big => <$ty>::from_be_bytes(bytes),
                    ByteOrder::Little => <$ty>::from_le_bytes(bytes),
                })
            }
        )*
    };
}

/// Cursor over a byte slice. Positions are absolute within the slice, so
/// `align` lines up with the start of the containing file.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
    order: ByteOrder,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8], order: ByteOrder) -> Self {
        Self { data, offset: 0, order }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order
    }

    pub fn position(&self) -> usize {
        self.offset
    }

    pub fn set_position(&mut self, offset: usize) -> Result<(), Eof> {
        if offset > self.data.len() {
            return Err(Eof);
        }
        self.offset = offset;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn align(&mut self, size: usize) -> Result<(), Eof> {
        let rem = self.offset % size;
        if rem != 0 {
            self.read_u8_slice(size - rem)?;
        }
        Ok(())
    }

    pub fn read_u8_slice(&mut self, size: usize) -> Result<&'a [u8], Eof> {
        let end = self.offset.checked_add(size).ok_or(Eof)?;
        let slice = self.data.get(self.offset..end).ok_or(Eof)?;
        self.offset = end;
        Ok(slice)
    }

    pub fn read_u8_list(&mut self, size: usize) -> Result<Vec<u8>, Eof> {
        Ok(self.read_u8_slice(size)?.to_vec())
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Eof> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_u8_slice(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8, Eof> {
        let v = *self.data.get(self.offset).ok_or(Eof)?;
        self.offset += 1;
        Ok(v)
    }

    pub fn read_i8(&mut self) -> Result<i8, Eof> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool, Eof> {
        Ok(self.read_u8()? != 0)
    }

    read_num! {
        read_u16 => u16,
        read_i16 => i16,
        read_u32 => u32,
        read_i32 => i32,
        read_u64 => u64,
        read_i64 => i64,
        read_f32 => f32,
        read_f64 => f64,
    }

    /// Reads a NUL terminated string. A missing terminator is an error.
    pub fn read_cstring(&mut self) -> Result<String, Eof> {
        let rest = self.data.get(self.offset..).ok_or(Eof)?;
        let end = rest.iter().position(|b| *b == 0).ok_or(Eof)?;
        let s = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.offset += end + 1;
        Ok(s)
    }

    /// Reads an `i32` length followed by that many bytes, without aligning.
    pub fn read_string(&mut self) -> Result<String, Eof> {
        let size = self.read_i32()?;
        if size < 0 {
            return Err(Eof);
        }
        let bytes = self.read_u8_slice(size as usize)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn read_aligned_string(&mut self) -> Result<String, Eof> {
        let s = self.read_string()?;
        self.align(4)?;
        Ok(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_both_byte_orders() {
        let data = [0x00, 0x00, 0x01, 0x02, 0x02, 0x01, 0x00, 0x00];
        let mut reader = Reader::new(&data, ByteOrder::Big);
        assert_eq!(reader.read_u32(), Ok(0x0102));
        reader.set_order(ByteOrder::Little);
        assert_eq!(reader.read_u32(), Ok(0x0102));
        assert_eq!(reader.read_u8(), Err(Eof));
    }

    #[test]
    fn aligned_string_skips_padding() {
        let data = [3, 0, 0, 0, b'a', b'b', b'c', 0, 7];
        let mut reader = Reader::new(&data, ByteOrder::Little);
        assert_eq!(reader.read_aligned_string().unwrap(), "abc");
        assert_eq!(reader.read_u8(), Ok(7));
    }

    #[test]
    fn cstring_requires_terminator() {
        let mut reader = Reader::new(b"UnityFS\0rest", ByteOrder::Big);
        assert_eq!(reader.read_cstring().unwrap(), "UnityFS");
        assert_eq!(reader.read_cstring(), Err(Eof));
    }
}
