use crate::reader::ByteOrder;

macro_rules! write_num {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self, value: $ty) {
                match self.order {
                    ByteOrder::Big => self.buf.extend_from_slice(&value.to_be_bytes()),
                    ByteOrder::Little => self.buf.extend_from_slice(&value.to_le_bytes()),
                }
            }
        )*
    };
}

/// Growable counterpart of [`Reader`](crate::reader::Reader).
#[derive(Clone, Debug)]
pub struct Writer {
    buf: Vec<u8>,
    order: ByteOrder,
}

impl Writer {
    pub fn new(order: ByteOrder) -> Self {
        Self { buf: Vec::new(), order }
    }

    pub fn with_capacity(order: ByteOrder, capacity: usize) -> Self {
        Self { buf: Vec::with_capacity(capacity), order }
    }

    pub fn order(&self) -> ByteOrder {
        self.order
    }

    pub fn set_order(&mut self, order: ByteOrder) {
        self.order = order
    }

    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn align(&mut self, size: usize) {
        let rem = self.buf.len() % size;
        if rem != 0 {
            self.buf.resize(self.buf.len() + size - rem, 0);
        }
    }

    /// Overwrites already written bytes, used to patch headers after the body is known.
    pub fn patch(&mut self, offset: usize, bytes: &[u8]) {
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes)
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value)
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.push(value as u8)
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(value as u8)
    }

    write_num! {
        write_u16 => u16,
        write_i16 => i16,
        write_u32 => u32,
        write_i32 => i32,
        write_u64 => u64,
        write_i64 => i64,
        write_f32 => f32,
        write_f64 => f64,
    }

    pub fn write_cstring(&mut self, value: &str) {
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
    }

    pub fn write_string(&mut self, value: &str) {
        self.write_i32(value.len() as i32);
        self.buf.extend_from_slice(value.as_bytes());
    }

    pub fn write_aligned_string(&mut self, value: &str) {
        self.write_string(value);
        self.align(4);
    }
}
