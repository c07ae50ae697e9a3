use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

use super::{children, TypeTreeNode};
use crate::error::{UnityError, UnityResult};
use crate::reader::Reader;
use crate::writer::Writer;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    SInt8(i8),
    UInt8(u8),
    Char(char),
    SInt16(i16),
    UInt16(u16),
    SInt32(i32),
    UInt32(u32),
    Type(u32),
    SInt64(i64),
    UInt64(u64),
    FileSize(u64),
    Float(f32),
    Double(f64),
    Bool(bool),
    String(String),
    TypelessData(Vec<u8>),
    Array(Vec<Value>),
    Map(Vec<(Value, Value)>),
    /// Fields in type tree order.
    Class(Vec<(String, Value)>),
}

impl Value {
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Class(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        match self {
            Value::Class(fields) => fields.iter_mut().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Replaces an existing field. Fields absent from the type tree are never
    /// added, so the return value tells whether this version has the field.
    pub fn set(&mut self, name: &str, value: Value) -> bool {
        match self.get_mut(name) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Sets an integer field keeping the variant the file uses for it.
    pub fn set_int(&mut self, name: &str, value: i64) -> bool {
        match self.get_mut(name) {
            Some(slot) => {
                *slot = slot.with_int(value);
                true
            }
            None => false,
        }
    }

    pub fn with_int(&self, v: i64) -> Value {
        match self {
            Value::SInt8(_) => Value::SInt8(v as i8),
            Value::UInt8(_) => Value::UInt8(v as u8),
            Value::SInt16(_) => Value::SInt16(v as i16),
            Value::UInt16(_) => Value::UInt16(v as u16),
            Value::SInt32(_) => Value::SInt32(v as i32),
            Value::UInt32(_) => Value::UInt32(v as u32),
            Value::Type(_) => Value::Type(v as u32),
            Value::UInt64(_) => Value::UInt64(v as u64),
            Value::FileSize(_) => Value::FileSize(v as u64),
            Value::Bool(_) => Value::Bool(v != 0),
            _ => Value::SInt64(v),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::SInt8(v) => Some(v as i64),
            Value::UInt8(v) => Some(v as i64),
            Value::Char(v) => Some(v as i64),
            Value::SInt16(v) => Some(v as i64),
            Value::UInt16(v) => Some(v as i64),
            Value::SInt32(v) => Some(v as i64),
            Value::UInt32(v) | Value::Type(v) => Some(v as i64),
            Value::SInt64(v) => Some(v),
            Value::UInt64(v) | Value::FileSize(v) => Some(v as i64),
            Value::Bool(v) => Some(v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v as f64),
            Value::Double(v) => Some(v),
            _ => self.as_i64().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => self.as_i64().map(|v| v != 0),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::TypelessData(v) => Some(v),
            _ => None,
        }
    }
}

fn read_len(reader: &mut Reader) -> UnityResult<usize> {
    let size = reader.read_i32()?;
    if size < 0 {
        return Err(UnityError::InvalidData(format!("negative array length {size}")));
    }
    Ok(size as usize)
}

fn malformed(node: &TypeTreeNode) -> UnityError {
    UnityError::InvalidData(format!("malformed {} node {}", node.type_, node.name))
}

/// The `Array` child of a vector, map or string node, with its element node.
fn array_parts(nodes: &[TypeTreeNode], index: usize) -> Option<(usize, usize)> {
    let array = children(nodes, index).next().filter(|i| nodes[*i].type_ == "Array")?;
    let data = children(nodes, array).nth(1)?;
    Some((array, data))
}

/// Reads one object payload following its type tree.
pub fn read_value(nodes: &[TypeTreeNode], reader: &mut Reader) -> UnityResult<Value> {
    if nodes.is_empty() {
        return Err(UnityError::InvalidData("empty type tree".to_string()));
    }
    read_node(nodes, 0, reader)
}

fn read_node(nodes: &[TypeTreeNode], index: usize, reader: &mut Reader) -> UnityResult<Value> {
    let node = &nodes[index];
    let mut align = node.requires_align();
    let value = match node.type_.as_str() {
        "SInt8" => Value::SInt8(reader.read_i8()?),
        "UInt8" => Value::UInt8(reader.read_u8()?),
        "char" => Value::Char(reader.read_u8()? as char),
        "SInt16" | "short" => Value::SInt16(reader.read_i16()?),
        "UInt16" | "unsigned short" => Value::UInt16(reader.read_u16()?),
        "SInt32" | "int" => Value::SInt32(reader.read_i32()?),
        "UInt32" | "unsigned int" => Value::UInt32(reader.read_u32()?),
        "Type*" => Value::Type(reader.read_u32()?),
        "SInt64" | "long long" => Value::SInt64(reader.read_i64()?),
        "UInt64" | "unsigned long long" => Value::UInt64(reader.read_u64()?),
        "FileSize" => Value::FileSize(reader.read_u64()?),
        "float" => Value::Float(reader.read_f32()?),
        "double" => Value::Double(reader.read_f64()?),
        "bool" => Value::Bool(reader.read_bool()?),
        "string" => {
            if let Some(array) = children(nodes, index).next() {
                align |= nodes[array].requires_align();
            }
            Value::String(reader.read_string()?)
        }
        "TypelessData" => {
            let size = read_len(reader)?;
            Value::TypelessData(reader.read_u8_list(size)?)
        }
        "map" => {
            let (array, pair) = array_parts(nodes, index).ok_or_else(|| malformed(node))?;
            align |= nodes[array].requires_align();
            let mut pair_children = children(nodes, pair);
            let (first, second) = match (pair_children.next(), pair_children.next()) {
                (Some(first), Some(second)) => (first, second),
                _ => return Err(malformed(node)),
            };
            let size = read_len(reader)?;
            let mut entries = Vec::with_capacity(size.min(reader.remaining()));
            for _ in 0..size {
                let key = read_node(nodes, first, reader)?;
                let value = read_node(nodes, second, reader)?;
                entries.push((key, value));
            }
            Value::Map(entries)
        }
        _ => match array_parts(nodes, index) {
            Some((array, data)) => {
                align |= nodes[array].requires_align();
                let size = read_len(reader)?;
                let mut items = Vec::with_capacity(size.min(reader.remaining()));
                for _ in 0..size {
                    items.push(read_node(nodes, data, reader)?);
                }
                Value::Array(items)
            }
            None => {
                let mut fields = Vec::new();
                for child in children(nodes, index) {
                    fields.push((nodes[child].name.clone(), read_node(nodes, child, reader)?));
                }
                Value::Class(fields)
            }
        },
    };
    if align {
        reader.align(4)?;
    }
    Ok(value)
}

/// Writes `value` back in the layout described by the type tree.
pub fn write_value(nodes: &[TypeTreeNode], value: &Value, writer: &mut Writer) -> UnityResult<()> {
    if nodes.is_empty() {
        return Err(UnityError::InvalidData("empty type tree".to_string()));
    }
    write_node(nodes, 0, value, writer)
}

fn write_node(nodes: &[TypeTreeNode], index: usize, value: &Value, writer: &mut Writer) -> UnityResult<()> {
    let node = &nodes[index];
    let mismatch = || UnityError::InvalidData(format!("field {} expects {}, got {:?}", node.name, node.type_, kind(value)));
    let int = || value.as_i64().ok_or_else(mismatch);
    let mut align = node.requires_align();
    match node.type_.as_str() {
        "SInt8" => writer.write_i8(int()? as i8),
        "UInt8" | "char" => writer.write_u8(int()? as u8),
        "SInt16" | "short" => writer.write_i16(int()? as i16),
        "UInt16" | "unsigned short" => writer.write_u16(int()? as u16),
        "SInt32" | "int" => writer.write_i32(int()? as i32),
        "UInt32" | "unsigned int" | "Type*" => writer.write_u32(int()? as u32),
        "SInt64" | "long long" => writer.write_i64(int()?),
        "UInt64" | "unsigned long long" | "FileSize" => writer.write_u64(int()? as u64),
        "float" => writer.write_f32(value.as_f64().ok_or_else(mismatch)? as f32),
        "double" => writer.write_f64(value.as_f64().ok_or_else(mismatch)?),
        "bool" => writer.write_bool(value.as_bool().ok_or_else(mismatch)?),
        "string" => {
            if let Some(array) = children(nodes, index).next() {
                align |= nodes[array].requires_align();
            }
            writer.write_string(value.as_str().ok_or_else(mismatch)?);
        }
        "TypelessData" => {
            let bytes = value.as_bytes().ok_or_else(mismatch)?;
            writer.write_i32(bytes.len() as i32);
            writer.write_bytes(bytes);
        }
        "map" => {
            let (array, pair) = array_parts(nodes, index).ok_or_else(|| malformed(node))?;
            align |= nodes[array].requires_align();
            let mut pair_children = children(nodes, pair);
            let (first, second) = match (pair_children.next(), pair_children.next()) {
                (Some(first), Some(second)) => (first, second),
                _ => return Err(malformed(node)),
            };
            let Value::Map(entries) = value else {
                return Err(mismatch());
            };
            writer.write_i32(entries.len() as i32);
            for (k, v) in entries {
                write_node(nodes, first, k, writer)?;
                write_node(nodes, second, v, writer)?;
            }
        }
        _ => match array_parts(nodes, index) {
            Some((array, data)) => {
                align |= nodes[array].requires_align();
                let Value::Array(items) = value else {
                    return Err(mismatch());
                };
                writer.write_i32(items.len() as i32);
                for item in items {
                    write_node(nodes, data, item, writer)?;
                }
            }
            None => {
                if !matches!(value, Value::Class(_)) {
                    return Err(mismatch());
                }
                for child in children(nodes, index) {
                    let name = &nodes[child].name;
                    let field = value.get(name).ok_or_else(|| UnityError::MissingField(name.clone()))?;
                    write_node(nodes, child, field, writer)?;
                }
            }
        },
    }
    if align {
        writer.align(4);
    }
    Ok(())
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::String(_) => "string",
        Value::TypelessData(_) => "bytes",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        Value::Class(_) => "class",
        Value::Float(_) | Value::Double(_) => "float",
        Value::Bool(_) => "bool",
        _ => "integer",
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::SInt8(v) => serializer.serialize_i8(*v),
            Value::UInt8(v) => serializer.serialize_u8(*v),
            Value::Char(v) => serializer.serialize_char(*v),
            Value::SInt16(v) => serializer.serialize_i16(*v),
            Value::UInt16(v) => serializer.serialize_u16(*v),
            Value::SInt32(v) => serializer.serialize_i32(*v),
            Value::UInt32(v) | Value::Type(v) => serializer.serialize_u32(*v),
            Value::SInt64(v) => serializer.serialize_i64(*v),
            Value::UInt64(v) | Value::FileSize(v) => serializer.serialize_u64(*v),
            Value::Float(v) => serializer.serialize_f32(*v),
            Value::Double(v) => serializer.serialize_f64(*v),
            Value::Bool(v) => serializer.serialize_bool(*v),
            Value::String(v) => serializer.serialize_str(v),
            Value::TypelessData(v) => serializer.serialize_bytes(v),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            // keys are often classes, which json cannot use as object keys
            Value::Map(entries) => {
                let mut seq = serializer.serialize_seq(Some(entries.len()))?;
                for entry in entries {
                    seq.serialize_element(&(&entry.0, &entry.1))?;
                }
                seq.end()
            }
            Value::Class(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}
