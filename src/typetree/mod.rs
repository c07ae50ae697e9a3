mod common;
mod de;
mod value;

pub use common::{common_offset, common_string, COMMON_STRINGS};
pub use de::Deserializer;
pub use value::{read_value, write_value, Value};

use bitflags::bitflags;

use crate::error::{UnityError, UnityResult};
use crate::reader::Reader;
use crate::writer::Writer;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct TransferMetaFlags: i32 {
        const HIDE_IN_EDITOR = 1 << 0;
        const NOT_EDITABLE = 1 << 4;
        const STRONG_PPTR = 1 << 6;
        const ALIGN_BYTES = 1 << 14;
        const ANY_CHILD_USES_ALIGN_BYTES = 1 << 15;
        const _ = !0;
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeTreeNode {
    pub version: i32,
    pub level: u8,
    pub type_flags: i32,
    pub byte_size: i32,
    pub index: i32,
    pub meta_flag: i32,
    pub type_: String,
    pub name: String,
    pub type_str_offset: u32,
    pub name_str_offset: u32,
    pub ref_type_hash: u64,
    pub variable_count: i32,
}

impl TypeTreeNode {
    pub fn new(level: u8, type_: &str, name: &str, byte_size: i32, meta_flag: i32) -> Self {
        Self {
            version: 1,
            level,
            type_: type_.to_string(),
            name: name.to_string(),
            byte_size,
            meta_flag,
            type_flags: if type_ == "Array" { 1 } else { 0 },
            ..Default::default()
        }
    }

    pub fn requires_align(&self) -> bool {
        TransferMetaFlags::from_bits_retain(self.meta_flag).contains(TransferMetaFlags::ALIGN_BYTES)
    }
}

/// Level-ordered node list of one serialized type. The local string buffer is
/// kept verbatim so that blob trees are written back unchanged.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TypeTree {
    pub nodes: Vec<TypeTreeNode>,
    pub string_buffer: Vec<u8>,
}

impl TypeTree {
    /// Builds a tree from nodes whose names are not yet interned, filling in
    /// string offsets against the common table or a fresh local buffer.
    pub fn from_nodes(mut nodes: Vec<TypeTreeNode>) -> Self {
        fn intern(s: &str, buffer: &mut Vec<u8>) -> u32 {
            if let Some(offset) = common_offset(s) {
                return offset | 0x8000_0000;
            }
            let mut offset = 0;
            for part in buffer.split(|b| *b == 0) {
                if part == s.as_bytes() && offset < buffer.len() {
                    return offset as u32;
                }
                offset += part.len() + 1;
            }
            let offset = buffer.len() as u32;
            buffer.extend_from_slice(s.as_bytes());
            buffer.push(0);
            offset
        }

        let mut buffer = Vec::new();
        for (i, node) in nodes.iter_mut().enumerate() {
            node.index = i as i32;
            node.type_str_offset = intern(&node.type_, &mut buffer);
            node.name_str_offset = intern(&node.name, &mut buffer);
        }
        Self { nodes, string_buffer: buffer }
    }

    pub fn root(&self) -> Option<&TypeTreeNode> {
        self.nodes.first()
    }

    pub fn parse_blob(reader: &mut Reader, version: u32) -> UnityResult<Self> {
        let node_count = reader.read_i32()?;
        let string_buffer_size = reader.read_i32()?;
        if node_count < 0 || string_buffer_size < 0 {
            return Err(UnityError::InvalidData("negative type tree size".to_string()));
        }

        let mut nodes = Vec::with_capacity(node_count as usize);
        for _ in 0..node_count {
            let mut node = TypeTreeNode {
                version: reader.read_u16()? as i32,
                level: reader.read_u8()?,
                type_flags: reader.read_u8()? as i32,
                type_str_offset: reader.read_u32()?,
                name_str_offset: reader.read_u32()?,
                byte_size: reader.read_i32()?,
                index: reader.read_i32()?,
                meta_flag: reader.read_i32()?,
                ..Default::default()
            };
            if version >= 19 {
                node.ref_type_hash = reader.read_u64()?;
            }
            nodes.push(node);
        }
        let string_buffer = reader.read_u8_list(string_buffer_size as usize)?;

        for node in nodes.iter_mut() {
            node.type_ = lookup_string(&string_buffer, node.type_str_offset);
            node.name = lookup_string(&string_buffer, node.name_str_offset);
        }
        Ok(Self { nodes, string_buffer })
    }

    pub fn write_blob(&self, writer: &mut Writer, version: u32) {
        writer.write_i32(self.nodes.len() as i32);
        writer.write_i32(self.string_buffer.len() as i32);
        for node in self.nodes.iter() {
            writer.write_u16(node.version as u16);
            writer.write_u8(node.level);
            writer.write_u8(node.type_flags as u8);
            writer.write_u32(node.type_str_offset);
            writer.write_u32(node.name_str_offset);
            writer.write_i32(node.byte_size);
            writer.write_i32(node.index);
            writer.write_i32(node.meta_flag);
            if version >= 19 {
                writer.write_u64(node.ref_type_hash);
            }
        }
        writer.write_bytes(&self.string_buffer);
    }

    /// Pre-5.x layout: each node followed by its child count, depth first.
    pub fn parse_legacy(reader: &mut Reader, version: u32) -> UnityResult<Self> {
        fn read_node(reader: &mut Reader, version: u32, level: u8, nodes: &mut Vec<TypeTreeNode>) -> UnityResult<()> {
            let mut node = TypeTreeNode {
                level,
                type_: reader.read_cstring()?,
                name: reader.read_cstring()?,
                byte_size: reader.read_i32()?,
                ..Default::default()
            };
            if version == 2 {
                node.variable_count = reader.read_i32()?;
            }
            if version != 3 {
                node.index = reader.read_i32()?;
            }
            node.type_flags = reader.read_i32()?;
            node.version = reader.read_i32()?;
            if version != 3 {
                node.meta_flag = reader.read_i32()?;
            }
            nodes.push(node);

            let children = reader.read_i32()?;
            for _ in 0..children {
                read_node(reader, version, level + 1, nodes)?;
            }
            Ok(())
        }

        let mut nodes = Vec::new();
        read_node(reader, version, 0, &mut nodes)?;
        Ok(Self { nodes, string_buffer: Vec::new() })
    }

    pub fn write_legacy(&self, writer: &mut Writer, version: u32) {
        fn write_node(nodes: &[TypeTreeNode], index: usize, writer: &mut Writer, version: u32) {
            let node = &nodes[index];
            writer.write_cstring(&node.type_);
            writer.write_cstring(&node.name);
            writer.write_i32(node.byte_size);
            if version == 2 {
                writer.write_i32(node.variable_count);
            }
            if version != 3 {
                writer.write_i32(node.index);
            }
            writer.write_i32(node.type_flags);
            writer.write_i32(node.version);
            if version != 3 {
                writer.write_i32(node.meta_flag);
            }
            let children: Vec<usize> = children(nodes, index).collect();
            writer.write_i32(children.len() as i32);
            for child in children {
                write_node(nodes, child, writer, version);
            }
        }

        if !self.nodes.is_empty() {
            write_node(&self.nodes, 0, writer, version);
        }
    }
}

fn lookup_string(buffer: &[u8], offset: u32) -> String {
    if offset & 0x8000_0000 != 0 {
        let offset = offset & 0x7FFF_FFFF;
        return match common_string(offset) {
            Some(s) => s.to_string(),
            None => offset.to_string(),
        };
    }
    let Some(rest) = buffer.get(offset as usize..) else {
        return offset.to_string();
    };
    let end = rest.iter().position(|b| *b == 0).unwrap_or(rest.len());
    String::from_utf8_lossy(&rest[..end]).into_owned()
}

/// Index one past the last node of the subtree rooted at `index`.
pub fn subtree_end(nodes: &[TypeTreeNode], index: usize) -> usize {
    let Some(root) = nodes.get(index) else {
        return index;
    };
    index + 1 + nodes[index + 1..].iter().take_while(|x| x.level > root.level).count()
}

/// Direct children of the node at `index`.
pub fn children(nodes: &[TypeTreeNode], index: usize) -> impl Iterator<Item = usize> + '_ {
    let level = nodes.get(index).map(|n| n.level).unwrap_or(0);
    let end = subtree_end(nodes, index);
    (index + 1..end).filter(move |i| nodes[*i].level == level + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ByteOrder;

    fn sample() -> Vec<TypeTreeNode> {
        vec![
            TypeTreeNode::new(0, "Texture2D", "Base", -1, 0),
            TypeTreeNode::new(1, "string", "m_Name", -1, 0x8000),
            TypeTreeNode::new(2, "Array", "Array", -1, 0x4001),
            TypeTreeNode::new(3, "int", "size", 4, 1),
            TypeTreeNode::new(3, "char", "data", 1, 1),
            TypeTreeNode::new(1, "int", "m_Width", 4, 0),
            TypeTreeNode::new(1, "MyCustomField", "m_Custom", 4, 0),
        ]
    }

    #[test]
    fn blob_roundtrip_keeps_names() {
        let tree = TypeTree::from_nodes(sample());
        // strings missing from the common table go to the local buffer
        assert_eq!(tree.string_buffer, b"m_Width\0MyCustomField\0m_Custom\0".to_vec());

        let mut writer = Writer::new(ByteOrder::Little);
        tree.write_blob(&mut writer, 22);
        let data = writer.into_inner();
        let parsed = TypeTree::parse_blob(&mut Reader::new(&data, ByteOrder::Little), 22).unwrap();
        assert_eq!(parsed, tree);
        assert_eq!(parsed.nodes[6].type_, "MyCustomField");
        assert_eq!(parsed.nodes[1].type_, "string");
    }

    #[test]
    fn legacy_roundtrip() {
        let tree = TypeTree { nodes: sample(), string_buffer: Vec::new() };
        let mut writer = Writer::new(ByteOrder::Big);
        tree.write_legacy(&mut writer, 9);
        let data = writer.into_inner();
        let parsed = TypeTree::parse_legacy(&mut Reader::new(&data, ByteOrder::Big), 9).unwrap();
        assert_eq!(parsed.nodes.len(), 7);
        assert_eq!(parsed.nodes[4].level, 3);
        assert_eq!(parsed.nodes[6].name, "m_Custom");
    }

    #[test]
    fn child_iteration() {
        let nodes = sample();
        assert_eq!(children(&nodes, 0).collect::<Vec<_>>(), vec![1, 5, 6]);
        assert_eq!(children(&nodes, 2).collect::<Vec<_>>(), vec![3, 4]);
        assert_eq!(subtree_end(&nodes, 1), 5);
        assert!(nodes[2].requires_align());
    }
}
