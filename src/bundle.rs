//! UnityFS asset bundles.
use std::io::Cursor;
use std::sync::Arc;

use bitflags::bitflags;
use lzma_rs::decompress::{Options, UnpackedSize};
use num_enum::TryFromPrimitive;

use crate::error::{UnityError, UnityResult};
use crate::reader::{ByteOrder, Reader};
use crate::writer::Writer;

pub const SIGNATURE: &str = "UnityFS";

/// Block size used when writing bundles.
const CHUNK_SIZE: usize = 0x20000;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ArchiveFlags: u32 {
        const COMPRESSION_MASK = 0x3f;
        const BLOCKS_AND_DIRECTORY_INFO_COMBINED = 0x40;
        const BLOCKS_INFO_AT_THE_END = 0x80;
        const OLD_WEB_PLUGIN_COMPATIBILITY = 0x100;
        const BLOCK_INFO_NEED_PADDING_AT_START = 0x200;
        const _ = !0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
pub enum CompressionType {
    None = 0,
    Lzma = 1,
    Lz4 = 2,
    Lz4HC = 3,
}

impl CompressionType {
    fn from_flags(flags: u32) -> UnityResult<Self> {
        let raw = flags & ArchiveFlags::COMPRESSION_MASK.bits();
        Self::try_from(raw).map_err(|_| UnityError::UnsupportedCompression(raw))
    }
}

fn decompress(data: &[u8], uncompressed_size: usize, compression: CompressionType) -> UnityResult<Vec<u8>> {
    let out = match compression {
        CompressionType::None => data.to_vec(),
        CompressionType::Lzma => {
            let mut out = Vec::with_capacity(uncompressed_size);
            let options = Options {
                unpacked_size: UnpackedSize::UseProvided(Some(uncompressed_size as u64)),
                ..Default::default()
            };
            lzma_rs::lzma_decompress_with_options(&mut Cursor::new(data), &mut out, &options)
                .map_err(|e| UnityError::Decompression(e.to_string()))?;
            out
        }
        CompressionType::Lz4 | CompressionType::Lz4HC => lz4_flex::block::decompress(data, uncompressed_size)
            .map_err(|e| UnityError::Decompression(e.to_string()))?,
    };
    if out.len() != uncompressed_size {
        return Err(UnityError::Decompression(format!(
            "expected {uncompressed_size} bytes, got {}",
            out.len()
        )));
    }
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageBlock {
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub flags: u16,
}

/// One file inside the bundle.
#[derive(Debug, Clone)]
pub struct BundleNode {
    pub path: String,
    pub flags: u32,
    pub data: Arc<Vec<u8>>,
}

#[derive(Debug, Clone)]
pub struct BundleFile {
    pub version: u32,
    pub unity_version: String,
    pub unity_revision: String,
    pub flags: ArchiveFlags,
    pub hash: [u8; 16],
    pub nodes: Vec<BundleNode>,
}

impl BundleFile {
    pub fn probe(data: &[u8]) -> bool {
        data.starts_with(SIGNATURE.as_bytes())
    }

    pub fn parse(data: &[u8]) -> UnityResult<Self> {
        let mut r = Reader::new(data, ByteOrder::Big);
        let signature = r.read_cstring()?;
        match signature.as_str() {
            SIGNATURE => {}
            "UnityWeb" | "UnityRaw" | "UnityArchive" => return Err(UnityError::UnsupportedSignature(signature)),
            _ => return Err(UnityError::UnknownSignature),
        }
        let version = r.read_u32()?;
        if !(6..=8).contains(&version) {
            return Err(UnityError::InvalidData(format!("unsupported UnityFS format {version}")));
        }
        let unity_version = r.read_cstring()?;
        let unity_revision = r.read_cstring()?;
        let _size = r.read_i64()?;
        let compressed_info_size = r.read_u32()? as usize;
        let uncompressed_info_size = r.read_u32()? as usize;
        let flags = ArchiveFlags::from_bits_retain(r.read_u32()?);
        if version >= 7 {
            r.align(16)?;
        }

        let info_start = if flags.contains(ArchiveFlags::BLOCKS_INFO_AT_THE_END) {
            data.len()
                .checked_sub(compressed_info_size)
                .ok_or_else(|| UnityError::InvalidData("blocks info larger than file".to_string()))?
        } else {
            r.position()
        };
        let info_end = info_start.checked_add(compressed_info_size).ok_or(UnityError::Eof)?;
        let info_bytes = data.get(info_start..info_end).ok_or(UnityError::Eof)?;
        let info = decompress(info_bytes, uncompressed_info_size, CompressionType::from_flags(flags.bits())?)?;
        if !flags.contains(ArchiveFlags::BLOCKS_INFO_AT_THE_END) {
            r.set_position(info_end)?;
        }
        if flags.contains(ArchiveFlags::BLOCK_INFO_NEED_PADDING_AT_START) {
            r.align(16)?;
        }

        let mut ir = Reader::new(&info, ByteOrder::Big);
        let hash = ir.read_array()?;
        let block_count = ir.read_i32()?;
        let mut blocks = Vec::new();
        for _ in 0..block_count {
            blocks.push(StorageBlock {
                uncompressed_size: ir.read_u32()?,
                compressed_size: ir.read_u32()?,
                flags: ir.read_u16()?,
            });
        }
        let node_count = ir.read_i32()?;
        let mut entries = Vec::new();
        for _ in 0..node_count {
            let offset = ir.read_i64()?;
            let size = ir.read_i64()?;
            let flags = ir.read_u32()?;
            let path = ir.read_cstring()?;
            entries.push((offset, size, flags, path));
        }

        let total: usize = blocks.iter().map(|b| b.uncompressed_size as usize).sum();
        let mut stream = Vec::with_capacity(total);
        for block in &blocks {
            let compressed = r.read_u8_slice(block.compressed_size as usize)?;
            let compression = CompressionType::from_flags(block.flags as u32)?;
            stream.extend(decompress(compressed, block.uncompressed_size as usize, compression)?);
        }
        log::debug!("UnityFS {version} ({unity_revision}): {} blocks, {} nodes", blocks.len(), entries.len());

        let mut nodes = Vec::with_capacity(entries.len());
        for (offset, size, flags, path) in entries {
            let bytes = usize::try_from(offset)
                .ok()
                .zip(usize::try_from(size).ok())
                .and_then(|(start, size)| Some(start..start.checked_add(size)?))
                .and_then(|range| stream.get(range))
                .ok_or_else(|| UnityError::InvalidData(format!("node {path} at {offset}+{size} exceeds the block data")))?;
            nodes.push(BundleNode { path, flags, data: Arc::new(bytes.to_vec()) });
        }

        Ok(Self { version, unity_version, unity_revision, flags, hash, nodes })
    }

    pub fn node(&self, path: &str) -> Option<&BundleNode> {
        self.nodes.iter().find(|n| n.path == path)
    }

    /// Replaces a node's bytes.
    pub fn set_node_data(&mut self, path: &str, data: Vec<u8>) -> UnityResult<()> {
        let node = self
            .nodes
            .iter_mut()
            .find(|n| n.path == path)
            .ok_or_else(|| UnityError::ResourceNotFound(path.to_string()))?;
        node.data = Arc::new(data);
        Ok(())
    }

    /// Writes the bundle with LZ4 blocks and the blocks info right after the header.
    pub fn save(&self) -> UnityResult<Vec<u8>> {
        let mut stream = Vec::new();
        let mut entries = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            entries.push((stream.len() as i64, node.data.len() as i64));
            stream.extend_from_slice(&node.data);
        }

        let mut blocks = Vec::new();
        let mut block_data = Vec::new();
        for chunk in stream.chunks(CHUNK_SIZE) {
            let compressed = lz4_flex::block::compress(chunk);
            blocks.push(StorageBlock {
                uncompressed_size: chunk.len() as u32,
                compressed_size: compressed.len() as u32,
                flags: CompressionType::Lz4 as u16,
            });
            block_data.extend(compressed);
        }

        let mut info = Writer::new(ByteOrder::Big);
        info.write_bytes(&self.hash);
        info.write_i32(blocks.len() as i32);
        for block in &blocks {
            info.write_u32(block.uncompressed_size);
            info.write_u32(block.compressed_size);
            info.write_u16(block.flags);
        }
        info.write_i32(self.nodes.len() as i32);
        for (node, (offset, size)) in self.nodes.iter().zip(&entries) {
            info.write_i64(*offset);
            info.write_i64(*size);
            info.write_u32(node.flags);
            info.write_cstring(&node.path);
        }
        let info = info.into_inner();
        let compressed_info = lz4_flex::block::compress(&info);

        let mut flags = ArchiveFlags::BLOCKS_AND_DIRECTORY_INFO_COMBINED;
        flags |= ArchiveFlags::from_bits_retain(CompressionType::Lz4 as u32);
        flags |= self.flags & ArchiveFlags::BLOCK_INFO_NEED_PADDING_AT_START;

        let mut w = Writer::new(ByteOrder::Big);
        w.write_cstring(SIGNATURE);
        w.write_u32(self.version);
        w.write_cstring(&self.unity_version);
        w.write_cstring(&self.unity_revision);
        let size_at = w.position();
        w.write_i64(0);
        w.write_u32(compressed_info.len() as u32);
        w.write_u32(info.len() as u32);
        w.write_u32(flags.bits());
        if self.version >= 7 {
            w.align(16);
        }
        w.write_bytes(&compressed_info);
        if flags.contains(ArchiveFlags::BLOCK_INFO_NEED_PADDING_AT_START) {
            w.align(16);
        }
        w.write_bytes(&block_data);

        let size = (w.position() as i64).to_be_bytes();
        w.patch(size_at, &size);
        Ok(w.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(version: u32, flags: ArchiveFlags) -> BundleFile {
        let big: Vec<u8> = (0..CHUNK_SIZE * 2 + 17).map(|i| (i % 251) as u8).collect();
        BundleFile {
            version,
            unity_version: "5.x.x".to_string(),
            unity_revision: "2019.4.1f1".to_string(),
            flags,
            hash: [0; 16],
            nodes: vec![
                BundleNode { path: "CAB-test".to_string(), flags: 4, data: Arc::new(b"serialized".to_vec()) },
                BundleNode { path: "CAB-test.resS".to_string(), flags: 0, data: Arc::new(big) },
            ],
        }
    }

    #[test]
    fn saved_bundle_parses_back() {
        for (version, flags) in [(6, ArchiveFlags::empty()), (7, ArchiveFlags::BLOCK_INFO_NEED_PADDING_AT_START)] {
            let original = bundle(version, flags);
            let parsed = BundleFile::parse(&original.save().unwrap()).unwrap();
            assert_eq!(parsed.version, version);
            assert_eq!(parsed.unity_revision, "2019.4.1f1");
            assert_eq!(parsed.nodes.len(), 2);
            assert_eq!(parsed.node("CAB-test").unwrap().flags, 4);
            assert_eq!(parsed.nodes[1].data, original.nodes[1].data);
            assert_eq!(
                parsed.flags & ArchiveFlags::BLOCK_INFO_NEED_PADDING_AT_START,
                flags & ArchiveFlags::BLOCK_INFO_NEED_PADDING_AT_START
            );
        }
    }

    /// Uncompressed v6 bundle holding `hello` with its blocks info at the end.
    fn info_at_the_end(node_offset: i64, node_size: i64) -> Vec<u8> {
        let mut info = Writer::new(ByteOrder::Big);
        info.write_bytes(&[0; 16]);
        info.write_i32(1);
        info.write_u32(5);
        info.write_u32(5);
        info.write_u16(0);
        info.write_i32(1);
        info.write_i64(node_offset);
        info.write_i64(node_size);
        info.write_u32(4);
        info.write_cstring("CAB-end");
        let info = info.into_inner();

        let mut w = Writer::new(ByteOrder::Big);
        w.write_cstring(SIGNATURE);
        w.write_u32(6);
        w.write_cstring("5.x.x");
        w.write_cstring("2018.4.0f1");
        w.write_i64(0);
        w.write_u32(info.len() as u32);
        w.write_u32(info.len() as u32);
        w.write_u32(ArchiveFlags::BLOCKS_INFO_AT_THE_END.bits());
        w.write_bytes(b"hello");
        w.write_bytes(&info);
        w.into_inner()
    }

    #[test]
    fn reads_uncompressed_info_at_the_end() {
        let parsed = BundleFile::parse(&info_at_the_end(0, 5)).unwrap();
        assert_eq!(parsed.node("CAB-end").unwrap().data.as_slice(), b"hello");
    }

    #[test]
    fn node_ranges_outside_the_data_are_rejected() {
        for (offset, size) in [(i64::MAX, i64::MAX), (-1, 5), (0, -1), (3, 5)] {
            let err = BundleFile::parse(&info_at_the_end(offset, size)).unwrap_err();
            assert!(matches!(err, UnityError::InvalidData(_)), "{offset}+{size}: {err}");
        }
    }

    #[test]
    fn node_data_can_be_replaced() {
        let mut b = bundle(6, ArchiveFlags::empty());
        b.set_node_data("CAB-test", b"changed".to_vec()).unwrap();
        let parsed = BundleFile::parse(&b.save().unwrap()).unwrap();
        assert_eq!(parsed.node("CAB-test").unwrap().data.as_slice(), b"changed");
        assert!(b.set_node_data("missing", vec![]).is_err());
    }

    #[test]
    fn other_signatures_are_rejected() {
        assert!(matches!(BundleFile::parse(b"UnityWeb\0rest"), Err(UnityError::UnsupportedSignature(_))));
        assert!(matches!(BundleFile::parse(b"garbage\0"), Err(UnityError::UnknownSignature)));
    }
}
