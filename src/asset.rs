//! Serialized files: the `.assets` / `CAB-*` containers holding objects.
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::classes::ClassID;
use crate::error::{UnityError, UnityResult};
use crate::object::{from_value, ObjectInfo};
use crate::reader::{ByteOrder, Reader};
use crate::typetree::{read_value, write_value, TypeTree, Value};
use crate::writer::Writer;

pub const MIN_VERSION: u32 = 9;
pub const MAX_VERSION: u32 = 23;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildType {
    Alpha,
    Beta,
    Final,
    Patch,
    Experimental,
    China,
    Unknown(char),
}

impl From<char> for BuildType {
    fn from(c: char) -> Self {
        match c {
            'a' => BuildType::Alpha,
            'b' => BuildType::Beta,
            'f' => BuildType::Final,
            'p' => BuildType::Patch,
            'x' => BuildType::Experimental,
            'c' => BuildType::China,
            other => BuildType::Unknown(other),
        }
    }
}

/// Engine version such as `2019.4.1f1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnityVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub build_type: BuildType,
    pub build: u32,
}

impl UnityVersion {
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.splitn(3, '.');
        let major = parts.next()?.parse().ok()?;
        let minor = parts.next()?.parse().ok()?;
        let rest = parts.next().unwrap_or("0");
        let split = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
        let patch = rest[..split].parse().unwrap_or(0);
        let mut tail = rest[split..].chars();
        let build_type = tail.next().map(BuildType::from).unwrap_or(BuildType::Final);
        let build = tail.as_str().chars().take_while(|c| c.is_ascii_digit()).collect::<String>().parse().unwrap_or(0);
        Some(Self { major, minor, patch, build_type, build })
    }
}

impl Display for UnityVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let t = match self.build_type {
            BuildType::Alpha => 'a',
            BuildType::Beta => 'b',
            BuildType::Final => 'f',
            BuildType::Patch => 'p',
            BuildType::Experimental => 'x',
            BuildType::China => 'c',
            BuildType::Unknown(c) => c,
        };
        write!(f, "{}.{}.{}{}{}", self.major, self.minor, self.patch, t, self.build)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SerializedType {
    pub class_id: i32,
    pub is_stripped_type: bool,
    pub script_type_index: i16,
    pub script_id: Option<[u8; 16]>,
    pub old_type_hash: [u8; 16],
    pub type_tree: Option<TypeTree>,
    pub type_dependencies: Vec<i32>,
    pub class_name: String,
    pub name_space: String,
    pub asm_name: String,
}

impl SerializedType {
    pub fn new(class_id: ClassID, type_tree: TypeTree) -> Self {
        Self { class_id: class_id.into(), script_type_index: -1, type_tree: Some(type_tree), ..Default::default() }
    }

    fn has_script_id(&self, version: u32, is_ref_type: bool) -> bool {
        (is_ref_type && self.script_type_index >= 0)
            || (version < 16 && self.class_id < 0)
            || (version >= 16 && self.class_id == i32::from(ClassID::MonoBehaviour))
    }

    fn parse(r: &mut Reader, version: u32, enable_type_tree: bool, is_ref_type: bool) -> UnityResult<Self> {
        let mut t = SerializedType { class_id: r.read_i32()?, script_type_index: -1, ..Default::default() };
        if version >= 16 {
            t.is_stripped_type = r.read_bool()?;
        }
        if version >= 17 {
            t.script_type_index = r.read_i16()?;
        }
        if version >= 13 {
            if t.has_script_id(version, is_ref_type) {
                t.script_id = Some(r.read_array()?);
            }
            t.old_type_hash = r.read_array()?;
        }
        if enable_type_tree {
            t.type_tree = Some(if version >= 12 || version == 10 {
                TypeTree::parse_blob(r, version)?
            } else {
                TypeTree::parse_legacy(r, version)?
            });
            if version >= 21 {
                if is_ref_type {
                    t.class_name = r.read_cstring()?;
                    t.name_space = r.read_cstring()?;
                    t.asm_name = r.read_cstring()?;
                } else {
                    let count = r.read_i32()?;
                    t.type_dependencies = (0..count).map(|_| r.read_i32()).collect::<Result<_, _>>()?;
                }
            }
        }
        Ok(t)
    }

    fn write(&self, w: &mut Writer, version: u32, enable_type_tree: bool, is_ref_type: bool) {
        w.write_i32(self.class_id);
        if version >= 16 {
            w.write_bool(self.is_stripped_type);
        }
        if version >= 17 {
            w.write_i16(self.script_type_index);
        }
        if version >= 13 {
            if self.has_script_id(version, is_ref_type) {
                w.write_bytes(&self.script_id.unwrap_or_default());
            }
            w.write_bytes(&self.old_type_hash);
        }
        if enable_type_tree {
            let empty = TypeTree::default();
            let tree = self.type_tree.as_ref().unwrap_or(&empty);
            if version >= 12 || version == 10 {
                tree.write_blob(w, version);
            } else {
                tree.write_legacy(w, version);
            }
            if version >= 21 {
                if is_ref_type {
                    w.write_cstring(&self.class_name);
                    w.write_cstring(&self.name_space);
                    w.write_cstring(&self.asm_name);
                } else {
                    w.write_i32(self.type_dependencies.len() as i32);
                    for dep in &self.type_dependencies {
                        w.write_i32(*dep);
                    }
                }
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScriptType {
    pub local_file_index: i32,
    pub local_identifier: i64,
}

/// Reference to another serialized file (`m_FileID` indexes this list, 1-based).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FileIdentifier {
    pub temp_empty: String,
    pub guid: [u8; 16],
    pub type_: i32,
    pub path: String,
}

#[derive(Clone, Debug)]
pub struct SerializedFile {
    pub version: u32,
    pub endian: ByteOrder,
    reserved: [u8; 3],
    unknown: i64,
    pub unity_version: String,
    pub target_platform: i32,
    pub enable_type_tree: bool,
    pub types: Vec<SerializedType>,
    big_id_enabled: i32,
    pub objects: Vec<ObjectInfo>,
    pub script_types: Vec<ScriptType>,
    pub externals: Vec<FileIdentifier>,
    pub ref_types: Vec<SerializedType>,
    pub user_information: String,
    data: Arc<Vec<u8>>,
    payloads: HashMap<i64, Vec<u8>>,
}

struct Header {
    metadata_size: u64,
    file_size: u64,
    version: u32,
    data_offset: u64,
    endian: u8,
    reserved: [u8; 3],
    unknown: i64,
}

impl Header {
    fn parse(r: &mut Reader) -> UnityResult<Self> {
        r.set_order(ByteOrder::Big);
        let mut header = Header {
            metadata_size: r.read_u32()? as u64,
            file_size: r.read_u32()? as u64,
            version: r.read_u32()?,
            data_offset: r.read_u32()? as u64,
            endian: 0,
            reserved: [0; 3],
            unknown: 0,
        };
        if !(MIN_VERSION..=MAX_VERSION).contains(&header.version) {
            return Err(UnityError::UnsupportedVersion(header.version));
        }
        header.endian = r.read_u8()?;
        header.reserved = r.read_array()?;
        if header.version >= 22 {
            header.metadata_size = r.read_u32()? as u64;
            header.file_size = r.read_u64()?;
            header.data_offset = r.read_u64()?;
            header.unknown = r.read_i64()?;
        }
        Ok(header)
    }
}

fn align_up(value: u64, align: u64) -> u64 {
    (value + align - 1) / align * align
}

impl SerializedFile {
    /// Empty file of the given format version, little endian.
    pub fn new(version: u32, unity_version: &str, target_platform: i32) -> Self {
        Self {
            version,
            endian: ByteOrder::Little,
            reserved: [0; 3],
            unknown: 0,
            unity_version: unity_version.to_string(),
            target_platform,
            enable_type_tree: true,
            types: Vec::new(),
            big_id_enabled: 0,
            objects: Vec::new(),
            script_types: Vec::new(),
            externals: Vec::new(),
            ref_types: Vec::new(),
            user_information: String::new(),
            data: Arc::new(Vec::new()),
            payloads: HashMap::new(),
        }
    }

    /// Registers a type and returns its type index.
    pub fn add_type(&mut self, serialized_type: SerializedType) -> i32 {
        self.types.push(serialized_type);
        self.types.len() as i32 - 1
    }

    pub fn add_object(&mut self, path_id: i64, type_id: i32, data: Vec<u8>) -> UnityResult<()> {
        let serialized_type = self
            .types
            .get(type_id as usize)
            .ok_or_else(|| UnityError::InvalidData(format!("type index {type_id} out of range")))?;
        let class_id = serialized_type.class_id;
        // before version 16 the table stores the class id instead of a type index
        let type_id = if self.version < 16 { class_id } else { type_id };
        self.objects.push(ObjectInfo {
            path_id,
            byte_size: data.len() as u32,
            type_id,
            class_id,
            script_type_index: -1,
            ..Default::default()
        });
        self.payloads.insert(path_id, data);
        Ok(())
    }

    /// Cheap header sanity check, used to tell serialized files from resources.
    pub fn probe(data: &[u8]) -> bool {
        let mut r = Reader::new(data, ByteOrder::Big);
        match Header::parse(&mut r) {
            Ok(h) => h.data_offset <= h.file_size && h.file_size <= data.len() as u64 && h.metadata_size > 0,
            Err(_) => false,
        }
    }

    pub fn parse(data: impl Into<Arc<Vec<u8>>>) -> UnityResult<Self> {
        let data: Arc<Vec<u8>> = data.into();
        let mut r = Reader::new(&data, ByteOrder::Big);
        let header = Header::parse(&mut r)?;
        let version = header.version;
        if header.file_size > data.len() as u64 || header.data_offset > header.file_size {
            return Err(UnityError::InvalidData(format!(
                "header claims {} bytes with data at {}, file has {}",
                header.file_size,
                header.data_offset,
                data.len()
            )));
        }
        r.set_order(if header.endian == 0 { ByteOrder::Little } else { ByteOrder::Big });

        let unity_version = r.read_cstring()?;
        let target_platform = r.read_i32()?;
        let enable_type_tree = if version >= 13 { r.read_bool()? } else { true };

        let type_count = r.read_i32()?;
        let types = (0..type_count)
            .map(|_| SerializedType::parse(&mut r, version, enable_type_tree, false))
            .collect::<UnityResult<Vec<_>>>()?;

        let big_id_enabled = if (7..14).contains(&version) { r.read_i32()? } else { 0 };

        let object_count = r.read_i32()?;
        let mut objects = Vec::with_capacity(object_count.max(0) as usize);
        for _ in 0..object_count {
            let path_id = if big_id_enabled != 0 {
                r.read_i64()?
            } else if version < 14 {
                r.read_i32()? as i64
            } else {
                r.align(4)?;
                r.read_i64()?
            };
            let relative_start = if version >= 22 { r.read_i64()? as u64 } else { r.read_u32()? as u64 };
            let byte_start = relative_start
                .checked_add(header.data_offset)
                .ok_or_else(|| UnityError::InvalidData(format!("object {path_id} starts at {relative_start}")))?;
            let mut info = ObjectInfo {
                path_id,
                byte_start,
                byte_size: r.read_u32()?,
                type_id: r.read_i32()?,
                script_type_index: -1,
                ..Default::default()
            };
            if version < 16 {
                info.class_id = r.read_u16()? as i32;
            } else {
                info.class_id = types
                    .get(info.type_id as usize)
                    .map(|t| t.class_id)
                    .ok_or_else(|| UnityError::InvalidData(format!("object {path_id} has type index {}", info.type_id)))?;
            }
            if version < 11 {
                info.is_destroyed = r.read_u16()?;
            }
            if (11..17).contains(&version) {
                info.script_type_index = r.read_i16()?;
            }
            if version == 15 || version == 16 {
                info.stripped = r.read_u8()?;
            }
            if info.byte_start.saturating_add(info.byte_size as u64) > data.len() as u64 {
                return Err(UnityError::InvalidData(format!("object {path_id} runs past the end of the file")));
            }
            objects.push(info);
        }

        let mut script_types = Vec::new();
        if version >= 11 {
            let count = r.read_i32()?;
            for _ in 0..count {
                let local_file_index = r.read_i32()?;
                let local_identifier = if version < 14 {
                    r.read_i32()? as i64
                } else {
                    r.align(4)?;
                    r.read_i64()?
                };
                script_types.push(ScriptType { local_file_index, local_identifier });
            }
        }

        let external_count = r.read_i32()?;
        let mut externals = Vec::new();
        for _ in 0..external_count {
            externals.push(FileIdentifier {
                temp_empty: r.read_cstring()?,
                guid: r.read_array()?,
                type_: r.read_i32()?,
                path: r.read_cstring()?,
            });
        }

        let mut ref_types = Vec::new();
        if version >= 20 {
            let count = r.read_i32()?;
            for _ in 0..count {
                ref_types.push(SerializedType::parse(&mut r, version, enable_type_tree, true)?);
            }
        }

        let user_information = r.read_cstring()?;

        Ok(Self {
            version,
            endian: r.order(),
            reserved: header.reserved,
            unknown: header.unknown,
            unity_version,
            target_platform,
            enable_type_tree,
            types,
            big_id_enabled,
            objects,
            script_types,
            externals,
            ref_types,
            user_information,
            data: data.clone(),
            payloads: HashMap::new(),
        })
    }

    pub fn unity_version(&self) -> Option<UnityVersion> {
        UnityVersion::parse(&self.unity_version)
    }

    pub fn object(&self, path_id: i64) -> Option<&ObjectInfo> {
        self.objects.iter().find(|o| o.path_id == path_id)
    }

    pub fn serialized_type(&self, info: &ObjectInfo) -> Option<&SerializedType> {
        if self.version >= 16 {
            self.types.get(info.type_id as usize)
        } else {
            self.types.iter().find(|t| t.class_id == info.type_id)
        }
    }

    pub fn type_tree(&self, info: &ObjectInfo) -> UnityResult<&TypeTree> {
        self.serialized_type(info)
            .and_then(|t| t.type_tree.as_ref())
            .filter(|t| !t.nodes.is_empty())
            .ok_or(UnityError::TypeTreeNotFound(info.class()))
    }

    pub fn object_data(&self, info: &ObjectInfo) -> UnityResult<&[u8]> {
        if let Some(data) = self.payloads.get(&info.path_id) {
            return Ok(data);
        }
        usize::try_from(info.byte_start)
            .ok()
            .and_then(|start| Some(start..start.checked_add(info.byte_size as usize)?))
            .and_then(|range| self.data.get(range))
            .ok_or_else(|| UnityError::InvalidData(format!("object {} out of bounds", info.path_id)))
    }

    pub fn read_value(&self, info: &ObjectInfo) -> UnityResult<Value> {
        let tree = self.type_tree(info)?;
        let mut reader = Reader::new(self.object_data(info)?, self.endian);
        read_value(&tree.nodes, &mut reader)
    }

    pub fn read<T: DeserializeOwned>(&self, info: &ObjectInfo) -> UnityResult<T> {
        from_value(&self.read_value(info)?)
    }

    pub fn set_object_data(&mut self, path_id: i64, data: Vec<u8>) -> UnityResult<()> {
        let info = self.objects.iter_mut().find(|o| o.path_id == path_id).ok_or(UnityError::ObjectNotFound(path_id))?;
        info.byte_size = data.len() as u32;
        self.payloads.insert(path_id, data);
        Ok(())
    }

    pub fn write_value(&mut self, path_id: i64, value: &Value) -> UnityResult<()> {
        let info = self.object(path_id).ok_or(UnityError::ObjectNotFound(path_id))?;
        let tree = self.type_tree(info)?;
        let mut writer = Writer::new(self.endian);
        write_value(&tree.nodes, value, &mut writer)?;
        self.set_object_data(path_id, writer.into_inner())
    }

    /// Whether any payload differs from the loaded bytes.
    pub fn is_modified(&self) -> bool {
        !self.payloads.is_empty()
    }

    fn write_metadata(&self, w: &mut Writer, starts: &[u64]) {
        let version = self.version;
        w.write_cstring(&self.unity_version);
        w.write_i32(self.target_platform);
        if version >= 13 {
            w.write_bool(self.enable_type_tree);
        }

        w.write_i32(self.types.len() as i32);
        for t in &self.types {
            t.write(w, version, self.enable_type_tree, false);
        }

        if (7..14).contains(&version) {
            w.write_i32(self.big_id_enabled);
        }

        w.write_i32(self.objects.len() as i32);
        for (info, start) in self.objects.iter().zip(starts) {
            if self.big_id_enabled != 0 {
                w.write_i64(info.path_id);
            } else if version < 14 {
                w.write_i32(info.path_id as i32);
            } else {
                w.align(4);
                w.write_i64(info.path_id);
            }
            if version >= 22 {
                w.write_i64(*start as i64);
            } else {
                w.write_u32(*start as u32);
            }
            w.write_u32(info.byte_size);
            w.write_i32(info.type_id);
            if version < 16 {
                w.write_u16(info.class_id as u16);
            }
            if version < 11 {
                w.write_u16(info.is_destroyed);
            }
            if (11..17).contains(&version) {
                w.write_i16(info.script_type_index);
            }
            if version == 15 || version == 16 {
                w.write_u8(info.stripped);
            }
        }

        if version >= 11 {
            w.write_i32(self.script_types.len() as i32);
            for s in &self.script_types {
                w.write_i32(s.local_file_index);
                if version < 14 {
                    w.write_i32(s.local_identifier as i32);
                } else {
                    w.align(4);
                    w.write_i64(s.local_identifier);
                }
            }
        }

        w.write_i32(self.externals.len() as i32);
        for e in &self.externals {
            w.write_cstring(&e.temp_empty);
            w.write_bytes(&e.guid);
            w.write_i32(e.type_);
            w.write_cstring(&e.path);
        }

        if version >= 20 {
            w.write_i32(self.ref_types.len() as i32);
            for t in &self.ref_types {
                t.write(w, version, self.enable_type_tree, true);
            }
        }

        w.write_cstring(&self.user_information);
    }

    /// Serializes the file with every payload, recomputing the object table.
    pub fn save(&self) -> UnityResult<Vec<u8>> {
        let header_size = if self.version >= 22 { 48 } else { 20 };

        let mut starts = Vec::with_capacity(self.objects.len());
        let mut data_size = 0u64;
        for info in &self.objects {
            data_size = align_up(data_size, 8);
            starts.push(data_size);
            data_size += self.object_data(info)?.len() as u64;
        }

        let mut w = Writer::with_capacity(self.endian, header_size + data_size as usize + 4096);
        w.write_bytes(&vec![0u8; header_size]);
        self.write_metadata(&mut w, &starts);
        let metadata_size = (w.position() - header_size) as u64;
        w.align(16);
        let data_offset = w.position() as u64;

        for (info, start) in self.objects.iter().zip(&starts) {
            let target = (data_offset + start) as usize;
            w.write_bytes(&vec![0u8; target - w.position()]);
            w.write_bytes(self.object_data(info)?);
        }
        let file_size = w.position() as u64;

        let mut h = Writer::new(ByteOrder::Big);
        if self.version >= 22 {
            h.write_u32(0);
            h.write_u32(0);
            h.write_u32(self.version);
            h.write_u32(0);
        } else {
            if file_size > u32::MAX as u64 {
                return Err(UnityError::InvalidData(format!("{file_size} bytes do not fit a version {} file", self.version)));
            }
            h.write_u32(metadata_size as u32);
            h.write_u32(file_size as u32);
            h.write_u32(self.version);
            h.write_u32(data_offset as u32);
        }
        h.write_u8(if self.endian == ByteOrder::Big { 1 } else { 0 });
        h.write_bytes(&self.reserved);
        if self.version >= 22 {
            h.write_u32(metadata_size as u32);
            h.write_u64(file_size);
            h.write_u64(data_offset);
            h.write_i64(self.unknown);
        }
        w.patch(0, h.as_slice());
        Ok(w.into_inner())
    }
}
