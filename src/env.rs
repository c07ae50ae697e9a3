use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use serde::de::DeserializeOwned;

use crate::asset::SerializedFile;
use crate::bundle::BundleFile;
use crate::classes::{ClassID, StreamingInfo, Texture2D};
use crate::error::{UnityError, UnityResult};
use crate::object::ObjectInfo;
use crate::typetree::Value;

/// Where the loaded serialized files came from.
#[derive(Debug)]
enum Container {
    Empty,
    Serialized,
    /// Bundle plus the node path of each serialized file, in `files` order.
    Bundle(BundleFile, Vec<String>),
}

/// A loaded asset container and its streamed resources.
#[derive(Debug)]
pub struct Env {
    container: Container,
    files: Vec<SerializedFile>,
    resources: DashMap<String, Arc<Vec<u8>>>,
    base_dir: Option<PathBuf>,
    source_name: Option<String>,
}

/// Stable reference to an object, valid across mutations of the [`Env`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObjectHandle {
    pub file: usize,
    pub path_id: i64,
}

#[derive(Clone, Copy)]
pub struct Object<'a> {
    env: &'a Env,
    file: usize,
    pub info: &'a ObjectInfo,
}

impl<'a> Object<'a> {
    pub fn class(&self) -> ClassID {
        self.info.class()
    }

    pub fn path_id(&self) -> i64 {
        self.info.path_id
    }

    pub fn handle(&self) -> ObjectHandle {
        ObjectHandle { file: self.file, path_id: self.info.path_id }
    }

    pub fn env(&self) -> &'a Env {
        self.env
    }

    pub fn read_value(&self) -> UnityResult<Value> {
        self.env.files[self.file].read_value(self.info)
    }

    pub fn read<T: DeserializeOwned>(&self) -> UnityResult<T> {
        self.env.files[self.file].read(self.info)
    }

    /// `m_Name` of the object, when it has one.
    pub fn name(&self) -> Option<String> {
        let value = self.read_value().ok()?;
        value.get("m_Name").and_then(Value::as_str).map(str::to_string)
    }

    /// Resolves an object reference made from this object's file.
    pub fn resolve(&self, file_id: i64, path_id: i64) -> UnityResult<Object<'a>> {
        if file_id != 0 {
            let external = self.env.files[self.file]
                .externals
                .get(usize::try_from(file_id - 1).unwrap_or(usize::MAX))
                .map(|e| e.path.clone())
                .unwrap_or_else(|| format!("file {file_id}"));
            return Err(UnityError::ResourceNotFound(external));
        }
        self.env.object_in(self.file, path_id).ok_or(UnityError::ObjectNotFound(path_id))
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Env {
    pub fn new() -> Self {
        Self {
            container: Container::Empty,
            files: Vec::new(),
            resources: DashMap::new(),
            base_dir: None,
            source_name: None,
        }
    }

    /// Loads a bundle or serialized file; sibling resources are looked up
    /// next to it.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> UnityResult<()> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        self.base_dir = path.parent().map(Path::to_path_buf);
        self.source_name = path.file_name().map(|n| n.to_string_lossy().into_owned());
        log::debug!("loading {} ({} bytes)", path.display(), data.len());
        self.load_from_vec(data)
    }

    pub fn load_from_slice(&mut self, data: &[u8]) -> UnityResult<()> {
        self.load_from_vec(data.to_vec())
    }

    /// Replaces whatever was loaded before. Cached resources are kept.
    pub fn load_from_vec(&mut self, data: Vec<u8>) -> UnityResult<()> {
        self.files.clear();
        self.container = Container::Empty;

        if BundleFile::probe(&data) || data.starts_with(b"UnityWeb") || data.starts_with(b"UnityRaw") || data.starts_with(b"UnityArchive") {
            let bundle = BundleFile::parse(&data)?;
            let mut paths = Vec::new();
            for node in &bundle.nodes {
                if SerializedFile::probe(&node.data) {
                    match SerializedFile::parse(node.data.clone()) {
                        Ok(file) => {
                            self.files.push(file);
                            paths.push(node.path.clone());
                            continue;
                        }
                        Err(e) => log::warn!("bundle node {} looked like a serialized file: {e}", node.path),
                    }
                }
                let name = file_name(&node.path).to_string();
                self.resources.insert(name, node.data.clone());
            }
            self.container = Container::Bundle(bundle, paths);
        } else if SerializedFile::probe(&data) {
            self.files.push(SerializedFile::parse(data)?);
            self.container = Container::Serialized;
        } else {
            return Err(UnityError::UnknownSignature);
        }
        log::info!("loaded {} serialized file(s), {} objects", self.files.len(), self.objects().count());
        Ok(())
    }

    /// Registers resource bytes under a file name (e.g. `sharedassets0.assets.resS`).
    pub fn add_resource(&self, name: &str, data: Vec<u8>) {
        self.resources.insert(name.to_string(), Arc::new(data));
    }

    pub fn files(&self) -> &[SerializedFile] {
        &self.files
    }

    pub fn is_bundle(&self) -> bool {
        matches!(self.container, Container::Bundle(..))
    }

    pub fn objects(&self) -> impl Iterator<Item = Object<'_>> {
        self.files
            .iter()
            .enumerate()
            .flat_map(move |(file, f)| f.objects.iter().map(move |info| Object { env: self, file, info }))
    }

    pub fn find_object(&self, path_id: i64) -> Option<Object<'_>> {
        self.objects().find(|o| o.path_id() == path_id)
    }

    pub fn object_in(&self, file: usize, path_id: i64) -> Option<Object<'_>> {
        let info = self.files.get(file)?.object(path_id)?;
        Some(Object { env: self, file, info })
    }

    pub fn object(&self, handle: ObjectHandle) -> Option<Object<'_>> {
        self.object_in(handle.file, handle.path_id)
    }

    pub fn write_value(&mut self, handle: ObjectHandle, value: &Value) -> UnityResult<()> {
        self.files
            .get_mut(handle.file)
            .ok_or(UnityError::ObjectNotFound(handle.path_id))?
            .write_value(handle.path_id, value)
    }

    /// Serializes the loaded container with every modification applied.
    pub fn save(&self) -> UnityResult<Vec<u8>> {
        match &self.container {
            Container::Empty => Err(UnityError::InvalidData("nothing loaded".to_string())),
            Container::Serialized => self.files[0].save(),
            Container::Bundle(bundle, paths) => {
                let mut bundle = bundle.clone();
                for (file, path) in self.files.iter().zip(paths) {
                    if file.is_modified() {
                        bundle.set_node_data(path, file.save()?)?;
                    }
                }
                bundle.save()
            }
        }
    }

    /// Pixel bytes of a texture, read from the stream file when not inline.
    pub fn texture_data<'t>(&self, texture: &'t Texture2D) -> UnityResult<Cow<'t, [u8]>> {
        match texture.streamed() {
            None => Ok(Cow::Borrowed(&texture.image_data.0)),
            Some(info) => self.stream_data(info).map(Cow::Owned),
        }
    }

    pub fn stream_data(&self, info: &StreamingInfo) -> UnityResult<Vec<u8>> {
        let resource = self.resource(&info.path)?;
        usize::try_from(info.offset)
            .ok()
            .and_then(|start| Some(start..start.checked_add(info.size as usize)?))
            .and_then(|range| resource.get(range))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| UnityError::InvalidData(format!("{} is shorter than {}+{}", info.path, info.offset, info.size)))
    }

    fn resource(&self, path: &str) -> UnityResult<Arc<Vec<u8>>> {
        let name = file_name(path);
        if let Some(data) = self.resources.get(name) {
            return Ok(data.clone());
        }
        let mut candidates = vec![name.to_string()];
        if name.ends_with(".resS") {
            if let Some(source) = &self.source_name {
                candidates.push(format!("{source}.resS"));
            }
        }
        let dir = self.base_dir.as_deref().unwrap_or(Path::new("."));
        for candidate in candidates {
            if let Some(data) = self.resources.get(&candidate) {
                return Ok(data.clone());
            }
            let file = dir.join(&candidate);
            if file.is_file() {
                log::debug!("reading resource {}", file.display());
                let data = Arc::new(std::fs::read(&file)?);
                self.resources.insert(name.to_string(), data.clone());
                return Ok(data);
            }
        }
        Err(UnityError::ResourceNotFound(path.to_string()))
    }
}

/// Last component of an archive path like `archive:/CAB-x/CAB-x.resS`.
fn file_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_drop_archive_prefix() {
        assert_eq!(file_name("archive:/CAB-abc/CAB-abc.resS"), "CAB-abc.resS");
        assert_eq!(file_name("sharedassets0.assets.resS"), "sharedassets0.assets.resS");
    }

    #[test]
    fn unknown_data_is_rejected() {
        let mut env = Env::new();
        assert!(matches!(env.load_from_slice(b"definitely not unity"), Err(UnityError::UnknownSignature)));
        assert!(env.save().is_err());
    }

    #[test]
    fn resources_resolve_from_cache() {
        let env = Env::new();
        env.add_resource("a.resS", vec![1, 2, 3, 4, 5]);
        let info = StreamingInfo { offset: 1, size: 3, path: "archive:/x/a.resS".to_string() };
        assert_eq!(env.stream_data(&info).unwrap(), vec![2, 3, 4]);
        let missing = StreamingInfo { offset: 0, size: 1, path: "b.resS".to_string() };
        assert!(matches!(env.stream_data(&missing), Err(UnityError::ResourceNotFound(_))));
    }

    #[test]
    fn stream_ranges_past_the_resource_fail() {
        let env = Env::new();
        env.add_resource("a.resS", vec![1, 2, 3, 4, 5]);
        for (offset, size) in [(u64::MAX, 16), (4, 2), (6, 0)] {
            let info = StreamingInfo { offset, size, path: "a.resS".to_string() };
            assert!(matches!(env.stream_data(&info), Err(UnityError::InvalidData(_))), "{offset}+{size}");
        }
    }
}
