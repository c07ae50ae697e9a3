use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::env::Env;
use crate::error::{UnityError, UnityResult};
use crate::replace::{extract_image, replace_image, ReplaceReport};
use crate::workspace::{secure_filename, Workspace};

/// A texture or sprite written to `extracted/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedTexture {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub path_id: i64,
    /// File name inside `extracted/`.
    pub path: String,
}

/// The asset file currently being edited.
///
/// Uploads are copied into `modified/` and every change is written to that
/// copy, so the upload itself stays untouched.
#[derive(Debug)]
pub struct AssetHandler {
    workspace: Workspace,
    original: Option<PathBuf>,
    modified: Option<PathBuf>,
    env: Option<Env>,
}

fn ress(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".resS");
    PathBuf::from(name)
}

/// Display name and PNG file name for an extracted image.
///
/// Unnamed objects become `<type>_<path id>`; names whose file is already
/// taken get `_<path id>` appended.
pub fn output_name(used: &mut HashSet<String>, name: Option<String>, type_: &str, path_id: i64) -> (String, String) {
    let mut name = name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("{}_{path_id}", type_.to_lowercase()));
    let mut file = format!("{}.png", secure_filename(&name));
    if file == ".png" || !used.insert(file.clone()) {
        name = format!("{name}_{path_id}");
        file = format!("{}.png", secure_filename(&name));
        used.insert(file.clone());
    }
    (name, file)
}

impl AssetHandler {
    pub fn new(workspace: Workspace) -> Self {
        Self { workspace, original: None, modified: None, env: None }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn modified_file(&self) -> Option<&Path> {
        self.modified.as_deref().filter(|p| p.is_file())
    }

    /// Starts a session on `original`, copying it (and its `.resS`) into `modified/`.
    pub fn set_files(&mut self, original: impl AsRef<Path>) -> UnityResult<()> {
        let original = fs::canonicalize(original.as_ref())?;
        let name = original
            .file_name()
            .ok_or_else(|| UnityError::InvalidData(format!("{} has no file name", original.display())))?;
        let modified = self.workspace.modified.join(name);
        fs::copy(&original, &modified)?;
        if ress(&original).is_file() {
            fs::copy(ress(&original), ress(&modified))?;
        }
        log::info!("working on {}", modified.display());
        self.original = Some(original);
        self.modified = Some(modified);
        self.env = None;
        Ok(())
    }

    pub fn load_environment(&mut self) -> UnityResult<&Env> {
        let modified = self.modified.as_ref().ok_or_else(|| UnityError::InvalidData("no asset file loaded".to_string()))?;
        let mut env = Env::new();
        env.load_file(modified)?;
        Ok(self.env.insert(env))
    }

    fn env(&mut self) -> UnityResult<&Env> {
        if self.env.is_none() {
            self.load_environment()?;
        }
        self.env.as_ref().ok_or_else(|| UnityError::InvalidData("no asset file loaded".to_string()))
    }

    /// Decodes every Texture2D and Sprite into `extracted/<name>.png`.
    /// Objects that fail to decode are logged and skipped.
    pub fn extract_textures(&mut self) -> UnityResult<Vec<ExtractedTexture>> {
        let out_dir = self.workspace.extracted.clone();
        let env = self.env()?;
        let mut used = HashSet::new();
        let mut extracted = Vec::new();
        for object in env.objects().filter(|o| o.class().is_image()) {
            let type_ = object.class().name();
            let path_id = object.path_id();
            let image = match extract_image(&object) {
                Ok(image) => image,
                Err(e) => {
                    log::warn!("skipping {type_} {path_id}: {e}");
                    continue;
                }
            };
            let (name, file) = output_name(&mut used, object.name(), &type_, path_id);
            if let Err(e) = image.save(out_dir.join(&file)) {
                log::warn!("cannot write {file}: {e}");
                continue;
            }
            extracted.push(ExtractedTexture { name, type_, path_id, path: file });
        }
        log::info!("extracted {} image(s)", extracted.len());
        Ok(extracted)
    }

    /// Number of objects per class name in the loaded file.
    pub fn type_summary(&mut self) -> UnityResult<BTreeMap<String, usize>> {
        let mut summary = BTreeMap::new();
        for object in self.env()?.objects() {
            *summary.entry(object.class().name()).or_insert(0) += 1;
        }
        Ok(summary)
    }

    /// Replaces the image of `path_id` and rewrites the working copy.
    pub fn replace_texture(&mut self, path_id: i64, image_path: &Path) -> (bool, String) {
        match self.try_replace(path_id, image_path) {
            Ok(report) => {
                let mut message = format!(
                    "replaced {:?} {} ({}x{}) as {:?}",
                    report.class, report.name, report.original_size.0, report.original_size.1, report.format
                );
                if report.fallback {
                    message.push_str(" (original format could not be encoded)");
                }
                (true, message)
            }
            Err(e) => {
                log::error!("replacing {path_id} failed: {e}");
                // drop partial edits; the next request reloads the working copy
                self.env = None;
                (false, format!("texture replacement failed: {e}"))
            }
        }
    }

    fn try_replace(&mut self, path_id: i64, image_path: &Path) -> UnityResult<ReplaceReport> {
        let (original, modified) = match (&self.original, &self.modified) {
            (Some(o), Some(m)) => (o.clone(), m.clone()),
            _ => return Err(UnityError::InvalidData("no asset file loaded".to_string())),
        };
        let image = image::open(image_path)?.to_rgba8();
        log::debug!("replacement image {}x{}", image.width(), image.height());

        if self.env.is_none() {
            self.load_environment()?;
        }
        let env = self.env.as_mut().ok_or_else(|| UnityError::InvalidData("no asset file loaded".to_string()))?;
        let report = replace_image(env, path_id, &image)?;

        let data = env.save()?;
        fs::write(&modified, &data)?;
        log::info!("wrote {} ({} bytes)", modified.display(), data.len());
        if ress(&original).is_file() {
            fs::copy(ress(&original), ress(&modified))?;
        }

        let env = self.load_environment()?;
        let object = env.find_object(path_id).ok_or(UnityError::ObjectNotFound(path_id))?;
        let check = extract_image(&object)?;
        if check.dimensions() != report.original_size {
            return Err(UnityError::InvalidData(format!(
                "verification failed: reloaded image is {}x{}",
                check.width(),
                check.height()
            )));
        }
        Ok(report)
    }
}
