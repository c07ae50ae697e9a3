use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use unicode_normalization::UnicodeNormalization;

const TEMP: &str = "temp";

/// Directory layout the server works in.
#[derive(Debug, Clone)]
pub struct Workspace {
    pub uploads: PathBuf,
    pub extracted: PathBuf,
    pub modified: PathBuf,
}

impl Workspace {
    /// Creates `uploads/`, `extracted/` and `modified/` (each with `temp/`) under `base`.
    pub fn create(base: impl AsRef<Path>) -> io::Result<Self> {
        let base = base.as_ref();
        let workspace = Self {
            uploads: base.join("uploads"),
            extracted: base.join("extracted"),
            modified: base.join("modified"),
        };
        for dir in workspace.dirs() {
            fs::create_dir_all(dir.join(TEMP))?;
        }
        Ok(workspace)
    }

    fn dirs(&self) -> [&Path; 3] {
        [&self.uploads, &self.extracted, &self.modified]
    }

    pub fn upload_temp(&self) -> PathBuf {
        self.uploads.join(TEMP)
    }

    /// Empties the three `temp/` directories, recreating them if needed.
    pub fn cleanup_temp(&self) -> io::Result<()> {
        for dir in self.dirs() {
            let temp = dir.join(TEMP);
            match fs::read_dir(&temp) {
                Ok(entries) => {
                    for entry in entries {
                        let path = entry?.path();
                        if path.is_dir() {
                            fs::remove_dir_all(&path)?;
                        } else {
                            fs::remove_file(&path)?;
                        }
                    }
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => fs::create_dir_all(&temp)?,
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Path of an extracted image, or `None` if `name` tries to leave the directory.
    pub fn extracted_file(&self, name: &str) -> Option<PathBuf> {
        let path = Path::new(name);
        let plain = path.components().all(|c| matches!(c, std::path::Component::Normal(_)));
        (plain && !name.is_empty()).then(|| self.extracted.join(path))
    }
}

/// Reduces a client supplied file name to a safe single path component.
///
/// The name is NFKD normalised so accented letters keep their base letter,
/// remaining non-ASCII characters are dropped, path separators become spaces, runs of
/// whitespace become `_`, anything outside `[A-Za-z0-9_.-]` is removed and
/// leading dots or underscores are stripped. May return an empty string.
pub fn secure_filename(name: &str) -> String {
    let ascii: String = name.nfkd().filter(char::is_ascii).collect();
    let spaced = ascii.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined.chars().filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')).collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_filenames() {
        assert_eq!(secure_filename("My cool movie.mov"), "My_cool_movie.mov");
        assert_eq!(secure_filename("../../../etc/passwd"), "etc_passwd");
        assert_eq!(secure_filename("i contain cool \u{fc}ml\u{e4}uts.txt"), "i_contain_cool_umlauts.txt");
        assert_eq!(secure_filename("sharedassets0.assets.resS"), "sharedassets0.assets.resS");
        assert_eq!(secure_filename("..."), "");
    }

    #[test]
    fn cleanup_only_touches_temp() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::create(dir.path()).unwrap();
        fs::write(ws.upload_temp().join("x.png"), b"x").unwrap();
        fs::create_dir_all(ws.extracted.join(TEMP).join("nested")).unwrap();
        fs::write(ws.uploads.join("keep.assets"), b"x").unwrap();

        ws.cleanup_temp().unwrap();
        assert_eq!(fs::read_dir(ws.upload_temp()).unwrap().count(), 0);
        assert_eq!(fs::read_dir(ws.extracted.join(TEMP)).unwrap().count(), 0);
        assert!(ws.uploads.join("keep.assets").exists());
    }

    #[test]
    fn extracted_paths_stay_inside() {
        let ws = Workspace { uploads: "u".into(), extracted: "e".into(), modified: "m".into() };
        assert_eq!(ws.extracted_file("hero.png"), Some(PathBuf::from("e/hero.png")));
        assert_eq!(ws.extracted_file("../secret"), None);
        assert_eq!(ws.extracted_file("/etc/passwd"), None);
        assert_eq!(ws.extracted_file(""), None);
    }
}
