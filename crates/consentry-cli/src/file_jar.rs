//! Cookie jar persisted to a JSON file between invocations.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use consentry_core::{Cookie, CookieJar, JarContext, JarError, JarResult, MemoryJar, StoredCookie};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
struct JarFile {
    #[serde(default)]
    cookies: Vec<StoredCookie>,
}

/// [`MemoryJar`] that rewrites its backing file after every write.
#[derive(Debug)]
pub(crate) struct FileJar {
    path: PathBuf,
    inner: MemoryJar,
}

impl FileJar {
    /// Load `path`, treating a missing file as an empty jar.
    pub(crate) fn open(path: &Path, context: JarContext) -> JarResult<Self> {
        let inner = MemoryJar::with_context(context);
        match fs::read_to_string(path) {
            Ok(raw) => {
                let file: JarFile =
                    serde_json::from_str(&raw).map_err(|source| JarError::Snapshot { source })?;
                tracing::debug!(
                    path = %path.display(),
                    cookies = file.cookies.len(),
                    "loaded cookie jar"
                );
                inner.restore(file.cookies);
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "cookie jar file missing; starting empty");
            }
            Err(source) => {
                return Err(JarError::Load {
                    path: path.to_path_buf(),
                    source,
                });
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    fn persist(&self) -> JarResult<()> {
        let file = JarFile {
            cookies: self.inner.snapshot(),
        };
        let text =
            serde_json::to_string_pretty(&file).map_err(|source| JarError::Snapshot { source })?;
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|source| JarError::Persist {
                path: self.path.clone(),
                source,
            })?;
        }
        fs::write(&self.path, text).map_err(|source| JarError::Persist {
            path: self.path.clone(),
            source,
        })
    }
}

impl CookieJar for FileJar {
    fn cookie_header(&self) -> String {
        self.inner.cookie_header()
    }

    fn write(&self, cookie: &Cookie) -> JarResult<()> {
        self.inner.write(cookie)?;
        self.persist()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use consentry_core::{CookieOptions, StoreOptions};

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let jar = FileJar::open(&dir.path().join("absent.json"), JarContext::default())
            .expect("open jar");
        assert_eq!(jar.cookie_header(), "");
    }

    #[test]
    fn writes_survive_a_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("jar.json");
        let jar = FileJar::open(&path, JarContext::default()).expect("open jar");
        let cookie =
            CookieOptions::default().resolve("theme", "dark mode", &StoreOptions::default());
        jar.write(&cookie).expect("write cookie");

        let reloaded = FileJar::open(&path, JarContext::default()).expect("reload jar");
        assert_eq!(reloaded.cookie_header(), "theme=dark%20mode");
    }

    #[test]
    fn corrupt_file_is_a_snapshot_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("jar.json");
        fs::write(&path, "not json").expect("write file");
        let err = FileJar::open(&path, JarContext::default()).expect_err("corrupt jar");
        assert!(matches!(err, JarError::Snapshot { .. }));
    }

    #[test]
    fn directory_path_is_a_load_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = FileJar::open(dir.path(), JarContext::default()).expect_err("directory");
        assert!(matches!(err, JarError::Load { .. }));
    }
}
