// src/assets.rs
// Read-only asset sources for the frontend distribution

use bytes::Bytes;
use rust_embed::RustEmbed;
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::AssetError;

/// Entry point every distribution must contain.
pub const INDEX_FILE: &str = "index.html";

#[derive(Debug, Clone)]
pub enum AssetBody {
    Bytes(Bytes),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Asset {
    /// Cleaned, `/`-separated path relative to the source root.
    pub path: String,
    pub body: AssetBody,
    /// Strong entity tag for in-memory bodies. File bodies derive theirs from metadata.
    pub etag: Option<String>,
}

/// A read-only file tree that can be opened by path and enumerated.
pub trait AssetSource: Send + Sync + 'static {
    fn open(&self, path: &str) -> Result<Asset, AssetError>;

    fn list(&self) -> Vec<String>;
}

/// Normalizes a relative request path.
///
/// Empty and `.` segments are dropped and `..` pops the previous segment.
/// Returns `None` when the path would climb above the root.
pub fn clean_path(path: &str) -> Option<String> {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split(|c: char| c == '/' || c == '\\') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop()?;
            }
            other => segments.push(other),
        }
    }

    Some(segments.join("/"))
}

/// Serves a directory on disk.
pub struct DirAssets {
    root: PathBuf,
    canonical_root: PathBuf,
}

impl DirAssets {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        let canonical_root = root.canonicalize()?;
        if !canonical_root.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("not a directory: {}", root.display()),
            ));
        }
        Ok(Self {
            root,
            canonical_root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetSource for DirAssets {
    fn open(&self, path: &str) -> Result<Asset, AssetError> {
        let cleaned = clean_path(path).ok_or_else(|| AssetError::Forbidden(path.to_string()))?;
        let full = self.canonical_root.join(&cleaned);

        let metadata = match fs::metadata(&full) {
            Ok(metadata) => metadata,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(AssetError::NotFound(cleaned))
            }
            Err(source) => {
                return Err(AssetError::Io {
                    path: cleaned,
                    source,
                })
            }
        };

        if !metadata.is_file() {
            return Err(AssetError::NotFound(cleaned));
        }

        let resolved = full.canonicalize().map_err(|source| AssetError::Io {
            path: cleaned.clone(),
            source,
        })?;
        if !resolved.starts_with(&self.canonical_root) {
            return Err(AssetError::Forbidden(cleaned));
        }

        Ok(Asset {
            path: cleaned,
            body: AssetBody::File(resolved),
            etag: None,
        })
    }

    fn list(&self) -> Vec<String> {
        WalkDir::new(&self.canonical_root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&self.canonical_root).ok()?;
                let segments: Vec<String> = relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                Some(segments.join("/"))
            })
            .collect()
    }
}

/// In-memory file tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryAssets {
    files: BTreeMap<String, (Bytes, String)>,
}

impl MemoryAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: &str, contents: impl Into<Bytes>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: &str, contents: impl Into<Bytes>) {
        let Some(cleaned) = clean_path(path) else {
            log::warn!("Ignoring asset outside of the root: {}", path);
            return;
        };
        let contents = contents.into();
        let mut hasher = DefaultHasher::new();
        contents.hash(&mut hasher);
        let etag = format!("{:016x}", hasher.finish());
        self.files.insert(cleaned, (contents, etag));
    }
}

impl<P: AsRef<str>, B: Into<Bytes>> FromIterator<(P, B)> for MemoryAssets {
    fn from_iter<I: IntoIterator<Item = (P, B)>>(iter: I) -> Self {
        let mut assets = MemoryAssets::new();
        for (path, contents) in iter {
            assets.insert(path.as_ref(), contents);
        }
        assets
    }
}

impl AssetSource for MemoryAssets {
    fn open(&self, path: &str) -> Result<Asset, AssetError> {
        let cleaned = clean_path(path).ok_or_else(|| AssetError::Forbidden(path.to_string()))?;
        match self.files.get(&cleaned) {
            Some((contents, etag)) => Ok(Asset {
                path: cleaned,
                body: AssetBody::Bytes(contents.clone()),
                etag: Some(etag.clone()),
            }),
            None => Err(AssetError::NotFound(cleaned)),
        }
    }

    fn list(&self) -> Vec<String> {
        self.files.keys().cloned().collect()
    }
}

/// Files compiled into the binary with `rust-embed`.
pub struct EmbeddedAssets<E> {
    _embed: PhantomData<fn() -> E>,
}

impl<E: RustEmbed> EmbeddedAssets<E> {
    pub fn new() -> Self {
        Self {
            _embed: PhantomData,
        }
    }
}

impl<E: RustEmbed> Default for EmbeddedAssets<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RustEmbed + 'static> AssetSource for EmbeddedAssets<E> {
    fn open(&self, path: &str) -> Result<Asset, AssetError> {
        let cleaned = clean_path(path).ok_or_else(|| AssetError::Forbidden(path.to_string()))?;
        let file = E::get(&cleaned).ok_or_else(|| AssetError::NotFound(cleaned.clone()))?;
        let etag: String = file
            .metadata
            .sha256_hash()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();

        Ok(Asset {
            path: cleaned,
            body: AssetBody::Bytes(Bytes::from(file.data.into_owned())),
            etag: Some(etag),
        })
    }

    fn list(&self) -> Vec<String> {
        E::iter().map(|name| name.into_owned()).collect()
    }
}

/// The frontend bundled with this crate.
#[derive(RustEmbed)]
#[folder = "static/"]
pub struct Distribution;

pub fn dist_assets() -> EmbeddedAssets<Distribution> {
    EmbeddedAssets::new()
}
