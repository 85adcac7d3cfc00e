//! Filesystem helpers.
//!
//! - [`save_obj`]: build a value once and cache it on disk
//! - [`try_open`]: read a file, falling back to a default when it can't be opened
//! - [`PersistentDict`]: a string-keyed map bound to a file

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

// ============================================================================
// Codecs
// ============================================================================

/// Encoding used to persist a map to disk.
pub trait Codec {
    /// Serialize the map to bytes.
    fn encode<V: Serialize>(&self, map: &BTreeMap<String, V>) -> Result<Vec<u8>>;

    /// Deserialize a map from bytes produced by [`Codec::encode`].
    fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<BTreeMap<String, V>>;
}

/// JSON encoding (the default).
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<V: Serialize>(&self, map: &BTreeMap<String, V>) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(map)?)
    }

    fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<BTreeMap<String, V>> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// TOML encoding. Values must serialize to TOML-representable data.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

impl Codec for TomlCodec {
    fn encode<V: Serialize>(&self, map: &BTreeMap<String, V>) -> Result<Vec<u8>> {
        Ok(toml::to_string(map)?.into_bytes())
    }

    fn decode<V: DeserializeOwned>(&self, bytes: &[u8]) -> Result<BTreeMap<String, V>> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::parse("<toml document>", e.to_string()))?;
        Ok(toml::from_str(text)?)
    }
}

// ============================================================================
// save_obj / try_open
// ============================================================================

/// Return the value cached at `path`, building and caching it first if the
/// file doesn't exist yet.
///
/// `constructor` only runs when `path` is missing, which makes this useful
/// for values that are expensive to produce.
pub fn save_obj<T, F>(path: impl AsRef<Path>, constructor: F) -> Result<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> T,
{
    let path = path.as_ref();
    if path.exists() {
        tracing::debug!(path = %path.display(), "Loading cached object");
        let file = File::open(path).map_err(|e| Error::io_with_path(e, path))?;
        return Ok(serde_json::from_reader(BufReader::new(file))?);
    }

    tracing::debug!(path = %path.display(), "Constructing and caching object");
    let obj = constructor();
    let file = File::create(path).map_err(|e| Error::io_with_path(e, path))?;
    serde_json::to_writer(file, &obj)?;
    Ok(obj)
}

/// Open the file at `path` and hand it to `process`.
///
/// If the file can't be opened, `default` is returned when given; otherwise
/// the open error is returned. Errors from `process` are never swallowed.
pub fn try_open<R, F>(path: impl AsRef<Path>, process: F, default: Option<R>) -> Result<R>
where
    F: FnOnce(&mut BufReader<File>) -> Result<R>,
{
    let path = path.as_ref();
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            return match default {
                Some(value) => {
                    tracing::debug!(path = %path.display(), error = %e, "Using default for unreadable file");
                    Ok(value)
                }
                None => Err(Error::io_with_path(e, path)),
            };
        }
    };
    process(&mut BufReader::new(file))
}

/// Read a whole file as text, or return `default` if it can't be opened.
pub fn read_or(path: impl AsRef<Path>, default: impl Into<String>) -> Result<String> {
    try_open(
        path,
        |reader| {
            let mut text = String::new();
            std::io::Read::read_to_string(reader, &mut text)?;
            Ok(text)
        },
        Some(default.into()),
    )
}

// ============================================================================
// PersistentDict
// ============================================================================

/// A string-keyed map linked to a file on disk.
///
/// Dereferences to the underlying [`BTreeMap`], so it reads and writes
/// like an ordinary map. Call [`save`](Self::save) to write it out, or
/// hold an [`AutoSave`] guard to save when the guard goes out of scope.
#[derive(Debug, Clone)]
pub struct PersistentDict<V, C = JsonCodec> {
    path: PathBuf,
    data: BTreeMap<String, V>,
    codec: C,
}

impl<V> PersistentDict<V, JsonCodec>
where
    V: Serialize + DeserializeOwned,
{
    /// An empty map bound to `path`. The file is not read.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_codec(path, JsonCodec)
    }

    /// Load an existing JSON data file.
    pub fn from_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::from_path_with(path, JsonCodec)
    }
}

impl<V, C> PersistentDict<V, C>
where
    V: Serialize + DeserializeOwned,
    C: Codec,
{
    /// An empty map bound to `path` using `codec`.
    pub fn with_codec(path: impl Into<PathBuf>, codec: C) -> Self {
        Self {
            path: path.into(),
            data: BTreeMap::new(),
            codec,
        }
    }

    /// Load an existing data file written with `codec`.
    pub fn from_path_with(path: impl Into<PathBuf>, codec: C) -> Result<Self> {
        let path = path.into();
        let bytes = std::fs::read(&path).map_err(|e| Error::io_with_path(e, &path))?;
        let data = codec.decode(&bytes)?;
        tracing::debug!(path = %path.display(), entries = data.len(), "Loaded persistent dict");
        Ok(Self { path, data, codec })
    }

    /// Write the map to its file, returning the number of bytes written.
    pub fn save(&self) -> Result<usize> {
        let bytes = self.codec.encode(&self.data)?;
        std::fs::write(&self.path, &bytes).map_err(|e| Error::io_with_path(e, &self.path))?;
        tracing::debug!(path = %self.path.display(), bytes = bytes.len(), "Saved persistent dict");
        Ok(bytes.len())
    }

    /// A guard that saves the map when dropped.
    pub fn autosave(&mut self) -> AutoSave<'_, V, C> {
        AutoSave { dict: self }
    }

    /// The file this map is linked to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Consume the map, returning its entries.
    pub fn into_inner(self) -> BTreeMap<String, V> {
        self.data
    }
}

impl<V, C> Deref for PersistentDict<V, C> {
    type Target = BTreeMap<String, V>;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl<V, C> DerefMut for PersistentDict<V, C> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

/// Scope guard returned by [`PersistentDict::autosave`].
///
/// The map is saved on drop, including during unwinding. Save failures
/// are logged since `Drop` can't return them.
pub struct AutoSave<'a, V, C>
where
    V: Serialize + DeserializeOwned,
    C: Codec,
{
    dict: &'a mut PersistentDict<V, C>,
}

impl<V, C> Deref for AutoSave<'_, V, C>
where
    V: Serialize + DeserializeOwned,
    C: Codec,
{
    type Target = PersistentDict<V, C>;

    fn deref(&self) -> &Self::Target {
        self.dict
    }
}

impl<V, C> DerefMut for AutoSave<'_, V, C>
where
    V: Serialize + DeserializeOwned,
    C: Codec,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.dict
    }
}

impl<V, C> Drop for AutoSave<'_, V, C>
where
    V: Serialize + DeserializeOwned,
    C: Codec,
{
    fn drop(&mut self) {
        if let Err(e) = self.dict.save() {
            tracing::error!(path = %self.dict.path.display(), error = %e, "Failed to save persistent dict");
        }
    }
}
