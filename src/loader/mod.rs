//! Document readers: TMX/TSX through `quick-xml`, Tiled JSON through
//! `serde_json`. Both produce the [`IrMap`] tree.

pub mod json_loader;
pub mod tmx_loader;

use std::io;
use std::path::Path;

use crate::error::MapError;
use crate::ir_map::{IrMap, IrTilesetDef};

/// Source of bytes for documents referenced by path (maps, external tilesets).
pub trait ResourceReader {
    /// Whole contents of the document at `path`.
    fn read(&mut self, path: &Path) -> io::Result<Vec<u8>>;
}

/// Reads straight from the file system.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystem;

impl ResourceReader for FileSystem {
    fn read(&mut self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

impl<F> ResourceReader for F
where
    F: FnMut(&Path) -> io::Result<Vec<u8>>,
{
    fn read(&mut self, path: &Path) -> io::Result<Vec<u8>> {
        self(path)
    }
}

/// Document syntax, picked from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `.tmx` maps and `.tsx` tilesets.
    Xml,
    /// `.json` / `.tmj` maps and `.json` / `.tsj` tilesets.
    Json,
}

impl Format {
    /// Picks the format from `path`'s extension.
    pub fn from_path(path: &Path) -> Result<Self, MapError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("tmx" | "tsx" | "xml") => Ok(Format::Xml),
            Some("json" | "tmj" | "tsj") => Ok(Format::Json),
            _ => Err(MapError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

fn read_text<R>(reader: &mut R, path: &Path) -> Result<String, MapError>
where
    R: ResourceReader + ?Sized,
{
    let bytes = reader.read(path).map_err(|source| MapError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    String::from_utf8(bytes).map_err(|e| MapError::Malformed {
        path: path.to_path_buf(),
        reason: format!("not valid UTF-8: {e}"),
    })
}

/// Reads and parses a map document.
pub fn read_map<R>(reader: &mut R, path: &Path) -> Result<IrMap, MapError>
where
    R: ResourceReader + ?Sized,
{
    let format = Format::from_path(path)?;
    let text = read_text(reader, path)?;
    parse_map(format, &text, path)
}

/// Parses map text; `path` only labels errors.
pub fn parse_map(format: Format, text: &str, path: &Path) -> Result<IrMap, MapError> {
    match format {
        Format::Xml => tmx_loader::parse_map(text, path),
        Format::Json => json_loader::parse_map(text, path),
    }
}

/// Reads and parses an external tileset document.
pub fn read_tileset<R>(reader: &mut R, path: &Path) -> Result<IrTilesetDef, MapError>
where
    R: ResourceReader + ?Sized,
{
    let format = Format::from_path(path)?;
    let text = read_text(reader, path)?;
    match format {
        Format::Xml => tmx_loader::parse_tileset(&text, path),
        Format::Json => json_loader::parse_tileset(&text, path),
    }
}
