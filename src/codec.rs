//! Tile layer payload decoding: plain, CSV and base64 (optionally zlib/gzip
//! compressed) streams down to a flat row-major list of GIDs.

use std::io::Read;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::{GzDecoder, ZlibDecoder};
use log::debug;

use crate::error::DecodeError;
use crate::gid::Gid;

/// How a layer's tile data is written in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// One GID per `<tile>` element (or a JSON array).
    #[default]
    Plain,
    /// Comma separated decimal GIDs.
    Csv,
    /// Little-endian `u32`s, base64 encoded and optionally compressed.
    Base64,
}

impl Encoding {
    /// Maps a document `encoding` tag; absent or empty means plain.
    pub fn from_tag(tag: Option<&str>) -> Result<Self, DecodeError> {
        match tag.unwrap_or("") {
            "" => Ok(Encoding::Plain),
            "csv" => Ok(Encoding::Csv),
            "base64" => Ok(Encoding::Base64),
            other => Err(DecodeError::UnrecognizedEncoding(other.to_owned())),
        }
    }
}

/// Compression applied to a base64 payload before encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    /// No compression.
    #[default]
    None,
    /// zlib stream.
    Zlib,
    /// gzip stream.
    Gzip,
}

impl Compression {
    /// Maps a document `compression` tag; absent or empty means none.
    pub fn from_tag(tag: Option<&str>) -> Result<Self, DecodeError> {
        match tag.unwrap_or("") {
            "" => Ok(Compression::None),
            "zlib" => Ok(Compression::Zlib),
            "gzip" => Ok(Compression::Gzip),
            other => Err(DecodeError::UnrecognizedCompression(other.to_owned())),
        }
    }
}

/// A layer's tile data as declared in the document.
#[derive(Debug, Clone, Copy)]
pub struct RawTileStream<'a> {
    /// Declared encoding.
    pub encoding: Encoding,
    /// Raw `compression` tag, only read for base64 payloads.
    pub compression: Option<&'a str>,
    /// Text content of the data block (CSV or base64).
    pub text: &'a str,
    /// Per-tile GIDs for the plain encoding.
    pub tiles: &'a [u32],
}

/// Decodes `stream` for a `width` x `height` grid.
///
/// The result always has exactly `width * height` entries, row-major with the
/// origin at the top-left.
pub fn decode(stream: &RawTileStream<'_>, width: usize, height: usize) -> Result<Vec<Gid>, DecodeError> {
    let expected = width * height;
    debug!("decoding {expected} tiles, encoding {:?}", stream.encoding);

    let gids = match stream.encoding {
        Encoding::Plain => decode_plain(stream.tiles),
        Encoding::Csv => decode_csv(stream.text)?,
        Encoding::Base64 => {
            let compression = Compression::from_tag(stream.compression)?;
            let bytes = decode_base64(stream.text, compression, expected * 4)?;
            if bytes.len() != expected * 4 {
                return Err(DecodeError::DecodedLengthMismatch {
                    expected: expected * 4,
                    actual: bytes.len(),
                });
            }
            gids_from_le_bytes(&bytes)
        }
    };

    if gids.len() != expected {
        return Err(DecodeError::DecodedLengthMismatch {
            expected,
            actual: gids.len(),
        });
    }
    Ok(gids)
}

/// Plain GIDs as listed.
pub fn decode_plain(tiles: &[u32]) -> Vec<Gid> {
    tiles.iter().copied().map(Gid).collect()
}

/// Parses comma separated decimal GIDs. Anything that is neither a digit nor a
/// comma (whitespace, newlines) is dropped first.
pub fn decode_csv(text: &str) -> Result<Vec<Gid>, DecodeError> {
    let clean: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',')
        .collect();

    clean
        .split(',')
        .map(|token| {
            token
                .parse::<u32>()
                .map(Gid)
                .map_err(|source| DecodeError::InvalidCsv {
                    token: token.to_owned(),
                    source,
                })
        })
        .collect()
}

/// Base64-decodes `text` and inflates it according to `compression`.
///
/// Inflation stops one byte past `limit`, enough for the caller to see an
/// oversized stream without holding all of it.
pub fn decode_base64(text: &str, compression: Compression, limit: usize) -> Result<Vec<u8>, DecodeError> {
    let compact: String = text.split_ascii_whitespace().collect();
    let raw = STANDARD.decode(compact)?;

    let cap = limit as u64 + 1;
    let mut out = Vec::new();
    match compression {
        Compression::None => return Ok(raw),
        Compression::Zlib => ZlibDecoder::new(raw.as_slice())
            .take(cap)
            .read_to_end(&mut out)
            .map_err(DecodeError::Decompress)?,
        Compression::Gzip => GzDecoder::new(raw.as_slice())
            .take(cap)
            .read_to_end(&mut out)
            .map_err(DecodeError::Decompress)?,
    };
    Ok(out)
}

fn gids_from_le_bytes(bytes: &[u8]) -> Vec<Gid> {
    bytes
        .chunks_exact(4)
        .map(|c| Gid(u32::from_le_bytes([c[0], c[1], c[2], c[3]])))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{GzEncoder, ZlibEncoder};
    use std::io::Write;

    const GRID: [u32; 6] = [1, 0, 3, 0x8000_0002, 5, 0];

    fn le_bytes(gids: &[u32]) -> Vec<u8> {
        gids.iter().flat_map(|g| g.to_le_bytes()).collect()
    }

    fn encode(gids: &[u32], compression: Compression) -> String {
        let bytes = le_bytes(gids);
        let packed = match compression {
            Compression::None => bytes,
            Compression::Zlib => {
                let mut e = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
                e.write_all(&bytes).unwrap();
                e.finish().unwrap()
            }
            Compression::Gzip => {
                let mut e = GzEncoder::new(Vec::new(), flate2::Compression::default());
                e.write_all(&bytes).unwrap();
                e.finish().unwrap()
            }
        };
        format!("\n   {}\n  ", STANDARD.encode(packed))
    }

    fn raw(gids: &[Gid]) -> Vec<u32> {
        gids.iter().map(|g| g.raw()).collect()
    }

    #[test]
    fn plain_projects_tiles() {
        let stream = RawTileStream { encoding: Encoding::Plain, compression: None, text: "", tiles: &GRID };
        assert_eq!(raw(&decode(&stream, 3, 2).unwrap()), GRID);
    }

    #[test]
    fn csv_ignores_whitespace() {
        let text = "\n1,0,3,\n2147483650,5,0\n";
        let stream = RawTileStream { encoding: Encoding::Csv, compression: None, text, tiles: &[] };
        assert_eq!(raw(&decode(&stream, 3, 2).unwrap()), GRID);
    }

    #[test]
    fn csv_rejects_empty_token() {
        let err = decode_csv("1,,2").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidCsv { ref token, .. } if token.is_empty()));
    }

    #[test]
    fn base64_all_compressions_reproduce_grid() {
        for (tag, compression) in [
            (None, Compression::None),
            (Some("zlib"), Compression::Zlib),
            (Some("gzip"), Compression::Gzip),
        ] {
            let text = encode(&GRID, compression);
            let stream = RawTileStream {
                encoding: Encoding::Base64,
                compression: tag,
                text: &text,
                tiles: &[],
            };
            assert_eq!(raw(&decode(&stream, 3, 2).unwrap()), GRID, "{tag:?}");
        }
    }

    #[test]
    fn base64_length_is_checked_in_bytes() {
        let text = encode(&GRID[..5], Compression::None);
        let stream = RawTileStream { encoding: Encoding::Base64, compression: None, text: &text, tiles: &[] };
        let err = decode(&stream, 3, 2).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::DecodedLengthMismatch { expected: 24, actual: 20 }
        ));
    }

    #[test]
    fn plain_length_mismatch() {
        let tiles = [0u32; 15];
        let stream = RawTileStream { encoding: Encoding::Plain, compression: None, text: "", tiles: &tiles };
        let err = decode(&stream, 4, 4).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::DecodedLengthMismatch { expected: 16, actual: 15 }
        ));
    }

    #[test]
    fn unknown_tags_fail() {
        assert!(matches!(
            Encoding::from_tag(Some("xml")).unwrap_err(),
            DecodeError::UnrecognizedEncoding(ref e) if e == "xml"
        ));
        assert_eq!(Encoding::from_tag(None).unwrap(), Encoding::Plain);

        let stream = RawTileStream { encoding: Encoding::Base64, compression: Some("zstd"), text: "AAAAAA==", tiles: &[] };
        assert!(matches!(
            decode(&stream, 1, 1).unwrap_err(),
            DecodeError::UnrecognizedCompression(ref c) if c == "zstd"
        ));
    }

    #[test]
    fn corrupt_zlib_stream_fails() {
        let text = STANDARD.encode([1u8, 2, 3, 4, 5]);
        assert!(matches!(
            decode_base64(&text, Compression::Zlib, 4).unwrap_err(),
            DecodeError::Decompress(_)
        ));
    }

    #[test]
    fn oversized_stream_stops_past_the_layer_size() {
        let zeros = vec![0u32; 1 << 16];
        for compression in [Compression::Zlib, Compression::Gzip] {
            let text = encode(&zeros, compression);
            assert_eq!(decode_base64(&text, compression, 4).unwrap().len(), 5);

            let tag = if compression == Compression::Zlib { "zlib" } else { "gzip" };
            let stream = RawTileStream {
                encoding: Encoding::Base64,
                compression: Some(tag),
                text: &text,
                tiles: &[],
            };
            assert!(matches!(
                decode(&stream, 1, 1).unwrap_err(),
                DecodeError::DecodedLengthMismatch { expected: 4, actual: 5 }
            ));
        }
    }
}
