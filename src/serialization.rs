//! Serialization support for sinoatrial types.
//!
//! When the `serde` feature is enabled, rhythm definitions, catalogs,
//! configurations and study strips implement `Serialize` and `Deserialize`,
//! so hosts can ship their own rhythm catalogs as JSON or cache generated
//! strips in binary form.
//!
//! # Supported Formats
//!
//! - **Binary** - Fast binary serialization using bincode (default)
//! - **JSON** - Human-readable JSON format using serde_json
//!
//! # Example
//!
//! ```rust
//! use sinoatrial::prelude::*;
//! use sinoatrial::serialization::{Serializable, SerializableFormat};
//!
//! let catalog = RhythmCatalog::builtin();
//! let json = catalog.to_json().unwrap();
//!
//! // Deserializing re-validates every definition.
//! let restored = RhythmCatalog::from_json(&json).unwrap();
//! assert_eq!(restored.len(), catalog.len());
//!
//! let strip = StudyStrip::generate(restored.get("AFL").unwrap(), 20.0, 0.25, &StudyParams::seeded(2));
//! let bytes = strip.to_bytes(SerializableFormat::Binary).unwrap();
//! assert_eq!(StudyStrip::from_bytes(&bytes, SerializableFormat::Binary).unwrap(), strip);
//! ```

use crate::error::{Result, SinoatrialError};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{de::DeserializeOwned, Serialize};

/// Serialization format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SerializableFormat {
    /// Compact binary encoding.
    #[default]
    Binary,

    /// Human-readable JSON, the format for hand-written rhythm catalogs.
    Json,
}

impl std::fmt::Display for SerializableFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SerializableFormat::Binary => write!(f, "BINARY"),
            SerializableFormat::Json => write!(f, "JSON"),
        }
    }
}

impl std::str::FromStr for SerializableFormat {
    type Err = SinoatrialError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "BINARY" | "BIN" => Ok(SerializableFormat::Binary),
            "JSON" => Ok(SerializableFormat::Json),
            _ => Err(SinoatrialError::UnknownOption {
                option: "format",
                value: s.to_string(),
            }),
        }
    }
}

fn encode_error(format: SerializableFormat, e: impl std::fmt::Display) -> SinoatrialError {
    SinoatrialError::SerializationError {
        message: format!("{} serialization failed: {}", format, e),
    }
}

fn decode_error(format: SerializableFormat, e: impl std::fmt::Display) -> SinoatrialError {
    SinoatrialError::SerializationError {
        message: format!("{} deserialization failed: {}", format, e),
    }
}

/// Trait for types that can be serialized and deserialized.
pub trait Serializable: Serialize + DeserializeOwned + Sized {
    /// Serializes to a byte vector.
    fn to_bytes(&self, format: SerializableFormat) -> Result<Vec<u8>> {
        match format {
            SerializableFormat::Binary => bincode::serialize(self).map_err(|e| encode_error(format, e)),
            SerializableFormat::Json => serde_json::to_vec_pretty(self).map_err(|e| encode_error(format, e)),
        }
    }

    /// Deserializes from a byte slice.
    fn from_bytes(bytes: &[u8], format: SerializableFormat) -> Result<Self> {
        match format {
            SerializableFormat::Binary => bincode::deserialize(bytes).map_err(|e| decode_error(format, e)),
            SerializableFormat::Json => serde_json::from_slice(bytes).map_err(|e| decode_error(format, e)),
        }
    }

    /// Serializes to a JSON string.
    fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| encode_error(SerializableFormat::Json, e))
    }

    /// Deserializes from a JSON string.
    fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| decode_error(SerializableFormat::Json, e))
    }

    /// Serializes to a writer.
    fn save<W: Write>(&self, writer: W, format: SerializableFormat) -> Result<()> {
        let mut writer = BufWriter::new(writer);
        match format {
            SerializableFormat::Binary => {
                bincode::serialize_into(&mut writer, self).map_err(|e| encode_error(format, e))
            }
            SerializableFormat::Json => {
                serde_json::to_writer_pretty(&mut writer, self).map_err(|e| encode_error(format, e))
            }
        }?;
        writer.flush().map_err(|e| SinoatrialError::IoError {
            message: format!("Failed to flush writer: {}", e),
        })
    }

    /// Deserializes from a reader.
    fn load<R: Read>(reader: R, format: SerializableFormat) -> Result<Self> {
        let mut reader = BufReader::new(reader);
        match format {
            SerializableFormat::Binary => {
                bincode::deserialize_from(&mut reader).map_err(|e| decode_error(format, e))
            }
            SerializableFormat::Json => {
                serde_json::from_reader(&mut reader).map_err(|e| decode_error(format, e))
            }
        }
    }

    /// Saves to a file.
    fn save_to_file<P: AsRef<Path>>(&self, path: P, format: SerializableFormat) -> Result<()> {
        let file = File::create(path.as_ref()).map_err(|e| SinoatrialError::IoError {
            message: format!("Failed to create file: {}", e),
        })?;
        self.save(file, format)
    }

    /// Loads from a file.
    fn load_from_file<P: AsRef<Path>>(path: P, format: SerializableFormat) -> Result<Self> {
        let file = File::open(path.as_ref()).map_err(|e| SinoatrialError::IoError {
            message: format!("Failed to open file: {}", e),
        })?;
        Self::load(file, format)
    }

    /// Saves to a file, inferring format from the file extension.
    ///
    /// - `.json` -> JSON format
    /// - All other extensions -> Binary format
    fn save_to_file_auto<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let format = infer_format_from_path(path.as_ref());
        self.save_to_file(path, format)
    }

    /// Loads from a file, inferring format from the file extension.
    fn load_from_file_auto<P: AsRef<Path>>(path: P) -> Result<Self> {
        let format = infer_format_from_path(path.as_ref());
        Self::load_from_file(path, format)
    }
}

/// Blanket implementation for all types that implement Serialize + DeserializeOwned.
impl<T> Serializable for T where T: Serialize + DeserializeOwned + Sized {}

/// Infers serialization format from file extension.
fn infer_format_from_path(path: &Path) -> SerializableFormat {
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => SerializableFormat::Json,
        _ => SerializableFormat::Binary,
    }
}
