//! Input validation: turn a user-supplied path into a checked conversion input.
//!
//! Checks run cheapest first: existence, file type, extension, size, then
//! the first bytes of the file. Signature checks catch renamed files early
//! with a clear `CorruptDocument` instead of an opaque parser error.

use crate::error::ConversionError;
use crate::format::DocumentFormat;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::debug;

const PDF_MAGIC: &[u8] = b"%PDF";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";

/// A local file that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedInput {
    pub path: PathBuf,
    pub format: DocumentFormat,
    /// Size in bytes.
    pub size: u64,
}

/// Validate `path` for conversion.
pub async fn validate(
    path: &Path,
    max_file_size: Option<u64>,
) -> Result<ValidatedInput, ConversionError> {
    let meta = tokio::fs::metadata(path)
        .await
        .map_err(|_| ConversionError::FileNotFound {
            path: path.to_path_buf(),
        })?;
    if !meta.is_file() {
        return Err(ConversionError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let format = DocumentFormat::from_path(path).ok_or_else(|| {
        ConversionError::UnsupportedFormat {
            extension: path
                .extension()
                .map(|e| e.to_string_lossy().to_string())
                .unwrap_or_default(),
        }
    })?;

    let size = meta.len();
    if let Some(limit) = max_file_size {
        if size > limit {
            return Err(ConversionError::FileTooLarge {
                path: path.to_path_buf(),
                size,
                limit,
            });
        }
    }
    if size == 0 {
        return Err(ConversionError::corrupt(path, "file is empty"));
    }

    check_signature(path, format).await?;

    debug!("Validated {} input: {}", format, path.display());
    Ok(ValidatedInput {
        path: path.to_path_buf(),
        format,
        size,
    })
}

async fn check_signature(path: &Path, format: DocumentFormat) -> Result<(), ConversionError> {
    let expected = match format {
        DocumentFormat::Pdf => PDF_MAGIC,
        DocumentFormat::Docx => ZIP_MAGIC,
        // Legacy .doc files are often RTF or HTML in disguise; the office
        // suite sorts those out itself.
        DocumentFormat::Doc => return Ok(()),
    };

    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|_| ConversionError::FileNotFound {
            path: path.to_path_buf(),
        })?;
    let mut magic = [0u8; 4];
    match file.read_exact(&mut magic).await {
        Ok(_) if magic == expected => Ok(()),
        Ok(_) => Err(ConversionError::corrupt(
            path,
            format!("not a {} file (first bytes: {:?})", format, magic),
        )),
        Err(_) => Err(ConversionError::corrupt(path, "file is truncated")),
    }
}
