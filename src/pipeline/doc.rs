//! Legacy `.doc` reading through a headless LibreOffice conversion.
//!
//! The office suite turns the binary document into DOCX inside a private
//! temporary directory, and the result goes through [`DocxReader`]. Each
//! invocation gets its own `-env:UserInstallation` profile so concurrent
//! workers never fight over the shared profile lock.

use crate::document::ExtractedDocument;
use crate::error::ConversionError;
use crate::pipeline::docx::DocxReader;
use crate::reader::DocumentReader;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, warn};

/// Reader for `.doc` files backed by the `soffice` executable.
#[derive(Debug, Clone)]
pub struct LibreOfficeDocReader {
    soffice: PathBuf,
    docx: DocxReader,
}

impl LibreOfficeDocReader {
    pub fn new(soffice: PathBuf) -> Self {
        Self {
            soffice,
            docx: DocxReader::new(),
        }
    }

    /// Convert `path` to DOCX inside `out_dir`, returning the new file.
    async fn convert_to_docx(&self, path: &Path, out_dir: &Path) -> Result<PathBuf, ConversionError> {
        let profile = out_dir.join("profile");
        let output = Command::new(&self.soffice)
            .arg(format!("-env:UserInstallation=file://{}", profile.display()))
            .args(["--headless", "--norestore", "--convert-to", "docx", "--outdir"])
            .arg(out_dir)
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| missing_or_unknown(&self.soffice, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("soffice exited with {} for {}", output.status, path.display());
            return Err(ConversionError::corrupt(
                path,
                format!("soffice conversion failed ({}): {}", output.status, stderr.trim()),
            ));
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "document".to_string());
        let converted = out_dir.join(format!("{stem}.docx"));
        if !converted.is_file() {
            return Err(ConversionError::corrupt(
                path,
                "soffice reported success but produced no DOCX output",
            ));
        }
        debug!("soffice converted {} → {}", path.display(), converted.display());
        Ok(converted)
    }
}

#[async_trait]
impl DocumentReader for LibreOfficeDocReader {
    fn name(&self) -> &'static str {
        "soffice"
    }

    async fn read(&self, path: &Path) -> Result<ExtractedDocument, ConversionError> {
        let work = TempDir::with_prefix("resume2html-doc")
            .map_err(|e| ConversionError::unknown(format!("cannot create temp dir: {e}")))?;
        let converted = self.convert_to_docx(path, work.path()).await?;
        // Dropping `work` afterwards removes the intermediate file.
        self.docx.read(&converted).await
    }
}

fn missing_or_unknown(binary: &Path, err: std::io::Error) -> ConversionError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ConversionError::ExternalConverterMissing {
            tool: "soffice".to_string(),
            detail: format!(
                "'{}' not found. Install LibreOffice or pass --soffice /path/to/soffice",
                binary.display()
            ),
        }
    } else {
        ConversionError::unknown(format!("failed to run {}: {err}", binary.display()))
    }
}
