//! External tool probing for `--check-tools`.
//!
//! Conversion never calls this: a missing tool only fails the files that
//! need it. The probe exists so users can see up front which formats
//! will work on this machine.

use crate::config::ConversionSettings;
use crate::pipeline::pdf::bind_pdfium;
use serde::Serialize;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

/// Availability of one external dependency.
#[derive(Debug, Clone, Serialize)]
pub struct ToolStatus {
    pub name: &'static str,
    /// What the tool is used for, e.g. `"DOC input"`.
    pub needed_for: &'static str,
    pub available: bool,
    /// Version line when available, otherwise the reason it is not.
    pub detail: String,
}

/// Probe soffice, tesseract and pdfium as configured in `settings`.
pub async fn check_tools(settings: &ConversionSettings) -> Vec<ToolStatus> {
    let soffice = probe_version(&settings.soffice_path).await;
    let tesseract = probe_version(&settings.tesseract_path).await;

    let library = settings.pdfium_library.clone();
    let pdfium = tokio::task::spawn_blocking(move || {
        bind_pdfium(library.as_deref())
            .map(|_| match &library {
                Some(path) => format!("bound {}", path.display()),
                None => "bound system library".to_string(),
            })
            .map_err(|e| e.to_string())
    })
    .await
    .unwrap_or_else(|e| Err(format!("probe panicked: {e}")));

    vec![
        status("pdfium", "PDF input", pdfium),
        status("soffice", "DOC input", soffice),
        status("tesseract", "OCR of scanned PDFs", tesseract),
    ]
}

fn status(name: &'static str, needed_for: &'static str, probe: Result<String, String>) -> ToolStatus {
    let (available, detail) = match probe {
        Ok(detail) => (true, detail),
        Err(detail) => (false, detail),
    };
    ToolStatus {
        name,
        needed_for,
        available,
        detail,
    }
}

/// Run `<binary> --version` and return its first output line.
pub async fn probe_version(binary: &Path) -> Result<String, String> {
    let output = Command::new(binary)
        .arg("--version")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| format!("'{}': {e}", binary.display()))?;

    if !output.status.success() {
        return Err(format!("'{}' exited with {}", binary.display(), output.status));
    }
    // Older tesseract builds print the version on stderr.
    let text = if output.stdout.is_empty() {
        String::from_utf8_lossy(&output.stderr).to_string()
    } else {
        String::from_utf8_lossy(&output.stdout).to_string()
    };
    Ok(text
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("available")
        .to_string())
}
