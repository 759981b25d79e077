use std::path::Path;

use anyhow::{Context, Result};
use pgpt_core::{SelectedFile, PDF_MIME_TYPE};

const PDF_MAGIC: &[u8] = b"%PDF-";

pub fn detect_mime(path: &Path, data: &[u8]) -> &'static str {
    let has_pdf_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false);
    if data.starts_with(PDF_MAGIC) || has_pdf_extension {
        PDF_MIME_TYPE
    } else {
        "application/octet-stream"
    }
}

pub async fn read_selected(path: &Path) -> Result<SelectedFile> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let mime_type = detect_mime(path, &data);
    Ok(SelectedFile::new(filename, mime_type, data))
}

pub async fn read_all<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<SelectedFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(read_selected(path.as_ref()).await?);
    }
    Ok(files)
}
