use crate::domain::model::ReportArtifact;
use crate::utils::error::Result;
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

/// Packs the given artifacts into an in-memory ZIP archive, one entry per file.
pub fn bundle_reports<'a>(
    artifacts: impl IntoIterator<Item = &'a ReportArtifact>,
) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for artifact in artifacts {
        zip.start_file::<_, ()>(artifact.file_name.as_str(), FileOptions::default())?;
        zip.write_all(&artifact.content)?;
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
