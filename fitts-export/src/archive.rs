use crate::error::ExportError;
use crate::tables::ResultTables;
use std::io::Write;
use std::path::Path;
use zip::CompressionMethod;
use zip::write::SimpleFileOptions;

/// Entry name suffixes inside the archive, in write order.
pub const ARCHIVE_SUFFIXES: [&str; 3] = ["_click.csv", "_task.csv", "_overall.csv"];

/// Writes the three tables into a zip archive at `path`, naming each entry
/// `<stem><suffix>`.
pub fn write_archive(path: &Path, stem: &str, tables: &ResultTables) -> Result<(), ExportError> {
    let file = fs_err::File::create(path)?;
    let mut zip = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let contents = [&tables.click, &tables.task, &tables.overall];
    for (suffix, body) in ARCHIVE_SUFFIXES.iter().zip(contents) {
        zip.start_file(format!("{stem}{suffix}"), options)?;
        zip.write_all(body.as_bytes())?;
    }

    zip.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::tests::sample_results;
    use std::io::Read;

    #[test]
    fn test_archive_contains_three_tables() {
        let dir = tempfile::tempdir().unwrap();
        let results = sample_results();
        let path = crate::export_results(&results, &dir.path().join("out")).unwrap();

        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "WebFitts_P01_S1_C2_mouse.zip"
        );

        let tables = ResultTables::from_results(&results).unwrap();
        let mut archive = zip::ZipArchive::new(std::fs::File::open(&path).unwrap()).unwrap();
        assert_eq!(archive.len(), 3);

        for (suffix, expected) in ARCHIVE_SUFFIXES
            .iter()
            .zip([&tables.click, &tables.task, &tables.overall])
        {
            let mut entry = archive
                .by_name(&format!("WebFitts_P01_S1_C2_mouse{suffix}"))
                .unwrap();
            let mut body = String::new();
            entry.read_to_string(&mut body).unwrap();
            assert_eq!(&body, expected);
        }
    }
}
