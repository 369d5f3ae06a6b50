use crate::error::ExportError;
use fitts_core::{CLICK_HEADER, OVERALL_HEADER, StudyResults, TASK_HEADER};

/// The three result tables rendered as comma separated text, each starting
/// with its header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultTables {
    pub click: String,
    pub task: String,
    pub overall: String,
}

impl ResultTables {
    pub fn from_results(results: &StudyResults) -> Result<Self, ExportError> {
        Ok(Self {
            click: render(&CLICK_HEADER, results.clicks.iter().map(|c| c.to_row()))?,
            task: render(&TASK_HEADER, results.tasks.iter().map(|t| t.to_row()))?,
            overall: render(&OVERALL_HEADER, std::iter::once(results.overall.to_row()))?,
        })
    }
}

fn render<I>(header: &[&str], rows: I) -> Result<String, ExportError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(header)?;
    for row in rows {
        debug_assert_eq!(row.len(), header.len());
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
