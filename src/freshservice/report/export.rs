//! One asset report run, from ID expansion to the written workbook.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::freshservice::report::error::{ReportError, Result};
use crate::freshservice::report::flatten::{ReportTable, build_table};
use crate::freshservice::report::ids::{self, AssetId};
use crate::freshservice::report::io::excel_write;
use crate::freshservice::report::pipeline::{EnrichmentRequest, Pipeline};
use crate::freshservice::report::source::AssetSource;

/// Extension used for report workbooks.
pub const DEFAULT_EXTENSION: &str = "xlsx";

/// Inputs of one asset report run.
#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// ID list, ranges, or the path of a file holding them.
    pub ids: String,
    /// IDs to leave out, in the same grammar.
    pub exclude: Option<String>,
    pub request: EnrichmentRequest,
    /// Workbook to write; nothing is written when `None`.
    pub output: Option<PathBuf>,
}

/// What a run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOutcome {
    pub asset_ids: Vec<AssetId>,
    /// `None` when no rows were obtained.
    pub table: Option<ReportTable>,
    /// Path of the written workbook, if any.
    pub written: Option<PathBuf>,
}

/// Appends `.xlsx` to paths without an extension and rejects extensions we
/// cannot write.
pub fn resolve_output_path(path: &Path) -> Result<PathBuf> {
    match path.extension().and_then(|ext| ext.to_str()) {
        None => {
            let mut with_extension = path.as_os_str().to_owned();
            with_extension.push(".");
            with_extension.push(DEFAULT_EXTENSION);
            Ok(PathBuf::from(with_extension))
        }
        Some(ext) if ext.eq_ignore_ascii_case(DEFAULT_EXTENSION) => Ok(path.to_path_buf()),
        Some(ext) => Err(ReportError::UnsupportedOutput {
            path: path.to_path_buf(),
            extension: ext.to_string(),
        }),
    }
}

/// Expands the IDs, enriches every asset and writes the workbook when an
/// output path was given.
#[instrument(level = "info", skip_all, fields(ids = %options.ids))]
pub fn run_export<S: AssetSource + ?Sized>(
    source: &S,
    options: &ExportOptions,
) -> Result<ExportOutcome> {
    let output = options
        .output
        .as_deref()
        .map(resolve_output_path)
        .transpose()?;

    let asset_ids = ids::expand(&options.ids, options.exclude.as_deref())?;
    if asset_ids.is_empty() {
        return Err(ReportError::NoValidIds);
    }
    info!(asset_count = asset_ids.len(), "processing assets");

    let rows = Pipeline::new(source, options.request.clone()).run(&asset_ids);
    if rows.is_empty() {
        info!("no rows obtained");
        return Ok(ExportOutcome {
            asset_ids,
            table: None,
            written: None,
        });
    }

    let table = build_table(&rows);
    debug!(
        column_count = table.columns.len(),
        row_count = table.rows.len(),
        "table constructed"
    );

    if let Some(path) = &output {
        excel_write::write_report(path, &table)?;
        info!(path = %path.display(), "report written");
    }

    Ok(ExportOutcome {
        asset_ids,
        table: Some(table),
        written: output,
    })
}
