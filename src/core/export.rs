use crate::core::record::VideoRecord;
use crate::error::Result;
use rust_xlsxwriter::{Format, Workbook};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const DEFAULT_OUTPUT_FILE: &str = "playlist_summary_structured.xlsx";
const INDEX_HEADER: &str = "Index";
const MAX_COLUMN_WIDTH: f64 = 60.0;

/// Rectangular view of a set of variable-width records.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Unions every record's field names in first-appearance order, then lays each
/// record out against that header with a leading 1-based index. Fields a
/// record lacks become empty cells.
pub fn flatten<'a>(records: impl IntoIterator<Item = &'a VideoRecord>) -> Table {
    let record_fields: Vec<Vec<(String, String)>> =
        records.into_iter().map(VideoRecord::fields).collect();

    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for fields in &record_fields {
        for (name, _) in fields {
            if !positions.contains_key(name) {
                positions.insert(name.clone(), columns.len());
                columns.push(name.clone());
            }
        }
    }

    let rows = record_fields
        .into_iter()
        .enumerate()
        .map(|(idx, fields)| {
            let mut row = vec![String::new(); columns.len() + 1];
            row[0] = (idx + 1).to_string();
            for (name, value) in fields {
                row[positions[&name] + 1] = value;
            }
            row
        })
        .collect();

    let mut headers = Vec::with_capacity(columns.len() + 1);
    headers.push(INDEX_HEADER.to_string());
    headers.extend(columns);

    Table { headers, rows }
}

/// Writes the records to an xlsx workbook, one row per record.
#[tracing::instrument(skip(records))]
pub fn write_xlsx(records: &[&VideoRecord], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let table = flatten(records.iter().copied());

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let header_format = Format::new().set_bold();

    for (col, header) in table.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let sheet_row = row_idx as u32 + 1;
        worksheet.write_number(sheet_row, 0, (row_idx + 1) as f64)?;
        for (col, value) in row.iter().enumerate().skip(1) {
            if !value.is_empty() {
                worksheet.write_string(sheet_row, col as u16, value)?;
            }
        }
    }

    for col in 1..table.headers.len() {
        let widest = std::iter::once(&table.headers[col])
            .chain(table.rows.iter().map(|row| &row[col]))
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0);
        worksheet.set_column_width(col as u16, (widest as f64 + 2.0).min(MAX_COLUMN_WIDTH))?;
    }

    workbook.save(path)?;
    tracing::info!(rows = table.rows.len(), columns = table.headers.len(), "Exported workbook");

    Ok(())
}

/// Empty input falls back to the default file name; `.xlsx` is appended when missing.
pub fn normalize_output_path(raw: &str) -> PathBuf {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return PathBuf::from(DEFAULT_OUTPUT_FILE);
    }
    if trimmed.to_ascii_lowercase().ends_with(".xlsx") {
        PathBuf::from(trimmed)
    } else {
        PathBuf::from(format!("{trimmed}.xlsx"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::keypoints::KeyPoint;

    fn record(url: &str, points: usize) -> VideoRecord {
        let key_points = (1..=points)
            .map(|i| KeyPoint::new(format!("T{i}"), format!("S{i}")))
            .collect();
        VideoRecord::build(key_points, &format!("title {url}"), url, " raw ")
    }

    #[test]
    fn headers_are_union_of_all_rows() {
        let records = [record("u1", 1), record("u2", 3), record("u3", 0)];
        let table = flatten(&records);

        assert_eq!(
            table.headers,
            vec![
                "Index",
                "Video URL",
                "Title",
                "Complete",
                "KeyPoint 1 - Title",
                "KeyPoint 1 - Summary",
                "KeyPoint 2 - Title",
                "KeyPoint 2 - Summary",
                "KeyPoint 3 - Title",
                "KeyPoint 3 - Summary",
            ]
        );
        assert_eq!(table.rows.len(), 3);
        assert!(table.rows.iter().all(|row| row.len() == table.headers.len()));
    }

    #[test]
    fn rows_are_indexed_from_one_and_padded() {
        let records = [record("u1", 1), record("u2", 2)];
        let table = flatten(&records);

        assert_eq!(table.rows[0][0], "1");
        assert_eq!(table.rows[1][0], "2");
        assert_eq!(table.rows[0][1], "u1");
        assert_eq!(table.rows[0][3], "raw");
        assert_eq!(table.rows[0][4], "T1");
        assert_eq!(table.rows[0][6], "");
        assert_eq!(table.rows[1][7], "S2");
    }

    #[test]
    fn empty_input_has_index_header_only() {
        let table = flatten(std::iter::empty());
        assert_eq!(table.headers, vec!["Index"]);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn writes_workbook_to_disk() {
        let dir = std::env::temp_dir().join(format!("plotline-export-{}", std::process::id()));
        let path = dir.join("nested").join("out.xlsx");
        let records = [record("u1", 2)];
        let refs: Vec<&VideoRecord> = records.iter().collect();

        write_xlsx(&refs, &path).expect("export succeeds");
        let metadata = std::fs::metadata(&path).expect("file exists");
        assert!(metadata.len() > 0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn normalizes_output_path() {
        assert_eq!(normalize_output_path("  "), PathBuf::from(DEFAULT_OUTPUT_FILE));
        assert_eq!(normalize_output_path("out"), PathBuf::from("out.xlsx"));
        assert_eq!(normalize_output_path("out.XLSX"), PathBuf::from("out.XLSX"));
        assert_eq!(normalize_output_path("dir/out.xlsx"), PathBuf::from("dir/out.xlsx"));
    }
}
