use serde_json::Value;

use crate::domain::{DomainError, ExtractionReport};

/// Leading columns of every row; record fields follow alphabetically.
const SOURCE_COLUMNS: [&str; 2] = ["file_path", "page"];

/// Writes extracted records as CSV, one row per record, tagged with the
/// document and page they came from.
pub fn extraction_csv(report: &ExtractionReport) -> Result<Vec<u8>, DomainError> {
    let mut fields: Vec<&str> = Vec::new();
    for record in &report.records {
        for key in record.fields.keys().map(String::as_str) {
            if !fields.contains(&key) && !SOURCE_COLUMNS.contains(&key) {
                fields.push(key);
            }
        }
    }
    fields.sort_unstable();

    let mut header: Vec<&str> = SOURCE_COLUMNS.to_vec();
    header.extend(&fields);

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&header).map_err(csv_error)?;

    for record in &report.records {
        let mut row = vec![report.document.clone(), record.page.to_string()];
        row.extend(
            fields
                .iter()
                .map(|field| record.fields.get(*field).map(cell).unwrap_or_default()),
        );
        writer.write_record(&row).map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| DomainError::internal(format!("CSV export failed: {e}")))
}

fn cell(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn csv_error(err: csv::Error) -> DomainError {
    DomainError::internal(format!("CSV export failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ExtractedRecord;
    use serde_json::json;

    fn record(page: usize, fields: Value) -> ExtractedRecord {
        ExtractedRecord {
            page,
            fields: fields.as_object().unwrap().clone(),
        }
    }

    fn report(records: Vec<ExtractedRecord>) -> ExtractionReport {
        ExtractionReport {
            document: "minutes.pdf".to_string(),
            pages_total: 2,
            pages_succeeded: 2,
            records,
            warnings: Vec::new(),
            completed_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn test_rows_carry_source_columns() {
        let report = report(vec![
            record(1, json!({"number": "12", "description": "Budget, second revision"})),
            record(2, json!({"number": "13", "amount": 4500})),
        ]);

        let csv = String::from_utf8(extraction_csv(&report).unwrap()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines[0], "file_path,page,amount,description,number");
        assert_eq!(lines[1], "minutes.pdf,1,,\"Budget, second revision\",12");
        assert_eq!(lines[2], "minutes.pdf,2,4500,,13");
    }

    #[test]
    fn test_record_cannot_shadow_source_columns() {
        let report = report(vec![record(3, json!({"page": "iv", "title": "Annex"}))]);

        let csv = String::from_utf8(extraction_csv(&report).unwrap()).unwrap();
        assert_eq!(csv, "file_path,page,title\nminutes.pdf,3,Annex\n");
    }

    #[test]
    fn test_no_records_gives_header_only() {
        let csv = String::from_utf8(extraction_csv(&report(Vec::new())).unwrap()).unwrap();
        assert_eq!(csv, "file_path,page\n");
    }
}
