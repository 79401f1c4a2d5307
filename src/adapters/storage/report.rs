use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::info;

use crate::application::ports::ReportSinkPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::session::{LedgerRow, SessionToken};

/// Exporta informes transpuestos a CSV: el ledger se gira para que cada
/// registro sea una columna `Entry N` y cada campo del esquema una fila.
/// La altura del informe es fija (cinco campos), venga lo que venga.
pub struct CsvReportSink {
    dir: PathBuf,
}

impl CsvReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ReportSinkPort for CsvReportSink {
    async fn write_report(
        &self,
        start: &SessionToken,
        end: &SessionToken,
        rows: &[LedgerRow],
    ) -> DomainResult<String> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| DomainError::OperationFailed(format!("report dir failed: {e}")))?;

        let filename = format!("{}_{}.csv", start.as_str(), end.as_str());
        let path = self.dir.join(&filename);
        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| DomainError::OperationFailed(format!("report write failed: {e}")))?;

        let mut header = vec!["Field".to_string()];
        header.extend((1..=rows.len()).map(|i| format!("Entry {i}")));
        writer
            .write_record(&header)
            .map_err(|e| DomainError::OperationFailed(format!("report write failed: {e}")))?;

        // Una columna por registro: con cero registros quedan las cinco
        // filas de campos a solas, que sigue siendo un informe válido.
        let columns: Vec<[String; 5]> = rows.iter().map(LedgerRow::values).collect();
        for (i, field) in LedgerRow::FIELDS.iter().enumerate() {
            let mut record = vec![field.to_string()];
            record.extend(columns.iter().map(|col| col[i].clone()));
            writer
                .write_record(&record)
                .map_err(|e| DomainError::OperationFailed(format!("report write failed: {e}")))?;
        }
        writer
            .flush()
            .map_err(|e| DomainError::OperationFailed(format!("report write failed: {e}")))?;

        info!("Informe escrito en {}", path.display());
        Ok(filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::counts::MaturityCounts;
    use tempfile::TempDir;

    fn rows() -> Vec<LedgerRow> {
        [(1u32, 0u32, 0u32), (0, 2, 0), (1, 1, 3)]
            .into_iter()
            .enumerate()
            .map(|(i, (premature, potential, mature))| {
                LedgerRow::at(
                    format!("2025-01-31 10:00:0{i}"),
                    &MaturityCounts {
                        premature,
                        potential,
                        mature,
                    },
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn report_is_transposed_with_one_column_per_entry() {
        let tmp = TempDir::new().unwrap();
        let sink = CsvReportSink::new(tmp.path());
        let start = SessionToken::from_raw("2025-01-31_10-00-00");
        let end = SessionToken::from_raw("2025-01-31_10-05-00");

        let filename = sink.write_report(&start, &end, &rows()).await.unwrap();
        assert_eq!(filename, "2025-01-31_10-00-00_2025-01-31_10-05-00.csv");

        let contents = fs::read_to_string(tmp.path().join(&filename)).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "Field,Entry 1,Entry 2,Entry 3");
        assert_eq!(
            lines[1],
            "Timestamp,2025-01-31 10:00:00,2025-01-31 10:00:01,2025-01-31 10:00:02"
        );
        assert_eq!(lines[2], "Premature,1,0,1");
        assert_eq!(lines[3], "Potential,0,2,1");
        assert_eq!(lines[4], "Mature,0,0,3");
        assert_eq!(lines[5], "Total Coconuts,1,2,5");
    }

    #[tokio::test]
    async fn empty_session_still_produces_a_report() {
        let tmp = TempDir::new().unwrap();
        let sink = CsvReportSink::new(tmp.path());
        let start = SessionToken::from_raw("a");
        let end = SessionToken::from_raw("b");

        let filename = sink.write_report(&start, &end, &[]).await.unwrap();
        let contents = fs::read_to_string(tmp.path().join(&filename)).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], "Field");
        assert_eq!(lines[5], "Total Coconuts");
    }
}
