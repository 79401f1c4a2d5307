use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use crate::application::ports::CountLedgerPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::session::{LedgerRow, SessionToken};

/// Ledger transitorio respaldado por un CSV por sesión
/// (`<dir>/<token>.csv`). Cada registro se añade al final del fichero en
/// modo append real, sin reescribir lo ya anotado; un candado único
/// serializa a los escritores.
pub struct CsvCountLedger {
    dir: PathBuf,
    writer: Mutex<()>,
}

impl CsvCountLedger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            writer: Mutex::new(()),
        }
    }

    fn ledger_path(&self, token: &SessionToken) -> PathBuf {
        self.dir.join(format!("{}.csv", token.as_str()))
    }

    fn lock_writer(&self) -> DomainResult<std::sync::MutexGuard<'_, ()>> {
        self.writer
            .lock()
            .map_err(|_| DomainError::OperationFailed("ledger writer lock poisoned".into()))
    }
}

#[async_trait]
impl CountLedgerPort for CsvCountLedger {
    async fn create(&self, token: &SessionToken) -> DomainResult<()> {
        let _guard = self.lock_writer()?;
        fs::create_dir_all(&self.dir)
            .map_err(|e| DomainError::LedgerCreate(e.to_string()))?;

        let path = self.ledger_path(token);
        let mut writer = csv::Writer::from_path(&path)
            .map_err(|e| DomainError::LedgerCreate(e.to_string()))?;
        // Solo la cabecera del esquema; las filas llegan por appends.
        writer
            .write_record(LedgerRow::FIELDS)
            .and_then(|_| writer.flush().map_err(csv::Error::from))
            .map_err(|e| DomainError::LedgerCreate(e.to_string()))?;

        debug!("Ledger creado en {}", path.display());
        Ok(())
    }

    async fn append(&self, token: &SessionToken, row: LedgerRow) -> DomainResult<()> {
        let _guard = self.lock_writer()?;
        let path = self.ledger_path(token);
        if !path.exists() {
            return Err(DomainError::LedgerNotFound(token.to_string()));
        }

        let file = fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .map_err(|e| DomainError::OperationFailed(format!("ledger append failed: {e}")))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        writer
            .serialize(row)
            .and_then(|_| writer.flush().map_err(csv::Error::from))
            .map_err(|e| DomainError::OperationFailed(format!("ledger append failed: {e}")))?;
        Ok(())
    }

    async fn read_all(&self, token: &SessionToken) -> DomainResult<Vec<LedgerRow>> {
        let path = self.ledger_path(token);
        if !path.exists() {
            return Err(DomainError::LedgerNotFound(token.to_string()));
        }

        let mut reader = csv::Reader::from_path(&path)
            .map_err(|e| DomainError::OperationFailed(format!("ledger read failed: {e}")))?;
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let row: LedgerRow = record
                .map_err(|e| DomainError::OperationFailed(format!("ledger read failed: {e}")))?;
            rows.push(row);
        }
        Ok(rows)
    }

    async fn discard(&self, token: &SessionToken) -> DomainResult<()> {
        let _guard = self.lock_writer()?;
        let path = self.ledger_path(token);
        if !path.exists() {
            return Err(DomainError::LedgerNotFound(token.to_string()));
        }
        fs::remove_file(&path)
            .map_err(|e| DomainError::OperationFailed(format!("ledger discard failed: {e}")))?;
        debug!("Ledger descartado: {}", path.display());
        Ok(())
    }

    async fn clear_all(&self) -> DomainResult<()> {
        let _guard = self.lock_writer()?;
        // En el primer arranque el directorio puede no existir todavía.
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(_) => return Ok(()),
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "csv") {
                fs::remove_file(&path).map_err(|e| {
                    DomainError::OperationFailed(format!("ledger cleanup failed: {e}"))
                })?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::counts::MaturityCounts;
    use tempfile::TempDir;

    fn row(ts: &str, premature: u32, potential: u32, mature: u32) -> LedgerRow {
        LedgerRow::at(
            ts.to_string(),
            &MaturityCounts {
                premature,
                potential,
                mature,
            },
        )
    }

    #[tokio::test]
    async fn create_writes_only_the_header() {
        let tmp = TempDir::new().unwrap();
        let ledger = CsvCountLedger::new(tmp.path());
        let token = SessionToken::from_raw("2025-01-31_10-00-00");

        ledger.create(&token).await.unwrap();

        let contents = fs::read_to_string(tmp.path().join("2025-01-31_10-00-00.csv")).unwrap();
        assert_eq!(
            contents.trim(),
            "Timestamp,Premature,Potential,Mature,Total Coconuts"
        );
    }

    #[tokio::test]
    async fn appended_rows_come_back_in_order() {
        let tmp = TempDir::new().unwrap();
        let ledger = CsvCountLedger::new(tmp.path());
        let token = SessionToken::from_raw("t1");

        ledger.create(&token).await.unwrap();
        ledger
            .append(&token, row("2025-01-31 10:00:01", 1, 0, 0))
            .await
            .unwrap();
        ledger
            .append(&token, row("2025-01-31 10:00:02", 0, 2, 1))
            .await
            .unwrap();

        let rows = ledger.read_all(&token).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].timestamp, "2025-01-31 10:00:01");
        assert_eq!(rows[1].potential, 2);
        assert_eq!(rows[1].total, 3);
    }

    #[tokio::test]
    async fn append_to_a_missing_ledger_fails() {
        let tmp = TempDir::new().unwrap();
        let ledger = CsvCountLedger::new(tmp.path());
        let token = SessionToken::from_raw("nope");

        let err = ledger
            .append(&token, row("2025-01-31 10:00:00", 1, 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::LedgerNotFound(_)));
    }

    #[tokio::test]
    async fn discarded_ledger_cannot_be_read_again() {
        let tmp = TempDir::new().unwrap();
        let ledger = CsvCountLedger::new(tmp.path());
        let token = SessionToken::from_raw("t1");

        ledger.create(&token).await.unwrap();
        ledger.discard(&token).await.unwrap();

        assert!(matches!(
            ledger.read_all(&token).await,
            Err(DomainError::LedgerNotFound(_))
        ));
        assert!(matches!(
            ledger.discard(&token).await,
            Err(DomainError::LedgerNotFound(_))
        ));
    }

    #[tokio::test]
    async fn clear_all_removes_every_leftover_ledger() {
        let tmp = TempDir::new().unwrap();
        let ledger = CsvCountLedger::new(tmp.path());

        ledger
            .create(&SessionToken::from_raw("vieja-1"))
            .await
            .unwrap();
        ledger
            .create(&SessionToken::from_raw("vieja-2"))
            .await
            .unwrap();
        fs::write(tmp.path().join("notas.txt"), "no soy un ledger").unwrap();

        ledger.clear_all().await.unwrap();

        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .flatten()
            .map(|e| e.file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("notas.txt")]);
    }

    #[tokio::test]
    async fn clear_all_on_a_missing_dir_is_a_noop() {
        let tmp = TempDir::new().unwrap();
        let ledger = CsvCountLedger::new(tmp.path().join("todavia-no-existe"));
        ledger.clear_all().await.unwrap();
    }
}
