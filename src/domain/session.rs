use std::collections::VecDeque;
use std::fmt;

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::counts::MaturityCounts;
use super::errors::{DomainError, DomainResult};

/// Formato de los tokens de sesión: hora local con precisión de segundos,
/// seguro como nombre de fichero (sin `:` ni espacios).
pub const TOKEN_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Formato de la marca de tiempo de cada registro del ledger.
pub const ROW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Identificador de una sesión de conteo. El token nace del instante de
/// arranque y hace de nombre de fichero del ledger, así que es opaco
/// una vez creado.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn now() -> Self {
        SessionToken(Local::now().format(TOKEN_FORMAT).to_string())
    }

    /// Reconstruye un token a partir de su forma textual (por ejemplo al
    /// listar ledgers existentes en disco).
    pub fn from_raw(raw: impl Into<String>) -> Self {
        SessionToken(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registro del ledger: un frame procesado produce exactamente una fila.
/// Los renombres serde son las cabeceras del CSV, en este orden.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    #[serde(rename = "Timestamp")]
    pub timestamp: String,
    #[serde(rename = "Premature")]
    pub premature: u32,
    #[serde(rename = "Potential")]
    pub potential: u32,
    #[serde(rename = "Mature")]
    pub mature: u32,
    #[serde(rename = "Total Coconuts")]
    pub total: u32,
}

impl LedgerRow {
    /// Cabeceras del esquema, en el orden de escritura.
    pub const FIELDS: [&'static str; 5] =
        ["Timestamp", "Premature", "Potential", "Mature", "Total Coconuts"];

    pub fn now(counts: &MaturityCounts) -> Self {
        Self::at(
            Local::now().format(ROW_TIMESTAMP_FORMAT).to_string(),
            counts,
        )
    }

    pub fn at(timestamp: String, counts: &MaturityCounts) -> Self {
        LedgerRow {
            timestamp,
            premature: counts.premature,
            potential: counts.potential,
            mature: counts.mature,
            total: counts.total(),
        }
    }

    /// Valores de la fila en el orden de `FIELDS` (lo usa el informe
    /// transpuesto para emitir campo a campo).
    pub fn values(&self) -> [String; 5] {
        [
            self.timestamp.clone(),
            self.premature.to_string(),
            self.potential.to_string(),
            self.mature.to_string(),
            self.total.to_string(),
        ]
    }
}

/// Registro de sesiones pendientes en orden FIFO estricto: la sesión "en
/// curso" es siempre el frente de la cola, los cierres retiran el frente.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    pending: VecDeque<SessionToken>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Encola un token recién arrancado.
    pub fn open(&mut self, token: SessionToken) {
        self.pending.push_back(token);
    }

    /// Frente de la cola sin retirarlo.
    pub fn current(&self) -> DomainResult<SessionToken> {
        self.pending
            .front()
            .cloned()
            .ok_or(DomainError::NoActiveSession)
    }

    /// Retira y devuelve la sesión abierta más antigua.
    pub fn close(&mut self) -> DomainResult<SessionToken> {
        self.pending.pop_front().ok_or(DomainError::NoActiveSession)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
