//! Structured diagnostics returned alongside successful results.
//!
//! The core never prints to a user. Every stage reports what it noticed as a
//! list of [`Diagnostic`]s and the caller decides how (or whether) to render
//! them.

use serde::Serialize;
use std::fmt;

use crate::error::LmdError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Severity {
    Info,
    Warning,
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Severity::Info => "INFO",
                Severity::Warning => "WARNING",
                Severity::Fatal => "FATAL",
            }
        )
    }
}

/// Small column-oriented table attached to a diagnostic, e.g. the list of
/// dropped MultiPolygon shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl DiagnosticTable {
    pub fn new(columns: &[&str]) -> Self {
        Self {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub table: Option<DiagnosticTable>,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Info,
            message: message.into(),
            table: None,
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            message: message.into(),
            table: None,
        }
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            message: message.into(),
            table: None,
        }
    }

    pub fn with_table(mut self, table: DiagnosticTable) -> Self {
        self.table = Some(table);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.severity, self.message)?;
        if let Some(table) = &self.table {
            write!(f, "\n{}", table.columns.join("\t"))?;
            for row in &table.rows {
                write!(f, "\n{}", row.join("\t"))?;
            }
        }
        Ok(())
    }
}

impl From<&LmdError> for Diagnostic {
    fn from(err: &LmdError) -> Self {
        let diagnostic = Diagnostic::fatal(err.to_string());
        match err {
            LmdError::CalibrationPointNotFound {
                requested,
                available,
                ..
            } => {
                let mut table = DiagnosticTable::new(&["requested", "found_in_file"]);
                let n = requested.len().max(available.len());
                for i in 0..n {
                    table.push_row(vec![
                        requested.get(i).cloned().unwrap_or_default(),
                        available.get(i).cloned().unwrap_or_default(),
                    ]);
                }
                diagnostic.with_table(table)
            }
            LmdError::MetadataMismatch { missing } => {
                let mut table = DiagnosticTable::new(&["missing_name"]);
                for name in missing {
                    table.push_row(vec![name.clone()]);
                }
                diagnostic.with_table(table)
            }
            _ => diagnostic,
        }
    }
}

/// Convenience queries over a diagnostics list.
pub trait DiagnosticsExt {
    fn has_severity(&self, severity: Severity) -> bool;
    fn warnings(&self) -> Vec<&Diagnostic>;
}

impl DiagnosticsExt for [Diagnostic] {
    fn has_severity(&self, severity: Severity) -> bool {
        self.iter().any(|d| d.severity == severity)
    }

    fn warnings(&self) -> Vec<&Diagnostic> {
        self.iter()
            .filter(|d| d.severity == Severity::Warning)
            .collect()
    }
}
