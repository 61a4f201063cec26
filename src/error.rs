// ABOUTME: Fatal error type for the dump transformation pipeline
// ABOUTME: Every parse/validation failure carries the 1-based input line and raw text

use thiserror::Error;

/// Errors that abort the merge. Anything recoverable is a warning instead
/// (see `merge::rewrite`); once one of these is raised the output file must
/// be considered unusable.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("line {line}: cannot parse COPY header: {text}")]
    BadCopyHeader { line: u64, text: String },

    #[error("line {line}: row has {found} fields but {table} has {expected} columns: {text}")]
    ShortRow {
        line: u64,
        table: String,
        expected: usize,
        found: usize,
        text: String,
    },

    #[error("line {line}: unknown table {table}: {text}")]
    UnknownTable { line: u64, table: String, text: String },

    #[error("line {line}: tenanted table {table} has rows in the public schema: {text}")]
    UngroupedTenantRow { line: u64, table: String, text: String },

    #[error("line {line}: tenant_id {found} does not match tenant id {expected}: {text}")]
    TenantIdMismatch {
        line: u64,
        expected: i64,
        found: String,
        text: String,
    },

    #[error("line {line}: expected numeric key in column {column}, found {value:?}: {text}")]
    NonNumericKey {
        line: u64,
        column: String,
        value: String,
        text: String,
    },

    #[error("line {line}: tenant directory table is missing or malformed in column {column}: {text}")]
    BadTenantDirectory { line: u64, column: String, text: String },

    #[error("input ended inside the COPY section for table {table}")]
    UnterminatedCopy { table: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
