// ABOUTME: Pass-1 scan: registers tenants and classifies tables as global or tenanted
// ABOUTME: The resulting registry is read-only during the rewriting pass

use crate::dump::copy::{CopyHandler, CopyHeader, LineContext, Section, ROOT_SCHEMA};
use crate::error::MergeError;
use crate::merge::{PRIMARY_KEY_COLUMN, QUEUE_TABLE_PREFIX, TENANT_COLUMN, TENANT_DIRECTORY_TABLE};
use std::collections::BTreeMap;
use std::fmt;

/// One originating schema, with the numeric id its rows are validated
/// against and the offset added to its tenanted keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tenant {
    pub id: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    Global,
    Tenanted,
}

/// Everything pass 1 learns about the dump. Built exactly once.
#[derive(Debug, Default)]
pub struct TenantRegistry {
    tenants: BTreeMap<String, Tenant>,
    global_tables: Vec<String>,
    tenanted_tables: Vec<String>,
}

impl TenantRegistry {
    pub fn tenant(&self, schema: &str) -> Option<&Tenant> {
        self.tenants.get(schema)
    }

    pub fn kind(&self, table: &str) -> Option<TableKind> {
        if self.global_tables.iter().any(|t| t == table) {
            Some(TableKind::Global)
        } else if self.tenanted_tables.iter().any(|t| t == table) {
            Some(TableKind::Tenanted)
        } else {
            None
        }
    }

    pub fn is_tenanted(&self, table: &str) -> bool {
        matches!(self.kind(table), Some(TableKind::Tenanted))
    }

    pub fn is_global(&self, table: &str) -> bool {
        matches!(self.kind(table), Some(TableKind::Global))
    }

    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }
}

impl fmt::Display for TenantRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Tenants:")?;
        for (schema, tenant) in &self.tenants {
            writeln!(f, "  {} (id {}, offset {})", schema, tenant.id, tenant.offset)?;
        }
        writeln!(f, "\nGlobal tables:")?;
        for table in &self.global_tables {
            writeln!(f, "  {table}")?;
        }
        writeln!(f, "\nTenanted tables:")?;
        for table in &self.tenanted_tables {
            writeln!(f, "  {table}")?;
        }
        Ok(())
    }
}

/// Column positions of the tenant directory fields within its COPY header.
#[derive(Debug, Clone, Copy)]
struct DirectoryColumns {
    id: usize,
    schema: usize,
    offset: usize,
}

/// Pass-1 handler. Classifies every root-schema table and reads the tenant
/// directory rows; everything else streams past untouched.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    registry: TenantRegistry,
    directory: Option<DirectoryColumns>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn finish(self) -> TenantRegistry {
        self.registry
    }

    fn classify(&mut self, header: &CopyHeader) {
        let tables = if header.columns.iter().any(|c| c == TENANT_COLUMN) {
            &mut self.registry.tenanted_tables
        } else {
            &mut self.registry.global_tables
        };
        if !tables.iter().any(|t| t == &header.table) {
            tables.push(header.table.clone());
        }
    }
}

fn column_index(header: &CopyHeader, name: &str, ctx: &LineContext) -> Result<usize, MergeError> {
    header
        .columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| MergeError::BadTenantDirectory {
            line: ctx.line,
            column: name.to_string(),
            text: ctx.text.to_string(),
        })
}

fn numeric_field(fields: &[String], idx: usize, column: &str, ctx: &LineContext) -> Result<i64, MergeError> {
    fields[idx]
        .parse()
        .map_err(|_| MergeError::BadTenantDirectory {
            line: ctx.line,
            column: column.to_string(),
            text: ctx.text.to_string(),
        })
}

impl CopyHandler for RegistryBuilder {
    fn begin(&mut self, header: &CopyHeader, ctx: &LineContext) -> Result<Section, MergeError> {
        self.directory = None;

        // Tenant data lives in its own schemas; only the root schema drives
        // classification. Queue tables are infrastructure and stay unclassified.
        if header.schema != ROOT_SCHEMA || header.table.starts_with(QUEUE_TABLE_PREFIX) {
            return Ok(Section::PassThrough);
        }

        if header.table == TENANT_DIRECTORY_TABLE {
            if !self
                .registry
                .global_tables
                .iter()
                .any(|t| t == &header.table)
            {
                self.registry.global_tables.push(header.table.clone());
            }
            self.directory = Some(DirectoryColumns {
                id: column_index(header, PRIMARY_KEY_COLUMN, ctx)?,
                schema: column_index(header, "schema", ctx)?,
                offset: column_index(header, "offset", ctx)?,
            });
            // Rewrite routes the directory rows through `row`; with no output
            // attached in pass 1 nothing is written.
            return Ok(Section::Rewrite);
        }

        self.classify(header);
        Ok(Section::PassThrough)
    }

    fn row(&mut self, fields: &mut [String], ctx: &LineContext) -> Result<(), MergeError> {
        let Some(cols) = self.directory else {
            return Ok(());
        };
        let tenant = Tenant {
            id: numeric_field(fields, cols.id, PRIMARY_KEY_COLUMN, ctx)?,
            offset: numeric_field(fields, cols.offset, "offset", ctx)?,
        };
        self.registry
            .tenants
            .insert(fields[cols.schema].clone(), tenant);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dump::copy;

    const DUMP: &str = "\
COPY public.tenants (id, schema, offset) FROM stdin;\n\
7\ttenant_a\t1000\n\
9\ttenant_b\t2000\n\
\\.\n\
COPY public.posts (id, tenant_id, author_id) FROM stdin;\n\
\\.\n\
COPY public.settings (id, key) FROM stdin;\n\
\\.\n\
COPY public.que_jobs (id, args) FROM stdin;\n\
1\t{}\n\
\\.\n\
COPY tenant_a.posts (id, tenant_id, author_id) FROM stdin;\n\
5\t7\t12\n\
\\.\n";

    fn build(dump: &str) -> TenantRegistry {
        let mut builder = RegistryBuilder::new();
        copy::scan(&mut dump.as_bytes(), None, &mut builder).unwrap();
        builder.finish()
    }

    #[test]
    fn test_registers_tenants_from_directory_rows() {
        let registry = build(DUMP);
        assert_eq!(registry.tenant_count(), 2);
        assert_eq!(
            registry.tenant("tenant_a"),
            Some(&Tenant { id: 7, offset: 1000 })
        );
        assert_eq!(
            registry.tenant("tenant_b"),
            Some(&Tenant { id: 9, offset: 2000 })
        );
        assert_eq!(registry.tenant("public"), None);
    }

    #[test]
    fn test_classifies_root_tables_only() {
        let registry = build(DUMP);
        assert_eq!(registry.kind("tenants"), Some(TableKind::Global));
        assert_eq!(registry.kind("settings"), Some(TableKind::Global));
        assert_eq!(registry.kind("posts"), Some(TableKind::Tenanted));
        // Queue tables never enter the classification.
        assert_eq!(registry.kind("que_jobs"), None);
    }

    #[test]
    fn test_missing_directory_column_is_fatal() {
        let dump = "COPY public.tenants (id, name) FROM stdin;\n\\.\n";
        let mut builder = RegistryBuilder::new();
        let err = copy::scan(&mut dump.as_bytes(), None, &mut builder).unwrap_err();
        assert!(matches!(err, MergeError::BadTenantDirectory { .. }));
    }

    #[test]
    fn test_non_numeric_directory_field_is_fatal() {
        let dump = "COPY public.tenants (id, schema, offset) FROM stdin;\n\
                    x\ttenant_a\t1000\n\\.\n";
        let mut builder = RegistryBuilder::new();
        let err = copy::scan(&mut dump.as_bytes(), None, &mut builder).unwrap_err();
        assert!(matches!(err, MergeError::BadTenantDirectory { line: 2, .. }));
    }

    #[test]
    fn test_repeated_directory_section_is_registered_once() {
        let dump = "\
COPY public.tenants (id, schema, offset) FROM stdin;\n\
7\ttenant_a\t1000\n\
\\.\n\
COPY public.tenants (id, schema, offset) FROM stdin;\n\
9\ttenant_b\t2000\n\
\\.\n";
        let registry = build(dump);
        assert_eq!(registry.tenant_count(), 2);
        assert_eq!(
            registry.to_string().matches("  tenants").count(),
            1,
            "directory table must appear once in the summary"
        );
    }

    #[test]
    fn test_summary_lists_everything() {
        let summary = build(DUMP).to_string();
        assert!(summary.contains("Tenants:"));
        assert!(summary.contains("  tenant_a (id 7, offset 1000)"));
        assert!(summary.contains("Global tables:"));
        assert!(summary.contains("  settings"));
        assert!(summary.contains("Tenanted tables:"));
        assert!(summary.contains("  posts"));
    }
}
