// ABOUTME: Pass-2 handler: decides each section's fate and rewrites its rows
// ABOUTME: Transforms are resolved on a section's first row and cached

use crate::config::FkRules;
use crate::dump::copy::{CopyHandler, CopyHeader, LineContext, Section, ROOT_SCHEMA};
use crate::error::MergeError;
use crate::merge::registry::{TableKind, Tenant, TenantRegistry};
use crate::merge::transform::{resolve_transforms, ApplyError, ColumnTransform};
use crate::merge::{PRIMARY_KEY_COLUMN, QUEUE_TABLE_PREFIX};
use crate::naming::TableNameResolver;

struct ActiveSection {
    table: String,
    kind: TableKind,
    columns: Vec<String>,
    tenant: Option<Tenant>,
    /// Resolved lazily on the section's first data row.
    transforms: Option<Vec<ColumnTransform>>,
}

/// Pass-2 handler driving the actual rewrite. Owns the warnings accumulated
/// across the run; the orchestrator deduplicates and reports them.
pub struct MergeHandler<'a> {
    registry: &'a TenantRegistry,
    rules: &'a FkRules,
    names: &'a dyn TableNameResolver,
    warnings: Vec<String>,
    active: Option<ActiveSection>,
}

impl<'a> MergeHandler<'a> {
    pub fn new(
        registry: &'a TenantRegistry,
        rules: &'a FkRules,
        names: &'a dyn TableNameResolver,
    ) -> Self {
        Self {
            registry,
            rules,
            names,
            warnings: Vec::new(),
            active: None,
        }
    }

    pub fn into_warnings(self) -> Vec<String> {
        self.warnings
    }
}

impl CopyHandler for MergeHandler<'_> {
    fn begin(&mut self, header: &CopyHeader, ctx: &LineContext) -> Result<Section, MergeError> {
        self.active = None;

        if header.table.starts_with(QUEUE_TABLE_PREFIX) {
            return Ok(Section::PassThrough);
        }

        let tenant = self.registry.tenant(&header.schema).copied();
        if header.schema != ROOT_SCHEMA && tenant.is_none() {
            // Forwarded untransformed, not dropped.
            self.warnings.push(format!(
                "skipping schema {} (no registered tenant)",
                header.schema
            ));
            return Ok(Section::PassThrough);
        }

        let kind = self
            .registry
            .kind(&header.table)
            .ok_or_else(|| MergeError::UnknownTable {
                line: ctx.line,
                table: header.table.clone(),
                text: ctx.text.to_string(),
            })?;

        // Sections without the primary key are framework bookkeeping; they
        // are forwarded as-is.
        if !header.columns.iter().any(|c| c == PRIMARY_KEY_COLUMN) {
            return Ok(Section::PassThrough);
        }

        self.active = Some(ActiveSection {
            table: header.table.clone(),
            kind,
            columns: header.columns.clone(),
            tenant,
            transforms: None,
        });
        Ok(Section::Rewrite)
    }

    fn row(&mut self, fields: &mut [String], ctx: &LineContext) -> Result<(), MergeError> {
        let Self {
            registry,
            rules,
            names,
            warnings,
            active,
        } = self;
        let Some(active) = active.as_mut() else {
            return Ok(());
        };

        if active.transforms.is_none() {
            let resolved = resolve_transforms(
                &active.table,
                active.kind,
                &active.columns,
                active.tenant.as_ref(),
                *registry,
                *rules,
                *names,
                warnings,
            )
            .map_err(|_| MergeError::UngroupedTenantRow {
                line: ctx.line,
                table: active.table.clone(),
                text: ctx.text.to_string(),
            })?;
            active.transforms = Some(resolved);
        }
        let transforms = active.transforms.as_deref().unwrap_or_default();

        for ((field, transform), column) in fields
            .iter_mut()
            .zip(transforms)
            .zip(&active.columns)
        {
            transform.apply(field).map_err(|e| match e {
                ApplyError::NonNumeric { value } => MergeError::NonNumericKey {
                    line: ctx.line,
                    column: column.clone(),
                    value,
                    text: ctx.text.to_string(),
                },
                ApplyError::TenantIdMismatch { expected, found } => MergeError::TenantIdMismatch {
                    line: ctx.line,
                    expected,
                    found,
                    text: ctx.text.to_string(),
                },
            })?;
        }
        Ok(())
    }
}
