// ABOUTME: Per-column transforms resolved once per table and applied per field
// ABOUTME: Tagged variants instead of closures so the policy stays inspectable

use crate::config::FkRules;
use crate::merge::registry::{TableKind, Tenant, TenantRegistry};
use crate::merge::{NULL_SENTINEL, PRIMARY_KEY_COLUMN, TENANT_COLUMN};
use crate::naming::TableNameResolver;

/// What to do with one column's raw text value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnTransform {
    /// Value passes through unchanged.
    Identity,
    /// Value is parsed as an integer and shifted by the tenant offset.
    /// Foreign keys may be null; primary keys may not.
    OffsetNumeric { by: i64, null_passthrough: bool },
    /// Value must equal the active tenant's id.
    ValidateEqualsTenantId { expected: i64 },
    /// Reference could not be classified; warned once, behaves as identity.
    Unresolved,
}

/// Apply-time failures, mapped to fatal errors by the caller which knows the
/// input line.
#[derive(Debug, PartialEq, Eq)]
pub enum ApplyError {
    NonNumeric { value: String },
    TenantIdMismatch { expected: i64, found: String },
}

impl ColumnTransform {
    pub fn apply(&self, value: &mut String) -> Result<(), ApplyError> {
        match self {
            Self::Identity | Self::Unresolved => Ok(()),
            Self::OffsetNumeric { by, null_passthrough } => {
                if *null_passthrough && value == NULL_SENTINEL {
                    return Ok(());
                }
                let key: i64 = value.parse().map_err(|_| ApplyError::NonNumeric {
                    value: value.clone(),
                })?;
                *value = (key + by).to_string();
                Ok(())
            }
            Self::ValidateEqualsTenantId { expected } => {
                if value.parse::<i64>() == Ok(*expected) {
                    Ok(())
                } else {
                    Err(ApplyError::TenantIdMismatch {
                        expected: *expected,
                        found: value.clone(),
                    })
                }
            }
        }
    }
}

/// Resolution failure: tenant-scoped rows found outside any tenant schema.
#[derive(Debug)]
pub struct UngroupedTenantData;

/// Decide the transform for every column of one table. Called on the first
/// data row of a section and cached by the caller for the rest of it.
#[allow(clippy::too_many_arguments)]
pub fn resolve_transforms(
    table: &str,
    kind: TableKind,
    columns: &[String],
    tenant: Option<&Tenant>,
    registry: &TenantRegistry,
    rules: &FkRules,
    names: &dyn TableNameResolver,
    warnings: &mut Vec<String>,
) -> Result<Vec<ColumnTransform>, UngroupedTenantData> {
    let offset = tenant.map_or(0, |t| t.offset);

    columns
        .iter()
        .map(|column| {
            if column == PRIMARY_KEY_COLUMN {
                return match kind {
                    TableKind::Tenanted => {
                        if tenant.is_none() {
                            // Tenanted rows may not appear ungrouped in the
                            // root schema.
                            return Err(UngroupedTenantData);
                        }
                        Ok(ColumnTransform::OffsetNumeric {
                            by: offset,
                            null_passthrough: false,
                        })
                    }
                    TableKind::Global => Ok(ColumnTransform::Identity),
                };
            }

            if column == TENANT_COLUMN {
                if let Some(tenant) = tenant {
                    return Ok(ColumnTransform::ValidateEqualsTenantId {
                        expected: tenant.id,
                    });
                }
                // No active tenant: falls through to the foreign-key rule,
                // which resolves `tenants` and leaves the value alone.
            }

            if let Some(referenced) = names.referenced_table(column) {
                if rules.excludes(column) {
                    return Ok(ColumnTransform::Identity);
                }
                if rules.includes(column) || registry.is_tenanted(&referenced) {
                    return Ok(ColumnTransform::OffsetNumeric {
                        by: offset,
                        null_passthrough: true,
                    });
                }
                if registry.is_global(&referenced) {
                    return Ok(ColumnTransform::Identity);
                }
                warnings.push(format!("unknown reference {table}.{column}"));
                return Ok(ColumnTransform::Unresolved);
            }

            Ok(ColumnTransform::Identity)
        })
        .collect()
}
