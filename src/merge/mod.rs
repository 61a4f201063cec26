// ABOUTME: Two-pass tenant merge: registry build, transform resolution, row rewriting
// ABOUTME: Holds the naming constants the dump layout is built around

pub mod registry;
pub mod rewrite;
pub mod transform;

pub use registry::{RegistryBuilder, TableKind, Tenant, TenantRegistry};
pub use rewrite::MergeHandler;
pub use transform::ColumnTransform;

/// Table in the root schema listing every tenant with its id and key offset.
pub const TENANT_DIRECTORY_TABLE: &str = "tenants";

/// Column marking a row as belonging to one tenant.
pub const TENANT_COLUMN: &str = "tenant_id";

/// Primary-key column every application table carries.
pub const PRIMARY_KEY_COLUMN: &str = "id";

/// Background-job infrastructure tables, exempt from classification.
pub const QUEUE_TABLE_PREFIX: &str = "que_";

/// Literal null marker in COPY text rows.
pub const NULL_SENTINEL: &str = "\\N";
