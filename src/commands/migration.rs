// ABOUTME: Generates the ActiveRecord migration that adds tenant_id everywhere
// ABOUTME: Reads the apartment initializer and schema.rb from a Rails app dir

use crate::merge::QUEUE_TABLE_PREFIX;
use crate::naming::tableize;
use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

static CREATE_TABLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"create_table "(?P<table>[^"]*)""#).expect("create_table regex"));

static UNIQUE_INDEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"t\.index (?P<cols>\[.*\]), name: "(?P<name>[^"]*)", unique: true(?P<rest>.*)$"#)
        .expect("unique index regex")
});

/// Read the Rails app layout and print the migration to stdout.
///
/// The excluded-model list here must stay consistent with the merge's Global
/// classification for the combined operation to be correct.
pub fn generate_migration(app_dir: &Path) -> Result<()> {
    let initializer_path = app_dir.join("config/initializers/apartment.rb");
    let initializer = std::fs::read_to_string(&initializer_path)
        .with_context(|| format!("Failed to read {}", initializer_path.display()))?;

    let schema_path = app_dir.join("db/schema.rb");
    if !schema_path.is_file() {
        println!("Missing schema, run  bundle exec rake db:fix_structure");
        return Ok(());
    }
    let schema = std::fs::read_to_string(&schema_path)
        .with_context(|| format!("Failed to read {}", schema_path.display()))?;

    print!("{}", render_migration(&initializer, &schema)?);
    Ok(())
}

/// Tables excluded from tenancy: the model names listed between the
/// `config.excluded_models` line and its closing brace, tableized.
pub fn excluded_tables(initializer: &str) -> Vec<String> {
    let mut tables = Vec::new();
    let mut inside = false;
    for line in initializer.lines() {
        if !inside {
            inside = line.contains("config.excluded_models");
            continue;
        }
        if line.contains('}') || line.contains(']') {
            break;
        }
        let model = line
            .trim()
            .trim_matches(|c| c == '"' || c == '\'' || c == ',');
        if !model.is_empty() {
            tables.push(tableize(model));
        }
    }
    tables
}

const MIGRATION_HEADER: &str = r#"class AddTenantId < ActiveRecord::Migration[7.0]
  def change
    tenant_id = TenantMigrationSupport::current_apartment_tenant&.id

    opts = {
      foreign_key: { to_table: "public.tenants", on_delete: :cascade },
      default: tenant_id,
      null: tenant_id.nil?,
    }

"#;

fn wants_tenant_column(table: &str, global_tables: &[String]) -> bool {
    !table.is_empty()
        && !table.starts_with(QUEUE_TABLE_PREFIX)
        && !global_tables.iter().any(|t| t == table)
}

pub fn render_migration(initializer: &str, schema: &str) -> Result<String> {
    let global_tables = excluded_tables(initializer);

    let mut out = String::from(MIGRATION_HEADER);

    let mut table = String::new();
    for line in schema.lines() {
        if let Some(caps) = CREATE_TABLE.captures(line) {
            table = caps["table"].to_string();
            if wants_tenant_column(&table, &global_tables) {
                out.push_str(&format!(
                    "\n    # {table}\n    add_column :{table}, :tenant_id, :bigint, **opts\n    add_index :{table}, :tenant_id\n"
                ));
            }
        } else if line.contains("t.index")
            && line.contains("unique: true")
            && wants_tenant_column(&table, &global_tables)
        {
            // Unique indexes must be rebuilt to include the tenant column.
            let caps = UNIQUE_INDEX
                .captures(line)
                .ok_or_else(|| anyhow!("invalid unique index line: {line}"))?;
            let (cols, name, rest) = (&caps["cols"], &caps["name"], &caps["rest"]);
            out.push_str(&format!(
                "    remove_index :{table}, column: {cols}, name: :{name}, unique: true{rest}\n    add_index :{table}, {cols}, name: :{name}, unique: true{rest}\n"
            ));
        }
    }

    out.push_str("  end\nend\n");
    Ok(out)
}
