// ABOUTME: Command implementations for the CLI
// ABOUTME: Exports the merge transformer and the migration generator

pub mod merge;
pub mod migration;

pub use merge::merge;
pub use migration::generate_migration;
