// ABOUTME: Library module for postgres-tenant-merger
// ABOUTME: Exports all core functionality for use in binary and tests

pub mod commands;
pub mod config;
pub mod dump;
pub mod error;
pub mod merge;
pub mod naming;
