// ABOUTME: Dump file I/O and COPY block scanning
// ABOUTME: Exports the stream wrappers and the section recognizer

pub mod copy;
pub mod stream;

pub use copy::{scan, CopyHandler, CopyHeader, LineContext, Section};
pub use stream::{DumpReader, DumpWriter};
