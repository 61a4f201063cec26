// ABOUTME: Recognizes COPY bulk-data sections in a streaming dump
// ABOUTME: Routes section headers and rows through a caller-supplied handler

use crate::error::MergeError;
use once_cell::sync::Lazy;
use regex::Regex;
use std::io::{BufRead, Write};

/// Literal end-of-section marker emitted by pg_dump.
pub const TERMINATOR: &str = "\\.";

/// Schema every section is merged into.
pub const ROOT_SCHEMA: &str = "public";

static COPY_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^COPY (?:"?(?P<schema>[^".]*)"?\.)?"?(?P<table>[^".]*)"? \((?P<cols>.*)\) FROM stdin;$"#)
        .expect("COPY header regex")
});

/// Parsed `COPY [<schema>.]<table> (<cols>) FROM stdin;` header.
#[derive(Debug, Clone)]
pub struct CopyHeader {
    pub schema: String,
    pub table: String,
    /// Column names with surrounding quotes stripped, in dump order.
    pub columns: Vec<String>,
    /// Column list exactly as written in the header, for re-emission.
    raw_columns: String,
}

impl CopyHeader {
    /// Parse a header line. An unqualified table belongs to the root schema.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = COPY_HEADER.captures(line)?;
        let raw_columns = caps["cols"].to_string();
        let columns = raw_columns
            .split(',')
            .map(|c| c.trim().trim_matches('"').to_string())
            .collect();
        Some(Self {
            schema: caps
                .name("schema")
                .map_or_else(|| ROOT_SCHEMA.to_string(), |m| m.as_str().to_string()),
            table: caps["table"].to_string(),
            columns,
            raw_columns,
        })
    }

    /// The header re-qualified into the root schema.
    pub fn rewrite_root(&self) -> String {
        format!(
            "COPY {}.{} ({}) FROM stdin;",
            ROOT_SCHEMA, self.table, self.raw_columns
        )
    }
}

/// Position of the line currently being processed, for error reporting.
#[derive(Debug)]
pub struct LineContext<'a> {
    /// 1-based input line number.
    pub line: u64,
    pub text: &'a str,
}

/// What to do with a recognized section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Header and every row are written out byte-for-byte.
    PassThrough,
    /// Header is rewritten to the root schema; rows are split on tabs and
    /// routed through [`CopyHandler::row`].
    Rewrite,
}

/// Callback seam for both passes of the merge.
pub trait CopyHandler {
    /// Called once per recognized section header.
    fn begin(&mut self, header: &CopyHeader, ctx: &LineContext) -> Result<Section, MergeError>;

    /// Called for each data row of a [`Section::Rewrite`] section. Fields may
    /// be rewritten in place; they are re-joined with tabs afterwards.
    fn row(&mut self, fields: &mut [String], ctx: &LineContext) -> Result<(), MergeError>;
}

fn emit(output: &mut Option<&mut dyn Write>, line: &str) -> Result<(), MergeError> {
    if let Some(out) = output.as_deref_mut() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn next_line<R: BufRead>(input: &mut R, buf: &mut String) -> Result<bool, MergeError> {
    buf.clear();
    if input.read_line(buf)? == 0 {
        return Ok(false);
    }
    if buf.ends_with('\n') {
        buf.pop();
    }
    Ok(true)
}

/// Stream the dump line by line, delegating COPY sections to `handler`.
///
/// With `output` set to `None` the scan only drives the handler (pass 1).
/// Lines outside recognized sections pass through unchanged; a line starting
/// with `COPY` that does not match the header grammar is fatal.
pub fn scan<R: BufRead, H: CopyHandler>(
    input: &mut R,
    mut output: Option<&mut dyn Write>,
    handler: &mut H,
) -> Result<(), MergeError> {
    let mut line = String::new();
    let mut line_no: u64 = 0;

    while next_line(input, &mut line)? {
        line_no += 1;

        if !line.starts_with("COPY") {
            emit(&mut output, &line)?;
            continue;
        }

        let header = CopyHeader::parse(&line).ok_or_else(|| MergeError::BadCopyHeader {
            line: line_no,
            text: line.clone(),
        })?;
        let ctx = LineContext {
            line: line_no,
            text: &line,
        };
        let section = handler.begin(&header, &ctx)?;

        match section {
            Section::PassThrough => emit(&mut output, &line)?,
            Section::Rewrite => emit(&mut output, &header.rewrite_root())?,
        }

        loop {
            if !next_line(input, &mut line)? {
                return Err(MergeError::UnterminatedCopy {
                    table: header.table.clone(),
                });
            }
            line_no += 1;

            if line == TERMINATOR {
                emit(&mut output, &line)?;
                break;
            }

            match section {
                Section::PassThrough => emit(&mut output, &line)?,
                Section::Rewrite => {
                    // Trailing empty fields must survive the split.
                    let mut fields: Vec<String> =
                        line.split('\t').map(str::to_string).collect();
                    if fields.len() < header.columns.len() {
                        return Err(MergeError::ShortRow {
                            line: line_no,
                            table: header.table.clone(),
                            expected: header.columns.len(),
                            found: fields.len(),
                            text: line.clone(),
                        });
                    }
                    handler.row(
                        &mut fields,
                        &LineContext {
                            line: line_no,
                            text: &line,
                        },
                    )?;
                    emit(&mut output, &fields.join("\t"))?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Recorder {
        sections: Vec<(String, String, Vec<String>)>,
        rows: Vec<Vec<String>>,
        rewrite: bool,
    }

    impl Recorder {
        fn new(rewrite: bool) -> Self {
            Self {
                sections: Vec::new(),
                rows: Vec::new(),
                rewrite,
            }
        }
    }

    impl CopyHandler for Recorder {
        fn begin(&mut self, header: &CopyHeader, _ctx: &LineContext) -> Result<Section, MergeError> {
            self.sections.push((
                header.schema.clone(),
                header.table.clone(),
                header.columns.clone(),
            ));
            Ok(if self.rewrite {
                Section::Rewrite
            } else {
                Section::PassThrough
            })
        }

        fn row(&mut self, fields: &mut [String], _ctx: &LineContext) -> Result<(), MergeError> {
            self.rows.push(fields.to_vec());
            Ok(())
        }
    }

    #[test]
    fn test_parse_header_variants() {
        let h = CopyHeader::parse("COPY tenant_a.posts (id, tenant_id, author_id) FROM stdin;")
            .unwrap();
        assert_eq!(h.schema, "tenant_a");
        assert_eq!(h.table, "posts");
        assert_eq!(h.columns, vec!["id", "tenant_id", "author_id"]);

        let h = CopyHeader::parse(r#"COPY "public"."users" (id, "name") FROM stdin;"#).unwrap();
        assert_eq!(h.schema, "public");
        assert_eq!(h.table, "users");
        assert_eq!(h.columns, vec!["id", "name"]);
        assert_eq!(h.rewrite_root(), r#"COPY public.users (id, "name") FROM stdin;"#);

        let h = CopyHeader::parse("COPY widgets (id) FROM stdin;").unwrap();
        assert_eq!(h.schema, "public");
        assert_eq!(h.table, "widgets");

        assert!(CopyHeader::parse("COPY oops FROM stdin;").is_none());
    }

    #[test]
    fn test_passthrough_is_byte_identical() {
        let dump = "SET search_path = public;\n\
                    COPY public.users (id, name) FROM stdin;\n\
                    1\talice\n\
                    2\tbob\n\
                    \\.\n\
                    -- trailing comment\n";
        let mut out = Vec::new();
        let mut handler = Recorder::new(false);
        scan(&mut dump.as_bytes(), Some(&mut out), &mut handler).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), dump);
        assert_eq!(handler.sections.len(), 1);
        assert!(handler.rows.is_empty());
    }

    #[test]
    fn test_rewrite_routes_rows_and_preserves_trailing_empties() {
        let dump = "COPY tenant_a.things (id, note, extra) FROM stdin;\n\
                    1\t\t\n\
                    \\.\n";
        let mut out = Vec::new();
        let mut handler = Recorder::new(true);
        scan(&mut dump.as_bytes(), Some(&mut out), &mut handler).unwrap();

        assert_eq!(handler.rows, vec![vec!["1", "", ""]]);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "COPY public.things (id, note, extra) FROM stdin;\n1\t\t\n\\.\n"
        );
    }

    #[test]
    fn test_short_row_is_fatal_with_line_number() {
        let dump = "COPY a.t (id, b, c) FROM stdin;\n1\t2\n\\.\n";
        let mut handler = Recorder::new(true);
        let err = scan(&mut dump.as_bytes(), None, &mut handler).unwrap_err();
        match err {
            MergeError::ShortRow { line, expected, found, .. } => {
                assert_eq!(line, 2);
                assert_eq!(expected, 3);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_malformed_copy_header_is_fatal() {
        let dump = "COPY garbage\n";
        let mut handler = Recorder::new(false);
        let err = scan(&mut dump.as_bytes(), None, &mut handler).unwrap_err();
        assert!(matches!(err, MergeError::BadCopyHeader { line: 1, .. }));
    }

    #[test]
    fn test_unterminated_section_is_fatal() {
        let dump = "COPY a.t (id) FROM stdin;\n1\n";
        let mut handler = Recorder::new(false);
        let err = scan(&mut dump.as_bytes(), None, &mut handler).unwrap_err();
        assert!(matches!(err, MergeError::UnterminatedCopy { .. }));
    }
}
