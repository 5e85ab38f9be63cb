//! Adjacency-list text ingest.
//!
//! # Format
//!
//! UTF-8 text, one line per package: the package name, then zero or more
//! TAB-separated names of packages that directly depend on it. Empty lines
//! and lines starting with `#` are skipped; trailing `\r` is tolerated.
//! Names seen only as targets are auto-registered. Files ending in `.gz`
//! or `.bz2` are decompressed transparently.
//!
//! Normalization (arc dedup, self-loop removal) is the graph builder's
//! job; this module only tokenizes.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use olivia_graph::{GraphBuilder, PackageGraph};

use crate::error::{Error, Result};

/// Read and parse an adjacency file, decompressing by extension.
///
/// # Errors
///
/// [`Error::Io`] for filesystem problems, [`Error::MalformedInput`] for
/// unparsable content.
pub fn read_file(path: &Path) -> Result<PackageGraph> {
    let file = File::open(path)?;
    let reader: Box<dyn Read> = match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => Box::new(GzDecoder::new(file)),
        Some("bz2") => Box::new(BzDecoder::new(file)),
        _ => Box::new(file),
    };
    let graph = parse(BufReader::new(reader))?;
    tracing::debug!(path = %path.display(), packages = graph.node_count(), "adjacency ingested");
    Ok(graph)
}

/// Parse adjacency lines from any buffered reader.
///
/// # Errors
///
/// [`Error::MalformedInput`] for an empty name field or non-UTF-8 bytes,
/// with the 1-based line number; [`Error::Io`] for read failures.
pub fn parse(reader: impl BufRead) -> Result<PackageGraph> {
    let mut builder = GraphBuilder::new();
    for (index, line) in reader.lines().enumerate() {
        let number = index + 1;
        let line = line.map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                Error::malformed(number, "invalid UTF-8")
            } else {
                Error::Io(e)
            }
        })?;
        let line = line.strip_suffix('\r').unwrap_or(&line);
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split('\t');
        let head = fields.next().unwrap_or_default();
        if head.is_empty() {
            return Err(Error::malformed(number, "empty package name"));
        }
        builder.add_node(head);
        for field in fields {
            if field.is_empty() {
                return Err(Error::malformed(number, "empty dependant name"));
            }
            builder.add_edge(head, field);
        }
    }
    Ok(builder.build())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
