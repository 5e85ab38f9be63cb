//! Serialized model container.
//!
//! # Layout
//!
//! A gzip stream over one contiguous payload:
//!
//! ```text
//! magic "OLV1" | version u8 | N u32 | C u32
//! name table: N × (u32 length, UTF-8 bytes), id order
//! forward CSR: (N+1) u32 offsets, E u32 targets
//! reverse CSR: (N+1) u32 offsets, E u32 targets
//! SCC membership: N u32
//! condensation CSR: (C+1) u32 offsets, u32 targets
//! reverse-topological order: C u32
//! intra-SCC arc counts: C u64
//! cached metrics: u32 count × (tag string, N f64 values in id order)
//! BLAKE3 checksum of everything above (32 bytes)
//! ```
//!
//! All integers are little-endian. On load the checksum is verified before
//! any structural parsing is trusted; any mismatch, truncation, bad magic,
//! or unknown version fails with `CorruptedModel`. The condensation is
//! revalidated against the graph after reassembly, so a payload that
//! passes the checksum but disagrees with itself is still rejected.

#![allow(clippy::cast_possible_truncation)]

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use olivia_graph::store::Csr;
use olivia_graph::{Condensation, GraphError, PackageGraph};

use crate::error::{Error, Result};
use crate::metric::{MetricKind, MetricStats};
use crate::model::Network;

const MAGIC: &[u8; 4] = b"OLV1";
const VERSION: u8 = 1;
const CHECKSUM_LEN: usize = 32;

// ---------------------------------------------------------------------------
// Save
// ---------------------------------------------------------------------------

/// Serialize `net` to `path`.
pub(crate) fn save(net: &Network, path: &Path) -> Result<()> {
    let payload = encode(net)?;
    let checksum = blake3::hash(&payload);

    let mut encoder = GzEncoder::new(File::create(path)?, Compression::default());
    encoder.write_all(&payload)?;
    encoder.write_all(checksum.as_bytes())?;
    encoder.finish()?;
    tracing::debug!(path = %path.display(), bytes = payload.len(), "model saved");
    Ok(())
}

fn encode(net: &Network) -> Result<Vec<u8>> {
    let graph = net.graph();
    let cond = net.condensation();
    let n = graph.node_count();
    let mut out = Vec::new();

    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    put_u32(&mut out, try_u32(n)?);
    put_u32(&mut out, try_u32(cond.scc_count())?);

    for name in graph.names() {
        put_u32(&mut out, try_u32(name.len())?);
        out.extend_from_slice(name.as_bytes());
    }

    put_csr(&mut out, graph.forward_csr());
    put_csr(&mut out, graph.reverse_csr());

    for &s in cond.scc_map() {
        put_u32(&mut out, s);
    }
    put_csr(&mut out, cond.forward_csr());
    for &s in cond.rev_topo() {
        put_u32(&mut out, s);
    }
    for &count in cond.intra_arcs_table() {
        put_u64(&mut out, count);
    }

    let entries = net.metric_cache().entries();
    put_u32(&mut out, try_u32(entries.len())?);
    for (kind, stats) in entries {
        let tag = kind.tag();
        put_u32(&mut out, try_u32(tag.len())?);
        out.extend_from_slice(tag.as_bytes());
        for name in graph.names() {
            let value = stats.get(name).ok_or_else(|| {
                Error::Graph(GraphError::InvariantViolation {
                    detail: format!("cached metric '{tag}' misses package '{name}'"),
                })
            })?;
            put_u64(&mut out, value.to_bits());
        }
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Load
// ---------------------------------------------------------------------------

/// Deserialize a model from `path`.
pub(crate) fn load(path: &Path) -> Result<Network> {
    let mut raw = Vec::new();
    GzDecoder::new(File::open(path)?)
        .read_to_end(&mut raw)
        .map_err(|e| Error::corrupted(format!("gzip stream: {e}")))?;

    if raw.len() < MAGIC.len() + 1 + CHECKSUM_LEN {
        return Err(Error::corrupted("file shorter than header"));
    }
    let (payload, tail) = raw.split_at(raw.len() - CHECKSUM_LEN);
    if blake3::hash(payload).as_bytes() != tail {
        return Err(Error::corrupted("checksum mismatch"));
    }

    let mut r = Reader::new(payload);
    if r.bytes(MAGIC.len())? != MAGIC {
        return Err(Error::corrupted("bad magic"));
    }
    let version = r.u8()?;
    if version != VERSION {
        return Err(Error::corrupted(format!("unknown version {version}")));
    }
    let n = r.u32()? as usize;
    let c = r.u32()? as usize;

    let mut names: Vec<Box<str>> = Vec::with_capacity(n);
    for _ in 0..n {
        let len = r.u32()? as usize;
        let bytes = r.bytes(len)?;
        let name = std::str::from_utf8(bytes)
            .map_err(|_| Error::corrupted("name table is not UTF-8"))?;
        names.push(name.into());
    }

    let fwd = read_csr(&mut r, n)?;
    let rev = read_csr(&mut r, n)?;
    let graph = PackageGraph::from_parts(names, fwd, rev)
        .ok_or_else(|| Error::corrupted("inconsistent graph arrays"))?;

    let mut scc_of = Vec::with_capacity(n);
    for _ in 0..n {
        scc_of.push(r.u32()?);
    }
    let cond_fwd = read_csr(&mut r, c)?;
    let mut rev_topo = Vec::with_capacity(c);
    for _ in 0..c {
        rev_topo.push(r.u32()?);
    }
    let mut intra = Vec::with_capacity(c);
    for _ in 0..c {
        intra.push(r.u64()?);
    }
    let cond = Condensation::from_parts(&graph, scc_of, cond_fwd, rev_topo, intra)
        .map_err(|e| Error::corrupted(format!("condensation: {e}")))?;

    let metric_count = r.u32()? as usize;
    let mut cached: Vec<(MetricKind, Arc<MetricStats>)> = Vec::with_capacity(metric_count);
    for _ in 0..metric_count {
        let len = r.u32()? as usize;
        let tag = std::str::from_utf8(r.bytes(len)?)
            .map_err(|_| Error::corrupted("metric tag is not UTF-8"))?
            .to_owned();
        let mut values = Vec::with_capacity(n);
        for _ in 0..n {
            values.push(f64::from_bits(r.u64()?));
        }
        let stats = MetricStats::from_values(
            graph
                .names()
                .zip(values)
                .map(|(name, value)| (name.to_owned(), value)),
        );
        cached.push((MetricKind::from_tag(&tag), Arc::new(stats)));
    }
    if !r.is_exhausted() {
        return Err(Error::corrupted("trailing bytes after metric section"));
    }

    let net = Network::from_prebuilt(graph, cond);
    for (kind, stats) in cached {
        net.metric_cache().seed(kind, stats);
    }
    tracing::debug!(path = %path.display(), packages = net.size(), "model loaded");
    Ok(net)
}

// ---------------------------------------------------------------------------
// Byte plumbing
// ---------------------------------------------------------------------------

fn try_u32(value: usize) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        Error::Graph(GraphError::InvariantViolation {
            detail: "count exceeds u32 range".to_owned(),
        })
    })
}

fn put_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_u64(out: &mut Vec<u8>, value: u64) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn put_csr(out: &mut Vec<u8>, csr: &Csr) {
    for &offset in csr.offsets() {
        put_u32(out, offset);
    }
    for &target in csr.targets() {
        put_u32(out, target);
    }
}

fn read_csr(r: &mut Reader<'_>, node_count: usize) -> Result<Csr> {
    let mut offsets = Vec::with_capacity(node_count + 1);
    for _ in 0..=node_count {
        offsets.push(r.u32()?);
    }
    let arc_count = offsets.last().copied().unwrap_or(0) as usize;
    let mut targets = Vec::with_capacity(arc_count);
    for _ in 0..arc_count {
        targets.push(r.u32()?);
    }
    Csr::from_parts(node_count, offsets, targets)
        .ok_or_else(|| Error::corrupted("malformed CSR section"))
}

/// Bounds-checked little-endian cursor over the decompressed payload.
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.buf.len())
            .ok_or_else(|| Error::corrupted("truncated payload"))?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.bytes(1)?[0])
    }

    fn u32(&mut self) -> Result<u32> {
        let bytes = self.bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn u64(&mut self) -> Result<u64> {
        let bytes = self.bytes(8)?;
        let mut array = [0u8; 8];
        array.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(array))
    }

    fn is_exhausted(&self) -> bool {
        self.pos == self.buf.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
