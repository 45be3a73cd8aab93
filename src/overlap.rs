//! Local alignment between contig sequences.
//!
//! The aligner is used as a black box: build an index over one or more
//! reference sequences, then map a query against it and read back PAF-like
//! candidates. The bundled backend drives the `minimap2` executable; every
//! index lives in its own temporary directory so concurrent callers never
//! share files.

use crate::scaffold::Strand;
use crate::sequence_index::reverse_complement;
use log::debug;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// One local alignment of a query against an indexed reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentCandidate {
    pub query_len: usize,
    pub query_start: usize,
    pub query_end: usize,
    pub strand: Strand,
    pub target_name: String,
    pub target_len: usize,
    pub target_start: usize,
    pub target_end: usize,
    /// Number of matching bases.
    pub matches: usize,
    pub block_len: usize,
    /// Base-level alignment from the `cg:Z` tag, empty when the backend gives none.
    /// For reverse-strand hits it describes the reverse complement of the query.
    pub cigar: Vec<CigarOp>,
}

/// One run of a CIGAR string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub len: usize,
    /// One of `=`, `X`, `M`, `I` or `D`.
    pub op: u8,
}

impl CigarOp {
    pub fn new(len: usize, op: u8) -> Self {
        CigarOp { len, op }
    }

    /// Bases consumed on the target (reference).
    pub fn target_delta(&self) -> usize {
        match self.op {
            b'=' | b'X' | b'M' | b'D' => self.len,
            _ => 0,
        }
    }

    /// Bases consumed on the query.
    pub fn query_delta(&self) -> usize {
        match self.op {
            b'=' | b'X' | b'M' | b'I' => self.len,
            _ => 0,
        }
    }
}

/// Parse a CIGAR string made of `=`, `X`, `M`, `I` and `D` runs.
pub fn parse_cigar(cigar: &str) -> io::Result<Vec<CigarOp>> {
    let invalid = |msg: String| io::Error::new(io::ErrorKind::InvalidData, msg);
    let mut ops = Vec::new();
    let mut len: Option<usize> = None;

    for c in cigar.bytes() {
        if c.is_ascii_digit() {
            let digit = (c - b'0') as usize;
            len = Some(
                len.unwrap_or(0)
                    .checked_mul(10)
                    .and_then(|l| l.checked_add(digit))
                    .ok_or_else(|| invalid(format!("CIGAR run too long in '{cigar}'")))?,
            );
            continue;
        }
        if !matches!(c, b'=' | b'X' | b'M' | b'I' | b'D') {
            return Err(invalid(format!(
                "Unsupported CIGAR operation '{}' in '{cigar}'",
                c as char
            )));
        }
        let run = len
            .take()
            .ok_or_else(|| invalid(format!("CIGAR operation without length in '{cigar}'")))?;
        ops.push(CigarOp::new(run, c));
    }

    if len.is_some() {
        return Err(invalid(format!("CIGAR ends without an operation: '{cigar}'")));
    }
    Ok(ops)
}

// Trait for alignment backends
pub trait OverlapAligner {
    type Index;

    /// Build a throwaway index over `(name, sequence)` references.
    fn build_index(&self, references: &[(&str, &[u8])]) -> io::Result<Self::Index>;

    /// Candidates for `query`, in the order the backend reports them.
    fn map(&self, index: &Self::Index, query: &[u8]) -> io::Result<Vec<AlignmentCandidate>>;
}

/// Parse the first twelve columns of a PAF line, plus its `cg:Z` CIGAR if present.
pub fn parse_paf_line(line: &str) -> io::Result<AlignmentCandidate> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 12 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Not enough fields in PAF record: {line}"),
        ));
    }

    let parse = |idx: usize| -> io::Result<usize> {
        fields[idx].parse::<usize>().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid field {} in PAF record '{}': {}", idx + 1, line, e),
            )
        })
    };

    let strand = match fields[4] {
        "+" => Strand::Forward,
        "-" => Strand::Reverse,
        other => {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid strand '{other}' in PAF record"),
            ))
        }
    };

    let cigar = match fields[12..].iter().find_map(|tag| tag.strip_prefix("cg:Z:")) {
        Some(cigar) => parse_cigar(cigar)?,
        None => Vec::new(),
    };

    Ok(AlignmentCandidate {
        query_len: parse(1)?,
        query_start: parse(2)?,
        query_end: parse(3)?,
        strand,
        target_name: fields[5].to_string(),
        target_len: parse(6)?,
        target_start: parse(7)?,
        target_end: parse(8)?,
        matches: parse(9)?,
        block_len: parse(10)?,
        cigar,
    })
}

/// Configuration for the minimap2 backend.
#[derive(Debug, Clone)]
pub struct Minimap2Config {
    /// Executable name or path.
    pub binary: String,
    /// Preset passed with `-x`.
    /// Default: "asm5"
    pub preset: String,
    pub threads: usize,
    /// Directory in which per-call index directories are created.
    pub temp_dir: Option<String>,
}

impl Default for Minimap2Config {
    fn default() -> Self {
        Minimap2Config {
            binary: "minimap2".to_string(),
            preset: "asm5".to_string(),
            threads: 1,
            temp_dir: None,
        }
    }
}

pub struct Minimap2Aligner {
    config: Minimap2Config,
}

/// Index files of one `build_index` call; removed on drop.
pub struct Minimap2Index {
    dir: TempDir,
    index_path: PathBuf,
}

impl Minimap2Aligner {
    pub fn new(config: Minimap2Config) -> Self {
        Minimap2Aligner { config }
    }

    fn temp_dir(&self) -> io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("scaffold-merge-");
        match &self.config.temp_dir {
            Some(dir) => builder.tempdir_in(dir),
            None => builder.tempdir(),
        }
    }

    fn run(&self, args: &[&str]) -> io::Result<Vec<u8>> {
        let output = Command::new(&self.config.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("Failed to run '{}': {}", self.config.binary, e),
                )
            })?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "'{} {}' failed: {}",
                self.config.binary,
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

fn write_fasta_record<W: Write>(writer: &mut W, name: &str, seq: &[u8]) -> io::Result<()> {
    writeln!(writer, ">{name}")?;
    writer.write_all(seq)?;
    writeln!(writer)
}

impl OverlapAligner for Minimap2Aligner {
    type Index = Minimap2Index;

    fn build_index(&self, references: &[(&str, &[u8])]) -> io::Result<Minimap2Index> {
        let dir = self.temp_dir()?;
        let fasta_path = dir.path().join("reference.fa");
        {
            let mut writer = BufWriter::new(File::create(&fasta_path)?);
            for (name, seq) in references {
                write_fasta_record(&mut writer, name, seq)?;
            }
            writer.flush()?;
        }

        let index_path = dir.path().join("reference.mmi");
        let threads = self.config.threads.max(1).to_string();
        self.run(&[
            "-x",
            &self.config.preset,
            "-t",
            &threads,
            "-d",
            &index_path.to_string_lossy(),
            &fasta_path.to_string_lossy(),
        ])?;

        Ok(Minimap2Index { dir, index_path })
    }

    fn map(&self, index: &Minimap2Index, query: &[u8]) -> io::Result<Vec<AlignmentCandidate>> {
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let mut query_file = tempfile::Builder::new()
            .prefix("query-")
            .suffix(".fa")
            .tempfile_in(index.dir.path())?;
        write_fasta_record(&mut query_file, "query", query)?;
        query_file.flush()?;

        let threads = self.config.threads.max(1).to_string();
        let stdout = self.run(&[
            "-c",
            "-x",
            &self.config.preset,
            "-t",
            &threads,
            &index.index_path.to_string_lossy(),
            &query_file.path().to_string_lossy(),
        ])?;

        let candidates = String::from_utf8_lossy(&stdout)
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(parse_paf_line)
            .collect::<io::Result<Vec<_>>>()?;
        debug!("minimap2 reported {} alignments", candidates.len());
        Ok(candidates)
    }
}

/// Exact dovetail overlaps found in memory, without external tools.
///
/// Reports, per reference and query strand, the longest exact overlap of the
/// reference end with the query start and of the query end with the
/// reference start. Quadratic in sequence length; meant for small inputs.
#[derive(Debug, Clone)]
pub struct ExactOverlapAligner {
    pub min_overlap: usize,
}

impl Default for ExactOverlapAligner {
    fn default() -> Self {
        ExactOverlapAligner { min_overlap: 20 }
    }
}

/// Longest `k >= min` with `left[len - k..] == right[..k]`.
fn longest_dovetail(left: &[u8], right: &[u8], min: usize) -> Option<usize> {
    let max = left.len().min(right.len());
    (min.max(1)..=max)
        .rev()
        .find(|&k| left[left.len() - k..] == right[..k])
}

impl OverlapAligner for ExactOverlapAligner {
    type Index = Vec<(String, Vec<u8>)>;

    fn build_index(&self, references: &[(&str, &[u8])]) -> io::Result<Self::Index> {
        Ok(references
            .iter()
            .map(|(name, seq)| (name.to_string(), seq.to_ascii_uppercase()))
            .collect())
    }

    fn map(&self, index: &Self::Index, query: &[u8]) -> io::Result<Vec<AlignmentCandidate>> {
        let forward = query.to_ascii_uppercase();
        let reverse = reverse_complement(&forward);
        let qlen = forward.len();
        let mut candidates = Vec::new();

        for (name, reference) in index {
            let rlen = reference.len();
            for (strand, oriented) in [(Strand::Forward, &forward), (Strand::Reverse, &reverse)] {
                // Reference end followed by query start
                if let Some(k) = longest_dovetail(reference, oriented, self.min_overlap) {
                    let (query_start, query_end) = match strand {
                        Strand::Forward => (0, k),
                        Strand::Reverse => (qlen - k, qlen),
                    };
                    candidates.push(AlignmentCandidate {
                        query_len: qlen,
                        query_start,
                        query_end,
                        strand,
                        target_name: name.clone(),
                        target_len: rlen,
                        target_start: rlen - k,
                        target_end: rlen,
                        matches: k,
                        block_len: k,
                        cigar: vec![CigarOp::new(k, b'=')],
                    });
                }
                // Query end followed by reference start
                if let Some(k) = longest_dovetail(oriented, reference, self.min_overlap) {
                    let (query_start, query_end) = match strand {
                        Strand::Forward => (qlen - k, qlen),
                        Strand::Reverse => (0, k),
                    };
                    candidates.push(AlignmentCandidate {
                        query_len: qlen,
                        query_start,
                        query_end,
                        strand,
                        target_name: name.clone(),
                        target_len: rlen,
                        target_start: 0,
                        target_end: k,
                        matches: k,
                        block_len: k,
                        cigar: vec![CigarOp::new(k, b'=')],
                    });
                }
            }
        }

        Ok(candidates)
    }
}

/// Aligner chosen at run time.
pub enum OverlapBackend {
    Minimap2(Minimap2Aligner),
    Exact(ExactOverlapAligner),
}

pub enum BackendIndex {
    Minimap2(Minimap2Index),
    Exact(Vec<(String, Vec<u8>)>),
}

impl OverlapAligner for OverlapBackend {
    type Index = BackendIndex;

    fn build_index(&self, references: &[(&str, &[u8])]) -> io::Result<Self::Index> {
        match self {
            OverlapBackend::Minimap2(aligner) => {
                aligner.build_index(references).map(BackendIndex::Minimap2)
            }
            OverlapBackend::Exact(aligner) => {
                aligner.build_index(references).map(BackendIndex::Exact)
            }
        }
    }

    fn map(&self, index: &Self::Index, query: &[u8]) -> io::Result<Vec<AlignmentCandidate>> {
        match (self, index) {
            (OverlapBackend::Minimap2(aligner), BackendIndex::Minimap2(index)) => {
                aligner.map(index, query)
            }
            (OverlapBackend::Exact(aligner), BackendIndex::Exact(index)) => {
                aligner.map(index, query)
            }
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Index was built by a different aligner backend",
            )),
        }
    }
}
