use rustc_hash::FxHashMap;
use std::io;

use crate::scaffold::{ScaffoldError, Strand};

// Trait for random access to contig sequences
pub trait SequenceIndex {
    /// Contig names and lengths, in store order.
    fn contigs(&self) -> Vec<(String, usize)>;

    fn sequence_length(&self, seq_name: &str) -> Option<usize>;

    /// Fetch `[start, end)` of `seq_name`, upper-cased.
    fn fetch_sequence(&self, seq_name: &str, start: usize, end: usize) -> io::Result<Vec<u8>>;

    fn fetch_full(&self, seq_name: &str) -> io::Result<Vec<u8>> {
        let len = self.sequence_length(seq_name).ok_or_else(|| not_found(seq_name))?;
        self.fetch_sequence(seq_name, 0, len)
    }
}

/// Length of `seq_name`, or a graph-integrity error when the store lacks it.
pub fn require_length<S: SequenceIndex + ?Sized>(
    index: &S,
    seq_name: &str,
) -> Result<usize, ScaffoldError> {
    index
        .sequence_length(seq_name)
        .ok_or_else(|| ScaffoldError::GraphIntegrity {
            contig: seq_name.to_string(),
        })
}

/// Full sequence of `seq_name` in the frame given by `strand`.
pub fn fetch_oriented<S: SequenceIndex + ?Sized>(
    index: &S,
    seq_name: &str,
    start: usize,
    end: usize,
    strand: Strand,
) -> io::Result<Vec<u8>> {
    let seq = index.fetch_sequence(seq_name, start, end)?;
    Ok(match strand {
        Strand::Forward => seq,
        Strand::Reverse => reverse_complement(&seq),
    })
}

pub(crate) fn not_found(seq_name: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("Sequence '{seq_name}' not found"),
    )
}

/// Reverse complement over A/C/G/T/N; lower-case input yields upper-case output.
/// Other symbols are kept as they are.
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&base| match base {
            b'A' | b'a' => b'T',
            b'T' | b't' => b'A',
            b'C' | b'c' => b'G',
            b'G' | b'g' => b'C',
            b'N' | b'n' => b'N',
            _ => base,
        })
        .collect()
}

/// Sequences held in memory, e.g. contigs assembled upstream in the same process.
#[derive(Debug, Default)]
pub struct MemorySequenceIndex {
    order: Vec<String>,
    sequences: FxHashMap<String, Vec<u8>>,
}

impl MemorySequenceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, sequence: &[u8]) {
        if !self.sequences.contains_key(name) {
            self.order.push(name.to_string());
        }
        self.sequences
            .insert(name.to_string(), sequence.to_ascii_uppercase());
    }
}

impl SequenceIndex for MemorySequenceIndex {
    fn contigs(&self) -> Vec<(String, usize)> {
        self.order
            .iter()
            .map(|name| (name.clone(), self.sequences[name].len()))
            .collect()
    }

    fn sequence_length(&self, seq_name: &str) -> Option<usize> {
        self.sequences.get(seq_name).map(Vec::len)
    }

    fn fetch_sequence(&self, seq_name: &str, start: usize, end: usize) -> io::Result<Vec<u8>> {
        let seq = self.sequences.get(seq_name).ok_or_else(|| not_found(seq_name))?;
        let end = end.min(seq.len());
        let start = start.min(end);
        Ok(seq[start..end].to_vec())
    }
}
