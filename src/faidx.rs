use rust_htslib::faidx;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::io::{self};

use crate::sequence_index::{not_found, SequenceIndex};

thread_local! {
    // One open reader per thread; rayon workers each get their own handle
    static FAIDX_READER: RefCell<Option<(String, faidx::Reader)>> = const { RefCell::new(None) };
}

/// Run `f` on this thread's reader for `path`, opening it if needed.
fn with_reader<T>(path: &str, f: impl FnOnce(&faidx::Reader) -> io::Result<T>) -> io::Result<T> {
    FAIDX_READER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if !matches!(&*slot, Some((open, _)) if open == path) {
            let reader = faidx::Reader::from_path(path)
                .map_err(|e| io::Error::other(format!("Failed to open FASTA file '{path}': {e}")))?;
            *slot = Some((path.to_string(), reader));
        }
        match &*slot {
            Some((_, reader)) => f(reader),
            None => Err(io::Error::other(format!("No FASTA reader for '{path}'"))),
        }
    })
}

/// Indexed FASTA with contig names and lengths read from its `.fai`.
#[derive(Debug)]
pub struct FastaIndex {
    pub fasta_path: String,
    pub sequence_names: Vec<String>,
    pub sequence_lengths: FxHashMap<String, usize>,
}

impl FastaIndex {
    pub fn build_from_file(fasta_path: &str) -> io::Result<Self> {
        let fai_path = format!("{fasta_path}.fai");

        // Try to open the .fai file, if it doesn't exist, let htslib create it
        let fai_content = match std::fs::read_to_string(&fai_path) {
            Ok(content) => content,
            Err(_) => match faidx::Reader::from_path(fasta_path) {
                Ok(_) => std::fs::read_to_string(&fai_path)?,
                Err(e) => {
                    return Err(io::Error::other(format!(
                        "Failed to create FASTA index for '{fasta_path}': {e}"
                    )));
                }
            },
        };

        let mut index = FastaIndex {
            fasta_path: fasta_path.to_string(),
            sequence_names: Vec::new(),
            sequence_lengths: FxHashMap::default(),
        };

        for line in fai_content.lines() {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 2 || fields[0].is_empty() {
                continue;
            }
            let length = fields[1].parse::<usize>().map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("Invalid length for '{}' in {fai_path}", fields[0]),
                )
            })?;
            index.sequence_names.push(fields[0].to_string());
            index.sequence_lengths.insert(fields[0].to_string(), length);
        }

        Ok(index)
    }
}

impl SequenceIndex for FastaIndex {
    fn contigs(&self) -> Vec<(String, usize)> {
        self.sequence_names
            .iter()
            .map(|name| (name.clone(), self.sequence_lengths[name]))
            .collect()
    }

    fn sequence_length(&self, seq_name: &str) -> Option<usize> {
        self.sequence_lengths.get(seq_name).copied()
    }

    fn fetch_sequence(&self, seq_name: &str, start: usize, end: usize) -> io::Result<Vec<u8>> {
        let length = self.sequence_length(seq_name).ok_or_else(|| not_found(seq_name))?;
        let end = end.min(length);
        if start >= end {
            return Ok(Vec::new());
        }

        with_reader(&self.fasta_path, |reader| {
            // fetch_seq expects a 0-based inclusive end coordinate
            match reader.fetch_seq(seq_name, start, end - 1) {
                Ok(seq) => {
                    let mut seq_vec = seq.to_vec();
                    unsafe { libc::free(seq.as_ptr() as *mut std::ffi::c_void) }; // Free up memory to avoid memory leak (bug https://github.com/rust-bio/rust-htslib/issues/401#issuecomment-1704290171)
                    seq_vec.make_ascii_uppercase();
                    Ok(seq_vec)
                }
                Err(e) => Err(io::Error::other(format!(
                    "Failed to fetch sequence for {seq_name}: {e}"
                ))),
            }
        })
    }
}
