//! Scaffold paths and the contig tokens they are made of.
//!
//! A path file holds one scaffold per line; every tab-separated field is a
//! contig name with a one-character orientation suffix (`f`, `r` or `u`),
//! e.g. `contig1f`. Plain text and BGZF-compressed files are both accepted.

use log::debug;
use noodles::bgzf;
use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};

#[derive(Debug)]
pub enum ScaffoldError {
    /// A token references a contig that is not in the sequence store.
    GraphIntegrity { contig: String },
    InvalidToken(String),
    EmptyPath,
    Io(io::Error),
}

impl fmt::Display for ScaffoldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScaffoldError::GraphIntegrity { contig } => {
                write!(f, "Linkgraph error: contig '{}' not in sequence store", contig)
            }
            ScaffoldError::InvalidToken(token) => write!(f, "Invalid contig token '{}'", token),
            ScaffoldError::EmptyPath => write!(f, "Scaffold path contains no contigs"),
            ScaffoldError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ScaffoldError {}

impl From<io::Error> for ScaffoldError {
    fn from(e: io::Error) -> Self {
        ScaffoldError::Io(e)
    }
}

impl From<ScaffoldError> for io::Error {
    fn from(e: ScaffoldError) -> Self {
        match e {
            ScaffoldError::Io(e) => e,
            ScaffoldError::GraphIntegrity { .. } => {
                io::Error::new(io::ErrorKind::NotFound, e.to_string())
            }
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}

/// Resolved strand of a contig within a scaffold.
#[derive(Default, PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    pub fn tag(self) -> char {
        match self {
            Strand::Forward => 'f',
            Strand::Reverse => 'r',
        }
    }
}

/// Orientation tag of a token before resolution.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum Orientation {
    Forward,
    Reverse,
    Unknown,
}

impl Orientation {
    pub fn from_tag(tag: char) -> Option<Self> {
        match tag {
            'f' => Some(Orientation::Forward),
            'r' => Some(Orientation::Reverse),
            'u' => Some(Orientation::Unknown),
            _ => None,
        }
    }

    pub fn tag(self) -> char {
        match self {
            Orientation::Forward => 'f',
            Orientation::Reverse => 'r',
            Orientation::Unknown => 'u',
        }
    }

    pub fn strand(self) -> Option<Strand> {
        match self {
            Orientation::Forward => Some(Strand::Forward),
            Orientation::Reverse => Some(Strand::Reverse),
            Orientation::Unknown => None,
        }
    }
}

impl From<Strand> for Orientation {
    fn from(strand: Strand) -> Self {
        match strand {
            Strand::Forward => Orientation::Forward,
            Strand::Reverse => Orientation::Reverse,
        }
    }
}

/// A contig reference as it appears in an unresolved scaffold path.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct ContigToken {
    pub name: String,
    pub orientation: Orientation,
}

impl ContigToken {
    pub fn new(name: impl Into<String>, orientation: Orientation) -> Self {
        ContigToken {
            name: name.into(),
            orientation,
        }
    }

    /// Parse `contig1f`-style tokens.
    pub fn parse(field: &str) -> Result<Self, ScaffoldError> {
        let tag = field
            .chars()
            .last()
            .ok_or_else(|| ScaffoldError::InvalidToken(field.to_string()))?;
        let orientation =
            Orientation::from_tag(tag)
                .ok_or_else(|| ScaffoldError::InvalidToken(field.to_string()))?;
        let name = &field[..field.len() - tag.len_utf8()];
        if name.is_empty() {
            return Err(ScaffoldError::InvalidToken(field.to_string()));
        }
        Ok(ContigToken::new(name, orientation))
    }

    pub fn is_unknown(&self) -> bool {
        self.orientation == Orientation::Unknown
    }
}

impl fmt::Display for ContigToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.orientation.tag())
    }
}

/// A contig with a resolved strand; the only kind of token the merger sees.
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct OrientedContig {
    pub name: String,
    pub strand: Strand,
}

impl OrientedContig {
    pub fn new(name: impl Into<String>, strand: Strand) -> Self {
        OrientedContig {
            name: name.into(),
            strand,
        }
    }
}

impl fmt::Display for OrientedContig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.strand.tag())
    }
}

impl From<&OrientedContig> for ContigToken {
    fn from(contig: &OrientedContig) -> Self {
        ContigToken::new(contig.name.clone(), contig.strand.into())
    }
}

/// A named, possibly partially oriented chain of contigs.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ScaffoldPath {
    pub name: String,
    pub tokens: Vec<ContigToken>,
}

/// A named chain in which every contig has a strand.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct OrientedScaffold {
    pub name: String,
    pub contigs: Vec<OrientedContig>,
}

impl OrientedScaffold {
    /// Number of contig-to-contig joins the merger will attempt.
    pub fn links(&self) -> usize {
        self.contigs.len().saturating_sub(1)
    }
}

/// Name given to the `index`-th (1-based) scaffold.
pub fn scaffold_name(index: usize) -> String {
    format!("scaffold_{}", index)
}

/// Parse one path-file line into its tokens.
pub fn parse_path_line(line: &str) -> Result<Vec<ContigToken>, ScaffoldError> {
    let tokens = line
        .split('\t')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(ContigToken::parse)
        .collect::<Result<Vec<_>, _>>()?;
    if tokens.is_empty() {
        return Err(ScaffoldError::EmptyPath);
    }
    Ok(tokens)
}

/// Read scaffold paths from any buffered reader; blank lines are skipped.
pub fn read_paths<R: BufRead>(reader: R) -> Result<Vec<ScaffoldPath>, ScaffoldError> {
    let mut paths = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let tokens = parse_path_line(&line)?;
        paths.push(ScaffoldPath {
            name: scaffold_name(paths.len() + 1),
            tokens,
        });
    }
    debug!("Read {} scaffold paths", paths.len());
    Ok(paths)
}

pub fn read_paths_file(path: &str) -> Result<Vec<ScaffoldPath>, ScaffoldError> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("Failed to open path file '{}': {}", path, e))
    })?;
    if [".gz", ".bgz"].iter().any(|e| path.ends_with(e)) {
        read_paths(BufReader::new(bgzf::io::Reader::new(file)))
    } else {
        read_paths(BufReader::new(file))
    }
}

/// Write one line per scaffold: its name followed by its tab-separated tokens.
pub fn write_paths<W: Write + ?Sized>(
    writer: &mut W,
    scaffolds: &[OrientedScaffold],
) -> io::Result<()> {
    for scaffold in scaffolds {
        write!(writer, "{}", scaffold.name)?;
        for contig in &scaffold.contigs {
            write!(writer, "\t{}", contig)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}
