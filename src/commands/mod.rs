pub mod merge;
pub mod orient;
pub mod trim;

use noodles::bgzf;
use std::fs::File;
use std::io::{self, BufWriter, Write};

/// Open `path` for writing, or stdout for `None` / `-`. Paths ending in
/// `.gz` or `.bgz` are BGZF compressed.
pub fn create_output(path: Option<&str>) -> io::Result<Box<dyn Write>> {
    match path {
        None | Some("-") => Ok(Box::new(BufWriter::new(io::stdout()))),
        Some(path) => {
            let file = File::create(path)?;
            if [".gz", ".bgz"].iter().any(|e| path.ends_with(e)) {
                Ok(Box::new(bgzf::io::Writer::new(file)))
            } else {
                Ok(Box::new(BufWriter::new(file)))
            }
        }
    }
}
