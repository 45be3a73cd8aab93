use clap::{Parser, ValueEnum};
use log::info;
use rayon::ThreadPoolBuilder;
use scaffold_merge::commands::{
    create_output, merge::run_merge, orient::run_orient, trim::run_trim,
};
use scaffold_merge::consensus::SpoaConsensus;
use scaffold_merge::context::ScaffoldContext;
use scaffold_merge::coverage::BamCoverage;
use scaffold_merge::faidx::FastaIndex;
use scaffold_merge::merge::MergeConfig;
use scaffold_merge::orient::OrientConfig;
use scaffold_merge::overlap::{
    ExactOverlapAligner, Minimap2Aligner, Minimap2Config, OverlapBackend,
};
use scaffold_merge::scaffold::{read_paths_file, ScaffoldPath};
use scaffold_merge::trim::TrimConfig;
use std::io::{self, Write};
use std::num::NonZeroUsize;

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum AlignerKind {
    /// Run minimap2 on every contig pair
    Minimap2,
    /// Exact end-to-end overlaps computed in memory (small inputs only)
    Exact,
}

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Contig FASTA. A .fai index is created next to it if missing.
    #[clap(short = 'f', long, value_parser)]
    fasta: String,

    /// Scaffold path file: one path per line, tab-separated tokens such as `tig12f` (plain or bgzip-compressed)
    #[clap(short = 'p', long, value_parser)]
    paths: String,

    /// Overlap aligner backend
    #[clap(long, value_enum, default_value_t = AlignerKind::Minimap2)]
    aligner: AlignerKind,

    /// minimap2 executable
    #[clap(long, value_parser, default_value = "minimap2")]
    minimap2: String,

    /// minimap2 preset passed with -x
    #[clap(long, value_parser, default_value = "asm5")]
    preset: String,

    /// Minimum overlap length for the exact aligner
    #[clap(long, value_parser, default_value_t = 20)]
    min_overlap: usize,

    /// Bases at each contig end that an orienting alignment must reach
    #[clap(long, value_parser, default_value_t = 1000)]
    end_window: usize,

    /// Directory for temporary alignment files
    #[clap(long, value_parser)]
    temp_dir: Option<String>,

    /// Number of threads for parallel processing (default: all cores)
    #[clap(short = 't', long, value_parser)]
    num_threads: Option<NonZeroUsize>,

    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Options for coverage trimming
#[derive(Parser, Debug)]
struct TrimOpts {
    /// Coordinate-sorted, indexed BAM of reads mapped to the contigs
    #[clap(short = 'b', long, value_parser)]
    bam: String,

    /// Window size for coverage scanning
    #[clap(short = 'w', long, value_parser, default_value_t = 30)]
    window: usize,

    /// Coverage a window needs to stop trimming
    #[clap(short = 'c', long, value_parser, default_value_t = 5.0)]
    min_coverage: f64,

    /// Maximum windows scanned per contig end (default: as many as fit)
    #[clap(long, value_parser)]
    max_windows: Option<usize>,

    /// Minimum base quality counted towards coverage
    #[clap(long, value_parser, default_value_t = 15)]
    min_base_quality: u8,
}

/// Orient, trim and merge scaffolded contigs.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Resolve contig orientations and write the oriented paths
    Orient {
        #[clap(flatten)]
        common: CommonOpts,

        /// Output path file (default: stdout)
        #[clap(short = 'o', long, value_parser)]
        output: Option<String>,
    },
    /// Report how the contigs of each join would be trimmed, as BED
    Trim {
        #[clap(flatten)]
        common: CommonOpts,

        #[clap(flatten)]
        trim: TrimOpts,

        /// Output BED file (default: stdout)
        #[clap(short = 'o', long, value_parser)]
        output: Option<String>,
    },
    /// Orient, trim and merge each scaffold into one sequence
    Merge {
        #[clap(flatten)]
        common: CommonOpts,

        #[clap(flatten)]
        trim: TrimOpts,

        /// Bases of merged sequence kept to align the next contig against
        #[clap(long, value_parser, default_value_t = 100_000)]
        reference_tail: usize,

        /// Number of Ns placed between contigs that do not overlap
        #[clap(long, value_parser, default_value_t = 10)]
        gap_length: usize,

        /// How far an overlap may start from the contig ends
        #[clap(long, value_parser, default_value_t = 1000)]
        overlap_slack: usize,

        /// POA scoring parameters as match,mismatch,gap_open1,gap_ext1,gap_open2,gap_ext2
        #[clap(long, value_parser, default_value = "5,4,6,2,24,1")]
        poa_scoring: String,

        /// Longest overlap aligned with POA when the aligner reports no CIGAR
        #[clap(long, value_parser, default_value_t = 2000)]
        max_poa_length: usize,

        /// Output FASTA (default: stdout, bgzip-compressed if ending in .gz)
        #[clap(short = 'o', long, value_parser)]
        output: Option<String>,

        /// Also write the oriented paths used for merging
        #[clap(long, value_parser)]
        paths_output: Option<String>,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Orient { common, output } => {
            let (sequences, paths) = initialize(&common)?;
            let orient = orient_config(&common);
            let aligner = overlap_backend(&common);
            let mut writer = create_output(output.as_deref())?;
            let ctx = ScaffoldContext::new(&sequences, &aligner).with_orient_config(orient);
            run_orient(&ctx, &paths, &mut *writer)?;
        }
        Args::Trim {
            common,
            trim,
            output,
        } => {
            let (sequences, paths) = initialize(&common)?;
            let coverage = bam_coverage(&trim)?;
            let trim_config = trim_config(&trim);
            let orient = orient_config(&common);
            let aligner = overlap_backend(&common);
            let mut writer = create_output(output.as_deref())?;
            let ctx = ScaffoldContext::new(&sequences, &aligner)
                .with_coverage(&coverage)
                .with_orient_config(orient)
                .with_trim_config(trim_config);
            run_trim(&ctx, &paths, &mut *writer)?;
        }
        Args::Merge {
            common,
            trim,
            reference_tail,
            gap_length,
            overlap_slack,
            poa_scoring,
            max_poa_length,
            output,
            paths_output,
        } => {
            let (sequences, paths) = initialize(&common)?;
            let coverage = bam_coverage(&trim)?;
            let consensus = SpoaConsensus {
                scoring_params: parse_poa_scoring(&poa_scoring)?,
                max_poa_length,
            };
            let trim_config = trim_config(&trim);
            let orient = orient_config(&common);
            let merge = MergeConfig {
                reference_tail,
                gap_length,
                overlap_slack,
            };
            let mut fasta = create_output(output.as_deref())?;
            let mut paths_writer = match paths_output.as_deref() {
                Some(path) => Some(create_output(Some(path))?),
                None => None,
            };

            let aligner = overlap_backend(&common);
            let ctx = ScaffoldContext::new(&sequences, &aligner)
                .with_coverage(&coverage)
                .with_consensus(&consensus)
                .with_orient_config(orient)
                .with_trim_config(trim_config)
                .with_merge_config(merge);
            let stats = run_merge(
                &ctx,
                &paths,
                &mut *fasta,
                paths_writer.as_deref_mut().map(|w| w as &mut dyn Write),
            )?;
            info!(
                "Done: {} links, {} merged, {} gapped",
                stats.links, stats.merges, stats.gaps
            );
        }
    }

    Ok(())
}

/// Set up logging and the thread pool, then load the contigs and paths
fn initialize(common: &CommonOpts) -> io::Result<(FastaIndex, Vec<ScaffoldPath>)> {
    // Initialize logger based on verbosity
    env_logger::Builder::new()
        .filter_level(match common.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    let num_threads = common
        .num_threads
        .map_or_else(num_cpus::get, NonZeroUsize::get);
    ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
        .map_err(|e| io::Error::other(format!("Failed to build thread pool: {e}")))?;

    let sequences = FastaIndex::build_from_file(&common.fasta)?;
    info!(
        "Loaded {} contigs from {}",
        sequences.sequence_names.len(),
        common.fasta
    );

    let paths = read_paths_file(&common.paths)?;
    info!("Read {} scaffold paths from {}", paths.len(), common.paths);

    Ok((sequences, paths))
}

fn orient_config(common: &CommonOpts) -> OrientConfig {
    OrientConfig {
        end_window: common.end_window,
    }
}

fn trim_config(trim: &TrimOpts) -> TrimConfig {
    TrimConfig {
        window: trim.window,
        min_coverage: trim.min_coverage,
        max_windows: trim.max_windows,
    }
}

fn bam_coverage(trim: &TrimOpts) -> io::Result<BamCoverage> {
    let mut coverage = BamCoverage::new(&trim.bam)?;
    coverage.min_base_quality = trim.min_base_quality;
    Ok(coverage)
}

fn overlap_backend(common: &CommonOpts) -> OverlapBackend {
    match common.aligner {
        AlignerKind::Minimap2 => OverlapBackend::Minimap2(Minimap2Aligner::new(Minimap2Config {
            binary: common.minimap2.clone(),
            preset: common.preset.clone(),
            // Contig pairs already run in parallel
            threads: 1,
            temp_dir: common.temp_dir.clone(),
        })),
        AlignerKind::Exact => OverlapBackend::Exact(ExactOverlapAligner {
            min_overlap: common.min_overlap,
        }),
    }
}

fn parse_poa_scoring(scoring: &str) -> io::Result<(u8, u8, u8, u8, u8, u8)> {
    let values = scoring
        .split(',')
        .map(|v| {
            v.trim().parse::<u8>().map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Invalid POA scoring value '{v}' in '{scoring}'"),
                )
            })
        })
        .collect::<io::Result<Vec<u8>>>()?;

    match values.as_slice() {
        &[a, b, c, d, e, f] => Ok((a, b, c, d, e, f)),
        _ => Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("POA scoring needs 6 comma-separated values, got '{scoring}'"),
        )),
    }
}
