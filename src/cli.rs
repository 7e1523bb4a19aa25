use clap::{builder::PossibleValuesParser, Parser};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::*;
use crate::consts::*;
use crate::error::PipelineError;

/// STAR + RSEM alignment and quantification pipeline
///
/// # Example
///
/// ```bash,no_run
/// starquant --read1 R1.fq.gz --read2 R2.fq.gz --zcat-flag \
///     --star-genome-dir /ref/STAR --rsem-genome-dir /ref/RSEM \
///     -o out -p sampleX --data-type str_PE
/// ```
///
/// # Note
///
/// * Every value except the reads and the output directory can also be
///   given in the [global] table of --config; the command line wins.
/// * The output directory is wiped before the run starts!
#[derive(Parser, Debug, Clone, Default)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(
        short = 'o',
        long = "output",
        help = "Output directory [destroyed and recreated]",
        value_name = "DIR"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        short = 'p',
        long = "prefix",
        help = "Prefix for output files [default: align]",
        value_name = "PREFIX"
    )]
    pub prefix: Option<String>,

    #[arg(
        short = 't',
        long = "thread",
        help = "Number of threads [default: 10]",
        value_name = "THREADS"
    )]
    pub threads: Option<usize>,

    #[arg(
        long = "max-mismatch",
        help = "Max mismatches over read length [default: 0.04]",
        value_name = "FLOAT"
    )]
    pub max_mismatch: Option<f64>,

    #[arg(
        long = "mem",
        help = "Memory budget in GB, 3GB are kept for RSEM [default: 60]",
        value_name = "GB"
    )]
    pub memory: Option<usize>,

    #[arg(
        long = "rsem-genome-dir",
        help = "RSEM reference directory",
        value_name = "DIR"
    )]
    pub rsem_genome_dir: Option<PathBuf>,

    #[arg(
        long = "star-genome-dir",
        help = "STAR genome index directory",
        value_name = "DIR"
    )]
    pub star_genome_dir: Option<PathBuf>,

    #[arg(long = "read1", help = "Read 1 (or single-end reads)", value_name = "PATH")]
    pub read1: Option<PathBuf>,

    #[arg(
        long = "read2",
        help = "Read 2, required for paired-end data",
        value_name = "PATH"
    )]
    pub read2: Option<PathBuf>,

    #[arg(
        long = "data-type",
        help = "Library layout [default: str_PE]",
        value_name = "TYPE",
        value_parser = PossibleValuesParser::new(DATA_TYPES)
    )]
    pub data_type: Option<String>,

    #[arg(long = "append-names", help = "Append gene/transcript names to RSEM ids")]
    pub append_names: bool,

    #[arg(long = "disable-bw", help = "Do not generate bigWig signal tracks")]
    pub disable_bw: bool,

    #[arg(long = "zcat-flag", help = "Reads are gzipped, decompress them on the fly")]
    pub zcat: bool,

    #[arg(
        short = 'c',
        long = "config",
        help = "Path to a TOML file with [tools] and [global] tables",
        value_name = "TOML"
    )]
    pub config: Option<PathBuf>,

    #[arg(short = 'v', long = "verbose", help = "Increase verbosity", conflicts_with = "quiet")]
    pub verbose: bool,

    #[arg(short = 'q', long = "quiet", help = "Decrease verbosity")]
    pub quiet: bool,
}

impl Args {
    /// Resolve flags (and the optional config file) into an
    /// immutable Config.
    ///
    /// # Arguments
    ///
    /// * `cwd` - Directory relative paths are resolved against.
    ///
    /// # Returns
    ///
    /// A Config or a usage error (exit code 2). Nothing is written
    /// and no tool is run here.
    ///
    /// # Example
    ///
    /// ``` rust, no_run
    /// let args = Args::parse();
    /// let config = args.resolve(&std::env::current_dir()?)?;
    /// ```
    pub fn resolve(self, cwd: &Path) -> Result<Config, PipelineError> {
        let file = match &self.config {
            Some(path) => FileConfig::read(&cwd.join(path))?,
            None => FileConfig::default(),
        };

        self.resolve_with(file, cwd)
    }

    /// Same as `resolve` with an already loaded config file.
    pub fn resolve_with(self, file: FileConfig, cwd: &Path) -> Result<Config, PipelineError> {
        let global = file.global;

        let read1 = non_empty(self.read1, "--read1")?;
        let outdir = non_empty(self.output, "--output")?;
        let star_genome_dir = non_empty(
            self.star_genome_dir.or(global.star_genome_dir),
            "--star-genome-dir",
        )?;
        let rsem_genome_dir = non_empty(
            self.rsem_genome_dir.or(global.rsem_genome_dir),
            "--rsem-genome-dir",
        )?;

        let data_type = DataType::from_str(
            self.data_type
                .as_deref()
                .or(global.data_type.as_deref())
                .unwrap_or(DEFAULT_DATA_TYPE),
        )?;

        // INFO: read2 only exists for paired-end data
        let read2 = if data_type.is_paired() {
            Some(non_empty(self.read2, "--read2").map_err(|_| {
                PipelineError::invalid_input(format!(
                    "--read2 is required for paired-end data [{}]",
                    data_type
                ))
            })?)
        } else {
            if self.read2.as_ref().is_some_and(|r| !r.as_os_str().is_empty()) {
                log::warn!(
                    "WARN: --read2 ignored for single-end data [{}]",
                    data_type
                );
            }
            None
        };

        let threads = self.threads.or(global.threads).unwrap_or(DEFAULT_THREADS);
        if threads == 0 {
            return Err(PipelineError::invalid_input("--thread must be at least 1"));
        }
        if threads > num_cpus::get() {
            log::warn!(
                "WARN: --thread {} exceeds the {} CPUs of this machine",
                threads,
                num_cpus::get()
            );
        }

        let memory = self.memory.or(global.memory).unwrap_or(DEFAULT_MEMORY);
        if memory <= RSEM_MEMORY_HEADROOM {
            return Err(PipelineError::invalid_input(format!(
                "--mem must be greater than {} GB",
                RSEM_MEMORY_HEADROOM
            )));
        }

        let max_mismatch = self
            .max_mismatch
            .or(global.max_mismatch)
            .unwrap_or(DEFAULT_MAX_MISMATCH);
        if !(0.0..=1.0).contains(&max_mismatch) {
            return Err(PipelineError::invalid_input(format!(
                "--max-mismatch must be within [0, 1], got {}",
                max_mismatch
            )));
        }

        let prefix = self
            .prefix
            .or(global.prefix)
            .unwrap_or_else(|| DEFAULT_PREFIX.to_string());
        if prefix.is_empty() || prefix.contains('/') {
            return Err(PipelineError::invalid_input(format!(
                "--prefix must be a non-empty file name, got '{}'",
                prefix
            )));
        }

        Ok(Config {
            threads,
            memory,
            outdir: cwd.join(outdir),
            prefix,
            star_genome_dir: cwd.join(star_genome_dir),
            rsem_genome_dir: cwd.join(rsem_genome_dir),
            max_mismatch,
            data_type,
            read1: cwd.join(read1),
            read2: read2.map(|r| cwd.join(r)),
            append_names: self.append_names,
            disable_bw: self.disable_bw,
            zcat: self.zcat,
            tools: file.tools,
        })
    }

    pub fn log_level(&self) -> log::Level {
        if self.verbose {
            log::Level::Debug
        } else if self.quiet {
            log::Level::Warn
        } else {
            log::Level::Info
        }
    }
}

fn non_empty(arg: Option<PathBuf>, flag: &str) -> Result<PathBuf, PipelineError> {
    match arg {
        Some(path) if !path.as_os_str().is_empty() => Ok(path),
        _ => Err(PipelineError::invalid_input(format!("{} is required", flag))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Args {
        Args {
            output: Some("out".into()),
            star_genome_dir: Some("/ref/star".into()),
            rsem_genome_dir: Some("/ref/rsem".into()),
            read1: Some("r1.fq.gz".into()),
            read2: Some("r2.fq.gz".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = base().resolve_with(FileConfig::default(), Path::new("/work")).unwrap();

        assert_eq!(config.threads, 10);
        assert_eq!(config.memory, 60);
        assert_eq!(config.prefix, "align");
        assert_eq!(config.max_mismatch, 0.04);
        assert_eq!(config.data_type, DataType::StrPe);
        assert_eq!(config.outdir, PathBuf::from("/work/out"));
        assert_eq!(config.read1, PathBuf::from("/work/r1.fq.gz"));
        assert_eq!(config.read2, Some(PathBuf::from("/work/r2.fq.gz")));
        assert_eq!(config.star_genome_dir, PathBuf::from("/ref/star"));
        assert_eq!(config.tools, ToolPaths::default());
    }

    #[test]
    fn test_missing_required_flags() {
        let cwd = Path::new("/work");
        let cases = [
            Args { read1: None, ..base() },
            Args { read1: Some("".into()), ..base() },
            Args { output: None, ..base() },
            Args { star_genome_dir: None, ..base() },
            Args { rsem_genome_dir: Some("".into()), ..base() },
        ];

        for args in cases {
            let err = args.resolve_with(FileConfig::default(), cwd).unwrap_err();
            assert_eq!(err.exit_code(), 2, "{}", err);
        }
    }

    #[test]
    fn test_paired_end_requires_read2() {
        let cwd = Path::new("/work");
        for dt in ["str_PE", "unstr_PE"] {
            let args = Args {
                read2: None,
                data_type: Some(dt.into()),
                ..base()
            };
            assert_eq!(args.resolve_with(FileConfig::default(), cwd).unwrap_err().exit_code(), 2);

            let args = Args {
                read2: Some("".into()),
                data_type: Some(dt.into()),
                ..base()
            };
            assert_eq!(args.resolve_with(FileConfig::default(), cwd).unwrap_err().exit_code(), 2);
        }
    }

    #[test]
    fn test_single_end_forces_empty_read2() {
        for dt in ["str_SE", "unstr_SE"] {
            let args = Args {
                data_type: Some(dt.into()),
                ..base()
            };
            let config = args.resolve_with(FileConfig::default(), Path::new("/work")).unwrap();
            assert_eq!(config.read2, None);
        }
    }

    #[test]
    fn test_invalid_data_type_is_usage_error() {
        let args = Args {
            data_type: Some("paired".into()),
            ..base()
        };
        let err = args.resolve_with(FileConfig::default(), Path::new("/work")).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_clap_rejects_invalid_data_type_with_exit_two() {
        let err = Args::try_parse_from(["starquant", "--data-type", "str_pe"]).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        for dt in DATA_TYPES {
            let args = Args::try_parse_from(["starquant", "--data-type", *dt]).unwrap();
            assert_eq!(args.data_type.as_deref(), Some(*dt));
        }
    }

    #[test]
    fn test_cli_flags_parse() {
        let args = Args::try_parse_from([
            "starquant", "-o", "out", "-p", "s1", "-t", "4", "--mem", "32", "--max-mismatch",
            "0.1", "--read1", "a.fq", "--append-names", "--disable-bw", "--zcat-flag",
        ])
        .unwrap();

        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert_eq!(args.prefix.as_deref(), Some("s1"));
        assert_eq!(args.threads, Some(4));
        assert_eq!(args.memory, Some(32));
        assert_eq!(args.max_mismatch, Some(0.1));
        assert!(args.append_names && args.disable_bw && args.zcat);
    }

    #[test]
    fn test_cli_wins_over_file_over_default() {
        let file = FileConfig::parse(
            r#"
            [global]
            threads = 32
            memory = 100
            prefix = "fromfile"
            star_genome_dir = "/site/star"
            "#,
        )
        .unwrap();

        let args = Args {
            threads: Some(4),
            star_genome_dir: None,
            ..base()
        };
        let config = args.resolve_with(file, Path::new("/work")).unwrap();

        assert_eq!(config.threads, 4);
        assert_eq!(config.memory, 100);
        assert_eq!(config.prefix, "fromfile");
        assert_eq!(config.star_genome_dir, PathBuf::from("/site/star"));
        assert_eq!(config.max_mismatch, 0.04);
    }

    #[test]
    fn test_numeric_bounds() {
        let cwd = Path::new("/work");
        for args in [
            Args { threads: Some(0), ..base() },
            Args { memory: Some(3), ..base() },
            Args { max_mismatch: Some(1.5), ..base() },
            Args { prefix: Some("a/b".into()), ..base() },
        ] {
            assert_eq!(args.resolve_with(FileConfig::default(), cwd).unwrap_err().exit_code(), 2);
        }
    }
}
