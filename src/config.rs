use serde::Deserialize;

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::consts::*;
use crate::error::PipelineError;

/// Immutable run configuration.
///
/// Built once by the argument resolver [see `cli::Args::resolve`]
/// and handed by reference to every pipeline step. Nothing downstream
/// reads flags or the environment again.
///
/// # Fields
///
/// * `threads` - Threads handed to STAR, samtools, sort and RSEM.
/// * `memory` - Memory budget in GB.
/// * `outdir` - Absolute output directory, also the working root of every job.
/// * `prefix` - Prefix substituted into every deliverable name.
/// * `star_genome_dir` - STAR genome index directory.
/// * `rsem_genome_dir` - RSEM reference directory (or reference prefix).
/// * `max_mismatch` - Mismatches over read length allowed by STAR.
/// * `data_type` - Library layout tag.
/// * `read1` - First mate (or single-end reads).
/// * `read2` - Second mate, present iff `data_type` is paired-end.
/// * `append_names` - Append gene/transcript names to RSEM identifiers.
/// * `disable_bw` - Skip the signal step.
/// * `zcat` - Decompress reads on the fly.
/// * `tools` - Executables used by each step.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub threads: usize,
    pub memory: usize,
    pub outdir: PathBuf,
    pub prefix: String,
    pub star_genome_dir: PathBuf,
    pub rsem_genome_dir: PathBuf,
    pub max_mismatch: f64,
    pub data_type: DataType,
    pub read1: PathBuf,
    pub read2: Option<PathBuf>,
    pub append_names: bool,
    pub disable_bw: bool,
    pub zcat: bool,
    pub tools: ToolPaths,
}

impl Config {
    /// Path of a file inside the output directory.
    ///
    /// # Example
    ///
    /// ``` rust, no_run
    /// let bam = config.path(SORTED_BAM);
    /// assert_eq!(bam, PathBuf::from("/out/Aligned.sortedByCoord.out.bam"));
    /// ```
    pub fn path<P: AsRef<Path>>(&self, name: P) -> PathBuf {
        self.outdir.join(name)
    }

    /// Steps to run, in order. The signal step is dropped
    /// when tracks are disabled.
    pub fn steps(&self) -> Vec<PipelineStep> {
        PipelineStep::all()
            .into_iter()
            .filter(|step| !(self.disable_bw && *step == PipelineStep::Signal))
            .collect()
    }

    /// Tools this run needs to find on disk.
    pub fn required_tools(&self) -> Vec<Tool> {
        let mut tools = vec![Tool::Star, Tool::Samtools, Tool::Sort, Tool::Rsem, Tool::RsemPlot];

        if !self.disable_bw {
            tools.push(Tool::BedGraphToBigWig);
        }
        if self.zcat {
            tools.push(Tool::Zcat);
        }

        tools
    }

    /// Memory handed to RSEM credibility interval computation, in MB.
    pub fn ci_memory_mb(&self) -> usize {
        self.memory.saturating_sub(RSEM_MEMORY_HEADROOM).max(1) * 1024
    }

    /// Memory handed to STAR for BAM sorting, in bytes.
    pub fn bam_sort_ram(&self) -> u64 {
        self.memory as u64 * 1_000_000_000
    }
}

/// Library layout tag.
///
/// Each variant maps to a fixed set of tool arguments, so no flag
/// string is ever assembled from mode checks downstream.
///
/// # Example
///
/// ``` rust, no_run
/// let dt = DataType::from_str("unstr_PE").unwrap();
///
/// assert!(dt.is_paired());
/// assert_eq!(dt.star_strand_args(), &["--outSAMstrandField", "intronMotif"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    StrSe,
    StrPe,
    UnstrSe,
    UnstrPe,
}

impl DataType {
    pub fn is_paired(&self) -> bool {
        matches!(self, DataType::StrPe | DataType::UnstrPe)
    }

    pub fn is_stranded(&self) -> bool {
        matches!(self, DataType::StrSe | DataType::StrPe)
    }

    /// STAR alignment arguments. Stranded libraries let STAR infer the
    /// strand from read orientation, unstranded ones get it from the
    /// intron motif.
    pub fn star_strand_args(&self) -> &'static [&'static str] {
        match self {
            DataType::StrSe | DataType::StrPe => &[],
            DataType::UnstrSe | DataType::UnstrPe => &["--outSAMstrandField", "intronMotif"],
        }
    }

    /// Value for STAR's --outWigStrand
    pub fn wig_strand(&self) -> &'static str {
        match self {
            DataType::StrSe | DataType::StrPe => "Stranded",
            DataType::UnstrSe | DataType::UnstrPe => "Unstranded",
        }
    }

    /// Layout and strandedness arguments for rsem-calculate-expression.
    pub fn rsem_args(&self) -> &'static [&'static str] {
        match self {
            DataType::StrSe => &["--forward-prob", "0"],
            DataType::StrPe => &["--paired-end", "--forward-prob", "0"],
            DataType::UnstrSe => &[],
            DataType::UnstrPe => &["--paired-end"],
        }
    }

    /// STAR wig strand index -> track name.
    ///
    /// # Note
    ///
    /// STAR writes str1 for the minus strand and str2 for the plus
    /// strand of stranded libraries; keep this mapping as is.
    pub fn tracks(&self) -> &'static [(u8, &'static str)] {
        match self {
            DataType::StrSe | DataType::StrPe => STRANDED_TRACKS,
            DataType::UnstrSe | DataType::UnstrPe => UNSTRANDED_TRACKS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::StrSe => "str_SE",
            DataType::StrPe => "str_PE",
            DataType::UnstrSe => "unstr_SE",
            DataType::UnstrPe => "unstr_PE",
        }
    }
}

impl FromStr for DataType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "str_SE" => Ok(DataType::StrSe),
            "str_PE" => Ok(DataType::StrPe),
            "unstr_SE" => Ok(DataType::UnstrSe),
            "unstr_PE" => Ok(DataType::UnstrPe),
            _ => Err(PipelineError::invalid_input(format!(
                "--data-type must be one of {}, got '{}'",
                DATA_TYPES.join("|"),
                s
            ))),
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// External executables driven by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Star,
    Samtools,
    Sort,
    Rsem,
    RsemPlot,
    BedGraphToBigWig,
    Zcat,
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Tool::Star => "star",
            Tool::Samtools => "samtools",
            Tool::Sort => "sort",
            Tool::Rsem => "rsem",
            Tool::RsemPlot => "rsem_plot",
            Tool::BedGraphToBigWig => "bedgraph_to_bigwig",
            Tool::Zcat => "zcat",
        };
        write!(f, "{}", name)
    }
}

/// Executable names or paths, one per tool.
///
/// ``` toml
/// [tools]
/// star = "/opt/STAR-2.7.11b/bin/STAR"
/// samtools = "samtools"
/// ```
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ToolPaths {
    pub star: String,
    pub samtools: String,
    pub sort: String,
    pub rsem: String,
    pub rsem_plot: String,
    pub bedgraph_to_bigwig: String,
    pub zcat: String,
}

impl ToolPaths {
    pub fn get(&self, tool: Tool) -> &str {
        match tool {
            Tool::Star => &self.star,
            Tool::Samtools => &self.samtools,
            Tool::Sort => &self.sort,
            Tool::Rsem => &self.rsem,
            Tool::RsemPlot => &self.rsem_plot,
            Tool::BedGraphToBigWig => &self.bedgraph_to_bigwig,
            Tool::Zcat => &self.zcat,
        }
    }
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            star: "STAR".into(),
            samtools: "samtools".into(),
            sort: "sort".into(),
            rsem: "rsem-calculate-expression".into(),
            rsem_plot: "rsem-plot-model".into(),
            bedgraph_to_bigwig: "bedGraphToBigWig".into(),
            zcat: "zcat".into(),
        }
    }
}

/// Run-level defaults read from the [global] table.
/// Any value given on the command line wins.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GlobalParams {
    pub threads: Option<usize>,
    pub memory: Option<usize>,
    pub prefix: Option<String>,
    pub max_mismatch: Option<f64>,
    pub data_type: Option<String>,
    pub star_genome_dir: Option<PathBuf>,
    pub rsem_genome_dir: Option<PathBuf>,
}

/// A struct representing a configuration file.
///
/// # Example
///
/// ``` toml
/// [tools]
/// star = "STAR"
///
/// [global]
/// threads = 16
/// star_genome_dir = "/ref/STAR"
/// ```
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub tools: ToolPaths,
    #[serde(default)]
    pub global: GlobalParams,
}

impl FileConfig {
    /// Read a configuration file and return a FileConfig struct.
    ///
    /// # Arguments
    ///
    /// * `config` - Path to the TOML file.
    ///
    /// # Example
    ///
    /// ``` rust, no_run
    /// let config = FileConfig::read(Path::new("starquant.toml"))?;
    /// ```
    pub fn read(config: &Path) -> Result<Self, PipelineError> {
        let mut contents = String::new();
        File::open(config)
            .and_then(|mut file| file.read_to_string(&mut contents))
            .map_err(|e| PipelineError::Config(format!("cannot read {:?}: {}", config, e)))?;

        Self::parse(&contents)
            .map_err(|e| PipelineError::Config(format!("cannot parse {:?}: {}", config, e)))
    }

    pub fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }
}

/// An enum representing pipeline steps.
///
/// # Example
///
/// ``` rust, no_run
/// let step = PipelineStep::Align;
/// assert_eq!(step.to_int(), 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub enum PipelineStep {
    Prepare,
    Align,
    Signal,
    Normalize,
    Quantify,
    Finalize,
}

impl PipelineStep {
    pub fn all() -> Vec<Self> {
        vec![
            Self::Prepare,
            Self::Align,
            Self::Signal,
            Self::Normalize,
            Self::Quantify,
            Self::Finalize,
        ]
    }

    pub fn to_int(&self) -> usize {
        match self {
            Self::Prepare => 1,
            Self::Align => 2,
            Self::Signal => 3,
            Self::Normalize => 4,
            Self::Quantify => 5,
            Self::Finalize => 6,
        }
    }

    pub fn to_str(&self) -> &'static str {
        match self {
            Self::Prepare => "prepare",
            Self::Align => "align",
            Self::Signal => "signal",
            Self::Normalize => "normalize",
            Self::Quantify => "quantify",
            Self::Finalize => "finalize",
        }
    }
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}
