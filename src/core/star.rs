use std::path::PathBuf;

use crate::{
    config::*,
    consts::*,
    error::PipelineError,
    executor::{job::Job, manager::Executor},
};

/// Files STAR leaves in the output directory after a run
pub fn alignment_outputs(config: &Config) -> Vec<PathBuf> {
    [
        SORTED_BAM,
        TRANSCRIPTOME_BAM,
        SJ_TAB,
        LOG_FINAL,
        LOG_OUT,
        LOG_PROGRESS,
    ]
    .iter()
    .map(|name| config.path(name))
    .collect()
}

/// Static @CO lines embedded in every BAM header
///
/// # Example
/// ```rust, no_run
/// let lines = comments(&config);
/// assert_eq!(lines[1], "@CO\tDATATYPE:str_PE");
/// ```
pub fn comments(config: &Config) -> Vec<String> {
    vec![
        format!("@CO\tPROGRAM:{} v{}", STARQUANT, VERSION),
        format!("@CO\tDATATYPE:{}", config.data_type),
        format!("@CO\tSTARREF:{}", config.star_genome_dir.display()),
        format!("@CO\tRSEMREF:{}", config.rsem_genome_dir.display()),
    ]
}

/// Write the header comment file STAR reads through
/// --outSAMheaderCommentFile
pub fn write_comments(config: &Config) -> Result<PathBuf, PipelineError> {
    let path = config.path(COMMENTS);
    let mut contents = comments(config).join("\n");
    contents.push('\n');

    std::fs::write(&path, contents)?;

    Ok(path)
}

/// Build the STAR alignment job
///
/// # Arguments
/// * `config` - The run configuration
///
/// # Returns
/// A single job producing the alignment output set
///
/// # Example
/// ```rust, no_run
/// let job = star::align(&config);
/// assert!(job.cmd().contains("--quantMode TranscriptomeSAM"));
/// ```
pub fn align(config: &Config) -> Job {
    let mut job = Job::task(Tool::Star, &config.tools)
        .current_dir(&config.outdir)
        .arg("--runThreadN")
        .arg(config.threads)
        .arg("--genomeDir")
        .path(&config.star_genome_dir)
        .args(["--genomeLoad", "NoSharedMemory"])
        .arg("--readFilesIn")
        .path(&config.read1);

    if let Some(read2) = &config.read2 {
        job = job.path(read2);
    }
    if config.zcat {
        job = job.arg("--readFilesCommand").arg(&config.tools.zcat);
    }

    job.args(["--outFilterType", "BySJout"])
        .args(["--outSAMattributes", "NH", "HI", "AS", "NM", "MD"])
        .arg("--outFilterMultimapNmax")
        .arg(MULTIMAP_NMAX)
        .arg("--outFilterMismatchNmax")
        .arg(MISMATCH_NMAX)
        .arg("--outFilterMismatchNoverReadLmax")
        .arg(config.max_mismatch)
        .arg("--alignIntronMin")
        .arg(INTRON_MIN)
        .arg("--alignIntronMax")
        .arg(INTRON_MAX)
        .arg("--alignMatesGapMax")
        .arg(MATES_GAP_MAX)
        .arg("--alignSJoverhangMin")
        .arg(SJ_OVERHANG_MIN)
        .arg("--alignSJDBoverhangMin")
        .arg(SJDB_OVERHANG_MIN)
        .arg("--sjdbScore")
        .arg(SJDB_SCORE)
        .arg("--limitBAMsortRAM")
        .arg(config.bam_sort_ram())
        .args(["--outSAMtype", "BAM", "SortedByCoordinate"])
        .args(["--quantMode", "TranscriptomeSAM"])
        .args(config.data_type.star_strand_args())
        .arg("--outSAMheaderCommentFile")
        .path(config.path(COMMENTS))
        .args(["--outSAMheaderHD", "@HD", "VN:1.4", "SO:coordinate"])
        .arg("--outFileNamePrefix")
        .arg(format!("{}/", config.outdir.display()))
        .outputs(alignment_outputs(config))
}

/// Run the alignment step
pub fn run(config: &Config, executor: &mut dyn Executor) -> Result<(), PipelineError> {
    let comments = write_comments(config)?;
    log::info!(
        "INFO [STEP 2]: Header comments written to {} -> Running STAR...",
        comments.display()
    );

    executor.run(&align(config))
}
