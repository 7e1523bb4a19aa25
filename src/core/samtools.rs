use std::io::{BufRead, Write};

use crate::{
    config::*,
    consts::*,
    core::workspace,
    error::PipelineError,
    executor::{
        job::{Job, Pipe, Transform},
        manager::Executor,
    },
};

impl Transform {
    /// Stream `reader` into `writer` through this transform
    ///
    /// # Returns
    /// The number of records read
    pub fn apply<R: BufRead, W: Write>(&self, reader: R, writer: W) -> Result<u64, PipelineError> {
        match self {
            Transform::JoinMates => join_mates(reader, writer),
            Transform::SplitMates => split_mates(reader, writer),
            Transform::Passthrough => passthrough(reader, writer),
        }
    }
}

/// Join each two consecutive SAM records into a single line,
/// separated by MATE_SEPARATOR, so a line sort keeps mates together
///
/// # Example
/// ```rust, no_run
/// let mut out = Vec::new();
/// join_mates(&b"r1\t99\nr1\t147\n"[..], &mut out)?;
///
/// assert_eq!(out, b"r1\t99\x1fr1\t147\n");
/// ```
pub fn join_mates<R: BufRead, W: Write>(reader: R, mut writer: W) -> Result<u64, PipelineError> {
    let mut records = 0;
    let mut mate: Option<Vec<u8>> = None;

    for line in reader.split(b'\n') {
        let line = line?;

        match mate.take() {
            None => mate = Some(line),
            Some(first) => {
                writer.write_all(&first)?;
                writer.write_all(&[MATE_SEPARATOR])?;
                writer.write_all(&line)?;
                writer.write_all(b"\n")?;
            }
        }
        records += 1;
    }

    if mate.is_some() {
        return Err(PipelineError::parse(
            "transcriptome BAM",
            format!("odd number of paired-end records ({})", records),
        ));
    }

    Ok(records)
}

/// Split lines produced by join_mates back into two records
pub fn split_mates<R: BufRead, W: Write>(reader: R, mut writer: W) -> Result<u64, PipelineError> {
    let mut records = 0;

    for (idx, line) in reader.split(b'\n').enumerate() {
        let line = line?;
        let sep = line
            .iter()
            .position(|b| *b == MATE_SEPARATOR)
            .ok_or_else(|| {
                PipelineError::parse(
                    "sorted transcriptome records",
                    format!("line {} has no mate separator", idx + 1),
                )
            })?;

        writer.write_all(&line[..sep])?;
        writer.write_all(b"\n")?;
        writer.write_all(&line[sep + 1..])?;
        writer.write_all(b"\n")?;
        records += 2;
    }

    Ok(records)
}

pub fn passthrough<R: BufRead, W: Write>(reader: R, mut writer: W) -> Result<u64, PipelineError> {
    let mut records = 0;

    for line in reader.split(b'\n') {
        writer.write_all(&line?)?;
        writer.write_all(b"\n")?;
        records += 1;
    }

    Ok(records)
}

/// Dump the header of the transcriptome BAM
pub fn header_job(config: &Config) -> Job {
    Job::task(Tool::Samtools, &config.tools)
        .current_dir(&config.outdir)
        .args(["view", "-H"])
        .path(config.path(TRANSCRIPTOME_BAM))
        .stdout(config.path(TR_HEADER))
}

/// Build the streaming re-sort of the transcriptome BAM
///
/// # Arguments
/// * `config` - The run configuration
///
/// # Returns
/// A pipe writing Tr.sorted.bam
///
/// # Example
/// ```rust, no_run
/// let pipe = samtools::sort_pipe(&config);
///
/// // samtools view -@T in.bam | join-mates | LC_ALL=C sort ... | split-mates (Tr.header.sam) | samtools view -b ...
/// executor.pipe(&pipe)?;
/// ```
pub fn sort_pipe(config: &Config) -> Pipe {
    let threads = format!("-@{}", config.threads);

    let view = Job::task(Tool::Samtools, &config.tools)
        .current_dir(&config.outdir)
        .arg("view")
        .arg(&threads)
        .path(config.path(TRANSCRIPTOME_BAM));

    let sort = Job::task(Tool::Sort, &config.tools)
        .current_dir(&config.outdir)
        .env("LC_ALL", "C")
        .arg("-S")
        .arg(format!("{}G", config.memory))
        .arg("-T")
        .path(&config.outdir)
        .arg(format!("--parallel={}", config.threads));

    let compress = Job::task(Tool::Samtools, &config.tools)
        .current_dir(&config.outdir)
        .arg("view")
        .arg(&threads)
        .args(["-b", "-o"])
        .path(config.path(TR_SORTED))
        .arg("-")
        .output(config.path(TR_SORTED));

    let header = Some(config.path(TR_HEADER));

    if config.data_type.is_paired() {
        Pipe::new()
            .job(view)
            .transform(Transform::JoinMates, None)
            .job(sort)
            .transform(Transform::SplitMates, header)
            .job(compress)
    } else {
        Pipe::new()
            .job(view)
            .job(sort)
            .transform(Transform::Passthrough, header)
            .job(compress)
    }
}

/// Re-sort the transcriptome BAM so its record order no longer
/// depends on the thread count STAR ran with
pub fn normalize(config: &Config, executor: &mut dyn Executor) -> Result<(), PipelineError> {
    log::info!("INFO [STEP 4]: Sorting transcriptome BAM -> Running samtools...");

    executor.run(&header_job(config))?;
    executor.pipe(&sort_pipe(config))?;

    std::fs::rename(config.path(TR_SORTED), config.path(TRANSCRIPTOME_BAM))?;
    workspace::remove(config.path(TR_HEADER))?;

    Ok(())
}
