use std::path::{Path, PathBuf};

use crate::{
    config::*,
    consts::*,
    error::PipelineError,
    executor::{job::Job, manager::Executor},
};

/// Resolve the RSEM reference prefix inside a reference directory
///
/// # Arguments
/// * `dir` - Directory built by rsem-prepare-reference
///
/// # Returns
/// `<dir>/<stem>` for a single `<stem>.grp`, `<dir>/RSEMref` otherwise
///
/// # Example
/// ```rust, no_run
/// // /ref/rsem holds GRCh38.grp, GRCh38.seq, GRCh38.ti, ...
/// assert_eq!(reference_prefix(Path::new("/ref/rsem")), PathBuf::from("/ref/rsem/GRCh38"));
/// ```
pub fn reference_prefix(dir: &Path) -> PathBuf {
    let stems = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| {
                    path.is_file()
                        && path
                            .extension()
                            .map(|ext| ext == RSEM_GRP)
                            .unwrap_or(false)
                })
                .filter_map(|path| {
                    path.file_stem()
                        .map(|stem| stem.to_string_lossy().into_owned())
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    match stems.as_slice() {
        [stem] => dir.join(stem),
        _ => {
            log::warn!(
                "WARN: expected a single .{} file in {} (found {}), using {} as reference name",
                RSEM_GRP,
                dir.display(),
                stems.len(),
                RSEM_REF
            );
            dir.join(RSEM_REF)
        }
    }
}

/// Files rsem-calculate-expression writes under the Quant prefix
pub fn quant_outputs(config: &Config) -> Vec<PathBuf> {
    vec![
        config.path(GENES_RESULTS),
        config.path(ISOFORMS_RESULTS),
        config.path(QUANT_STAT),
    ]
}

/// Build the rsem-calculate-expression job
pub fn quant_job(config: &Config, reference: &Path) -> Job {
    let mut job = Job::task(Tool::Rsem, &config.tools)
        .current_dir(&config.outdir)
        .args(["--bam", "--estimate-rspd", "--calc-ci", "--no-bam-output"])
        .arg("--seed")
        .arg(RSEM_SEED)
        .arg("-p")
        .arg(config.threads)
        .arg("--ci-memory")
        .arg(config.ci_memory_mb())
        .args(config.data_type.rsem_args());

    if config.append_names {
        job = job.arg("--append-names");
    }

    job.path(config.path(TRANSCRIPTOME_BAM))
        .path(reference)
        .path(config.path(QUANT))
        .log(config.path(RSEM_LOG))
        .outputs(quant_outputs(config))
}

/// Build the rsem-plot-model job
pub fn plot_job(config: &Config) -> Job {
    Job::task(Tool::RsemPlot, &config.tools)
        .current_dir(&config.outdir)
        .path(config.path(QUANT))
        .path(config.path(QUANT_PDF))
        .output(config.path(QUANT_PDF))
}

/// Run the quantification step
pub fn run(config: &Config, executor: &mut dyn Executor) -> Result<(), PipelineError> {
    let reference = reference_prefix(&config.rsem_genome_dir);
    log::info!(
        "INFO [STEP 5]: Quantifying against {} -> Running RSEM...",
        reference.display()
    );

    executor.run(&quant_job(config, &reference))?;
    executor.run(&plot_job(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(data_type: DataType, append_names: bool) -> Config {
        Config {
            threads: 12,
            memory: 60,
            outdir: "/out".into(),
            prefix: "align".into(),
            star_genome_dir: "/ref/star".into(),
            rsem_genome_dir: "/ref/rsem".into(),
            max_mismatch: 0.04,
            data_type,
            read1: "/r1.fq".into(),
            read2: data_type.is_paired().then(|| "/r2.fq".into()),
            append_names,
            disable_bw: false,
            zcat: false,
            tools: ToolPaths::default(),
        }
    }

    #[test]
    fn test_reference_prefix_from_grp() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("GRCh38.grp"), "").unwrap();
        std::fs::write(dir.path().join("GRCh38.ti"), "").unwrap();

        assert_eq!(reference_prefix(dir.path()), dir.path().join("GRCh38"));
    }

    #[test]
    fn test_reference_prefix_fallback() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(reference_prefix(dir.path()), dir.path().join("RSEMref"));

        std::fs::write(dir.path().join("a.grp"), "").unwrap();
        std::fs::write(dir.path().join("b.grp"), "").unwrap();
        assert_eq!(reference_prefix(dir.path()), dir.path().join("RSEMref"));
    }

    #[test]
    fn test_quant_job_stranded_paired() {
        let job = quant_job(&config(DataType::StrPe, true), Path::new("/ref/rsem/RSEMref"));

        assert_eq!(
            job.cmd(),
            "rsem-calculate-expression --bam --estimate-rspd --calc-ci --no-bam-output \
--seed 12345 -p 12 --ci-memory 58368 --paired-end --forward-prob 0 --append-names \
/out/Aligned.toTranscriptome.out.bam /ref/rsem/RSEMref /out/Quant >& /out/Log.rsem"
        );
    }

    #[test]
    fn test_quant_job_unstranded_single() {
        let job = quant_job(&config(DataType::UnstrSe, false), Path::new("/ref/rsem/RSEMref"));

        assert!(!job.args.iter().any(|a| a == "--paired-end" || a == "--forward-prob"));
        assert!(!job.args.contains(&"--append-names".to_string()));
    }

    #[test]
    fn test_plot_job() {
        assert_eq!(
            plot_job(&config(DataType::StrSe, false)).cmd(),
            "rsem-plot-model /out/Quant /out/Quant.pdf"
        );
    }
}
