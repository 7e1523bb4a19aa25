use std::path::PathBuf;

use crate::{
    config::*,
    consts::*,
    core::{signal, workspace},
    error::PipelineError,
};

/// Scratch files and directories that never survive a run
pub const TEMPORARIES: &[&str] = &[
    STAR_TMP,
    SIGNAL,
    SIGNAL_SORT_TMP,
    TR_HEADER,
    TR_SORTED,
    CHR_NL,
    COMMENTS,
    QUANT_TEMP,
];

/// Final name of an output file, or None when the file keeps its name
///
/// # Arguments
/// * `name` - File name inside the output directory
/// * `prefix` - The run prefix
///
/// # Example
/// ```rust, no_run
/// assert_eq!(final_name("Aligned.sortedByCoord.out.bam", "s1"), Some("s1.sortedByCoord.out.bam".into()));
/// assert_eq!(final_name("Log.final.out", "s1"), Some("s1.Log.final.out".into()));
/// assert_eq!(final_name("notes.txt", "s1"), None);
/// ```
pub fn final_name(name: &str, prefix: &str) -> Option<String> {
    let fixed = match name {
        GENES_RESULTS => Some("genes.results"),
        ISOFORMS_RESULTS => Some("isoforms.results"),
        QUANT_PDF => Some(QUANT_PDF),
        QUANT_STAT => Some("stat"),
        RSEM_LOG => Some("rsem.log"),
        SJ_TAB => Some(SJ_TAB),
        _ => None,
    };
    if let Some(rest) = fixed {
        return Some(format!("{}.{}", prefix, rest));
    }

    let bam = format!(".{}", BAM);
    let bw = format!(".{}", BW);

    if let Some(rest) = name
        .strip_prefix(ALIGNED)
        .and_then(|r| r.strip_prefix('.'))
        .filter(|r| r.ends_with(&bam))
    {
        return Some(format!("{}.{}", prefix, rest));
    }

    if name.starts_with(&format!("{}.", LOG)) && name.ends_with(OUT) {
        return Some(format!("{}.{}", prefix, name));
    }

    if let Some(rest) = name
        .strip_prefix(SIGNAL)
        .and_then(|r| r.strip_prefix('.'))
        .filter(|r| r.ends_with(&bw))
    {
        return Some(format!("{}.{}", prefix, rest));
    }

    None
}

/// Every file a successful run leaves in the output directory
pub fn deliverables(config: &Config) -> Vec<PathBuf> {
    let mut names = vec![
        GENES_RESULTS.to_string(),
        ISOFORMS_RESULTS.to_string(),
        QUANT_PDF.to_string(),
        QUANT_STAT.to_string(),
        RSEM_LOG.to_string(),
        SJ_TAB.to_string(),
        SORTED_BAM.to_string(),
        TRANSCRIPTOME_BAM.to_string(),
        LOG_FINAL.to_string(),
        LOG_OUT.to_string(),
        LOG_PROGRESS.to_string(),
    ];

    if !config.disable_bw {
        names.extend(signal::track_names(config.data_type));
        names.extend(
            signal::Normalization::all()
                .iter()
                .map(|norm| format!("{}.signal.{}.{}", LOG, norm, OUT)),
        );
    }

    let mut paths = names
        .iter()
        .filter_map(|name| final_name(name, &config.prefix))
        .map(|name| config.path(name))
        .collect::<Vec<_>>();
    paths.sort();

    paths
}

/// Remove temporaries and rename outputs with the run prefix
///
/// # Returns
/// The renamed files, sorted
///
/// # Example
/// ```rust, no_run
/// let files = finalize::finalize(&config)?;
/// assert!(files.contains(&outdir.join("align.genes.results")));
/// ```
pub fn finalize(config: &Config) -> Result<Vec<PathBuf>, PipelineError> {
    for name in TEMPORARIES {
        workspace::remove(config.path(name))?;
    }

    let mut entries = std::fs::read_dir(&config.outdir)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|entry| entry.path())
        .collect::<Vec<_>>();
    entries.sort();

    let mut renamed = Vec::new();
    for path in entries {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };

        // INFO: stray bedGraphs are scratch, never deliverables
        if path.is_file() && path.extension().map(|e| e == BG).unwrap_or(false) {
            workspace::remove(&path)?;
            continue;
        }

        if let Some(target) = final_name(&name, &config.prefix) {
            let target = config.path(target);
            log::info!("INFO [STEP 6]: {} -> {}", name, target.display());

            std::fs::rename(&path, &target)?;
            renamed.push(target);
        }
    }

    renamed.sort();
    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_final_names() {
        let cases = [
            ("Quant.genes.results", Some("P.genes.results")),
            ("Quant.isoforms.results", Some("P.isoforms.results")),
            ("Quant.pdf", Some("P.Quant.pdf")),
            ("Quant.stat", Some("P.stat")),
            ("Log.rsem", Some("P.rsem.log")),
            ("SJ.out.tab", Some("P.SJ.out.tab")),
            ("Aligned.sortedByCoord.out.bam", Some("P.sortedByCoord.out.bam")),
            ("Aligned.toTranscriptome.out.bam", Some("P.toTranscriptome.out.bam")),
            ("Log.out", Some("P.Log.out")),
            ("Log.final.out", Some("P.Log.final.out")),
            ("Log.signal.rpm.out", Some("P.Log.signal.rpm.out")),
            ("Signal.Unique.minus.raw.bw", Some("P.Unique.minus.raw.bw")),
            ("Signal.sort.tmp", None),
            ("Aligned.out.sam", None),
            ("Quant.temp", None),
            ("P.genes.results", None),
        ];

        for (name, expected) in cases {
            assert_eq!(final_name(name, "P").as_deref(), expected, "{}", name);
        }
    }

    #[test]
    fn test_deliverables_without_tracks() {
        let config = Config {
            threads: 1,
            memory: 8,
            outdir: "/out".into(),
            prefix: "s1".into(),
            star_genome_dir: "/ref/star".into(),
            rsem_genome_dir: "/ref/rsem".into(),
            max_mismatch: 0.04,
            data_type: DataType::StrPe,
            read1: "/r1.fq".into(),
            read2: Some("/r2.fq".into()),
            append_names: false,
            disable_bw: true,
            zcat: false,
            tools: ToolPaths::default(),
        };

        let files = deliverables(&config);
        assert_eq!(files.len(), 11);
        assert!(files.iter().all(|f| f.starts_with("/out")));
        assert!(files
            .iter()
            .all(|f| f.file_name().unwrap().to_str().unwrap().starts_with("s1.")));

        let config = Config {
            disable_bw: false,
            ..config
        };
        assert_eq!(deliverables(&config).len(), 11 + 8 + 2);
    }

    #[test]
    fn test_finalize_sweeps_and_renames() {
        let dir = tempfile::tempdir().unwrap();
        let outdir = dir.path().to_path_buf();
        let config = Config {
            threads: 1,
            memory: 8,
            outdir: outdir.clone(),
            prefix: "s1".into(),
            star_genome_dir: "/ref/star".into(),
            rsem_genome_dir: "/ref/rsem".into(),
            max_mismatch: 0.04,
            data_type: DataType::UnstrSe,
            read1: "/r1.fq".into(),
            read2: None,
            append_names: false,
            disable_bw: true,
            zcat: false,
            tools: ToolPaths::default(),
        };

        for name in ["Quant.genes.results", "Log.out", "commentsHeader.txt", "x.bg", "keep.txt"] {
            std::fs::write(outdir.join(name), "").unwrap();
        }
        std::fs::create_dir_all(outdir.join("_STARtmp").join("BAMsort")).unwrap();
        std::fs::create_dir(outdir.join("Quant.stat")).unwrap();

        let renamed = finalize(&config).unwrap();

        assert_eq!(
            renamed,
            vec![
                outdir.join("s1.Log.out"),
                outdir.join("s1.genes.results"),
                outdir.join("s1.stat"),
            ]
        );
        assert!(outdir.join("s1.stat").is_dir());
        assert!(outdir.join("keep.txt").exists());
        for gone in ["_STARtmp", "commentsHeader.txt", "x.bg", "Quant.genes.results"] {
            assert!(!outdir.join(gone).exists(), "{}", gone);
        }
    }
}
