use std::path::PathBuf;

use crate::{
    config::*,
    consts::*,
    core::{bedgraph, workspace},
    error::PipelineError,
    executor::{job::Job, manager::Executor},
};

/// Signal normalizations, in the order they are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    Raw,
    Rpm,
}

impl Normalization {
    pub fn all() -> [Self; 2] {
        [Self::Raw, Self::Rpm]
    }

    /// Value for STAR's --outWigNorm
    pub fn wig_norm(&self) -> &'static str {
        match self {
            Self::Raw => "None",
            Self::Rpm => "RPM",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Raw => "raw",
            Self::Rpm => "rpm",
        }
    }
}

impl std::fmt::Display for Normalization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

/// bedGraph file STAR writes for a category and strand index
fn bedgraph_name(category: &str, index: u8) -> String {
    format!("{}.{}.str{}.{}.{}", SIGNAL, category, index, OUT, BG)
}

fn track_name(category: &str, strand: &str, norm: Normalization) -> String {
    format!("{}.{}.{}.{}.{}", SIGNAL, category, strand, norm, BW)
}

/// Every bigWig the signal step leaves in the output directory
///
/// # Example
/// ```rust, no_run
/// let tracks = signal::track_names(DataType::StrPe);
///
/// assert_eq!(tracks.len(), 8);
/// assert_eq!(tracks[0], "Signal.Unique.minus.raw.bw");
/// ```
pub fn track_names(data_type: DataType) -> Vec<String> {
    let mut names = Vec::new();

    for norm in Normalization::all() {
        for category in SIGNAL_CATEGORIES {
            for (_, strand) in data_type.tracks() {
                names.push(track_name(category, strand, norm));
            }
        }
    }

    names
}

/// Directory STAR writes its wig output into
pub fn signal_dir(config: &Config) -> PathBuf {
    config.path(SIGNAL)
}

/// Build the STAR job turning the sorted BAM into bedGraphs
///
/// # Arguments
/// * `config` - The run configuration
/// * `norm` - The normalization to apply
///
/// # Returns
/// A job declaring every bedGraph STAR writes plus its Log.out
pub fn bedgraph_job(config: &Config, norm: Normalization) -> Job {
    let dir = signal_dir(config);

    let bedgraphs = SIGNAL_CATEGORIES.iter().flat_map(|category| {
        config
            .data_type
            .tracks()
            .iter()
            .map(|(index, _)| dir.join(bedgraph_name(category, *index)))
            .collect::<Vec<_>>()
    });

    Job::task(Tool::Star, &config.tools)
        .current_dir(&config.outdir)
        .args(["--runMode", "inputAlignmentsFromBAM"])
        .arg("--inputBAMfile")
        .path(config.path(SORTED_BAM))
        .args(["--outWigType", "bedGraph"])
        .arg("--outWigStrand")
        .arg(config.data_type.wig_strand())
        .arg("--outWigNorm")
        .arg(norm.wig_norm())
        .arg("--outWigReferencesPrefix")
        .arg(PRIMARY_CHROM_PREFIX)
        .arg("--outFileNamePrefix")
        .arg(format!("{}/", dir.display()))
        .outputs(bedgraphs)
        .output(dir.join(LOG_OUT))
}

/// Build the bedGraphToBigWig conversion job
pub fn bigwig_job(config: &Config, track: &str) -> Job {
    Job::task(Tool::BedGraphToBigWig, &config.tools)
        .current_dir(&config.outdir)
        .path(config.path(SIGNAL_SORT_TMP))
        .path(config.path(CHR_NL))
        .path(config.path(track))
        .output(config.path(track))
}

/// Run the signal step: two STAR wig passes, each bedGraph filtered,
/// sorted and converted to bigWig
pub fn run(config: &Config, executor: &mut dyn Executor) -> Result<(), PipelineError> {
    let chrom_sizes = config.star_genome_dir.join(CHR_NAME_LENGTH);
    let kept = bedgraph::filter_chrom_sizes(&chrom_sizes, &config.path(CHR_NL))?;
    log::info!(
        "INFO [STEP 3]: {} primary chromosomes kept from {}",
        kept,
        chrom_sizes.display()
    );

    for norm in Normalization::all() {
        let dir = signal_dir(config);
        workspace::remove(&dir)?;
        std::fs::create_dir_all(&dir)?;

        log::info!("INFO [STEP 3]: Generating {} signal -> Running STAR...", norm);
        executor.run(&bedgraph_job(config, norm))?;

        for category in SIGNAL_CATEGORIES {
            for (index, strand) in config.data_type.tracks() {
                let bedgraph = dir.join(bedgraph_name(category, *index));
                let sorted = config.path(SIGNAL_SORT_TMP);

                let lines = bedgraph::sort_bedgraph(&bedgraph, &sorted)?;
                log::debug!("DEBUG: {} -> {} lines", bedgraph.display(), lines);

                executor.run(&bigwig_job(config, &track_name(category, strand, norm)))?;
                workspace::remove(&sorted)?;
            }
        }

        std::fs::rename(
            dir.join(LOG_OUT),
            config.path(format!("{}.signal.{}.{}", LOG, norm, OUT)),
        )?;
        workspace::remove(&dir)?;
    }

    workspace::remove(config.path(CHR_NL))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stranded_tracks() {
        let tracks = track_names(DataType::StrSe);

        assert_eq!(tracks.len(), 8);
        assert_eq!(
            tracks[..4],
            [
                "Signal.Unique.minus.raw.bw",
                "Signal.Unique.plus.raw.bw",
                "Signal.UniqueMultiple.minus.raw.bw",
                "Signal.UniqueMultiple.plus.raw.bw",
            ]
        );
        assert!(tracks[4..].iter().all(|t| t.ends_with(".rpm.bw")));
    }

    #[test]
    fn test_unstranded_tracks() {
        let tracks = track_names(DataType::UnstrPe);

        assert_eq!(
            tracks,
            vec![
                "Signal.Unique.unstranded.raw.bw",
                "Signal.UniqueMultiple.unstranded.raw.bw",
                "Signal.Unique.unstranded.rpm.bw",
                "Signal.UniqueMultiple.unstranded.rpm.bw",
            ]
        );
    }

    #[test]
    fn test_strand_index_maps_to_name() {
        assert_eq!(bedgraph_name("Unique", 1), "Signal.Unique.str1.out.bg");
        assert_eq!(DataType::StrPe.tracks(), &[(1, "minus"), (2, "plus")]);
    }

    #[test]
    fn test_bedgraph_job_declares_star_outputs() {
        let config = Config {
            threads: 2,
            memory: 8,
            outdir: "/out".into(),
            prefix: "align".into(),
            star_genome_dir: "/ref/star".into(),
            rsem_genome_dir: "/ref/rsem".into(),
            max_mismatch: 0.04,
            data_type: DataType::StrPe,
            read1: "/r1.fq".into(),
            read2: Some("/r2.fq".into()),
            append_names: false,
            disable_bw: false,
            zcat: false,
            tools: ToolPaths::default(),
        };

        let job = bedgraph_job(&config, Normalization::Rpm);
        assert!(job.cmd().contains(
            "--outWigStrand Stranded --outWigNorm RPM --outWigReferencesPrefix chr --outFileNamePrefix /out/Signal/"
        ));
        assert_eq!(job.outputs.len(), 5);
        assert!(job
            .outputs
            .contains(&PathBuf::from("/out/Signal/Signal.UniqueMultiple.str2.out.bg")));
    }
}
