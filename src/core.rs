use std::path::{Path, PathBuf};

use crate::{
    cli::Args,
    config::*,
    consts::*,
    error::PipelineError,
    executor::manager::Executor,
};

pub mod bedgraph;
pub mod finalize;
pub mod rsem;
pub mod samtools;
pub mod signal;
pub mod star;
pub mod workspace;

/// Resolve arguments and run the whole pipeline
///
/// Validation happens before anything touches the executor, so
/// a usage error never spawns a tool nor creates a directory.
///
/// # Example
/// ```rust, no_run
/// let args = Args::parse();
/// let files = core::execute(args, &std::env::current_dir()?, &mut LocalExecutor::new())?;
/// ```
pub fn execute(
    args: Args,
    cwd: &Path,
    executor: &mut dyn Executor,
) -> Result<Vec<PathBuf>, PipelineError> {
    let config = args.resolve(cwd)?;
    run(&config, executor)
}

/// Run every step of the pipeline in order
///
/// # Arguments
/// * `config` - The resolved run configuration
/// * `executor` - Where jobs are sent
///
/// # Returns
/// The final deliverables, sorted
pub fn run(config: &Config, executor: &mut dyn Executor) -> Result<Vec<PathBuf>, PipelineError> {
    log::debug!("DEBUG: Running with the following config: {:#?}", config);

    preflight(config, executor)?;
    log::info!("SUCCESS: All dependencies are loaded, starting pipeline...");

    for step in config.steps() {
        for path in step.inputs(config) {
            if !path.exists() {
                return Err(PipelineError::MissingInput { step, path });
            }
        }

        run_step(&step, config, executor)?;

        for path in step.outputs(config) {
            if !path.exists() {
                return Err(PipelineError::MissingOutput { step, path });
            }
        }

        log::info!("INFO [STEP {}]: {} completed", step.to_int(), step);
    }

    Ok(finalize::deliverables(config))
}

/// Probe every tool the run needs before anything is written
fn preflight(config: &Config, executor: &mut dyn Executor) -> Result<(), PipelineError> {
    for tool in config.required_tools() {
        executor.probe(tool, config.tools.get(tool))?;
    }

    Ok(())
}

fn run_step(
    step: &PipelineStep,
    config: &Config,
    executor: &mut dyn Executor,
) -> Result<(), PipelineError> {
    match step {
        PipelineStep::Prepare => workspace::prepare(&config.outdir),
        PipelineStep::Align => star::run(config, executor),
        PipelineStep::Signal => signal::run(config, executor),
        PipelineStep::Normalize => samtools::normalize(config, executor),
        PipelineStep::Quantify => rsem::run(config, executor),
        PipelineStep::Finalize => {
            let files = finalize::finalize(config)?;
            log::info!(
                "INFO [STEP 6]: {} files renamed with prefix '{}'",
                files.len(),
                config.prefix
            );
            Ok(())
        }
    }
}

impl PipelineStep {
    /// Files that must exist before the step runs
    pub fn inputs(&self, config: &Config) -> Vec<PathBuf> {
        match self {
            PipelineStep::Prepare => vec![],
            PipelineStep::Align => {
                let mut inputs = vec![config.read1.clone()];
                inputs.extend(config.read2.iter().cloned());
                inputs.push(config.star_genome_dir.clone());
                inputs
            }
            PipelineStep::Signal => vec![
                config.path(SORTED_BAM),
                config.star_genome_dir.join(CHR_NAME_LENGTH),
            ],
            PipelineStep::Normalize | PipelineStep::Quantify => {
                vec![config.path(TRANSCRIPTOME_BAM)]
            }
            PipelineStep::Finalize => rsem::quant_outputs(config),
        }
    }

    /// Files the step leaves behind on success
    pub fn outputs(&self, config: &Config) -> Vec<PathBuf> {
        match self {
            PipelineStep::Prepare => vec![config.outdir.clone()],
            PipelineStep::Align => star::alignment_outputs(config),
            PipelineStep::Signal => signal::track_names(config.data_type)
                .into_iter()
                .map(|name| config.path(name))
                .chain(
                    signal::Normalization::all()
                        .iter()
                        .map(|norm| config.path(format!("{}.signal.{}.{}", LOG, norm, OUT))),
                )
                .collect(),
            PipelineStep::Normalize => vec![config.path(TRANSCRIPTOME_BAM)],
            PipelineStep::Quantify => {
                let mut outputs = rsem::quant_outputs(config);
                outputs.push(config.path(QUANT_PDF));
                outputs.push(config.path(RSEM_LOG));
                outputs
            }
            PipelineStep::Finalize => finalize::deliverables(config),
        }
    }
}
