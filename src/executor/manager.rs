use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdout, Command, ExitStatus, Stdio};

use crate::{
    config::Tool,
    error::PipelineError,
    executor::job::{Job, Pipe, PipeStage, Transform},
};

/// Runs the jobs of the pipeline.
///
/// Every step talks to the outside world through this trait, so
/// tests can swap the real processes for a recording stub.
pub trait Executor {
    /// Check that a tool can be spawned at all
    fn probe(&mut self, tool: Tool, program: &str) -> Result<(), PipelineError>;

    /// Run a job to completion; a non-zero exit is an error
    fn run(&mut self, job: &Job) -> Result<(), PipelineError>;

    /// Run a chain of jobs connected stdout -> stdin
    fn pipe(&mut self, pipe: &Pipe) -> Result<(), PipelineError>;
}

/// Executor spawning real processes, one at a time.
#[derive(Debug, Clone, Default)]
pub struct LocalExecutor;

impl LocalExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl Executor for LocalExecutor {
    fn probe(&mut self, tool: Tool, program: &str) -> Result<(), PipelineError> {
        // INFO: exit status is irrelevant, most tools print usage and exit != 0
        match Command::new(program)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(_) => {
                log::debug!("DEBUG: found {} -> {}", tool, program);
                Ok(())
            }
            Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                Err(PipelineError::ToolNotFound {
                    tool,
                    program: program.to_string(),
                })
            }
            Err(e) => Err(PipelineError::Io(e)),
        }
    }

    fn run(&mut self, job: &Job) -> Result<(), PipelineError> {
        log::info!("INFO [{}]: {}", job.tool, job.cmd());

        let mut cmd = command(job);
        cmd.stdin(Stdio::null());

        if let Some(out) = &job.stdout {
            cmd.stdout(File::create(out)?);
        }
        if let Some(log) = &job.log {
            let file = File::create(log)?;
            cmd.stdout(file.try_clone()?);
            cmd.stderr(file);
        }

        let status = cmd.status().map_err(|e| spawn_error(job, e))?;
        check_status(job, status)
    }

    fn pipe(&mut self, pipe: &Pipe) -> Result<(), PipelineError> {
        log::info!("INFO [pipe]: {}", pipe.cmd());
        check_pipe(pipe)?;

        let last = pipe.stages.len() - 1;

        std::thread::scope(|scope| -> Result<(), PipelineError> {
            let mut children: Vec<(&Job, Child)> = Vec::new();
            let mut feeders = Vec::new();
            let mut upstream: Option<ChildStdout> = None;
            let mut pending: Option<(Transform, Option<&PathBuf>)> = None;

            for (idx, stage) in pipe.stages.iter().enumerate() {
                let job = match stage {
                    PipeStage::Transform { transform, header } => {
                        pending = Some((*transform, header.as_ref()));
                        continue;
                    }
                    PipeStage::Job(job) => job,
                };

                let mut cmd = command(job);

                let feed = match (upstream.take(), pending.take()) {
                    (None, _) => {
                        cmd.stdin(Stdio::null());
                        None
                    }
                    (Some(out), None) => {
                        cmd.stdin(Stdio::from(out));
                        None
                    }
                    (Some(out), Some(transform)) => {
                        cmd.stdin(Stdio::piped());
                        Some((out, transform))
                    }
                };

                if idx < last {
                    cmd.stdout(Stdio::piped());
                } else if let Some(out) = &job.stdout {
                    cmd.stdout(File::create(out)?);
                }
                if let Some(log) = &job.log {
                    cmd.stderr(File::create(log)?);
                }

                let mut child = match cmd.spawn() {
                    Ok(child) => child,
                    Err(e) => {
                        // WARN: do not leave the head of the pipe running
                        for (_, child) in children.iter_mut() {
                            let _ = child.kill();
                        }
                        return Err(spawn_error(job, e));
                    }
                };

                if let Some((out, (transform, header))) = feed {
                    let stdin = child.stdin.take().ok_or_else(|| {
                        PipelineError::parse("pipe", format!("no stdin for {}", job.program))
                    })?;

                    feeders.push(scope.spawn(move || -> Result<u64, PipelineError> {
                        let mut writer = BufWriter::new(stdin);
                        if let Some(header) = header {
                            std::io::copy(&mut File::open(header)?, &mut writer)?;
                        }
                        let lines = transform.apply(BufReader::new(out), &mut writer)?;
                        writer.flush()?;

                        Ok(lines)
                    }));
                }

                upstream = child.stdout.take();
                children.push((job, child));
            }

            let mut failures = Vec::new();
            for (job, mut child) in children {
                let status = child.wait()?;
                if let Err(e) = check_status(job, status) {
                    failures.push(e);
                }
            }

            // INFO: a tool failure explains a broken pipe in a feeder, report it first
            let mut feeder_error = None;
            for feeder in feeders {
                match feeder.join() {
                    Ok(Ok(lines)) => log::debug!("DEBUG: pipe transform moved {} lines", lines),
                    Ok(Err(e)) => feeder_error = feeder_error.or(Some(e)),
                    Err(_) => {
                        feeder_error = feeder_error
                            .or(Some(PipelineError::parse("pipe", "transform thread panicked")))
                    }
                }
            }

            if !failures.is_empty() {
                let idx = failures
                    .iter()
                    .position(|e| matches!(e, PipelineError::ToolFailed { code: Some(_), .. }))
                    .unwrap_or(0);
                return Err(failures.swap_remove(idx));
            }

            match feeder_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })
    }
}

/// A single call seen by the RecordingExecutor
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Probe(Tool),
    Job(Job),
    Pipe(Pipe),
}

/// Stub executor: records every call instead of spawning anything
/// and creates the files each job declares, so downstream steps
/// find what a real tool would have written.
///
/// # Example
///
/// ```rust, no_run
/// let mut executor = RecordingExecutor::new();
/// core::run(&config, &mut executor)?;
///
/// assert_eq!(executor.count(Tool::Rsem), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingExecutor {
    pub calls: Vec<Call>,
    pub materialize: bool,
    pub fail_on: Option<(Tool, i32)>,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            materialize: true,
            fail_on: None,
        }
    }

    /// Make every job of `tool` exit with `code`
    pub fn failing(tool: Tool, code: i32) -> Self {
        Self {
            fail_on: Some((tool, code)),
            ..Self::new()
        }
    }

    /// Standalone jobs and jobs inside pipes, in call order
    pub fn jobs(&self) -> Vec<&Job> {
        self.calls
            .iter()
            .flat_map(|call| match call {
                Call::Job(job) => vec![job],
                Call::Pipe(pipe) => pipe.jobs().collect(),
                Call::Probe(_) => vec![],
            })
            .collect()
    }

    /// Number of jobs run for a tool
    pub fn count(&self, tool: Tool) -> usize {
        self.jobs().iter().filter(|job| job.tool == tool).count()
    }

    fn check(&self, job: &Job) -> Result<(), PipelineError> {
        match self.fail_on {
            Some((tool, code)) if tool == job.tool => Err(PipelineError::ToolFailed {
                tool,
                cmd: job.cmd(),
                code: Some(code),
            }),
            _ => Ok(()),
        }
    }

    fn touch(&self, job: &Job) -> Result<(), PipelineError> {
        if !self.materialize {
            return Ok(());
        }

        for path in job
            .outputs
            .iter()
            .chain(job.stdout.iter())
            .chain(job.log.iter())
        {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            File::create(path)?;
        }

        Ok(())
    }
}

impl Executor for RecordingExecutor {
    fn probe(&mut self, tool: Tool, _program: &str) -> Result<(), PipelineError> {
        self.calls.push(Call::Probe(tool));
        Ok(())
    }

    fn run(&mut self, job: &Job) -> Result<(), PipelineError> {
        self.calls.push(Call::Job(job.clone()));
        self.check(job)?;
        self.touch(job)
    }

    fn pipe(&mut self, pipe: &Pipe) -> Result<(), PipelineError> {
        self.calls.push(Call::Pipe(pipe.clone()));
        check_pipe(pipe)?;

        for job in pipe.jobs() {
            self.check(job)?;
            self.touch(job)?;
        }

        Ok(())
    }
}

fn command(job: &Job) -> Command {
    let mut cmd = Command::new(&job.program);
    cmd.args(&job.args);

    if let Some(dir) = &job.dir {
        cmd.current_dir(dir);
    }
    for (key, value) in &job.envs {
        cmd.env(key, value);
    }

    cmd
}

fn spawn_error(job: &Job, e: std::io::Error) -> PipelineError {
    match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => PipelineError::ToolNotFound {
            tool: job.tool,
            program: job.program.clone(),
        },
        _ => PipelineError::Io(e),
    }
}

fn check_status(job: &Job, status: ExitStatus) -> Result<(), PipelineError> {
    if status.success() {
        Ok(())
    } else {
        log::error!("ERROR: failed to execute {}", job.cmd());
        Err(PipelineError::ToolFailed {
            tool: job.tool,
            cmd: job.cmd(),
            code: status.code(),
        })
    }
}

/// A pipe starts and ends with a job and never holds two
/// transforms in a row
fn check_pipe(pipe: &Pipe) -> Result<(), PipelineError> {
    let is_job = |stage: Option<&PipeStage>| matches!(stage, Some(PipeStage::Job(_)));

    if !is_job(pipe.stages.first()) || !is_job(pipe.stages.last()) {
        return Err(PipelineError::parse(
            "pipe",
            format!("must start and end with a job: {}", pipe.cmd()),
        ));
    }

    if pipe.stages.windows(2).any(|w| {
        matches!(
            (&w[0], &w[1]),
            (PipeStage::Transform { .. }, PipeStage::Transform { .. })
        )
    }) {
        return Err(PipelineError::parse(
            "pipe",
            format!("consecutive transforms: {}", pipe.cmd()),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ToolPaths;
    use std::io::Read;

    fn tools() -> ToolPaths {
        ToolPaths {
            samtools: "cat".into(),
            ..ToolPaths::default()
        }
    }

    #[test]
    fn test_local_run_redirects_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.txt");
        std::fs::write(dir.path().join("in.txt"), "b\na\n").unwrap();

        let job = Job::task(Tool::Sort, &tools())
            .path(dir.path().join("in.txt"))
            .stdout(&out);
        LocalExecutor::new().run(&job).unwrap();

        assert_eq!(std::fs::read_to_string(out).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_local_run_reports_exit_code() {
        let tools = ToolPaths {
            sort: "false".into(),
            ..ToolPaths::default()
        };
        let err = LocalExecutor::new()
            .run(&Job::task(Tool::Sort, &tools))
            .unwrap_err();

        assert_eq!(err.exit_code(), 1);
        assert!(matches!(err, PipelineError::ToolFailed { code: Some(1), .. }));
    }

    #[test]
    fn test_missing_tool_is_not_found() {
        let tools = ToolPaths {
            star: "definitely-not-a-real-star-binary".into(),
            ..ToolPaths::default()
        };
        let mut executor = LocalExecutor::new();

        assert!(matches!(
            executor.probe(Tool::Star, &tools.star),
            Err(PipelineError::ToolNotFound { .. })
        ));
        assert!(matches!(
            executor.run(&Job::task(Tool::Star, &tools)),
            Err(PipelineError::ToolNotFound { .. })
        ));
    }

    #[test]
    fn test_local_pipe_join_sort_split_keeps_mates_together() {
        let dir = tempfile::tempdir().unwrap();
        let records = dir.path().join("records.sam");
        let header = dir.path().join("header.sam");
        let out = dir.path().join("out.sam");

        std::fs::write(&header, "@HD\tVN:1.4\n").unwrap();
        std::fs::write(
            &records,
            "r3\t99\tT1\nr3\t147\tT1\nr1\t99\tT2\nr1\t147\tT2\nr2\t83\tT1\nr2\t163\tT1\n",
        )
        .unwrap();

        let tools = tools();
        let pipe = Pipe::new()
            .job(Job::task(Tool::Samtools, &tools).path(&records))
            .transform(Transform::JoinMates, None)
            .job(Job::task(Tool::Sort, &tools).env("LC_ALL", "C"))
            .transform(Transform::SplitMates, Some(header.clone()))
            .job(Job::task(Tool::Samtools, &tools).stdout(&out));

        LocalExecutor::new().pipe(&pipe).unwrap();

        let mut contents = String::new();
        File::open(&out)
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();

        assert_eq!(
            contents,
            "@HD\tVN:1.4\nr1\t99\tT2\nr1\t147\tT2\nr2\t83\tT1\nr2\t163\tT1\nr3\t99\tT1\nr3\t147\tT1\n"
        );
    }

    #[test]
    fn test_local_pipe_propagates_failure() {
        let tools = ToolPaths {
            sort: "false".into(),
            samtools: "cat".into(),
            ..ToolPaths::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.txt");
        std::fs::write(&input, "a\n").unwrap();

        let pipe = Pipe::new()
            .job(Job::task(Tool::Samtools, &tools).path(&input))
            .transform(Transform::Passthrough, None)
            .job(Job::task(Tool::Sort, &tools))
            .job(Job::task(Tool::Samtools, &tools).stdout(dir.path().join("out.txt")));

        let err = LocalExecutor::new().pipe(&pipe).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ToolFailed {
                tool: Tool::Sort,
                ..
            }
        ));
    }

    #[test]
    fn test_malformed_pipes_are_rejected() {
        let tools = tools();
        let pipe = Pipe::new()
            .transform(Transform::Passthrough, None)
            .job(Job::task(Tool::Sort, &tools));
        assert!(check_pipe(&pipe).is_err());

        let pipe = Pipe::new()
            .job(Job::task(Tool::Sort, &tools))
            .transform(Transform::JoinMates, None)
            .transform(Transform::SplitMates, None)
            .job(Job::task(Tool::Sort, &tools));
        assert!(check_pipe(&pipe).is_err());
    }

    #[test]
    fn test_recording_executor_materializes_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let bam = dir.path().join("nested").join("x.bam");
        let log = dir.path().join("x.log");

        let mut executor = RecordingExecutor::new();
        executor
            .run(&Job::task(Tool::Star, &tools()).output(&bam).log(&log))
            .unwrap();

        assert!(bam.exists() && log.exists());
        assert_eq!(executor.count(Tool::Star), 1);
    }

    #[test]
    fn test_recording_executor_fails_on_tool() {
        let mut executor = RecordingExecutor::failing(Tool::Rsem, 3);
        assert!(executor.run(&Job::task(Tool::Star, &tools())).is_ok());

        let err = executor.run(&Job::task(Tool::Rsem, &tools())).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert_eq!(executor.jobs().len(), 2);
    }
}
