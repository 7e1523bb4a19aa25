use std::path::{Path, PathBuf};

use crate::config::{Tool, ToolPaths};

/// Struct to represent a job to be executed
/// by the pipeline
///
/// Arguments are kept as a list; no shell is involved.
///
/// # Example
///
/// ```rust, no_run
/// use starquant::executor::job::Job;
///
/// let job = Job::task(Tool::Samtools, &tools)
///     .arg("view")
///     .args(["-H", "in.bam"])
///     .stdout("header.sam");
///
/// assert_eq!(job.cmd(), "samtools view -H in.bam > header.sam");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub tool: Tool,
    pub program: String,
    pub args: Vec<String>,
    pub dir: Option<PathBuf>,
    pub envs: Vec<(String, String)>,
    pub stdout: Option<PathBuf>,
    pub log: Option<PathBuf>,
    pub outputs: Vec<PathBuf>,
}

impl Job {
    /// Create a new job for a tool, resolving its executable
    /// from the configured tool paths
    ///
    /// # Example
    ///
    /// ```rust, no_run
    /// let job = Job::task(Tool::Star, &ToolPaths::default());
    ///
    /// assert_eq!(job.cmd(), "STAR");
    /// ```
    pub fn task(tool: Tool, tools: &ToolPaths) -> Self {
        Self {
            tool,
            program: tools.get(tool).to_string(),
            args: Vec::new(),
            dir: None,
            envs: Vec::new(),
            stdout: None,
            log: None,
            outputs: Vec::new(),
        }
    }

    /// Add an argument to the job
    pub fn arg<S: ToString>(mut self, arg: S) -> Self {
        self.args.push(arg.to_string());
        self
    }

    /// Add multiple arguments to the job
    ///
    /// # Example
    ///
    /// ```rust, no_run
    /// let job = Job::task(Tool::Star, &tools)
    ///     .args(["--runThreadN", "10"]);
    ///
    /// assert_eq!(job.cmd(), "STAR --runThreadN 10");
    /// ```
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: ToString,
    {
        self.args.extend(args.into_iter().map(|a| a.to_string()));
        self
    }

    /// Add a path argument to the job
    pub fn path<P: AsRef<Path>>(self, path: P) -> Self {
        let path = path.as_ref().to_string_lossy().into_owned();
        self.arg(path)
    }

    pub fn current_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn env<K: ToString, V: ToString>(mut self, key: K, value: V) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    /// Redirect stdout to a file
    pub fn stdout<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.stdout = Some(path.as_ref().to_path_buf());
        self
    }

    /// Redirect both stdout and stderr to a single file
    pub fn log<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.log = Some(path.as_ref().to_path_buf());
        self
    }

    /// Declare a file this job is expected to produce
    pub fn output<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.outputs.push(path.as_ref().to_path_buf());
        self
    }

    /// Declare multiple files this job is expected to produce
    pub fn outputs<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.outputs
            .extend(paths.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    /// Shell-like rendering of the job, used for logs and errors
    pub fn cmd(&self) -> String {
        let mut cmd = self
            .envs
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .chain(std::iter::once(self.program.clone()))
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ");

        if let Some(out) = &self.stdout {
            cmd.push_str(&format!(" > {}", out.display()));
        }
        if let Some(log) = &self.log {
            cmd.push_str(&format!(" >& {}", log.display()));
        }

        cmd
    }
}

impl std::fmt::Display for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cmd())
    }
}

/// In-process line transforms that can sit between two jobs of a pipe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Join each two consecutive records into one line
    JoinMates,
    /// Split joined lines back into two records
    SplitMates,
    /// Copy lines unchanged
    Passthrough,
}

impl std::fmt::Display for Transform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Transform::JoinMates => "join-mates",
            Transform::SplitMates => "split-mates",
            Transform::Passthrough => "passthrough",
        };
        write!(f, "{}", name)
    }
}

/// A single stage in a pipe
#[derive(Debug, Clone, PartialEq)]
pub enum PipeStage {
    Job(Job),
    /// A transform, optionally emitting the contents of `header` first
    Transform {
        transform: Transform,
        header: Option<PathBuf>,
    },
}

/// A chain of jobs connected stdout -> stdin, with in-process
/// transforms allowed between two jobs.
///
/// # Example
///
/// ```rust, no_run
/// let pipe = Pipe::new()
///     .job(Job::task(Tool::Samtools, &tools).args(["view", "in.bam"]))
///     .transform(Transform::JoinMates, None)
///     .job(Job::task(Tool::Sort, &tools))
///     .transform(Transform::SplitMates, Some("header.sam".into()))
///     .job(Job::task(Tool::Samtools, &tools).args(["view", "-b", "-o", "out.bam", "-"]));
///
/// assert_eq!(
///     pipe.cmd(),
///     "samtools view in.bam | join-mates | sort | split-mates (header.sam) | samtools view -b -o out.bam -"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pipe {
    pub stages: Vec<PipeStage>,
}

impl Pipe {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    pub fn job(mut self, job: Job) -> Self {
        self.stages.push(PipeStage::Job(job));
        self
    }

    pub fn transform(mut self, transform: Transform, header: Option<PathBuf>) -> Self {
        self.stages
            .push(PipeStage::Transform { transform, header });
        self
    }

    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.stages.iter().filter_map(|stage| match stage {
            PipeStage::Job(job) => Some(job),
            PipeStage::Transform { .. } => None,
        })
    }

    /// Files the pipe is expected to produce
    pub fn outputs(&self) -> Vec<PathBuf> {
        self.jobs().flat_map(|job| job.outputs.clone()).collect()
    }

    pub fn cmd(&self) -> String {
        self.stages
            .iter()
            .map(|stage| match stage {
                PipeStage::Job(job) => job.cmd(),
                PipeStage::Transform {
                    transform,
                    header: Some(header),
                } => format!("{} ({})", transform, header.display()),
                PipeStage::Transform { transform, .. } => transform.to_string(),
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

impl std::fmt::Display for Pipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.cmd())
    }
}
