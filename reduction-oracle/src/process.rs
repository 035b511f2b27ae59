//! Subprocess backend: runs the reduction engine executable.
//!
//! Each query:
//! 1. Writes the basis to a uniquely named file in the scratch directory
//! 2. Invokes `<engine> -a <mode> [-b <beta>] <file>`
//! 3. Parses stdout with the versioned output grammar in [`crate::protocol`]
//!
//! Profile queries chain two invocations: `bkz` produces a reduced basis,
//! which is written to a second file and handed to `gso`. Scratch files are
//! [`NamedTempFile`]s and are removed when the query returns, whatever the
//! outcome.

use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use lattice_core::LatticeBasis;
use tempfile::NamedTempFile;

use crate::codec::encode_basis;
use crate::oracle::{enter_phase, BackendKind, FoundVector, Profile, QueryPhase, ReductionBackend, SvpOutcome};
use crate::protocol::{parse_profile_lines, parse_reduced_basis, parse_svp_output, SvpOutput};
use crate::OracleError;

/// Lines of engine stderr kept in a [`OracleError::ProcessFailure`].
const STDERR_TAIL_LINES: usize = 20;

const SCRATCH_PREFIX: &str = "lattice-basis-";

#[derive(Debug, Clone)]
pub struct ProcessConfig {
    /// Engine executable: a path, or a bare name looked up on `PATH`.
    pub program: PathBuf,
    /// Upper bound on a single engine invocation.
    pub timeout: Duration,
    /// Directory for scratch files. Defaults to the system temp directory.
    pub scratch_dir: Option<PathBuf>,
    pub poll_interval: Duration,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            program: PathBuf::from("fplll"),
            timeout: Duration::from_secs(600),
            scratch_dir: None,
            poll_interval: Duration::from_millis(20),
        }
    }
}

/// Engine algorithm selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    Svp,
    Bkz { block_size: usize },
    Gso,
}

impl EngineMode {
    pub fn args(&self) -> Vec<String> {
        match self {
            EngineMode::Svp => vec!["-a".into(), "svp".into()],
            EngineMode::Bkz { block_size } => {
                vec!["-a".into(), "bkz".into(), "-b".into(), block_size.to_string()]
            }
            EngineMode::Gso => vec!["-a".into(), "gso".into()],
        }
    }
}

/// Find the engine executable, either at an explicit path or on `PATH`.
pub fn resolve_program(program: &Path) -> Result<PathBuf, OracleError> {
    if program.as_os_str().is_empty() {
        return Err(OracleError::BackendUnavailable("no engine program configured".into()));
    }
    if program.components().count() > 1 || program.is_absolute() {
        if program.is_file() {
            return Ok(program.to_path_buf());
        }
        return Err(OracleError::BackendUnavailable(format!(
            "engine not found at {}",
            program.display()
        )));
    }

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| {
            OracleError::BackendUnavailable(format!("'{}' not found on PATH", program.display()))
        })
}

#[derive(Debug, Clone)]
pub struct ProcessBackend {
    program: PathBuf,
    config: ProcessConfig,
}

impl ProcessBackend {
    /// Resolve the engine up front so a missing install is reported before any
    /// query runs.
    pub fn new(config: ProcessConfig) -> Result<Self, OracleError> {
        let program = resolve_program(&config.program)?;
        log::debug!("process backend: engine at {}", program.display());
        Ok(Self { program, config })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn write_scratch(&self, basis: &LatticeBasis) -> Result<NamedTempFile, OracleError> {
        let serialization = |e: io::Error| OracleError::SerializationFailure(e.to_string());
        let mut builder = tempfile::Builder::new();
        builder.prefix(SCRATCH_PREFIX).suffix(".txt");
        let mut file = match &self.config.scratch_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(serialization)?;
        file.write_all(encode_basis(basis).as_bytes()).map_err(serialization)?;
        file.flush().map_err(serialization)?;
        Ok(file)
    }

    /// Run the engine on `input` and return its stdout.
    fn run(&self, mode: EngineMode, input: &Path) -> Result<String, OracleError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(mode.args())
            .arg(input)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Own process group, so a timeout can take down anything the engine forks.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        log::info!("invoking {} {:?}", self.program.display(), mode);
        log::debug!("engine args: {:?} {}", mode.args(), input.display());

        let mut child = cmd.spawn().map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => OracleError::BackendUnavailable(
                format!("cannot execute {}: {}", self.program.display(), e),
            ),
            _ => OracleError::ProcessFailure {
                status: "spawn failed".into(),
                stderr: e.to_string(),
            },
        })?;

        // Drain both pipes while polling; a full pipe would stall the engine.
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = self.wait_with_timeout(&mut child)?;
        let stdout = join(stdout);
        let stderr = join(stderr);

        log::debug!(
            "engine stdout ({} bytes), stderr ({} bytes)",
            stdout.len(),
            stderr.len()
        );

        if !status.success() {
            let status = describe(status);
            log::warn!("engine {:?} failed: {}", mode, status);
            return Err(OracleError::ProcessFailure {
                status,
                stderr: tail(&stderr, STDERR_TAIL_LINES),
            });
        }
        Ok(stdout)
    }

    fn wait_with_timeout(&self, child: &mut Child) -> Result<ExitStatus, OracleError> {
        let start = Instant::now();
        loop {
            match poll_exit(child) {
                Ok(Some(status)) => return Ok(status),
                Ok(None) => {
                    if start.elapsed() > self.config.timeout {
                        log::warn!("engine timed out after {:?}, killing process group", self.config.timeout);
                        kill_group(child);
                        let _ = child.kill();
                        let _ = child.wait();
                        return Err(OracleError::Timeout(self.config.timeout));
                    }
                    thread::sleep(self.config.poll_interval);
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(OracleError::ProcessFailure {
                        status: "wait failed".into(),
                        stderr: e.to_string(),
                    });
                }
            }
        }
    }
}

fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Option<JoinHandle<String>> {
    pipe.map(|mut pipe| {
        thread::spawn(move || {
            let mut bytes = Vec::new();
            let _ = pipe.read_to_end(&mut bytes);
            String::from_utf8_lossy(&bytes).into_owned()
        })
    })
}

fn join(reader: Option<JoinHandle<String>>) -> String {
    reader.and_then(|h| h.join().ok()).unwrap_or_default()
}

#[cfg(unix)]
fn kill_group(child: &Child) {
    let pid = child.id() as libc::pid_t;
    // SAFETY: signals only the process group created for this child.
    unsafe {
        libc::kill(-pid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_child: &Child) {}

/// Reap the engine once it has exited, sweeping its process group first.
///
/// The exited leader stays a zombie until reaped, which keeps its pid (and so
/// the group id) from being handed to another process before the sweep.
#[cfg(target_os = "linux")]
fn poll_exit(child: &mut Child) -> io::Result<Option<ExitStatus>> {
    // SAFETY: zeroed siginfo_t is a valid out-parameter for waitid.
    let mut info: libc::siginfo_t = unsafe { std::mem::zeroed() };
    // SAFETY: inspects only this child; WNOWAIT leaves it for Child::wait to reap.
    let rc = unsafe {
        libc::waitid(
            libc::P_PID,
            child.id() as libc::id_t,
            &mut info,
            libc::WEXITED | libc::WNOHANG | libc::WNOWAIT,
        )
    };
    if rc == -1 {
        return Err(io::Error::last_os_error());
    }
    // si_pid stays zero while the child is still running.
    // SAFETY: waitid filled a SIGCHLD siginfo.
    if unsafe { info.si_pid() } == 0 {
        return Ok(None);
    }
    kill_group(child);
    child.wait().map(Some)
}

// Without WNOWAIT the child is reaped first; stragglers in its group are left
// alone rather than risk signalling a recycled group id.
#[cfg(not(target_os = "linux"))]
fn poll_exit(child: &mut Child) -> io::Result<Option<ExitStatus>> {
    child.try_wait()
}

fn describe(status: ExitStatus) -> String {
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return format!("killed by signal {}", signal);
        }
    }
    match status.code() {
        Some(code) => format!("exit status {}", code),
        None => "terminated abnormally".into(),
    }
}

fn tail(text: &str, lines: usize) -> String {
    let all: Vec<&str> = text.lines().collect();
    all[all.len().saturating_sub(lines)..].join("\n")
}

impl ReductionBackend for ProcessBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Process
    }

    fn shortest_vector(&self, basis: &LatticeBasis, radius: f64) -> Result<SvpOutcome, OracleError> {
        enter_phase(self.kind(), QueryPhase::Serializing);
        let input = self.write_scratch(basis)?;

        enter_phase(self.kind(), QueryPhase::Invoking);
        let stdout = self.run(EngineMode::Svp, input.path())?;

        enter_phase(self.kind(), QueryPhase::Parsing);
        match parse_svp_output(&stdout)? {
            SvpOutput::Found(report) if report.squared_norm <= radius * radius => {
                log::debug!("engine reported {:?} output", report.shape);
                Ok(SvpOutcome::Found(FoundVector {
                    vector: report.vector,
                    squared_norm: report.squared_norm,
                }))
            }
            _ => Ok(SvpOutcome::NotFoundWithinRadius { radius }),
        }
    }

    fn reduced_profile(&self, basis: &LatticeBasis, block_size: usize) -> Result<Profile, OracleError> {
        enter_phase(self.kind(), QueryPhase::Serializing);
        let input = self.write_scratch(basis)?;

        enter_phase(self.kind(), QueryPhase::Invoking);
        let stdout = self.run(EngineMode::Bkz { block_size }, input.path())?;

        enter_phase(self.kind(), QueryPhase::Parsing);
        let reduced = parse_reduced_basis(&stdout, basis.rank())?;

        enter_phase(self.kind(), QueryPhase::Serializing);
        let reduced_input = self.write_scratch(&reduced)?;

        enter_phase(self.kind(), QueryPhase::Invoking);
        let stdout = self.run(EngineMode::Gso, reduced_input.path())?;

        enter_phase(self.kind(), QueryPhase::Parsing);
        Ok(Profile::new(parse_profile_lines(&stdout, basis.rank())?))
    }
}
