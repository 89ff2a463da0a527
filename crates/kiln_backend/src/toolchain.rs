//! Backend that runs an external compiler as a subprocess.

use std::fs;
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use kiln_common::{Dialect, TargetId};
use kiln_config::ToolchainConfig;
use kiln_diagnostics::parse_toolchain_output;

use crate::backend::{CompileOutput, CompileRequest, CompilerBackend};
use crate::error::CompileError;

/// How often a running compiler is checked for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long output is still collected once the deadline has passed.
const DRAIN_GRACE: Duration = Duration::from_millis(100);

/// Runs a configured compiler command that turns OpenCL C into SPIR-V.
///
/// The source is written to a temporary file; `{input}` and `{output}` in the
/// argument template name that file and the expected output. Caller flags are
/// appended after the template. The compiler's stderr and stdout together
/// form the build log.
#[derive(Debug, Clone)]
pub struct ToolchainBackend {
    program: String,
    args: Vec<String>,
    timeout: Option<Duration>,
    available: OnceLock<bool>,
}

impl ToolchainBackend {
    /// Creates a backend from configuration. A zero timeout disables the limit.
    pub fn new(config: &ToolchainConfig, timeout: Duration) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            timeout: (!timeout.is_zero()).then_some(timeout),
            available: OnceLock::new(),
        }
    }

    /// Builds the argument list for one invocation.
    fn command_args(&self, input: &Path, output: &Path, options: &[String]) -> Vec<String> {
        let input = input.display().to_string();
        let output = output.display().to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{input}", &input).replace("{output}", &output))
            .chain(options.iter().cloned())
            .collect()
    }

    fn run(&self, args: &[String]) -> Result<(ExitStatus, String), CompileError> {
        log::debug!("running {} {}", self.program, args.join(" "));
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        // Own process group, so a timeout also reaches the driver's children.
        #[cfg(unix)]
        std::os::unix::process::CommandExt::process_group(&mut command, 0);
        let mut child = command.spawn().map_err(|e| {
            CompileError::message(format!("failed to launch compiler '{}': {e}", self.program))
        })?;

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let waited = wait_until(&mut child, deadline);
        if !matches!(waited, Ok(Some(_))) {
            kill_tree(&mut child);
        }
        let text = collect_output(&stderr, &stdout, deadline);

        match waited {
            Ok(Some(status)) => Ok((status, text)),
            Ok(None) => {
                let secs = self.timeout.map_or(0.0, |t| t.as_secs_f64());
                Err(CompileError::aborted(
                    format!("compilation timed out after {secs}s"),
                    &text,
                ))
            }
            Err(e) => Err(CompileError::aborted(
                format!("failed to wait for compiler '{}': {e}", self.program),
                &text,
            )),
        }
    }
}

impl CompilerBackend for ToolchainBackend {
    fn name(&self) -> &str {
        "toolchain"
    }

    fn supports(&self, dialect: Dialect, target: &TargetId) -> bool {
        dialect == Dialect::OpenCl && target.consumes_spirv()
    }

    fn identity(&self) -> String {
        format!("toolchain:{} {}", self.program, self.args.join(" "))
    }

    /// Probes `<program> --version` once and remembers the answer.
    fn is_available(&self) -> bool {
        *self.available.get_or_init(|| {
            let ok = Command::new(&self.program)
                .arg("--version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|s| s.success())
                .unwrap_or(false);
            log::debug!("toolchain '{}' available: {ok}", self.program);
            ok
        })
    }

    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompileOutput, CompileError> {
        let source = request.source_text()?;
        let dir = tempfile::Builder::new()
            .prefix("kiln")
            .tempdir()
            .map_err(|e| CompileError::message(format!("failed to create work directory: {e}")))?;
        let input = dir.path().join("kernel.cl");
        let output = dir.path().join("kernel.spv");
        fs::write(&input, source).map_err(|e| {
            CompileError::message(format!("failed to write {}: {e}", input.display()))
        })?;

        let args = self.command_args(&input, &output, request.options);
        let (status, text) = self.run(&args)?;

        if !status.success() {
            return Err(match status.code() {
                Some(_) => CompileError::build_failed(&text, parse_toolchain_output(&text)),
                None => CompileError::aborted("compiler terminated abnormally", &text),
            });
        }

        let payload = fs::read(&output).map_err(|e| {
            CompileError::aborted(format!("compiler produced no output: {e}"), &text)
        })?;
        kiln_spirv::parse(&payload).map_err(|e| {
            CompileError::aborted(format!("compiler produced an invalid SPIR-V module: {e}"), &text)
        })?;
        Ok(CompileOutput { payload, log: text })
    }
}

/// Reads a child pipe to the end on a helper thread.
///
/// The thread outlives the call if a descendant keeps the pipe open; its
/// result is then dropped.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> Receiver<String> {
    let (tx, rx) = mpsc::sync_channel(1);
    thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut buf);
        }
        let _ = tx.send(String::from_utf8_lossy(&buf).into_owned());
    });
    rx
}

/// Joins the captured output, waiting for it no later than `deadline` plus a
/// short grace period.
fn collect_output(
    stderr: &Receiver<String>,
    stdout: &Receiver<String>,
    deadline: Option<Instant>,
) -> String {
    let receive = |rx: &Receiver<String>| match deadline {
        None => rx.recv().unwrap_or_default(),
        Some(deadline) => {
            let wait = deadline.saturating_duration_since(Instant::now()).max(DRAIN_GRACE);
            rx.recv_timeout(wait).unwrap_or_default()
        }
    };
    let mut text = receive(stderr);
    let stdout = receive(stdout);
    if !stdout.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stdout);
    }
    text
}

/// Waits for `child` to exit. Returns `Ok(None)` once `deadline` has passed.
fn wait_until(child: &mut Child, deadline: Option<Instant>) -> std::io::Result<Option<ExitStatus>> {
    let Some(deadline) = deadline else {
        return child.wait().map(Some);
    };
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(Some(status));
        }
        if Instant::now() >= deadline {
            return Ok(None);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// Kills the compiler and, on Unix, every process in its group.
fn kill_tree(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        let _ = Command::new("kill")
            .args(["-KILL", "--", &group])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();
    }
    let _ = child.kill();
    let _ = child.wait();
}
