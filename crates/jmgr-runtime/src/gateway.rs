//! Every side effect jmgr has on the host goes through a `ProcessGateway`:
//! jails, ZFS, rc.conf and the base system are all driven by running their
//! command line tools.

use crate::RuntimeError;
use std::fmt;
use std::io::Read;
use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::process::{ChildStderr, Command, ExitStatus, Stdio};
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, trace};

/// A program, its arguments, and extra environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.envs(self.env.iter().map(|(k, v)| (k, v)));
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (k, v) in &self.env {
            write!(f, "{k}={v} ")?;
        }
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

pub trait ProcessGateway {
    /// Run to completion and return stdout. A non-zero exit is an error
    /// carrying stderr.
    fn output(&self, invocation: &Invocation) -> Result<Vec<u8>, RuntimeError>;

    /// Run with the caller's terminal attached.
    fn attached(&self, invocation: &Invocation) -> Result<(), RuntimeError>;

    /// Stream `sender`'s stdout into `receiver`'s stdin. Anything the receiver
    /// prints on stdout is treated as a failure report.
    fn pipe(&self, sender: &Invocation, receiver: &Invocation) -> Result<(), RuntimeError>;

    /// Forward lookup of a host name to its first IPv4 address.
    fn lookup_ipv4(&self, name: &str) -> Option<Ipv4Addr> {
        (name, 0)
            .to_socket_addrs()
            .ok()?
            .find_map(|addr| match addr {
                SocketAddr::V4(v4) => Some(*v4.ip()),
                SocketAddr::V6(_) => None,
            })
    }

    /// Whether the caller runs with an effective uid of 0.
    fn privileged(&self) -> bool {
        #[allow(unsafe_code)]
        // SAFETY: geteuid has no preconditions and cannot fail.
        let euid = unsafe { libc::geteuid() };
        euid == 0
    }

    /// Give the kernel time to settle between dependent jail operations.
    fn settle(&self, pause: Duration) {
        std::thread::sleep(pause);
    }
}

/// Gateway backed by `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemGateway;

impl SystemGateway {
    pub fn new() -> Self {
        Self
    }
}

fn spawn_error(invocation: &Invocation) -> impl FnOnce(std::io::Error) -> RuntimeError + '_ {
    move |source| RuntimeError::Spawn {
        command: invocation.to_string(),
        source,
    }
}

fn check_exit(
    invocation: &Invocation,
    status: ExitStatus,
    stderr: &[u8],
) -> Result<(), RuntimeError> {
    if status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(stderr).trim().to_owned();
    let detail = if stderr.is_empty() {
        status.to_string()
    } else {
        stderr
    };
    Err(RuntimeError::CommandFailed {
        command: invocation.to_string(),
        detail,
    })
}

/// Collect a child's stderr on its own thread, concurrently with the stdout
/// drain.
fn drain_stderr(stderr: Option<ChildStderr>) -> JoinHandle<Vec<u8>> {
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut stderr) = stderr {
            let _ = stderr.read_to_end(&mut buf);
        }
        buf
    })
}

fn collected(handle: JoinHandle<Vec<u8>>) -> Vec<u8> {
    handle.join().unwrap_or_default()
}

impl ProcessGateway for SystemGateway {
    fn output(&self, invocation: &Invocation) -> Result<Vec<u8>, RuntimeError> {
        trace!("exec: {invocation}");
        let output = invocation
            .command()
            .stdin(Stdio::null())
            .output()
            .map_err(spawn_error(invocation))?;
        check_exit(invocation, output.status, &output.stderr)?;
        Ok(output.stdout)
    }

    fn attached(&self, invocation: &Invocation) -> Result<(), RuntimeError> {
        debug!("exec (attached): {invocation}");
        let status = invocation
            .command()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(spawn_error(invocation))?;
        if status.success() {
            Ok(())
        } else {
            Err(RuntimeError::CommandFailed {
                command: invocation.to_string(),
                detail: status.to_string(),
            })
        }
    }

    fn pipe(&self, sender: &Invocation, receiver: &Invocation) -> Result<(), RuntimeError> {
        debug!("exec (pipe): {sender} | {receiver}");
        let mut send = sender
            .command()
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_error(sender))?;
        let Some(stream) = send.stdout.take() else {
            let _ = send.kill();
            let _ = send.wait();
            return Err(RuntimeError::ExecFailed(format!(
                "no stdout handle for {sender}"
            )));
        };

        let spawned = receiver
            .command()
            .stdin(Stdio::from(stream))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let mut recv = match spawned {
            Ok(child) => child,
            Err(e) => {
                let _ = send.kill();
                let _ = send.wait();
                return Err(spawn_error(receiver)(e));
            }
        };
        let send_errors = drain_stderr(send.stderr.take());
        let recv_errors = drain_stderr(recv.stderr.take());

        // The receiver must be drained before either process is waited on.
        let mut report = Vec::new();
        if let Some(mut out) = recv.stdout.take() {
            out.read_to_end(&mut report)?;
        }

        let sent = send.wait()?;
        let received = recv.wait()?;
        check_exit(sender, sent, &collected(send_errors))?;
        check_exit(receiver, received, &collected(recv_errors))?;

        if report.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::PipelineReport(
                String::from_utf8_lossy(&report).trim_end().to_owned(),
            ))
        }
    }
}
