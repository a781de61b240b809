use crate::gateway::{Invocation, ProcessGateway};
use crate::RuntimeError;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Scripted answer for invocations matching a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Stdout(String),
    Fail(String),
}

/// One recorded gateway call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Output(Invocation),
    Attached(Invocation),
    Pipe(Invocation, Invocation),
}

impl Call {
    pub fn render(&self) -> String {
        match self {
            Call::Output(inv) | Call::Attached(inv) => inv.to_string(),
            Call::Pipe(sender, receiver) => format!("{sender} | {receiver}"),
        }
    }
}

struct Rule {
    program: String,
    prefix: Vec<String>,
    reply: Reply,
}

impl Rule {
    fn matches(&self, invocation: &Invocation) -> bool {
        let program_matches = invocation.program == self.program
            || Path::new(&invocation.program)
                .file_name()
                .is_some_and(|n| n == self.program.as_str());
        program_matches && invocation.args.starts_with(&self.prefix)
    }
}

struct MockState {
    rules: Vec<Rule>,
    calls: Vec<Call>,
    privileged: bool,
    hosts: HashMap<String, Ipv4Addr>,
}

/// In-memory gateway for tests. Every call is recorded; replies come from
/// rules matched on program name and leading arguments, latest rule first.
/// Unmatched invocations succeed with empty output.
pub struct MockGateway {
    state: Mutex<MockState>,
}

impl Default for MockGateway {
    fn default() -> Self {
        Self {
            state: Mutex::new(MockState {
                rules: Vec::new(),
                calls: Vec::new(),
                privileged: true,
                hosts: HashMap::new(),
            }),
        }
    }
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn add_rule(&self, program: &str, prefix: &[&str], reply: Reply) {
        self.lock().rules.push(Rule {
            program: program.to_owned(),
            prefix: prefix.iter().map(|s| (*s).to_owned()).collect(),
            reply,
        });
    }

    /// Answer `program prefix...` with `stdout`.
    pub fn respond(&self, program: &str, prefix: &[&str], stdout: &str) {
        self.add_rule(program, prefix, Reply::Stdout(stdout.to_owned()));
    }

    /// Fail `program prefix...` with `stderr`.
    pub fn fail(&self, program: &str, prefix: &[&str], stderr: &str) {
        self.add_rule(program, prefix, Reply::Fail(stderr.to_owned()));
    }

    pub fn set_privileged(&self, privileged: bool) {
        self.lock().privileged = privileged;
    }

    pub fn add_host(&self, name: &str, ip: Ipv4Addr) {
        self.lock().hosts.insert(name.to_owned(), ip);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Recorded calls rendered as command lines.
    pub fn commands(&self) -> Vec<String> {
        self.lock().calls.iter().map(Call::render).collect()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn reply_for(&self, invocation: &Invocation) -> Option<Reply> {
        self.lock()
            .rules
            .iter()
            .rev()
            .find(|r| r.matches(invocation))
            .map(|r| r.reply.clone())
    }

    fn run(&self, invocation: &Invocation) -> Result<Vec<u8>, RuntimeError> {
        match self.reply_for(invocation) {
            Some(Reply::Stdout(out)) => Ok(out.into_bytes()),
            Some(Reply::Fail(detail)) => Err(RuntimeError::CommandFailed {
                command: invocation.to_string(),
                detail,
            }),
            None => Ok(Vec::new()),
        }
    }
}

impl ProcessGateway for MockGateway {
    fn output(&self, invocation: &Invocation) -> Result<Vec<u8>, RuntimeError> {
        self.lock().calls.push(Call::Output(invocation.clone()));
        self.run(invocation)
    }

    fn attached(&self, invocation: &Invocation) -> Result<(), RuntimeError> {
        self.lock().calls.push(Call::Attached(invocation.clone()));
        self.run(invocation).map(|_| ())
    }

    fn pipe(&self, sender: &Invocation, receiver: &Invocation) -> Result<(), RuntimeError> {
        self.lock()
            .calls
            .push(Call::Pipe(sender.clone(), receiver.clone()));
        self.run(sender)?;
        let report = self.run(receiver)?;
        if report.is_empty() {
            Ok(())
        } else {
            Err(RuntimeError::PipelineReport(
                String::from_utf8_lossy(&report).trim_end().to_owned(),
            ))
        }
    }

    fn lookup_ipv4(&self, name: &str) -> Option<Ipv4Addr> {
        self.lock().hosts.get(name).copied()
    }

    fn privileged(&self) -> bool {
        self.lock().privileged
    }

    fn settle(&self, _pause: Duration) {}
}
