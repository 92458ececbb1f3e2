//! Shared test helpers for application service tests.
//!
//! Provides cross-platform `exit_status()`, canned `Output` constructors and
//! recording stubs for the ports most services touch.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use crate::application::ports::{ProgressReporter, RemoteShell, ShellConnector};
use crate::domain::{CommandResult, InstanceAddress, ShellError};

/// Build an `ExitStatus` from a logical exit code (cross-platform).
#[cfg(unix)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::unix::process::ExitStatusExt;
    std::process::ExitStatus::from_raw(code << 8)
}

#[cfg(windows)]
pub fn exit_status(code: i32) -> std::process::ExitStatus {
    use std::os::windows::process::ExitStatusExt;
    #[allow(clippy::cast_sign_loss)]
    std::process::ExitStatus::from_raw(code as u32)
}

pub fn ok_output(stdout: &[u8]) -> std::process::Output {
    std::process::Output {
        status: exit_status(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn fail_output(stderr: &[u8]) -> std::process::Output {
    std::process::Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.to_vec(),
    }
}

/// Successful remote result with the given stdout.
pub fn remote_ok(stdout: &str) -> Result<CommandResult, ShellError> {
    Ok(CommandResult {
        stdout: stdout.as_bytes().to_vec(),
        exit_status: Some(0),
        ..CommandResult::default()
    })
}

/// Reporter that records every message.
#[derive(Default)]
pub struct RecordingReporter {
    pub events: RefCell<Vec<String>>,
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.events.borrow_mut().push(format!("step:{message}"));
    }
    fn success(&self, message: &str) {
        self.events.borrow_mut().push(format!("ok:{message}"));
    }
    fn warn(&self, message: &str) {
        self.events.borrow_mut().push(format!("warn:{message}"));
    }
}

/// Script shared between a [`ScriptedConnector`] and the shells it hands out,
/// so tests can inspect it after the shell has been consumed.
#[derive(Default)]
pub struct ShellScript {
    pub replies: RefCell<VecDeque<Result<CommandResult, ShellError>>>,
    pub commands: RefCell<Vec<(String, bool)>>,
    pub closes: Cell<u32>,
}

impl ShellScript {
    pub fn new(replies: Vec<Result<CommandResult, ShellError>>) -> Rc<Self> {
        Rc::new(Self {
            replies: RefCell::new(replies.into()),
            ..Self::default()
        })
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.commands.borrow().iter().map(|(c, _)| c.clone()).collect()
    }
}

/// Remote shell that answers each `execute` from its script.
pub struct ScriptedShell(pub Rc<ShellScript>);

impl RemoteShell for ScriptedShell {
    async fn execute(&self, command: &str, stream: bool) -> Result<CommandResult, ShellError> {
        self.0
            .commands
            .borrow_mut()
            .push((command.to_string(), stream));
        self.0.replies.borrow_mut().pop_front().unwrap_or_else(|| {
            Err(ShellError::Execution {
                reason: format!("unexpected command: {command}"),
            })
        })
    }

    async fn close(&mut self) {
        self.0.closes.set(self.0.closes.get() + 1);
    }
}

/// Connector handing out [`ScriptedShell`]s, or refusing with a network error.
pub struct ScriptedConnector {
    pub script: Rc<ShellScript>,
    pub refuse: bool,
    pub connected_to: RefCell<Vec<String>>,
}

impl ScriptedConnector {
    pub fn new(script: &Rc<ShellScript>) -> Self {
        Self {
            script: Rc::clone(script),
            refuse: false,
            connected_to: RefCell::new(Vec::new()),
        }
    }
}

impl ShellConnector for ScriptedConnector {
    type Shell = ScriptedShell;

    async fn connect(&self, address: &InstanceAddress) -> Result<ScriptedShell, ShellError> {
        let target = address.socket_target(22);
        self.connected_to.borrow_mut().push(target.clone());
        if self.refuse {
            return Err(ShellError::Network {
                addr: target,
                reason: "connection refused".to_string(),
            });
        }
        Ok(ScriptedShell(Rc::clone(&self.script)))
    }
}
