use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::process::{Child, Stdio};

use os_pipe::{PipeReader, pipe};
use thiserror::Error;

use crate::builtins::{self, BuiltinError};
use crate::context::ShellContext;
use crate::parser::{Command, Pipeline};

/// Permission bits for files created by output redirection, subject to the
/// process umask.
const REDIR_CREATE_MODE: u32 = 0o664;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("Failed to open file for redirection")]
    RedirectFile(#[source] io::Error),
    #[error(transparent)]
    Builtin(#[from] BuiltinError),
    /// fork/exec/wait failure, carrying the underlying errno.
    #[error("{0}")]
    Sys(io::Error),
}

/// What running a pipeline produced.
#[derive(Debug, PartialEq)]
pub struct ExecOutcome {
    /// Pid of the detached child when the pipeline ran in the background.
    pub bg_pid: Option<u32>,
}

impl ExecOutcome {
    fn foreground() -> Self {
        ExecOutcome { bg_pid: None }
    }
}

/// Run a parsed pipeline. Builtins are checked first (single-stage pipelines
/// only), then external programs are spawned.
pub fn execute(pipeline: &Pipeline, ctx: &mut ShellContext) -> Result<ExecOutcome, ExecError> {
    let commands = &pipeline.commands;

    if commands.len() == 1 {
        let cmd = &commands[0];
        if builtins::is_builtin(&cmd.argv[0]) {
            builtins::run(cmd, ctx)?;
            return Ok(ExecOutcome::foreground());
        }
        return exec_single(cmd);
    }

    exec_multi(commands)
}

// ── Single-stage execution ────────────────────────────────────────────────────

fn exec_single(cmd: &Command) -> Result<ExecOutcome, ExecError> {
    let stdin = file_or_inherit(open_input(cmd)?);
    let stdout = file_or_inherit(open_output(cmd)?);

    // std's spawn performs the fork/exec errno handshake over an internal
    // close-on-exec pipe, so a post-fork exec failure (command not found,
    // permission denied) surfaces here with the child-side errno.
    let mut child = spawn(cmd, stdin, stdout)?;

    if cmd.in_bg {
        // The main loop reaps the child between prompts via waitpid(-1).
        return Ok(ExecOutcome {
            bg_pid: Some(child.id()),
        });
    }

    // Foreground: block until the child finishes; its exit status is not
    // surfaced anywhere.
    child.wait().map_err(ExecError::Sys)?;
    Ok(ExecOutcome::foreground())
}

// ── Multi-stage execution ─────────────────────────────────────────────────────

/// Run a pipeline of two or more stages.
///
/// Stages are spawned left to right, each one's stdout feeding the next one's
/// stdin through a fresh pipe. Outer redirections attach to the first stage's
/// stdin and the last stage's stdout. The parent holds no pipe end once a
/// stage is spawned, and always reaps every child it managed to spawn, so a
/// mid-pipeline failure leaks neither descriptors nor zombies.
fn exec_multi(commands: &[Command]) -> Result<ExecOutcome, ExecError> {
    let mut infile = open_input(&commands[0])?;
    let mut outfile = open_output(&commands[commands.len() - 1])?;

    let mut children: Vec<Child> = Vec::new();
    let mut prev_pipe: Option<PipeReader> = None;

    for (idx, cmd) in commands.iter().enumerate() {
        let is_last = idx + 1 == commands.len();

        let stdin = match prev_pipe.take() {
            Some(reader) => Stdio::from(reader),
            None => file_or_inherit(infile.take()),
        };
        let stdout = if is_last {
            file_or_inherit(outfile.take())
        } else {
            let (reader, writer) = match pipe() {
                Ok(ends) => ends,
                Err(e) => {
                    wait_children(children);
                    return Err(ExecError::Sys(e));
                }
            };
            prev_pipe = Some(reader);
            // The writer is consumed by the spawn below and closed in the
            // parent with it, so the downstream reader sees EOF once the
            // stage exits.
            Stdio::from(writer)
        };

        match spawn(cmd, stdin, stdout) {
            Ok(child) => children.push(child),
            Err(e) => {
                wait_children(children);
                return Err(e);
            }
        }
    }

    // Reap exactly as many children as were spawned; order is irrelevant and
    // exit statuses are not surfaced.
    let mut first_err = None;
    for mut child in children {
        if let Err(e) = child.wait() {
            first_err.get_or_insert(e);
        }
    }
    match first_err {
        Some(e) => Err(ExecError::Sys(e)),
        None => Ok(ExecOutcome::foreground()),
    }
}

// ── Spawn helpers ─────────────────────────────────────────────────────────────

fn spawn(cmd: &Command, stdin: Stdio, stdout: Stdio) -> Result<Child, ExecError> {
    std::process::Command::new(&cmd.argv[0])
        .args(&cmd.argv[1..])
        .stdin(stdin)
        .stdout(stdout)
        .spawn()
        .map_err(ExecError::Sys)
}

fn open_input(cmd: &Command) -> Result<Option<File>, ExecError> {
    let Some(path) = &cmd.input_file else {
        return Ok(None);
    };
    File::open(path).map(Some).map_err(ExecError::RedirectFile)
}

fn open_output(cmd: &Command) -> Result<Option<File>, ExecError> {
    let Some(path) = &cmd.output_file else {
        return Ok(None);
    };
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(REDIR_CREATE_MODE)
        .open(path)
        .map(Some)
        .map_err(ExecError::RedirectFile)
}

fn file_or_inherit(file: Option<File>) -> Stdio {
    match file {
        Some(f) => Stdio::from(f),
        None => Stdio::inherit(),
    }
}

fn wait_children(children: Vec<Child>) {
    for mut child in children {
        let _ = child.wait();
    }
}
