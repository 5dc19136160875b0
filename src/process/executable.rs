/*!
 * Executable
 *
 * Launches a program file as a child process: in place, detached, with
 * captured output or with its standard streams redirected to files.
 */

use super::handle::Process;
use super::launch::{command_line, ChildStdio, LaunchPlan};
use super::pipes::PipeTriple;
use super::signals::launch_lock;
use crate::core::errors::{SystemError, SystemResult};
use crate::core::limits::{SHELL_COMMAND, SHELL_COMMAND_PARAM};
use crate::core::types::EnvMap;
use crate::fs::{Descriptor, File};
use nix::fcntl::OFlag;
use nix::sys::stat::Mode;
use std::convert::Infallible;
use std::path::PathBuf;
use tracing::{debug, info};

/// A program on disk
///
/// Argument 0 of every launch is the full path of the program; parameters
/// follow in order. The `*_with_env` variants hand the child exactly the
/// given environment and leave the caller's own untouched.
///
/// # Example
///
/// ```no_run
/// use posix_system::process::Executable;
///
/// let out = Executable::new("/bin/echo").pipe_in(&["hello"])?;
/// assert_eq!(out, "hello\n");
/// # Ok::<(), posix_system::SystemError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    file: File,
}

impl Executable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file: File::new(path),
        }
    }

    pub fn from_file(file: File) -> Self {
        Self { file }
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    pub fn full_name(&self) -> String {
        self.file.full_name()
    }

    /// Path and parameters joined by single spaces
    pub fn command_line<S: AsRef<str>>(&self, params: &[S]) -> String {
        command_line(&self.full_name(), params)
    }

    /// Run `command` through `/bin/sh -c` and capture its stdout
    pub fn system(command: &str) -> SystemResult<String> {
        Executable::new(SHELL_COMMAND).pipe_in(&[SHELL_COMMAND_PARAM, command])
    }

    /// Replace the current process image
    ///
    /// Returns only when exec fails.
    pub fn exec<S: AsRef<str>>(&self, params: &[S]) -> SystemResult<Infallible> {
        let plan = self.plan(params, None)?;
        Err(plan.replace_current())
    }

    /// Replace the current process image with `env` as its whole environment
    pub fn exec_with_env<S: AsRef<str>>(
        &self,
        params: &[S],
        env: &EnvMap,
    ) -> SystemResult<Infallible> {
        let plan = self.plan(params, Some(env))?;
        Err(plan.replace_current())
    }

    /// Launch with inherited streams; the caller owns joining the child
    pub fn start<S: AsRef<str>>(&self, params: &[S]) -> SystemResult<Process> {
        self.launch(params, None, false)
    }

    pub fn start_with_env<S: AsRef<str>>(
        &self,
        params: &[S],
        env: &EnvMap,
    ) -> SystemResult<Process> {
        self.launch(params, Some(env), false)
    }

    /// Launch a child that is never reaped by this process
    ///
    /// SIGCHLD is set to ignored process-wide and stays that way, so the
    /// kernel discards exit statuses of every later child as well; joining
    /// them fails with ECHILD.
    pub fn start_and_forget<S: AsRef<str>>(&self, params: &[S]) -> SystemResult<Process> {
        self.launch(params, None, true)
    }

    /// Run to completion and return the captured stdout
    ///
    /// The child reads end-of-stream on stdin. A non-zero exit becomes
    /// `ExecutionFailed` carrying the command line, the status and the
    /// captured stderr. The child is joined before its pipes are drained,
    /// so output beyond the pipe capacity blocks it.
    pub fn pipe_in<S: AsRef<str>>(&self, params: &[S]) -> SystemResult<String> {
        self.capture(params, None)
    }

    pub fn pipe_in_with_env<S: AsRef<str>>(
        &self,
        params: &[S],
        env: &EnvMap,
    ) -> SystemResult<String> {
        self.capture(params, Some(env))
    }

    /// Launch with stdin, stdout and stderr redirected to files
    ///
    /// `input` is opened read-only; `output` and `error` are opened
    /// write-only and created with `perm` when missing. Any open failure
    /// aborts before fork.
    pub fn pipe_out<S: AsRef<str>>(
        &self,
        params: &[S],
        input: &File,
        output: &File,
        error: &File,
        perm: Mode,
    ) -> SystemResult<Process> {
        self.redirect(params, None, [input, output, error], perm)
    }

    pub fn pipe_out_with_env<S: AsRef<str>>(
        &self,
        params: &[S],
        env: &EnvMap,
        input: &File,
        output: &File,
        error: &File,
        perm: Mode,
    ) -> SystemResult<Process> {
        self.redirect(params, Some(env), [input, output, error], perm)
    }

    fn plan<S: AsRef<str>>(&self, params: &[S], env: Option<&EnvMap>) -> SystemResult<LaunchPlan> {
        LaunchPlan::new(&self.full_name(), params, env)
    }

    fn launch<S: AsRef<str>>(
        &self,
        params: &[S],
        env: Option<&EnvMap>,
        forget: bool,
    ) -> SystemResult<Process> {
        let plan = self.plan(params, env)?;
        let _lock = launch_lock();
        plan.fork(&ChildStdio::Inherit, forget)
    }

    fn capture<S: AsRef<str>>(&self, params: &[S], env: Option<&EnvMap>) -> SystemResult<String> {
        let plan = self.plan(params, env)?;

        let (process, mut parent) = {
            let _lock = launch_lock();
            let (child, parent) = PipeTriple::open()?.split();
            let process = plan.fork(&child.stdio()?, false)?;
            child.close();
            (process, parent)
        };

        parent.stdin.close_safe();
        let status = process.join(false);
        let (out, err) = parent.drain()?;
        let status = status?;

        debug!(
            pid = process.raw_pid(),
            status,
            stdout_bytes = out.len(),
            stderr_bytes = err.len(),
            "captured output drained"
        );

        if status == 0 {
            Ok(String::from_utf8_lossy(&out).into_owned())
        } else {
            Err(SystemError::ExecutionFailed {
                command: plan.command_line().to_string(),
                status,
                stderr: String::from_utf8_lossy(&err).into_owned(),
            })
        }
    }

    fn redirect<S: AsRef<str>>(
        &self,
        params: &[S],
        env: Option<&EnvMap>,
        [input, output, error]: [&File; 3],
        perm: Mode,
    ) -> SystemResult<Process> {
        let plan = self.plan(params, env)?;
        let _lock = launch_lock();

        let reading = Descriptor::flags(true, false) | OFlag::O_CLOEXEC;
        let writing = Descriptor::flags(false, true) | OFlag::O_CLOEXEC;
        let mut stdin = Descriptor::open(input, reading, perm)?;
        let mut stdout = Descriptor::open(output, writing, perm)?;
        let mut stderr = Descriptor::open(error, writing, perm)?;

        let process = plan.fork(&ChildStdio::redirect(&stdin, &stdout, &stderr)?, false)?;
        for descriptor in [&mut stdin, &mut stdout, &mut stderr] {
            descriptor.close_safe();
        }

        info!(
            pid = process.raw_pid(),
            input = %input,
            output = %output,
            error = %error,
            "process streams redirected"
        );
        Ok(process)
    }
}

impl From<File> for Executable {
    fn from(file: File) -> Self {
        Self::from_file(file)
    }
}
