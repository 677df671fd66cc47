//! Spawns pipeline stages, wires the inter-stage pipes and redirect
//! targets onto the standard streams, and reaps every child before
//! returning.

use std::ffi::CString;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::Path;
use std::process;

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, dup2, execv, fork, pipe, ForkResult, Pid};

use super::ProcessError;
use crate::core::commands::BuiltinSet;
use crate::core::resolver::{self, Resolution};
use crate::core::state::ShellState;
use crate::flags::Flags;
use crate::parse::{ParsedCommand, Redirect};

/// Fixed, non-executable creation mode for redirect targets.
const REDIRECT_MODE: u32 = 0o644;

/// What a resolved stage will do once spawned.
enum StagePlan<'a> {
    Builtin(&'a str),
    External(CString, Vec<CString>),
}

pub struct PipelineExecutor {
    quiet: bool,
}

impl PipelineExecutor {
    pub fn new(flags: &Flags) -> Self {
        PipelineExecutor {
            quiet: flags.is_set("quiet"),
        }
    }

    /// Runs one parsed pipeline and records the final stage's exit
    /// status in `state.last_status`.
    pub fn run(
        &self,
        stages: &[ParsedCommand],
        builtins: &BuiltinSet,
        state: &mut ShellState,
    ) -> Result<(), ProcessError> {
        match stages {
            [] => Ok(()),
            [single] => self.run_single(single, builtins, state),
            _ => self.run_pipeline(stages, builtins, state),
        }
    }

    /// Single-stage case: a builtin runs in the parent so `cd`,
    /// `history` and `exit` reach the shell's own state; only an
    /// external command is forked.
    fn run_single(
        &self,
        cmd: &ParsedCommand,
        builtins: &BuiltinSet,
        state: &mut ShellState,
    ) -> Result<(), ProcessError> {
        let Some(name) = cmd.name() else {
            state.last_status = touch_targets(cmd);
            return Ok(());
        };

        match resolver::resolve(name) {
            Resolution::Builtin => self.run_parent_builtin(name, cmd, builtins, state),
            Resolution::External(path) => {
                let plan = external_plan(&path, cmd)?;
                io::stdout().flush()?;
                io::stderr().flush()?;
                match unsafe { fork() } {
                    Ok(ForkResult::Parent { child }) => {
                        state.last_status = wait_for(child)?;
                        Ok(())
                    }
                    Ok(ForkResult::Child) => {
                        run_child(&plan, cmd, None, None, &[], builtins, state)
                    }
                    Err(e) => Err(e.into()),
                }
            }
            Resolution::NotFound => {
                println!("{}: command not found", name);
                state.last_status = 127;
                Ok(())
            }
        }
    }

    fn run_parent_builtin(
        &self,
        name: &str,
        cmd: &ParsedCommand,
        builtins: &BuiltinSet,
        state: &mut ShellState,
    ) -> Result<(), ProcessError> {
        let mut out: Box<dyn Write> = match &cmd.stdout_to {
            Some(redirect) => match open_redirect(redirect) {
                Ok(file) => Box::new(file),
                Err(e) => {
                    eprintln!("{}: {}", redirect.path, e);
                    state.last_status = 1;
                    return Ok(());
                }
            },
            None => Box::new(io::stdout()),
        };
        // Opened even though most builtins never write to it; the
        // target file must exist afterwards.
        let mut err_out: Box<dyn Write> = match &cmd.stderr_to {
            Some(redirect) => match open_redirect(redirect) {
                Ok(file) => Box::new(file),
                Err(e) => {
                    eprintln!("{}: {}", redirect.path, e);
                    state.last_status = 1;
                    return Ok(());
                }
            },
            None => Box::new(io::stderr()),
        };

        if let Some(result) = builtins.run(name, cmd, state, &mut out, &mut err_out) {
            state.last_status = result?;
        }
        out.flush()?;
        err_out.flush()?;
        Ok(())
    }

    fn run_pipeline(
        &self,
        stages: &[ParsedCommand],
        builtins: &BuiltinSet,
        state: &mut ShellState,
    ) -> Result<(), ProcessError> {
        let count = stages.len();

        // Unresolvable stages are reported and skipped; their siblings
        // still run against the allocated channels.
        let mut plans = Vec::with_capacity(count);
        for stage in stages {
            plans.push(plan_stage(stage)?);
        }

        let mut channels: Vec<(RawFd, RawFd)> = Vec::with_capacity(count - 1);
        for _ in 1..count {
            match pipe() {
                Ok(channel) => channels.push(channel),
                Err(e) => {
                    close_all(&channels);
                    return Err(e.into());
                }
            }
        }
        let channel_fds: Vec<RawFd> = channels.iter().flat_map(|&(r, w)| [r, w]).collect();

        io::stdout().flush()?;
        io::stderr().flush()?;

        let mut children = Vec::with_capacity(count);
        for (i, stage) in stages.iter().enumerate() {
            let Some(plan) = &plans[i] else { continue };
            let stdin_fd = if i > 0 { Some(channels[i - 1].0) } else { None };
            let stdout_fd = if i < count - 1 {
                Some(channels[i].1)
            } else {
                None
            };
            match unsafe { fork() } {
                Ok(ForkResult::Parent { child }) => children.push(child),
                Ok(ForkResult::Child) => {
                    run_child(plan, stage, stdin_fd, stdout_fd, &channel_fds, builtins, state)
                }
                Err(e) => {
                    if !self.quiet {
                        eprintln!("{}: failed to spawn: {}", stage.name().unwrap_or("?"), e);
                    }
                }
            }
        }

        // The parent never reads or writes the channels itself; closing
        // them here lets downstream readers observe end-of-input once
        // their upstream writer exits.
        close_all(&channels);

        let mut last_status = 0;
        for child in children {
            last_status = wait_for(child)?;
        }
        state.last_status = last_status;
        Ok(())
    }
}

/// Resolves one stage ahead of forking, so "command not found" is
/// reported from the parent and the stage skipped.
fn plan_stage(cmd: &ParsedCommand) -> Result<Option<StagePlan<'_>>, ProcessError> {
    let Some(name) = cmd.name() else {
        return Ok(None);
    };
    match resolver::resolve(name) {
        Resolution::Builtin => Ok(Some(StagePlan::Builtin(name))),
        Resolution::External(path) => external_plan(&path, cmd).map(Some),
        Resolution::NotFound => {
            println!("{}: command not found", name);
            Ok(None)
        }
    }
}

fn external_plan<'a>(path: &Path, cmd: &ParsedCommand) -> Result<StagePlan<'a>, ProcessError> {
    let prog = CString::new(path.as_os_str().as_bytes())
        .map_err(|_| ProcessError::Spawn("command path contains a NUL byte".to_string()))?;
    let mut argv = Vec::with_capacity(cmd.argv.len());
    for arg in &cmd.argv {
        argv.push(
            CString::new(arg.text.as_str())
                .map_err(|_| ProcessError::Spawn("argument contains a NUL byte".to_string()))?,
        );
    }
    Ok(StagePlan::External(prog, argv))
}

/// Runs in the forked child: binds pipe ends, closes every channel
/// descriptor, applies redirect targets, then replaces the image or
/// runs the builtin and exits with its status.
fn run_child(
    plan: &StagePlan<'_>,
    cmd: &ParsedCommand,
    stdin_fd: Option<RawFd>,
    stdout_fd: Option<RawFd>,
    channel_fds: &[RawFd],
    builtins: &BuiltinSet,
    state: &mut ShellState,
) -> ! {
    if let Some(fd) = stdin_fd {
        let _ = dup2(fd, libc::STDIN_FILENO);
    }
    if let Some(fd) = stdout_fd {
        let _ = dup2(fd, libc::STDOUT_FILENO);
    }
    // Both ends of every channel, adjacent or not; the standard streams
    // now hold the only copies this stage needs.
    for &fd in channel_fds {
        let _ = unistd::close(fd);
    }

    // Redirect targets override the pipe bindings.
    if let Some(redirect) = &cmd.stdout_to {
        bind_redirect(redirect, libc::STDOUT_FILENO);
    }
    if let Some(redirect) = &cmd.stderr_to {
        bind_redirect(redirect, libc::STDERR_FILENO);
    }

    match plan {
        StagePlan::Builtin(name) => {
            let mut out = io::stdout();
            let mut err = io::stderr();
            let status = match builtins.run(name, cmd, state, &mut out, &mut err) {
                Some(Ok(code)) => code,
                Some(Err(_)) | None => 1,
            };
            let _ = out.flush();
            let _ = err.flush();
            process::exit(status);
        }
        StagePlan::External(prog, argv) => {
            let _ = execv(prog, argv);
            // exec only returns on failure
            eprintln!("{}: command not found", cmd.name().unwrap_or_default());
            process::exit(127);
        }
    }
}

/// Opens a redirect target and moves it onto `stream_fd`; exits the
/// child when the target cannot be opened.
fn bind_redirect(redirect: &Redirect, stream_fd: RawFd) {
    match open_redirect(redirect) {
        Ok(file) => {
            let _ = dup2(file.as_raw_fd(), stream_fd);
            // `file` drops here, closing the now-duplicated original.
        }
        Err(e) => {
            eprintln!("{}: {}", redirect.path, e);
            process::exit(1);
        }
    }
}

/// Truncates by default, appends for the doubled operator.
fn open_redirect(redirect: &Redirect) -> io::Result<File> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).mode(REDIRECT_MODE);
    if redirect.append {
        options.append(true);
    } else {
        options.truncate(true);
    }
    options.open(&redirect.path)
}

/// A stage with redirects but no command still creates its targets.
fn touch_targets(cmd: &ParsedCommand) -> i32 {
    let mut status = 0;
    for redirect in [cmd.stdout_to.as_ref(), cmd.stderr_to.as_ref()]
        .into_iter()
        .flatten()
    {
        if let Err(e) = open_redirect(redirect) {
            eprintln!("{}: {}", redirect.path, e);
            status = 1;
        }
    }
    status
}

fn close_all(channels: &[(RawFd, RawFd)]) {
    for &(read_end, write_end) in channels {
        let _ = unistd::close(read_end);
        let _ = unistd::close(write_end);
    }
}

/// Blocks until `child` terminates, retrying on EINTR.
fn wait_for(child: Pid) -> Result<i32, ProcessError> {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, signal, _)) => return Ok(128 + signal as i32),
            Ok(_) => continue,
            Err(nix::Error::EINTR) => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::{split_stages, tokenize};
    use std::env;
    use std::fs;
    use std::path::PathBuf;

    fn parse_line(line: &str) -> Vec<ParsedCommand> {
        split_stages(line)
            .expect("split")
            .iter()
            .map(|stage| tokenize(stage).expect("parse"))
            .collect()
    }

    fn harness() -> (PipelineExecutor, BuiltinSet, ShellState) {
        (
            PipelineExecutor::new(&Flags::default()),
            BuiltinSet::new(),
            ShellState::new(),
        )
    }

    fn scratch_file(tag: &str) -> PathBuf {
        let path = env::temp_dir().join(format!("vena_exec_{}_{}", tag, std::process::id()));
        fs::remove_file(&path).ok();
        path
    }

    #[test]
    fn test_truncate_and_append_modes() {
        let (executor, builtins, mut state) = harness();
        let file = scratch_file("modes");

        let line = parse_line(&format!("echo x > {}", file.display()));
        executor.run(&line, &builtins, &mut state).expect("run");
        executor.run(&line, &builtins, &mut state).expect("run");
        assert_eq!(fs::read_to_string(&file).expect("read"), "x\n");

        let line = parse_line(&format!("echo x >> {}", file.display()));
        executor.run(&line, &builtins, &mut state).expect("run");
        executor.run(&line, &builtins, &mut state).expect("run");
        assert_eq!(fs::read_to_string(&file).expect("read"), "x\nx\nx\n");

        fs::remove_file(file).ok();
    }

    #[test]
    fn test_stderr_target_created_even_when_unused() {
        let (executor, builtins, mut state) = harness();
        let out_file = scratch_file("echo_out");
        let err_file = scratch_file("echo_err");

        let line = parse_line(&format!(
            "echo hi > {} 2> {}",
            out_file.display(),
            err_file.display()
        ));
        executor.run(&line, &builtins, &mut state).expect("run");

        assert_eq!(fs::read_to_string(&out_file).expect("read"), "hi\n");
        assert_eq!(fs::read_to_string(&err_file).expect("read"), "");
        assert_eq!(state.last_status, 0);

        fs::remove_file(out_file).ok();
        fs::remove_file(err_file).ok();
    }

    #[test]
    fn test_unknown_command_sets_status_127() {
        let (executor, builtins, mut state) = harness();
        let line = parse_line("vena-definitely-missing-tool");
        executor.run(&line, &builtins, &mut state).expect("run");
        assert_eq!(state.last_status, 127);
    }

    #[test]
    fn test_external_exit_status_is_surfaced() {
        let (executor, builtins, mut state) = harness();
        let line = parse_line("sh -c 'exit 3'");
        executor.run(&line, &builtins, &mut state).expect("run");
        assert_eq!(state.last_status, 3);
    }

    #[test]
    fn test_pipeline_preserves_bytes_in_order() {
        let (executor, builtins, mut state) = harness();
        let file = scratch_file("pipe3");

        // Builtin head stage forked into the pipeline, two external
        // stages behind it, file capture on the tail.
        let line = parse_line(&format!("echo abc def | cat | cat > {}", file.display()));
        executor.run(&line, &builtins, &mut state).expect("run");

        assert_eq!(fs::read_to_string(&file).expect("read"), "abc def\n");
        assert_eq!(state.last_status, 0);

        fs::remove_file(file).ok();
    }

    #[test]
    fn test_pipeline_with_defective_middle_stage_still_runs() {
        let (executor, builtins, mut state) = harness();
        let file = scratch_file("defective");

        let line = parse_line(&format!(
            "echo ignored | vena-missing-filter | cat > {}",
            file.display()
        ));
        executor.run(&line, &builtins, &mut state).expect("run");

        // The middle stage was skipped; the tail saw immediate
        // end-of-input and produced an empty file.
        assert_eq!(fs::read_to_string(&file).expect("read"), "");

        fs::remove_file(file).ok();
    }
}
