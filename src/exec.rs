// Copyright 2025 Google LLC
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

/// The captured result of one subprocess invocation.
#[derive(Clone, Debug, PartialEq)]
pub struct CommandOutput {
    /// The child's exit code. `-1` when the child was terminated by a signal
    /// and no code is available.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Executes an external command and captures its output.
///
/// This is a pure capture boundary: no interpretation of the exit code or the
/// output happens here. An `Err` means the command could not be run at all,
/// or exceeded the configured deadline.
pub trait CommandRunner: std::fmt::Debug + Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CommandOutput>;
}

/// Runs commands through `std::process`, draining both output pipes before
/// waiting so that children with large output cannot deadlock.
#[derive(Clone, Debug)]
pub struct ProcessRunner {
    deadline: Option<Duration>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Some(crate::constants::DEFAULT_COMMAND_DEADLINE))
    }
}

impl ProcessRunner {
    /// Creates a runner. `deadline` bounds the child's total run time; `None`
    /// waits forever.
    pub fn new(deadline: Option<Duration>) -> Self {
        Self { deadline }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&self, program: &str, args: &[&str]) -> std::io::Result<CommandOutput> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());

        let status = match self.deadline {
            None => child.wait()?,
            Some(deadline) => wait_with_deadline(&mut child, deadline)?,
        };

        Ok(CommandOutput {
            exit_code: status.code().unwrap_or(-1),
            stdout: join_reader(stdout)?,
            stderr: join_reader(stderr)?,
        })
    }
}

// Reads the pipe to EOF on its own thread. Both pipes must be consumed
// concurrently with the wait, otherwise a child filling one of the OS pipe
// buffers blocks forever.
fn drain<R>(pipe: Option<R>) -> std::thread::JoinHandle<std::io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buf)?;
        }
        Ok(buf)
    })
}

fn join_reader(
    handle: std::thread::JoinHandle<std::io::Result<Vec<u8>>>,
) -> std::io::Result<String> {
    let bytes = handle
        .join()
        .map_err(|_| std::io::Error::other("output reader thread panicked"))??;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn wait_with_deadline(child: &mut Child, deadline: Duration) -> std::io::Result<ExitStatus> {
    let end = Instant::now() + deadline;
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if Instant::now() >= end {
            let _ = child.kill();
            let _ = child.wait();
            return Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("command did not exit within {deadline:?}"),
            ));
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    // Used by tests in other modules. The slice lifetimes must be spelled
    // out for mock! to accept the signature.
    mockall::mock! {
        #[derive(Debug)]
        pub CommandRunner { }

        impl CommandRunner for CommandRunner {
            fn run<'a, 'b, 'c>(
                &self,
                program: &'a str,
                args: &'b [&'c str],
            ) -> std::io::Result<CommandOutput>;
        }
    }

    #[cfg(unix)]
    #[test]
    fn captures_exit_code_and_streams() -> anyhow::Result<()> {
        let runner = ProcessRunner::new(None);
        let got = runner.run("sh", &["-c", "echo out-line; echo err-line 1>&2; exit 3"])?;
        assert_eq!(got.exit_code, 3);
        assert_eq!(got.stdout, "out-line\n");
        assert_eq!(got.stderr, "err-line\n");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn drains_large_output() -> anyhow::Result<()> {
        // Larger than any OS pipe buffer, on both streams at once.
        let script = "head -c 262144 /dev/zero | tr '\\0' 'a'; \
                      head -c 262144 /dev/zero | tr '\\0' 'b' 1>&2";
        let runner = ProcessRunner::default();
        let got = runner.run("sh", &["-c", script])?;
        assert_eq!(got.exit_code, 0);
        assert_eq!(got.stdout.len(), 262144);
        assert_eq!(got.stderr.len(), 262144);
        Ok(())
    }

    #[test]
    fn missing_binary_is_an_error() {
        let runner = ProcessRunner::default();
        let got = runner.run("this-binary-does-not-exist-test-only", &[]);
        assert!(got.is_err(), "{got:?}");
    }

    #[cfg(unix)]
    #[test]
    fn deadline_kills_the_child() {
        let runner = ProcessRunner::new(Some(Duration::from_millis(100)));
        let got = runner.run("sh", &["-c", "sleep 30"]);
        let err = got.expect_err("the runner should give up");
        assert_eq!(err.kind(), std::io::ErrorKind::TimedOut, "{err:?}");
    }
}
