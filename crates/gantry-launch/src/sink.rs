//! Launch supervision and output capture.
//!
//! Runs the built invocation as a child process and tees its combined
//! stdout/stderr line-wise to two destinations: the invoking terminal
//! (live monitoring) and an append-only log file (durable history).
//! Neither destination's failure loses data destined for the other.
//! Blocks until the child terminates; the exit code is returned
//! verbatim.

use crate::error::{LaunchError, Result};
use crate::invocation::Invocation;
use std::io::Write as _;
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Shared append handle to the capture log. `None` after the log has
/// been given up on; terminal echo continues regardless.
type LogHandle = Arc<Mutex<Option<std::fs::File>>>;

/// Execute the invocation, teeing output to the terminal and to an
/// append of `log_file`. Returns the child's exit code unchanged.
///
/// A spawn failure (scheduler binary missing, submission rejected
/// before exec) is a [`LaunchError::Launch`] carrying the OS
/// diagnostic. A log-file failure is reported once and capture
/// continues terminal-only.
pub async fn launch(invocation: &Invocation, log_file: &Path) -> Result<i32> {
    let log = open_log(log_file);

    debug!(program = %invocation.program, "spawning scheduler");
    let mut child = tokio::process::Command::new(&invocation.program)
        .args(&invocation.args)
        .envs(invocation.env.iter().cloned())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| {
            LaunchError::Launch(format!("failed to spawn {}: {e}", invocation.program))
        })?;

    // One reader task per stream; both append to the same log so the
    // file matches what the terminal showed.
    let warned = Arc::new(AtomicBool::new(false));
    let out_task = tee(
        child.stdout.take().expect("stdout is piped"),
        false,
        Arc::clone(&log),
        Arc::clone(&warned),
    );
    let err_task = tee(
        child.stderr.take().expect("stderr is piped"),
        true,
        Arc::clone(&log),
        Arc::clone(&warned),
    );

    let status = child.wait().await?;
    // Drain the capture tasks before reporting the exit.
    let _ = out_task.await;
    let _ = err_task.await;

    match status.code() {
        Some(code) => Ok(code),
        None => Err(LaunchError::Launch(
            "scheduler process was terminated by a signal".to_string(),
        )),
    }
}

fn open_log(log_file: &Path) -> LogHandle {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| {
            warn!(path = %log_file.display(), error = %e, "cannot append to log file; capturing to terminal only");
            e
        })
        .ok();
    Arc::new(Mutex::new(file))
}

fn tee(
    stream: impl AsyncRead + Unpin + Send + 'static,
    to_stderr: bool,
    log: LogHandle,
    warned: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if to_stderr {
                eprintln!("{line}");
            } else {
                println!("{line}");
            }

            let mut guard = log.lock().await;
            let failed = match guard.as_mut() {
                Some(file) => writeln!(file, "{line}").is_err(),
                None => false,
            };
            if failed {
                // Drop the handle; terminal echo keeps going.
                *guard = None;
                if !warned.swap(true, Ordering::Relaxed) {
                    warn!("log file write failed; continuing with terminal output only");
                }
            }
        }
    })
}
