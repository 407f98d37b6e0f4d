//! Completion polling for running calculations.
//!
//! Gaussian gives no completion signal other than the log it writes, so a
//! running step is watched by re-reading its log every poll interval. A
//! `Normal termination` line only counts once the process has exited too:
//! multi-job routes (`Opt Freq`, `--Link1--`) write one such line per job and
//! keep going. A program that exits without writing any termination line
//! (killed by the scheduler, missing executable, segfault) is reported as an
//! error termination.

use crate::qm_interface::{LogStatus, QMError, QMInterface, Result, RunningCalculation};
use log::{debug, warn};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

/// Blocks until the calculation writing `log_path` has finished.
///
/// Returns [`LogStatus::NormalTermination`] once the process has exited and
/// the last termination line of its log is a normal one. An error
/// termination is returned as soon as it shows up; a process still running
/// at that point is terminated. A process that has exited while the log has
/// no terminal marker is reported as [`LogStatus::ErrorTermination`]. When
/// `timeout` elapses first the calculation is terminated and
/// [`QMError::Timeout`] is returned.
pub fn wait_for_completion(
    qm: &dyn QMInterface,
    log_path: &Path,
    job: &mut dyn RunningCalculation,
    poll_interval: Duration,
    timeout: Option<Duration>,
) -> Result<LogStatus> {
    let started = Instant::now();

    loop {
        let status = qm.read_status(log_path)?;
        if let LogStatus::ErrorTermination(_) = status {
            if !job.has_exited()? {
                job.terminate()?;
            }
            return Ok(status);
        }

        if job.has_exited()? {
            // The process may have flushed its last lines between the read
            // above and the exit check.
            let status = qm.read_status(log_path)?;
            if status.is_terminal() {
                return Ok(status);
            }
            warn!(
                "{} ended without a termination line",
                log_path.display()
            );
            return Ok(LogStatus::ErrorTermination(
                "process exited without a termination line".to_string(),
            ));
        }

        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                warn!(
                    "{} still running after {:?}, stopping calculation",
                    log_path.display(),
                    limit
                );
                job.terminate()?;
                return Err(QMError::Timeout(limit));
            }
        }

        if status == LogStatus::NormalTermination {
            debug!("{}: job finished, process still running a linked job", log_path.display());
        }
        debug!("{}: {:?}, next check in {:?}", log_path.display(), status, poll_interval);
        thread::sleep(poll_interval);
    }
}
