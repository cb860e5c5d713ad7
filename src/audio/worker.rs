//! Background worker for provider calls.
//!
//! Enumeration and default-device switching may block, so they run on a
//! dedicated thread. Results are sent back over a channel and the UI
//! thread is woken through a callback (a posted window message on
//! Windows). The worker never touches application state.

use super::device::{AudioError, PlaybackDevice};
use super::provider::{switch_default, AudioProvider};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, warn};

/// What asked for a device switch. Only affects status messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOrigin {
    Menu,
    Hotkey,
    Command,
}

/// Work sent to the worker thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Fetch the active playback devices.
    Enumerate,

    /// Make a device the default.
    Switch {
        device_id: String,
        device_name: String,
        origin: SwitchOrigin,
    },
}

/// Results sent back to the UI thread.
#[derive(Debug)]
pub enum JobResult {
    Devices(Result<Vec<PlaybackDevice>, AudioError>),

    Switched {
        device_id: String,
        device_name: String,
        origin: SwitchOrigin,
        result: Result<(), AudioError>,
    },
}

/// Handle to the worker thread.
///
/// Dropping the handle closes the job channel; a job in flight is
/// abandoned and its result is never observed.
pub struct Worker {
    jobs: Sender<Job>,
}

impl Worker {
    /// Spawn the worker thread.
    ///
    /// `wake` is called after every result is sent.
    pub fn spawn<W>(
        provider: Arc<dyn AudioProvider>,
        results: Sender<JobResult>,
        wake: W,
    ) -> std::io::Result<Self>
    where
        W: Fn() + Send + 'static,
    {
        let (jobs, job_rx) = channel::<Job>();

        thread::Builder::new()
            .name("audio-worker".to_string())
            .spawn(move || run(provider, job_rx, results, wake))?;

        Ok(Self { jobs })
    }

    /// A sender for submitting jobs.
    pub fn sender(&self) -> Sender<Job> {
        self.jobs.clone()
    }
}

fn run<W: Fn()>(
    provider: Arc<dyn AudioProvider>,
    jobs: Receiver<Job>,
    results: Sender<JobResult>,
    wake: W,
) {
    for job in jobs {
        debug!(?job, "Worker picked up job");
        let result = execute(provider.as_ref(), job);

        if results.send(result).is_err() {
            warn!("Result receiver dropped, stopping worker");
            break;
        }
        wake();
    }
    debug!("Worker exiting");
}

/// Run one job. A panicking provider call is reported as a failed result
/// so the UI thread always hears back.
fn execute(provider: &dyn AudioProvider, job: Job) -> JobResult {
    match job {
        Job::Enumerate => {
            let result = panic::catch_unwind(AssertUnwindSafe(|| provider.playback_devices()))
                .unwrap_or_else(|payload| Err(panicked("enumeration", payload)));
            JobResult::Devices(result)
        }
        Job::Switch {
            device_id,
            device_name,
            origin,
        } => {
            let result = panic::catch_unwind(AssertUnwindSafe(|| switch_default(provider, &device_id)))
                .unwrap_or_else(|payload| Err(panicked("switch", payload)));
            JobResult::Switched {
                device_id,
                device_name,
                origin,
                result,
            }
        }
    }
}

fn panicked(what: &str, payload: Box<dyn Any + Send>) -> AudioError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string());
    error!("Audio provider panicked during {what}: {message}");
    AudioError::Unavailable(format!("{what} panicked: {message}"))
}
