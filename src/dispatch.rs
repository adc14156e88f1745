//! Hand-off between the interactive context and the worker context.
//!
//! The interactive side submits one [`Job`] at a time and then polls, never
//! blocking, for progress markers and the final [`TestResult`]. The worker
//! thread owns the seed table and runs jobs to completion one after another.

use std::sync::mpsc::{self, Receiver, SyncSender, TryRecvError};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, info};

use crate::bench::TestBench;
use crate::chip::MemChip;
use crate::config::TesterConfig;
use crate::driver::{DriverParams, TestResult, all_ram_tests};
use crate::error::{Error, Result};
use crate::progress::{Progress, TestId};
use crate::psrand::{SeedTable, WORD_BITS};

const JOB_CAPACITY: usize = 1;
const RESULT_CAPACITY: usize = 1;
const MARKER_CAPACITY: usize = 4;

/// Work the worker knows how to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    /// The full March-B / pseudorandom / refresh sequence.
    AllRamTests { addr_size: u32, bits: u32 },
}

impl Job {
    /// Lane masks and stream chunks are one machine word wide.
    fn validate(&self) -> Result<()> {
        match *self {
            Job::AllRamTests { bits, .. } if !(1..=WORD_BITS).contains(&bits) => {
                Err(Error::UnsupportedWidth(bits))
            }
            Job::AllRamTests { .. } => Ok(()),
        }
    }
}

struct Request {
    job: Job,
    chip: Arc<dyn MemChip>,
}

/// Held from submit until the result is picked up, so a second job waits
/// instead of queueing behind or replacing the first.
#[derive(Default)]
struct Gate {
    busy: Mutex<bool>,
    freed: Condvar,
}

impl Gate {
    fn acquire(&self) {
        let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
        while *busy {
            busy = self.freed.wait(busy).unwrap_or_else(|e| e.into_inner());
        }
        *busy = true;
    }

    fn try_acquire(&self) -> bool {
        let mut busy = self.busy.lock().unwrap_or_else(|e| e.into_inner());
        if *busy {
            return false;
        }
        *busy = true;
        true
    }

    fn release(&self) {
        *self.busy.lock().unwrap_or_else(|e| e.into_inner()) = false;
        self.freed.notify_one();
    }
}

/// Sending half of the job channel. Cheap to clone and safe to move to
/// another thread.
#[derive(Clone)]
pub struct Submitter {
    jobs: SyncSender<Request>,
    gate: Arc<Gate>,
}

impl Submitter {
    /// Queue `job` against `chip`, blocking while an earlier job's result
    /// has not been retrieved yet.
    pub fn submit(&self, chip: Arc<dyn MemChip>, job: Job) -> Result<()> {
        job.validate()?;
        self.gate.acquire();
        self.send(chip, job)
    }

    /// Like [`Submitter::submit`] but fails with [`Error::Busy`] instead of
    /// waiting.
    pub fn try_submit(&self, chip: Arc<dyn MemChip>, job: Job) -> Result<()> {
        job.validate()?;
        if !self.gate.try_acquire() {
            return Err(Error::Busy);
        }
        self.send(chip, job)
    }

    fn send(&self, chip: Arc<dyn MemChip>, job: Job) -> Result<()> {
        self.jobs.send(Request { job, chip }).map_err(|_| {
            self.gate.release();
            Error::WorkerGone
        })
    }
}

/// Interactive-side handle on the worker.
pub struct Dispatcher {
    submitter: Submitter,
    results: Receiver<TestResult>,
    markers: Receiver<TestId>,
    progress: Arc<Progress>,
}

impl Dispatcher {
    pub fn submit(&self, chip: Arc<dyn MemChip>, job: Job) -> Result<()> {
        self.submitter.submit(chip, job)
    }

    pub fn try_submit(&self, chip: Arc<dyn MemChip>, job: Job) -> Result<()> {
        self.submitter.try_submit(chip, job)
    }

    pub fn submitter(&self) -> Submitter {
        self.submitter.clone()
    }

    /// Non-blocking check for a finished job. Retrieving a result lets the
    /// next job in.
    pub fn try_result(&self) -> Result<Option<TestResult>> {
        match self.results.try_recv() {
            Ok(result) => {
                self.submitter.gate.release();
                Ok(Some(result))
            }
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                self.submitter.gate.release();
                Err(Error::WorkerGone)
            }
        }
    }

    /// Non-blocking check for the next test-identity marker.
    pub fn try_marker(&self) -> Option<TestId> {
        self.markers.try_recv().ok()
    }

    pub fn progress(&self) -> &Arc<Progress> {
        &self.progress
    }
}

/// Start the worker context. It runs until the returned [`Dispatcher`] (and
/// every [`Submitter`] cloned from it) is dropped.
pub fn spawn_worker(config: &TesterConfig) -> (Dispatcher, JoinHandle<()>) {
    let (job_tx, job_rx) = mpsc::sync_channel::<Request>(JOB_CAPACITY);
    let (result_tx, result_rx) = mpsc::sync_channel::<TestResult>(RESULT_CAPACITY);
    let (marker_tx, marker_rx) = mpsc::sync_channel::<TestId>(MARKER_CAPACITY);
    let progress = Arc::new(Progress::new());

    let seeds = SeedTable::new(config.master_seed);
    let retention_delay = config.retention_delay;
    let worker_progress = Arc::clone(&progress);

    let handle = thread::spawn(move || {
        worker_loop(
            job_rx,
            result_tx,
            marker_tx,
            &worker_progress,
            &seeds,
            retention_delay,
        );
    });

    let dispatcher = Dispatcher {
        submitter: Submitter {
            jobs: job_tx,
            gate: Arc::new(Gate::default()),
        },
        results: result_rx,
        markers: marker_rx,
        progress,
    };
    (dispatcher, handle)
}

/// Worker context: wait for a job, run it, post the result, repeat.
fn worker_loop(
    jobs: Receiver<Request>,
    results: SyncSender<TestResult>,
    markers: SyncSender<TestId>,
    progress: &Progress,
    seeds: &SeedTable,
    retention_delay: Duration,
) {
    let params = DriverParams {
        seeds,
        retention_delay,
    };

    while let Ok(Request { job, chip }) = jobs.recv() {
        let result = match job {
            Job::AllRamTests { addr_size, bits } => {
                info!("{}: testing {} cells x {} bits", chip.info().name, addr_size, bits);
                let mut bench = TestBench::new(chip.as_ref(), progress);
                all_ram_tests(&mut bench, &params, addr_size, bits, |m| {
                    debug!("running {}", m.name());
                    let _ = markers.send(m);
                })
            }
        };
        info!("{}: result {:#x}", chip.info().name, result.0);
        if results.send(result).is_err() {
            break;
        }
    }
    debug!("worker exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::march::tests::info;
    use crate::sim::{Fault, SimChip};
    use std::sync::mpsc::RecvTimeoutError;
    use std::time::Instant;

    fn quick_config() -> TesterConfig {
        TesterConfig {
            retention_delay: Duration::from_micros(100),
            ..Default::default()
        }
    }

    fn chip(size: u32, bits: u32, faults: Vec<Fault>) -> Arc<dyn MemChip> {
        let chip = SimChip::with_faults(info(size, bits), faults);
        chip.configure(0, 0);
        Arc::new(chip)
    }

    fn job(size: u32, bits: u32) -> Job {
        Job::AllRamTests {
            addr_size: size,
            bits,
        }
    }

    /// Poll the way the interactive loop does, collecting markers.
    fn wait(d: &Dispatcher, markers: &mut Vec<TestId>) -> TestResult {
        let deadline = Instant::now() + Duration::from_secs(30);
        loop {
            while let Some(m) = d.try_marker() {
                markers.push(m);
            }
            if let Some(r) = d.try_result().unwrap() {
                while let Some(m) = d.try_marker() {
                    markers.push(m);
                }
                return r;
            }
            assert!(Instant::now() < deadline, "worker never answered");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn test_job_round_trip() {
        let (d, handle) = spawn_worker(&quick_config());
        d.submit(chip(64, 1, vec![]), job(64, 1)).unwrap();
        let mut markers = Vec::new();
        assert_eq!(wait(&d, &mut markers), TestResult::PASSED);
        assert_eq!(markers, vec![TestId::MarchB, TestId::Pseudo, TestId::Refresh]);
        drop(d);
        handle.join().unwrap();
    }

    #[test]
    fn test_failure_mask_comes_back() {
        let (d, _handle) = spawn_worker(&quick_config());
        let fault = Fault::StuckAt {
            lane: 3,
            level: true,
            addr: Some(0),
        };
        d.submit(chip(32, 4, vec![fault]), job(32, 4)).unwrap();
        let mut markers = Vec::new();
        assert_eq!(wait(&d, &mut markers), TestResult(0b1000));
        assert_eq!(markers, vec![TestId::MarchB]);
    }

    #[test]
    fn test_no_result_before_submit() {
        let (d, _handle) = spawn_worker(&quick_config());
        assert_eq!(d.try_result(), Ok(None));
        assert_eq!(d.try_marker(), None);
    }

    #[test]
    fn test_try_submit_refuses_while_in_flight() {
        let (d, _handle) = spawn_worker(&quick_config());
        let c = chip(64, 1, vec![]);
        d.submit(Arc::clone(&c), job(64, 1)).unwrap();
        assert_eq!(d.try_submit(Arc::clone(&c), job(64, 1)), Err(Error::Busy));

        let mut markers = Vec::new();
        wait(&d, &mut markers);
        assert_eq!(d.try_submit(c, job(64, 1)), Ok(()));
        assert_eq!(wait(&d, &mut markers), TestResult::PASSED);
    }

    #[test]
    fn test_second_submit_blocks_until_result_retrieved() {
        let (d, _handle) = spawn_worker(&quick_config());
        let c = chip(64, 1, vec![]);
        d.submit(Arc::clone(&c), job(64, 1)).unwrap();

        let submitter = d.submitter();
        let (done_tx, done_rx) = mpsc::channel();
        let c2 = Arc::clone(&c);
        let second = thread::spawn(move || {
            submitter.submit(c2, job(64, 1)).unwrap();
            done_tx.send(()).unwrap();
        });

        // Long enough for the first job to finish; its result is still unread.
        assert_eq!(
            done_rx.recv_timeout(Duration::from_millis(200)),
            Err(RecvTimeoutError::Timeout)
        );

        let mut markers = Vec::new();
        assert_eq!(wait(&d, &mut markers), TestResult::PASSED);
        done_rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert_eq!(wait(&d, &mut markers), TestResult::PASSED);
        second.join().unwrap();
        assert_eq!(markers.len(), 6);
    }

    #[test]
    fn test_out_of_range_width_is_refused() {
        let (d, _handle) = spawn_worker(&quick_config());
        let c = chip(64, 1, vec![]);
        assert_eq!(
            d.submit(Arc::clone(&c), job(64, 33)),
            Err(Error::UnsupportedWidth(33))
        );
        assert_eq!(
            d.try_submit(Arc::clone(&c), job(64, 0)),
            Err(Error::UnsupportedWidth(0))
        );
        // Nothing was queued and the gate is still free.
        d.submit(c, job(64, 1)).unwrap();
        let mut markers = Vec::new();
        assert_eq!(wait(&d, &mut markers), TestResult::PASSED);
    }

    #[test]
    fn test_worker_exits_when_dispatcher_dropped() {
        let (d, handle) = spawn_worker(&quick_config());
        drop(d);
        handle.join().unwrap();
    }
}
