use std::time::Duration;

use log::debug;

use crate::bench::TestBench;
use crate::march::{march_element, marchb_test};
use crate::progress::TestId;
use crate::psrand::SeedTable;
use crate::psrandom::psrandom_test;
use crate::refresh::refresh_test;

/// Outcome of a test run.
///
/// Zero is a pass. March-B failures carry one bit per failed lane; the
/// pseudorandom and refresh tests only ever report 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TestResult(pub u32);

impl TestResult {
    pub const PASSED: TestResult = TestResult(0);
    pub const FAILED: TestResult = TestResult(1);

    pub fn is_pass(self) -> bool {
        self.0 == 0
    }

    pub fn lane_failed(self, lane: u32) -> bool {
        self.0 & (1 << lane) != 0
    }
}

/// Parameters the driver needs beyond the job operands.
#[derive(Debug, Clone)]
pub struct DriverParams<'a> {
    pub seeds: &'a SeedTable,
    pub retention_delay: Duration,
}

/// Full test sequence run by the worker.
///
/// Preconditions the cells with one M0 sweep, then runs March-B, the
/// pseudorandom test and the refresh test, announcing each through
/// `marker`. Stops at the first failing algorithm and returns its result.
pub fn all_ram_tests(
    bench: &mut TestBench,
    params: &DriverParams,
    addr_size: u32,
    bits: u32,
    mut marker: impl FnMut(TestId),
) -> TestResult {
    march_element(bench, addr_size, 0, 0);

    marker(TestId::MarchB);
    let result = marchb_test(bench, addr_size, bits);
    if !result.is_pass() {
        debug!("march-b failed lanes {:#06b}", result.0);
        return result;
    }

    marker(TestId::Pseudo);
    let result = psrandom_test(bench, params.seeds, addr_size, bits);
    if !result.is_pass() {
        debug!("pseudorandom test failed");
        return result;
    }

    marker(TestId::Refresh);
    let result = refresh_test(bench, addr_size, bits, params.retention_delay);
    if !result.is_pass() {
        debug!("refresh test failed");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::MemChip;
    use crate::march::tests::{Access, Recorder, info};
    use crate::progress::Progress;
    use crate::sim::{Fault, SimChip};

    fn run(chip: &dyn MemChip, size: u32, bits: u32) -> (TestResult, Vec<TestId>) {
        let seeds = SeedTable::new(42);
        let params = DriverParams {
            seeds: &seeds,
            retention_delay: Duration::from_millis(1),
        };
        let progress = Progress::new();
        let mut bench = TestBench::new(chip, &progress);
        let mut markers = Vec::new();
        let result = all_ram_tests(&mut bench, &params, size, bits, |m| markers.push(m));
        (result, markers)
    }

    fn chip_with(size: u32, bits: u32, faults: Vec<Fault>) -> SimChip {
        let chip = SimChip::with_faults(info(size, bits), faults);
        chip.configure(0, 0);
        chip
    }

    #[test]
    fn test_good_chip_runs_all_three() {
        let chip = chip_with(64, 4, vec![]);
        let (result, markers) = run(&chip, 64, 4);
        assert_eq!(result, TestResult::PASSED);
        assert_eq!(markers, vec![TestId::MarchB, TestId::Pseudo, TestId::Refresh]);
    }

    #[test]
    fn test_march_failure_returns_lane_mask_and_skips_rest() {
        let fault = Fault::StuckAt {
            lane: 2,
            level: false,
            addr: Some(5),
        };
        let chip = chip_with(64, 4, vec![fault]);
        let (result, markers) = run(&chip, 64, 4);
        assert_eq!(result, TestResult(0b0100));
        assert!(result.lane_failed(2));
        assert_eq!(markers, vec![TestId::MarchB]);
    }

    #[test]
    fn test_leaky_x1_chip_reports_one() {
        let fault = Fault::Leaky {
            retention: Duration::from_micros(1),
        };
        // Whichever algorithm trips first, an x1 part can only report 1.
        let chip = chip_with(32, 1, vec![fault]);
        let (result, markers) = run(&chip, 32, 1);
        assert_eq!(result, TestResult::FAILED);
        assert!(!markers.is_empty());
    }

    #[test]
    fn test_precondition_sweep_comes_first() {
        let chip = Recorder::new(SimChip::new(info(4, 1)));
        let (result, _) = run(&chip, 4, 1);
        assert!(result.is_pass());
        let log = chip.take();
        let first: Vec<Access> = (0..4).map(|a| Access::W(a, 0)).collect();
        assert_eq!(log[..4], first[..]);
        // and then March-B starts over with its own M0 sweep
        assert_eq!(log[4..8], first[..]);
    }

    #[test]
    fn test_result_helpers() {
        assert!(TestResult::PASSED.is_pass());
        assert!(!TestResult::FAILED.is_pass());
        assert!(TestResult(0b1001).lane_failed(3));
        assert!(!TestResult(0b1001).lane_failed(1));
    }
}
