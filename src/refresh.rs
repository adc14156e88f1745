use std::thread;
use std::time::Duration;

use crate::bench::TestBench;
use crate::driver::TestResult;

/// Retention check: fill, wait `delay` without touching the chip, read back.
///
/// Every cell is written with, and compared against, the constant `bits`
/// itself (1 for x1 parts, 4 for x4 parts) rather than a per-address
/// pattern. Failure carries no lane information.
pub fn refresh_test(bench: &mut TestBench, addr_size: u32, bits: u32, delay: Duration) -> TestResult {
    bench.set_phase(0);

    for addr in 0..addr_size {
        bench.write(addr, bits);
    }

    thread::sleep(delay);

    for addr in 0..addr_size {
        if bench.read(addr) != bits {
            return TestResult::FAILED;
        }
    }
    TestResult::PASSED
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chip::MemChip;
    use crate::march::tests::{Access, Recorder, info};
    use crate::progress::Progress;
    use crate::sim::{Fault, SimChip};

    fn run(chip: &dyn MemChip, size: u32, bits: u32, delay: Duration) -> TestResult {
        let progress = Progress::new();
        let mut bench = TestBench::new(chip, &progress);
        refresh_test(&mut bench, size, bits, delay)
    }

    #[test]
    fn test_writes_the_width_constant_everywhere() {
        let chip = Recorder::new(SimChip::new(info(3, 4)));
        assert_eq!(run(&chip, 3, 4, Duration::ZERO), TestResult::PASSED);
        let log = chip.take();
        assert_eq!(
            log,
            vec![
                Access::W(0, 4),
                Access::W(1, 4),
                Access::W(2, 4),
                Access::R(0),
                Access::R(1),
                Access::R(2),
            ]
        );
    }

    #[test]
    fn test_one_bad_cell_fails() {
        let fault = Fault::StuckAt {
            lane: 0,
            level: false,
            addr: Some(12),
        };
        let chip = SimChip::with_faults(info(16, 1), vec![fault]);
        chip.configure(0, 0);
        assert_eq!(run(&chip, 16, 1, Duration::ZERO), TestResult::FAILED);
    }

    #[test]
    fn test_fault_outside_compared_lanes_still_fails() {
        // x4 parts are checked against 0b0100, so lane 0 stuck high shows up.
        let fault = Fault::StuckAt {
            lane: 0,
            level: true,
            addr: Some(3),
        };
        let chip = SimChip::with_faults(info(8, 4), vec![fault]);
        chip.configure(0, 0);
        assert_eq!(run(&chip, 8, 4, Duration::ZERO), TestResult::FAILED);
    }

    #[test]
    fn test_leaky_chip_fails_after_delay() {
        let fault = Fault::Leaky {
            retention: Duration::from_millis(1),
        };
        let chip = SimChip::with_faults(info(32, 1), vec![fault]);
        chip.configure(0, 0);
        assert_eq!(
            run(&chip, 32, 1, Duration::from_millis(5)),
            TestResult::FAILED
        );
    }

    #[test]
    fn test_retentive_chip_survives_delay() {
        let fault = Fault::Leaky {
            retention: Duration::from_secs(10),
        };
        let chip = SimChip::with_faults(info(32, 1), vec![fault]);
        chip.configure(0, 0);
        assert_eq!(
            run(&chip, 32, 1, Duration::from_millis(5)),
            TestResult::PASSED
        );
    }
}
