//! March-B, run one data lane at a time.
//!
//! Each lane gets five march elements over the whole address space:
//!
//! ```text
//! M0 ⇑ (w0)
//! M1 ⇑ (r0, w1, r1, w0, r0, w1)
//! M2 ⇑ (r1, w0, w1)
//! M3 ⇓ (r1, w0, w1, w0)
//! M4 ⇓ (r0, w1, w0)
//! ```
//!
//! "0" and "1" refer to the lane under test. Writing 0 drives every other
//! bit of the word high, writing 1 drives only the lane bit.

use crate::bench::TestBench;
use crate::driver::TestResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    R0,
    R1,
    W0,
    W1,
}

use Op::*;

struct Element {
    descending: bool,
    ops: &'static [Op],
}

const MARCH_B: [Element; 5] = [
    Element {
        descending: false,
        ops: &[W0],
    },
    Element {
        descending: false,
        ops: &[R0, W1, R1, W0, R0, W1],
    },
    Element {
        descending: false,
        ops: &[R1, W0, W1],
    },
    Element {
        descending: true,
        ops: &[R1, W0, W1, W0],
    },
    Element {
        descending: true,
        ops: &[R0, W1, W0],
    },
];

/// Number of march elements per lane.
pub const ELEMENT_COUNT: usize = MARCH_B.len();

/// Apply one element's ops to a cell, stopping at the first mismatch.
fn apply(bench: &mut TestBench, addr: u32, lane_mask: u32, ops: &[Op]) -> bool {
    let zero = bench.data_mask() & !lane_mask;
    for op in ops {
        let ok = match op {
            R0 => bench.read(addr) & lane_mask == 0,
            R1 => bench.read(addr) & lane_mask == lane_mask,
            W0 => {
                bench.write(addr, zero);
                true
            }
            W1 => {
                bench.write(addr, lane_mask);
                true
            }
        };
        if !ok {
            return false;
        }
    }
    true
}

/// Run march element `element` across `addr_size` cells for one lane.
/// Returns false as soon as any cell mismatches.
pub fn march_element(bench: &mut TestBench, addr_size: u32, lane: u32, element: usize) -> bool {
    let Element { descending, ops } = &MARCH_B[element];
    let lane_mask = 1u32 << lane;
    bench.set_phase(element as u32);

    for i in 0..addr_size {
        let addr = if *descending { addr_size - 1 - i } else { i };
        if !apply(bench, addr, lane_mask, ops) {
            return false;
        }
    }
    true
}

/// All five elements on one lane; aborts on the first failing element.
pub fn marchb_lane(bench: &mut TestBench, addr_size: u32, lane: u32) -> bool {
    (0..ELEMENT_COUNT).all(|e| march_element(bench, addr_size, lane, e))
}

/// March-B over every lane. Bit `i` of the result is set if lane `i` failed;
/// a failing lane does not stop the others.
pub fn marchb_test(bench: &mut TestBench, addr_size: u32, bits: u32) -> TestResult {
    let mut failed = 0u32;
    for lane in 0..bits {
        bench.set_lane(lane);
        if !marchb_lane(bench, addr_size, lane) {
            failed |= 1 << lane;
        }
    }
    TestResult(failed)
}


#[cfg(test)]
mod proptests {
    use super::tests::info;
    use super::*;
    use crate::chip::MemChip;
    use crate::progress::Progress;
    use crate::sim::{Fault, SimChip};
    use proptest::prelude::*;

    fn bits_strategy() -> impl Strategy<Value = u32> {
        prop_oneof![Just(1u32), Just(4u32)]
    }

    proptest! {
        #[test]
        fn fault_free_chip_passes(bits in bits_strategy(), size in 1u32..96) {
            let chip = SimChip::new(info(size, bits));
            chip.configure(0, 0);
            let progress = Progress::new();
            let mut bench = TestBench::new(&chip, &progress);
            prop_assert_eq!(marchb_test(&mut bench, size, bits), TestResult(0));
        }

        #[test]
        fn stuck_at_zero_flags_only_its_lane(
            size in 1u32..96,
            lane in 0u32..4,
            addr_seed in any::<u32>(),
        ) {
            let addr = addr_seed % size;
            let fault = Fault::StuckAt { lane, level: false, addr: Some(addr) };
            let chip = SimChip::with_faults(info(size, 4), vec![fault]);
            chip.configure(0, 0);
            let progress = Progress::new();
            let mut bench = TestBench::new(&chip, &progress);
            prop_assert_eq!(marchb_test(&mut bench, size, 4), TestResult(1 << lane));
        }
    }
}
