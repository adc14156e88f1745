use std::sync::Arc;

use crate::chip::{ChipInfo, MemChip};
use crate::error::{Error, Result};
use crate::sim::{Fault, SimChip};

const HALF_VARIANTS: &[&str] = &["Lower half", "Upper half"];
const STACK_VARIANTS: &[&str] = &["Bottom chip", "Top chip"];

/// Every supported configuration, in device-menu order.
pub const CHIPS: [ChipInfo; 12] = [
    ChipInfo {
        name: "4027 (4Kx1)",
        mem_size: 4096,
        bits: 1,
        speed_grades: &["150ns", "200ns", "250ns", "300ns"],
        variants: None,
    },
    ChipInfo {
        name: "4116 half (8Kx1)",
        mem_size: 8192,
        bits: 1,
        speed_grades: &["150ns", "200ns", "250ns"],
        variants: Some(HALF_VARIANTS),
    },
    ChipInfo {
        name: "4116 (16Kx1)",
        mem_size: 16384,
        bits: 1,
        speed_grades: &["150ns", "200ns", "250ns"],
        variants: None,
    },
    ChipInfo {
        name: "4132 stk (32Kx1)",
        mem_size: 32768,
        bits: 1,
        speed_grades: &["150ns", "200ns"],
        variants: Some(STACK_VARIANTS),
    },
    ChipInfo {
        name: "4164 half (32Kx1)",
        mem_size: 32768,
        bits: 1,
        speed_grades: &["120ns", "150ns", "200ns"],
        variants: Some(HALF_VARIANTS),
    },
    ChipInfo {
        name: "4164 (64Kx1)",
        mem_size: 65536,
        bits: 1,
        speed_grades: &["100ns", "120ns", "150ns", "200ns"],
        variants: None,
    },
    ChipInfo {
        name: "41128 (128Kx1)",
        mem_size: 131072,
        bits: 1,
        speed_grades: &["120ns", "150ns"],
        variants: None,
    },
    ChipInfo {
        name: "41256 (256Kx1)",
        mem_size: 262144,
        bits: 1,
        speed_grades: &["80ns", "100ns", "120ns", "150ns"],
        variants: None,
    },
    ChipInfo {
        name: "4416 half (8Kx4)",
        mem_size: 8192,
        bits: 4,
        speed_grades: &["120ns", "150ns"],
        variants: Some(HALF_VARIANTS),
    },
    ChipInfo {
        name: "4416 (16Kx4)",
        mem_size: 16384,
        bits: 4,
        speed_grades: &["120ns", "150ns"],
        variants: None,
    },
    ChipInfo {
        name: "4464 (64Kx4)",
        mem_size: 65536,
        bits: 4,
        speed_grades: &["80ns", "100ns", "120ns", "150ns"],
        variants: None,
    },
    ChipInfo {
        name: "44256 (256Kx4)",
        mem_size: 262144,
        bits: 4,
        speed_grades: &["70ns", "80ns", "100ns"],
        variants: None,
    },
];

/// Find a catalog entry by its part number prefix, e.g. `"4164"` or
/// `"4164 half"`. Exact part numbers win over longer names.
pub fn find(part: &str) -> Result<usize> {
    let part = part.trim().to_lowercase();
    let exact = CHIPS
        .iter()
        .position(|c| c.name.split(" (").next() == Some(part.as_str()));
    exact
        .or_else(|| {
            CHIPS
                .iter()
                .position(|c| c.name.to_lowercase().starts_with(&part))
        })
        .ok_or(Error::UnknownChip(part))
}

/// Build the socket list handed to the operator, backed by simulated chips.
/// `faults` go onto the chip at index `faulty`.
pub fn simulated(faulty: Option<usize>, faults: &[Fault]) -> Vec<Arc<dyn MemChip>> {
    CHIPS
        .iter()
        .enumerate()
        .map(|(i, info)| {
            let f = if faulty == Some(i) {
                faults.to_vec()
            } else {
                Vec::new()
            };
            Arc::new(SimChip::with_faults(*info, f)) as Arc<dyn MemChip>
        })
        .collect()
}
