use crate::chip::ChipInfo;
use crate::panel::{Color, FrontPanel, GRID_SIDE};
use crate::progress::ProgressSnapshot;

/// Dot colour per sub-phase; wraps for the pseudorandom test's 16 groups.
const PALETTE: [Color; 5] = [
    Color::DarkBlue,
    Color::DarkGreen,
    Color::DarkMagenta,
    Color::DarkYellow,
    Color::Green,
];

/// Dots available to one sweep of the address space.
const GRID_DOTS: u64 = (GRID_SIDE * GRID_SIDE) as u64;

/// Paints the worker's position onto the progress grid.
///
/// x1 parts use the whole 32x32 grid. x4 parts get a 16x16 quadrant per
/// lane: lane 0 top left, 1 top right, 2 bottom left, 3 bottom right.
#[derive(Debug, Default)]
pub struct Visualizer {
    previous: u32,
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.previous = 0;
    }

    /// Fill the whole grid with the idle colour.
    pub fn clear(panel: &mut impl FrontPanel) {
        for y in 0..GRID_SIDE {
            for x in 0..GRID_SIDE {
                panel.fill_dot(x, y, Color::DarkGray);
            }
        }
    }

    /// Paint every dot between the last position and the one in `snap`.
    pub fn update(&mut self, panel: &mut impl FrontPanel, snap: ProgressSnapshot, chip: &ChipInfo) {
        let current = grid_position(snap.addr, chip);
        let (ox, oy) = lane_origin(chip.bits, snap.lane);
        let color = PALETTE[snap.phase as usize % PALETTE.len()];

        if current > self.previous {
            for pos in self.previous..current {
                let (x, y) = dot(pos, chip.bits);
                panel.fill_dot(x + ox, y + oy, color);
            }
        } else {
            for pos in (current..self.previous).rev() {
                let (x, y) = dot(pos, chip.bits);
                panel.fill_dot(x + ox, y + oy, color);
            }
        }
        self.previous = current;
    }
}

/// Dot index for `addr`, scaled so one lane's sweep covers its area.
fn grid_position(addr: u32, chip: &ChipInfo) -> u32 {
    let scaled = addr as u64 * GRID_DOTS / chip.mem_size.max(1) as u64 / chip.bits.max(1) as u64;
    scaled as u32
}

fn lane_origin(bits: u32, lane: u8) -> (usize, usize) {
    const HALF: usize = GRID_SIDE / 2;
    if bits != 4 {
        return (0, 0);
    }
    match lane {
        1 => (HALF, 0),
        2 => (0, HALF),
        3 => (HALF, HALF),
        _ => (0, 0),
    }
}

fn dot(pos: u32, bits: u32) -> (usize, usize) {
    let pos = pos as usize;
    if bits == 4 {
        (pos & 0xf, (pos >> 4) & 0xf)
    } else {
        (pos & 0x1f, (pos >> 5) & 0x1f)
    }
}
