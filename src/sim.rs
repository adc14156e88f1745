use std::str::FromStr;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::debug;

use crate::chip::{ChipInfo, MemChip};
use crate::error::Error;

/// A defect injected into a [`SimChip`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Lane reads back `level` regardless of what was written. `addr` limits
    /// the fault to one cell; `None` affects every cell.
    StuckAt {
        lane: u32,
        level: bool,
        addr: Option<u32>,
    },
    /// Reads of `addr` come back with `lane` inverted.
    Flip { addr: u32, lane: u32 },
    /// Cells lose their contents once `retention` passes without a write.
    Leaky { retention: Duration },
}

impl FromStr for Fault {
    type Err = Error;

    /// Parses `stuck0:L[@A]`, `stuck1:L[@A]`, `flip:A:L` or `leaky:MICROS`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || Error::InvalidFault(s.to_string());
        let num = |t: &str| t.parse::<u32>().map_err(|_| bad());

        let (kind, rest) = s.split_once(':').ok_or_else(bad)?;
        match kind {
            "stuck0" | "stuck1" => {
                let (lane, addr) = match rest.split_once('@') {
                    Some((l, a)) => (num(l)?, Some(num(a)?)),
                    None => (num(rest)?, None),
                };
                Ok(Fault::StuckAt {
                    lane,
                    level: kind == "stuck1",
                    addr,
                })
            }
            "flip" => {
                let (a, l) = rest.split_once(':').ok_or_else(bad)?;
                Ok(Fault::Flip {
                    addr: num(a)?,
                    lane: num(l)?,
                })
            }
            "leaky" => {
                let micros = rest.parse::<u64>().map_err(|_| bad())?;
                Ok(Fault::Leaky {
                    retention: Duration::from_micros(micros),
                })
            }
            _ => Err(bad()),
        }
    }
}

#[derive(Clone, Copy)]
struct Cell {
    value: u32,
    written: Instant,
}

/// In-memory stand-in for a socketed chip.
///
/// The bus floats high while the chip is not configured: reads return all
/// ones and writes go nowhere.
pub struct SimChip {
    info: ChipInfo,
    cells: Mutex<Vec<Cell>>,
    faults: Vec<Fault>,
    configured: AtomicBool,
}

impl SimChip {
    pub fn new(info: ChipInfo) -> Self {
        Self::with_faults(info, Vec::new())
    }

    pub fn with_faults(info: ChipInfo, faults: Vec<Fault>) -> Self {
        let now = Instant::now();
        let cells = vec![Cell { value: 0, written: now }; info.mem_size as usize];
        Self {
            info,
            cells: Mutex::new(cells),
            faults,
            configured: AtomicBool::new(false),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.configured.load(Ordering::Acquire)
    }

    fn apply_read_faults(&self, addr: u32, cell: &Cell, now: Instant) -> u32 {
        let mut value = cell.value;
        for fault in &self.faults {
            match *fault {
                Fault::StuckAt { lane, level, addr: at } => {
                    if at.is_none_or(|a| a == addr) {
                        let m = 1u32 << lane;
                        value = if level { value | m } else { value & !m };
                    }
                }
                Fault::Flip { addr: at, lane } => {
                    if at == addr {
                        value ^= 1u32 << lane;
                    }
                }
                Fault::Leaky { retention } => {
                    if now.duration_since(cell.written) > retention {
                        value = 0;
                    }
                }
            }
        }
        value & self.info.data_mask()
    }
}

impl MemChip for SimChip {
    fn info(&self) -> &ChipInfo {
        &self.info
    }

    fn read(&self, addr: u32) -> u32 {
        if !self.is_configured() {
            return self.info.data_mask();
        }
        let cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        match cells.get(addr as usize) {
            Some(cell) => self.apply_read_faults(addr, cell, Instant::now()),
            None => self.info.data_mask(),
        }
    }

    fn write(&self, addr: u32, data: u32) {
        if !self.is_configured() {
            return;
        }
        let mut cells = self.cells.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(cell) = cells.get_mut(addr as usize) {
            cell.value = data & self.info.data_mask();
            cell.written = Instant::now();
        }
    }

    fn configure(&self, speed: usize, variant: usize) {
        let speed_name = self.info.speed_grades.get(speed).copied().unwrap_or("?");
        debug!(
            "{}: configure speed {} ({}) variant {}",
            self.info.name, speed, speed_name, variant
        );
        self.configured.store(true, Ordering::Release);
    }

    fn release(&self) {
        debug!("{}: release", self.info.name);
        self.configured.store(false, Ordering::Release);
    }
}
