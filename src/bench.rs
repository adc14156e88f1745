use crate::chip::MemChip;
use crate::progress::{Progress, ProgressSnapshot};

/// What an algorithm runs against: the chip under test plus the progress
/// cell it reports into.
///
/// Every cell access goes through here so the published address always
/// follows the one being exercised.
pub struct TestBench<'a> {
    chip: &'a dyn MemChip,
    progress: &'a Progress,
    snap: ProgressSnapshot,
}

impl<'a> TestBench<'a> {
    pub fn new(chip: &'a dyn MemChip, progress: &'a Progress) -> Self {
        Self {
            chip,
            progress,
            snap: ProgressSnapshot::default(),
        }
    }

    pub fn chip(&self) -> &dyn MemChip {
        self.chip
    }

    /// Mask covering every data bit of the chip.
    pub fn data_mask(&self) -> u32 {
        self.chip.info().data_mask()
    }

    pub fn set_lane(&mut self, lane: u32) {
        self.snap.lane = lane as u8;
        self.progress.publish(self.snap);
    }

    pub fn set_phase(&mut self, phase: u32) {
        self.snap.phase = phase as u8;
        self.progress.publish(self.snap);
    }

    pub fn read(&mut self, addr: u32) -> u32 {
        self.visit(addr);
        self.chip.read(addr)
    }

    pub fn write(&mut self, addr: u32, data: u32) {
        self.visit(addr);
        self.chip.write(addr, data);
    }

    fn visit(&mut self, addr: u32) {
        if self.snap.addr != addr {
            self.snap.addr = addr;
            self.progress.publish(self.snap);
        }
    }
}
