/// Static description of one memory-chip configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipInfo {
    /// Name shown in the device menu.
    pub name: &'static str,
    /// Number of addressable cells.
    pub mem_size: u32,
    /// Data bits per cell (1 or 4 for the supported parts). Must be in
    /// `1..=32`; jobs for wider parts are refused at submit.
    pub bits: u32,
    /// Speed grade labels, fastest first.
    pub speed_grades: &'static [&'static str],
    /// Variant labels, if the part comes in more than one flavour.
    pub variants: Option<&'static [&'static str]>,
}

impl ChipInfo {
    /// Mask covering every data bit of a cell.
    pub fn data_mask(&self) -> u32 {
        data_mask(self.bits)
    }

    pub fn has_variants(&self) -> bool {
        self.variants.is_some()
    }
}

/// Mask with the low `bits` bits set.
pub fn data_mask(bits: u32) -> u32 {
    ((1u64 << bits) - 1) as u32
}

/// The capability contract every memory chip is tested through.
///
/// Verification algorithms only ever see this trait. Implementations use
/// interior mutability because the chip is configured from the interactive
/// context and exercised from the worker context; the operator guarantees
/// that exactly one chip sits between a `configure` and its `release`.
pub trait MemChip: Send + Sync {
    fn info(&self) -> &ChipInfo;

    /// Read one cell. Only the low `info().bits` bits may be set.
    fn read(&self, addr: u32) -> u32;

    /// Write one cell. Bits above `info().bits` are ignored.
    fn write(&self, addr: u32, data: u32);

    /// Bring the chip up at the given speed grade and variant.
    ///
    /// Afterwards `read`/`write` must be valid. The outcome is never checked:
    /// a bad setup surfaces as a verification failure.
    fn configure(&self, speed: usize, variant: usize);

    /// Tear the chip down. Must be safe even if `configure` went wrong.
    fn release(&self);
}
