use std::sync::atomic::{AtomicU64, Ordering};

/// Where the worker currently is. Only used to paint the progress map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub addr: u32,
    pub lane: u8,
    pub phase: u8,
}

impl ProgressSnapshot {
    fn pack(self) -> u64 {
        self.addr as u64 | (self.lane as u64) << 32 | (self.phase as u64) << 40
    }

    fn unpack(word: u64) -> Self {
        Self {
            addr: word as u32,
            lane: (word >> 32) as u8,
            phase: (word >> 40) as u8,
        }
    }
}

/// Single-writer, many-reader progress cell.
///
/// The whole snapshot lives in one atomic word, so readers never see a torn
/// value. Readers may still see a stale one; that is fine for display.
#[derive(Debug, Default)]
pub struct Progress {
    word: AtomicU64,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, snap: ProgressSnapshot) {
        self.word.store(snap.pack(), Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot::unpack(self.word.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.publish(ProgressSnapshot::default());
    }
}

/// Marker sent once each time the worker moves on to the next algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestId {
    MarchB = 0,
    Pseudo = 1,
    Refresh = 2,
}

impl TestId {
    pub fn name(self) -> &'static str {
        match self {
            TestId::MarchB => "March-B",
            TestId::Pseudo => "Pseudo",
            TestId::Refresh => "Refresh",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_then_snapshot() {
        let p = Progress::new();
        assert_eq!(p.snapshot(), ProgressSnapshot::default());
        let snap = ProgressSnapshot {
            addr: 262_143,
            lane: 3,
            phase: 15,
        };
        p.publish(snap);
        assert_eq!(p.snapshot(), snap);
        p.reset();
        assert_eq!(p.snapshot(), ProgressSnapshot::default());
    }

    #[test]
    fn test_fields_do_not_bleed() {
        let p = Progress::new();
        let snap = ProgressSnapshot {
            addr: u32::MAX,
            lane: 0,
            phase: 0xff,
        };
        p.publish(snap);
        assert_eq!(p.snapshot(), snap);
    }

    #[test]
    fn test_names() {
        assert_eq!(TestId::MarchB.name(), "March-B");
        assert_eq!(TestId::Pseudo as u8, 1);
        assert_eq!(TestId::Refresh.name(), "Refresh");
    }
}
