use crate::bench::TestBench;
use crate::driver::TestResult;
use crate::psrand::{BitStream, SeedTable};

/// Seeded pseudorandom write/read-back over every stream in `seeds`.
///
/// For each stream the whole chip is filled from the stream, the stream is
/// replayed from its seed, and every cell is compared. The first mismatch
/// fails the test with no lane information.
pub fn psrandom_test(bench: &mut TestBench, seeds: &SeedTable, addr_size: u32, bits: u32) -> TestResult {
    let mut stream = BitStream::new(seeds.get(0));

    for (i, seed) in seeds.iter().enumerate() {
        bench.set_phase((i >> 2) as u32);
        bench.set_lane((i & 3) as u32);

        stream.reseed(seed);
        for addr in 0..addr_size {
            let out = stream.next_bits(bits);
            bench.write(addr, out);
        }

        stream.reseed(seed);
        for addr in 0..addr_size {
            let expected = stream.next_bits(bits);
            if bench.read(addr) != expected {
                return TestResult::FAILED;
            }
        }
    }

    TestResult::PASSED
}
