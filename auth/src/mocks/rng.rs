//! Random source that always fails.

use rand::{CryptoRng, Error, RngCore};
use std::io;

/// Random source whose fallible methods always fail, standing in for an
/// unavailable OS entropy source.
#[derive(Debug, Clone, Copy, Default)]
pub struct FailingRng;

impl RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        dest.fill(0);
    }

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), Error> {
        Err(Error::new(io::Error::other("entropy source unavailable")))
    }
}

impl CryptoRng for FailingRng {}
