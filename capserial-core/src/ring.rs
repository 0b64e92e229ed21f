//! Receive ring buffer
//!
//! Fixed-capacity single-producer / single-consumer byte ring. The capture
//! handler is the only producer and moves `write`; the foreground is the
//! only consumer and moves `read`. Each index is a single atomic word, so
//! neither side needs a lock.
//!
//! One slot is sacrificed: the ring holds at most `N - 1` bytes. A push
//! that makes `write == read` still stores its byte but reports overflow;
//! the ring then reads as empty until the next push.

use portable_atomic::{AtomicU8, AtomicUsize, Ordering};

/// Lock-free SPSC byte ring with `N` slots
#[derive(Debug)]
pub struct RxRing<const N: usize> {
    slots: [AtomicU8; N],
    write: AtomicUsize,
    read: AtomicUsize,
}

impl<const N: usize> Default for RxRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> RxRing<N> {
    const CAPACITY_OK: () = assert!(N >= 2, "receive ring needs at least two slots");

    /// Create an empty ring
    pub const fn new() -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::CAPACITY_OK;
        Self {
            slots: [const { AtomicU8::new(0) }; N],
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    /// Number of physical slots
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Store `byte` and advance the write index (producer only)
    ///
    /// Returns true if the advanced write index caught up with the read
    /// index, i.e. the ring overflowed.
    pub fn push(&self, byte: u8) -> bool {
        let write = self.write.load(Ordering::Relaxed);
        self.slots[write].store(byte, Ordering::Relaxed);

        let next = advance::<N>(write);
        self.write.store(next, Ordering::Release);
        next == self.read.load(Ordering::Acquire)
    }

    /// Oldest byte without consuming it (consumer only)
    pub fn peek(&self) -> Option<u8> {
        let read = self.read.load(Ordering::Relaxed);
        if read == self.write.load(Ordering::Acquire) {
            return None;
        }
        Some(self.slots[read].load(Ordering::Relaxed))
    }

    /// Take the oldest byte (consumer only)
    pub fn pop(&self) -> Option<u8> {
        let read = self.read.load(Ordering::Relaxed);
        if read == self.write.load(Ordering::Acquire) {
            return None;
        }
        let byte = self.slots[read].load(Ordering::Relaxed);
        self.read.store(advance::<N>(read), Ordering::Release);
        Some(byte)
    }

    /// Number of bytes waiting to be read
    pub fn occupancy(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        (N + write - read) % N
    }

    /// Check if no byte is waiting
    pub fn is_empty(&self) -> bool {
        self.occupancy() == 0
    }

    /// Discard all contents
    ///
    /// Moves both indices, so the caller must make sure the producer cannot
    /// run (e.g. by holding a critical section).
    pub fn reset(&self) {
        self.write.store(0, Ordering::Release);
        self.read.store(0, Ordering::Release);
    }
}

fn advance<const N: usize>(index: usize) -> usize {
    if index + 1 >= N {
        0
    } else {
        index + 1
    }
}
