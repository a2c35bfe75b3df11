use super::*;
use crate::Diode::Structs::DiodeStats;
use std::sync::atomic::Ordering;

/// Getter methods for ManyToOne
///
/// These are intended for monitoring. All loads are relaxed, so values read
/// while writers are active may already be stale.
impl<T> ManyToOne<T> {
    /// Number of slots in the ring
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of sequence numbers handed out to writers so far
    ///
    /// Includes sequences abandoned after a collision.
    pub fn claimed(&self) -> u64 {
        self.write_index.load(Ordering::Relaxed).wrapping_add(1)
    }

    /// The next sequence number the consumer expects to read
    pub fn read_index(&self) -> u64 {
        self.read_index.load(Ordering::Relaxed)
    }

    /// Total write collisions observed
    ///
    /// A steadily growing count means the ring is too small for the number of
    /// concurrent writers.
    pub fn collisions(&self) -> u64 {
        self.collisions.load(Ordering::Relaxed)
    }

    /// Total values reported as dropped to the alerter
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> DiodeStats {
        DiodeStats {
            capacity: self.capacity(),
            claimed: self.claimed(),
            read_index: self.read_index(),
            collisions: self.collisions(),
            dropped: self.dropped(),
        }
    }
}
