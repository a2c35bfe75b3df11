// Point-in-time counters of a diode, for monitoring and capacity tuning

/// Snapshot of a diode's cursors and loss counters.
///
/// The fields are sampled one after the other with relaxed loads, so under
/// concurrent writes they are individually accurate but not mutually
/// consistent.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DiodeStats {
    /// Number of slots in the ring.
    pub capacity: usize,
    /// Sequence numbers handed out to writers so far.
    pub claimed: u64,
    /// Next sequence the consumer expects.
    pub read_index: u64,
    /// Writes that had to claim a new sequence because a newer write owned
    /// their slot.
    pub collisions: u64,
    /// Values overwritten before the consumer could read them.
    pub dropped: u64,
}

impl DiodeStats {
    /// Sequences claimed but not yet consumed or reported as dropped.
    ///
    /// May exceed `capacity` right before the consumer notices it was lapped.
    pub fn backlog(&self) -> u64 {
        self.claimed.saturating_sub(self.read_index)
    }
}
