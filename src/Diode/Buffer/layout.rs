// Per-slot stamp layout.
//
// A slot's whole synchronization state lives in one `u64` so that a single
// compare-and-swap both claims the slot and proves what was in it before.

/// Number of low bits reserved for the slot state.
pub const STATE_BITS: u32 = 2;

/// Mask selecting the state bits of a raw stamp.
pub const STATE_MASK: u64 = (1 << STATE_BITS) - 1;

/// Largest sequence number a stamp can carry (62 bits).
pub const MAX_SEQUENCE: u64 = u64::MAX >> STATE_BITS;

const EMPTY: u64 = 0b00;
const BUSY: u64 = 0b01;
const READY: u64 = 0b10;
const TAKEN: u64 = 0b11;

/// What a slot currently holds.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// Never written.
    Empty,
    /// A producer or the consumer is moving the value of the stamp's
    /// sequence in or out.
    Busy,
    /// Holds the value written with the stamp's sequence.
    Ready,
    /// The value written with the stamp's sequence was consumed.
    Taken,
}

/// Packed `(sequence, state)` pair stored in a slot's atomic word.
///
/// Layout: `sequence << 2 | state`. The all-zero stamp is [`Stamp::EMPTY`],
/// so a zeroed slot array is a valid empty ring.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Stamp(u64);

impl Stamp {
    pub const EMPTY: Stamp = Stamp(EMPTY);

    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Stamp(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Stamp for a slot claimed to move the value of write `sequence`.
    #[inline]
    pub const fn busy(sequence: u64) -> Self {
        Stamp((sequence << STATE_BITS) | BUSY)
    }

    /// Stamp for a slot holding the value of write `sequence`.
    #[inline]
    pub const fn ready(sequence: u64) -> Self {
        Stamp((sequence << STATE_BITS) | READY)
    }

    /// Stamp for a slot whose value of write `sequence` was consumed.
    #[inline]
    pub const fn taken(sequence: u64) -> Self {
        Stamp((sequence << STATE_BITS) | TAKEN)
    }

    #[inline]
    pub const fn state(self) -> SlotState {
        match self.0 & STATE_MASK {
            EMPTY => SlotState::Empty,
            BUSY => SlotState::Busy,
            READY => SlotState::Ready,
            _ => SlotState::Taken,
        }
    }

    /// Sequence of the write that filled (or is filling) the slot.
    ///
    /// Meaningless for `Empty` stamps.
    #[inline]
    pub const fn sequence(self) -> u64 {
        self.0 >> STATE_BITS
    }

    /// True when the stamp carries a sequence number.
    #[inline]
    pub const fn is_written(self) -> bool {
        matches!(self.state(), SlotState::Ready | SlotState::Taken)
    }
}
