// This is the slot array shared by every producer and the single consumer

use super::layout::{SlotState, Stamp};
use crate::Diode::Alerter;

use crossbeam_utils::CachePadded;
use parking_lot::RwLock;
use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::{Acquire, Release};

/// A single position of the ring.
///
/// The `stamp` is the core of the synchronization:
/// - A producer CASes the stamp it observed to `BUSY(seq)`, moves its value
///   in and publishes `READY(seq)`.
/// - The consumer CASes `READY(seq)` to `BUSY(seq)`, moves the value out and
///   publishes `TAKEN(seq)`.
///
/// Nobody ever waits for a `BUSY` slot to clear. `value` is initialized
/// exactly when the stamp is `READY`.
#[repr(C, align(64))]
pub struct Slot<T> {
    pub(crate) stamp: AtomicU64,
    pub(crate) value: UnsafeCell<MaybeUninit<T>>,
}

impl<T> Slot<T> {
    pub(crate) fn new() -> Self {
        Self {
            stamp: AtomicU64::new(Stamp::EMPTY.raw()),
            value: UnsafeCell::new(MaybeUninit::uninit()),
        }
    }

    #[inline]
    pub(crate) fn stamp(&self) -> Stamp {
        Stamp::from_raw(self.stamp.load(Acquire))
    }

    /// Install the value of write `sequence`, provided the slot still holds
    /// `observed`.
    ///
    /// On success returns the unread value that was overwritten, if any. It is
    /// handed back instead of dropped in place so that user `Drop` code never
    /// runs while the slot is `BUSY`.
    /// On failure returns the stamp found instead together with `value`.
    pub(crate) fn install(
        &self,
        observed: Stamp,
        sequence: u64,
        value: T,
    ) -> Result<Option<T>, (Stamp, T)> {
        debug_assert!(observed.state() != SlotState::Busy);
        if let Err(current) = self.stamp.compare_exchange_weak(
            observed.raw(),
            Stamp::busy(sequence).raw(),
            Acquire,
            Acquire,
        ) {
            return Err((Stamp::from_raw(current), value));
        }

        // Safety: the successful CAS to BUSY gives this thread exclusive access
        // to `value` until the stamp is published below. The old content is
        // initialized iff the observed stamp was READY.
        let previous = unsafe {
            let cell = &mut *self.value.get();
            let previous = if observed.state() == SlotState::Ready {
                Some(cell.assume_init_read())
            } else {
                None
            };
            cell.write(value);
            previous
        };
        self.stamp.store(Stamp::ready(sequence).raw(), Release);
        Ok(previous)
    }

    /// Move out the value of write `sequence`.
    ///
    /// Returns `None` if the slot no longer holds `READY(sequence)`, i.e. a
    /// producer got to it first.
    pub(crate) fn take(&self, sequence: u64) -> Option<T> {
        self.stamp
            .compare_exchange(
                Stamp::ready(sequence).raw(),
                Stamp::busy(sequence).raw(),
                Acquire,
                Acquire,
            )
            .ok()?;

        // Safety: READY guarantees an initialized value and the CAS to BUSY
        // excludes every producer until TAKEN is published.
        let value = unsafe { (*self.value.get()).assume_init_read() };
        self.stamp.store(Stamp::taken(sequence).raw(), Release);
        Some(value)
    }
}

impl<T> Drop for Slot<T> {
    fn drop(&mut self) {
        if Stamp::from_raw(*self.stamp.get_mut()).state() == SlotState::Ready {
            // Safety: READY means the value is initialized and never moved out.
            unsafe { self.value.get_mut().assume_init_drop() };
        }
    }
}

/// A lossy, lock-free, many-producer, single-consumer ring buffer.
///
/// ### Concurrency Design:
/// - **Producers (write)**: claim a sequence by atomically incrementing
///   `write_index` and install their value at `sequence % capacity`, unless a
///   newer write already landed there.
/// - **Consumer (try_read)**: follows `read_index`. When it finds a slot that
///   was overwritten by a later lap it fast-forwards to the oldest value still
///   held and reports the gap to the `alerter`.
///
/// `lock` is taken shared by every write and exclusively only while the
/// consumer recomputes its cursor after being lapped.
///
/// Only one thread may read at a time. Concurrent readers cannot corrupt
/// memory, since values only move under a `BUSY` claim, but they will skip
/// and reorder values.
pub struct ManyToOne<T> {
    /// Last sequence handed out. Starts at `u64::MAX` so the first write gets 0.
    pub(crate) write_index: CachePadded<AtomicU64>,

    pub(crate) buffer: Box<[Slot<T>]>,

    /// Next sequence the consumer expects. Written by the consumer only.
    pub(crate) read_index: CachePadded<AtomicU64>,

    pub(crate) alerter: Box<dyn Alerter>,

    pub(crate) lock: RwLock<()>,

    /// Writes that lost their sequence to a newer one in the same slot.
    pub(crate) collisions: AtomicU64,

    /// Values overwritten before the consumer saw them.
    pub(crate) dropped: AtomicU64,
}

// Safety: values of `T` are only moved between threads, always under a BUSY
// claim on their slot.
unsafe impl<T: Send> Send for ManyToOne<T> {}
unsafe impl<T: Send> Sync for ManyToOne<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use memoffset::offset_of;
    use std::mem::{align_of, size_of};
    use std::sync::Arc;

    #[test]
    fn slot_layout() {
        // the stamp leads the slot and every slot owns its cache line
        assert_eq!(offset_of!(Slot<u64>, stamp), 0);
        assert_eq!(offset_of!(Slot<u64>, value), 8);
        assert_eq!(align_of::<Slot<u64>>(), 64);
        assert_eq!(size_of::<Slot<u64>>(), 64);
        assert_eq!(size_of::<Slot<[u8; 100]>>(), 128);
    }

    #[test]
    fn install_then_take() {
        let slot = Slot::new();
        assert_eq!(slot.stamp(), Stamp::EMPTY);

        assert!(matches!(slot.install(Stamp::EMPTY, 0, "a"), Ok(None)));
        assert_eq!(slot.stamp(), Stamp::ready(0));

        // wrong sequence: nothing moves
        assert_eq!(slot.take(4), None);
        assert_eq!(slot.take(0), Some("a"));
        assert_eq!(slot.stamp(), Stamp::taken(0));
        assert_eq!(slot.take(0), None);
    }

    #[test]
    fn install_hands_back_the_lapped_value() {
        let slot = Slot::new();
        assert!(slot.install(Stamp::EMPTY, 1, 10u32).is_ok());
        match slot.install(Stamp::ready(1), 5, 50u32) {
            Ok(previous) => assert_eq!(previous, Some(10)),
            Err(_) => panic!("install over a READY stamp failed"),
        }
        assert_eq!(slot.take(5), Some(50));
    }

    #[test]
    fn install_with_stale_observation_returns_the_value() {
        let slot = Slot::new();
        assert!(slot.install(Stamp::EMPTY, 2, 1u8).is_ok());
        match slot.install(Stamp::EMPTY, 6, 2u8) {
            Ok(_) => panic!("install succeeded against a stale stamp"),
            Err((current, value)) => {
                assert_eq!(current, Stamp::ready(2));
                assert_eq!(value, 2);
            }
        }
    }

    #[test]
    fn dropping_a_ready_slot_drops_its_value() {
        let tracked = Arc::new(());
        {
            let slot = Slot::new();
            assert!(slot.install(Stamp::EMPTY, 0, Arc::clone(&tracked)).is_ok());
            assert_eq!(Arc::strong_count(&tracked), 2);
        }
        assert_eq!(Arc::strong_count(&tracked), 1);

        // a taken slot must not drop the value a second time
        let slot = Slot::new();
        assert!(slot.install(Stamp::EMPTY, 0, Arc::clone(&tracked)).is_ok());
        let taken = slot.take(0);
        drop(slot);
        assert_eq!(Arc::strong_count(&tracked), 2);
        drop(taken);
        assert_eq!(Arc::strong_count(&tracked), 1);
    }
}
