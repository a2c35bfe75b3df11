use std::io;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Relaxed};

use crossbeam_utils::CachePadded;
use log::{debug, trace};
use parking_lot::RwLock;

use super::layout::{SlotState, Stamp};
use super::Buffer::{ManyToOne, Slot};
use crate::Diode::{Alerter, NoopAlerter};

impl<T> ManyToOne<T> {
    /// Create a diode with `capacity` slots.
    ///
    /// The `alerter` runs on the consumer's thread whenever it finds that it
    /// was lapped. `None` ignores drops.
    ///
    /// # Errors
    /// `InvalidInput` if `capacity` is zero.
    pub fn new(capacity: usize, alerter: Option<Box<dyn Alerter>>) -> io::Result<Self> {
        if capacity == 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "ManyToOne::new(): capacity must be at least one slot",
            ));
        }

        let buffer: Box<[Slot<T>]> = (0..capacity).map(|_| Slot::new()).collect();

        Ok(Self {
            // Start the write index at the value before 0 so that the first
            // fetch_add still hands out sequence 0.
            write_index: CachePadded::new(AtomicU64::new(u64::MAX)),
            buffer,
            read_index: CachePadded::new(AtomicU64::new(0)),
            alerter: alerter.unwrap_or_else(|| Box::new(NoopAlerter)),
            lock: RwLock::new(()),
            collisions: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        })
    }

    #[inline]
    fn slot(&self, sequence: u64) -> &Slot<T> {
        &self.buffer[(sequence % self.buffer.len() as u64) as usize]
    }

    /// Write `value` into the next slot of the ring.
    ///
    /// Never waits for the consumer or for other writers. If the consumer is a
    /// full lap behind, the oldest unread value in the target slot is
    /// overwritten and dropped.
    pub fn write(&self, value: T) {
        // dropped here, after the shared lock is gone
        let _lapped = self.publish(value);
    }

    /// Claim sequences until one of them lands. Returns the unread value the
    /// write lapped, if any.
    fn publish(&self, mut value: T) -> Option<T> {
        let _shared = self.lock.read();
        loop {
            let sequence = self.write_index.fetch_add(1, AcqRel).wrapping_add(1);
            match self.place(sequence, value) {
                Ok(lapped) => return lapped,
                Err(returned) => value = returned,
            }
        }
    }

    /// Install `value` as write `sequence`, or hand it back if the sequence
    /// has to be given up.
    ///
    /// A sequence is given up when a write from a later lap already owns the
    /// slot, or when someone else is moving a value in or out of it. Either
    /// way this returns at once and the caller claims a fresh sequence.
    fn place(&self, sequence: u64, mut value: T) -> Result<Option<T>, T> {
        let capacity = self.buffer.len() as u64;
        let slot = self.slot(sequence);
        let mut observed = slot.stamp();

        loop {
            // Distance check: it may give up a sequence it didn't strictly
            // have to, never the reverse.
            let stale = observed.state() != SlotState::Empty
                && observed.sequence().saturating_add(capacity) > sequence;
            if stale || observed.state() == SlotState::Busy {
                self.collisions.fetch_add(1, Relaxed);
                trace!(
                    "diode write collision at sequence {} ({:?}): consider using a larger diode",
                    sequence,
                    observed
                );
                return Err(value);
            }

            match slot.install(observed, sequence, value) {
                Ok(lapped) => return Ok(lapped),
                Err((current, returned)) => {
                    observed = current;
                    value = returned;
                }
            }
        }
    }

    /// Attempt to read the next value.
    ///
    /// Returns `None` when nothing new is available. Must only be called from
    /// one thread at a time.
    pub fn try_read(&self) -> Option<T> {
        loop {
            let read_index = self.read_index.load(Relaxed);
            let slot = self.slot(read_index);
            let stamp = slot.stamp();

            // A later lap overwrote the value we expected at this index: the
            // writers passed us. Fast forward to the oldest value still held.
            //
            //    capacity 4, six writes, nothing read yet
            //    `| 4 | 5 | 2 | 3 |` r: 0, w: 5
            //    slot 0 holds 4 > 0, so sequences 0 and 1 are gone
            //    `| 4 | 5 | - | 3 |` r: 3, w: 5   (2 returned, alerter gets 2)
            if stamp.state() != SlotState::Empty && stamp.sequence() > read_index {
                return self.catch_up(read_index);
            }

            if stamp == Stamp::ready(read_index) {
                if let Some(value) = slot.take(read_index) {
                    self.read_index.store(read_index + 1, Relaxed);
                    return Some(value);
                }
                // overwritten between the load and the take; inspect again
                continue;
            }

            // The write for `read_index` is still in flight, or its writer
            // gave the sequence up.
            if !self.skip_abandoned(read_index) {
                return None;
            }
        }
    }

    /// Step the read index over sequences whose writers gave them up.
    ///
    /// A given-up sequence looks just like a write still in flight, except
    /// when no write is in flight at all. So this only proceeds if the
    /// exclusive lock is free right now and never waits for it.
    /// Returns true if the caller should look at the slot again.
    fn skip_abandoned(&self, read_index: u64) -> bool {
        if self.claimed() <= read_index {
            return false;
        }
        let Some(_exclusive) = self.lock.try_write() else {
            return false;
        };

        let head = self.write_index.load(Acquire).wrapping_add(1);
        let next = self.first_landed(read_index, head);
        if next != read_index {
            trace!(
                "diode skipped {} abandoned sequences, resuming at sequence {}",
                next - read_index,
                next
            );
            self.read_index.store(next, Relaxed);
        }
        true
    }

    /// First sequence in `from..head` whose slot holds that write or a newer
    /// one, or `head` if there is none. Only meaningful while no write is in
    /// flight.
    fn first_landed(&self, from: u64, head: u64) -> u64 {
        (from..head)
            .find(|&sequence| {
                let stamp = self.slot(sequence).stamp();
                stamp.is_written() && stamp.sequence() >= sequence
            })
            .unwrap_or(head)
    }

    /// Recompute the read index after being lapped and read the oldest value.
    ///
    /// Runs under the exclusive lock so that no write is in flight while the
    /// write index is sampled.
    fn catch_up(&self, read_index: u64) -> Option<T> {
        let _exclusive = self.lock.write();
        let capacity = self.buffer.len() as u64;
        let head = self.write_index.load(Acquire).wrapping_add(1);

        let oldest = head.checked_sub(capacity).filter(|&oldest| oldest > read_index);
        let Some(oldest) = oldest else {
            debug_assert!(
                false,
                "diode lapped with head {} not a lap ahead of read index {}",
                head, read_index
            );
            return None;
        };
        let dropped = oldest - read_index;

        // Move the cursor before alerting so a panicking alerter leaves a
        // consistent reader behind.
        self.read_index.store(oldest, Relaxed);
        self.dropped.fetch_add(dropped, Relaxed);
        debug!(
            "diode lapped: dropped {} values, resuming at sequence {}",
            dropped, oldest
        );
        self.alerter.alert(dropped);

        // Sequences given up by their writers hold nothing and are not drops.
        let next = self.first_landed(oldest, head);
        self.read_index.store(next, Relaxed);
        let value = self.slot(next).take(next)?;
        self.read_index.store(next + 1, Relaxed);
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;
    use std::sync::atomic::Ordering;
    use std::sync::{mpsc, Arc};
    use std::thread;
    use std::time::Duration;

    fn filled(capacity: usize, values: std::ops::Range<u64>) -> ManyToOne<u64> {
        let diode = ManyToOne::new(capacity, None).unwrap();
        for value in values {
            diode.write(value);
        }
        diode
    }

    #[test]
    fn stale_sequence_on_first_lap_keeps_newer_value() {
        // Six writes into four slots: slot 0 holds sequence 4. A writer that
        // claimed sequence 0 and stalled must not land on top of it.
        let diode = filled(4, 100..106);
        assert_eq!(diode.slot(0).stamp(), Stamp::ready(4));

        assert_eq!(diode.place(0, 999), Err(999));
        assert_eq!(diode.collisions(), 1);
        assert_eq!(diode.slot(0).stamp(), Stamp::ready(4));
        assert_eq!(diode.slot(0).take(4), Some(104));
    }

    #[test]
    fn stale_sequence_against_consumed_slot_is_given_up() {
        let diode = filled(4, 0..8);
        let read: Vec<u64> = std::iter::from_fn(|| diode.try_read()).collect();
        assert_eq!(read, vec![4, 5, 6, 7]);
        assert_eq!(diode.slot(2).stamp(), Stamp::taken(6));

        assert_eq!(diode.place(2, 999), Err(999));
        assert_eq!(diode.collisions(), 1);
        assert_eq!(diode.slot(2).stamp(), Stamp::taken(6));
        // the next lap is not stale
        assert_eq!(diode.place(10, 10), Ok(None));
    }

    #[test]
    fn stale_write_claims_a_fresh_sequence() {
        // slots: | 4 | 5 | 2 | 3 |
        let diode = filled(4, 100..106);
        assert_eq!(diode.claimed(), 6);

        // Rewind the write index as if this writer had claimed sequence 0
        // before everybody else.
        diode.write_index.store(u64::MAX, Ordering::Relaxed);
        diode.write(999);

        // 0..=5 all collide with a newer or equal stamp, 6 lands in slot 2
        assert_eq!(diode.collisions(), 6);
        assert_eq!(diode.claimed(), 7);
        assert_eq!(diode.slot(2).stamp(), Stamp::ready(6));
        assert_eq!(diode.slot(0).take(4), Some(104));
        assert_eq!(diode.slot(1).take(5), Some(105));
        assert_eq!(diode.slot(2).take(6), Some(999));
    }

    #[test]
    fn write_does_not_wait_for_a_slot_being_taken() {
        let diode = Arc::new(filled(4, 0..4));
        // The consumer is stuck halfway through taking sequence 0.
        diode.slot(0).stamp.store(Stamp::busy(0).raw(), Ordering::Release);

        let (done_tx, done_rx) = mpsc::channel();
        let writer = {
            let diode = Arc::clone(&diode);
            thread::spawn(move || {
                diode.write(4);
                done_tx.send(()).unwrap();
            })
        };
        done_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("write blocked on a busy slot");
        writer.join().unwrap();

        // sequence 4 was given up, 5 landed on slot 1
        assert_eq!(diode.collisions(), 1);
        assert_eq!(diode.claimed(), 6);
        assert_eq!(diode.slot(0).stamp(), Stamp::busy(0));
        assert_eq!(diode.slot(1).stamp(), Stamp::ready(5));

        // The consumer wakes up again; its value is still in place.
        diode.slot(0).stamp.store(Stamp::ready(0).raw(), Ordering::Release);
        let read: Vec<u64> = std::iter::from_fn(|| diode.try_read()).collect();
        assert_eq!(read, vec![0, 2, 3, 5]);
        // only value 1 was lost; the given-up sequence 4 is not a drop
        assert_eq!(diode.dropped(), 1);
        assert_eq!(diode.read_index(), 6);
    }

    #[test]
    fn write_does_not_wait_for_an_older_writer() {
        let diode = filled(2, 0..1);
        // A writer from the previous lap is halfway through installing
        // sequence 1 when sequence 3 comes around.
        diode.write_index.store(2, Ordering::Relaxed);
        diode.slot(1).stamp.store(Stamp::busy(1).raw(), Ordering::Release);

        diode.write(30);
        assert_eq!(diode.collisions(), 1);
        // 3 was given up, 4 landed on slot 0 and lapped value 0
        assert_eq!(diode.claimed(), 5);
        assert_eq!(diode.slot(0).stamp(), Stamp::ready(4));
        assert_eq!(diode.slot(0).take(4), Some(30));
        diode.slot(1).stamp.store(Stamp::EMPTY.raw(), Ordering::Release);
    }

    #[test]
    fn write_in_flight_is_not_skipped() {
        let diode = filled(4, 0..2);
        let in_flight = diode.lock.read();
        // sequence 2 is claimed but not installed yet
        diode.write_index.store(2, Ordering::Relaxed);

        assert_eq!(diode.try_read(), Some(0));
        assert_eq!(diode.try_read(), Some(1));
        assert_eq!(diode.try_read(), None);
        assert_eq!(diode.read_index(), 2);

        // the writer finishes
        assert_eq!(diode.place(2, 2), Ok(None));
        drop(in_flight);
        assert_eq!(diode.try_read(), Some(2));
        assert_eq!(diode.try_read(), None);
    }

    #[test]
    fn abandoned_sequence_is_skipped_once_writers_are_idle() {
        let diode = filled(4, 0..2);
        // sequence 2 was claimed and given up, 3 landed
        diode.write_index.store(2, Ordering::Relaxed);
        diode.write(3);

        assert_eq!(diode.try_read(), Some(0));
        assert_eq!(diode.try_read(), Some(1));
        assert_eq!(diode.try_read(), Some(3));
        assert_eq!(diode.try_read(), None);
        assert_eq!(diode.dropped(), 0);
        assert_eq!(diode.read_index(), 4);
    }

    /// Records whether the diode's lock was held when it was dropped.
    struct LockWitness {
        lock: *const RwLock<()>,
        locked_at_drop: Option<Rc<Cell<Option<bool>>>>,
    }

    impl Drop for LockWitness {
        fn drop(&mut self) {
            if let Some(locked) = &self.locked_at_drop {
                // Safety: the witness is dropped while its diode is alive.
                locked.set(Some(unsafe { (*self.lock).is_locked() }));
            }
        }
    }

    #[test]
    fn lapped_value_is_dropped_outside_the_lock() {
        let diode = ManyToOne::<LockWitness>::new(1, None).unwrap();
        let lock: *const RwLock<()> = &diode.lock;
        let locked = Rc::new(Cell::new(None));

        diode.write(LockWitness {
            lock,
            locked_at_drop: Some(Rc::clone(&locked)),
        });
        diode.write(LockWitness {
            lock,
            locked_at_drop: None,
        });

        assert_eq!(locked.get(), Some(false));
    }
}
