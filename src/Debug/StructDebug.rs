use std::fmt;
use crate::Diode::Buffer::{ManyToOne, Slot, SlotState, Stamp};
use crate::Diode::{Consumer, Producer};

/// Debug function for ManyToOne
///
/// Shows the cursors and loss counters. Slot contents are never formatted,
/// so `T` needs no `Debug` bound and nothing races with the writers.
pub fn debug_many_to_one<T>(diode: &ManyToOne<T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ManyToOne")
        .field("capacity", &diode.capacity())
        .field("claimed", &diode.claimed())
        .field("read_index", &diode.read_index())
        .field("collisions", &diode.collisions())
        .field("dropped", &diode.dropped())
        .finish_non_exhaustive()
}

/// Debug function for Slot
///
/// Displays the stamp only; the value is opaque.
pub fn debug_slot<T>(slot: &Slot<T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Slot")
        .field("stamp", &slot.stamp())
        .field("value", &"<opaque>")
        .finish()
}

/// Debug function for Stamp
///
/// Renders as `Ready(12)`, `Taken(3)`, `Busy(7)` or `Empty`.
pub fn debug_stamp(stamp: Stamp, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match stamp.state() {
        SlotState::Empty => f.write_str("Empty"),
        SlotState::Busy => f.debug_tuple("Busy").field(&stamp.sequence()).finish(),
        SlotState::Ready => f.debug_tuple("Ready").field(&stamp.sequence()).finish(),
        SlotState::Taken => f.debug_tuple("Taken").field(&stamp.sequence()).finish(),
    }
}

/// Debug function for Producer
pub fn debug_producer<T>(producer: &Producer<T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Producer")
        .field("diode", producer.diode())
        .finish()
}

/// Debug function for Consumer
pub fn debug_consumer<T>(consumer: &Consumer<T>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Consumer")
        .field("diode", consumer.diode())
        .field("has_producers", &consumer.has_producers())
        .finish()
}
