// src/Diode/consumer.rs

use super::ManyToOne;
use crate::Diode::Structs::DiodeStats;
use std::fmt;
use std::sync::Arc;

/// The reading half of a diode.
///
/// There is exactly one consumer per diode. It cannot be cloned and reads
/// take `&mut self`, so the single-reader requirement is checked at compile
/// time.
pub struct Consumer<T> {
    diode: Arc<ManyToOne<T>>,
}

impl<T> Consumer<T> {
    pub(crate) fn new(diode: Arc<ManyToOne<T>>) -> Self {
        Self { diode }
    }

    /// Reads the next value if one is available.
    ///
    /// # Returns
    /// * `Some(value)` with the next value in write order
    /// * `None` if nothing new has been written
    ///
    /// If the producers lapped the consumer, the alerter is called with the
    /// number of lost values before the oldest retained value is returned.
    pub fn try_read(&mut self) -> Option<T> {
        self.diode.try_read()
    }

    /// Returns an iterator over the values currently available.
    ///
    /// The iterator ends at the first empty read; values written afterwards
    /// are picked up by the next call.
    pub fn drain(&mut self) -> Drain<'_, T> {
        Drain { consumer: self }
    }

    /// Checks if any producer is still alive
    pub fn has_producers(&self) -> bool {
        Arc::strong_count(&self.diode) > 1
    }

    /// Returns the number of slots in the ring
    pub fn capacity(&self) -> usize {
        self.diode.capacity()
    }

    pub fn stats(&self) -> DiodeStats {
        self.diode.stats()
    }

    pub(crate) fn diode(&self) -> &ManyToOne<T> {
        &self.diode
    }
}

impl<T> fmt::Debug for Consumer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_consumer(self, f)
    }
}

/// Iterator returned by [`Consumer::drain`].
pub struct Drain<'a, T> {
    consumer: &'a mut Consumer<T>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        self.consumer.try_read()
    }
}
