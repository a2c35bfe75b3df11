// src/Diode/producer.rs
use super::ManyToOne;
use crate::Diode::Structs::DiodeStats;
use std::fmt;
use std::sync::Arc;

/// The writing half of a diode.
///
/// Cheap to clone; hand one to every thread that needs to write. Writes never
/// wait for the consumer.
pub struct Producer<T> {
    diode: Arc<ManyToOne<T>>,
}

impl<T> Producer<T> {
    pub(crate) fn new(diode: Arc<ManyToOne<T>>) -> Self {
        Self { diode }
    }

    /// Writes a value into the diode.
    ///
    /// If the consumer is a full lap behind, the oldest unread value is
    /// overwritten; the consumer learns about it on its next read.
    pub fn write(&self, value: T) {
        self.diode.write(value);
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

impl<T> Clone for Producer<T> {
    fn clone(&self) -> Self {
        Self {
            diode: Arc::clone(&self.diode),
        }
    }
}

impl<T> fmt::Debug for Producer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        crate::Debug::StructDebug::debug_producer(self, f)
    }
}
