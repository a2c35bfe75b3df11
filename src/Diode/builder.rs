use super::{Alerter, Consumer, ManyToOne, Producer};
use std::sync::Arc;

pub struct DiodeBuilder {
    capacity: usize,
    alerter: Option<Box<dyn Alerter>>,
}

impl Default for DiodeBuilder {
    fn default() -> Self {
        Self {
            capacity: 1024, // 1024 slots
            alerter: None,  // drops are ignored
        }
    }
}

impl DiodeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_alerter<A: Alerter + 'static>(mut self, alerter: A) -> Self {
        self.alerter = Some(Box::new(alerter));
        self
    }

    /// Build a bare diode. The caller is responsible for reading from one
    /// thread at a time.
    pub fn build_many_to_one<T>(self) -> std::io::Result<ManyToOne<T>> {
        ManyToOne::new(self.capacity, self.alerter)
    }

    /// Build a diode and split it into a cloneable producer and the single
    /// consumer.
    pub fn build<T>(self) -> std::io::Result<(Producer<T>, Consumer<T>)> {
        let diode = Arc::new(self.build_many_to_one()?);
        Ok((Producer::new(Arc::clone(&diode)), Consumer::new(diode)))
    }
}

impl std::fmt::Debug for DiodeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiodeBuilder")
            .field("capacity", &self.capacity)
            .field("alerter", &self.alerter.as_ref().map(|_| "<dyn Alerter>"))
            .finish()
    }
}
