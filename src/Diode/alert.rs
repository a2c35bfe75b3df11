// src/Diode/alert.rs

use log::warn;

/// Receives the number of values a consumer lost after being lapped.
///
/// Called synchronously on the consumer's thread from inside `try_read`,
/// while every writer is held off. Implementations should return promptly
/// and must not write into the same diode, which would deadlock.
///
/// Closures of type `Fn(u64) + Send + Sync` implement this trait:
///
/// ```
/// use std::sync::atomic::{AtomicU64, Ordering};
/// use std::sync::Arc;
/// use diodes::DiodeBuilder;
///
/// let lost = Arc::new(AtomicU64::new(0));
/// let counter = Arc::clone(&lost);
/// let (producer, mut consumer) = DiodeBuilder::new()
///     .with_capacity(2)
///     .with_alerter(move |dropped: u64| {
///         counter.fetch_add(dropped, Ordering::Relaxed);
///     })
///     .build::<u32>()
///     .unwrap();
///
/// for i in 0..5 {
///     producer.write(i);
/// }
/// assert_eq!(consumer.try_read(), Some(3));
/// assert_eq!(lost.load(Ordering::Relaxed), 3);
/// ```
pub trait Alerter: Send + Sync {
    /// `dropped` values were overwritten before the consumer could read them.
    fn alert(&self, dropped: u64);
}

impl<F> Alerter for F
where
    F: Fn(u64) + Send + Sync,
{
    fn alert(&self, dropped: u64) {
        self(dropped)
    }
}

/// Ignores drops. This is what a diode uses when no alerter is given.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopAlerter;

impl Alerter for NoopAlerter {
    fn alert(&self, _dropped: u64) {}
}

/// Logs every drop at `warn` level under the given label.
#[derive(Clone, Debug)]
pub struct LogAlerter {
    label: String,
}

impl LogAlerter {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

impl Default for LogAlerter {
    fn default() -> Self {
        Self::new("diode")
    }
}

impl Alerter for LogAlerter {
    fn alert(&self, dropped: u64) {
        warn!("{}: dropped {} values", self.label, dropped);
    }
}
