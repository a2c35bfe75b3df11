//! Lossy, lock-free many-to-one ring buffers.
//!
//! A diode lets any number of producer threads write into a fixed-size ring
//! while a single consumer reads from it. Producers never wait for the
//! consumer: when the consumer falls a full lap behind, the oldest unread
//! values are overwritten and the consumer is told how many it lost.

// Module naming follows project convention (Diode = many-to-one ring buffer)
#[allow(non_snake_case)]
pub mod Diode;

#[allow(non_snake_case)]
pub(crate) mod Debug {
    pub mod StructDebug;
}

pub use Diode::{
    Alerter, Consumer, DiodeBuilder, DiodeStats, Drain, LogAlerter, ManyToOne, NoopAlerter,
    Producer,
};
