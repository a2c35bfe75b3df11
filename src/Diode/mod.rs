mod alert;
mod builder;
mod consumer;
mod producer;

pub use alert::{Alerter, LogAlerter, NoopAlerter};
pub use builder::DiodeBuilder;
pub use consumer::{Consumer, Drain};
pub use producer::Producer;

pub mod Buffer {
    pub mod Buffer;
    pub mod Buffer_impl;
    pub mod layout;
    mod debug;
    mod getters;
    pub use Buffer::{ManyToOne, Slot}; // re-export for stable path
    pub use layout::{SlotState, Stamp};
}

pub mod Structs {
    pub mod Diode_Structs;
    pub use Diode_Structs::DiodeStats; // re-export for stable path
}

pub use Buffer::ManyToOne;
pub use Structs::DiodeStats;
