//! Alignment of every weather source onto one half-hourly site table.

pub mod calendar;
pub mod error;
pub mod poa;
pub mod sarah;
