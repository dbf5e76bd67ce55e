#![cfg_attr(not(test), no_std)]

//! Wake, read, publish, sleep.
//!
//! Core of the HiGrow plant monitor firmware: analog calibration, the DHT11
//! climate reader, the MQTT session manager, Home Assistant discovery,
//! telemetry and the duty-cycle controller. Hardware lives behind the traits
//! in [`analog`], [`climate`], [`session`] and [`cycle`], so everything here
//! runs on the host as well as on the board.

extern crate alloc;

pub mod analog;
pub mod climate;
pub mod config;
pub mod cycle;
pub mod dht11;
pub mod discovery;
pub mod domain;
pub mod identity;
pub mod session;
pub mod telemetry;

#[cfg(test)]
mod testing;
