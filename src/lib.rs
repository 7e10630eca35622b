//! Sampling and recording core of the sensor recorder firmware.
//!
//! Everything in this crate is independent of the MCU so it can be unit
//! tested on a host:
//!
//! - [`controller`] - Idle/Active state machine, session bookkeeping, header
//!   and row emission
//! - [`sample`] - one read cycle over the ADC and power monitor, CSV rows
//! - [`sink`] - console and file destinations
//! - [`toggle`] - interrupt-safe recording toggle
//! - [`config`] - runtime configuration and conversion presets
//! - [`sensors`] - driver contracts used by the pipeline
//! - [`ads1115`], [`ina228`] - I2C drivers for the two peripherals
//!
//! The firmware binary wires these to the STM32 peripherals.

#![cfg_attr(not(test), no_std)]

#[macro_use]
mod fmt;

pub mod ads1115;
pub mod config;
pub mod controller;
pub mod ina228;
pub mod sample;
pub mod sensors;
pub mod sink;
pub mod toggle;

#[cfg(test)]
mod testing;
