//! Luxsense firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by the `espidf`
//! feature within each module.

#![deny(unused_must_use)]

pub mod config;
pub mod cycle;
pub mod exposure;
pub mod ports;
pub mod sampler;
pub mod scheduler;

pub mod error;

pub mod adapters;
