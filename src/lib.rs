//! Phone Uplink Library
//!
//! Receives JSON data batches pushed from a phone, saves each one as a
//! timestamped file and reports every upload to the desktop window.

pub mod bridge;
pub mod config;
pub mod context;
pub mod gui;
pub mod listener;
pub mod tunnel;
