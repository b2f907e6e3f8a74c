//! GUI module using egui/eframe
//!
//! The window drains the notifier bridge on a fixed cadence and lets the
//! user set up the ADB tunnel. It never touches the output directory.

mod app;
pub mod log_view;

pub use app::{App, ListenerStatus};
pub use log_view::LogView;
