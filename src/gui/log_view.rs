//! Scrolling log panel

use chrono::{DateTime, Local};
use eframe::egui;
use std::collections::VecDeque;

use crate::bridge::LogLine;

/// Severity used to color a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogTone {
    Info,
    Success,
    Error,
}

impl LogTone {
    fn color(self) -> egui::Color32 {
        match self {
            Self::Info => egui::Color32::GRAY,
            Self::Success => egui::Color32::GREEN,
            Self::Error => egui::Color32::RED,
        }
    }
}

#[derive(Debug, Clone)]
struct LogEntry {
    text: String,
    tone: LogTone,
}

/// Prefix a message with its render time, e.g. `14:02:09 > text`
pub fn render_line(message: &str, at: &DateTime<Local>) -> String {
    format!("{} > {}", at.format("%H:%M:%S"), message)
}

/// Bounded list of rendered lines
pub struct LogView {
    entries: VecDeque<LogEntry>,
    max_lines: usize,
}

impl LogView {
    pub fn new(max_lines: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_lines: max_lines.max(1),
        }
    }

    /// Add a message produced by the window itself
    pub fn push(&mut self, tone: LogTone, message: &str, at: &DateTime<Local>) {
        self.entries.push_back(LogEntry {
            text: render_line(message, at),
            tone,
        });
        while self.entries.len() > self.max_lines {
            self.entries.pop_front();
        }
    }

    /// Add a line drained from the bridge
    pub fn push_bridge_line(&mut self, line: &LogLine, at: &DateTime<Local>) {
        let tone = if line.is_error() {
            LogTone::Error
        } else {
            LogTone::Success
        };
        self.push(tone, line.as_str(), at);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.text.as_str())
    }

    pub fn ui(&mut self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .stick_to_bottom(true)
            .show(ui, |ui| {
                for entry in &self.entries {
                    ui.label(
                        egui::RichText::new(&entry.text)
                            .monospace()
                            .color(entry.tone.color()),
                    );
                }
            });
    }
}
