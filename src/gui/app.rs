//! Main window state and UI implementation

use chrono::Local;
use eframe::egui;
use std::net::SocketAddr;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;

use super::log_view::{LogTone, LogView};
use crate::bridge::NotifierBridge;
use crate::config::AppConfig;
use crate::tunnel::{ConnectionState, ConnectionStatus, Tunnel, TunnelError};

/// How the upload listener came up, shown in the footer
#[derive(Debug, Clone)]
pub enum ListenerStatus {
    Listening(SocketAddr),
    Failed(String),
}

/// Main application state
pub struct App {
    /// Lines coming from the upload listener
    bridge: NotifierBridge,
    /// How often the bridge is drained
    poll_interval: Duration,
    /// Footer state
    listener: ListenerStatus,
    /// Port the phone should be forwarded to
    tunnel_port: u16,
    tunnel: Tunnel,
    /// Current link to the phone
    status: ConnectionStatus,
    /// Receiver for an in-flight connect attempt
    connect_receiver: Option<Receiver<Result<ConnectionStatus, TunnelError>>>,
    /// Whether to show the "no phone" dialog
    show_no_device_dialog: bool,
    log_view: LogView,
}

impl App {
    /// Create a new App instance
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: &AppConfig,
        bridge: NotifierBridge,
        listener: ListenerStatus,
    ) -> Self {
        Self::with_config(config, bridge, listener)
    }

    fn with_config(config: &AppConfig, bridge: NotifierBridge, listener: ListenerStatus) -> Self {
        let (tunnel_port, startup_error) = match &listener {
            ListenerStatus::Listening(addr) => (addr.port(), None),
            ListenerStatus::Failed(reason) => (
                config.server.port,
                Some(format!("Listener not running: {}", reason)),
            ),
        };
        let mut app = Self {
            bridge,
            poll_interval: config.ui.poll_interval(),
            listener,
            tunnel_port,
            tunnel: Tunnel::new(config.tunnel.adb_path.clone()),
            status: ConnectionStatus::default(),
            connect_receiver: None,
            show_no_device_dialog: false,
            log_view: LogView::new(config.ui.max_log_lines),
        };
        if let Some(message) = startup_error {
            app.log(LogTone::Error, &message);
        }
        app
    }

    /// Add a message of the window's own
    fn log(&mut self, tone: LogTone, message: &str) {
        self.log_view.push(tone, message, &Local::now());
    }

    /// Move everything queued by the listener into the log panel
    fn drain_bridge(&mut self) -> usize {
        let lines = self.bridge.drain_all();
        let now = Local::now();
        for line in &lines {
            self.log_view.push_bridge_line(line, &now);
        }
        lines.len()
    }

    fn is_connecting(&self) -> bool {
        self.connect_receiver.is_some()
    }

    /// Run the adb commands on a background thread
    fn start_connect(&mut self) {
        if self.is_connecting() {
            return;
        }
        self.log(LogTone::Info, "Connecting over ADB...");

        let tunnel = self.tunnel.clone();
        let port = self.tunnel_port;
        let (tx, rx) = mpsc::channel();
        self.connect_receiver = Some(rx);

        thread::spawn(move || {
            let _ = tx.send(tunnel.connect(port));
        });
    }

    /// Poll for the connect attempt's result
    fn poll_connect(&mut self) {
        let Some(receiver) = &self.connect_receiver else {
            return;
        };
        match receiver.try_recv() {
            Ok(result) => {
                self.connect_receiver = None;
                self.finish_connect(result);
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.connect_receiver = None;
                self.log(LogTone::Error, "Connect thread terminated unexpectedly");
            }
        }
    }

    fn finish_connect(&mut self, result: Result<ConnectionStatus, TunnelError>) {
        match result {
            Ok(status) => {
                match status.state {
                    ConnectionState::Connected => {
                        let message = format!("Success! {}", status.detail);
                        self.log(LogTone::Success, &message);
                        self.log(LogTone::Info, "Now start the sender on the phone and press Send.");
                    }
                    ConnectionState::NoDeviceDetected => {
                        self.log(LogTone::Error, "No phone detected");
                        self.show_no_device_dialog = true;
                    }
                    ConnectionState::Disconnected => {}
                }
                self.status = status;
            }
            Err(e) => {
                let message = format!("Error: {}", e);
                self.log(LogTone::Error, &message);
                self.status = ConnectionStatus {
                    state: ConnectionState::Disconnected,
                    detail: format!("Disconnected ({})", e),
                };
            }
        }
    }

    fn status_label(&self, ui: &mut egui::Ui) {
        if self.is_connecting() {
            ui.spinner();
            ui.colored_label(egui::Color32::YELLOW, "Status: Connecting...");
            return;
        }
        let color = match self.status.state {
            ConnectionState::Connected => egui::Color32::GREEN,
            ConnectionState::Disconnected | ConnectionState::NoDeviceDetected => egui::Color32::RED,
        };
        ui.colored_label(color, format!("Status: {}", self.status.detail));
    }

    fn footer_text(&self) -> String {
        match &self.listener {
            ListenerStatus::Listening(addr) => format!("Server listening on {}...", addr),
            ListenerStatus::Failed(reason) => format!("Server not running: {}", reason),
        }
    }
}

impl eframe::App for App {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_bridge();
        self.poll_connect();

        // Keep draining while the window is idle
        ctx.request_repaint_after(self.poll_interval);

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            ui.add_space(4.0);
            ui.horizontal(|ui| {
                ui.heading("Mobile Device Manager");
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    ui.label(format!("v{}", env!("APP_VERSION")));
                });
            });
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            let color = match self.listener {
                ListenerStatus::Listening(_) => egui::Color32::GRAY,
                ListenerStatus::Failed(_) => egui::Color32::RED,
            };
            ui.colored_label(color, self.footer_text());
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let button = egui::Button::new("1. CONNECT (ADB)");
                if ui.add_enabled(!self.is_connecting(), button).clicked() {
                    self.start_connect();
                }
                ui.add_space(10.0);
                self.status_label(ui);
            });
            ui.add_space(12.0);

            ui.group(|ui| {
                ui.horizontal(|ui| {
                    ui.strong("Operation Log / Received Data");
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("Clear").clicked() {
                            self.log_view.clear();
                        }
                    });
                });
                ui.separator();
                self.log_view.ui(ui);
            });
        });

        if self.show_no_device_dialog {
            egui::Window::new("Error")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label("No phone detected. Check the cable and USB debugging.");
                    ui.add_space(10.0);
                    if ui.button("OK").clicked() {
                        self.show_no_device_dialog = false;
                    }
                });
        }
    }
}
