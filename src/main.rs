//! Phone Uplink
//!
//! Desktop companion that receives data batches from a phone over an ADB
//! reverse tunnel and shows a live log of everything saved.

use eframe::egui;

use phone_uplink::bridge::NotifierBridge;
use phone_uplink::config::AppConfig;
use phone_uplink::context::ServerContext;
use phone_uplink::gui::{self, ListenerStatus};

fn main() -> eframe::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = AppConfig::load();
    let bridge = NotifierBridge::new();

    // Lives until the window closes; the listener threads go with the process.
    let server = ServerContext::start(&config.server, bridge.clone());
    let listener = match &server {
        Ok(context) => ListenerStatus::Listening(context.local_addr()),
        Err(e) => {
            log::error!("{}", e);
            ListenerStatus::Failed(e.to_string())
        }
    };

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_min_inner_size([640.0, 480.0]),
        ..Default::default()
    };

    let result = eframe::run_native(
        "Phone Uplink",
        options,
        Box::new(move |cc| Ok(Box::new(gui::App::new(cc, &config, bridge, listener)))),
    );

    if let Ok(context) = server {
        context.shutdown();
    }
    result
}
