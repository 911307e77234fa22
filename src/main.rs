#![warn(clippy::all, rust_2018_idioms)]

use eframe_board::persistence::LocalStore;
use eframe_board::platform::NullBridge;
use eframe_board::BoardApp;

fn main() -> eframe::Result {
    env_logger::init();

    let storage_root = std::env::var("BOARD_STORAGE").unwrap_or_else(|_| "storage".to_owned());
    let store = LocalStore::new(&storage_root);
    if let Err(e) = store.init() {
        log::error!("failed to initialize storage at {storage_root}: {e}");
    }

    let native_options = eframe::NativeOptions::default();
    eframe::run_native(
        "eframe board",
        native_options,
        Box::new(|cc| {
            Ok(Box::new(BoardApp::new(
                cc,
                Box::new(store),
                Box::new(NullBridge),
            )))
        }),
    )
}
