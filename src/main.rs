mod api;
mod app;
mod audio;
mod config;
mod state_machine;
mod store;
mod ui;

use api::{AdminClient, DialogueClient};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("aura-booking v{}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::load();
    log::info!("Booking agent at {}", config.api_url);

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create tokio runtime");

    rt.block_on(async {
        let dialogue = DialogueClient::new(config.api_url.clone());
        let admin = AdminClient::new(config.api_url.clone());
        let voice = audio::detect(&config);

        let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
        ui::spawn_input_thread(events_tx.clone());
        ui::render_help();

        let app = app::App::new(dialogue, admin, voice, events_tx);
        app.run(events_rx).await;
    });

    log::info!("Session ended");
}
