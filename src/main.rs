mod app;
mod commands;
mod config;
mod logging;
mod recorder;
mod ui;

#[tokio::main]
async fn main() {
    if let Err(e) = app::run().await {
        tracing::error!("Fatal: {e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
