#[tokio::main]
async fn main() -> Result<(), eframe::Error> {
    // RUST_LOG=planboard=debug for undo and grid tracing
    env_logger::init();

    planboard::run_app()
}
