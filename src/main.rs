#[tokio::main]
async fn main() -> factbot::error::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("factbot=info"))
        .init();
    log::info!("Starting factbot daily fact scheduler");

    match factbot::run_daily_facts().await {
        Ok(()) => {
            log::info!("Scheduler shut down successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Scheduler encountered an error: {e}");
            Err(e)
        }
    }
}
