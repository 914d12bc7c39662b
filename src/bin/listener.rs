#[tokio::main]
async fn main() -> factbot::error::Result<()> {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("factbot=info,teloxide=warn"),
    )
    .init();
    log::info!("Starting factbot mention listener");

    match factbot::run_listener(tokio::runtime::Handle::current()).await {
        Ok(()) => {
            log::info!("Listener shut down successfully");
            Ok(())
        }
        Err(e) => {
            log::error!("Listener encountered an error: {e}");
            Err(e)
        }
    }
}
