use anyhow::Result;

mod config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::Config::load()?;

    // Initialize logging with a configured level
    let log_level = config.log_level.to_lowercase();
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    let message = config.load_message()?;
    let client = config.client_builder().build()?;

    tracing::info!(
        message_id = %message.id,
        recipients = message.recipients.len(),
        "Sending Harmony message..."
    );

    match client.dispatch(config.ouid.clone(), message).await {
        Ok(receipt) => {
            println!("{}", serde_json::to_string_pretty(&receipt)?);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Send failed: {}", e);
            anyhow::bail!("{}", e.reason())
        }
    }
}
