use std::sync::Arc;

use aws_config::BehaviorVersion;
use data_shield::config::Config;
use data_shield::event_handler::{function_handler, DataShield};
use data_shield::fetch::PresignedUrlFetcher;
use data_shield::writer::S3ResponseWriter;
use lambda_runtime::{run, service_fn, Error};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::from_env()?;
    config.init_logging();

    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let fetcher = PresignedUrlFetcher::new(config.fetch_timeout)?;
    let writer = S3ResponseWriter::new(aws_sdk_s3::Client::new(&sdk_config));
    let shield = Arc::new(DataShield::new(fetcher, writer));

    info!(
        log_level = %config.log_level,
        fetch_timeout = ?config.fetch_timeout,
        "Data shield initialized"
    );

    run(service_fn(move |event| {
        let shield = Arc::clone(&shield);
        async move { function_handler(shield, event).await }
    }))
    .await
}
