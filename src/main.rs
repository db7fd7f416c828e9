//! Cash-Advance Forecaster - Main Entry Point
//!
//! Loads the transaction history and sales model once, then answers
//! forecast requests from NATS with a forecast and eligibility decision.

use anyhow::Result;
use cash_advance_forecaster::{
    config::{AppConfig, LoggingConfig},
    consumer::{parse_request, RequestConsumer},
    dataset::Dataset,
    error::ForecastError,
    metrics::{MetricsReporter, PipelineMetrics},
    models::OnnxSalesPredictor,
    pipeline::MerchantPipeline,
    producer::ReplyProducer,
    types::ForecastReply,
};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(format!(
            "cash_advance_forecaster={}",
            logging.level
        ))
    })?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Cash-Advance Forecaster");
    info!(
        "Eligibility: threshold > {:.2}, fee {:.2}, holdback {:.2}, horizon {} months",
        config.eligibility.threshold,
        config.eligibility.fee,
        config.eligibility.holdback,
        config.forecast.horizon
    );

    let metrics = Arc::new(PipelineMetrics::new());

    // History and model are loaded once and shared read-only
    let dataset = Arc::new(Dataset::load_csv_file(&config.data.history_path)?);
    let predictor = Arc::new(OnnxSalesPredictor::new(&config.model)?);
    let pipeline = MerchantPipeline::new(config.eligibility, config.forecast.horizon);
    info!(
        merchants = dataset.merchant_count(),
        model = %predictor.name(),
        "Model and data loaded successfully"
    );

    // Connect to NATS
    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(client.clone(), &config.nats.request_subject);
    let producer = Arc::new(ReplyProducer::new(client.clone(), &config.nats.decision_subject));

    let num_workers = config.pipeline.workers;
    info!(
        "Starting request processing loop with {} parallel workers",
        num_workers
    );
    info!("Listening on subject: {}", consumer.subject());
    info!("Publishing un-addressed replies to: {}", producer.subject());

    // Semaphore to limit concurrent processing
    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let metrics_clone = metrics.clone();
    let interval_secs = config.pipeline.metrics_interval_secs;
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, interval_secs);
        reporter.start().await;
    });

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        // Acquire permit (limits concurrent tasks)
        let permit = semaphore.clone().acquire_owned().await?;

        let dataset = dataset.clone();
        let predictor = predictor.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let request = match parse_request(&message.payload) {
                Ok(request) => request,
                Err(e) => {
                    warn!(error = %e, "Failed to decode forecast request");
                    metrics.record_failure("invalid_request", start_time.elapsed());
                    drop(permit);
                    return;
                }
            };
            let merchant_id = request.merchant_id;

            let result = if dataset.contains(&merchant_id) {
                pipeline.run(&merchant_id, &dataset, predictor.as_ref())
            } else {
                warn!(merchant_id = %merchant_id, "Merchant ID not found");
                Err(ForecastError::MerchantNotFound(merchant_id.clone()))
            };

            let processing_time = start_time.elapsed();
            match &result {
                Ok(output) => {
                    metrics.record_decision(processing_time, output.decision.cash_advance_offer);
                    info!(
                        merchant_id = %merchant_id,
                        eligible = output.decision.eligible,
                        processing_time_us = processing_time.as_micros(),
                        "Forecast request completed"
                    );
                }
                Err(e) => {
                    metrics.record_failure(e.kind(), processing_time);
                    warn!(
                        merchant_id = %merchant_id,
                        error_kind = e.kind(),
                        error = %e,
                        "Forecast request failed"
                    );
                }
            }

            let reply = ForecastReply::from_result(&merchant_id, result);
            if let Err(e) = producer.publish(&reply, message.reply.clone()).await {
                error!(
                    merchant_id = %merchant_id,
                    error = %e,
                    "Failed to publish forecast reply"
                );
            }

            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
            if count % 100 == 0 {
                let processing_stats = metrics.get_processing_stats();
                info!(
                    processed = count,
                    throughput = format!("{:.1} req/s", metrics.get_throughput()),
                    avg_latency_us = processing_stats.mean_us,
                    "Processing milestone"
                );
            }

            // Release permit when done
            drop(permit);
        });
    }

    info!("Forecaster shutting down...");
    metrics.print_summary();

    Ok(())
}
