//! Forecast Request Producer
//!
//! Sends forecast requests for merchants picked from the history CSV and
//! logs the replies. Without a NATS server it answers the requests locally
//! with the naive lag baseline instead.

use cash_advance_forecaster::{
    dataset::Dataset, models::NaiveLagPredictor, pipeline::MerchantPipeline,
    types::{ForecastReply, ForecastRequest},
};
use rand::seq::SliceRandom;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Share of requests sent for a merchant id that does not exist
const UNKNOWN_MERCHANT_RATE: f64 = 0.05;

/// Picks merchant ids to request
struct RequestGenerator {
    rng: rand::rngs::ThreadRng,
    merchant_ids: Vec<String>,
    request_counter: u64,
}

impl RequestGenerator {
    fn new(dataset: &Dataset) -> Self {
        Self {
            rng: rand::thread_rng(),
            merchant_ids: dataset.merchant_ids().map(str::to_string).collect(),
            request_counter: 0,
        }
    }

    fn next_request(&mut self) -> ForecastRequest {
        self.request_counter += 1;

        let merchant_id = if self.rng.gen_bool(UNKNOWN_MERCHANT_RATE) {
            format!("unknown-merchant-{}", self.request_counter)
        } else {
            self.merchant_ids
                .choose(&mut self.rng)
                .cloned()
                .unwrap_or_else(|| format!("unknown-merchant-{}", self.request_counter))
        };

        ForecastRequest { merchant_id }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("request_producer=info".parse()?),
        )
        .init();

    info!("Starting Forecast Request Producer");

    let args: Vec<String> = std::env::args().collect();
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let args: Vec<&String> = args.iter().skip(1).filter(|a| *a != "--dry-run").collect();

    let nats_url = args.first().map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(1).map(|s| s.as_str()).unwrap_or("forecast.requests");
    let history_path = args
        .get(2)
        .map(|s| s.as_str())
        .unwrap_or("data/monthly_transactions.csv");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(20);
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        history_path = %history_path,
        count = count,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let dataset = Dataset::load_csv_file(history_path)?;
    let mut generator = RequestGenerator::new(&dataset);

    if dry_run {
        return run_dry_mode(&dataset, &mut generator, count, delay_ms).await;
    }

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(&dataset, &mut generator, count, delay_ms).await;
        }
    };

    info!("Starting to send {} forecast requests...", count);

    let mut eligible_count = 0;
    let mut failed_count = 0;

    for i in 0..count {
        let request = generator.next_request();
        let payload = serde_json::to_vec(&request)?;

        let response = client.request(subject.to_string(), payload.into()).await?;
        match serde_json::from_slice::<ForecastReply>(&response.payload)? {
            ForecastReply::Success(reply) => {
                if reply.decision.eligible {
                    eligible_count += 1;
                }
                info!(
                    merchant_id = %reply.merchant_id,
                    eligible = reply.decision.eligible,
                    average_forecast = reply.decision.average_forecast,
                    cash_advance_offer = ?reply.decision.cash_advance_offer,
                    "Forecast received"
                );
            }
            ForecastReply::Failure(failure) => {
                failed_count += 1;
                warn!(
                    merchant_id = %failure.merchant_id,
                    error_kind = %failure.error_kind,
                    "Forecast request rejected"
                );
            }
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} requests ({} eligible, {} failed)",
                i + 1,
                count,
                eligible_count,
                failed_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} requests ({} eligible, {} failed)",
        count, eligible_count, failed_count
    );

    Ok(())
}

async fn run_dry_mode(
    dataset: &Dataset,
    generator: &mut RequestGenerator,
    count: u64,
    delay_ms: u64,
) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection, naive lag baseline)");

    let pipeline = MerchantPipeline::default();

    for i in 0..count {
        let request = generator.next_request();
        let result = pipeline.run(&request.merchant_id, dataset, &NaiveLagPredictor);
        let reply = ForecastReply::from_result(&request.merchant_id, result);

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample reply {}:\n{}", i + 1, serde_json::to_string_pretty(&reply)?);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
