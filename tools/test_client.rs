//! Test Prediction Client
//!
//! Posts sample feature vectors to a running Ena Healthy API for smoke testing.

use ena_healthy_api::types::request::{FeatureRequest, WDBC_SAMPLE, WPBC_SAMPLE};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Feature vector generator for testing
struct SampleGenerator {
    rng: rand::rngs::ThreadRng,
    jitter: f64,
}

impl SampleGenerator {
    fn new(jitter: f64) -> Self {
        Self {
            rng: rand::thread_rng(),
            jitter,
        }
    }

    /// Perturb every feature of `base` by up to ±`jitter` (relative)
    fn perturb(&mut self, base: &[f64]) -> FeatureRequest {
        let jitter = self.jitter;
        let features: Vec<f64> = base
            .iter()
            .map(|&x| {
                if jitter > 0.0 {
                    x * (1.0 + self.rng.gen_range(-jitter..jitter))
                } else {
                    x
                }
            })
            .collect();
        FeatureRequest::new(features)
    }

    /// WDBC-layout request for /predict and /predict_stage
    fn generate_wdbc(&mut self) -> FeatureRequest {
        self.perturb(&WDBC_SAMPLE)
    }

    /// WPBC-layout request for /predict_risk
    fn generate_wpbc(&mut self) -> FeatureRequest {
        self.perturb(&WPBC_SAMPLE)
    }

    /// Request with a wrong feature count, to exercise validation
    fn generate_truncated(&mut self) -> FeatureRequest {
        let len = self.rng.gen_range(0..WDBC_SAMPLE.len());
        FeatureRequest::new(&WDBC_SAMPLE[..len])
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_client=info".parse()?),
        )
        .init();

    info!("Starting Test Prediction Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/'))
        .unwrap_or("http://localhost:8000");
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(20);
    let jitter: f64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(0.05);
    let invalid_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        base_url = %base_url,
        count = count,
        jitter = jitter,
        invalid_rate = invalid_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let banner = match client.get(format!("{base_url}/")).send().await {
        Ok(resp) => resp.json::<serde_json::Value>().await?,
        Err(e) => {
            warn!(error = %e, "Server unreachable. Running in dry-run mode.");
            return run_dry_mode(count, jitter, invalid_rate, delay_ms).await;
        }
    };
    info!("Connected: {}", banner);

    let mut generator = SampleGenerator::new(jitter);
    let mut rng = rand::thread_rng();
    let mut errors = 0u64;

    for i in 0..count {
        let wdbc = if rng.gen_bool(invalid_rate.clamp(0.0, 1.0)) {
            generator.generate_truncated()
        } else {
            generator.generate_wdbc()
        };
        let wpbc = generator.generate_wpbc();

        for (route, payload) in [
            ("/predict", &wdbc),
            ("/predict_stage", &wdbc),
            ("/predict_risk", &wpbc),
        ] {
            let reply: serde_json::Value = client
                .post(format!("{base_url}{route}"))
                .json(payload)
                .send()
                .await?
                .json()
                .await?;

            if reply.get("error").is_some() {
                errors += 1;
            }
            info!(request = i + 1, route = %route, "{}", reply);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Sent {} requests ({} error replies)",
        count * 3,
        errors
    );

    Ok(())
}

async fn run_dry_mode(count: u64, jitter: f64, invalid_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no server connection)");

    let mut generator = SampleGenerator::new(jitter);
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let request = if rng.gen_bool(invalid_rate.clamp(0.0, 1.0)) {
            generator.generate_truncated()
        } else {
            generator.generate_wdbc()
        };

        if (i + 1) % 10 == 0 || i == 0 {
            let json = serde_json::to_string(&request)?;
            info!("Sample request {} ({} features): {}", i + 1, request.features.len(), json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
