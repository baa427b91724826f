//! Test Application Submitter
//!
//! Generates applicants within the configured form domains, sends them to
//! the screening service as NATS requests and logs the replies.

use heloc_screening::{config::AppConfig, ApplicantRecord, FeatureSpec, ScreeningReply};
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Applicant generator for testing
struct ApplicantGenerator {
    rng: rand::rngs::ThreadRng,
    spec: FeatureSpec,
    counter: u64,
}

impl ApplicantGenerator {
    fn new(spec: FeatureSpec) -> Self {
        Self {
            rng: rand::thread_rng(),
            spec,
            counter: 0,
        }
    }

    /// Form defaults, as an applicant who accepts every pre-filled value
    fn generate_default(&mut self) -> ApplicantRecord {
        self.counter += 1;
        self.spec
            .default_record()
            .with_application_id(&format!("app_{:08}", self.counter))
    }

    /// Whole-number answers drawn uniformly from each field's domain
    fn generate_random(&mut self) -> ApplicantRecord {
        self.counter += 1;
        let mut record =
            ApplicantRecord::new().with_application_id(&format!("app_{:08}", self.counter));
        for field in self.spec.fields() {
            let value = self.rng.gen_range(field.min..=field.max).floor().max(field.min);
            record = record.with_value(&field.name, value);
        }
        record
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("submit_application=info".parse()?),
        )
        .init();

    info!("Starting Test Application Submitter");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let count: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(10);
    let delay_ms: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(200);

    let config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to default configuration");
        AppConfig::default()
    });

    info!(
        nats_url = %config.nats.url,
        subject = %config.nats.application_subject,
        count = count,
        "Configuration"
    );

    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS");

    let mut generator = ApplicantGenerator::new(config.form.fields.clone());
    let mut approved = 0u64;
    let mut denied = 0u64;

    for i in 0..count {
        let record = if i == 0 {
            generator.generate_default()
        } else {
            generator.generate_random()
        };
        let payload = serde_json::to_vec(&record)?;

        let message = match client
            .request(config.nats.application_subject.clone(), payload.into())
            .await
        {
            Ok(message) => message,
            Err(e) => {
                warn!(application_id = %record.application_id, error = %e, "Request failed");
                continue;
            }
        };

        let reply: ScreeningReply = serde_json::from_slice(&message.payload)?;
        match reply.decision {
            Some(heloc_screening::Decision::Approved) => approved += 1,
            Some(heloc_screening::Decision::Denied) => denied += 1,
            None => {}
        }

        info!(
            application_id = %reply.application_id,
            status = ?reply.status,
            headline = %reply.headline,
            probability = reply.displayed_probability.as_deref().unwrap_or("-"),
            "Reply received"
        );

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(approved = approved, denied = denied, "Done");
    Ok(())
}
