//! HELOC Screening Service - Main Entry Point
//!
//! Loads the classifier, reconciles it with the applicant form, then answers
//! applications received over NATS with screening decisions.

use anyhow::{Context, Result};
use futures::StreamExt;
use heloc_screening::{
    config::{AppConfig, LoggingConfig},
    consumer::ApplicationConsumer,
    metrics::{MetricsReporter, ScreeningMetrics},
    producer::DecisionProducer,
    screening::Screener,
};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("heloc_screening={}", logging.level)))
        .context("Invalid log level")?;

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
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting HELOC Screening Service");
    info!(
        fields = config.form.fields.len(),
        model = %config.model.model_path().display(),
        "Configuration loaded successfully"
    );

    // Refuse to serve without a loaded model and a reconciled contract
    let screener = match Screener::from_config(&config) {
        Ok(screener) => Arc::new(screener),
        Err(e) => {
            error!(error = %e, "Startup failed, not accepting applications");
            return Err(e).context("Failed to initialise screener");
        }
    };
    info!(
        model = %screener.model_name(),
        order = ?screener.contract().model_order(),
        "Screener initialised"
    );

    let metrics = Arc::new(ScreeningMetrics::new());

    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = ApplicationConsumer::new(client.clone(), &config.nats.application_subject);
    let producer = Arc::new(DecisionProducer::new(client.clone(), &config.nats.decision_subject));

    let num_workers = config.pipeline.workers.max(1);
    info!(
        workers = num_workers,
        applications = %consumer.subject(),
        decisions = %producer.subject(),
        "Starting application processing loop"
    );

    let semaphore = Arc::new(Semaphore::new(num_workers));

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

        let screener = screener.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            let reply = screener.handle(&message.payload);
            let processing_time = start_time.elapsed();
            metrics.record_reply(&reply, processing_time);

            if let Err(e) = producer.publish(&reply, message.reply.as_ref()).await {
                error!(
                    application_id = %reply.application_id,
                    error = %e,
                    "Failed to publish screening reply"
                );
            } else {
                debug!(
                    application_id = %reply.application_id,
                    status = ?reply.status,
                    decision = ?reply.decision,
                    probability = reply.displayed_probability.as_deref().unwrap_or("-"),
                    processing_time_us = processing_time.as_micros(),
                    "Application processed"
                );
            }

            drop(permit);
        });
    }

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}
