//! Runs one order through the engine end to end.
//!
//! Configuration comes from `ORDER_ENGINE_*` environment variables and log
//! verbosity from `RUST_LOG`.

use std::error::Error;
use std::time::Duration;

use actors::{PricingProcessor, start_engine};
use api::{JobStatusBody, OrderApi};
use order_core::EngineConfig;

const ORDER: &str = r#"{"customerId":"cust-1","item":"widget","quantity":2,"unitPrice":10.0}"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = EngineConfig::from_env()?;
    let (engine, handle) = start_engine(config, PricingProcessor).await?;
    let api = OrderApi::new(engine.clone());

    let accepted = api.submit_json(ORDER);
    println!("POST /orders -> {} {}", accepted.status, render(&accepted.body));

    let body: JobStatusBody =
        serde_json::from_value(accepted.body.ok_or("submission returned no body")?)?;
    let raw_id = body.job_id.to_string();

    match engine
        .wait_for_settled(&body.job_id, Duration::from_secs(2))
        .await
    {
        Ok(status) => tracing::info!("Job {} settled: {:?}", raw_id, status),
        Err(e) => tracing::warn!("Job {} did not settle: {}", raw_id, e),
    }

    let status = api.status(&raw_id);
    println!(
        "GET /orders/{}/status -> {} {}",
        raw_id,
        status.status,
        render(&status.body)
    );
    let result = api.result(&raw_id);
    println!("GET /orders/{} -> {} {}", raw_id, result.status, render(&result.body));

    let stats = engine.stats().await?;
    tracing::info!(
        "Processed {} jobs ({} failed), average {:.1}ms",
        stats.processed(),
        stats.failed,
        stats.avg_duration_ms.unwrap_or_default()
    );

    engine.shutdown();
    handle.await?;
    Ok(())
}

fn render(body: &Option<serde_json::Value>) -> String {
    body.as_ref().map(|b| b.to_string()).unwrap_or_default()
}
