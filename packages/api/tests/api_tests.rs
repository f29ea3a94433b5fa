#![allow(clippy::disallowed_methods)]

use std::error::Error;
use std::time::Duration;

use actors::{FnProcessor, PricingProcessor, ProcessError, ProcessFuture, start_engine};
use api::{
    ACCEPTED, BAD_REQUEST, ErrorBody, JobStatusBody, NOT_FOUND, OK, OrderApi, Reply,
    SERVICE_UNAVAILABLE,
};
use order_core::{EngineConfig, JobId, JobStatus, OrderRequest, OrderResult};

const ORDER: &str = r#"{"customerId":"cust-1","item":"widget","quantity":2,"unitPrice":10.0}"#;

async fn api_with_pricing() -> Result<OrderApi, Box<dyn Error>> {
    let (engine, _handle) = start_engine(EngineConfig::default(), PricingProcessor).await?;
    Ok(OrderApi::new(engine))
}

fn body_as<T: serde::de::DeserializeOwned>(reply: &Reply) -> Result<T, Box<dyn Error>> {
    let body = reply.body.clone().ok_or("reply has no body")?;
    Ok(serde_json::from_value(body)?)
}

/// Poll the result endpoint until it stops answering 202.
async fn settled_result(api: &OrderApi, raw_id: &str) -> Reply {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    loop {
        let reply = api.result(raw_id);
        if reply.status != ACCEPTED || tokio::time::Instant::now() >= deadline {
            return reply;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}

#[tokio::test]
async fn test_submit_then_fetch_result() -> Result<(), Box<dyn Error>> {
    let api = api_with_pricing().await?;

    let accepted = api.submit_json(ORDER);
    assert_eq!(accepted.status, ACCEPTED);
    let body: JobStatusBody = body_as(&accepted)?;
    assert_eq!(body.status, JobStatus::Queued);
    assert_eq!(
        accepted.body.as_ref().and_then(|b| b.get("status")).and_then(|s| s.as_str()),
        Some("QUEUED")
    );

    let raw_id = body.job_id.to_string();
    let reply = settled_result(&api, &raw_id).await;
    assert_eq!(reply.status, OK);
    let result: OrderResult = body_as(&reply)?;
    assert_eq!(result.job_id, body.job_id);
    assert_eq!(result.total_price, 20.0);

    let status = api.status(&raw_id);
    assert_eq!(status.status, OK);
    assert_eq!(body_as::<JobStatusBody>(&status)?.status, JobStatus::Completed);

    api.engine().shutdown();
    Ok(())
}

#[tokio::test]
async fn test_unknown_and_invalid_ids() -> Result<(), Box<dyn Error>> {
    let api = api_with_pricing().await?;
    let unknown = JobId::new().to_string();

    assert_eq!(api.status(&unknown), Reply::empty(NOT_FOUND));
    assert_eq!(api.result(&unknown), Reply::empty(NOT_FOUND));

    for reply in [api.status("12345"), api.result("not-a-uuid")] {
        assert_eq!(reply.status, BAD_REQUEST);
        let error: ErrorBody = body_as(&reply)?;
        assert_eq!(error.message, "Invalid job id");
    }

    api.engine().shutdown();
    Ok(())
}

#[tokio::test]
async fn test_malformed_body_is_bad_request() -> Result<(), Box<dyn Error>> {
    let api = api_with_pricing().await?;

    let reply = api.submit_json(r#"{"customerId":"cust-1","quantity":"two"}"#);
    assert_eq!(reply.status, BAD_REQUEST);
    let error: ErrorBody = body_as(&reply)?;
    assert!(error.message.starts_with("Malformed order"));

    api.engine().shutdown();
    Ok(())
}

#[tokio::test]
async fn test_failed_job_reports_status_and_reason() -> Result<(), Box<dyn Error>> {
    let rejecting = FnProcessor::new("rejecting", |_: JobId, _: &OrderRequest| -> ProcessFuture {
        Box::pin(async { Err::<OrderResult, _>(ProcessError::Rejected("credit hold".into())) })
    });
    let (engine, _handle) = start_engine(EngineConfig::default(), rejecting).await?;
    let api = OrderApi::new(engine);

    let body: JobStatusBody = body_as(&api.submit_json(ORDER))?;
    let raw_id = body.job_id.to_string();
    api.engine()
        .wait_for_settled(&body.job_id, Duration::from_secs(2))
        .await?;

    let reply = api.result(&raw_id);
    assert_eq!(reply.status, ACCEPTED);
    let status: JobStatusBody = body_as(&reply)?;
    assert_eq!(status.status, JobStatus::Failed);
    assert_eq!(status.reason.as_deref(), Some("Order rejected: credit hold"));

    api.engine().shutdown();
    Ok(())
}

#[tokio::test]
async fn test_shutdown_answers_service_unavailable() -> Result<(), Box<dyn Error>> {
    let api = api_with_pricing().await?;
    api.engine().shutdown();

    let reply = api.submit(OrderRequest::new("cust-1", "widget", 1, 1.0));
    assert_eq!(reply.status, SERVICE_UNAVAILABLE);
    let error: ErrorBody = body_as(&reply)?;
    assert_eq!(error.message, "Engine is shutting down");
    Ok(())
}

#[tokio::test]
async fn test_non_finite_total_serializes_as_null() -> Result<(), Box<dyn Error>> {
    let api = api_with_pricing().await?;

    let body: JobStatusBody =
        body_as(&api.submit(OrderRequest::new("cust-1", "widget", 4, f64::NAN)))?;
    let reply = settled_result(&api, &body.job_id.to_string()).await;

    assert_eq!(reply.status, OK);
    let json = reply.body.ok_or("reply has no body")?;
    assert!(json["totalPrice"].is_null());
    assert_eq!(json["jobId"], body.job_id.to_string());

    api.engine().shutdown();
    Ok(())
}
