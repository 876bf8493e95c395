//! AWS Lambda handler for simulation previews
//!
//! Accepts a simulation request as JSON through API Gateway and returns the
//! DRAFT simulation with its full payment schedule.

use std::sync::OnceLock;

use aws_lambda_events::apigw::{ApiGatewayProxyRequest, ApiGatewayProxyResponse};
use aws_lambda_events::encodings::Body;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use log::{info, warn};
use serde::Serialize;

use mortgage_simulator::bank::loader::DEFAULT_BANKS_PATH;
use mortgage_simulator::{SimulationError, SimulationInput, SimulationOutcome, Simulator};

/// Output from the preview
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    #[serde(flatten)]
    pub outcome: SimulationOutcome,
    pub execution_time_ms: u64,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a str>,
}

static SIMULATOR: OnceLock<Simulator> = OnceLock::new();

/// Banks are read once per container; a missing file leaves the default NCMV bank
fn simulator() -> &'static Simulator {
    SIMULATOR.get_or_init(|| match Simulator::from_csv(DEFAULT_BANKS_PATH) {
        Ok(simulator) => simulator,
        Err(e) => {
            warn!("could not load {}: {}, using the default bank", DEFAULT_BANKS_PATH, e);
            Simulator::new()
        }
    })
}

fn response(status_code: i64, body: String) -> ApiGatewayProxyResponse {
    ApiGatewayProxyResponse {
        status_code,
        body: Some(Body::Text(body)),
        ..Default::default()
    }
}

fn error_response(status_code: i64, message: &str, field: Option<&str>) -> Result<ApiGatewayProxyResponse, Error> {
    let body = serde_json::to_string(&ErrorBody { error: message, field })?;
    Ok(response(status_code, body))
}

/// HTTP status for a failed simulation
fn status_for(error: &SimulationError) -> i64 {
    match error {
        SimulationError::Validation { .. } | SimulationError::InvalidRate(_) => 400,
        SimulationError::NoConvergence { .. } | SimulationError::ArithmeticInvariant(_) => 422,
        _ => 500,
    }
}

/// Lambda handler function
async fn handler(event: LambdaEvent<ApiGatewayProxyRequest>) -> Result<ApiGatewayProxyResponse, Error> {
    let start = std::time::Instant::now();
    let request = event.payload;

    // CORS preflight
    if request.http_method.as_str() == "OPTIONS" {
        return Ok(ApiGatewayProxyResponse {
            status_code: 200,
            ..Default::default()
        });
    }

    let body = request.body.unwrap_or_default();
    let input: SimulationInput = match serde_json::from_str(&body) {
        Ok(input) => input,
        Err(e) => return error_response(400, &format!("Invalid JSON: {}", e), None),
    };

    let outcome = match simulator().calculate(&input) {
        Ok(outcome) => outcome,
        Err(e) => {
            let field = match &e {
                SimulationError::Validation { field, .. } => Some(*field),
                _ => None,
            };
            return error_response(status_for(&e), &e.to_string(), field);
        }
    };

    let execution_time_ms = start.elapsed().as_millis() as u64;
    info!(
        "preview for client {}: {} payments in {} ms",
        input.client_id,
        outcome.schedule.len(),
        execution_time_ms
    );

    let body = serde_json::to_string(&PreviewResponse {
        outcome,
        execution_time_ms,
    })?;
    Ok(response(200, body))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();
    run(service_fn(handler)).await
}
