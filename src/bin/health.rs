use std::env;
use std::error;
use std::process::ExitCode;

use reqwest::Url;
use serde_json::json;

fn program_name(args: &[String]) -> &str {
    args.first()
        .map_or("duration_predictor_health", String::as_str)
}

/// Posts a sample ride to the given predict URL and fails unless it is answered with 2xx.
fn main() -> Result<ExitCode, Box<dyn error::Error>> {
    let args: Vec<String> = env::args().collect();
    let Some(url) = args.get(1) else {
        eprintln!("Usage: {} <predict-url>", program_name(&args));
        return Ok(ExitCode::FAILURE);
    };
    let url = Url::parse(url)?;

    let ride = json!({
        "PULocationID": "10",
        "DOLocationID": "50",
        "trip_distance": 1.0
    });
    let response = reqwest::blocking::Client::new()
        .post(url)
        .json(&ride)
        .send()?;
    if !response.status().is_success() {
        eprintln!("Healthcheck failed with {}", response.status());
        return Ok(ExitCode::FAILURE);
    }

    Ok(ExitCode::SUCCESS)
}
