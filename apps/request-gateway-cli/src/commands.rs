use anyhow::Result;
use clap::Args;
use request_gateway::{JsonMap, Payload, RequestGateway};

use crate::config::AppConfig;

/// GET a path and print the JSON object it returns
#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Path appended to the base URL (or a full URL if none is configured)
    pub path: String,

    /// Query parameter, repeatable
    #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub query: Vec<(String, String)>,
}

impl FetchArgs {
    pub fn run(self, config: AppConfig) -> Result<()> {
        let mut gateway = RequestGateway::new(config.gateway)?;
        let body = gateway.scoped(|gw| gw.fetch_with_query(&self.path, &self.query))?;
        print_json(&body)
    }
}

/// POST a form or JSON payload and print the JSON object returned
#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Path appended to the base URL (or a full URL if none is configured)
    pub path: String,

    /// JSON document sent as the body
    #[arg(long, value_name = "JSON", value_parser = parse_json, conflicts_with = "form")]
    pub json: Option<serde_json::Value>,

    /// Form field, repeatable
    #[arg(short, long, value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub form: Vec<(String, String)>,
}

impl SubmitArgs {
    pub fn run(self, config: AppConfig) -> Result<()> {
        let fields: Vec<(&str, &str)> = self
            .form
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let payload = match &self.json {
            Some(value) => Payload::Json(value),
            None if !fields.is_empty() => Payload::Form(&fields),
            None => Payload::Empty,
        };

        let mut gateway = RequestGateway::new(config.gateway)?;
        let body = gateway.scoped(|gw| gw.submit(&self.path, payload))?;
        print_json(&body)
    }
}

/// Print the effective configuration as JSON
pub fn check(config: &AppConfig) -> Result<()> {
    tracing::info!("configuration is valid");
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn print_json(body: &JsonMap) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(body)?);
    Ok(())
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got `{s}`")),
    }
}

fn parse_json(s: &str) -> Result<serde_json::Value, String> {
    serde_json::from_str(s).map_err(|e| format!("invalid JSON: {e}"))
}
