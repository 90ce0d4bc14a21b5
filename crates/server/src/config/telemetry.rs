use std::collections::HashMap;

use serde::Deserialize;

/// Log line format written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Transport used by the OTLP span exporter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtlpProtocol {
    #[default]
    Grpc,
    Http,
}

/// Harbor's `[telemetry]` section.
///
/// Controls the stdout log format and whether the spans opened around
/// uploads, chat turns and workflow runs are also shipped to an OTLP
/// collector. Log verbosity itself comes from `RUST_LOG`.
///
/// # Example
///
/// ```toml
/// [telemetry]
/// format = "json"
/// enabled = true
/// endpoint = "http://otel-collector:4317"
/// service_name = "harbor-testnet"
///
/// [telemetry.resource_attributes]
/// "deployment.environment" = "testnet"
/// ```
#[derive(Debug, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub format: LogFormat,
    /// Export workflow spans over OTLP. Off by default.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// `service.name` on every exported span.
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// Fraction of root spans kept; `1.0` keeps all, `0.0` drops all.
    #[serde(default = "default_sample_ratio")]
    pub sample_ratio: f64,
    #[serde(default)]
    pub protocol: OtlpProtocol,
    #[serde(default = "default_export_timeout")]
    pub timeout_seconds: u64,
    /// Extra resource attributes, e.g. the network the server points at.
    #[serde(default)]
    pub resource_attributes: HashMap<String, String>,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            enabled: false,
            endpoint: default_endpoint(),
            service_name: default_service_name(),
            sample_ratio: default_sample_ratio(),
            protocol: OtlpProtocol::default(),
            timeout_seconds: default_export_timeout(),
            resource_attributes: HashMap::new(),
        }
    }
}

fn default_endpoint() -> String {
    "http://localhost:4317".to_owned()
}

fn default_service_name() -> String {
    "harbor".to_owned()
}

fn default_sample_ratio() -> f64 {
    1.0
}

fn default_export_timeout() -> u64 {
    10
}
