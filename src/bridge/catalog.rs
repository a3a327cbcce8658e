//! Identity service catalog lookup
//!
//! Handles the two token body shapes an identity service hands out:
//! v3 (`catalog[].endpoints[].interface/url`) and v2
//! (`serviceCatalog[].endpoints[0].<interface>URL`).

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::common::config::ServiceEndpoint;
use crate::common::{Error, Result};

/// A service catalog taken from a token body
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ServiceCatalog {
    V3 {
        catalog: Vec<V3Service>,
    },
    V2 {
        #[serde(rename = "serviceCatalog")]
        service_catalog: Vec<V2Service>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub struct V3Service {
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<V3Endpoint>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct V3Endpoint {
    pub interface: String,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct V2Service {
    #[serde(rename = "type")]
    pub service_type: String,
    /// Endpoint entries keyed by `publicURL`, `adminURL`, `internalURL`, ...
    #[serde(default)]
    pub endpoints: Vec<HashMap<String, Value>>,
}

impl ServiceCatalog {
    /// Parse a token body, unwrapping a top-level `token` or `access` key
    pub fn from_json(document: Value) -> Result<Self> {
        let body = match document {
            Value::Object(mut map) if map.contains_key("token") || map.contains_key("access") => {
                map.remove("token")
                    .or_else(|| map.remove("access"))
                    .unwrap_or(Value::Null)
            }
            other => other,
        };
        serde_json::from_value(body).map_err(|e| {
            Error::Endpoint(format!(
                "document has neither a 'catalog' nor a 'serviceCatalog' list: {}",
                e
            ))
        })
    }

    /// Resolve the URL of a service; trailing `/` is trimmed
    pub fn endpoint(&self, service: &ServiceEndpoint) -> Result<String> {
        let catalog_type = service.catalog_type.as_str();
        let not_found = || Error::Endpoint(format!("{} endpoint not found", catalog_type));

        match self {
            ServiceCatalog::V3 { catalog } => {
                let interface = service
                    .endpoint_type
                    .strip_suffix("URL")
                    .unwrap_or(&service.endpoint_type);
                let entry = catalog
                    .iter()
                    .find(|s| s.service_type == catalog_type)
                    .ok_or_else(not_found)?;
                entry
                    .endpoints
                    .iter()
                    .find(|e| e.interface == interface)
                    .map(|e| e.url.trim_end_matches('/').to_string())
                    .ok_or_else(|| interface_not_found(interface, catalog_type))
            }
            ServiceCatalog::V2 { service_catalog } => {
                let key = if service.endpoint_type.ends_with("URL") {
                    service.endpoint_type.clone()
                } else {
                    format!("{}URL", service.endpoint_type)
                };
                let entry = service_catalog
                    .iter()
                    .find(|s| s.service_type == catalog_type)
                    .ok_or_else(not_found)?;
                entry
                    .endpoints
                    .first()
                    .and_then(|e| e.get(&key))
                    .and_then(Value::as_str)
                    .map(|url| url.trim_end_matches('/').to_string())
                    .ok_or_else(|| interface_not_found(&key, catalog_type))
            }
        }
    }
}

fn interface_not_found(interface: &str, catalog_type: &str) -> Error {
    Error::Endpoint(format!(
        "{} interface not found for endpoint {}",
        interface, catalog_type
    ))
}
