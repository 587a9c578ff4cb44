//! Spoolman REST client.
//!
//! Blocking requests against `{api_base}/api/v1`. Every call is a single
//! request with a success/failure outcome; retries are left to the caller.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use fil_core::{Spool, SpoolId};

use crate::error::{InventoryError, InventoryResult};
use crate::{Inventory, SpoolQuery};

/// Server-side ordering for spool searches.
const SPOOL_SORT: &str = "location:asc,remaining_weight:asc,filament.name:asc,id:desc";
const SPOOL_LIMIT: &str = "1000";

/// A settings entry as returned by `GET /api/v1/setting/`.
#[derive(Debug, Clone, Deserialize)]
struct SettingEntry {
    value: serde_json::Value,
    #[serde(default)]
    is_set: bool,
}

pub struct SpoolmanClient {
    base: String,
    http: Client,
}

impl SpoolmanClient {
    pub fn new(base: &str, timeout: Duration) -> InventoryResult<Self> {
        let base = base.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(InventoryError::InvalidUrl(base.to_string()));
        }
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fil/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| InventoryError::Request(e.to_string()))?;
        Ok(Self {
            base: base.to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1/{}", self.base, path)
    }

    fn query_params(query: &SpoolQuery) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("sort", SPOOL_SORT.to_string()),
            ("limit", SPOOL_LIMIT.to_string()),
        ];
        if let Some(name) = query.name_filter() {
            params.push(("filament.name", name.to_string()));
        }
        if let Some(location) = &query.location {
            params.push(("location", location.clone()));
        }
        if let Some(material) = &query.material {
            params.push(("filament.material", material.clone()));
        }
        if let Some(vendor) = &query.vendor {
            params.push(("filament.vendor.name", vendor.clone()));
        }
        if let Some(color) = &query.color_hex {
            params.push(("filament.color_hex", color.clone()));
        }
        if query.allow_archived {
            params.push(("allow_archived", "true".to_string()));
        }
        params
    }

    fn patch_spool(&self, id: SpoolId, body: serde_json::Value) -> InventoryResult<()> {
        let response = self
            .http
            .patch(self.url(&format!("spool/{id}")))
            .json(&body)
            .send()
            .map_err(request_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(InventoryError::SpoolNotFound(id));
        }
        expect_success(response)?;
        Ok(())
    }
}

impl Inventory for SpoolmanClient {
    fn find_spools(&self, query: &SpoolQuery) -> InventoryResult<Vec<Spool>> {
        let response = self
            .http
            .get(self.url("spool"))
            .query(&Self::query_params(query))
            .send()
            .map_err(request_error)?;
        let spools: Vec<Spool> = expect_success(response)?
            .json()
            .map_err(|e| InventoryError::Decode(e.to_string()))?;
        debug!(count = spools.len(), "spool search");
        Ok(spools)
    }

    fn get_spool(&self, id: SpoolId) -> InventoryResult<Spool> {
        let response = self
            .http
            .get(self.url(&format!("spool/{id}")))
            .send()
            .map_err(request_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(InventoryError::SpoolNotFound(id));
        }
        expect_success(response)?
            .json()
            .map_err(|e| InventoryError::Decode(e.to_string()))
    }

    fn set_spool_location(&self, id: SpoolId, location: &str) -> InventoryResult<()> {
        self.patch_spool(id, json!({ "location": location }))
    }

    fn use_filament(&self, id: SpoolId, amount: f64) -> InventoryResult<()> {
        let response = self
            .http
            .put(self.url(&format!("spool/{id}/use")))
            .json(&json!({ "use_weight": amount }))
            .send()
            .map_err(request_error)?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(InventoryError::SpoolNotFound(id));
        }
        expect_success(response)?;
        Ok(())
    }

    fn get_setting(&self, key: &str) -> InventoryResult<Option<serde_json::Value>> {
        let response = self
            .http
            .get(self.url("setting/"))
            .send()
            .map_err(request_error)?;
        let mut settings: HashMap<String, SettingEntry> = expect_success(response)?
            .json()
            .map_err(|e| InventoryError::Decode(e.to_string()))?;
        Ok(settings.remove(key).map(|entry| {
            debug!(%key, is_set = entry.is_set, "setting fetched");
            entry.value
        }))
    }

    fn put_setting(&self, key: &str, json_text: &str) -> InventoryResult<()> {
        let url = self.url(&format!("setting/{key}"));
        let wrapped = json!({ "value": json_text, "is_set": true, "type": "object" });
        let response = self
            .http
            .post(&url)
            .json(&wrapped)
            .send()
            .map_err(request_error)?;
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().unwrap_or_default().trim().to_string();
        if !wants_plain_string(status, &body) {
            return Err(InventoryError::Api {
                status: status.as_u16(),
                body,
            });
        }

        // Some server versions only accept the JSON text as a bare string body.
        debug!(%key, "retrying setting write with plain string body");
        let response = self
            .http
            .post(&url)
            .json(&json_text)
            .send()
            .map_err(request_error)?;
        expect_success(response)?;
        Ok(())
    }
}

fn wants_plain_string(status: StatusCode, body: &str) -> bool {
    let body = body.to_lowercase();
    status == StatusCode::UNPROCESSABLE_ENTITY
        || body.contains("valid string")
        || body.contains("string_type")
}

fn request_error(err: reqwest::Error) -> InventoryError {
    InventoryError::Request(err.to_string())
}

fn expect_success(response: Response) -> InventoryResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default().trim().to_string();
    Err(InventoryError::Api {
        status: status.as_u16(),
        body,
    })
}
