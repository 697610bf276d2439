//! Access to the remote asset service.
//!
//! [`AssetSource`] is the narrow boundary the pipeline and the user lookup
//! talk to. [`HttpAssetSource`] implements it against the REST API; tests use
//! the in-memory `MockAssetSource` behind the `testing` feature.

use reqwest::StatusCode;
use reqwest::blocking::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::freshservice::report::config::ServiceConfig;
use crate::freshservice::report::error::{ReportError, Result};
use crate::freshservice::report::ids::AssetId;
use crate::freshservice::report::model::{Asset, Component, NamedResource, Requester};
use crate::freshservice::report::throttle::{Attempt, Throttle};

/// Operating system and IP address read from an asset's type fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MachineFacts {
    pub system_os: Option<String>,
    pub machine_ip: Option<String>,
}

/// Read-only view of the asset service.
///
/// `Ok(None)` (or an empty list) means the service answered but had no data
/// for the key; `Err` means the lookup itself failed.
pub trait AssetSource {
    /// Base record of an asset.
    fn asset(&self, id: AssetId) -> Result<Option<Asset>>;

    /// Components attached to an asset.
    fn components(&self, id: AssetId) -> Result<Vec<Component>>;

    fn department(&self, id: u64) -> Result<Option<NamedResource>>;

    fn asset_type(&self, id: u64) -> Result<Option<NamedResource>>;

    fn location(&self, id: u64) -> Result<Option<NamedResource>>;

    fn requester(&self, id: u64) -> Result<Option<Requester>>;

    /// OS and IP of the asset named `ASSET-{id}`, found through a name filter
    /// rather than the base record.
    fn machine_facts(&self, id: AssetId) -> Result<Option<MachineFacts>>;

    /// First requester matching the given first and last name.
    fn find_requester(&self, first_name: &str, last_name: &str) -> Result<Option<Requester>>;

    /// Assets assigned to a requester.
    fn assets_for_user(&self, user_id: u64) -> Result<Vec<Asset>>;
}

/// Name the service gives to the asset with display ID `id`.
pub fn asset_name(id: AssetId) -> String {
    format!("ASSET-{id}")
}

#[derive(Deserialize)]
struct AssetEnvelope {
    asset: Option<Asset>,
}

#[derive(Deserialize)]
struct AssetsEnvelope {
    assets: Option<Vec<Asset>>,
}

#[derive(Deserialize)]
struct ComponentsEnvelope {
    components: Option<Vec<Component>>,
}

#[derive(Deserialize)]
struct DepartmentEnvelope {
    department: Option<NamedResource>,
}

#[derive(Deserialize)]
struct AssetTypeEnvelope {
    asset_type: Option<NamedResource>,
}

#[derive(Deserialize)]
struct LocationEnvelope {
    location: Option<NamedResource>,
}

#[derive(Deserialize)]
struct RequesterEnvelope {
    requester: Option<Requester>,
}

#[derive(Deserialize)]
struct RequestersEnvelope {
    requesters: Option<Vec<Requester>>,
}

/// Blocking HTTP client for the asset service. Only the first page of list
/// endpoints is read.
#[derive(Debug)]
pub struct HttpAssetSource {
    client: Client,
    config: ServiceConfig,
    throttle: Throttle,
}

impl HttpAssetSource {
    /// Creates a client that sleeps for real when throttled.
    pub fn new(config: ServiceConfig) -> Result<Self> {
        let throttle = Throttle::new(config.throttle);
        Self::with_throttle(config, throttle)
    }

    /// Creates a client with an explicit throttle.
    pub fn with_throttle(config: ServiceConfig, throttle: Throttle) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ReportError::Config(e.to_string()))?;
        Ok(Self {
            client,
            config,
            throttle,
        })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = self.config.endpoint(path);
        debug!(%url, "GET");
        self.throttle.run(|| {
            let response = self
                .client
                .get(&url)
                .query(query)
                .basic_auth(self.config.api_key().expose(), Some("X"))
                .send()?;
            classify(response.status(), &url, move || read_json(response))
        })
    }
}

fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response.text()?;
    Ok(serde_json::from_str(&body)?)
}

/// Maps a response status onto the throttle state machine. The body is only
/// read for successful responses.
pub(crate) fn classify<T>(
    status: StatusCode,
    url: &str,
    body: impl FnOnce() -> Result<T>,
) -> Result<Attempt<T>> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Ok(Attempt::RateLimited);
    }
    if !status.is_success() {
        return Err(ReportError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    body().map(Attempt::Done)
}

impl AssetSource for HttpAssetSource {
    fn asset(&self, id: AssetId) -> Result<Option<Asset>> {
        let envelope: AssetEnvelope = self.get_json(&format!("assets/{id}"), &[])?;
        Ok(envelope.asset)
    }

    fn components(&self, id: AssetId) -> Result<Vec<Component>> {
        let envelope: ComponentsEnvelope =
            self.get_json(&format!("assets/{id}/components"), &[])?;
        Ok(envelope.components.unwrap_or_else(|| {
            warn!(asset_id = id, "response carried no components");
            Vec::new()
        }))
    }

    fn department(&self, id: u64) -> Result<Option<NamedResource>> {
        let envelope: DepartmentEnvelope = self.get_json(&format!("departments/{id}"), &[])?;
        Ok(envelope.department)
    }

    fn asset_type(&self, id: u64) -> Result<Option<NamedResource>> {
        let envelope: AssetTypeEnvelope = self.get_json(&format!("asset_types/{id}"), &[])?;
        Ok(envelope.asset_type)
    }

    fn location(&self, id: u64) -> Result<Option<NamedResource>> {
        let envelope: LocationEnvelope = self.get_json(&format!("locations/{id}"), &[])?;
        Ok(envelope.location)
    }

    fn requester(&self, id: u64) -> Result<Option<Requester>> {
        let envelope: RequesterEnvelope = self.get_json(&format!("requesters/{id}"), &[])?;
        Ok(envelope.requester)
    }

    fn machine_facts(&self, id: AssetId) -> Result<Option<MachineFacts>> {
        let query = [
            ("include", "type_fields".to_string()),
            ("filter", format!("\"name:'{}'\"", asset_name(id))),
        ];
        let envelope: AssetsEnvelope = self.get_json("assets", &query)?;
        let asset = envelope.assets.and_then(|assets| assets.into_iter().next());
        Ok(asset.map(|asset| MachineFacts {
            system_os: asset.type_field(&self.config.os_field),
            machine_ip: asset.type_field(&self.config.ip_field),
        }))
    }

    fn find_requester(&self, first_name: &str, last_name: &str) -> Result<Option<Requester>> {
        let query = [(
            "query",
            format!("\"first_name:'{first_name}' AND last_name:'{last_name}'\""),
        )];
        let envelope: RequestersEnvelope = self.get_json("requesters", &query)?;
        Ok(envelope
            .requesters
            .and_then(|requesters| requesters.into_iter().next()))
    }

    fn assets_for_user(&self, user_id: u64) -> Result<Vec<Asset>> {
        let query = [("query", format!("\"user_id:{user_id}\""))];
        let envelope: AssetsEnvelope = self.get_json("assets", &query)?;
        Ok(envelope.assets.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_status_requests_a_retry() {
        let attempt = classify(StatusCode::TOO_MANY_REQUESTS, "https://x/assets/1", || {
            Ok::<_, ReportError>(1)
        })
        .expect("429 is not an error");
        assert_eq!(attempt, Attempt::RateLimited);
    }

    #[test]
    fn other_failures_surface_status_and_url() {
        let error = classify(StatusCode::NOT_FOUND, "https://x/assets/9", || {
            Ok::<_, ReportError>(1)
        })
        .expect_err("404 is an error");
        match error {
            ReportError::Status { status, url } => {
                assert_eq!(status, 404);
                assert_eq!(url, "https://x/assets/9");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn success_reads_the_body() {
        let attempt = classify(StatusCode::OK, "https://x/assets/1", || {
            Ok::<_, ReportError>("payload")
        })
        .expect("200 succeeds");
        assert_eq!(attempt, Attempt::Done("payload"));
    }

    #[test]
    fn asset_names_follow_the_service_convention() {
        assert_eq!(asset_name(143), "ASSET-143");
    }
}
