//! HTTP backend client
//!
//! Serverless functions are invoked with `POST {base}/functions/v1/{name}`
//! and lookup tables are read with `POST {base}/rest/v1/rpc/{name}`. Every
//! transport failure is reported as the error kind of the step that made
//! the call.

use crate::{
    classification::{LookupEntry, LookupKind, LookupSource},
    config::{BackendConfig, LookupConfig},
    pricing::{PricingClient, PricingRequest, PricingResponse},
    store::{CostStore, PersistRequest, PersistResponse, StoredSchedule},
    types::IssuanceId,
    Error, Result,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, error};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoadRequest {
    issuance_id: IssuanceId,
}

#[derive(Debug, Deserialize)]
struct LoadResponse {
    success: bool,
    #[serde(default)]
    schedule: Option<StoredSchedule>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the remote backend
#[derive(Debug, Clone)]
pub struct BackendClient {
    backend: BackendConfig,
    lookups: LookupConfig,
    client: Client,
}

impl BackendClient {
    /// Create client; timeouts are the transport defaults
    pub fn new(backend: BackendConfig, lookups: LookupConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            backend,
            lookups,
            client,
        })
    }

    fn function_url(&self, name: &str) -> String {
        format!("{}/functions/v1/{}", self.backend.base_url, name)
    }

    fn rpc_url(&self, name: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.backend.base_url, name)
    }

    fn rpc_name(&self, kind: LookupKind) -> &str {
        match kind {
            LookupKind::Category => &self.lookups.category_rpc,
            LookupKind::Vehicle => &self.lookups.vehicle_rpc,
            LookupKind::BackingType => &self.lookups.backing_type_rpc,
            LookupKind::OfferType => &self.lookups.offer_type_rpc,
        }
    }

    /// POST a JSON body and decode the JSON reply.
    ///
    /// Function replies carry their own `success` flag, so a non-2xx status
    /// is only an error when the body does not decode.
    async fn post<B, R>(&self, url: &str, body: &B) -> std::result::Result<R, String>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header("apikey", &self.backend.api_key)
            .bearer_auth(&self.backend.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("Request to {} failed: {}", url, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| format!("Failed to read response from {}: {}", url, e))?;

        serde_json::from_str::<R>(&text).map_err(|e| {
            if status.is_success() {
                format!("Failed to parse response from {}: {}", url, e)
            } else {
                format!("{} returned status {}: {}", url, status, text)
            }
        })
    }
}

#[async_trait]
impl LookupSource for BackendClient {
    async fn load(&self, kind: LookupKind) -> Result<Vec<LookupEntry>> {
        let url = self.rpc_url(self.rpc_name(kind));
        self.post(&url, &serde_json::json!({}))
            .await
            .map_err(|e| {
                error!("Failed to load {} table: {}", kind, e);
                Error::Lookup(e)
            })
    }
}

#[async_trait]
impl PricingClient for BackendClient {
    async fn price(&self, request: &PricingRequest) -> Result<PricingResponse> {
        let url = self.function_url(&self.backend.pricing_function);
        self.post(&url, request).await.map_err(Error::PricingFailure)
    }
}

#[async_trait]
impl CostStore for BackendClient {
    async fn load(&self, issuance_id: IssuanceId) -> Result<Option<StoredSchedule>> {
        let url = self.function_url(&self.backend.load_function);
        let response: LoadResponse = self
            .post(&url, &LoadRequest { issuance_id })
            .await
            .map_err(Error::Store)?;

        if !response.success {
            return Err(Error::Store(
                response
                    .error
                    .unwrap_or_else(|| "Load function reported failure".to_string()),
            ));
        }
        Ok(response.schedule)
    }

    async fn save(&self, request: &PersistRequest) -> Result<PersistResponse> {
        let url = self.function_url(&self.backend.persist_function);
        self.post(&url, request).await.map_err(Error::PersistenceFailure)
    }
}
