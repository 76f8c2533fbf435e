use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;

use super::{AccountScope, Scope, XsoarApi};
use crate::error::{ReconcileError, Result};
use crate::schema::{
    IntegrationSearch, ModuleCatalog, ModuleDefinition, ModuleInstanceRequest, RemoteAccount,
    RemoteInstance,
};

const AUTH_ID_HEADER: &str = "x-xdr-auth-id";

#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub auth_id: Option<String>,
    pub insecure: bool,
    pub timeout: Duration,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            auth_id: None,
            insecure: false,
            timeout: Duration::from_secs(30),
        }
    }
}

pub struct HttpXsoarClient {
    base_url: String,
    client: Client,
}

impl HttpXsoarClient {
    pub fn new(settings: ClientSettings) -> Result<Self> {
        let base_url = settings
            .base_url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ReconcileError::not_configured("no base URL set"))?;
        let api_key = settings
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ReconcileError::not_configured("no API key set"))?;

        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&api_key)
            .map_err(|_| ReconcileError::not_configured("API key is not a valid header value"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(auth_id) = settings.auth_id.filter(|a| !a.is_empty()) {
            let value = HeaderValue::from_str(&auth_id)
                .map_err(|_| ReconcileError::not_configured("auth id is not a valid header value"))?;
            headers.insert(AUTH_ID_HEADER, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(settings.timeout)
            .danger_accept_invalid_certs(settings.insecure)
            .build()
            .map_err(|source| ReconcileError::Transport { operation: "build client", source })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn url(&self, scope: &Scope, path: &str) -> String {
        format!("{}{}{}", self.base_url, scope.path_prefix(), path)
    }

    /// Sends a request. A 404 becomes `Ok(None)` when `missing_ok` is set.
    async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
        payload: Option<String>,
        missing_ok: bool,
    ) -> Result<Option<Vec<u8>>> {
        let resp = request
            .send()
            .await
            .map_err(|source| ReconcileError::Transport { operation, source })?;
        let status = resp.status();

        if missing_ok && status == StatusCode::NOT_FOUND {
            tracing::debug!(operation, "remote reported object missing");
            return Ok(None);
        }

        if !status.is_success() {
            let headers: BTreeMap<String, String> = resp
                .headers()
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
                .collect();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(operation, status = status.as_u16(), ?headers, %body, "remote call failed");
            return Err(ReconcileError::RemoteCallFailed {
                operation,
                status: status.as_u16(),
                headers,
                body,
                payload,
            });
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|source| ReconcileError::Transport { operation, source })?;
        Ok(Some(bytes.to_vec()))
    }

    fn decode<T: DeserializeOwned>(what: &'static str, bytes: &[u8]) -> Result<T> {
        serde_json::from_slice(bytes).map_err(|source| ReconcileError::Decode { what, source })
    }

    async fn search(&self, scope: &Scope) -> Result<IntegrationSearch> {
        let url = self.url(scope, "/settings/integration/search");
        let request = self.client.post(&url).json(&json!({}));
        match self.execute("search integrations", request, None, false).await? {
            Some(bytes) => Self::decode("integration search", &bytes),
            None => Ok(IntegrationSearch::default()),
        }
    }

    async fn find_instance(&self, scope: &Scope, field: &str, expected: &str) -> Result<Option<RemoteInstance>> {
        let search = self.search(scope).await?;
        search
            .instances
            .into_iter()
            .find(|raw| RemoteInstance::raw_field_is(raw, field, expected))
            .map(|raw| {
                serde_json::from_value(raw)
                    .map_err(|source| ReconcileError::Decode { what: "integration instance", source })
            })
            .transpose()
    }
}

#[async_trait]
impl XsoarApi for HttpXsoarClient {
    async fn list_modules(&self) -> Result<ModuleCatalog> {
        let search = self.search(&Scope::Global).await?;
        let modules = search
            .configurations
            .into_iter()
            .filter_map(|raw| {
                let name = raw.get("name").and_then(|n| n.as_str()).unwrap_or("<unnamed>").to_string();
                match ModuleDefinition::from_value(raw) {
                    Ok(module) => Some(module),
                    Err(e) => {
                        tracing::warn!(module = %name, error = %e, "skipping undecodable catalog entry");
                        None
                    }
                }
            })
            .collect();
        Ok(ModuleCatalog::new(modules))
    }

    async fn get_instance_by_id(&self, scope: &Scope, id: &str) -> Result<Option<RemoteInstance>> {
        self.find_instance(scope, "id", id).await
    }

    async fn get_instance_by_name(&self, scope: &Scope, name: &str) -> Result<Option<RemoteInstance>> {
        self.find_instance(scope, "name", name).await
    }

    async fn get_account(&self, account: &AccountScope) -> Result<Option<RemoteAccount>> {
        let url = format!("{}/account/{}", self.base_url, account.as_str());
        let Some(bytes) = self.execute("get account", self.client.get(&url), None, true).await? else {
            return Ok(None);
        };
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Self::decode::<Option<RemoteAccount>>("account", &bytes)
    }

    async fn upsert_instance(&self, scope: &Scope, payload: &ModuleInstanceRequest) -> Result<RemoteInstance> {
        let url = self.url(scope, "/settings/integration");
        let body = serde_json::to_value(payload)
            .map_err(|source| ReconcileError::Decode { what: "instance payload", source })?;
        let request = self.client.put(&url).json(&body);
        let bytes = self
            .execute("upsert integration instance", request, Some(body.to_string()), false)
            .await?
            .unwrap_or_default();
        Self::decode("integration instance", &bytes)
    }

    async fn delete_instance(&self, scope: &Scope, id: &str) -> Result<()> {
        let url = self.url(scope, &format!("/settings/integration/{}", id));
        self.execute("delete integration instance", self.client.delete(&url), None, false)
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for HttpXsoarClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpXsoarClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
