//! HTTP client for the Vault system endpoints used by the unsealer

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use unsealer_core::{RemoteError, RemoteResult, RootGenerationStatus, SealStatus, SealStatusClient};

use crate::error::{DaemonError, Result};

/// Header carrying the client token
const TOKEN_HEADER: &str = "X-Vault-Token";

/// `sys/seal-status` and `sys/unseal` response
#[derive(Debug, Deserialize)]
struct SealStatusResponse {
    sealed: bool,
    #[serde(rename = "t")]
    threshold: usize,
    #[serde(default)]
    progress: usize,
}

/// `sys/generate-root/*` response
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerateRootResponse {
    nonce: String,
    progress: usize,
    required: usize,
    complete: bool,
    encoded_token: String,
    encoded_root_token: String,
    otp: String,
}

/// Error body returned by Vault
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ErrorResponse {
    errors: Vec<String>,
}

#[derive(Serialize)]
struct UnsealRequest<'a> {
    key: &'a str,
}

#[derive(Serialize)]
struct GenerateRootInit<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    otp: Option<&'a str>,
}

#[derive(Serialize)]
struct GenerateRootUpdate<'a> {
    key: &'a str,
    nonce: &'a str,
}

impl From<SealStatusResponse> for SealStatus {
    fn from(r: SealStatusResponse) -> Self {
        SealStatus {
            sealed: r.sealed,
            threshold: r.threshold,
            progress: r.progress,
        }
    }
}

impl From<GenerateRootResponse> for RootGenerationStatus {
    fn from(r: GenerateRootResponse) -> Self {
        // Older servers use `encoded_root_token`
        let encoded = if !r.encoded_token.is_empty() {
            Some(r.encoded_token)
        } else if !r.encoded_root_token.is_empty() {
            Some(r.encoded_root_token)
        } else {
            None
        };

        RootGenerationStatus {
            nonce: r.nonce,
            progress: r.progress,
            required: r.required,
            complete: r.complete,
            encoded_token: encoded,
            otp: (!r.otp.is_empty()).then_some(r.otp),
        }
    }
}

/// Vault REST client
pub struct VaultClient {
    http: reqwest::Client,
    base_url: String,
}

impl VaultClient {
    /// Create a client for the Vault at `addr`
    pub fn new(addr: &str, timeout: Duration, accept_invalid_certs: bool) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| DaemonError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            base_url: addr.trim_end_matches('/').to_string(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}/v1/{}", self.base_url, path))
    }

    async fn execute(&self, request: RequestBuilder) -> RemoteResult<reqwest::Response> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        debug!("Vault responded {} for {}", status, response.url().path());

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(rejection(status, &body))
    }

    async fn execute_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> RemoteResult<T> {
        self.execute(request)
            .await?
            .json::<T>()
            .await
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }
}

fn map_transport_error(e: reqwest::Error) -> RemoteError {
    if e.is_timeout() {
        RemoteError::Timeout
    } else {
        RemoteError::Unreachable(e.to_string())
    }
}

fn rejection(status: StatusCode, body: &str) -> RemoteError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .ok()
        .filter(|e| !e.errors.is_empty())
        .map(|e| e.errors.join("; "))
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

    RemoteError::Rejected {
        status: status.as_u16(),
        message,
    }
}

#[async_trait]
impl SealStatusClient for VaultClient {
    async fn seal_status(&self) -> RemoteResult<SealStatus> {
        let response: SealStatusResponse = self
            .execute_json(self.request(Method::GET, "sys/seal-status"))
            .await?;
        Ok(response.into())
    }

    async fn submit_unseal_share(&self, share: &str) -> RemoteResult<SealStatus> {
        let request = self
            .request(Method::PUT, "sys/unseal")
            .json(&UnsealRequest { key: share });
        let response: SealStatusResponse = self.execute_json(request).await?;
        Ok(response.into())
    }

    async fn init_root_generation(
        &self,
        otp: Option<&str>,
    ) -> RemoteResult<RootGenerationStatus> {
        let request = self
            .request(Method::PUT, "sys/generate-root/attempt")
            .json(&GenerateRootInit { otp });
        let response: GenerateRootResponse = self.execute_json(request).await?;
        Ok(response.into())
    }

    async fn update_root_generation(
        &self,
        share: &str,
        nonce: &str,
    ) -> RemoteResult<RootGenerationStatus> {
        let request = self
            .request(Method::PUT, "sys/generate-root/update")
            .json(&GenerateRootUpdate { key: share, nonce });
        let response: GenerateRootResponse = self.execute_json(request).await?;
        Ok(response.into())
    }

    async fn cancel_root_generation(&self) -> RemoteResult<()> {
        self.execute(self.request(Method::DELETE, "sys/generate-root/attempt"))
            .await?;
        Ok(())
    }

    async fn revoke_self(&self, token: &Zeroizing<String>) -> RemoteResult<()> {
        let request = self
            .request(Method::POST, "auth/token/revoke-self")
            .header(TOKEN_HEADER, token.as_str());
        self.execute(request).await?;
        Ok(())
    }
}
