use scaler_core::{EngineConfig, Result, ScalerError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScalingRequest {
    new_instances: u32,
    context: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApplicationNameRequest {
    #[serde(rename = "resourceId")]
    resource_id: String,
    #[serde(rename = "resourceName")]
    resource_name: String,
    context: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApplicationNameResponse {
    #[serde(rename = "resourceName")]
    resource_name: String,
}

/// Outbound client for the external scaling engine. Network failures and
/// 5xx responses surface as `ScalerError::Upstream`, which the scaler
/// loop treats as "retry next interval"; 4xx responses surface as
/// `ScalerError::Rejected` instead, since retrying an unchanged request
/// would just fail again.
pub struct ScalingEngineClient {
    http: reqwest::Client,
    config: EngineConfig,
}

impl ScalingEngineClient {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ScalerError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http, config })
    }

    fn base_url(&self) -> String {
        if self.config.host.starts_with("http://") || self.config.host.starts_with("https://") {
            self.config.host.clone()
        } else {
            format!("http://{}", self.config.host)
        }
    }

    pub async fn send_scaling_request(
        &self,
        resource_id: &str,
        context: &HashMap<String, String>,
        new_instances: u32,
    ) -> Result<()> {
        let url = format!(
            "{}/{}/{}",
            self.base_url(),
            self.config.scaling_endpoint,
            resource_id
        );
        let response = self
            .http
            .post(&url)
            .header("secret", &self.config.secret)
            .json(&ScalingRequest {
                new_instances,
                context: context.clone(),
            })
            .send()
            .await
            .map_err(|e| ScalerError::Upstream(format!("scaling request failed: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else if response.status().is_client_error() {
            Err(ScalerError::Rejected(format!(
                "scaling engine rejected request for {}: {}",
                resource_id,
                response.status()
            )))
        } else {
            Err(ScalerError::Upstream(format!(
                "scaling engine returned {} for {}",
                response.status(),
                resource_id
            )))
        }
    }

    /// Resolves the platform-assigned display name for a resource, used
    /// at bind time when `updateAppNameAtBinding` is enabled.
    pub async fn resolve_application_name(
        &self,
        resource_id: &str,
        context: &HashMap<String, String>,
    ) -> Result<String> {
        let url = format!("{}/{}/{}", self.base_url(), self.config.name_endpoint, resource_id);
        let response = self
            .http
            .post(&url)
            .header("secret", &self.config.secret)
            .json(&ApplicationNameRequest {
                resource_id: resource_id.to_string(),
                resource_name: String::new(),
                context: context.clone(),
            })
            .send()
            .await
            .map_err(|e| ScalerError::Upstream(format!("name resolution request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ScalerError::Upstream(format!(
                "name resolution returned {} for {}",
                response.status(),
                resource_id
            )));
        }

        let body: ApplicationNameResponse = response
            .json()
            .await
            .map_err(|e| ScalerError::Upstream(format!("malformed name resolution response: {}", e)))?;
        Ok(body.resource_name)
    }
}
