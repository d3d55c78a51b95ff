//! Typed wrappers over the compute service endpoints.

use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use scenario_core::result::AppResult;
use scenario_core::types::id::{LayerId, RemoteJobId};
use scenario_entity::wire::{
    AbortUploadRequest, CheckLayersResponse, FinishUploadRequest, FinishUploadResponse,
    OutputListResponse, ScenarioPayload, StartUploadRequest, StartUploadResponse, StatusPayload,
    SubmitResponse,
};

use crate::endpoints;
use crate::transport::HttpTransport;

/// The compute service as the job pipeline sees it.
///
/// Submission and execution return the raw status code alongside the body
/// because only a 201 counts as success for those calls.
#[async_trait]
pub trait RemoteApi: Send + Sync + std::fmt::Debug + 'static {
    /// Begin a multipart layer upload.
    async fn start_upload(&self, request: &StartUploadRequest) -> AppResult<StartUploadResponse>;

    /// Complete a multipart layer upload.
    async fn finish_upload(
        &self,
        layer: LayerId,
        request: &FinishUploadRequest,
    ) -> AppResult<FinishUploadResponse>;

    /// Abort a stale multipart upload.
    async fn abort_upload(&self, layer: LayerId, request: &AbortUploadRequest) -> AppResult<()>;

    /// Delete a layer.
    async fn delete_layer(&self, layer: LayerId) -> AppResult<()>;

    /// Ask which of the given layers are unavailable or invalid.
    async fn check_layers(&self, layers: &[LayerId]) -> AppResult<CheckLayersResponse>;

    /// Submit a scenario description.
    async fn submit_scenario(&self, payload: &ScenarioPayload) -> AppResult<(u16, SubmitResponse)>;

    /// Start executing a submitted scenario. Returns the status code.
    async fn execute_scenario(&self, job: RemoteJobId) -> AppResult<u16>;

    /// Fetch the job status.
    async fn scenario_status(&self, job: RemoteJobId) -> AppResult<StatusPayload>;

    /// Ask the service to cancel the job.
    async fn cancel_scenario(&self, job: RemoteJobId) -> AppResult<()>;

    /// Fetch the scenario detail document.
    async fn scenario_detail(&self, job: RemoteJobId) -> AppResult<Value>;

    /// List the declared output files.
    async fn list_outputs(&self, job: RemoteJobId) -> AppResult<OutputListResponse>;
}

/// [`RemoteApi`] over an [`HttpTransport`].
#[derive(Debug, Clone)]
pub struct HttpRemoteApi {
    transport: HttpTransport,
    base_url: String,
}

impl HttpRemoteApi {
    /// Create the API client.
    pub fn new(transport: HttpTransport, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    async fn call<B, T>(&self, name: &str, method: Method, url: &str, body: Option<&B>) -> AppResult<(T, u16)>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let body = body.map(serde_json::to_value).transpose()?;
        let (value, status) = self.transport.request(name, method, url, body.as_ref()).await?;
        let value = if value.is_null() {
            Value::Object(Default::default())
        } else {
            value
        };
        Ok((serde_json::from_value(value)?, status))
    }

    async fn call_raw(&self, name: &str, method: Method, url: &str, body: Option<&Value>) -> AppResult<(Value, u16)> {
        self.transport.request(name, method, url, body).await
    }
}

#[async_trait]
impl RemoteApi for HttpRemoteApi {
    async fn start_upload(&self, request: &StartUploadRequest) -> AppResult<StartUploadResponse> {
        let url = endpoints::layer_upload_start(&self.base_url);
        let (response, _) = self.call("start layer upload", Method::POST, &url, Some(request)).await?;
        Ok(response)
    }

    async fn finish_upload(
        &self,
        layer: LayerId,
        request: &FinishUploadRequest,
    ) -> AppResult<FinishUploadResponse> {
        let url = endpoints::layer_upload_finish(&self.base_url, layer);
        let (response, _) = self.call("finish layer upload", Method::POST, &url, Some(request)).await?;
        Ok(response)
    }

    async fn abort_upload(&self, layer: LayerId, request: &AbortUploadRequest) -> AppResult<()> {
        let url = endpoints::layer_upload_abort(&self.base_url, layer);
        let body = serde_json::to_value(request)?;
        self.call_raw("abort layer upload", Method::POST, &url, Some(&body)).await?;
        Ok(())
    }

    async fn delete_layer(&self, layer: LayerId) -> AppResult<()> {
        let url = endpoints::layer(&self.base_url, layer);
        self.call_raw("delete layer", Method::DELETE, &url, None).await?;
        Ok(())
    }

    async fn check_layers(&self, layers: &[LayerId]) -> AppResult<CheckLayersResponse> {
        let url = endpoints::layer_check(&self.base_url);
        let ids: Vec<String> = layers.iter().map(ToString::to_string).collect();
        let (response, _) = self.call("check layers", Method::POST, &url, Some(&ids)).await?;
        Ok(response)
    }

    async fn submit_scenario(&self, payload: &ScenarioPayload) -> AppResult<(u16, SubmitResponse)> {
        let url = endpoints::scenario_submit(&self.base_url);
        let (response, status) = self.call("submit scenario", Method::POST, &url, Some(payload)).await?;
        Ok((status, response))
    }

    async fn execute_scenario(&self, job: RemoteJobId) -> AppResult<u16> {
        let url = endpoints::scenario_execute(&self.base_url, job);
        let (_, status) = self.call_raw("execute scenario", Method::GET, &url, None).await?;
        Ok(status)
    }

    async fn scenario_status(&self, job: RemoteJobId) -> AppResult<StatusPayload> {
        let url = endpoints::scenario_status(&self.base_url, job);
        let (response, _) = self.call::<Value, _>("scenario status", Method::GET, &url, None).await?;
        Ok(response)
    }

    async fn cancel_scenario(&self, job: RemoteJobId) -> AppResult<()> {
        let url = endpoints::scenario_cancel(&self.base_url, job);
        self.call_raw("cancel scenario", Method::GET, &url, None).await?;
        Ok(())
    }

    async fn scenario_detail(&self, job: RemoteJobId) -> AppResult<Value> {
        let url = endpoints::scenario_detail(&self.base_url, job);
        let (detail, _) = self.call_raw("scenario detail", Method::GET, &url, None).await?;
        Ok(detail)
    }

    async fn list_outputs(&self, job: RemoteJobId) -> AppResult<OutputListResponse> {
        let url = endpoints::scenario_output_list(&self.base_url, job);
        let (response, _) = self.call::<Value, _>("list scenario outputs", Method::GET, &url, None).await?;
        Ok(response)
    }
}
