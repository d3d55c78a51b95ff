//! JSON bodies exchanged with the compute service.

pub mod layer;
pub mod output;
pub mod scenario;

pub use layer::{
    AbortUploadRequest, CheckLayersResponse, FinishUploadRequest, FinishUploadResponse,
    StartUploadRequest, StartUploadResponse, UploadUrl,
};
pub use output::{OutputEntry, OutputListResponse};
pub use scenario::{
    ActivityPayload, ExtentPayload, PathwayPayload, PriorityLayerPayload, ScenarioPayload,
    StatusPayload, SubmitResponse,
};
