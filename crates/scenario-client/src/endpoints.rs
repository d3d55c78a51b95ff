//! URL builders for the compute service.

use scenario_core::types::id::{LayerId, RemoteJobId};

fn join(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// `POST /layer/upload/start`
pub fn layer_upload_start(base: &str) -> String {
    join(base, "layer/upload/start")
}

/// `POST /layer/upload/{uuid}/finish`
pub fn layer_upload_finish(base: &str, layer: LayerId) -> String {
    join(base, &format!("layer/upload/{layer}/finish"))
}

/// `POST /layer/upload/{uuid}/abort`
pub fn layer_upload_abort(base: &str, layer: LayerId) -> String {
    join(base, &format!("layer/upload/{layer}/abort"))
}

/// `DELETE /layer/{uuid}`
pub fn layer(base: &str, layer: LayerId) -> String {
    join(base, &format!("layer/{layer}"))
}

/// `POST /layer/check`
pub fn layer_check(base: &str) -> String {
    join(base, "layer/check")
}

/// `POST /scenario/submit`
pub fn scenario_submit(base: &str) -> String {
    join(base, "scenario/submit")
}

/// `GET /scenario/{uuid}/execute`
pub fn scenario_execute(base: &str, job: RemoteJobId) -> String {
    join(base, &format!("scenario/{job}/execute"))
}

/// `GET /scenario/{uuid}/status`
pub fn scenario_status(base: &str, job: RemoteJobId) -> String {
    join(base, &format!("scenario/{job}/status"))
}

/// `GET /scenario/{uuid}/cancel`
pub fn scenario_cancel(base: &str, job: RemoteJobId) -> String {
    join(base, &format!("scenario/{job}/cancel"))
}

/// `GET /scenario/{uuid}/detail`
pub fn scenario_detail(base: &str, job: RemoteJobId) -> String {
    join(base, &format!("scenario/{job}/detail"))
}

/// `GET /scenario_output/{uuid}/list`
pub fn scenario_output_list(base: &str, job: RemoteJobId) -> String {
    join(base, &format!("scenario_output/{job}/list?download_all=true"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_handles_slashes() {
        assert_eq!(layer_check("http://h/api/v1/"), "http://h/api/v1/layer/check");
        assert_eq!(layer_check("http://h/api/v1"), "http://h/api/v1/layer/check");
    }

    #[test]
    fn test_job_paths() {
        let job = RemoteJobId::new();
        assert_eq!(
            scenario_status("http://h", job),
            format!("http://h/scenario/{job}/status")
        );
    }
}
