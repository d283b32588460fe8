//! Conversion of typed results into the `{code, data}` envelope.

use qiniu_models::{FailureKind, OperationResult};
use qiniu_storage::{Reply, StorageError, StorageResult};
use serde::Serialize;
use tracing::{error, info};

/// Convert one operation outcome, emitting the log lines.
///
/// Failures always log at error level; successes log their raw body and
/// response metadata only when `log_bodies` is set.
pub(crate) fn normalize<T: Serialize>(
    component: &str,
    method: &str,
    result: StorageResult<Reply<T>>,
    log_bodies: bool,
) -> OperationResult {
    match result {
        Ok(reply) => match serde_json::to_value(&reply.body) {
            Ok(body) => {
                if log_bodies {
                    info!(
                        status = reply.status,
                        req_id = reply.req_id.as_deref().unwrap_or("-"),
                        "{}.{} respBody: {}",
                        component,
                        method,
                        body
                    );
                }
                OperationResult::success(reply.status, body)
            }
            Err(e) => {
                error!("{}.{} error: {}", component, method, e);
                OperationResult::failure(e.to_string(), FailureKind::Transport, None)
            }
        },
        Err(e) => failure(component, method, e),
    }
}

pub(crate) fn failure(component: &str, method: &str, e: StorageError) -> OperationResult {
    error!("{}.{} error: {}", component, method, e);
    OperationResult::failure(e.to_string(), e.kind(), e.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qiniu_models::FAILURE_CODE;
    use serde_json::json;

    #[test]
    fn test_success_keeps_status_and_body() {
        let reply = Reply {
            status: 298,
            req_id: Some("r".into()),
            body: json!([{"code": 200}]),
        };
        let result = normalize("ResourceManager", "batch", Ok(reply), true);
        assert_eq!(result.code, 298);
        assert_eq!(result.data[0]["code"], 200);
    }

    #[test]
    fn test_remote_failure() {
        let err = StorageError::from_http_status(612, r#"{"error":"no such file or directory"}"#, None);
        let result = normalize::<serde_json::Value>("ResourceManager", "stat", Err(err), false);

        assert_eq!(result.code, FAILURE_CODE);
        assert_eq!(result.failure_kind(), Some(FailureKind::Remote));
        assert_eq!(result.data["status"], 612);
        assert!(result.error().unwrap().contains("no such file or directory"));
    }

    #[test]
    fn test_validation_failure_has_no_status() {
        let result = failure("CdnManager", "refreshUrls", StorageError::validation("at least one url is required"));
        assert_eq!(result.code, FAILURE_CODE);
        assert_eq!(result.failure_kind(), Some(FailureKind::Validation));
        assert!(result.data.get("status").is_none());
    }
}
