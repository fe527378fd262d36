//! Action execution.
//!
//! Action lists run strictly in order on their own tokio task, detached from the
//! request that triggered them. The server spawns a list once the response has been
//! built, so the first action may start before the response reaches the client.
//! A failing action is logged and execution moves on to the next one; nothing is
//! reported back to the triggering request.

use crate::definition::{Action, Definition};
use crate::metrics;
use crate::requester::Requester;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Runs action lists against a shared definition.
#[derive(Clone)]
pub struct ActionExecutor {
    definition: Arc<Definition>,
    requester: Arc<dyn Requester>,
}

impl ActionExecutor {
    pub fn new(definition: Arc<Definition>, requester: Arc<dyn Requester>) -> Self {
        Self {
            definition,
            requester,
        }
    }

    /// Run `actions` on a new task. `caller` labels every log line.
    ///
    /// The returned handle may be dropped; the task keeps running regardless.
    pub fn spawn_actions(
        &self,
        actions: Vec<Action>,
        caller: impl Into<String>,
    ) -> JoinHandle<()> {
        let executor = self.clone();
        let caller = caller.into();
        tokio::spawn(async move { executor.run_actions(&actions, &caller).await })
    }

    /// Run `actions` in order on the current task.
    pub async fn run_actions(&self, actions: &[Action], caller: &str) {
        for action in actions {
            let success = self.run_action(action, caller).await;
            metrics::record_action(action.kind(), success);
        }
    }

    async fn run_action(&self, action: &Action, caller: &str) -> bool {
        match action {
            Action::Delay { seconds } => {
                info!("{}: Delay requested for {} seconds", caller, seconds);
                tokio::time::sleep(Duration::from_secs(*seconds)).await;
                true
            }
            Action::ChainedRequest { target, request } => {
                let Some(service) = self.definition.service(target) else {
                    error!(
                        "{}: Invalid request action, service '{}' is not defined",
                        caller, target
                    );
                    return false;
                };
                let Some(template) = self.definition.request(request) else {
                    error!(
                        "{}: Invalid request action, request '{}' is not defined",
                        caller, request
                    );
                    return false;
                };

                match self.requester.send(service, template).await {
                    Ok(()) => {
                        info!(
                            "{}: Request {} to service {}:{} successful",
                            caller, template.url, service.hostname, service.port
                        );
                        true
                    }
                    Err(e) => {
                        error!(
                            "{}: Request {} to service {}:{} failed: {}",
                            caller, template.url, service.hostname, service.port, e
                        );
                        false
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{RequestTemplate, Service};
    use crate::error::RequesterError;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::time::Instant;
    use tracing_test::traced_test;

    /// Records every call; fails calls to the `broken` service with a status mismatch.
    #[derive(Default)]
    struct RecordingRequester {
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Requester for RecordingRequester {
        async fn send(
            &self,
            service: &Service,
            request: &RequestTemplate,
        ) -> Result<(), RequesterError> {
            self.calls
                .lock()
                .push(format!("{}{}", service.hostname, request.url));
            if service.hostname == "broken" {
                return Err(RequesterError::StatusMismatch {
                    expected: 200,
                    actual: 500,
                });
            }
            Ok(())
        }
    }

    fn definition() -> Arc<Definition> {
        let yaml = r#"
services:
  billing: {hostname: billing, port: 9001}
  broken: {hostname: broken, port: 9002}
requests:
  notify: {url: /notify, method: post, expectedResponse: {statusCode: 200}}
  audit: {url: /audit, method: put}
endpoints:
  /a:
    get: {response: 200}
"#;
        Arc::new(Definition::from_yaml_str(yaml).unwrap())
    }

    fn chained(target: &str, request: &str) -> Action {
        Action::ChainedRequest {
            target: target.to_string(),
            request: request.to_string(),
        }
    }

    fn executor() -> (ActionExecutor, Arc<RecordingRequester>) {
        let requester = Arc::new(RecordingRequester::default());
        let executor = ActionExecutor::new(definition(), requester.clone());
        (executor, requester)
    }

    #[tokio::test]
    async fn test_actions_run_in_order() {
        let (executor, requester) = executor();
        let actions = vec![
            chained("billing", "notify"),
            Action::Delay { seconds: 0 },
            chained("billing", "audit"),
        ];
        executor.run_actions(&actions, "/orders").await;
        assert_eq!(
            *requester.calls.lock(),
            vec!["billing/notify".to_string(), "billing/audit".to_string()]
        );
    }

    #[traced_test]
    #[tokio::test]
    async fn test_unknown_service_does_not_stop_later_actions() {
        let (executor, requester) = executor();
        let actions = vec![
            chained("nobody", "notify"),
            Action::Delay { seconds: 0 },
            chained("billing", "notify"),
        ];
        executor.run_actions(&actions, "/orders").await;

        assert_eq!(*requester.calls.lock(), vec!["billing/notify".to_string()]);
        assert!(logs_contain("service 'nobody' is not defined"));
        assert!(logs_contain("Delay requested for 0 seconds"));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_unknown_request_is_logged() {
        let (executor, requester) = executor();
        executor
            .run_actions(&[chained("billing", "missing")], "startup")
            .await;
        assert!(requester.calls.lock().is_empty());
        assert!(logs_contain("request 'missing' is not defined"));
    }

    #[traced_test]
    #[tokio::test]
    async fn test_failed_request_does_not_abort_list() {
        let (executor, requester) = executor();
        let actions = vec![chained("broken", "notify"), chained("billing", "notify")];
        executor.run_actions(&actions, "/orders").await;

        assert_eq!(requester.calls.lock().len(), 2);
        assert!(logs_contain("Request /notify to service broken:9002 failed"));
        assert!(logs_contain("Request /notify to service billing:9001 successful"));
    }

    #[tokio::test]
    async fn test_delay_suspends_runner() {
        let (executor, _) = executor();
        let started = Instant::now();
        executor
            .run_actions(&[Action::Delay { seconds: 1 }], "/slow")
            .await;
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_spawned_actions_run_detached() {
        let (executor, requester) = executor();
        let handle = executor.spawn_actions(vec![chained("billing", "notify")], "/orders");
        handle.await.unwrap();
        assert_eq!(requester.calls.lock().len(), 1);
    }
}
