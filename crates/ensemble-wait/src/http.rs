//! ---
//! ens_section: "07-readiness"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Readiness probes and wait strategies."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::time::Duration;

use async_trait::async_trait;
use ensemble_retry::IntervalRetry;

use crate::error::{AttemptError, WaitError};
use crate::target::WaitTarget;
use crate::{poll_until_ready, ReadinessProbe};

/// Ready once `GET http://host:<bound port><path>` answers with the expected status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpWait {
    path: String,
    port: u16,
    expected_status: u16,
    retry: IntervalRetry,
}

impl HttpWait {
    /// Probe `path` on the host port bound to container `port`, expecting 200.
    pub fn new(path: impl Into<String>, port: u16) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        Self {
            path,
            port,
            expected_status: 200,
            retry: IntervalRetry::default(),
        }
    }

    /// Status code that marks the resource as ready.
    pub fn with_expected_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    /// Interval between two attempts.
    pub fn retry_interval(&self) -> Duration {
        self.retry.interval()
    }

    /// Override the polling interval. Each request is bounded by the same interval.
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry = IntervalRetry::new(interval);
        self
    }

    /// Request path, always starting with `/`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Container port the request is sent to.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Status code expected from the resource.
    pub fn expected_status(&self) -> u16 {
        self.expected_status
    }
}

#[async_trait]
impl ReadinessProbe for HttpWait {
    fn strategy_name(&self) -> &'static str {
        "http"
    }

    async fn wait_until_ready(
        &self,
        target: &WaitTarget,
        startup_timeout: Duration,
    ) -> Result<(), WaitError> {
        let host_port = target.ports().require(self.port)?;
        let url = format!("http://{}:{host_port}{}", target.host(), self.path);
        let client = reqwest::Client::builder()
            .timeout(self.retry.interval())
            .build()
            .map_err(|err| WaitError::Configuration(format!("http client: {err}")))?;
        let expected = self.expected_status;

        poll_until_ready(
            &self.retry,
            target,
            self.strategy_name(),
            startup_timeout,
            || {
                let request = client.get(&url).send();
                async move {
                    let status = request.await?.status().as_u16();
                    if status == expected {
                        Ok::<(), AttemptError>(())
                    } else {
                        Err(format!("status {status}, expected {expected}").into())
                    }
                }
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::BoundPorts;
    use axum::http::StatusCode;
    use axum::routing::get;
    use axum::Router;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::net::TcpListener;

    async fn spawn(app: Router) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    #[test]
    fn path_is_normalised() {
        let wait = HttpWait::new("guacamole", 8080);
        assert_eq!(wait.path(), "/guacamole");
        assert_eq!(wait.port(), 8080);
        assert_eq!(wait.expected_status(), 200);
    }

    #[tokio::test]
    async fn ready_once_status_matches() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let app = Router::new().route(
            "/guacamole",
            get(move || {
                let counter = counter.clone();
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        StatusCode::SERVICE_UNAVAILABLE
                    } else {
                        StatusCode::OK
                    }
                }
            }),
        );
        let addr = spawn(app).await;
        let target = WaitTarget::new(
            "guac-server",
            "127.0.0.1",
            BoundPorts::new().with(8080, addr.port()),
        );

        HttpWait::new("/guacamole", 8080)
            .with_retry_interval(Duration::from_millis(100))
            .wait_until_ready(&target, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(hits.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn wrong_status_times_out_with_last_error() {
        let app = Router::new().route("/health", get(|| async { StatusCode::NO_CONTENT }));
        let addr = spawn(app).await;
        let target = WaitTarget::new("api", "127.0.0.1", BoundPorts::new().with(80, addr.port()));

        let err = HttpWait::new("/health", 80)
            .with_retry_interval(Duration::from_millis(100))
            .wait_until_ready(&target, Duration::from_millis(350))
            .await
            .unwrap_err();
        match err {
            WaitError::Timeout { last_error, .. } => {
                assert_eq!(
                    last_error.map(|err| err.to_string()).as_deref(),
                    Some("status 204, expected 200")
                );
            }
            other => panic!("expected timeout, got {other:?}"),
        }

        HttpWait::new("/health", 80)
            .with_expected_status(204)
            .wait_until_ready(&target, Duration::from_secs(1))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unbound_port_is_reported() {
        let target = WaitTarget::new("api", "127.0.0.1", BoundPorts::new());
        let err = HttpWait::new("/", 8080)
            .wait_until_ready(&target, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, WaitError::MissingPort { port: 8080 }));
    }
}
