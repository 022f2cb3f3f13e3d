//! ---
//! ens_section: "05-external-interfaces"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Remote process supervisor client."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use ensemble_common::SupervisorConfig;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;
use url::Url;

use crate::error::SupervisorError;
use crate::types::{ProcessInfo, SupervisorState};
use crate::xmlrpc::{decode_response, encode_call, Value};

/// Request/response client for a supervisor's XML-RPC endpoint.
#[derive(Debug, Clone)]
pub struct SupervisorClient {
    endpoint: Url,
    http: reqwest::Client,
}

impl SupervisorClient {
    /// Client for `http://host:port/RPC2` with default settings.
    pub fn new(host: &str, port: u16) -> Result<Self, SupervisorError> {
        Self::with_config(host, port, &SupervisorConfig::default())
    }

    /// Client using the RPC path and request timeout from `config`.
    pub fn with_config(
        host: &str,
        port: u16,
        config: &SupervisorConfig,
    ) -> Result<Self, SupervisorError> {
        let endpoint = Url::parse(&format!("http://{host}:{port}"))?.join(&config.rpc_path)?;
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;
        Ok(Self { endpoint, http })
    }

    /// Endpoint the client posts to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Version of the RPC API used by the supervisor.
    pub async fn get_api_version(&self) -> Result<String, SupervisorError> {
        let value = self.call("supervisor.getAPIVersion", &[]).await?;
        expect_string(value, "getAPIVersion")
    }

    /// Version of the supervisor package.
    pub async fn get_supervisor_version(&self) -> Result<String, SupervisorError> {
        let value = self.call("supervisor.getSupervisorVersion", &[]).await?;
        expect_string(value, "getSupervisorVersion")
    }

    /// Current operational state of the supervisor itself.
    pub async fn get_state(&self) -> Result<SupervisorState, SupervisorError> {
        let value = self.call("supervisor.getState", &[]).await?;
        SupervisorState::from_value(&value)
    }

    /// Info about one process, addressed as `name` or `group:name`.
    pub async fn get_process_info(&self, name: &str) -> Result<ProcessInfo, SupervisorError> {
        let value = self
            .call("supervisor.getProcessInfo", &[Value::from(name)])
            .await?;
        ProcessInfo::from_value(&value)
    }

    /// Info about every process; empty when the process table is empty.
    pub async fn get_all_process_info(&self) -> Result<Vec<ProcessInfo>, SupervisorError> {
        let value = self.call("supervisor.getAllProcessInfo", &[]).await?;
        let items = value
            .as_array()
            .ok_or_else(|| SupervisorError::protocol("getAllProcessInfo did not return an array"))?;
        items.iter().map(ProcessInfo::from_value).collect()
    }

    async fn call(&self, method: &str, params: &[Value]) -> Result<Value, SupervisorError> {
        debug!(endpoint = %self.endpoint, method, "supervisor rpc call");
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, "text/xml")
            .body(encode_call(method, params))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SupervisorError::Http {
                status: status.as_u16(),
            });
        }
        let body = response.text().await?;
        decode_response(&body)
    }
}

fn expect_string(value: Value, method: &str) -> Result<String, SupervisorError> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(SupervisorError::protocol(format!(
            "{method} returned {other:?} instead of a string"
        ))),
    }
}
