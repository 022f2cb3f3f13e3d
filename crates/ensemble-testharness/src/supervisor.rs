//! ---
//! ens_section: "11-testing"
//! ens_subsection: "module"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "In-process process supervisor double."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use ensemble_supervisor::xmlrpc::{decode_call, encode_fault, encode_response};
use ensemble_supervisor::{ProcessState, SupervisorState, Value};
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::debug;

/// Fault code a supervisor uses for an unknown process name.
pub const BAD_NAME: i64 = 10;
/// Fault code a supervisor uses for an unknown method.
pub const UNKNOWN_METHOD: i64 = 1;

#[derive(Debug)]
struct MockState {
    state: SupervisorState,
    processes: IndexMap<String, (String, ProcessState)>,
    calls: Vec<String>,
}

/// XML-RPC supervisor served over HTTP on a local ephemeral port.
///
/// State and process table are scripted by the test; every call is recorded by
/// method name.
#[derive(Debug)]
pub struct MockSupervisor {
    addr: SocketAddr,
    state: Arc<Mutex<MockState>>,
    task: JoinHandle<()>,
}

impl MockSupervisor {
    /// Start serving `POST /RPC2` on `127.0.0.1`, initially in `RESTARTING` state
    /// with an empty process table.
    pub async fn spawn() -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(MockState {
            state: SupervisorState::Restarting,
            processes: IndexMap::new(),
            calls: Vec::new(),
        }));
        let app = Router::new()
            .route("/RPC2", post(handle_rpc))
            .with_state(state.clone());
        let task = tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                debug!(error = %err, "mock supervisor stopped");
            }
        });
        Ok(Self { addr, state, task })
    }

    /// Port the mock listens on.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Set the state reported by `getState`.
    pub fn set_state(&self, state: SupervisorState) {
        self.state.lock().state = state;
    }

    /// Add or update a process in group `group`.
    pub fn set_process(&self, group: &str, name: &str, state: ProcessState) {
        self.state
            .lock()
            .processes
            .insert(name.to_owned(), (group.to_owned(), state));
    }

    /// Method names received so far.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }
}

impl Drop for MockSupervisor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn handle_rpc(State(state): State<Arc<Mutex<MockState>>>, body: String) -> impl IntoResponse {
    let xml = match decode_call(&body) {
        Ok((method, params)) => respond(&state, &method, &params),
        Err(err) => encode_fault(UNKNOWN_METHOD, &err.to_string()),
    };
    ([(header::CONTENT_TYPE, "text/xml")], xml)
}

fn respond(state: &Mutex<MockState>, method: &str, params: &[Value]) -> String {
    let mut state = state.lock();
    state.calls.push(method.to_owned());
    match method {
        "supervisor.getAPIVersion" => encode_response(&Value::from("3.0")),
        "supervisor.getSupervisorVersion" => encode_response(&Value::from("4.2.5")),
        "supervisor.getState" => {
            let mut members = IndexMap::new();
            members.insert("statecode".to_owned(), Value::Int(state.state.code()));
            members.insert("statename".to_owned(), Value::from(state.state.to_string()));
            encode_response(&Value::Struct(members))
        }
        "supervisor.getAllProcessInfo" => {
            let items = state
                .processes
                .iter()
                .map(|(name, (group, process))| process_value(name, group, *process))
                .collect();
            encode_response(&Value::Array(items))
        }
        "supervisor.getProcessInfo" => {
            let requested = params.first().and_then(Value::as_str).unwrap_or_default();
            let bare = requested.rsplit(':').next().unwrap_or(requested);
            match state.processes.get(bare) {
                Some((group, process)) => encode_response(&process_value(bare, group, *process)),
                None => encode_fault(BAD_NAME, &format!("BAD_NAME: {requested}")),
            }
        }
        other => encode_fault(UNKNOWN_METHOD, &format!("UNKNOWN_METHOD: {other}")),
    }
}

fn process_value(name: &str, group: &str, state: ProcessState) -> Value {
    let running = state == ProcessState::Running;
    let mut members = IndexMap::new();
    members.insert("name".to_owned(), Value::from(name));
    members.insert("group".to_owned(), Value::from(group));
    members.insert("description".to_owned(), Value::from(""));
    members.insert("start".to_owned(), Value::Int(if running { 1_700_000_000 } else { 0 }));
    members.insert("stop".to_owned(), Value::Int(0));
    members.insert("now".to_owned(), Value::Int(1_700_000_030));
    members.insert("state".to_owned(), Value::Int(state.code()));
    members.insert("statename".to_owned(), Value::from(state.to_string()));
    members.insert("spawnerr".to_owned(), Value::from(""));
    members.insert("exitstatus".to_owned(), Value::Int(0));
    members.insert("pid".to_owned(), Value::Int(if running { 4242 } else { 0 }));
    Value::Struct(members)
}
