//! ---
//! ens_section: "05-external-interfaces"
//! ens_subsection: "integration-tests"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Supervisor client against an in-process XML-RPC endpoint."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::net::SocketAddr;

use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::post;
use axum::Router;
use ensemble_supervisor::{ProcessState, SupervisorClient, SupervisorError, SupervisorState};
use tokio::net::TcpListener;

const ALL_PROCESSES: &str = r#"<?xml version="1.0"?>
<methodResponse><params><param><value><array><data>
<value><struct>
<member><name>name</name><value><string>x11</string></value></member>
<member><name>group</name><value><string>x11</string></value></member>
<member><name>description</name><value><string>pid 7, uptime 0:01:00</string></value></member>
<member><name>start</name><value><int>1700000000</int></value></member>
<member><name>stop</name><value><int>0</int></value></member>
<member><name>now</name><value><int>1700000060</int></value></member>
<member><name>state</name><value><int>20</int></value></member>
<member><name>statename</name><value><string>RUNNING</string></value></member>
<member><name>stdout_logfile</name><value><string>/var/log/x11.log</string></value></member>
<member><name>stderr_logfile</name><value><string></string></value></member>
<member><name>spawnerr</name><value><string></string></value></member>
<member><name>exitstatus</name><value><int>0</int></value></member>
<member><name>pid</name><value><int>7</int></value></member>
</struct></value>
<value><struct>
<member><name>name</name><value><string>vnc</string></value></member>
<member><name>group</name><value><string>vnc</string></value></member>
<member><name>state</name><value><int>30</int></value></member>
<member><name>statename</name><value><string>BACKOFF</string></value></member>
<member><name>spawnerr</name><value><string>Exited too quickly</string></value></member>
</struct></value>
</data></array></value></param></params></methodResponse>"#;

fn respond(value_xml: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?><methodResponse><params><param><value>{value_xml}</value></param></params></methodResponse>"
    )
}

async fn rpc(body: String) -> impl IntoResponse {
    let xml = if body.contains("supervisor.getAPIVersion") {
        respond("<string>3.0</string>")
    } else if body.contains("supervisor.getSupervisorVersion") {
        respond("4.2.5")
    } else if body.contains("supervisor.getState") {
        respond(
            "<struct><member><name>statecode</name><value><int>1</int></value></member>\
             <member><name>statename</name><value><string>RUNNING</string></value></member></struct>",
        )
    } else if body.contains("supervisor.getAllProcessInfo") {
        ALL_PROCESSES.to_owned()
    } else if body.contains("<string>missing</string>") {
        "<?xml version=\"1.0\"?><methodResponse><fault><value><struct>\
         <member><name>faultCode</name><value><int>10</int></value></member>\
         <member><name>faultString</name><value><string>BAD_NAME: missing</string></value></member>\
         </struct></value></fault></methodResponse>"
            .to_owned()
    } else {
        return (StatusCode::NOT_FOUND, "unknown method").into_response();
    };
    ([(header::CONTENT_TYPE, "text/xml")], xml).into_response()
}

async fn spawn_mock() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/RPC2", post(rpc));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn queries_versions_and_state() {
    let addr = spawn_mock().await;
    let client = SupervisorClient::new(&addr.ip().to_string(), addr.port()).unwrap();

    assert_eq!(client.get_api_version().await.unwrap(), "3.0");
    assert_eq!(client.get_supervisor_version().await.unwrap(), "4.2.5");
    assert_eq!(client.get_state().await.unwrap(), SupervisorState::Running);
}

#[tokio::test]
async fn lists_all_processes() {
    let addr = spawn_mock().await;
    let client = SupervisorClient::new(&addr.ip().to_string(), addr.port()).unwrap();

    let processes = client.get_all_process_info().await.unwrap();
    assert_eq!(processes.len(), 2);
    assert_eq!(processes[0].name, "x11");
    assert_eq!(processes[0].state, ProcessState::Running);
    assert_eq!(processes[0].stdout_logfile, "/var/log/x11.log");
    assert_eq!(processes[1].state, ProcessState::Backoff);
    assert_eq!(processes[1].spawn_error, "Exited too quickly");
}

#[tokio::test]
async fn fault_for_unknown_process() {
    let addr = spawn_mock().await;
    let client = SupervisorClient::new(&addr.ip().to_string(), addr.port()).unwrap();

    match client.get_process_info("missing").await {
        Err(SupervisorError::Fault { code, message }) => {
            assert_eq!(code, 10);
            assert!(message.starts_with("BAD_NAME"));
        }
        other => panic!("expected fault, got {other:?}"),
    }
}

#[tokio::test]
async fn non_success_status_is_reported() {
    let addr = spawn_mock().await;
    let client = SupervisorClient::new(&addr.ip().to_string(), addr.port()).unwrap();

    // Unknown methods are answered with 404 by the mock.
    match client.get_process_info("other").await {
        Err(err @ SupervisorError::Http { status: 404 }) => assert!(err.is_transport()),
        other => panic!("expected HTTP error, got {other:?}"),
    }
}

#[tokio::test]
async fn connection_refused_is_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = SupervisorClient::new("127.0.0.1", port).unwrap();
    let err = client.get_state().await.unwrap_err();
    assert!(matches!(err, SupervisorError::Transport(_)));
}
