//! ---
//! ens_section: "11-testing"
//! ens_subsection: "integration-tests"
//! ens_type: "source"
//! ens_scope: "code"
//! ens_description: "Gateway ensemble with fixtures against local protocol doubles."
//! ens_version: "v0.1.0"
//! ens_owner: "tbd"
//! ---
use std::time::Duration;

use axum::routing::get;
use axum::Router;
use ensemble_common::{HarnessConfig, WaitDefaults};
use ensemble_fixtures::gateway::{GUAC_PROXY, GUAC_SERVER};
use ensemble_fixtures::guacamole::GUACAMOLE_HTTP_PORT;
use ensemble_fixtures::telnet::{TELNET_PORT, TELNET_PROMPT};
use ensemble_fixtures::vnc::{VNC_PORT, VNC_PROCESSES, VNC_SUPERVISOR_PORT};
use ensemble_fixtures::{
    gateway_ensemble, telnet_server_fixture, vnc_server, vnc_server_fixture, vnc_server_ready,
};
use ensemble_orchestrator::{
    ConfigurationError, Ensemble, EnsembleId, NetworkProvider,
};
use ensemble_runtime::{GenericContainer, GenericNetwork, Network, ResourceError, Service};
use ensemble_supervisor::{ProcessState, SupervisorState};
use ensemble_testharness::{CallLog, MockSupervisor, PromptServer, RecordingRuntime};
use ensemble_wait::WaitError;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

async fn gateway_http() -> (u16, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let app = Router::new().route("/guacamole", get(|| async { "Apache Guacamole" }));
    let task = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (port, task)
}

async fn desktop_supervisor(backing_off: Option<&str>) -> MockSupervisor {
    let supervisor = MockSupervisor::spawn().await.unwrap();
    supervisor.set_state(SupervisorState::Running);
    for process in VNC_PROCESSES {
        let state = if backing_off == Some(process) {
            ProcessState::Backoff
        } else {
            ProcessState::Running
        };
        supervisor.set_process("desktop", process, state);
    }
    supervisor
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn gateway_with_fixtures_starts_in_order_and_tears_down_in_reverse() {
    let (http_port, http_task) = gateway_http().await;
    let vnc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let supervisor = desktop_supervisor(None).await;
    let telnet = PromptServer::spawn(format!("BusyBox telnetd\r\n{TELNET_PROMPT}")).await.unwrap();

    let log = CallLog::new();
    let runtime = RecordingRuntime::new(&log);
    runtime
        .publish(GUACAMOLE_HTTP_PORT, http_port)
        .publish(VNC_PORT, vnc.local_addr().unwrap().port())
        .publish(VNC_SUPERVISOR_PORT, supervisor.port())
        .publish(TELNET_PORT, telnet.port());

    let mut config = HarnessConfig::default();
    config.ensemble.id = Some("it".into());
    config.wait = WaitDefaults {
        poll_interval: Duration::from_millis(50),
        startup_timeout: Duration::from_secs(10),
    };
    let mut started = gateway_ensemble(&config, runtime.shared())
        .with_fixture_services(vnc_server_fixture(runtime.shared(), &config))
        .with_fixture_services(telnet_server_fixture(runtime.shared(), &config))
        .start(None)
        .await
        .unwrap();

    assert_eq!(started.id().as_str(), "it");
    assert_eq!(
        started.services().names(),
        vec![GUAC_PROXY, GUAC_SERVER, "vnc-server", "telnet-server"]
    );
    let desktop = started.service("vnc-server").unwrap();
    assert_eq!(desktop.mapped_port(VNC_SUPERVISOR_PORT), Some(supervisor.port()));
    assert_eq!(desktop.network_names(), ["fixtures-it"]);

    let proxy = runtime.container("guac-proxy-it").unwrap();
    assert_eq!(proxy.networks(), ["guacamole-it", "fixtures-it"]);
    assert_eq!(proxy.network_aliases(), ["guac-proxy"]);
    let client = runtime.container("guac-server-it").unwrap();
    assert_eq!(client.networks(), ["guacamole-it", "ingress-it"]);
    for name in ["guac-proxy-it", "guac-server-it", "vnc-server-it", "telnet-server-it"] {
        let spec = runtime.container(name).unwrap();
        assert_eq!(spec.startup_timeout(), Duration::from_secs(10), "{name}");
        assert_eq!(
            spec.wait_strategy().retry_interval(),
            Some(Duration::from_millis(50)),
            "{name}"
        );
    }

    assert!(supervisor.calls().iter().any(|call| call == "supervisor.getAllProcessInfo"));
    assert!(telnet.connections() >= 1);

    started.stop().await.unwrap();
    assert!(!started.is_started());
    assert!(runtime.containers().is_empty());
    assert!(runtime.networks().is_empty());
    assert_eq!(
        log.entries(),
        vec![
            "create-network guacamole-it",
            "create-network ingress-it",
            "create-network fixtures-it",
            "run guac-proxy-it",
            "run guac-server-it",
            "run vnc-server-it",
            "run telnet-server-it",
            "stop telnet-server-it",
            "stop vnc-server-it",
            "stop guac-server-it",
            "stop guac-proxy-it",
            "remove-network fixtures-it",
            "remove-network ingress-it",
            "remove-network guacamole-it",
        ]
    );
    http_task.abort();
}

#[tokio::test]
async fn unready_desktop_is_stopped_and_reported() {
    let vnc = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let supervisor = desktop_supervisor(Some("x11vnc")).await;
    let log = CallLog::new();
    let runtime = RecordingRuntime::new(&log);
    runtime
        .publish(VNC_PORT, vnc.local_addr().unwrap().port())
        .publish(VNC_SUPERVISOR_PORT, supervisor.port());

    let spec = vnc_server("vnc-server:test")
        .with_name("vnc-flaky")
        .with_exposed_ports([VNC_PORT, VNC_SUPERVISOR_PORT])
        .with_wait_strategy(
            vnc_server_ready()
                .unwrap()
                .with_retry_interval(Duration::from_millis(50)),
        )
        .with_startup_timeout(Duration::from_millis(400));
    let err = Box::new(GenericContainer::new(spec, runtime.shared()))
        .start()
        .await
        .unwrap_err();

    match &err {
        ResourceError::Wait(WaitError::Timeout {
            strategy,
            last_error,
            ..
        }) => {
            assert_eq!(*strategy, "supervisor-processes");
            assert_eq!(
                last_error.as_ref().map(ToString::to_string).as_deref(),
                Some("process x11vnc is BACKOFF")
            );
        }
        other => panic!("expected a readiness timeout, got {other:?}"),
    }
    assert_eq!(log.entries(), vec!["run vnc-flaky", "stop vnc-flaky"]);
    assert!(runtime.containers().is_empty());
}

#[tokio::test]
async fn fixtures_need_the_fixture_network() {
    let log = CallLog::new();
    let runtime = RecordingRuntime::new(&log);
    let shared = runtime.shared();
    let err = Ensemble::new()
        .with_networks(NetworkProvider::single(move |id: &EnsembleId| {
            let network: Box<dyn Network> =
                Box::new(GenericNetwork::new(id.scoped("ingress"), shared.clone()));
            Ok(("ingress".to_owned(), network))
        }))
        .with_fixture_services(telnet_server_fixture(runtime.shared(), &HarnessConfig::default()))
        .start(Some(EnsembleId::new("nofix")))
        .await
        .unwrap_err();

    assert_eq!(
        err.as_configuration(),
        Some(&ConfigurationError::MissingNetwork {
            name: "fixtures".into()
        })
    );
    assert_eq!(log.entries(), vec!["create-network ingress-nofix"]);

    let mut partial = err.into_partial().unwrap();
    partial.stop().await.unwrap();
    assert_eq!(
        log.entries(),
        vec!["create-network ingress-nofix", "remove-network ingress-nofix"]
    );
    assert!(runtime.networks().is_empty());
}
