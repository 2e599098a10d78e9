use painel_chamados::alert::{AlertEvent, Direction};
use painel_chamados::client::ApiClient;
use painel_chamados::config::Config;
use painel_chamados::controller::MetricsController;
use painel_chamados::error::ErrorKind;
use painel_chamados::scheduler::PollOutcome;
use painel_chamados::session::MemorySession;
use painel_chamados::types::ConnectionStatus;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn open_tickets(n: usize) -> Value {
    let list: Vec<Value> = (0..n)
        .map(|i| json!({"status": "aberto", "responsavel": format!("Técnico {}", i % 3)}))
        .collect();
    json!({ "chamados": list })
}

async fn respond_once(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/chamados"))
        .respond_with(template)
        .up_to_n_times(1)
        .mount(server)
        .await;
}

fn controller_for(server: &MockServer) -> (MetricsController, mpsc::UnboundedReceiver<AlertEvent>) {
    let config: Config = Config::defaults()
        .unwrap()
        .set_override("api_url", server.uri())
        .unwrap()
        .build()
        .unwrap()
        .try_deserialize()
        .unwrap();
    let client = Arc::new(ApiClient::new(&config, Arc::new(MemorySession::new())).unwrap());
    let (tx, rx) = mpsc::unbounded_channel();
    let controller =
        MetricsController::new(client, tx, Duration::from_secs(300), CancellationToken::new());
    (controller, rx)
}

#[tokio::test]
async fn open_count_change_alerts_once_across_real_http_polls() {
    let server = MockServer::start().await;
    respond_once(&server, ResponseTemplate::new(200).set_body_json(open_tickets(10))).await;
    respond_once(&server, ResponseTemplate::new(200).set_body_json(open_tickets(14))).await;
    respond_once(&server, ResponseTemplate::new(200).set_body_json(open_tickets(14))).await;

    let (controller, mut rx) = controller_for(&server);

    assert_eq!(controller.poll().await, PollOutcome::Updated { alerts: 0 });
    assert_eq!(controller.poll().await, PollOutcome::Updated { alerts: 1 });
    assert_eq!(controller.poll().await, PollOutcome::Updated { alerts: 0 });

    assert_eq!(
        rx.try_recv().unwrap(),
        AlertEvent::OpenCountChanged {
            previous: 10,
            current: 14,
            direction: Direction::Increase,
        }
    );
    assert!(rx.try_recv().is_err());

    let metrics = controller.view().metrics.unwrap();
    let sum: u64 = metrics.by_responsible.iter().map(|r| r.tickets).sum();
    assert_eq!(sum, 14);
}

#[tokio::test]
async fn html_error_page_disconnects_without_touching_snapshot() {
    let server = MockServer::start().await;
    respond_once(&server, ResponseTemplate::new(200).set_body_json(open_tickets(2))).await;
    respond_once(
        &server,
        ResponseTemplate::new(200).set_body_raw("<html>proxy</html>", "text/html"),
    )
    .await;
    respond_once(&server, ResponseTemplate::new(200).set_body_json(open_tickets(1))).await;

    let (controller, mut rx) = controller_for(&server);

    controller.poll().await;
    assert_eq!(
        controller.poll().await,
        PollOutcome::Failed(ErrorKind::Malformed)
    );
    assert_eq!(controller.view().status, ConnectionStatus::Disconnected);
    assert!(rx.try_recv().is_err());

    assert_eq!(controller.poll().await, PollOutcome::Updated { alerts: 1 });
    assert!(matches!(
        rx.try_recv().unwrap(),
        AlertEvent::OpenCountChanged { previous: 2, current: 1, direction: Direction::Decrease }
    ));
    assert_eq!(controller.view().status, ConnectionStatus::Connected);
}
