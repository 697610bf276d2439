use std::cell::RefCell;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use freshservice_report::ReportError;
use freshservice_report::config::{ApiKey, ServiceConfig};
use freshservice_report::source::{AssetSource, HttpAssetSource, MachineFacts};
use freshservice_report::throttle::{Sleeper, Throttle, ThrottlePolicy};

/// `Basic` credentials for API key `key` and the fixed password `X`.
const EXPECTED_AUTH: &str = "Basic a2V5Olg=";

#[derive(Clone, Default)]
struct RecordingSleeper(Rc<RefCell<Vec<Duration>>>);

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.0.borrow_mut().push(duration);
    }
}

#[derive(Debug, Clone)]
struct ReceivedRequest {
    request_line: String,
    authorization: Option<String>,
}

/// Local HTTP/1.1 server answering one connection per canned response, in
/// order, and recording what it received.
struct CannedServer {
    base_url: String,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
}

impl CannedServer {
    fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind local listener");
        let addr = listener.local_addr().expect("listener address");
        let received = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&received);

        thread::spawn(move || {
            for (status, body) in responses {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                let mut reader = BufReader::new(stream);
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    return;
                }
                let mut authorization = None;
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) if line.trim().is_empty() => break,
                        Ok(_) => {
                            if let Some((name, value)) = line.split_once(':') {
                                if name.trim().eq_ignore_ascii_case("authorization") {
                                    authorization = Some(value.trim().to_string());
                                }
                            }
                        }
                    }
                }
                log.lock().expect("request log").push(ReceivedRequest {
                    request_line: request_line.trim_end().to_string(),
                    authorization,
                });

                let mut stream = reader.into_inner();
                let response = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        Self {
            base_url: format!("http://{addr}/api/v2"),
            received,
        }
    }

    fn received(&self) -> Vec<ReceivedRequest> {
        self.received.lock().expect("request log").clone()
    }

    fn source(&self, sleeper: RecordingSleeper) -> HttpAssetSource {
        let mut config =
            ServiceConfig::with_base_url(&self.base_url, ApiKey::new("key")).expect("config");
        config.timeout = Duration::from_secs(5);
        let policy = ThrottlePolicy {
            delay: Duration::from_secs(60),
            max_retries: Some(3),
        };
        HttpAssetSource::with_throttle(config, Throttle::with_sleeper(policy, sleeper))
            .expect("client built")
    }
}

#[test]
fn asset_is_fetched_by_id_with_basic_auth() {
    let server = CannedServer::start(vec![(
        200,
        r#"{"asset":{"id":9,"display_id":143,"name":"Laptop"}}"#,
    )]);
    let source = server.source(RecordingSleeper::default());

    let asset = source.asset(143).expect("request succeeds").expect("asset present");
    assert_eq!(asset.display_id, Some(143));
    assert_eq!(asset.name.as_deref(), Some("Laptop"));

    let received = server.received();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].request_line, "GET /api/v2/assets/143 HTTP/1.1");
    assert_eq!(received[0].authorization.as_deref(), Some(EXPECTED_AUTH));
}

#[test]
fn null_or_missing_envelope_means_no_record() {
    let server = CannedServer::start(vec![(200, r#"{"asset":null}"#), (200, "{}")]);
    let source = server.source(RecordingSleeper::default());

    assert_eq!(source.asset(1).expect("null envelope"), None);
    assert_eq!(source.asset(2).expect("missing envelope"), None);
}

#[test]
fn missing_components_key_yields_an_empty_list() {
    let server = CannedServer::start(vec![(200, "{}")]);
    let source = server.source(RecordingSleeper::default());

    assert!(source.components(143).expect("request succeeds").is_empty());
    assert_eq!(
        server.received()[0].request_line,
        "GET /api/v2/assets/143/components HTTP/1.1"
    );
}

#[test]
fn secondary_lookups_hit_their_own_endpoints() {
    let server = CannedServer::start(vec![
        (200, r#"{"department":{"id":4,"name":"Finance"}}"#),
        (200, r#"{"asset_type":{"id":5,"name":"Laptop"}}"#),
        (200, r#"{"location":{"id":6,"name":"Lisbon"}}"#),
        (200, r#"{"requester":{"id":7,"first_name":"Jane","last_name":"Doe"}}"#),
    ]);
    let source = server.source(RecordingSleeper::default());

    let department = source.department(4).expect("department").expect("present");
    assert_eq!(department.name.as_deref(), Some("Finance"));
    let asset_type = source.asset_type(5).expect("asset type").expect("present");
    assert_eq!(asset_type.name.as_deref(), Some("Laptop"));
    let location = source.location(6).expect("location").expect("present");
    assert_eq!(location.name.as_deref(), Some("Lisbon"));
    let requester = source.requester(7).expect("requester").expect("present");
    assert_eq!(requester.first_name.as_deref(), Some("Jane"));

    let lines: Vec<String> = server
        .received()
        .into_iter()
        .map(|request| request.request_line)
        .collect();
    assert_eq!(
        lines,
        vec![
            "GET /api/v2/departments/4 HTTP/1.1",
            "GET /api/v2/asset_types/5 HTTP/1.1",
            "GET /api/v2/locations/6 HTTP/1.1",
            "GET /api/v2/requesters/7 HTTP/1.1",
        ]
    );
}

#[test]
fn machine_facts_filter_by_asset_name_and_include_type_fields() {
    let server = CannedServer::start(vec![(
        200,
        r#"{"assets":[{"type_fields":{"os_23001176139":"Windows 11","computer_ip_address_23001176139":null}}]}"#,
    )]);
    let source = server.source(RecordingSleeper::default());

    let facts = source.machine_facts(143).expect("request succeeds");
    assert_eq!(
        facts,
        Some(MachineFacts {
            system_os: Some("Windows 11".to_string()),
            machine_ip: None,
        })
    );

    let received = server.received();
    let line = &received[0].request_line;
    assert!(line.starts_with("GET /api/v2/assets?"), "{line}");
    assert!(line.contains("include=type_fields"), "{line}");
    assert!(line.contains("filter=%22name%3A%27ASSET-143%27%22"), "{line}");
}

#[test]
fn requester_search_and_user_assets_send_their_queries() {
    let server = CannedServer::start(vec![
        (200, r#"{"requesters":[{"id":7,"first_name":"Jane","last_name":"Doe"}]}"#),
        (200, r#"{"assets":[{"display_id":143,"name":"Laptop"},{"display_id":150}]}"#),
    ]);
    let source = server.source(RecordingSleeper::default());

    let requester = source
        .find_requester("Jane", "Doe")
        .expect("search succeeds")
        .expect("requester found");
    assert_eq!(requester.id, Some(7));
    let assets = source.assets_for_user(7).expect("listing succeeds");
    assert_eq!(assets.len(), 2);

    let received = server.received();
    assert!(
        received[0]
            .request_line
            .contains("/api/v2/requesters?query=%22first_name%3A%27Jane%27+AND+last_name%3A%27Doe%27%22"),
        "{}",
        received[0].request_line
    );
    assert!(
        received[1]
            .request_line
            .contains("/api/v2/assets?query=%22user_id%3A7%22"),
        "{}",
        received[1].request_line
    );
}

#[test]
fn rate_limit_response_sleeps_once_and_retries() {
    let server = CannedServer::start(vec![
        (429, "{}"),
        (200, r#"{"asset":{"display_id":143}}"#),
    ]);
    let sleeper = RecordingSleeper::default();
    let source = server.source(sleeper.clone());

    let asset = source.asset(143).expect("retry succeeds").expect("asset present");
    assert_eq!(asset.display_id, Some(143));
    assert_eq!(*sleeper.0.borrow(), vec![Duration::from_secs(60)]);
    assert_eq!(server.received().len(), 2);
}

#[test]
fn error_status_is_reported_with_the_url() {
    let server = CannedServer::start(vec![(404, r#"{"message":"not found"}"#)]);
    let sleeper = RecordingSleeper::default();
    let source = server.source(sleeper.clone());

    match source.asset(999) {
        Err(ReportError::Status { status, url }) => {
            assert_eq!(status, 404);
            assert!(url.ends_with("/api/v2/assets/999"), "{url}");
        }
        other => panic!("expected a status error, got {other:?}"),
    }
    assert!(sleeper.0.borrow().is_empty());
}
