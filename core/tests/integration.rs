//! End-to-end tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises the client over
//! real HTTP through the default reqwest transport: echo round-trips for
//! query, form, JSON, headers and cookies, plus the gzip, status, repeated
//! header, redirect and download fixtures. Proxying is checked against a
//! plain TCP listener that records the request head it receives.

use std::io::{BufRead, BufReader, Write};
use std::net::SocketAddr;
use std::sync::mpsc;

use httpwrap_core::{Client, ClientConfig, ClientError, HeaderValue, IoOp, Session};
use mock_server::{payload, Echo};
use serde_json::json;

fn start_server() -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    addr
}

fn base() -> String {
    format!("http://{}", start_server())
}

/// Accepts one connection, records the request head and answers `proxied`.
fn recording_proxy() -> (SocketAddr, mpsc::Receiver<Vec<String>>) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::channel();

    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut head = Vec::new();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 {
                break;
            }
            let line = line.trim_end().to_string();
            if line.is_empty() {
                break;
            }
            head.push(line);
        }
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 7\r\nConnection: close\r\n\r\nproxied")
            .unwrap();
        tx.send(head).unwrap();
    });

    (addr, rx)
}

#[test]
fn get_reports_status_and_query() {
    let base = base();
    let client = Client::new();

    let response = client
        .get(&format!("{base}/echo?z=2"), &json!({"a": 1}))
        .send()
        .unwrap();

    assert_eq!(response.status_code(), Some(200));
    let echo: Echo = response.json().unwrap();
    assert_eq!(echo.method, "GET");
    assert_eq!(echo.uri, "/echo?z=2&a=1");
    assert_eq!(echo.headers.get("host"), Some(&base.trim_start_matches("http://").to_string()));
}

#[test]
fn post_sends_nested_form_data() {
    let base = base();
    let client = Client::new();

    let response = client
        .post(&format!("{base}/echo"), &json!({"test": {"data": 123, "message": "OK"}}))
        .send()
        .unwrap();

    let echo: Echo = response.json().unwrap();
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.form.get("test[message]").map(String::as_str), Some("OK"));
    assert_eq!(echo.form.get("test[data]").map(String::as_str), Some("123"));
    assert_eq!(
        echo.headers.get("content-type").map(String::as_str),
        Some("application/x-www-form-urlencoded")
    );
}

#[test]
fn json_mode_posts_json_text() {
    let base = base();
    let client = Client::new();
    let data = json!({"test": {"data": 123, "message": "OK"}});

    let response = client.post(&format!("{base}/echo"), &data).json(true).send().unwrap();

    let echo: Echo = response.json().unwrap();
    assert_eq!(echo.input, serde_json::to_string(&data).unwrap());
    assert!(echo.form.is_empty());
    assert_eq!(echo.headers.get("content-type").map(String::as_str), Some("application/json"));
}

#[test]
fn put_and_delete_use_their_methods() {
    let base = base();
    let client = Client::new();

    let echo: Echo = client
        .put(&format!("{base}/echo"), &[("k", "v")])
        .send()
        .unwrap()
        .json()
        .unwrap();
    assert_eq!(echo.method, "PUT");
    assert_eq!(echo.input, "k=v");

    let echo: Echo = client.delete(&format!("{base}/echo")).send().unwrap().json().unwrap();
    assert_eq!(echo.method, "DELETE");
    assert!(echo.input.is_empty());
}

#[test]
fn custom_headers_reach_the_server() {
    let base = base();
    let config = ClientConfig {
        default_headers: vec![("User-Agent".to_string(), "httpwrap-test".to_string())],
        ..ClientConfig::default()
    };
    let client = Client::with_config(config);

    let echo: Echo = client
        .get(&format!("{base}/echo"), &())
        .header("TEST", "OK")
        .send()
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(echo.headers.get("test").map(String::as_str), Some("OK"));
    assert_eq!(echo.headers.get("user-agent").map(String::as_str), Some("httpwrap-test"));
}

#[test]
fn cookies_are_sent_and_parsed_back() {
    let base = base();
    let client = Client::new();

    let response = client
        .get(&format!("{base}/echo"), &())
        .cookies([("test", "OK"), ("test1", "1")])
        .send()
        .unwrap();

    let echo: Echo = response.json().unwrap();
    assert_eq!(echo.cookies.get("test").map(String::as_str), Some("OK"));
    assert_eq!(echo.cookies.get("test1").map(String::as_str), Some("1"));
    assert_eq!(response.cookie("test").and_then(HeaderValue::as_str), Some("OK"));
    assert_eq!(response.cookie("test1").and_then(HeaderValue::as_str), Some("1"));
}

#[test]
fn gzip_body_is_decoded_on_demand() {
    let base = base();
    let client = Client::new();

    let response = client
        .get(&format!("{base}/gzip"), &json!({"text": "squeezed text"}))
        .send()
        .unwrap();

    assert_eq!(response.header("Content-Encoding").and_then(HeaderValue::as_str), Some("gzip"));
    assert_eq!(response.text().unwrap(), "squeezed text");
    assert_ne!(response.raw_body(), b"squeezed text");
}

#[test]
fn error_status_is_returned_as_response() {
    let base = base();
    let client = Client::new();

    let response = client.get(&format!("{base}/status/404"), &()).send().unwrap();
    assert_eq!(response.status_code(), Some(404));
    assert_eq!(response.text().unwrap(), "status 404");

    let err = client
        .get(&format!("{base}/status/503"), &())
        .ignore_errors(false)
        .send()
        .unwrap_err();
    assert!(matches!(err, ClientError::HttpStatus { status: 503, .. }));
}

#[test]
fn repeated_headers_and_cookies_fold() {
    let base = base();
    let client = Client::new();

    let response = client.get(&format!("{base}/repeat"), &()).send().unwrap();

    assert_eq!(response.header("X-Multi"), Some(&HeaderValue::from(vec!["one", "two"])));
    assert_eq!(response.cookie("id"), Some(&HeaderValue::from(vec!["1", "2"])));
    assert!(response.raw_headers()[0].starts_with("HTTP/1.1 200"));
}

#[test]
fn redirects_follow_unless_disabled() {
    let base = base();
    let client = Client::new();

    let followed = client.get(&format!("{base}/redirect"), &()).send().unwrap();
    assert_eq!(followed.status_code(), Some(200));
    let echo: Echo = followed.json().unwrap();
    assert_eq!(echo.uri, "/echo");

    let stopped = client
        .get(&format!("{base}/redirect"), &())
        .follow_location(false)
        .send()
        .unwrap();
    assert_eq!(stopped.status_code(), Some(302));
    assert_eq!(stopped.header("Location").and_then(HeaderValue::as_str), Some("/echo"));
    assert_eq!(stopped.cookie("hop").and_then(HeaderValue::as_str), Some("1"));
}

#[test]
fn cross_host_redirect_gets_the_new_host() {
    let first = base();
    let second = start_server();
    let target = format!("http://localhost:{}/echo", second.port());
    let client = Client::new();

    let response = client
        .get(&format!("{first}/redirect-to"), &json!({"url": target}))
        .send()
        .unwrap();

    assert_eq!(response.status_code(), Some(200));
    let echo: Echo = response.json().unwrap();
    assert_eq!(echo.headers.get("host"), Some(&format!("localhost:{}", second.port())));
}

#[test]
fn explicit_host_header_is_sent() {
    let base = base();
    let client = Client::new();

    let echo: Echo = client
        .get(&format!("{base}/echo"), &())
        .header("Host", "custom.test")
        .send()
        .unwrap()
        .json()
        .unwrap();

    assert_eq!(echo.headers.get("host").map(String::as_str), Some("custom.test"));
}

#[test]
fn plain_http_through_proxy_uses_absolute_uri() {
    let (proxy, seen) = recording_proxy();
    let client = Client::new();

    let response = client
        .get("http://target.example/some/path", &json!({"x": 1}))
        .proxy(format!("http://{proxy}"))
        .send()
        .unwrap();

    assert_eq!(response.status_code(), Some(200));
    assert_eq!(response.text().unwrap(), "proxied");

    let head = seen.recv().unwrap();
    assert_eq!(head[0], "GET http://target.example/some/path?x=1 HTTP/1.1");
    assert!(head
        .iter()
        .any(|line| line.eq_ignore_ascii_case("host: target.example")));
}

#[test]
fn refused_connection_is_a_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = Client::new();

    let err = client.get(&format!("http://127.0.0.1:{port}/"), &()).send().unwrap_err();
    assert!(matches!(err, ClientError::Transport { .. }));
}

#[test]
fn session_tracks_last_outcome() {
    let base = base();
    let mut session = Session::new(Client::new());
    session.set_cookie("sid", "abc").unwrap();

    let echo: Echo = session.get(&format!("{base}/echo"), &()).unwrap().json().unwrap();
    assert_eq!(echo.cookies.get("sid").map(String::as_str), Some("abc"));
    assert_eq!(session.status_code(), Some(200));

    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    assert!(session.get(&format!("http://127.0.0.1:{port}/"), &()).is_err());
    assert_eq!(session.status_code(), Some(-1));
    assert!(session.last_response().is_none());
}

#[test]
fn download_writes_identical_file_with_progress() {
    let base = base();
    let client = Client::new();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("payload.bin");

    let mut seen: Vec<(u64, Option<u64>)> = Vec::new();
    let mut record = |done: u64, total: Option<u64>| seen.push((done, total));
    let download = client
        .download(&format!("{base}/download/20000"), &dest, Some(&mut record))
        .unwrap();

    assert_eq!(download.bytes_written, 20_000);
    assert_eq!(download.content_length, Some(20_000));
    assert_eq!(std::fs::read(&dest).unwrap(), payload(20_000));

    assert!(!seen.is_empty());
    assert!(seen.windows(2).all(|pair| pair[0].0 <= pair[1].0));
    assert_eq!(seen.last(), Some(&(20_000, Some(20_000))));
}

#[test]
fn download_without_progress_callback() {
    let base = base();
    let client = Client::new();
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("small.bin");

    let download = client.download(&format!("{base}/download/10"), &dest, None).unwrap();
    assert_eq!(download.bytes_written, 10);
    assert_eq!(std::fs::read(&dest).unwrap(), payload(10));
}

#[test]
fn download_reports_failing_step() {
    let base = base();
    let client = Client::new();
    let dir = tempfile::tempdir().unwrap();

    let missing_dir = dir.path().join("no-such-dir").join("file.bin");
    let err = client
        .download(&format!("{base}/download/10"), &missing_dir, None)
        .unwrap_err();
    assert!(matches!(err, ClientError::Io { op: IoOp::OpenDestination, .. }));

    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let dest = dir.path().join("never.bin");
    let err = client
        .download(&format!("http://127.0.0.1:{port}/file"), &dest, None)
        .unwrap_err();
    assert!(matches!(err, ClientError::Io { op: IoOp::OpenSource, .. }));
    assert!(!dest.exists());
}
