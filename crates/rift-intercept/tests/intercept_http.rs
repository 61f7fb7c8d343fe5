//! End-to-end tests driving the interceptor through the `Transport` seam
//!
//! A small blocking HTTP/1.1 client writes requests to whatever connection the
//! transport hands out and parses the raw reply, so these tests see exactly
//! the bytes a real client would.

use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use rift_intercept::{
    Body, FixedClock, Headers, InterceptError, Method, MockSocket, Response, Session, Transport,
};

#[derive(Debug)]
struct Reply {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Reply {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Header names lowercased, sorted, for order-independent comparison.
    fn normalized_headers(&self) -> Vec<(String, String)> {
        let mut headers: Vec<_> = self
            .headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();
        headers.sort();
        headers
    }
}

fn expected(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    let mut out: Vec<_> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    out.sort();
    out
}

fn parse_reply(raw: &[u8]) -> Reply {
    let split = raw
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("reply has a complete head");
    let head = std::str::from_utf8(&raw[..split]).unwrap();
    let mut lines = head.split("\r\n");
    let status = lines
        .next()
        .and_then(|line| line.split(' ').nth(1))
        .and_then(|code| code.parse().ok())
        .expect("status line");
    let headers = lines
        .map(|line| {
            let (k, v) = line.split_once(':').unwrap();
            (k.trim().to_string(), v.trim().to_string())
        })
        .collect();
    Reply {
        status,
        headers,
        body: raw[split + 4..].to_vec(),
    }
}

fn request(
    transport: &dyn Transport,
    method: &str,
    url: &str,
    headers: &[(&str, &str)],
    body: &[u8],
) -> io::Result<Reply> {
    let url = url::Url::parse(url).unwrap();
    let host = url.host_str().unwrap();
    let port = url.port_or_known_default().unwrap();
    let target = &url[url::Position::BeforePath..url::Position::AfterQuery];

    let mut conn = transport.connect(host, port, Some(Duration::from_secs(10)))?;
    let mut head = format!("{method} {target} HTTP/1.1\r\nHost: {host}\r\n");
    for (name, value) in headers {
        head.push_str(&format!("{name}: {value}\r\n"));
    }
    let declares_length = headers
        .iter()
        .any(|(name, _)| name.eq_ignore_ascii_case("content-length"));
    if !body.is_empty() && !declares_length {
        head.push_str(&format!("Content-Length: {}\r\n", body.len()));
    }
    head.push_str("\r\n");

    conn.write_all(head.as_bytes())?;
    conn.write_all(body)?;
    let mut raw = Vec::new();
    conn.read_to_end(&mut raw)?;
    conn.close()?;
    Ok(parse_reply(&raw))
}

fn get(transport: &dyn Transport, url: &str) -> io::Result<Reply> {
    request(transport, "GET", url, &[], b"")
}

fn frozen_session() -> Arc<Session> {
    Arc::new(Session::new().with_clock(Arc::new(FixedClock::at(2013, 4, 30, 10, 39, 21))))
}

#[test]
fn test_sendall() {
    let session = frozen_session();
    let guard = session.enter();
    session
        .single_register(
            Method::GET,
            "http://testme.org/get/p/?a=1&b=2",
            Some("test_body".into()),
            None,
            200,
        )
        .unwrap();

    let reply = get(&guard.transport(), "http://testme.org/get/p/?b=2&a=1").unwrap();
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, b"test_body");
    assert_eq!(
        reply.normalized_headers(),
        expected(&[
            ("status", "200"),
            ("content-length", "9"),
            ("server", "Rift/Intercept"),
            ("connection", "close"),
            ("date", "Tue, 30 Apr 2013 10:39:21 GMT"),
            ("content-type", "text/plain; charset=utf-8"),
        ])
    );
    assert_eq!(session.request_count(), 1);
}

#[test]
fn test_sendall_json() {
    let session = frozen_session();
    let guard = session.enter();
    let headers: Headers = [("content-type", "application/json")].into_iter().collect();
    session
        .single_register(
            Method::GET,
            "http://testme.org/get?a=1&b=2#test",
            Some("{\"a\": \"€\"}".into()),
            Some(headers),
            200,
        )
        .unwrap();

    let reply = get(&guard.transport(), "http://testme.org/get?b=2&a=1#test").unwrap();
    assert_eq!(reply.status, 200);
    assert_eq!(reply.body, b"{\"a\": \"\xe2\x82\xac\"}");
    assert_eq!(
        reply.normalized_headers(),
        expected(&[
            ("status", "200"),
            ("content-length", "12"),
            ("server", "Rift/Intercept"),
            ("connection", "close"),
            ("date", "Tue, 30 Apr 2013 10:39:21 GMT"),
            ("content-type", "application/json"),
        ])
    );
    // Emitted with the caller's casing
    assert!(reply.headers.iter().any(|(k, _)| k == "content-type"));
    assert_eq!(session.request_count(), 1);
}

#[test]
fn test_sendall_double() {
    let session = Arc::new(Session::new());
    let guard = session.enter();
    session
        .register(
            Method::GET,
            "http://testme.org/",
            [Response::with_status(404), Response::new()],
        )
        .unwrap();

    let transport = guard.transport();
    assert_eq!(get(&transport, "http://testme.org/").unwrap().status, 404);
    assert_eq!(get(&transport, "http://testme.org/").unwrap().status, 200);
    assert_eq!(get(&transport, "http://testme.org/").unwrap().status, 200);
    assert_eq!(session.request_count(), 3);
}

#[test]
fn test_multipart() {
    let session = Arc::new(Session::new());
    let guard = session.enter();
    let url = "http://httpbin.org/post";
    let data = "--xXXxXXyYYzzz\r\nContent-Disposition: form-data; name=\"content\"\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: 68\r\n\r\nAction: comment\nText: Comment with attach\nAttachment: x1.txt, x2.txt\r\n--xXXxXXyYYzzz\r\nContent-Disposition: form-data; name=\"attachment_2\"; filename=\"x.txt\"\r\nContent-Type: text/plain\r\nContent-Length: 4\r\n\r\nbye\n\r\n--xXXxXXyYYzzz\r\nContent-Disposition: form-data; name=\"attachment_1\"; filename=\"x.txt\"\r\nContent-Type: text/plain\r\nContent-Length: 4\r\n\r\nbye\n\r\n--xXXxXXyYYzzz--\r\n";
    let length = data.len().to_string();
    session.register(Method::POST, url, Vec::new()).unwrap();

    let reply = request(
        &guard.transport(),
        "POST",
        url,
        &[
            ("Content-Length", length.as_str()),
            ("Content-Type", "multipart/form-data; boundary=xXXxXXyYYzzz"),
            ("Accept", "text/plain"),
            ("User-Agent", "rift-intercept-tests"),
            ("Accept-encoding", "identity"),
        ],
        data.as_bytes(),
    )
    .unwrap();
    assert_eq!(reply.status, 200);

    let last = session.last_request().unwrap();
    assert_eq!(last.method, Method::POST);
    assert_eq!(last.path, "/post");
    assert_eq!(last.body_text(), Some(data));
    let mut sent: Vec<(String, String)> = last
        .headers
        .iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v.to_string()))
        .collect();
    sent.sort();
    assert_eq!(
        sent,
        expected(&[
            ("accept", "text/plain"),
            ("accept-encoding", "identity"),
            ("content-length", length.as_str()),
            ("content-type", "multipart/form-data; boundary=xXXxXXyYYzzz"),
            ("host", "httpbin.org"),
            ("user-agent", "rift-intercept-tests"),
        ])
    );
}

#[test]
fn test_file_object() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fluidicon.png");
    let content: Vec<u8> = b"\x89PNG\r\n\x1a\n"
        .iter()
        .copied()
        .chain((0..=255u8).cycle().take(4096))
        .collect();
    std::fs::write(&path, &content).unwrap();

    let session = Arc::new(Session::new());
    let guard = session.enter();
    let url = "http://github.com/fluidicon.png";
    session
        .single_register(Method::GET, url, Some(Body::from_file(&path).unwrap()), None, 200)
        .unwrap();

    let reply = get(&guard.transport(), url).unwrap();
    assert_eq!(reply.body, content);
    assert_eq!(
        reply.header("content-length").map(|v| v.parse::<usize>().unwrap()),
        Some(content.len())
    );
    assert_eq!(reply.header("content-type"), Some("image/png"));
}

#[test]
fn test_same_url_different_methods() {
    let session = Arc::new(Session::new());
    let guard = session.enter();
    let url = "http://bit.ly/fakeurl";
    let methods = [Method::PUT, Method::GET, Method::POST];

    for (content, method) in methods.iter().enumerate() {
        let body = serde_json::json!({ "content": content, "method": method.as_str() });
        session
            .single_register(method, url, Some(Body::from(&body)), None, 200)
            .unwrap();
    }

    let transport = guard.transport();
    let replies: Vec<serde_json::Value> = methods
        .iter()
        .map(|m| {
            let reply = request(&transport, m.as_str(), url, &[], b"").unwrap();
            serde_json::from_slice(&reply.body).unwrap()
        })
        .collect();

    let methods_from_replies: Vec<&str> = replies
        .iter()
        .map(|r| r["method"].as_str().unwrap())
        .collect();
    let contents: Vec<u64> = replies
        .iter()
        .map(|r| r["content"].as_u64().unwrap())
        .collect();
    assert_eq!(methods_from_replies, vec!["PUT", "GET", "POST"]);
    assert_eq!(contents, vec![0, 1, 2]);
}

#[test]
fn test_request_bodies() {
    let session = Arc::new(Session::new());
    let guard = session.enter();
    let transport = guard.transport();

    for e in 0..5 {
        let url = format!("http://bit.ly/fakeurl/{e}");
        session
            .single_register(Method::POST, &url, Some(e.to_string().into()), None, 200)
            .unwrap();
        let body = format!("key-{e}=value%3D{e}");
        let reply = request(
            &transport,
            "POST",
            &url,
            &[("Content-Type", "application/x-www-form-urlencoded")],
            body.as_bytes(),
        )
        .unwrap();
        assert_eq!(reply.body, e.to_string().as_bytes());
        assert_eq!(session.last_request().unwrap().body.as_ref(), body.as_bytes());
    }
    assert_eq!(session.request_count(), 5);
}

#[test]
fn test_unregistered_path_is_refused() {
    let session = Arc::new(Session::new());
    let guard = session.enter();
    session
        .register(Method::GET, "http://httpbin.org/user.agent", [Response::new()])
        .unwrap();
    let err = get(&guard.transport(), "http://httpbin.org/ip").unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::ConnectionRefused);
}

#[test]
fn test_connect_outside_scope_fails() {
    let session = Arc::new(Session::new());
    {
        let _guard = session.enter();
    }
    let mut socket = MockSocket::new(session);
    assert!(matches!(
        socket.connect(("testme.org", 80)),
        Err(InterceptError::Inactive)
    ));
}

#[test]
fn test_chunked_request_body_is_decoded() {
    let session = Arc::new(Session::new());
    let guard = session.enter();
    session
        .register(Method::PUT, "http://testme.org/upload", [Response::with_status(204)])
        .unwrap();

    let mut conn = guard
        .transport()
        .connect_socket("testme.org", 80, None)
        .unwrap();
    conn.write_all(b"PUT /upload HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n")
        .unwrap();
    conn.write_all(b"5\r\nhello\r\n6\r\n world\r\n0\r\n\r\n").unwrap();
    let mut raw = Vec::new();
    conn.read_to_end(&mut raw).unwrap();

    assert_eq!(parse_reply(&raw).status, 204);
    assert_eq!(session.last_request().unwrap().body.as_ref(), b"hello world");
}
