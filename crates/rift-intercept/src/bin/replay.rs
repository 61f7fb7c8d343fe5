//! Rift Intercept replay tool
//!
//! Loads a fixture file into a session and sends one HTTP request through an
//! intercepted connection using hyper's HTTP/1 client. Prints the response and
//! the request as the session captured it.
//!
//! Usage:
//!   rift-intercept-replay --fixtures fixtures.yaml --url http://testme.org/users?page=1
//!   rift-intercept-replay -f fixtures.yaml -u http://testme.org/items -X POST -d '{"a":1}' \
//!       -H 'Content-Type: application/json'

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use clap::Parser;
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use rift_intercept::{Fixture, InterceptConfig, MockStream, Session};

/// Replay a request against fixture-defined responses
#[derive(Parser, Debug)]
#[command(name = "rift-intercept-replay")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Fixture file (YAML or JSON)
    #[arg(short, long)]
    fixtures: PathBuf,

    /// URL to request
    #[arg(short, long)]
    url: String,

    /// Request method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request body
    #[arg(short = 'd', long)]
    body: Option<String>,

    /// Extra request header, `Name: value` (repeatable)
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// Session configuration file
    #[arg(short, long, env = "RIFT_INTERCEPT_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let config = match &args.config {
        Some(path) => InterceptConfig::from_file(path)?,
        None => InterceptConfig::from_env(),
    };
    let session = Arc::new(Session::with_config(config));
    let _guard = session.enter();
    Fixture::from_file(&args.fixtures)?.apply(&session)?;

    let url = url::Url::parse(&args.url).with_context(|| format!("Invalid URL {}", args.url))?;
    let Some(host) = url.host_str() else {
        bail!("URL {} has no host", args.url);
    };
    let port = url.port_or_known_default().unwrap_or(80);
    let target = &url[url::Position::BeforePath..url::Position::AfterQuery];

    let stream = MockStream::connect(Arc::clone(&session), host, port)?;
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            error!("Intercepted connection failed: {}", e);
        }
    });

    let mut request = hyper::Request::builder()
        .method(hyper::Method::from_bytes(args.method.to_uppercase().as_bytes())?)
        .uri(target)
        .header(hyper::header::HOST, host);
    for header in &args.headers {
        let Some((name, value)) = header.split_once(':') else {
            bail!("Header '{}' is not of the form 'Name: value'", header);
        };
        request = request.header(name.trim(), value.trim());
    }
    let body = Bytes::from(args.body.clone().unwrap_or_default());
    let request = request.body(Full::new(body))?;

    info!("Replaying {} {}", args.method.to_uppercase(), args.url);
    let response = sender.send_request(request).await?;

    println!("{:?} {}", response.version(), response.status());
    for (name, value) in response.headers() {
        println!("{}: {}", name, value.to_str().unwrap_or("<binary>"));
    }
    println!();
    let body = response.into_body().collect().await?.to_bytes();
    println!("{}", String::from_utf8_lossy(&body));

    if let Some(captured) = session.last_request() {
        println!();
        println!("--- captured request ---");
        println!(
            "{} {}:{}{}{}{}",
            captured.method,
            captured.host,
            captured.port,
            captured.path,
            if captured.query.is_empty() { "" } else { "?" },
            captured.query
        );
        for (name, value) in captured.headers.iter() {
            println!("{}: {}", name, value);
        }
        if !captured.body.is_empty() {
            println!();
            println!("{}", String::from_utf8_lossy(&captured.body));
        }
    }
    Ok(())
}
