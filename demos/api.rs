//! Demo API on a single HTTP/HTTPS port.
//!
//! ```text
//! cargo run --example api -- --port 8080
//! cargo run --example api -- --port 8443 --cert cert.pem --key key.pem --redirect
//! ```
//!
//! Endpoints:
//! - `GET /` - `Home`
//! - `GET /test` - `GET Test OK`
//! - `POST /test` - JSON body with a `function` field:
//!   - `{"function": "hello"}` - `Hello World!`
//!   - `{"function": "echo", ...}` - the request body back as JSON
//!   - `{"function": "secret", "password": "..."}` - `200` or `401`
//!
//! Logging is controlled with `RUST_LOG` (default `info`).

use clap::Parser;
use dual_web::{Method, Request, Response, Server, StatusCode, TlsConfig, TlsVersion};
use serde_json::Value;
use std::{net::IpAddr, path::PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SECRET_PASSWORD: &str = "asdf1234";

#[derive(Parser, Debug)]
#[command(name = "api", about = "Demo API served over HTTP and HTTPS on one port", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(short, long, default_value = "0.0.0.0")]
    address: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// PEM certificate chain; enables TLS
    #[arg(long, requires = "key")]
    cert: Option<PathBuf>,

    /// PEM private key matching `--cert`
    #[arg(long, requires = "cert")]
    key: Option<PathBuf>,

    /// Refuse TLS 1.2 clients
    #[arg(long, requires = "cert")]
    tls13_only: bool,

    /// Redirect plaintext requests to HTTPS instead of serving them
    #[arg(long, requires = "cert")]
    redirect: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut server = Server::new(args.address, args.port);

    if let (Some(cert), Some(key)) = (&args.cert, &args.key) {
        let min_version = match args.tls13_only {
            true => TlsVersion::Tls13,
            false => TlsVersion::Tls12,
        };

        server.set_tls_config(TlsConfig::from_pem_files(cert, key, min_version)?);
    }
    server.set_redirect_to_https(args.redirect);

    server
        .register(Method::Get, "/", |_: &Request, _: &str| html("Home"))
        .register(Method::Get, "/test", |_: &Request, _: &str| html("GET Test OK"))
        .register(Method::Post, "/test", post_test);

    server
        .run_until(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for ctrl-c: {err}");
            }
        })
        .await?;

    Ok(())
}

fn html(body: &str) -> Response {
    let mut resp = Response::with_status(StatusCode::Ok);
    resp.add_header("Content-Type", "text/html; charset=utf-8")
        .set_body(body);
    resp
}

fn post_test(request: &Request, log_info: &str) -> Response {
    let Ok(json) = serde_json::from_slice::<Value>(request.body()) else {
        return Response::with_status(StatusCode::BadRequest);
    };

    match json.get("function").and_then(Value::as_str) {
        Some("hello") => html("Hello World!"),
        Some("echo") => {
            let mut resp = Response::with_status(StatusCode::Ok);
            resp.add_header("Content-Type", "application/json")
                .set_body(request.body());
            resp
        }
        Some("secret") => match json.get("password").and_then(Value::as_str) {
            Some(SECRET_PASSWORD) => html("Password correct!"),
            Some(_) => {
                tracing::warn!(client = log_info, "wrong password");
                Response::with_status(StatusCode::Unauthorized)
            }
            None => Response::with_status(StatusCode::BadRequest),
        },
        _ => Response::with_status(StatusCode::BadRequest),
    }
}
