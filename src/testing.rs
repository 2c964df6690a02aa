//! Test support: a local fake upstream and a state pointed at it

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{HeaderMap, Method, Response};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use crate::config::{AppState, Config};

/// One request as the fake upstream saw it
#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Recorded {
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let Some(query) = self.query.as_deref() else {
            return Vec::new();
        };
        let url = reqwest::Url::parse(&format!("http://upstream{}?{query}", self.path)).unwrap();
        url.query_pairs().into_owned().collect()
    }

    pub fn query_param(&self, key: &str) -> Option<String> {
        self.query_pairs()
            .into_iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }
}

/// Canned answer for a recorded request
pub struct Canned {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
    /// Wait this long before answering
    pub delay: Option<Duration>,
}

impl Canned {
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            headers: vec![("content-type", "application/json".to_string())],
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: vec![("content-type", "text/plain".to_string())],
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        self.headers.push((name, value.to_string()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Responder = dyn Fn(&Recorded) -> Canned + Send + Sync;

/// HTTP/1 server on an ephemeral port that records every request
pub struct FakeUpstream {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl FakeUpstream {
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&Recorded) -> Canned + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let responder: Arc<Responder> = Arc::new(responder);

        let log = Arc::clone(&requests);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let log = Arc::clone(&log);
                let responder = Arc::clone(&responder);
                tokio::spawn(async move {
                    let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                        let log = Arc::clone(&log);
                        let responder = Arc::clone(&responder);
                        async move {
                            let (parts, body) = req.into_parts();
                            let body = body.collect().await?.to_bytes();
                            let recorded = Recorded {
                                method: parts.method,
                                path: parts.uri.path().to_string(),
                                query: parts.uri.query().map(ToString::to_string),
                                headers: parts.headers,
                                body,
                            };
                            let canned = responder(&recorded);
                            log.lock().unwrap().push(recorded);
                            if let Some(delay) = canned.delay {
                                tokio::time::sleep(delay).await;
                            }

                            let mut builder = Response::builder().status(canned.status);
                            for (name, value) in &canned.headers {
                                builder = builder.header(*name, value.as_str());
                            }
                            Ok::<_, hyper::Error>(
                                builder.body(Full::new(Bytes::from(canned.body))).unwrap(),
                            )
                        }
                    });
                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self { addr, requests }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, path_prefix: &str) -> Vec<Recorded> {
        self.requests()
            .into_iter()
            .filter(|r| r.path.starts_with(path_prefix))
            .collect()
    }
}

/// Default configuration with every upstream pointed at `upstream`
pub fn config_for(upstream: &FakeUpstream) -> Config {
    let mut cfg = Config::load_from("nonexistent-relay-config").unwrap();
    cfg.upstream.passport_url = upstream.url("/authenticate");
    cfg.upstream.iss_base_url = upstream.url("/iss");
    cfg.upstream.news_url = upstream.url("/rss/search");
    cfg.upstream.ai_url = upstream.url("/chat/completions");
    cfg.upstream.system_proxy = false;
    cfg.logging.access_log = false;
    cfg
}

pub fn state_for(upstream: &FakeUpstream) -> AppState {
    AppState::new(&config_for(upstream)).unwrap()
}
