//! Shared test fixtures: a scripted in-process HTTP server and tiny images.
//!
//! The server binds an ephemeral port and serves per-path reply scripts:
//! each request to a path consumes the next scripted reply, and the last
//! reply repeats once the script runs out. A global request counter lets
//! tests assert how many fetches actually hit the wire.

#![allow(dead_code)]

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use http_dataflow::{FetchConfig, SampleReference};
use image::{ImageFormat, Rgb, RgbImage};

/// One scripted response.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Respond with this status and an empty body.
    Status(u16),
    /// Respond 200 with this body.
    Body(Vec<u8>),
    /// Sleep, then respond 200 with this body.
    Delayed(Duration, Vec<u8>),
}

struct Route {
    replies: Vec<Reply>,
    hits: usize,
}

pub struct TestServer {
    addr: SocketAddr,
    routes: Arc<Mutex<HashMap<String, Route>>>,
    requests: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
    accept_thread: Option<thread::JoinHandle<()>>,
}

/// Installs a process-wide log subscriber honoring `RUST_LOG`. Only the
/// first caller wins; later calls are no-ops.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

impl TestServer {
    pub fn start() -> Self {
        init_tracing();
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test server");
        let addr = listener.local_addr().expect("server addr");
        let routes: Arc<Mutex<HashMap<String, Route>>> = Arc::new(Mutex::new(HashMap::new()));
        let requests = Arc::new(AtomicUsize::new(0));
        let shutdown = Arc::new(AtomicBool::new(false));

        let accept_thread = {
            let routes = routes.clone();
            let requests = requests.clone();
            let shutdown = shutdown.clone();
            thread::spawn(move || {
                for stream in listener.incoming() {
                    if shutdown.load(Ordering::Relaxed) {
                        break;
                    }
                    let Ok(sock) = stream else { break };
                    let routes = routes.clone();
                    let requests = requests.clone();
                    thread::spawn(move || serve_one_connection(sock, &routes, &requests));
                }
            })
        };

        Self {
            addr,
            routes,
            requests,
            shutdown,
            accept_thread: Some(accept_thread),
        }
    }

    /// Registers the reply script for `path` (e.g. `"/img/0.png"`).
    pub fn route(&self, path: impl Into<String>, replies: Vec<Reply>) {
        assert!(!replies.is_empty(), "route script must not be empty");
        self.routes
            .lock()
            .unwrap()
            .insert(path.into(), Route { replies, hits: 0 });
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Total requests served so far, across all routes.
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Requests served for one path.
    pub fn hits(&self, path: &str) -> usize {
        self.routes
            .lock()
            .unwrap()
            .get(path)
            .map(|route| route.hits)
            .unwrap_or(0)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Wake the accept loop.
        let _ = TcpStream::connect(self.addr);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
    }
}

fn serve_one_connection(
    mut sock: TcpStream,
    routes: &Mutex<HashMap<String, Route>>,
    requests: &AtomicUsize,
) {
    let mut buf = vec![0u8; 16 * 1024];
    let mut n = 0;
    loop {
        let Ok(read) = sock.read(&mut buf[n..]) else {
            return;
        };
        if read == 0 {
            return; // disconnected (e.g. the shutdown wake-up connection)
        }
        n += read;
        if buf[..n].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
        if n >= buf.len() {
            return;
        }
    }

    let Ok(request) = std::str::from_utf8(&buf[..n]) else {
        return;
    };
    let Some(path) = request
        .split("\r\n")
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
    else {
        return;
    };

    requests.fetch_add(1, Ordering::SeqCst);

    let reply = {
        let mut routes = routes.lock().unwrap();
        match routes.get_mut(path) {
            Some(route) => {
                let index = route.hits.min(route.replies.len() - 1);
                route.hits += 1;
                route.replies[index].clone()
            }
            None => Reply::Status(404),
        }
    };

    let (status, body) = match reply {
        Reply::Status(status) => (status, Vec::new()),
        Reply::Body(body) => (200, body),
        Reply::Delayed(delay, body) => {
            thread::sleep(delay);
            (200, body)
        }
    };

    let header = format!(
        "HTTP/1.1 {status} X\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    );
    let _ = sock.write_all(header.as_bytes());
    let _ = sock.write_all(&body);
    let _ = sock.flush();
}

/// A 2x2 PNG whose red channel encodes `tag`, so decoded samples can be
/// traced back to the reference that produced them.
pub fn tiny_png(tag: u8) -> Vec<u8> {
    let img = RgbImage::from_pixel(2, 2, Rgb([tag, 0, 0]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png).expect("encode png");
    buf.into_inner()
}

/// Registers `count` image routes on the server and returns matching
/// references: reference `i` carries label `i` and an image tagged `i`.
pub fn png_references(server: &TestServer, count: usize) -> Vec<SampleReference<u8>> {
    (0..count)
        .map(|i| {
            let tag = i as u8;
            let path = format!("/img/{i}.png");
            server.route(path.clone(), vec![Reply::Body(tiny_png(tag))]);
            SampleReference::new(server.url(&path), vec![tag])
        })
        .collect()
}

/// Fetch settings with millisecond backoffs so retry tests run fast.
pub fn quick_fetch(max_trials: usize) -> FetchConfig {
    FetchConfig {
        max_trials,
        request_timeout: Duration::from_secs(5),
        connect_timeout: Duration::from_secs(5),
        status_backoff: Duration::from_millis(1),
        transport_backoff: Duration::from_millis(1),
    }
}
