//! Minimal HTTP/1.1 server for integration tests.
//!
//! Serves JSON routes and Range-capable files, logs every request with its
//! Range header, and can inject failures: a status code for the next N ranged
//! GETs, or a connection dropped after `k` body bytes of a range starting at
//! a given offset.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggedRequest {
    pub method: String,
    pub path: String,
    pub range: Option<String>,
}

#[derive(Clone)]
enum Route {
    Json { status: u16, body: String },
    File { body: Arc<Vec<u8>>, disposition: Option<String> },
}

#[derive(Default)]
struct State {
    routes: HashMap<String, Route>,
    log: Vec<LoggedRequest>,
    fail_ranges: Option<(u16, usize)>,
    drops: Vec<(u64, usize)>,
}

pub struct TestServer {
    base: String,
    state: Arc<Mutex<State>>,
}

impl TestServer {
    /// Binds to an ephemeral port; the server runs until the process exits.
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().unwrap().port();
        let state = Arc::new(Mutex::new(State::default()));
        let accept_state = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&accept_state);
                thread::spawn(move || handle(stream, &state));
            }
        });
        Self {
            base: format!("http://127.0.0.1:{}", port),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    pub fn json(&self, path: &str, status: u16, body: &str) {
        self.state.lock().unwrap().routes.insert(
            path.to_string(),
            Route::Json {
                status,
                body: body.to_string(),
            },
        );
    }

    pub fn file(&self, path: &str, body: Vec<u8>, disposition: Option<&str>) {
        self.state.lock().unwrap().routes.insert(
            path.to_string(),
            Route::File {
                body: Arc::new(body),
                disposition: disposition.map(str::to_string),
            },
        );
    }

    /// The next `times` ranged GETs are answered with `status` and no body.
    pub fn fail_next_ranges(&self, status: u16, times: usize) {
        self.state.lock().unwrap().fail_ranges = Some((status, times));
    }

    /// The first ranged GET starting at `start` sends `k` body bytes and then
    /// closes the connection.
    pub fn drop_range_after(&self, start: u64, k: usize) {
        self.state.lock().unwrap().drops.push((start, k));
    }

    pub fn requests(&self) -> Vec<LoggedRequest> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn clear_log(&self) {
        self.state.lock().unwrap().log.clear();
    }

    /// Range header values of every ranged GET to `path`, in arrival order.
    pub fn ranges_for(&self, path: &str) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|r| r.path == path)
            .filter_map(|r| r.range)
            .collect()
    }
}

fn handle(mut stream: TcpStream, state: &Mutex<State>) {
    let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(5)));
    let Some(head) = read_head(&mut stream) else {
        return;
    };
    let (method, target, range) = parse_head(&head);
    let path = target.split('?').next().unwrap_or("").to_string();

    let (route, fail, drop_after) = {
        let mut st = state.lock().unwrap();
        st.log.push(LoggedRequest {
            method: method.clone(),
            path: path.clone(),
            range: range.clone(),
        });
        let route = st.routes.get(&path).cloned();
        let mut fail = None;
        let mut drop_after = None;
        if let Some(r) = range.as_deref().and_then(parse_range) {
            if let Some((status, left)) = st.fail_ranges {
                if left > 0 {
                    fail = Some(status);
                    st.fail_ranges = Some((status, left - 1));
                }
            }
            if fail.is_none() {
                if let Some(i) = st.drops.iter().position(|(start, _)| *start == r.0) {
                    drop_after = Some(st.drops.remove(i).1);
                }
            }
        }
        (route, fail, drop_after)
    };

    match route {
        None => respond(&mut stream, "404 Not Found", "application/json", &[], b"{}"),
        Some(Route::Json { status, body }) => respond(
            &mut stream,
            &status_line(status),
            "application/json",
            &[],
            body.as_bytes(),
        ),
        Some(Route::File { .. }) if fail.is_some() => {
            let status = fail.unwrap_or(500);
            respond(&mut stream, &status_line(status), "text/plain", &[], b"");
        }
        Some(Route::File { body, disposition }) => {
            serve_file(&mut stream, &body, disposition.as_deref(), range.as_deref(), drop_after)
        }
    }
}

fn serve_file(
    stream: &mut TcpStream,
    body: &[u8],
    disposition: Option<&str>,
    range: Option<&str>,
    drop_after: Option<usize>,
) {
    let total = body.len() as u64;
    let mut extra = Vec::new();
    if let Some(d) = disposition {
        extra.push(format!("Content-Disposition: {}", d));
    }
    extra.push("Accept-Ranges: bytes".to_string());

    let Some((start, end)) = range.and_then(parse_range) else {
        respond(stream, "200 OK", "application/octet-stream", &extra, body);
        return;
    };
    let end = end.min(total.saturating_sub(1));
    if total == 0 || start > end {
        extra.push(format!("Content-Range: bytes */{}", total));
        respond(stream, "416 Range Not Satisfiable", "text/plain", &extra, b"");
        return;
    }
    let slice = &body[start as usize..=end as usize];
    extra.push(format!("Content-Range: bytes {}-{}/{}", start, end, total));
    match drop_after {
        Some(k) => {
            let head = head_bytes("206 Partial Content", "application/octet-stream", &extra, slice.len());
            let _ = stream.write_all(&head);
            let _ = stream.write_all(&slice[..k.min(slice.len())]);
            let _ = stream.flush();
            let _ = stream.shutdown(Shutdown::Both);
        }
        None => respond(stream, "206 Partial Content", "application/octet-stream", &extra, slice),
    }
}

fn status_line(status: u16) -> String {
    let reason = match status {
        200 => "OK",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    };
    format!("{} {}", status, reason)
}

fn head_bytes(status: &str, content_type: &str, extra: &[String], len: usize) -> Vec<u8> {
    let mut head = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n",
        status, content_type, len
    );
    for h in extra {
        head.push_str(h);
        head.push_str("\r\n");
    }
    head.push_str("\r\n");
    head.into_bytes()
}

fn respond(stream: &mut TcpStream, status: &str, content_type: &str, extra: &[String], body: &[u8]) {
    let _ = stream.write_all(&head_bytes(status, content_type, extra, body.len()));
    let _ = stream.write_all(body);
    let _ = stream.flush();
}

fn read_head(stream: &mut TcpStream) -> Option<String> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > 64 * 1024 {
            return None;
        }
    }
    String::from_utf8(buf).ok()
}

/// (method, request target, Range header value).
fn parse_head(head: &str) -> (String, String, Option<String>) {
    let mut lines = head.lines();
    let mut first = lines.next().unwrap_or("").split_whitespace();
    let method = first.next().unwrap_or("").to_string();
    let target = first.next().unwrap_or("").to_string();
    let range = lines
        .take_while(|l| !l.trim().is_empty())
        .filter_map(|l| l.split_once(':'))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("range"))
        .map(|(_, v)| v.trim().to_string());
    (method, target, range)
}

/// `bytes=a-b` -> (a, b); open-ended ranges run to u64::MAX.
fn parse_range(value: &str) -> Option<(u64, u64)> {
    let spec = value.trim().strip_prefix("bytes=")?;
    let (a, b) = spec.split_once('-')?;
    let start = a.trim().parse().ok()?;
    let end = match b.trim() {
        "" => u64::MAX,
        e => e.parse().ok()?,
    };
    Some((start, end))
}
