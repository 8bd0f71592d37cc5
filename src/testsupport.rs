//! Socket-level fixtures for what wiremock cannot express: addresses with
//! nothing listening, and byte-exact control over how a response body is
//! chunked on the wire.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::Duration;

/// An address nothing is listening on (bound then immediately released).
pub fn unreachable_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

/// Serve a single connection with a 200 event-stream response whose body is
/// written in two pieces split at byte `split_at`, flushed separately, so
/// the client sees the bytes arrive in different chunks.
pub fn spawn_split_sse_server(body: &[u8], split_at: usize) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind fixture");
    let addr = listener.local_addr().expect("local addr");
    let body = body.to_vec();
    thread::spawn(move || {
        let Ok((mut stream, _)) = listener.accept() else {
            return;
        };
        read_request(&mut stream);
        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nConnection: close\r\nContent-Length: {}\r\n\r\n",
            body.len()
        );
        let _ = stream.write_all(head.as_bytes());
        let _ = stream.write_all(&body[..split_at]);
        let _ = stream.flush();
        thread::sleep(Duration::from_millis(50));
        let _ = stream.write_all(&body[split_at..]);
        let _ = stream.flush();
    });
    format!("http://{}", addr)
}

/// Read the request head plus any Content-Length body so the client is not
/// racing its own unsent bytes against our response.
fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        match stream.read(&mut chunk) {
            Ok(0) => return,
            Ok(n) => {
                buf.extend_from_slice(&chunk[..n]);
                if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos;
                }
            }
            Err(_) => return,
        }
    };
    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|l| {
            let (name, value) = l.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    let mut body_read = buf.len() - (head_end + 4);
    while body_read < content_length {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => body_read += n,
        }
    }
}
