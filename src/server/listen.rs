use std::io;
use tokio::net::TcpListener;
use tracing::warn;

/// Bind `host:port`, moving on to the next port while the address is taken,
/// at most `retries` times. Any other bind error is returned immediately.
pub async fn bind_with_retry(host: &str, port: u16, retries: u16) -> io::Result<TcpListener> {
    let mut port = port;
    let mut attempt = 0;

    loop {
        match TcpListener::bind((host, port)).await {
            Ok(listener) => return Ok(listener),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse && attempt < retries => {
                let next = port.checked_add(1).ok_or(e)?;
                warn!("Port {} is in use, trying {}", port, next);
                port = next;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
