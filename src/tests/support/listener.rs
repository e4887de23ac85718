// Raw TCP fixtures for probe tests.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Reserves a loopback port with nothing listening on it.
pub async fn unused_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

/// Accepts every connection and closes it immediately.
///
/// Passes a TCP probe, and fails every HTTP request with a transport error
/// because the peer goes away before answering.
pub struct ClosingServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl ClosingServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        Self::serve(listener)
    }

    /// Starts listening on `port` only after `delay` has passed.
    pub async fn start_after(port: u16, delay: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let listener = TcpListener::bind(("127.0.0.1", port)).await.unwrap();
            let server = Self::serve(listener);
            // Keep serving until the test aborts this task.
            std::future::pending::<()>().await;
            drop(server);
        })
    }

    fn serve(listener: TcpListener) -> Self {
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => drop(stream),
                    Err(_) => return,
                }
            }
        });
        Self { addr, handle }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Drop for ClosingServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Accepts connections, reads the request and never answers.
///
/// Reports through [`SilentServer::client_closed`] each time a client side
/// connection goes away, which lets tests observe that an aborted probe
/// really released its socket.
pub struct SilentServer {
    addr: SocketAddr,
    closed_rx: mpsc::UnboundedReceiver<()>,
    accepted_rx: mpsc::UnboundedReceiver<()>,
    handle: JoinHandle<()>,
}

impl SilentServer {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (closed_tx, closed_rx) = mpsc::unbounded_channel();
        let (accepted_tx, accepted_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            let mut conns = Vec::new();
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let _ = accepted_tx.send(());
                let closed_tx = closed_tx.clone();
                conns.push(tokio::spawn(async move {
                    let mut buf = [0u8; 1024];
                    loop {
                        match stream.read(&mut buf).await {
                            Ok(0) | Err(_) => break,
                            Ok(_) => continue,
                        }
                    }
                    let _ = closed_tx.send(());
                }));
            }
        });

        Self {
            addr,
            closed_rx,
            accepted_rx,
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Waits up to `wait` for one more connection to be accepted.
    pub async fn accepted(&mut self, wait: Duration) -> bool {
        matches!(
            tokio::time::timeout(wait, self.accepted_rx.recv()).await,
            Ok(Some(()))
        )
    }

    /// Waits up to `wait` for one more client side connection to close.
    pub async fn client_closed(&mut self, wait: Duration) -> bool {
        matches!(
            tokio::time::timeout(wait, self.closed_rx.recv()).await,
            Ok(Some(()))
        )
    }
}

impl Drop for SilentServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// `HTTP/1.1 200` that announces the close it is about to do.
pub const REPLY_CONNECTION_CLOSE: &[u8] =
    b"HTTP/1.1 200 OK\r\nconnection: close\r\ncontent-length: 0\r\n\r\n";

/// HTTP/1.0 style reply: no framing headers, the close ends the message.
pub const REPLY_HTTP10: &[u8] = b"HTTP/1.0 200 OK\r\n\r\n";

/// Plain HTTP server on a raw socket: reads one request head, writes a fixed
/// reply and closes the connection right away.
///
/// The first `drop_first` connections are closed without an answer, which
/// makes the server look like a service that is still starting up.
pub struct ReplyingServer {
    addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    request_lines: Arc<Mutex<Vec<String>>>,
    handle: JoinHandle<()>,
}

impl ReplyingServer {
    pub async fn start(reply: &'static [u8]) -> Self {
        Self::start_dropping(reply, 0).await
    }

    pub async fn start_dropping(reply: &'static [u8], drop_first: usize) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connections = Arc::new(AtomicUsize::new(0));
        let request_lines = Arc::new(Mutex::new(Vec::new()));

        let counter = connections.clone();
        let lines = request_lines.clone();
        let handle = tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    return;
                };
                let seen = counter.fetch_add(1, Ordering::SeqCst);
                if seen < drop_first {
                    drop(stream);
                    continue;
                }
                let lines = lines.clone();
                tokio::spawn(async move {
                    let Some(head) = read_head(&mut stream).await else {
                        return;
                    };
                    if let Some(line) = head.lines().next() {
                        lines.lock().unwrap().push(line.to_string());
                    }
                    let _ = stream.write_all(reply).await;
                    let _ = stream.shutdown().await;
                });
            }
        });

        Self {
            addr,
            connections,
            request_lines,
            handle,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Connections accepted so far, answered or not.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// First line of every request that got an answer.
    pub fn request_lines(&self) -> Vec<String> {
        self.request_lines.lock().unwrap().clone()
    }
}

impl Drop for ReplyingServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn read_head(stream: &mut tokio::net::TcpStream) -> Option<String> {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut buf).await {
            Ok(0) | Err(_) => return None,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    Some(String::from_utf8_lossy(&head).into_owned())
}
