use boring::ssl::SslAcceptor;
use bytes::Bytes;
use http_body_util::Full;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

/// What the server observed.
#[derive(Clone, Default)]
pub struct ServerStats {
    connections: Arc<AtomicUsize>,
    requests: Arc<AtomicUsize>,
    heads: Arc<Mutex<Vec<String>>>,
}

impl ServerStats {
    /// Accepted TCP connections.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    /// Requests answered with a response.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Lower-cased request heads (request line and headers) in arrival order.
    pub fn heads(&self) -> Vec<String> {
        self.heads.lock().unwrap().clone()
    }

    fn record(&self, head: String) {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.heads.lock().unwrap().push(head);
    }
}

/// HTTP/1.1 mock server, plain or over TLS. TLS connections that negotiate
/// `h2` are served by hyper's HTTP/2 server instead.
///
/// Every response is `200` with body `hello <path>`.
pub struct MockHttpServer {
    listener: TcpListener,
    port: u16,
    drop_first: usize,
    reset_first: usize,
    stats: ServerStats,
}

impl MockHttpServer {
    /// Create a new mock server bound to a random port.
    pub async fn new() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        Ok(Self {
            listener,
            port,
            drop_first: 0,
            reset_first: 0,
            stats: ServerStats::default(),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn url_tls(&self) -> String {
        format!("https://127.0.0.1:{}", self.port)
    }

    pub fn stats(&self) -> ServerStats {
        self.stats.clone()
    }

    /// Read the first request on each of the first `n` connections, then
    /// hang up without answering.
    pub fn drop_first_connections(mut self, n: usize) -> Self {
        self.drop_first = n;
        self
    }

    /// Read the ClientHello on each of the first `n` TLS connections, then
    /// reset the socket before answering it.
    pub fn reset_first_handshakes(mut self, n: usize) -> Self {
        self.reset_first = n;
        self
    }

    /// Serve plain HTTP/1.1 in a background task.
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = self.listener.accept().await else {
                    break;
                };
                let seq = self.stats.connections.fetch_add(1, Ordering::SeqCst);
                let hang_up = seq < self.drop_first;
                tokio::spawn(serve_h1(stream, self.stats.clone(), hang_up));
            }
        })
    }

    /// Serve over TLS in a background task.
    pub fn start_tls(self, acceptor: SslAcceptor) -> tokio::task::JoinHandle<()> {
        let acceptor = Arc::new(acceptor);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = self.listener.accept().await else {
                    break;
                };
                let seq = self.stats.connections.fetch_add(1, Ordering::SeqCst);
                let hang_up = seq < self.drop_first;
                let reset = seq < self.reset_first;
                let acceptor = Arc::clone(&acceptor);
                let stats = self.stats.clone();

                tokio::spawn(async move {
                    if reset {
                        reset_mid_handshake(stream).await;
                        return;
                    }
                    let tls = match tokio_boring::accept(&acceptor, stream).await {
                        Ok(tls) => tls,
                        Err(e) => {
                            tracing::debug!("Mock TLS accept failed: {}", e);
                            return;
                        }
                    };
                    if tls.ssl().selected_alpn_protocol() == Some(&b"h2"[..]) {
                        serve_h2(tls, stats).await;
                    } else {
                        serve_h1(tls, stats, hang_up).await;
                    }
                });
            }
        })
    }
}

/// Swallow the ClientHello and abort the connection with an RST.
async fn reset_mid_handshake(mut stream: TcpStream) {
    let mut hello = [0u8; 1024];
    let _ = timeout(Duration::from_secs(5), stream.read(&mut hello)).await;
    #[allow(deprecated)]
    let _ = stream.set_linger(Some(Duration::ZERO));
    drop(stream);
}

async fn serve_h2<S>(stream: S, stats: ServerStats)
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
        let stats = stats.clone();
        async move {
            let mut head = format!("{} {}\r\n", req.method(), req.uri().path()).to_lowercase();
            for (name, value) in req.headers() {
                head.push_str(&format!(
                    "{}: {}\r\n",
                    name,
                    String::from_utf8_lossy(value.as_bytes()).to_lowercase()
                ));
            }
            stats.record(head);
            let body = format!("hello {}", req.uri().path());
            Ok::<_, Infallible>(hyper::Response::new(Full::new(Bytes::from(body))))
        }
    });

    if let Err(e) = hyper::server::conn::http2::Builder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(stream), service)
        .await
    {
        tracing::debug!("Mock h2 connection ended: {}", e);
    }
}

/// Handle one HTTP/1.1 connection with keep-alive.
async fn serve_h1<S>(mut stream: S, stats: ServerStats, drop_first_request: bool)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut buf = Vec::new();
    loop {
        let (head, _body) = match read_request(&mut stream, &mut buf).await {
            Some(request) => request,
            None => break,
        };

        if drop_first_request {
            let _ = stream.shutdown().await;
            break;
        }

        let path = head
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .unwrap_or("/")
            .to_string();
        let close = head.contains("\r\nconnection: close");
        stats.record(head);

        let body = format!("hello {}", path);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: {}\r\n\r\n{}",
            body.len(),
            if close { "close" } else { "keep-alive" },
            body
        );

        if stream.write_all(response.as_bytes()).await.is_err() {
            break;
        }
        if stream.flush().await.is_err() {
            break;
        }
        if close {
            break;
        }
    }
}

/// Read one request. Returns the lower-cased head and the body, or `None`
/// when the peer closed or went idle.
async fn read_request<S>(stream: &mut S, buf: &mut Vec<u8>) -> Option<(String, Vec<u8>)>
where
    S: AsyncRead + Unpin,
{
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        fill(stream, buf).await?;
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        fill(stream, buf).await?;
    }

    let body = buf[head_end..head_end + content_length].to_vec();
    buf.drain(..head_end + content_length);
    Some((head, body))
}

async fn fill<S>(stream: &mut S, buf: &mut Vec<u8>) -> Option<()>
where
    S: AsyncRead + Unpin,
{
    let mut chunk = [0u8; 8192];
    match timeout(Duration::from_secs(5), stream.read(&mut chunk)).await {
        Ok(Ok(n)) if n > 0 => {
            buf.extend_from_slice(&chunk[..n]);
            Some(())
        }
        _ => None,
    }
}
