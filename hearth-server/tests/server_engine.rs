/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 the hearth project authors
 */

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use http::header;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, DuplexStream, duplex,
    split,
};

use hearth_http::HttpBodyType;
use hearth_http::body::HttpBodyReader;
use hearth_server::output::{GzipOutputInterceptor, HttpOutput};
use hearth_server::{HandlerError, HttpHandler, HttpServer, HttpServerConfig, ServerRequest};

struct PathEcho;

#[async_trait]
impl HttpHandler for PathEcho {
    async fn handle(
        &self,
        req: &mut ServerRequest<'_>,
        out: &mut HttpOutput,
    ) -> Result<(), HandlerError> {
        let body = format!("path={}", req.uri().path());
        out.write(body.as_bytes()).await?;
        Ok(())
    }
}

struct BodyEcho;

#[async_trait]
impl HttpHandler for BodyEcho {
    async fn handle(
        &self,
        req: &mut ServerRequest<'_>,
        out: &mut HttpOutput,
    ) -> Result<(), HandlerError> {
        let body = req.read_body_to_end().await?;
        out.write(&body).await?;
        Ok(())
    }
}

struct Named(&'static str);

#[async_trait]
impl HttpHandler for Named {
    async fn handle(
        &self,
        _req: &mut ServerRequest<'_>,
        out: &mut HttpOutput,
    ) -> Result<(), HandlerError> {
        out.write(self.0.as_bytes()).await?;
        Ok(())
    }
}

fn server_with_default(handler: Arc<dyn HttpHandler>) -> Arc<HttpServer> {
    let mut server = HttpServer::new(HttpServerConfig::default());
    server.set_default_handler(handler);
    Arc::new(server)
}

fn connect(server: Arc<HttpServer>) -> DuplexStream {
    let (client, server_side) = duplex(65536);
    let (r, w) = split(server_side);
    let peer: SocketAddr = "192.0.2.9:41000".parse().unwrap();
    let local: SocketAddr = "127.0.0.1:8080".parse().unwrap();
    tokio::spawn(async move {
        server.run_connection(r, w, peer, local).await;
    });
    client
}

/// Read one response; chunked and content-length bodies are de-framed.
async fn read_response<R>(reader: &mut R) -> (String, Vec<u8>)
where
    R: AsyncBufRead + Unpin + Send,
{
    let mut head = String::new();
    loop {
        let mut line = String::new();
        let n = reader.read_line(&mut line).await.unwrap();
        assert!(n > 0, "connection closed inside a response header");
        let end = line == "\r\n";
        head.push_str(&line);
        if end {
            break;
        }
    }
    let lower = head.to_lowercase();
    let body = if let Some(pos) = lower.find("content-length:") {
        let len: usize = lower[pos + "content-length:".len()..]
            .lines()
            .next()
            .unwrap()
            .trim()
            .parse()
            .unwrap();
        let mut body = vec![0u8; len];
        reader.read_exact(&mut body).await.unwrap();
        body
    } else if lower.contains("transfer-encoding: chunked") {
        let mut body_reader =
            HttpBodyReader::new(reader, HttpBodyType::ChunkedWithoutTrailer, 1024);
        let mut body = Vec::new();
        body_reader.read_to_end(&mut body).await.unwrap();
        body
    } else {
        Vec::new()
    };
    (head, body)
}

#[tokio::test]
async fn pipelined_requests_answered_in_order() {
    let client = connect(server_with_default(Arc::new(PathEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(
            b"GET /first HTTP/1.1\r\nHost: example.com\r\n\r\n\
              GET /second HTTP/1.1\r\nHost: example.com\r\n\r\n",
        )
        .await
        .unwrap();

    let (head1, body1) = read_response(&mut reader).await;
    assert!(head1.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body1, b"path=/first");

    let (head2, body2) = read_response(&mut reader).await;
    assert!(head2.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body2, b"path=/second");
}

#[tokio::test]
async fn connection_close_honored() {
    let client = connect(server_with_default(Arc::new(PathEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    // the second request must never be answered
    write
        .write_all(
            b"GET /one HTTP/1.1\r\nHost: example.com\r\nConnection: close\r\n\r\n\
              GET /two HTTP/1.1\r\nHost: example.com\r\n\r\n",
        )
        .await
        .unwrap();

    let (head, body) = read_response(&mut reader).await;
    assert!(head.contains("Connection: close\r\n") || head.contains("Connection: Close\r\n"));
    assert_eq!(body, b"path=/one");

    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn http10_closes_by_default() {
    let client = connect(server_with_default(Arc::new(PathEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write.write_all(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();

    let (head, body) = read_response(&mut reader).await;
    assert!(head.starts_with("HTTP/1.0 200 OK\r\n"));
    assert_eq!(body, b"path=/");

    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test]
async fn http10_keep_alive_token_persists() {
    let client = connect(server_with_default(Arc::new(PathEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(b"GET /a HTTP/1.0\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();
    let (head, body) = read_response(&mut reader).await;
    assert!(head.to_lowercase().contains("connection: keep-alive\r\n"));
    assert_eq!(body, b"path=/a");

    write
        .write_all(b"GET /b HTTP/1.0\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();
    let (_, body) = read_response(&mut reader).await;
    assert_eq!(body, b"path=/b");
}

#[tokio::test]
async fn head_sends_headers_only() {
    let client = connect(server_with_default(Arc::new(PathEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(
            b"HEAD /res HTTP/1.1\r\nHost: example.com\r\n\r\n\
              GET /res HTTP/1.1\r\nHost: example.com\r\nConnection: close\r\n\r\n",
        )
        .await
        .unwrap();

    // HEAD carries the same framing header but no body bytes: the GET
    // response must follow directly after the blank line
    let mut head = String::new();
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        let end = line == "\r\n";
        head.push_str(&line);
        if end {
            break;
        }
    }
    assert!(head.contains("Content-Length: 9\r\n"));

    let (head2, body2) = read_response(&mut reader).await;
    assert!(head2.contains("Content-Length: 9\r\n"));
    assert_eq!(body2, b"path=/res");
}

#[tokio::test]
async fn sequential_posts_echo() {
    let client = connect(server_with_default(Arc::new(BodyEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(
            b"POST /e HTTP/1.1\r\nHost: h\r\nContent-Length: 5\r\n\r\nfirst\
              POST /e HTTP/1.1\r\nHost: h\r\nTransfer-Encoding: chunked\r\n\r\n\
              6\r\nsecond\r\n0\r\n\r\n",
        )
        .await
        .unwrap();

    let (_, body1) = read_response(&mut reader).await;
    assert_eq!(body1, b"first");
    let (head2, body2) = read_response(&mut reader).await;
    assert_eq!(body2, b"second");
    // chunked requests force close on the request side framing rules only
    // when Content-Length is also present; a plain chunked body persists
    assert!(head2.starts_with("HTTP/1.1 200 OK\r\n"));
}

#[tokio::test]
async fn expect_continue_sent_lazily() {
    let client = connect(server_with_default(Arc::new(BodyEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(
            b"POST /up HTTP/1.1\r\nHost: h\r\nExpect: 100-continue\r\nContent-Length: 4\r\n\r\n",
        )
        .await
        .unwrap();

    // the handler reads the body, so the interim response must arrive
    let (interim, _) = read_response(&mut reader).await;
    assert!(interim.starts_with("HTTP/1.1 100 Continue\r\n"));

    write.write_all(b"data").await.unwrap();
    let (head, body) = read_response(&mut reader).await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, b"data");
}

#[tokio::test]
async fn suppressed_continue_closes_connection() {
    let client = connect(server_with_default(Arc::new(Named("ignored"))));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(
            b"POST /up HTTP/1.1\r\nHost: h\r\nExpect: 100-continue\r\nContent-Length: 4\r\n\r\n",
        )
        .await
        .unwrap();

    // the handler never touches the body: no 100 goes out, and the
    // connection cannot be reused because the body was never consumed
    let (head, body) = read_response(&mut reader).await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Connection: Close\r\n"));
    assert_eq!(body, b"ignored");

    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

struct FlushThenEcho;

#[async_trait]
impl HttpHandler for FlushThenEcho {
    async fn handle(
        &self,
        req: &mut ServerRequest<'_>,
        out: &mut HttpOutput,
    ) -> Result<(), HandlerError> {
        out.write(b"early").await?;
        out.flush().await?;
        let body = req.read_body_to_end().await?;
        out.write(&body).await?;
        Ok(())
    }
}

#[tokio::test]
async fn late_body_read_never_interleaves_interim() {
    let client = connect(server_with_default(Arc::new(FlushThenEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    // the client gives up waiting and ships the body right away; the
    // handler has already committed before its first body read
    write
        .write_all(
            b"POST /up HTTP/1.1\r\nHost: h\r\nExpect: 100-continue\r\nContent-Length: 4\r\n\r\ndata",
        )
        .await
        .unwrap();

    let mut raw = Vec::new();
    reader.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8(raw).unwrap();
    assert!(!text.contains("100 Continue"));
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    // committing with the interim still owed forbids reuse
    assert!(text.contains("Connection: Close\r\n"));
    assert!(text.contains("5\r\nearly\r\n"));
    assert!(text.contains("4\r\ndata\r\n"));
    assert!(text.ends_with("0\r\n\r\n"));
}

#[tokio::test]
async fn unmet_expectation_is_refused() {
    let client = connect(server_with_default(Arc::new(BodyEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(b"POST /up HTTP/1.1\r\nHost: h\r\nExpect: never-100\r\n\r\n")
        .await
        .unwrap();

    let (head, _) = read_response(&mut reader).await;
    assert!(head.starts_with("HTTP/1.1 417 Expectation Failed\r\n"));
}

struct FailAfterCommit;

#[async_trait]
impl HttpHandler for FailAfterCommit {
    async fn handle(
        &self,
        _req: &mut ServerRequest<'_>,
        out: &mut HttpOutput,
    ) -> Result<(), HandlerError> {
        out.write(b"partial").await?;
        out.flush().await?;
        Err(HandlerError::Internal("generation failed".to_string()))
    }
}

#[tokio::test]
async fn error_after_commit_truncates_body() {
    let client = connect(server_with_default(Arc::new(FailAfterCommit)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(b"GET / HTTP/1.1\r\nHost: h\r\n\r\n")
        .await
        .unwrap();

    let mut raw = Vec::new();
    reader.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8(raw).unwrap();
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("Transfer-Encoding: chunked\r\n"));
    assert!(text.contains("7\r\npartial\r\n"));
    // no terminating chunk: the peer must see the truncation
    assert!(!text.ends_with("0\r\n\r\n"));
}

struct FailEarly;

#[async_trait]
impl HttpHandler for FailEarly {
    async fn handle(
        &self,
        _req: &mut ServerRequest<'_>,
        _out: &mut HttpOutput,
    ) -> Result<(), HandlerError> {
        Err(HandlerError::Internal("not today".to_string()))
    }
}

#[tokio::test]
async fn error_before_commit_is_a_500() {
    let client = connect(server_with_default(Arc::new(FailEarly)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(b"GET / HTTP/1.1\r\nHost: h\r\n\r\n")
        .await
        .unwrap();

    let (head, body) = read_response(&mut reader).await;
    assert!(head.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    assert_eq!(body, b"500 Internal Server Error\r\n");
}

#[tokio::test]
async fn virtual_hosts_route_by_host_header() {
    let mut server = HttpServer::new(HttpServerConfig::default());
    server.add_host("a.example", Arc::new(Named("handler-a")));
    server.add_host("b.example", Arc::new(Named("handler-b")));
    let client = connect(Arc::new(server));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(
            b"GET / HTTP/1.1\r\nHost: B.Example\r\n\r\n\
              GET / HTTP/1.1\r\nHost: a.example:8080\r\n\r\n",
        )
        .await
        .unwrap();

    let (_, body1) = read_response(&mut reader).await;
    assert_eq!(body1, b"handler-b");
    let (_, body2) = read_response(&mut reader).await;
    assert_eq!(body2, b"handler-a");
}

#[tokio::test]
async fn unknown_host_is_not_found() {
    let mut server = HttpServer::new(HttpServerConfig::default());
    server.add_host("a.example", Arc::new(Named("handler-a")));
    let client = connect(Arc::new(server));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(b"GET / HTTP/1.1\r\nHost: nobody.example\r\n\r\n")
        .await
        .unwrap();

    let (head, _) = read_response(&mut reader).await;
    assert!(head.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[tokio::test]
async fn forwarded_host_overrides_routing() {
    let mut server = HttpServer::new(HttpServerConfig::default());
    server.add_host("edge.example", Arc::new(Named("edge")));
    server.add_host("origin.example", Arc::new(Named("origin")));
    let client = connect(Arc::new(server));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(
            b"GET / HTTP/1.1\r\nHost: edge.example\r\n\
              X-Forwarded-Host: origin.example\r\n\r\n",
        )
        .await
        .unwrap();

    let (_, body) = read_response(&mut reader).await;
    assert_eq!(body, b"origin");
}

struct SchemeEcho;

#[async_trait]
impl HttpHandler for SchemeEcho {
    async fn handle(
        &self,
        req: &mut ServerRequest<'_>,
        out: &mut HttpOutput,
    ) -> Result<(), HandlerError> {
        let body = format!(
            "scheme={} secure={} remote={}",
            req.scheme(),
            req.is_secure(),
            req.remote(),
        );
        out.write(body.as_bytes()).await?;
        Ok(())
    }
}

#[tokio::test]
async fn forwarded_proto_and_for_reach_the_handler() {
    let client = connect(server_with_default(Arc::new(SchemeEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(
            b"GET / HTTP/1.1\r\nHost: h\r\n\
              X-Forwarded-Proto: https\r\n\
              X-Forwarded-For: 203.0.113.5\r\n\r\n",
        )
        .await
        .unwrap();

    let (_, body) = read_response(&mut reader).await;
    assert_eq!(body, b"scheme=https secure=true remote=203.0.113.5");
}

#[tokio::test]
async fn invalid_forwarded_port_is_a_400() {
    let client = connect(server_with_default(Arc::new(PathEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(b"GET / HTTP/1.1\r\nHost: h\r\nX-Forwarded-Port: \r\n\r\n")
        .await
        .unwrap();

    let (head, _) = read_response(&mut reader).await;
    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
}

#[tokio::test]
async fn one_byte_delivery_still_parses() {
    let server = server_with_default(Arc::new(BodyEcho));
    let (client, server_side) = duplex(65536);
    let (_server_read, server_write) = split(server_side);

    let request: &[u8] = b"POST /slow HTTP/1.1\r\nHost: h\r\n\
        Transfer-Encoding: chunked\r\n\r\n9\r\npiecewise\r\n0\r\n\r\n";
    let chunks: Vec<Result<bytes::Bytes, std::io::Error>> = request
        .iter()
        .map(|b| Ok(bytes::Bytes::copy_from_slice(std::slice::from_ref(b))))
        .collect();
    let reader = tokio_util::io::StreamReader::new(tokio_stream::iter(chunks));

    let peer: SocketAddr = "192.0.2.9:41000".parse().unwrap();
    let local: SocketAddr = "127.0.0.1:8080".parse().unwrap();
    tokio::spawn(async move {
        server.run_connection(reader, server_write, peer, local).await;
    });

    let (read, _client_write) = split(client);
    let mut resp_reader = BufReader::new(read);
    let (head, body) = read_response(&mut resp_reader).await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body, b"piecewise");
}

#[tokio::test(start_paused = true)]
async fn idle_connection_times_out() {
    let client = connect(server_with_default(Arc::new(PathEcho)));
    let (read, _write) = split(client);
    let mut reader = BufReader::new(read);

    // nothing is ever sent: the pipeline idle timeout must close the
    // connection without a response
    let mut rest = Vec::new();
    reader.read_to_end(&mut rest).await.unwrap();
    assert!(rest.is_empty());
}

#[tokio::test(start_paused = true)]
async fn stalled_request_header_is_a_408() {
    let client = connect(server_with_default(Arc::new(PathEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    // a partial header that never completes
    write
        .write_all(b"GET / HTTP/1.1\r\nHost: exam")
        .await
        .unwrap();

    let (head, _) = read_response(&mut reader).await;
    assert!(head.starts_with("HTTP/1.1 408 Request Timeout\r\n"));
}

struct FirehoseBody;

#[async_trait]
impl HttpHandler for FirehoseBody {
    async fn handle(
        &self,
        _req: &mut ServerRequest<'_>,
        out: &mut HttpOutput,
    ) -> Result<(), HandlerError> {
        let chunk = [b'x'; 4096];
        for _ in 0..64 {
            out.write(&chunk).await?;
        }
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn stalled_client_write_gives_up() {
    let server = server_with_default(Arc::new(FirehoseBody));
    let (client, server_side) = duplex(1024);
    let (r, w) = split(server_side);
    let peer: SocketAddr = "192.0.2.9:41000".parse().unwrap();
    let local: SocketAddr = "127.0.0.1:8080".parse().unwrap();
    let conn = tokio::spawn(async move {
        server.run_connection(r, w, peer, local).await;
    });

    let (read, mut write) = split(client);
    write
        .write_all(b"GET /big HTTP/1.1\r\nHost: h\r\n\r\n")
        .await
        .unwrap();

    // the client never reads: the blocked flush must give up instead of
    // parking the writer task forever
    conn.await.unwrap();
    drop(read);
}

#[tokio::test]
async fn server_id_header_is_emitted() {
    let mut config = HttpServerConfig::default();
    config.set_server_id("hearth/0.1");
    let mut server = HttpServer::new(config);
    server.set_default_handler(Arc::new(PathEcho));
    let client = connect(Arc::new(server));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(b"GET / HTTP/1.1\r\nHost: h\r\n\r\n")
        .await
        .unwrap();

    let (head, _) = read_response(&mut reader).await;
    assert!(head.contains("Server: hearth/0.1\r\n"));
}

#[tokio::test]
async fn oversized_request_line_is_a_414() {
    let mut config = HttpServerConfig::default();
    config.set_req_hdr_max_size(128);
    let mut server = HttpServer::new(config);
    server.set_default_handler(Arc::new(PathEcho));
    let client = connect(Arc::new(server));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    let mut req = b"GET /".to_vec();
    req.extend(std::iter::repeat_n(b'a', 256));
    req.extend_from_slice(b" HTTP/1.1\r\nHost: h\r\n\r\n");
    write.write_all(&req).await.unwrap();

    let (head, _) = read_response(&mut reader).await;
    assert!(head.starts_with("HTTP/1.1 414 URI Too Long\r\n"));
}

#[tokio::test]
async fn options_asterisk_is_served_by_the_engine() {
    let client = connect(server_with_default(Arc::new(PathEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(
            b"OPTIONS * HTTP/1.1\r\nHost: h\r\n\r\n\
              GET /after HTTP/1.1\r\nHost: h\r\n\r\n",
        )
        .await
        .unwrap();

    let (head, body) = read_response(&mut reader).await;
    assert!(head.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(head.contains("Allow: "));
    assert!(body.is_empty());

    // the connection stays usable afterwards
    let (_, body2) = read_response(&mut reader).await;
    assert_eq!(body2, b"path=/after");
}

#[tokio::test]
async fn get_asterisk_is_rejected() {
    let client = connect(server_with_default(Arc::new(PathEcho)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(b"GET * HTTP/1.1\r\nHost: h\r\n\r\n")
        .await
        .unwrap();

    let (head, _) = read_response(&mut reader).await;
    assert!(head.starts_with("HTTP/1.1 400 Bad Request\r\n"));
}

#[tokio::test]
async fn oversized_header_is_a_431() {
    let mut config = HttpServerConfig::default();
    config.set_req_hdr_max_size(128);
    let mut server = HttpServer::new(config);
    server.set_default_handler(Arc::new(PathEcho));
    let client = connect(Arc::new(server));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    let mut req = b"GET / HTTP/1.1\r\nHost: h\r\nX-Padding: ".to_vec();
    req.extend(std::iter::repeat_n(b'a', 256));
    req.extend_from_slice(b"\r\n\r\n");
    write.write_all(&req).await.unwrap();

    let (head, _) = read_response(&mut reader).await;
    assert!(head.starts_with("HTTP/1.1 431 Request Header Fields Too Large\r\n"));
}

struct GzipLorem;

const LOREM: &str = "Lorem ipsum dolor sit amet, consectetur adipiscing elit, \
sed do eiusmod tempor incididunt ut labore et dolore magna aliqua. Ut enim ad \
minim veniam, quis nostrud exercitation ullamco laboris nisi ut aliquip ex ea \
commodo consequat.";

#[async_trait]
impl HttpHandler for GzipLorem {
    async fn handle(
        &self,
        _req: &mut ServerRequest<'_>,
        out: &mut HttpOutput,
    ) -> Result<(), HandlerError> {
        out.set_header(
            header::CONTENT_ENCODING,
            http::HeaderValue::from_static("gzip"),
        )?;
        out.set_interceptor(Box::new(GzipOutputInterceptor::new()));
        for piece in LOREM.as_bytes().chunks(40) {
            out.write(piece).await?;
            out.flush().await?;
        }
        Ok(())
    }
}

#[tokio::test]
async fn gzip_interceptor_end_to_end() {
    let client = connect(server_with_default(Arc::new(GzipLorem)));
    let (read, mut write) = split(client);
    let mut reader = BufReader::new(read);

    write
        .write_all(b"GET /lorem HTTP/1.1\r\nHost: h\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();

    let (head, body) = read_response(&mut reader).await;
    assert!(head.contains("Content-Encoding: gzip\r\n"));
    assert!(head.contains("Transfer-Encoding: chunked\r\n"));

    let mut decoder = flate2::read::GzDecoder::new(body.as_slice());
    let mut text = String::new();
    std::io::Read::read_to_string(&mut decoder, &mut text).unwrap();
    assert_eq!(text, LOREM);
}
