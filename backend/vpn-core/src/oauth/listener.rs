//! Loopback HTTP listener receiving the authorization redirect.

use crate::error::OAuthError;
use crate::{CALLBACK_PATH, LOOPBACK_BASE_URL, LOOPBACK_BIND_ADDRESS};

use std::collections::HashMap;
use std::time::Duration;

use log::{debug, error, warn};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

const REQUEST_READ_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_HEADER_LINES: usize = 100;

/// Query parameters of the redirect request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    params: HashMap<String, String>,
}

impl CallbackParams {
    pub fn parse(query: &str) -> Self {
        CallbackParams {
            params: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// Splits `GET /callback?a=b HTTP/1.1` into method and request target.
pub fn parse_request_line(line: &str) -> Option<(&str, &str)> {
    let mut parts = line.split_whitespace();
    let method = parts.next()?;
    let target = parts.next()?;
    parts.next()?.starts_with("HTTP/").then_some((method, target))
}

/// Query string of `target` when it addresses the callback path.
pub fn callback_query(target: &str) -> Option<&str> {
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    (path == CALLBACK_PATH).then_some(query)
}

pub struct CallbackListener {
    listener: TcpListener,
    port: u16,
}

impl CallbackListener {
    /// Binds an ephemeral port on the loopback interface.
    pub async fn bind() -> Result<Self, OAuthError> {
        let listener = TcpListener::bind(LOOPBACK_BIND_ADDRESS)
            .await
            .map_err(|e| OAuthError::listener("failed binding loopback listener", e))?;
        let port = listener
            .local_addr()
            .map_err(|e| OAuthError::listener("failed reading loopback address", e))?
            .port();

        debug!("OAuth callback listener bound on port {port}");
        Ok(CallbackListener { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn redirect_uri(&self) -> String {
        format!("{LOOPBACK_BASE_URL}:{}{CALLBACK_PATH}", self.port)
    }

    /// Serves requests until the first `GET /callback`, answers it with a page
    /// reflecting `validate`'s verdict and returns that verdict. Other paths get
    /// a 404 and the wait continues.
    pub async fn wait_for_callback<T, F>(self, validate: F) -> Result<T, OAuthError>
    where
        F: FnOnce(&CallbackParams) -> Result<T, OAuthError>,
    {
        loop {
            let (mut stream, peer) = self
                .listener
                .accept()
                .await
                .map_err(|e| OAuthError::listener("failed accepting callback connection", e))?;

            let target = match read_request_target(&mut stream).await {
                Ok(Some(target)) => target,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Dropping callback connection from {peer}: {e}");
                    continue;
                }
            };

            let Some(query) = callback_query(&target) else {
                debug!("Callback listener: 404 for {target}");
                respond(&mut stream, 404, "Not Found", "Not Found").await;
                continue;
            };

            let params = CallbackParams::parse(query);
            let result = validate(&params);
            let page = match &result {
                Ok(_) => success_page(),
                Err(e) => error_page(&e.message()),
            };
            respond(&mut stream, 200, "OK", &page).await;
            return result;
        }
    }
}

/// Reads the request line and drains the headers. `None` for non-GET requests,
/// which are answered with 405.
async fn read_request_target(stream: &mut TcpStream) -> std::io::Result<Option<String>> {
    let mut reader = BufReader::new(&mut *stream);
    let mut request_line = String::new();
    read_line(&mut reader, &mut request_line).await?;

    let mut header = String::new();
    for _ in 0..MAX_HEADER_LINES {
        header.clear();
        if read_line(&mut reader, &mut header).await? == 0 || header.trim().is_empty() {
            break;
        }
    }
    drop(reader);

    match parse_request_line(request_line.trim()) {
        Some(("GET", target)) => Ok(Some(target.to_string())),
        _ => {
            respond(stream, 405, "Method Not Allowed", "Method Not Allowed").await;
            Ok(None)
        }
    }
}

async fn read_line(
    reader: &mut BufReader<&mut TcpStream>,
    buffer: &mut String,
) -> std::io::Result<usize> {
    timeout(REQUEST_READ_TIMEOUT, reader.read_line(buffer))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "request read timed out"))?
}

async fn respond(stream: &mut TcpStream, status: u16, reason: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    if let Err(e) = stream.write_all(response.as_bytes()).await {
        error!("Failed writing callback response: {e}");
        return;
    }
    let _ = stream.flush().await;
    let _ = stream.shutdown().await;
}

fn success_page() -> String {
    String::from(
        "<!DOCTYPE html><html><head><title>Authorized</title></head>\
         <body><h1>Authorization complete</h1>\
         <p>You can close this window and return to the VPN client.</p></body></html>",
    )
}

fn error_page(message: &str) -> String {
    format!(
        "<!DOCTYPE html><html><head><title>Authorization failed</title></head>\
         <body><h1>Authorization failed</h1><p>{}</p></body></html>",
        escape_html(message)
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
