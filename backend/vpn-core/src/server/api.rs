//! eduVPN API v3 calls: `info`, `connect` and `disconnect`.

use crate::error::ServerError;

use common::HttpStatusCode;
use models::{Profile, Protocol};

use log::debug;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use url::Url;

#[derive(Debug, Deserialize)]
struct InfoResponse {
    info: Info,
}

#[derive(Debug, Deserialize)]
struct Info {
    #[serde(default)]
    profile_list: Vec<Profile>,
}

/// Parameters of `POST <api>/connect`.
#[derive(Debug, Clone)]
pub struct ConnectRequest {
    pub profile_id: String,
    pub prefer_tcp: bool,
    /// Offered protocols, most wanted first. Becomes the `Accept` header.
    pub accept: Vec<Protocol>,
    /// WireGuard public key, sent only when WireGuard is offered.
    pub public_key: Option<String>,
}

/// Configuration text returned by `connect`.
#[derive(Debug, Clone)]
pub struct ConnectResponse {
    pub protocol: Protocol,
    pub config: String,
}

/// `<api>/<name>` with the API URL treated as a directory.
pub fn endpoint(api: &Url, name: &str) -> Result<Url, ServerError> {
    let mut base = api.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(name)?)
}

pub async fn info(client: &Client, api: &Url, access: &str) -> Result<Vec<Profile>, ServerError> {
    let url = endpoint(api, "info")?;
    debug!("GET {url}");
    let response = send(client.get(url).bearer_auth(access)).await?;
    let body = response.text().await?;
    let info: InfoResponse = serde_json::from_str(&body)?;
    Ok(info.info.profile_list)
}

pub async fn connect(
    client: &Client,
    api: &Url,
    access: &str,
    request: &ConnectRequest,
) -> Result<ConnectResponse, ServerError> {
    let url = endpoint(api, "connect")?;
    debug!("POST {url} profile_id={} prefer_tcp={}", request.profile_id, request.prefer_tcp);

    let mut form = vec![
        ("profile_id", request.profile_id.clone()),
        (
            "prefer_tcp",
            String::from(if request.prefer_tcp { "yes" } else { "no" }),
        ),
    ];
    if let Some(key) = &request.public_key
        && request.accept.contains(&Protocol::WireGuard)
    {
        form.push(("public_key", key.clone()));
    }

    let accept = request
        .accept
        .iter()
        .map(Protocol::content_type)
        .collect::<Vec<_>>()
        .join(", ");

    let response = send(
        client
            .post(url)
            .bearer_auth(access)
            .header(ACCEPT, accept)
            .form(&form),
    )
    .await?;

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let protocol = Protocol::from_content_type(&content_type).ok_or_else(|| {
        ServerError::unsupported(format!("unexpected config content type '{content_type}'"))
    })?;

    if !request.accept.contains(&protocol) {
        return Err(ServerError::unsupported(format!(
            "server returned {protocol} which was not requested"
        )));
    }

    let config = response.text().await?;
    Ok(ConnectResponse { protocol, config })
}

pub async fn disconnect(client: &Client, api: &Url, access: &str) -> Result<(), ServerError> {
    let url = endpoint(api, "disconnect")?;
    debug!("POST {url}");
    send(client.post(url).bearer_auth(access)).await?;
    Ok(())
}

async fn send(request: RequestBuilder) -> Result<Response, ServerError> {
    let response = request.send().await?;
    let status = HttpStatusCode(response.status().as_u16());
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServerError::api(status, body))
}
