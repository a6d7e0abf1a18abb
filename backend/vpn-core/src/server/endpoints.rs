use crate::error::ServerError;
use crate::{API_V3_KEY, WELL_KNOWN_PATH};

use common::HttpStatusCode;

use std::collections::HashMap;

use log::debug;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

/// API and OAuth endpoints announced by a server's well-known document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoints {
    pub api: Url,
    pub authorization: Url,
    pub token: Url,
}

#[derive(Debug, Deserialize)]
struct WellKnown {
    api: HashMap<String, WellKnownApi>,
    #[serde(default)]
    v: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WellKnownApi {
    api_endpoint: String,
    authorization_endpoint: String,
    token_endpoint: String,
}

pub fn parse_well_known(body: &str) -> Result<Endpoints, ServerError> {
    let document: WellKnown = serde_json::from_str(body)
        .map_err(|e| ServerError::metadata(format!("failed parsing well-known document: {e}")))?;

    let api = document
        .api
        .get(API_V3_KEY)
        .ok_or_else(|| ServerError::metadata(format!("server does not announce {API_V3_KEY}")))?;

    let parse = |name: &str, value: &str| {
        Url::parse(value)
            .map_err(|e| ServerError::metadata(format!("invalid {name} '{value}': {e}")))
    };

    if let Some(version) = &document.v {
        debug!("Server portal version {version}");
    }

    Ok(Endpoints {
        api: parse("api_endpoint", &api.api_endpoint)?,
        authorization: parse("authorization_endpoint", &api.authorization_endpoint)?,
        token: parse("token_endpoint", &api.token_endpoint)?,
    })
}

/// GET `<base>/.well-known/vpn-user-portal`.
pub async fn fetch(client: &Client, base_url: &Url) -> Result<Endpoints, ServerError> {
    let url = base_url.join(WELL_KNOWN_PATH)?;
    debug!("Fetching server metadata from {url}");

    let response = client
        .get(url.clone())
        .send()
        .await
        .map_err(|e| ServerError::metadata(format!("failed fetching {url}: {e}")))?;

    let status = HttpStatusCode(response.status().as_u16());
    if !status.is_success() {
        return Err(ServerError::metadata(format!("HTTP {status} from {url}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| ServerError::metadata(format!("failed reading {url}: {e}")))?;

    parse_well_known(&body)
}
