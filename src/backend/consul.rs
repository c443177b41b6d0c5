//! Consul KV store backend.

use std::env;
use std::net::IpAddr;

use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use tracing::debug;

use super::{option_bool, option_string, Backend, BackendError, Options, Values};
use crate::config::KeyMap;

const VALID_OPTIONS: &[&str] = &["address", "token", "ssl", "verify_ssl"];

const DEFAULT_ADDRESS: &str = "127.0.0.1:8500";
const ADDRESS_ENV: &str = "CONSUL_HTTP_ADDR";
const TOKEN_ENV: &str = "CONSUL_HTTP_TOKEN";
const TOKEN_HEADER: &str = "X-Consul-Token";

/// An absent key and a key hidden by ACLs look the same to the KV API.
const MISSING_HINT: &str = "have you specified the necessary token?";

/// Resolves physical keys as paths in a Consul KV namespace.
///
/// Missing keys are always an error.
#[derive(Debug, Clone, Default)]
pub struct ConsulBackend {
    address: Option<String>,
    token: Option<String>,
    ssl: Option<bool>,
    verify_ssl: Option<bool>,
}

impl ConsulBackend {
    pub fn from_options(options: &Options) -> Result<Self, BackendError> {
        let mut backend = Self::default();

        for (name, value) in options {
            match name.as_str() {
                "address" => backend.address = Some(option_string(name, value)?),
                "token" => backend.token = Some(option_string(name, value)?),
                "ssl" => backend.ssl = Some(option_bool(name, value)?),
                "verify_ssl" => backend.verify_ssl = Some(option_bool(name, value)?),
                other => return Err(BackendError::unknown_option(other, VALID_OPTIONS)),
            }
        }

        Ok(backend)
    }

    /// Base URL of the KV endpoint.
    fn base_url(&self) -> Result<Url, BackendError> {
        let address = self
            .address
            .clone()
            .filter(|a| !a.is_empty())
            .or_else(|| env::var(ADDRESS_ENV).ok().filter(|a| !a.is_empty()))
            .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());

        let (scheme, host) = match address.split_once("://") {
            Some((scheme, host)) => (scheme.to_string(), host.to_string()),
            None => ("http".to_string(), address),
        };
        let scheme = match self.ssl {
            Some(true) => "https".to_string(),
            Some(false) => "http".to_string(),
            None => scheme,
        };

        let raw = format!("{scheme}://{}/v1/kv", host.trim_end_matches('/'));
        Url::parse(&raw).map_err(|e| BackendError::InvalidAddress {
            address: raw,
            reason: e.to_string(),
        })
    }

    fn token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| env::var(TOKEN_ENV).ok())
            .filter(|t| !t.is_empty())
    }

    fn client(&self, base: &Url) -> Result<Client, BackendError> {
        let mut builder =
            Client::builder().danger_accept_invalid_certs(!self.verify_ssl.unwrap_or(true));

        // Loopback agents are never reached through a proxy.
        if is_loopback(base) {
            builder = builder.no_proxy();
        }

        builder.build().map_err(BackendError::Client)
    }

    /// Each path segment of `key` is percent-encoded, so reserved
    /// characters never leak into the query or fragment.
    fn key_url(base: &Url, key: &str) -> Result<Url, BackendError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|()| BackendError::InvalidAddress {
                address: base.to_string(),
                reason: "address cannot carry a path".to_string(),
            })?
            .extend(key.trim_start_matches('/').split('/'));
        url.set_query(Some("raw"));
        Ok(url)
    }

    fn fetch(&self, client: &Client, base: &Url, key: &str) -> Result<String, BackendError> {
        let url = Self::key_url(base, key)?;
        let mut request = client.get(url);
        if let Some(token) = self.token() {
            request = request.header(TOKEN_HEADER, token);
        }

        let request_error = |source| BackendError::Request {
            key: key.to_string(),
            source,
        };

        let response = request.send().map_err(request_error)?;
        match response.status() {
            StatusCode::OK => {
                let body = response.bytes().map_err(request_error)?;
                String::from_utf8(body.to_vec()).map_err(|source| BackendError::InvalidUtf8 {
                    key: key.to_string(),
                    source,
                })
            }
            StatusCode::NOT_FOUND => Err(BackendError::MissingValue {
                key: key.to_string(),
                hint: Some(MISSING_HINT),
            }),
            status => Err(BackendError::Status {
                key: key.to_string(),
                status,
            }),
        }
    }
}

fn is_loopback(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };

    host.eq_ignore_ascii_case("localhost")
        || host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok_and(|ip| ip.is_loopback())
}

impl Backend for ConsulBackend {
    fn resolve(&self, requested: &KeyMap) -> Result<Values, BackendError> {
        let base = self.base_url()?;
        let client = self.client(&base)?;
        let mut values = Values::new();

        for (logical, path) in requested {
            let value = self.fetch(&client, &base, path)?;
            debug!(key = %path, "fetched value from consul");
            values.insert(logical.clone(), value);
        }

        Ok(values)
    }
}
