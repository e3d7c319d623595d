//! # simcache-client: Typed Rust client for the simcache API
//!
//! Async access to a cache server: identifier derivation, existence
//! checks, listings, uploads, and downloads. The [`archive`] module builds
//! on these to push and fetch whole result directories.
//!
//! ## Retry Policy
//!
//! Every request goes through [`retry`]: transport failures and 5xx
//! responses are retried with exponential backoff, 4xx responses are not.
//! A 409 on upload is not an error; it becomes
//! [`UploadOutcome::AlreadyCached`].

pub mod archive;
pub mod config;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use types::{RemoteFile, UploadOutcome};

use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use simcache_core::{FileHandle, Identifier};
use tokio::io::AsyncWriteExt;

use crate::error::io_err;
use crate::types::{
    DeriveRequest, ErrorBody, ExistsResponse, FilesResponse, HealthResponse, IdentifierResponse,
    RunRequest, UploadResponse,
};

/// Cache server client. Cheap to clone; clones share one connection pool.
#[derive(Debug, Clone)]
pub struct CacheClient {
    http: reqwest::Client,
    base_url: String,
}

impl CacheClient {
    /// Create a client from configuration.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let mut headers = reqwest::header::HeaderMap::new();
        if let Some(token) = &config.auth_token {
            let mut value = reqwest::header::HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| ClientError::Config(ConfigError::InvalidToken))?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self {
            http,
            base_url: config.server_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Derive an identifier in-process, without contacting the server.
    ///
    /// Produces exactly what [`derive_identifier`](Self::derive_identifier)
    /// returns for the same arguments.
    pub fn local_identifier(
        tool_name: &str,
        revision: &str,
        inputs: &impl Serialize,
    ) -> Result<Identifier, ClientError> {
        Ok(Identifier::derive(tool_name, revision, inputs)?)
    }

    /// Ask the server to derive an identifier.
    ///
    /// Calls `POST /api/squid/id`.
    pub async fn derive_identifier<T: Serialize>(
        &self,
        tool_name: &str,
        revision: &str,
        inputs: &T,
    ) -> Result<Identifier, ClientError> {
        let endpoint = "POST /api/squid/id";
        let url = self.url("api/squid/id");
        let body = DeriveRequest {
            tool_name,
            revision,
            inputs,
        };
        let resp = self.execute(endpoint, || self.http.post(&url).json(&body)).await?;
        let resp: IdentifierResponse = decode(endpoint, check(endpoint, resp).await?).await?;
        Ok(resp.identifier)
    }

    /// Resolve an identifier from a JSON or YAML inputs document.
    ///
    /// Calls `POST /api/run`.
    pub async fn run(
        &self,
        tool_name: &str,
        revision: &str,
        inputs_text: &str,
    ) -> Result<Identifier, ClientError> {
        let endpoint = "POST /api/run";
        let url = self.url("api/run");
        let body = RunRequest {
            tool_name,
            revision,
            inputs: inputs_text,
        };
        let resp = self.execute(endpoint, || self.http.post(&url).json(&body)).await?;
        let resp: IdentifierResponse = decode(endpoint, check(endpoint, resp).await?).await?;
        Ok(resp.identifier)
    }

    /// Whether a complete entry exists for `identifier`.
    ///
    /// Calls `GET /api/squid/exists?identifier=...`.
    pub async fn exists(&self, identifier: &Identifier) -> Result<bool, ClientError> {
        let endpoint = "GET /api/squid/exists";
        let url = self.url("api/squid/exists");
        let query = [("identifier", identifier.to_string())];
        let resp = self.execute(endpoint, || self.http.get(&url).query(&query)).await?;
        let resp: ExistsResponse = decode(endpoint, check(endpoint, resp).await?).await?;
        Ok(resp.exists)
    }

    /// List the files of an entry, sorted by name.
    ///
    /// Calls `GET /api/squid/files?identifier=...`. An absent entry is an
    /// [`ClientError::Api`] with kind `EntryNotFound`.
    pub async fn list_files(&self, identifier: &Identifier) -> Result<Vec<RemoteFile>, ClientError> {
        let endpoint = "GET /api/squid/files";
        let url = self.url("api/squid/files");
        let query = [("identifier", identifier.to_string())];
        let resp = self.execute(endpoint, || self.http.get(&url).query(&query)).await?;
        let resp: FilesResponse = decode(endpoint, check(endpoint, resp).await?).await?;
        Ok(resp.files)
    }

    /// Download a whole file into memory.
    ///
    /// Calls `GET /api/files/{handle}`.
    pub async fn download(&self, handle: &FileHandle) -> Result<Bytes, ClientError> {
        let endpoint = format!("GET /api/files/{handle}");
        let url = self.url(&format!("api/files/{handle}"));
        let resp = self.execute(&endpoint, || self.http.get(&url)).await?;
        let resp = check(&endpoint, resp).await?;
        resp.bytes()
            .await
            .map_err(|e| ClientError::Http { endpoint, source: e })
    }

    /// Stream a file to `path`, creating parent directories.
    ///
    /// The body is written to a `.part` sibling and renamed into place, so
    /// `path` never holds a truncated download. Returns the bytes written.
    pub async fn download_to(&self, handle: &FileHandle, path: &Path) -> Result<u64, ClientError> {
        let endpoint = format!("GET /api/files/{handle}");
        let url = self.url(&format!("api/files/{handle}"));
        let resp = self.execute(&endpoint, || self.http.get(&url)).await?;
        let mut resp = check(&endpoint, resp).await?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(io_err("create directory", parent))?;
        }
        let mut part_name = path.as_os_str().to_owned();
        part_name.push(".part");
        let part_path = std::path::PathBuf::from(part_name);

        let mut file = tokio::fs::File::create(&part_path)
            .await
            .map_err(io_err("create", &part_path))?;
        let mut written = 0u64;
        let result = async {
            while let Some(chunk) = resp.chunk().await.map_err(|e| ClientError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })? {
                file.write_all(&chunk).await.map_err(io_err("write", &part_path))?;
                written += chunk.len() as u64;
            }
            file.flush().await.map_err(io_err("flush", &part_path))?;
            Ok::<(), ClientError>(())
        }
        .await;
        drop(file);

        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e);
        }
        tokio::fs::rename(&part_path, path)
            .await
            .map_err(io_err("rename", path))?;
        Ok(written)
    }

    /// Upload `files` as one entry under `identifier`.
    ///
    /// Calls `PUT /api/squid/files` with a multipart body. A 409 from the
    /// server means the entry was already published and is reported as
    /// [`UploadOutcome::AlreadyCached`].
    pub async fn upload(
        &self,
        identifier: &Identifier,
        files: &[(String, Bytes)],
    ) -> Result<UploadOutcome, ClientError> {
        let endpoint = "PUT /api/squid/files";
        let url = self.url("api/squid/files");
        let id_text = identifier.to_string();

        let build_form = || {
            files.iter().fold(
                Form::new().text("identifier", id_text.clone()),
                |form, (name, data)| {
                    form.part("files", Part::bytes(data.to_vec()).file_name(name.clone()))
                },
            )
        };
        let resp = self
            .execute(endpoint, || self.http.put(&url).multipart(build_form()))
            .await?;

        if resp.status() == StatusCode::CONFLICT {
            tracing::debug!(identifier = %identifier, "entry already cached");
            return Ok(UploadOutcome::AlreadyCached);
        }
        let resp: UploadResponse = decode(endpoint, check(endpoint, resp).await?).await?;
        Ok(UploadOutcome::Stored {
            count: resp.count,
            total_bytes: resp.total_bytes,
        })
    }

    /// Liveness probe. Returns the server's reported status.
    ///
    /// Calls `GET /health`.
    pub async fn health(&self) -> Result<String, ClientError> {
        let endpoint = "GET /health";
        let url = self.url("health");
        let resp = self.execute(endpoint, || self.http.get(&url)).await?;
        let resp: HealthResponse = decode(endpoint, check(endpoint, resp).await?).await?;
        Ok(resp.status)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn execute<B>(&self, endpoint: &str, build: B) -> Result<reqwest::Response, ClientError>
    where
        B: Fn() -> reqwest::RequestBuilder,
    {
        retry::retry_send(|| build().send())
            .await
            .map_err(|e| ClientError::Http {
                endpoint: endpoint.to_string(),
                source: e,
            })
    }
}

/// Pass a success response through; turn anything else into `ClientError::Api`.
async fn check(endpoint: &str, resp: reqwest::Response) -> Result<reqwest::Response, ClientError> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ErrorBody>(&body) {
        Ok(parsed) => (parsed.error.code, parsed.error.message),
        Err(_) => (format!("HTTP_{status}"), body),
    };
    Err(ClientError::Api {
        endpoint: endpoint.to_string(),
        status,
        code,
        message,
    })
}

async fn decode<T: DeserializeOwned>(endpoint: &str, resp: reqwest::Response) -> Result<T, ClientError> {
    resp.json().await.map_err(|e| ClientError::Deserialization {
        endpoint: endpoint.to_string(),
        source: e,
    })
}
