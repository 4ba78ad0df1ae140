use std::ffi::OsString;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, warn};
use url::Url;

use super::error::BoxError;
use super::http::{ChunkStream, HttpRequest};
use super::{HttpError, VonageClient, VonageError, bearer};
use crate::domain::{HttpMethod, ResponseSnapshot};

/// Registrable domains that media may be downloaded from, besides the
/// configured hosts.
const VENDOR_DOMAINS: [&str; 2] = ["nexmo.com", "vonage.com"];
const WRITE_BUFFER_SIZE: usize = 8 * 1024;

impl VonageClient {
    /// Download a media artifact (e.g. a call recording) to `destination`.
    ///
    /// The URL must be `https` on a Vonage host; anything else is rejected
    /// without sending a request. The body is streamed to disk, and nothing
    /// is left at `destination` unless the download completed.
    pub async fn download(
        &self,
        url: &str,
        destination: impl AsRef<Path>,
    ) -> Result<(), VonageError> {
        let destination = destination.as_ref();
        let url = self.download_url(url)?;
        let token = self.auth.generate_application_jwt(None)?;

        let request = HttpRequest {
            method: HttpMethod::Get,
            url,
            headers: vec![
                ("User-Agent".to_owned(), self.user_agent.clone()),
                bearer(&token),
            ],
            body: Bytes::new(),
        };
        debug!(url = %request.url, destination = %destination.display(), "downloading");

        let response = match self.http.open(&request).await {
            Ok(response) => response,
            Err(source) => {
                let err = HttpError::transport(request.url.as_str(), source);
                self.record(request.snapshot(), None);
                return Err(err.into());
            }
        };

        if !(200..=299).contains(&response.status) {
            let response = match response.into_snapshot().await {
                Ok(response) => response,
                Err(source) => {
                    self.record(request.snapshot(), None);
                    return Err(HttpError::transport(request.url.as_str(), source).into());
                }
            };
            let err = HttpError::from_response(response.clone());
            self.record(request.snapshot(), Some(response));
            return Err(err.into());
        }

        let head = ResponseSnapshot {
            status: response.status,
            url: response.url,
            headers: response.headers,
            body: Bytes::new(),
        };
        let written = stream_to_file(response.body, destination).await;
        self.record(request.snapshot(), Some(head.clone()));
        match written {
            Ok(bytes) => {
                debug!(bytes, destination = %destination.display(), "download complete");
                Ok(())
            }
            Err(source) => Err(HttpError::request_failed(
                format!(
                    "failed to download {} to {}: {source}",
                    head.url,
                    destination.display()
                ),
                Some(head),
                Some(source),
            )
            .into()),
        }
    }

    fn download_url(&self, raw: &str) -> Result<Url, HttpError> {
        let url = Url::parse(raw).map_err(|err| {
            HttpError::request_failed(
                format!("invalid download URL {raw}"),
                None,
                Some(err.into()),
            )
        })?;

        let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
        let vendor_host = VENDOR_DOMAINS
            .iter()
            .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")));
        if url.scheme() != "https" || !(vendor_host || self.is_configured_host(&host)) {
            warn!(url = %raw, "refusing to download from a non-Vonage URL");
            return Err(HttpError::request_failed(
                format!("refusing to download from {raw}: not an https Vonage URL"),
                None,
                None,
            ));
        }
        Ok(url)
    }
}

/// `destination` with `.part` appended to its file name.
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}

/// Write every chunk to a sibling `.part` file, then move it over
/// `destination`. The `.part` file is removed on failure.
async fn stream_to_file(
    mut body: Box<dyn ChunkStream>,
    destination: &Path,
) -> Result<u64, BoxError> {
    let partial = partial_path(destination);
    let result = async {
        let file = tokio::fs::File::create(&partial).await?;
        let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
        let mut written = 0u64;
        while let Some(chunk) = body.next_chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        drop(writer);
        tokio::fs::rename(&partial, destination).await?;
        Ok::<_, BoxError>(written)
    }
    .await;

    if result.is_err() {
        if let Err(err) = tokio::fs::remove_file(&partial).await {
            debug!(path = %partial.display(), error = %err, "no partial download to remove");
        }
    }
    result
}
