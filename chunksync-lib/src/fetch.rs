//! Chunk fetch collaborators.
//!
//! A [`ChunkFetcher`] turns a resolved chunk URL into decoded samples. Calls
//! block; the cache orchestrator runs each one on its own thread.

use log::debug;
use std::io::Read;
use std::time::Duration;

use crate::audio::buffer::ChunkBuffer;
use crate::audio::decode::decode_chunk;
use crate::error::FetchError;

/// Fetch and decode one chunk.
pub trait ChunkFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<ChunkBuffer, FetchError>;
}

impl<F> ChunkFetcher for F
where
    F: Fn(&str) -> Result<ChunkBuffer, FetchError> + Send + Sync,
{
    fn fetch(&self, url: &str) -> Result<ChunkBuffer, FetchError> {
        self(url)
    }
}

/// Fetcher reading `http(s)://` URLs over the network and `file://` URLs or
/// plain paths from disk, decoding with symphonia.
pub struct DecodingFetcher {
    agent: ureq::Agent,
}

impl DecodingFetcher {
    pub fn new() -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(Duration::from_secs(15))
            .build();
        Self { agent }
    }

    fn read_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        if url.starts_with("http://") || url.starts_with("https://") {
            let response = self.agent.get(url).call().map_err(|err| match err {
                ureq::Error::Status(code, _) => {
                    FetchError::Http(format!("{} returned status {}", url, code))
                }
                ureq::Error::Transport(transport) => FetchError::Http(transport.to_string()),
            })?;
            let mut bytes = Vec::new();
            response.into_reader().read_to_end(&mut bytes)?;
            return Ok(bytes);
        }

        let path = url.strip_prefix("file://").unwrap_or(url);
        Ok(std::fs::read(strip_query(path))?)
    }
}

impl Default for DecodingFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkFetcher for DecodingFetcher {
    fn fetch(&self, url: &str) -> Result<ChunkBuffer, FetchError> {
        let bytes = self.read_bytes(url)?;
        debug!("fetched {} bytes from {}", bytes.len(), url);
        decode_chunk(bytes, extension_hint(url).as_deref())
    }
}

fn strip_query(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// File extension of the URL's path component, used as a probe hint.
fn extension_hint(url: &str) -> Option<String> {
    let path = strip_query(url);
    let file_name = path.rsplit('/').next()?;
    let (_, extension) = file_name.rsplit_once('.')?;
    if extension.is_empty() {
        return None;
    }
    Some(extension.to_ascii_lowercase())
}
