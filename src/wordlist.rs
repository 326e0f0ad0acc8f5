//! Client for the word-list endpoints of the model server.
//!
//! The server keeps one active banned-word list per model. These calls only
//! manage that list; censorship itself happens server-side or through
//! [`crate::filter::BannedWordFilter`].

use std::path::{Path, PathBuf};

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::llm::{build_http_client, ClientConfig};

#[derive(Debug, Serialize)]
struct LoadListRequest<'a> {
    model: &'a str,
    list: &'a str,
}

#[derive(Debug, Serialize)]
struct WordRequest<'a> {
    word: &'a str,
}

/// Expand `~` and environment variables, then require an existing file.
///
/// Returns the absolute path.
pub fn resolve_list_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path.trim()).map_err(|_| Error::PathInvalid {
        path: PathBuf::from(path),
    })?;
    let candidate = Path::new(expanded.as_ref());

    if !candidate.is_file() {
        return Err(Error::PathInvalid {
            path: candidate.to_path_buf(),
        });
    }

    candidate.canonicalize().map_err(|_| Error::PathInvalid {
        path: candidate.to_path_buf(),
    })
}

/// Word-list management client.
pub struct WordListClient {
    base_url: String,
    http: Client,
}

impl WordListClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            http: build_http_client(config.timeout_secs),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Bind a word-list file to a model. Returns the absolute path sent.
    pub async fn load_list(&self, path: &str, model: &str) -> Result<PathBuf> {
        let resolved = resolve_list_path(path)?;
        let list = resolved.to_string_lossy();

        self.post("/api/loadlist", &LoadListRequest { model, list: &list })
            .await?;
        info!(model, list = %list, "word list loaded");
        Ok(resolved)
    }

    pub async fn add_word(&self, word: &str) -> Result<()> {
        self.post("/api/addword", &WordRequest { word }).await?;
        debug!(word, "word added");
        Ok(())
    }

    pub async fn remove_word(&self, word: &str) -> Result<()> {
        self.post("/api/removeword", &WordRequest { word }).await?;
        debug!(word, "word removed");
        Ok(())
    }

    async fn post<T: Serialize>(&self, path: &str, payload: &T) -> Result<()> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(payload)
            .send()
            .await
            .map_err(|e| Error::word_list(None, format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|e| unreadable_body(&e));
        Err(Error::word_list(Some(status.as_u16()), body))
    }
}

fn unreadable_body(error: &reqwest::Error) -> String {
    format!("<failed to read response body: {}>", error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_request_payloads() {
        let load = serde_json::to_value(LoadListRequest {
            model: "llama2",
            list: "/tmp/liste.txt",
        })
        .unwrap();
        assert_eq!(load, serde_json::json!({"model": "llama2", "list": "/tmp/liste.txt"}));

        let word = serde_json::to_value(WordRequest { word: "crétin" }).unwrap();
        assert_eq!(word, serde_json::json!({"word": "crétin"}));
    }

    #[tokio::test]
    async fn test_truncated_error_body_is_reported() {
        // Server announces more body than it sends, then hangs up
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            // Read through the JSON body before answering
            while !request.ends_with(b"}") {
                match std::io::Read::read(&mut stream, &mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            stream
                .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\n\r\nshort")
                .unwrap();
        });

        let client = WordListClient {
            base_url: format!("http://{}", addr),
            http: Client::builder().no_proxy().build().unwrap(),
        };
        let err = client.add_word("crétin").await.unwrap_err();
        server.join().unwrap();

        match err {
            Error::WordList { status, body } => {
                assert_eq!(status, Some(500));
                assert!(body.starts_with("<failed to read response body: "), "{}", body);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_resolve_existing_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "idiot").unwrap();

        let resolved = resolve_list_path(&file.path().to_string_lossy()).unwrap();
        assert!(resolved.is_absolute());
        assert_eq!(resolved, file.path().canonicalize().unwrap());
    }

    #[test]
    fn test_resolve_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.txt");

        let err = resolve_list_path(&missing.to_string_lossy()).unwrap_err();
        assert!(matches!(err, Error::PathInvalid { path } if path == missing));
    }

    #[test]
    fn test_directory_is_not_a_list() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_list_path(&dir.path().to_string_lossy()).unwrap_err();
        assert!(matches!(err, Error::PathInvalid { .. }));
    }

    #[tokio::test]
    async fn test_load_list_checks_path_before_request() {
        let client = WordListClient::new(&ClientConfig::new().with_base_url("127.0.0.1:9"));
        let err = client
            .load_list("/definitely/not/here/liste.txt", "llama2")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PathInvalid { .. }));
        assert_eq!(client.base_url(), "http://127.0.0.1:9");
    }
}
