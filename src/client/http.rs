use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, warn};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};

use crate::client::{file_url, ClientError, Transport};
use crate::config::ServerConfig;
use crate::models::{
    audio_mime, ClassificationResult, ErrorBody, HealthStatus, MessageBody, UploadRequest,
    UploadSource,
};

/// 분류 서비스 HTTP 클라이언트.
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("genrescope/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("HTTP 클라이언트 생성에 실패했습니다")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn build_form(request: &UploadRequest) -> Result<Form, ClientError> {
        let form = Form::new()
            .text("song_name", request.song_name.clone())
            .text("artist", request.artist.clone());

        match &request.source {
            UploadSource::Link(url) => Ok(form.text("url", url.clone())),
            UploadSource::File(path) => {
                let data = std::fs::read(path).map_err(|source| ClientError::Io {
                    path: path.clone(),
                    source,
                })?;
                let filename = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("upload")
                    .to_string();
                let part = Part::bytes(data)
                    .file_name(filename)
                    .mime_str(audio_mime(path))
                    .map_err(connection_error)?;
                Ok(form.part("file", part))
            }
        }
    }
}

fn connection_error(err: reqwest::Error) -> ClientError {
    ClientError::Connection(err.to_string())
}

/// 실패 응답이면 `{ "error": ... }` 본문을 읽어 ClientError로 바꾼다.
fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.error)
        .unwrap_or_default();
    warn!("server returned {}: {}", status, body.trim());
    Err(ClientError::Server {
        status: status.as_u16(),
        message,
    })
}

fn read_bytes(response: Response) -> Result<Vec<u8>, ClientError> {
    let response = check_status(response)?;
    Ok(response.bytes().map_err(connection_error)?.to_vec())
}

impl Transport for HttpTransport {
    fn upload(&self, request: &UploadRequest) -> Result<ClassificationResult, ClientError> {
        let form = Self::build_form(request)?;
        debug!("POST /upload ({})", request.describe());

        let response = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .map_err(connection_error)?;

        check_status(response)?
            .json::<ClassificationResult>()
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    fn delete(&self, filename: &str) -> Result<String, ClientError> {
        debug!("DELETE /delete/{}", filename);
        let response = self
            .client
            .delete(file_url(&self.base_url, "delete", filename)?)
            .send()
            .map_err(connection_error)?;

        let body: MessageBody = check_status(response)?
            .json()
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(body.message)
    }

    fn fetch_audio(&self, filename: &str) -> Result<Vec<u8>, ClientError> {
        debug!("GET /uploads/{}", filename);
        let response = self
            .client
            .get(file_url(&self.base_url, "uploads", filename)?)
            .send()
            .map_err(connection_error)?;
        read_bytes(response)
    }

    fn fetch_url(&self, url: &str) -> Result<Vec<u8>, ClientError> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().map_err(connection_error)?;
        read_bytes(response)
    }

    fn health(&self) -> Result<String, ClientError> {
        let response = self
            .client
            .get(self.url("/health"))
            .send()
            .map_err(connection_error)?;
        let body: HealthStatus = check_status(response)?
            .json()
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(body.status)
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base_url: &str) -> HttpTransport {
        HttpTransport::new(&ServerConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
        })
        .expect("HttpTransport 생성 실패")
    }

    #[test]
    fn test_base_url_is_normalized() {
        let t = transport("http://127.0.0.1:5001/");
        assert_eq!(t.base_url(), "http://127.0.0.1:5001");
        assert_eq!(t.url("/upload"), "http://127.0.0.1:5001/upload");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let request = UploadRequest {
            source: UploadSource::File("/definitely/not/here.mp3".into()),
            song_name: "Test".to_string(),
            artist: "Tester".to_string(),
        };
        match HttpTransport::build_form(&request) {
            Err(ClientError::Io { path, .. }) => {
                assert_eq!(path, std::path::PathBuf::from("/definitely/not/here.mp3"))
            }
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("form built for a missing file"),
        }
    }

    /// 실제 서비스가 필요하므로 기본 테스트에서는 제외한다.
    /// 실행: cargo test health -- --ignored
    #[test]
    #[ignore]
    fn test_health_against_local_service() {
        let status = transport("http://127.0.0.1:5001").health().expect("health 실패");
        assert_eq!(status, "running");
    }
}
