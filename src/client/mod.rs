pub mod cleanup;
pub mod http;
pub mod submitter;

use std::path::PathBuf;

use reqwest::Url;
use thiserror::Error;

use crate::models::{ClassificationResult, UploadRequest};

pub const UPLOAD_FAILED: &str = "Upload failed. Please try again.";
pub const LINK_FAILED: &str = "Failed to process YouTube URL. Please try again.";
pub const DELETE_FAILED: &str = "Failed to delete the uploaded file.";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not reach the classification service: {0}")]
    Connection(String),
    #[error("server returned {status}: {message}")]
    Server { status: u16, message: String },
    #[error("unexpected response from server: {0}")]
    Decode(String),
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ClientError {
    /// 서버가 보낸 오류 메시지. 없으면 None.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Server { message, .. } if !message.is_empty() => Some(message),
            _ => None,
        }
    }
}

/// `{base_url}/{route}/{filename}`. The filename is encoded as a single path
/// segment, so names with `#`, `?` or `/` cannot address another resource.
pub fn file_url(base_url: &str, route: &str, filename: &str) -> Result<Url, ClientError> {
    let invalid = || ClientError::Connection(format!("invalid server URL {base_url}"));
    let mut url = Url::parse(base_url).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .push(route)
        .push(filename);
    Ok(url)
}

/// 분류 서비스와의 통신을 추상화하는 트레이트.
/// 실제 HTTP 구현과 테스트용 스텁이 이 트레이트를 구현한다.
pub trait Transport: Send + Sync {
    /// `POST /upload` 멀티파트 요청을 보내고 분류 결과를 받는다.
    fn upload(&self, request: &UploadRequest) -> Result<ClassificationResult, ClientError>;
    /// `DELETE /delete/{filename}`. 서버의 확인 메시지를 반환한다.
    fn delete(&self, filename: &str) -> Result<String, ClientError>;
    /// `GET /uploads/{filename}` 오디오 바이트.
    fn fetch_audio(&self, filename: &str) -> Result<Vec<u8>, ClientError>;
    /// 커버 이미지 같은 임의의 절대 URL을 가져온다.
    fn fetch_url(&self, url: &str) -> Result<Vec<u8>, ClientError>;
    /// `GET /health`. 서버 상태 문자열을 반환한다.
    fn health(&self) -> Result<String, ClientError>;
    /// Root URL of the service, used to build playback links.
    fn base_url(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod stub {
    use std::sync::Mutex;

    use super::*;

    /// In-memory transport that records every call.
    pub struct StubTransport {
        pub upload_response: Mutex<Option<Result<ClassificationResult, ClientError>>>,
        pub delete_status: Option<u16>,
        pub calls: Mutex<Vec<String>>,
    }

    impl StubTransport {
        pub fn returning(result: ClassificationResult) -> Self {
            Self {
                upload_response: Mutex::new(Some(Ok(result))),
                delete_status: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_upload(error: ClientError) -> Self {
            Self {
                upload_response: Mutex::new(Some(Err(error))),
                delete_status: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_delete_status(mut self, status: u16) -> Self {
            self.delete_status = Some(status);
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl Transport for StubTransport {
        fn upload(&self, request: &UploadRequest) -> Result<ClassificationResult, ClientError> {
            self.record(format!("upload {}", request.describe()));
            self.upload_response
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Err(ClientError::Connection("no response queued".into())))
        }

        fn delete(&self, filename: &str) -> Result<String, ClientError> {
            self.record(format!("delete {}", filename));
            match self.delete_status {
                Some(status) => Err(ClientError::Server {
                    status,
                    message: String::new(),
                }),
                None => Ok(format!("File {} deleted successfully.", filename)),
            }
        }

        fn fetch_audio(&self, filename: &str) -> Result<Vec<u8>, ClientError> {
            self.record(format!("audio {}", filename));
            Ok(b"ID3".to_vec())
        }

        fn fetch_url(&self, url: &str) -> Result<Vec<u8>, ClientError> {
            self.record(format!("get {}", url));
            Err(ClientError::Server {
                status: 404,
                message: String::new(),
            })
        }

        fn health(&self) -> Result<String, ClientError> {
            self.record("health".to_string());
            Ok("running".to_string())
        }

        fn base_url(&self) -> &str {
            "http://stub"
        }
    }
}
