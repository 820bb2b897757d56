use std::sync::Arc;

use log::{info, warn};
use thiserror::Error;

use crate::client::{ClientError, Transport, LINK_FAILED, UPLOAD_FAILED};
use crate::core::validation::{self, LinkPolicy, ValidationError};
use crate::models::{is_supported_audio, ClassificationResult, UploadDraft, UploadRequest, UploadSource};

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("{source}")]
    Client {
        source: ClientError,
        /// The request carried a link rather than a file.
        link: bool,
    },
}

impl SubmitError {
    /// Text shown to the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            SubmitError::Invalid(e) => e.to_string(),
            SubmitError::Client { source, link } => {
                let fallback = if *link { LINK_FAILED } else { UPLOAD_FAILED };
                source.server_message().unwrap_or(fallback).to_string()
            }
        }
    }
}

/// Packages upload forms and sends them through a [`Transport`].
#[derive(Clone)]
pub struct Submitter {
    transport: Arc<dyn Transport>,
    policy: LinkPolicy,
}

impl Submitter {
    pub fn new(transport: Arc<dyn Transport>, policy: LinkPolicy) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> LinkPolicy {
        self.policy
    }

    /// 로컬 검증만 수행한다. 네트워크 호출은 없다.
    pub fn prepare(&self, draft: &UploadDraft) -> Result<UploadRequest, ValidationError> {
        let request = validation::validate_draft(draft, self.policy)?;
        if let UploadSource::File(path) = &request.source {
            if !is_supported_audio(path) {
                warn!(
                    "{} is not an mp3/wav/ogg file; the server may reject it",
                    path.display()
                );
            }
        }
        Ok(request)
    }

    pub fn send(&self, request: &UploadRequest) -> Result<ClassificationResult, SubmitError> {
        info!("uploading {}", request.describe());
        match self.transport.upload(request) {
            Ok(r) => {
                info!("classified: {}", r.summary());
                Ok(r)
            }
            Err(e) => {
                warn!("upload failed: {}", e);
                Err(SubmitError::Client {
                    source: e,
                    link: matches!(request.source, UploadSource::Link(_)),
                })
            }
        }
    }
}
