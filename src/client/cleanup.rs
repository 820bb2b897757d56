use std::sync::Arc;

use log::{info, warn};

use crate::client::{ClientError, Transport, DELETE_FAILED};
use crate::core::controller::Controller;

/// Deletes server-side artifacts for discarded results.
#[derive(Clone)]
pub struct CleanupHandler {
    transport: Arc<dyn Transport>,
}

impl CleanupHandler {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// `DELETE /delete/{filename}`. 실패해도 치명적이지 않다.
    pub fn delete(&self, filename: &str) -> Result<String, ClientError> {
        match self.transport.delete(filename) {
            Ok(message) => {
                info!("cleanup: {}", message);
                Ok(message)
            }
            Err(e) => {
                warn!("cleanup of {} failed: {}", filename, e);
                Err(e)
            }
        }
    }

    /// Same as [`CleanupHandler::delete`] but with the error already turned
    /// into the message shown to the user.
    pub fn discard(&self, filename: &str) -> Result<(), String> {
        self.delete(filename).map(|_| ()).map_err(|e| user_message(&e))
    }

    /// Synchronous reset: delete first, then clear local state.
    pub fn reset(&self, controller: &mut Controller) {
        if let Some(filename) = controller.request_reset() {
            let outcome = self.discard(&filename);
            controller.cleanup_finished(outcome);
        }
    }
}

pub fn user_message(err: &ClientError) -> String {
    err.server_message().unwrap_or(DELETE_FAILED).to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::client::stub::StubTransport;
    use crate::core::controller::{Pacing, StateKind, UploadMethod};
    use crate::models::{ClassificationResult, Genre};

    fn sample_result() -> ClassificationResult {
        ClassificationResult {
            song_name: "Test".to_string(),
            artist: "Tester".to_string(),
            cover_image_url: String::new(),
            genres: vec![Genre {
                name: "Rock".to_string(),
                confidence: 80.0,
            }],
            filename: "abc.mp3".to_string(),
        }
    }

    fn controller_with_results() -> Controller {
        let now = Instant::now();
        let mut c = Controller::new(Pacing::IMMEDIATE);
        c.choose(UploadMethod::File);
        let ticket = c.begin_upload().unwrap();
        c.upload_succeeded(ticket, sample_result(), now);
        c.mark_prepared(ticket);
        c.tick(now);
        assert_eq!(c.kind(), StateKind::Results);
        c
    }

    #[test]
    fn test_reset_deletes_then_clears() {
        let stub = Arc::new(StubTransport::returning(sample_result()));
        let handler = CleanupHandler::new(stub.clone());
        let mut c = controller_with_results();

        handler.reset(&mut c);
        assert_eq!(stub.calls(), vec!["delete abc.mp3".to_string()]);
        assert_eq!(c.kind(), StateKind::Initial);
        assert_eq!(c.result(), None);
        assert_eq!(c.error(), None);
    }

    #[test]
    fn test_delete_500_still_resets_with_one_message() {
        let stub = Arc::new(StubTransport::returning(sample_result()).with_delete_status(500));
        let handler = CleanupHandler::new(stub.clone());
        let mut c = controller_with_results();

        handler.reset(&mut c);
        assert_eq!(c.kind(), StateKind::Initial);
        assert_eq!(c.result(), None);
        assert_eq!(c.error(), Some(DELETE_FAILED));

        // A second reset from Initial neither deletes again nor repeats the error.
        handler.reset(&mut c);
        assert_eq!(stub.calls().len(), 1);
        assert_eq!(c.error(), None);
    }

    #[test]
    fn test_server_delete_message_preferred() {
        let err = ClientError::Server {
            status: 404,
            message: "File does not exist.".to_string(),
        };
        assert_eq!(user_message(&err), "File does not exist.");
        assert_eq!(
            user_message(&ClientError::Decode("eof".to_string())),
            DELETE_FAILED
        );
    }
}
