//! Request handling for the upload endpoint

use chrono::{DateTime, Local};
use std::path::PathBuf;

use super::envelope::{UploadEnvelope, UploadResponse};
use super::store::BatchStore;
use super::UploadError;
use crate::bridge::{LogLine, NotifierBridge};

/// Message returned to the phone after a batch is saved
pub const SUCCESS_MESSAGE: &str = "Data saved on PC";

/// HTTP status and JSON body for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    pub status: u16,
    pub response: UploadResponse,
}

impl UploadOutcome {
    fn saved() -> Self {
        Self {
            status: 200,
            response: UploadResponse::success(SUCCESS_MESSAGE),
        }
    }

    fn failed(error: &UploadError) -> Self {
        Self {
            status: 500,
            response: UploadResponse::error(error.to_string()),
        }
    }

    /// Request for a path other than the upload endpoint
    pub fn not_found(path: &str) -> Self {
        Self {
            status: 404,
            response: UploadResponse::error(format!("No endpoint at {}", path)),
        }
    }

    /// Upload endpoint hit with something other than POST
    pub fn method_not_allowed(method: &str) -> Self {
        Self {
            status: 405,
            response: UploadResponse::error(format!("Method {} not allowed, use POST", method)),
        }
    }
}

struct SavedBatch {
    kind: String,
    count: usize,
    path: PathBuf,
}

/// Turns request bodies into saved batches plus exactly one bridge line each
#[derive(Debug, Clone)]
pub struct UploadHandler {
    store: BatchStore,
    bridge: NotifierBridge,
}

impl UploadHandler {
    pub fn new(store: BatchStore, bridge: NotifierBridge) -> Self {
        Self { store, bridge }
    }

    #[cfg(test)]
    pub(crate) fn store(&self) -> &BatchStore {
        &self.store
    }

    /// Handle a request body, stamping the batch with the current time
    pub fn receive(&self, body: &[u8]) -> UploadOutcome {
        self.receive_at(body, Local::now())
    }

    /// Handle a request body received at `at`
    pub fn receive_at(&self, body: &[u8], at: DateTime<Local>) -> UploadOutcome {
        let result = self.save(body, &at);
        self.report(result)
    }

    /// Fail a request whose body never made it into a buffer
    pub fn reject(&self, error: UploadError) -> UploadOutcome {
        self.report(Err(error))
    }

    fn save(&self, body: &[u8], at: &DateTime<Local>) -> Result<SavedBatch, UploadError> {
        let envelope = UploadEnvelope::parse(body)?;
        let path = self.store.write(envelope.kind(), envelope.items(), at)?;
        Ok(SavedBatch {
            kind: envelope.kind().to_string(),
            count: envelope.items().len(),
            path,
        })
    }

    fn report(&self, result: Result<SavedBatch, UploadError>) -> UploadOutcome {
        match result {
            Ok(batch) => {
                log::info!(
                    "Saved {} item(s) of type '{}' to {}",
                    batch.count,
                    batch.kind,
                    batch.path.display()
                );
                self.bridge
                    .enqueue(LogLine::received(&batch.kind, batch.count, &batch.path));
                UploadOutcome::saved()
            }
            Err(e) => {
                log::warn!("Upload failed: {}", e);
                self.bridge.enqueue(LogLine::error(&e));
                UploadOutcome::failed(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use std::fs;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn handler() -> (TempDir, UploadHandler, NotifierBridge) {
        let root = tempfile::tempdir().unwrap();
        let store = BatchStore::open(root.path().join("out")).unwrap();
        let bridge = NotifierBridge::new();
        (root, UploadHandler::new(store, bridge.clone()), bridge)
    }

    fn files_in(handler: &UploadHandler) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(handler.store().dir())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        files.sort();
        files
    }

    fn read_items(path: &PathBuf) -> Vec<Value> {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn test_successful_upload() {
        let (_root, handler, bridge) = handler();
        let items = json!([{"name": "Zażółć gęślą jaźń"}, {"name": "Bob", "tags": [1, 2]}, null]);
        let body = json!({"type": "contacts", "payload": items.clone()}).to_string();

        let outcome = handler.receive(body.as_bytes());
        assert_eq!(outcome.status, 200);
        assert_eq!(outcome.response, UploadResponse::success(SUCCESS_MESSAGE));

        let files = files_in(&handler);
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("contacts_") && name.ends_with(".json"), "{}", name);
        assert_eq!(Value::Array(read_items(&files[0])), items);
        assert!(fs::read_to_string(&files[0]).unwrap().contains("Zażółć gęślą jaźń"));

        let lines = bridge.drain_all();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_received());
        assert!(lines[0].as_str().contains("type=contacts"));
        assert!(lines[0].as_str().contains("count=3"));
        assert!(lines[0].as_str().contains(&format!("saved={}", files[0].display())));
    }

    #[test]
    fn test_defaults_write_empty_array() {
        let (_root, handler, bridge) = handler();
        let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let outcome = handler.receive_at(b"{}", at);
        assert_eq!(outcome.status, 200);

        let files = files_in(&handler);
        assert_eq!(files, vec![handler.store().dir().join("unknown_2024-05-01_12-00-00.json")]);
        assert_eq!(fs::read_to_string(&files[0]).unwrap(), "[]");

        let lines = bridge.drain_all();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].as_str().contains("type=unknown count=0"));
    }

    #[test]
    fn test_same_second_same_kind() {
        let (_root, handler, bridge) = handler();
        let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        handler.receive_at(br#"{"type":"sms","payload":[1]}"#, at);
        handler.receive_at(br#"{"type":"sms","payload":[2,3]}"#, at);

        let files = files_in(&handler);
        assert_eq!(files.len(), 1);
        assert_eq!(read_items(&files[0]), vec![json!(2), json!(3)]);
        assert_eq!(bridge.drain_all().len(), 2);
    }

    #[test]
    fn test_malformed_body() {
        let (_root, handler, bridge) = handler();
        let bodies: [&[u8]; 3] = [b"{not json", b"[1,2]", br#"{"payload": 5}"#];
        for body in bodies {
            let outcome = handler.receive(body);
            assert_eq!(outcome.status, 500);
            assert_eq!(outcome.response.status, "error");
            assert!(!outcome.response.msg.is_empty());

            let lines = bridge.drain_all();
            assert_eq!(lines.len(), 1);
            assert!(lines[0].as_str().starts_with(LogLine::ERROR_MARKER));
        }
        assert!(files_in(&handler).is_empty());
    }

    #[test]
    fn test_storage_failure_reported() {
        let (_root, handler, bridge) = handler();
        fs::remove_dir(handler.store().dir()).unwrap();

        let outcome = handler.receive(br#"{"type":"sms","payload":[]}"#);
        assert_eq!(outcome.status, 500);
        assert!(outcome.response.msg.contains("Failed to write"));

        let lines = bridge.drain_all();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].is_error());
    }

    #[test]
    fn test_path_escape_rejected() {
        let (root, handler, bridge) = handler();
        let outcome = handler.receive(br#"{"type":"../outside","payload":[1]}"#);
        assert_eq!(outcome.status, 500);
        assert!(bridge.drain_all()[0].is_error());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_unusual_kinds_are_saved() {
        let (_root, handler, bridge) = handler();
        let at = Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        for kind in ["", ".", "..", "a..b"] {
            let body = json!({"type": kind, "payload": [1]}).to_string();
            let outcome = handler.receive_at(body.as_bytes(), at);
            assert_eq!(outcome.status, 200, "kind {:?}", kind);

            let path = handler.store().dir().join(format!("{}_2024-05-01_12-00-00.json", kind));
            assert_eq!(read_items(&path), vec![json!(1)]);

            let lines = bridge.drain_all();
            assert_eq!(lines.len(), 1);
            assert!(lines[0].as_str().contains(&format!("type={} count=1", kind)));
        }
        assert_eq!(files_in(&handler).len(), 4);
    }

    #[test]
    fn test_reject() {
        let (_root, handler, bridge) = handler();
        let error = UploadError::Body(std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "closed"));
        let outcome = handler.reject(error);
        assert_eq!(outcome.status, 500);
        assert_eq!(bridge.drain_all().len(), 1);
    }

    #[test]
    fn test_concurrent_uploads() {
        let (_root, handler, bridge) = handler();
        let handler = Arc::new(handler);

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let handler = Arc::clone(&handler);
                thread::spawn(move || {
                    let body = json!({"type": format!("kind{}", i), "payload": [i, "x", {"i": i}]});
                    handler.receive(body.to_string().as_bytes())
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().status, 200);
        }

        let files = files_in(&handler);
        assert_eq!(files.len(), 50);
        for i in 0..50 {
            let prefix = format!("kind{}_", i);
            let file = files
                .iter()
                .find(|p| p.file_name().unwrap().to_str().unwrap().starts_with(&prefix))
                .unwrap();
            assert_eq!(read_items(file), vec![json!(i), json!("x"), json!({"i": i})]);
        }

        let lines = bridge.drain_all();
        assert_eq!(lines.len(), 50);
        for i in 0..50 {
            let needle = format!("type=kind{} ", i);
            assert_eq!(lines.iter().filter(|l| l.as_str().contains(&needle)).count(), 1);
        }
        assert!(bridge.drain_all().is_empty());
    }
}
