//! Append-mode file transport, an alternate output sink

use crate::transport::error::{TransportError, TransportResult};
use crate::transport::types::ErrorLog;
use crate::transport::Transport;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;

pub struct FileTransport {
    path: PathBuf,
    file: Option<File>,
    errors: ErrorLog,
}

impl FileTransport {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            file: None,
            errors: ErrorLog::new(),
        }
    }

    pub fn with_error_log(mut self, errors: ErrorLog) -> Self {
        self.errors = errors;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the file for appending, creating it if needed
    pub async fn open_append(&mut self) -> TransportResult<()> {
        let opened = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await;

        match opened {
            Ok(file) => {
                self.file = Some(file);
                Ok(())
            }
            Err(e) => {
                let err = TransportError::ConnectionFailed(format!(
                    "unable to open {}: {}",
                    self.path.display(),
                    e
                ));
                self.errors.record(err.to_string());
                Err(err)
            }
        }
    }

    /// Append bytes to the open file
    pub async fn write_file(&mut self, bytes: &[u8]) -> TransportResult<()> {
        let file = match self.file.as_mut() {
            Some(file) => file,
            None => {
                self.errors.record(TransportError::NoFileHandle.to_string());
                return Err(TransportError::NoFileHandle);
            }
        };

        let result = match file.write_all(bytes).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };

        result.map_err(|e| {
            let err = TransportError::from(e);
            self.errors.record(err.to_string());
            err
        })
    }
}

#[async_trait]
impl Transport for FileTransport {
    async fn connect(&mut self) -> TransportResult<()> {
        self.open_append().await
    }

    async fn write(&mut self, bytes: &[u8]) -> TransportResult<()> {
        self.write_file(bytes).await
    }

    async fn close(&mut self) {
        if let Some(mut file) = self.file.take() {
            let _ = file.flush().await;
        }
    }

    fn is_connected(&self) -> bool {
        self.file.is_some()
    }

    fn error_log(&self) -> &ErrorLog {
        &self.errors
    }
}
