//! Where rendered loan receipts are kept.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use shelfwise_core::LoanId;
use shelfwise_documents::receipt_file_name;

#[derive(Debug, Error)]
pub enum ReceiptArchiveError {
    #[error("failed to write receipt {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("receipt archive lock poisoned")]
    Poisoned,
}

#[async_trait]
pub trait ReceiptArchive: Send + Sync {
    async fn store(&self, loan_id: LoanId, pdf: &[u8]) -> Result<(), ReceiptArchiveError>;
}

/// Writes `receipt_<loan id>.pdf` files into a directory, creating it on demand.
#[derive(Debug, Clone)]
pub struct FileReceiptArchive {
    dir: PathBuf,
}

impl FileReceiptArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, loan_id: LoanId) -> PathBuf {
        self.dir.join(receipt_file_name(loan_id))
    }
}

#[async_trait]
impl ReceiptArchive for FileReceiptArchive {
    async fn store(&self, loan_id: LoanId, pdf: &[u8]) -> Result<(), ReceiptArchiveError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| ReceiptArchiveError::Io {
                path: self.dir.clone(),
                source,
            })?;
        let path = self.path_for(loan_id);
        tokio::fs::write(&path, pdf)
            .await
            .map_err(|source| ReceiptArchiveError::Io { path, source })
    }
}

/// Keeps receipts in memory (dev/test).
#[derive(Debug, Default)]
pub struct InMemoryReceiptArchive {
    receipts: RwLock<HashMap<LoanId, Vec<u8>>>,
}

impl InMemoryReceiptArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn get(&self, loan_id: LoanId) -> Option<Vec<u8>> {
        self.receipts
            .read()
            .ok()
            .and_then(|r| r.get(&loan_id).cloned())
    }

    pub fn len(&self) -> usize {
        self.receipts.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ReceiptArchive for InMemoryReceiptArchive {
    async fn store(&self, loan_id: LoanId, pdf: &[u8]) -> Result<(), ReceiptArchiveError> {
        self.receipts
            .write()
            .map_err(|_| ReceiptArchiveError::Poisoned)?
            .insert(loan_id, pdf.to_vec());
        Ok(())
    }
}
