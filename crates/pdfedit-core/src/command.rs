use crate::compress::{compress_document, CompressionLevel};
use crate::error::EditError;
use crate::merge::{merge_documents, NamedDocument};
use crate::page_spec::PageSpec;
use crate::rotate::{rotate_pages, RotationDelta};
use crate::split::split_document;
use crate::unlock::unlock_document;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// A batch page operation, as sent by a caller
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum BatchCommand {
    Split {
        #[serde(with = "crate::annotations::base64_bytes")]
        file: Vec<u8>,
        pages: String,
    },
    Merge {
        files: Vec<NamedDocument>,
    },
    Rotate {
        #[serde(with = "crate::annotations::base64_bytes")]
        file: Vec<u8>,
        pages: String,
        degrees: RotationDelta,
    },
    Unlock {
        #[serde(with = "crate::annotations::base64_bytes")]
        file: Vec<u8>,
    },
    Compress {
        #[serde(with = "crate::annotations::base64_bytes")]
        file: Vec<u8>,
        level: CompressionLevel,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessResult {
    pub success: bool,
    /// Base64-encoded PDF data
    pub data: Option<String>,
    pub error: Option<String>,
    pub metrics: Option<ProcessMetrics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessMetrics {
    pub input_size_bytes: usize,
    pub output_size_bytes: usize,
    pub page_count: u32,
    pub processing_time_ms: u64,
}

impl BatchCommand {
    fn input_size(&self) -> usize {
        match self {
            BatchCommand::Merge { files } => files.iter().map(|f| f.bytes.len()).sum(),
            BatchCommand::Split { file, .. }
            | BatchCommand::Rotate { file, .. }
            | BatchCommand::Unlock { file }
            | BatchCommand::Compress { file, .. } => file.len(),
        }
    }

    pub fn execute(&self) -> Result<Vec<u8>, EditError> {
        match self {
            BatchCommand::Split { file, pages } => split_document(file, &PageSpec::parse(pages)?),
            BatchCommand::Merge { files } => merge_documents(files),
            BatchCommand::Rotate {
                file,
                pages,
                degrees,
            } => rotate_pages(file, &PageSpec::parse(pages)?, *degrees),
            BatchCommand::Unlock { file } => unlock_document(file),
            BatchCommand::Compress { file, level } => compress_document(file, *level),
        }
    }

    /// Execute and wrap the outcome for a caller that only speaks JSON
    pub fn run(&self) -> ProcessResult {
        let started = Instant::now();
        let outcome = self
            .execute()
            .and_then(|bytes| crate::get_page_count(&bytes).map(|count| (bytes, count)));
        match outcome {
            Ok((bytes, page_count)) => ProcessResult {
                success: true,
                metrics: Some(ProcessMetrics {
                    input_size_bytes: self.input_size(),
                    output_size_bytes: bytes.len(),
                    page_count,
                    processing_time_ms: started.elapsed().as_millis() as u64,
                }),
                data: Some(STANDARD.encode(&bytes)),
                error: None,
            },
            Err(e) => ProcessResult {
                success: false,
                data: None,
                error: Some(e.to_string()),
                metrics: None,
            },
        }
    }
}
