//! Photo batch pipelines
//!
//! Each file in a batch runs its own pipeline (store → index → validate →
//! persist or search). All files of a batch run concurrently with no cap,
//! and a failing file never aborts its siblings: its error is logged and
//! folded into the batch report.
//!
//! - [`Pipeline::upload_batch`] adds photos to the face collection
//! - [`Pipeline::search_batch`] finds collection faces similar to query photos

use std::sync::Arc;

use thiserror::Error;

use crate::config::{AwsConfig, MAX_IMAGE_BYTES};
use crate::db::{DbError, ImageEntryStore};
use crate::models::{AppState, UploadFile};
use crate::recognition::{FaceIndex, RecognitionError};
use crate::storage::{ObjectStore, StorageError};

pub mod search;
pub mod upload;

/// Upper bound on faces in a gallery photo
pub const MAX_FACES_PER_UPLOAD: usize = 10;

/// Upper bound on faces in a query photo
pub const MAX_FACES_PER_QUERY: usize = 100;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("No face found in {file}")]
    NoFace { file: String },

    #[error("{file} is {size} bytes, images may be at most {max} bytes")]
    TooLarge { file: String, size: usize, max: usize },

    #[error("Too many faces in {file}: {count} detected, at most {max} allowed")]
    TooManyFaces { file: String, count: usize, max: usize },

    #[error("Could not store {file}: {source}")]
    Storage {
        file: String,
        #[source]
        source: StorageError,
    },

    #[error("Could not index {file}: {source}")]
    Recognition {
        file: String,
        #[source]
        source: RecognitionError,
    },

    #[error("Could not save entry for {file}: {source}")]
    Persistence {
        file: String,
        #[source]
        source: DbError,
    },
}

/// The services a batch talks to, plus where it points them
#[derive(Clone)]
pub struct Pipeline {
    objects: Arc<dyn ObjectStore>,
    faces: Arc<dyn FaceIndex>,
    entries: Arc<dyn ImageEntryStore>,
    aws: AwsConfig,
}

impl Pipeline {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        faces: Arc<dyn FaceIndex>,
        entries: Arc<dyn ImageEntryStore>,
        aws: AwsConfig,
    ) -> Self {
        Self {
            objects,
            faces,
            entries,
            aws,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.objects.clone(),
            state.faces.clone(),
            state.entries.clone(),
            state.config.aws.clone(),
        )
    }

    fn collection_id(&self) -> &str {
        &self.aws.collection_id
    }
}

/// Reject images over the size cap before anything is uploaded.
fn check_image_size(file: &UploadFile) -> Result<(), PipelineError> {
    if file.bytes.len() > MAX_IMAGE_BYTES {
        return Err(PipelineError::TooLarge {
            file: file.name.clone(),
            size: file.bytes.len(),
            max: MAX_IMAGE_BYTES,
        });
    }
    Ok(())
}

/// Reject face counts outside `1..=max`.
fn check_face_count(file: &str, count: usize, max: usize) -> Result<(), PipelineError> {
    match count {
        0 => Err(PipelineError::NoFace {
            file: file.to_string(),
        }),
        n if n > max => Err(PipelineError::TooManyFaces {
            file: file.to_string(),
            count: n,
            max,
        }),
        _ => Ok(()),
    }
}
