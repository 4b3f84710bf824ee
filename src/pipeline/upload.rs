use futures::future::join_all;
use tracing::{error, info, instrument};

use super::{check_face_count, check_image_size, Pipeline, PipelineError, MAX_FACES_PER_UPLOAD};
use crate::models::{ImageEntry, ObjectKey, UploadFile, UploadReport};

impl Pipeline {
    /// Store, index and record every file of the batch.
    pub async fn upload_batch(&self, files: &[UploadFile]) -> UploadReport {
        info!(files = files.len(), "Starting upload batch");

        let outcomes = join_all(files.iter().map(|file| self.upload_one(file))).await;

        let mut report = UploadReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(entry) => report.entries.push(entry),
                Err(e) => {
                    error!(error = %e, "Upload pipeline failed");
                    report.errors.push(e.to_string());
                }
            }
        }

        info!(
            saved = report.entries.len(),
            failed = report.errors.len(),
            "Upload batch finished"
        );
        report
    }

    #[instrument(skip(self, file), fields(file = %file.name))]
    async fn upload_one(&self, file: &UploadFile) -> Result<ImageEntry, PipelineError> {
        check_image_size(file)?;
        let key = ObjectKey::generate(file);

        self.objects
            .put_object(key.as_str(), &file.bytes, &file.mime_type)
            .await
            .map_err(|source| PipelineError::Storage {
                file: file.name.clone(),
                source,
            })?;

        let records = self
            .faces
            .index_faces(
                self.collection_id(),
                self.objects.bucket(),
                key.as_str(),
                key.as_str(),
            )
            .await
            .map_err(|source| PipelineError::Recognition {
                file: file.name.clone(),
                source,
            })?;

        check_face_count(&file.name, records.len(), MAX_FACES_PER_UPLOAD)?;

        // Only the first face is recorded; the others stay searchable through the collection.
        let face_id = &records[0].face_id;
        info!(key = %key, face_id = %face_id, faces = records.len(), "Photo indexed");

        self.entries
            .insert(face_id, key.as_str())
            .await
            .map_err(|source| PipelineError::Persistence {
                file: file.name.clone(),
                source,
            })
    }
}
