use futures::future::join_all;
use tracing::{error, info, instrument, warn};

use super::{check_face_count, check_image_size, Pipeline, PipelineError, MAX_FACES_PER_QUERY};
use crate::models::{ObjectKey, SearchMatch, SearchReport, SearchResult, UploadFile};
use crate::recognition::{FaceHit, FACE_MATCH_THRESHOLD};

enum SearchOutcome {
    Matched(SearchResult),
    NoMatches(ObjectKey),
}

impl Pipeline {
    /// Look up collection faces similar to the first face of each query photo.
    pub async fn search_batch(&self, files: &[UploadFile]) -> SearchReport {
        info!(files = files.len(), "Starting search batch");

        let outcomes = join_all(files.iter().map(|file| self.search_one(file))).await;

        let mut report = SearchReport::default();
        for outcome in outcomes {
            match outcome {
                Ok(SearchOutcome::Matched(result)) => report.results.push(result),
                Ok(SearchOutcome::NoMatches(key)) => {
                    report.errors.push(format!("No matches found for image: {}", key));
                }
                Err(e) => {
                    error!(error = %e, "Search pipeline failed");
                    report.errors.push(e.to_string());
                }
            }
        }

        info!(
            matched = report.results.len(),
            unmatched = report.errors.len(),
            "Search batch finished"
        );
        report
    }

    #[instrument(skip(self, file), fields(file = %file.name))]
    async fn search_one(&self, file: &UploadFile) -> Result<SearchOutcome, PipelineError> {
        check_image_size(file)?;
        let key = ObjectKey::transient(file);

        self.objects
            .put_object(key.as_str(), &file.bytes, &file.mime_type)
            .await
            .map_err(|source| PipelineError::Storage {
                file: file.name.clone(),
                source,
            })?;

        let indexed = self
            .faces
            .index_faces(
                self.collection_id(),
                self.objects.bucket(),
                key.as_str(),
                key.as_str(),
            )
            .await;

        // The query photo is only needed while it is being indexed.
        if key.is_transient() {
            if let Err(e) = self.objects.delete_object(key.as_str()).await {
                warn!(key = %key, error = %e, "Could not remove query photo");
            }
        }

        let records = indexed.map_err(|source| PipelineError::Recognition {
            file: file.name.clone(),
            source,
        })?;

        check_face_count(&file.name, records.len(), MAX_FACES_PER_QUERY)?;

        let hits = self
            .faces
            .search_faces(self.collection_id(), &records[0].face_id, FACE_MATCH_THRESHOLD)
            .await
            .map_err(|source| PipelineError::Recognition {
                file: file.name.clone(),
                source,
            })?;

        if hits.is_empty() {
            info!(key = %key, "No matches");
            return Ok(SearchOutcome::NoMatches(key));
        }

        info!(key = %key, matches = hits.len(), "Matches found");
        let matches = hits.into_iter().map(|hit| self.to_match(hit)).collect();
        Ok(SearchOutcome::Matched(SearchResult { key, matches }))
    }

    fn to_match(&self, hit: FaceHit) -> SearchMatch {
        SearchMatch {
            image_url: hit
                .external_image_id
                .as_deref()
                .map(|key| self.aws.public_url(key)),
            face_id: hit.face_id,
            similarity: hit.similarity,
            matched_key: hit.external_image_id,
        }
    }
}
