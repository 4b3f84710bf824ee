//! In-memory stand-ins for S3, Rekognition and the entry table.
//!
//! Test photos describe themselves: the payload is a `;`-separated list of
//! `faces=N`, `person=NAME`, `similarity=S` and `fail` directives. The fake
//! index reads the uploaded bytes back from the fake store to decide what it
//! "detects".

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::config::{AwsConfig, ClientConfig, Config, DatabaseConfig, ServerConfig};
use crate::db::{DbError, ImageEntryStore};
use crate::models::{AppState, FaceRecord, ImageEntry, UploadFile};
use crate::recognition::{FaceHit, FaceIndex, RecognitionError};
use crate::storage::{ObjectStore, StorageError};

pub const BUCKET: &str = "test-bucket";
pub const COLLECTION: &str = "test-faces";

pub fn photo(name: &str, directives: &str) -> UploadFile {
    UploadFile::new(name, Some("image/jpeg".into()), directives.as_bytes().to_vec())
}

fn directive<'a>(payload: &'a str, name: &str) -> Option<&'a str> {
    payload.split(';').find_map(|part| {
        let mut kv = part.splitn(2, '=');
        match (kv.next(), kv.next()) {
            (Some(k), Some(v)) if k.trim() == name => Some(v.trim()),
            (Some(k), None) if k.trim() == name => Some(""),
            _ => None,
        }
    })
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    deleted: Mutex<Vec<String>>,
    fail_payload: Mutex<Option<Vec<u8>>>,
    fail_deletes: Mutex<bool>,
}

impl MemoryObjectStore {
    /// Uploads whose body equals `payload` fail.
    pub fn fail_uploads_of(&self, payload: &str) {
        *self.fail_payload.lock().unwrap() = Some(payload.as_bytes().to_vec());
    }

    pub fn fail_deletes(&self) {
        *self.fail_deletes.lock().unwrap() = true;
    }

    pub fn get(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        if self.fail_payload.lock().unwrap().as_deref() == Some(data) {
            return Err(StorageError::Upload {
                key: key.to_string(),
                message: "connection reset".into(),
            });
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (data.to_vec(), content_type.to_string()));
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        if *self.fail_deletes.lock().unwrap() {
            return Err(StorageError::Delete {
                key: key.to_string(),
                message: "access denied".into(),
            });
        }
        self.objects.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn bucket(&self) -> &str {
        BUCKET
    }
}

#[derive(Debug, Clone)]
struct StoredFace {
    face_id: String,
    external_image_id: String,
    person: Option<String>,
    similarity: f32,
}

pub struct MemoryFaceIndex {
    objects: Option<Arc<MemoryObjectStore>>,
    collections: Mutex<HashMap<String, Vec<StoredFace>>>,
    searches: AtomicUsize,
    deletes: AtomicUsize,
}

impl Default for MemoryFaceIndex {
    fn default() -> Self {
        Self {
            objects: None,
            collections: Mutex::new(HashMap::new()),
            searches: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
        }
    }
}

impl MemoryFaceIndex {
    /// Index that reads photo payloads back from `objects`
    pub fn reading(objects: Arc<MemoryObjectStore>) -> Self {
        Self {
            objects: Some(objects),
            ..Self::default()
        }
    }

    pub fn seed(&self, collection_id: &str, face_ids: &[&str]) {
        let mut collections = self.collections.lock().unwrap();
        let faces = collections.entry(collection_id.to_string()).or_default();
        faces.extend(face_ids.iter().map(|id| StoredFace {
            face_id: id.to_string(),
            external_image_id: format!("{}.jpg", id),
            person: None,
            similarity: 99.0,
        }));
    }

    pub fn search_calls(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceIndex for MemoryFaceIndex {
    async fn index_faces(
        &self,
        collection_id: &str,
        bucket: &str,
        key: &str,
        external_image_id: &str,
    ) -> Result<Vec<FaceRecord>, RecognitionError> {
        let payload = self
            .objects
            .as_ref()
            .and_then(|store| store.get(key))
            .filter(|_| bucket == BUCKET)
            .map(|(bytes, _)| String::from_utf8_lossy(&bytes).into_owned())
            .ok_or_else(|| RecognitionError::Service {
                operation: "IndexFaces",
                message: format!("object {}/{} not found", bucket, key),
            })?;

        if directive(&payload, "fail").is_some() {
            return Err(RecognitionError::Service {
                operation: "IndexFaces",
                message: "throttled".into(),
            });
        }

        let count: usize = directive(&payload, "faces").and_then(|n| n.parse().ok()).unwrap_or(0);
        let person = directive(&payload, "person").map(str::to_string);
        let similarity = directive(&payload, "similarity")
            .and_then(|s| s.parse().ok())
            .unwrap_or(99.0);

        let faces: Vec<StoredFace> = (0..count)
            .map(|i| StoredFace {
                face_id: format!("{}-face-{}", key, i),
                external_image_id: external_image_id.to_string(),
                person: person.clone(),
                similarity,
            })
            .collect();

        let records = faces
            .iter()
            .map(|f| FaceRecord {
                face_id: f.face_id.clone(),
                external_image_id: Some(f.external_image_id.clone()),
            })
            .collect();

        self.collections
            .lock()
            .unwrap()
            .entry(collection_id.to_string())
            .or_default()
            .extend(faces);

        Ok(records)
    }

    async fn search_faces(
        &self,
        collection_id: &str,
        face_id: &str,
        threshold: f32,
    ) -> Result<Vec<FaceHit>, RecognitionError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        let collections = self.collections.lock().unwrap();
        let faces = collections.get(collection_id).cloned().unwrap_or_default();

        let person = faces
            .iter()
            .find(|f| f.face_id == face_id)
            .ok_or_else(|| RecognitionError::Service {
                operation: "SearchFaces",
                message: format!("face {} not found", face_id),
            })?
            .person
            .clone();

        Ok(faces
            .iter()
            .filter(|f| f.face_id != face_id)
            .filter(|f| person.is_some() && f.person == person)
            .filter(|f| f.similarity >= threshold)
            .map(|f| FaceHit {
                face_id: f.face_id.clone(),
                external_image_id: Some(f.external_image_id.clone()),
                similarity: f.similarity,
            })
            .collect())
    }

    async fn list_faces(&self, collection_id: &str) -> Result<Vec<FaceRecord>, RecognitionError> {
        Ok(self
            .collections
            .lock()
            .unwrap()
            .get(collection_id)
            .map(|faces| {
                faces
                    .iter()
                    .map(|f| FaceRecord {
                        face_id: f.face_id.clone(),
                        external_image_id: Some(f.external_image_id.clone()),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn delete_faces(
        &self,
        collection_id: &str,
        face_ids: &[String],
    ) -> Result<Vec<String>, RecognitionError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut collections = self.collections.lock().unwrap();
        let faces = collections.entry(collection_id.to_string()).or_default();
        let before: Vec<String> = faces.iter().map(|f| f.face_id.clone()).collect();
        faces.retain(|f| !face_ids.contains(&f.face_id));
        Ok(before.into_iter().filter(|id| face_ids.contains(id)).collect())
    }

    async fn create_collection(&self, collection_id: &str) -> Result<(), RecognitionError> {
        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(collection_id) {
            return Err(RecognitionError::Service {
                operation: "CreateCollection",
                message: format!("collection {} already exists", collection_id),
            });
        }
        collections.insert(collection_id.to_string(), Vec::new());
        Ok(())
    }

    async fn delete_collection(&self, collection_id: &str) -> Result<(), RecognitionError> {
        self.collections
            .lock()
            .unwrap()
            .remove(collection_id)
            .map(|_| ())
            .ok_or_else(|| RecognitionError::Service {
                operation: "DeleteCollection",
                message: format!("collection {} not found", collection_id),
            })
    }

    async fn list_collections(&self) -> Result<Vec<String>, RecognitionError> {
        let mut ids: Vec<String> = self.collections.lock().unwrap().keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[derive(Default)]
pub struct MemoryEntryStore {
    entries: Mutex<Vec<ImageEntry>>,
    failing: bool,
}

impl MemoryEntryStore {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn entries(&self) -> Vec<ImageEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageEntryStore for MemoryEntryStore {
    async fn insert(&self, image_id: &str, key: &str) -> Result<ImageEntry, DbError> {
        if self.failing {
            return Err(DbError::Api("database unavailable".into()));
        }
        let entry = ImageEntry {
            id: uuid::Uuid::new_v4(),
            image_id: image_id.to_string(),
            key: key.to_string(),
            created_at: chrono::Utc::now(),
        };
        self.entries.lock().unwrap().push(entry.clone());
        Ok(entry)
    }

    async fn is_healthy(&self) -> bool {
        !self.failing
    }
}

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".into(),
            cors_allowed_origins: vec!["http://localhost:3000".into()],
            max_body_bytes: 1024 * 1024,
        },
        database: DatabaseConfig {
            url: None,
            max_connections: 1,
            min_connections: 1,
        },
        aws: AwsConfig {
            bucket: BUCKET.into(),
            region: "us-east-1".into(),
            access_key_id: Some("AKIDTEST".into()),
            secret_access_key: Some("test-secret".into()),
            s3_endpoint: None,
            collection_id: COLLECTION.into(),
        },
        client: ClientConfig {
            api_base_url: "http://localhost:3000".into(),
        },
    }
}

/// Fakes wired together the way `serve` wires the real clients
pub struct Harness {
    pub objects: Arc<MemoryObjectStore>,
    pub faces: Arc<MemoryFaceIndex>,
    pub entries: Arc<MemoryEntryStore>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_entries(MemoryEntryStore::default())
    }

    pub fn with_entries(entries: MemoryEntryStore) -> Self {
        let objects = Arc::new(MemoryObjectStore::default());
        Self {
            faces: Arc::new(MemoryFaceIndex::reading(objects.clone())),
            objects,
            entries: Arc::new(entries),
        }
    }

    pub fn state(&self) -> AppState {
        AppState {
            config: test_config(),
            objects: self.objects.clone(),
            faces: self.faces.clone(),
            entries: self.entries.clone(),
        }
    }
}
