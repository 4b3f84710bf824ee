use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use facefind::client::ApiClient;
use facefind::config::Config;
use facefind::db::{self, PgImageEntryStore};
use facefind::models::UploadFile;
use facefind::pipeline::Pipeline;
use facefind::recognition::{self, FaceIndex, RekognitionFaceIndex};
use facefind::storage::S3ObjectStore;
use facefind::{create_router, AppState};

#[derive(Parser)]
#[command(name = "facefind", about = "Photo upload and face search")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve,
    /// Upload photos and index their faces
    Upload {
        /// Photos to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// API that records image entries (defaults to API_BASE_URL)
        #[arg(long)]
        api_url: Option<String>,
    },
    /// Find indexed faces similar to the faces in query photos
    Search {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Manage face collections
    Collection {
        #[command(subcommand)]
        action: CollectionAction,
    },
    /// Inspect or remove indexed faces
    Faces {
        #[command(subcommand)]
        action: FacesAction,
    },
}

#[derive(Subcommand)]
enum CollectionAction {
    /// Create a collection (defaults to REKOGNITION_COLLECTION_ID)
    Create { id: Option<String> },
    /// Delete a collection
    Delete { id: String },
    /// List collections
    List,
}

#[derive(Subcommand)]
enum FacesAction {
    /// List faces in the configured collection
    List,
    /// Delete the given faces, or every face when no ids are given
    Delete { ids: Vec<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    facefind::utils::init_logger();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    match cli.command {
        Commands::Serve => serve(config).await,
        Commands::Upload { files, api_url } => {
            let api = ApiClient::new(api_url.unwrap_or_else(|| config.client.api_base_url.clone()));
            api.check_upload_access(&config.aws.bucket)
                .await
                .context("Could not get an upload signature, no photos were uploaded")?;
            let pipeline = Pipeline::new(
                Arc::new(S3ObjectStore::new(&config.aws)?),
                Arc::new(RekognitionFaceIndex::from_config(&config.aws).await),
                Arc::new(api),
                config.aws.clone(),
            );
            let report = pipeline.upload_batch(&read_files(&files).await?).await;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if let Some(message) = report.error_message() {
                anyhow::bail!("{} of {} photos failed:\n{}", report.errors.len(), files.len(), message);
            }
            Ok(())
        }
        Commands::Search { files } => {
            // Search never records entries, so the API is not contacted.
            let pipeline = Pipeline::new(
                Arc::new(S3ObjectStore::new(&config.aws)?),
                Arc::new(RekognitionFaceIndex::from_config(&config.aws).await),
                Arc::new(ApiClient::new(config.client.api_base_url.clone())),
                config.aws.clone(),
            );
            let report = pipeline.search_batch(&read_files(&files).await?).await;
            println!("{}", serde_json::to_string_pretty(&report.results)?);
            if let Some(message) = report.error_message() {
                eprintln!("{}", message);
            }
            Ok(())
        }
        Commands::Collection { action } => {
            let index = RekognitionFaceIndex::from_config(&config.aws).await;
            match action {
                CollectionAction::Create { id } => {
                    let id = id.unwrap_or_else(|| config.aws.collection_id.clone());
                    index.create_collection(&id).await?;
                    println!("Created collection {}", id);
                }
                CollectionAction::Delete { id } => {
                    index.delete_collection(&id).await?;
                    println!("Deleted collection {}", id);
                }
                CollectionAction::List => {
                    for id in index.list_collections().await? {
                        println!("{}", id);
                    }
                }
            }
            Ok(())
        }
        Commands::Faces { action } => {
            let index = RekognitionFaceIndex::from_config(&config.aws).await;
            let collection_id = &config.aws.collection_id;
            match action {
                FacesAction::List => {
                    for face in index.list_faces(collection_id).await? {
                        println!(
                            "{}\t{}",
                            face.face_id,
                            face.external_image_id.unwrap_or_default()
                        );
                    }
                }
                FacesAction::Delete { ids } => {
                    let ids = if ids.is_empty() { None } else { Some(ids) };
                    let deleted = recognition::purge_faces(&index, collection_id, ids).await?;
                    println!("Deleted {} faces", deleted.len());
                }
            }
            Ok(())
        }
    }
}

async fn serve(config: Config) -> Result<()> {
    let pool = db::create_pool(&config.database).await?;

    info!("Running database migrations...");
    db::run_migrations(&pool).await?;
    info!("Database migrations completed");

    let state = AppState {
        objects: Arc::new(S3ObjectStore::new(&config.aws)?),
        faces: Arc::new(RekognitionFaceIndex::from_config(&config.aws).await),
        entries: Arc::new(PgImageEntryStore::new(pool)),
        config: config.clone(),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}

async fn read_files(paths: &[PathBuf]) -> Result<Vec<UploadFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        files.push(UploadFile::new(name, None, bytes));
    }
    Ok(files)
}
