//! In-memory cloud-storage tool server.
//!
//! Buckets must exist up front (see `CLOUD_STORAGE_BUCKETS`); uploads to an
//! unknown bucket fail with `BUCKET_NOT_FOUND`. Stored blobs are served back
//! over `GET /blobs/{bucket}/{*blob}` so returned public URLs resolve.

use async_trait::async_trait;
use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use parking_lot::RwLock;
use relay_common::tool::{DELETE_FILE, DOWNLOAD_FILE, UPLOAD_FILE};
use relay_common::{
    DeleteFileParams, DownloadFileParams, ToolCall, ToolParameters, ToolResult, UploadFileParams,
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::server::{ToolDescriptor, ToolHandler};

#[derive(Debug, PartialEq, Eq)]
pub enum StoreError {
    BucketNotFound(String),
    BlobNotFound(String),
}

/// Bucket name -> blob name -> content.
#[derive(Default)]
pub struct BlobStore {
    buckets: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl BlobStore {
    pub fn with_buckets<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let buckets = names
            .into_iter()
            .map(|n| (n.into(), HashMap::new()))
            .collect();
        Self {
            buckets: RwLock::new(buckets),
        }
    }

    pub fn create_bucket(&self, name: impl Into<String>) {
        self.buckets.write().entry(name.into()).or_default();
    }

    pub fn put(&self, bucket: &str, blob: &str, content: String) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        objects.insert(blob.to_string(), content);
        Ok(())
    }

    pub fn get(&self, bucket: &str, blob: &str) -> Result<String, StoreError> {
        let buckets = self.buckets.read();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        objects
            .get(blob)
            .cloned()
            .ok_or_else(|| StoreError::BlobNotFound(blob.to_string()))
    }

    pub fn delete(&self, bucket: &str, blob: &str) -> Result<(), StoreError> {
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StoreError::BucketNotFound(bucket.to_string()))?;
        objects
            .remove(blob)
            .map(|_| ())
            .ok_or_else(|| StoreError::BlobNotFound(blob.to_string()))
    }
}

fn store_failure(e: StoreError) -> ToolResult {
    match e {
        StoreError::BucketNotFound(bucket) => ToolResult::failure(
            "BUCKET_NOT_FOUND",
            format!(
                "Cloud Storage bucket '{}' not found. Make sure the bucket exists.",
                bucket
            ),
        ),
        StoreError::BlobNotFound(blob) => {
            ToolResult::failure("BLOB_NOT_FOUND", format!("Blob '{}' not found.", blob))
        }
    }
}

pub struct CloudStorageServer {
    store: Arc<BlobStore>,
    public_base_url: String,
}

impl CloudStorageServer {
    pub fn new(store: Arc<BlobStore>, public_base_url: impl Into<String>) -> Self {
        Self {
            store,
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Public URL of a blob. Path segments are percent-encoded.
    pub fn public_url(&self, bucket: &str, blob: &str) -> String {
        let Ok(mut url) = reqwest::Url::parse(&self.public_base_url) else {
            return format!("{}/{}/{}", self.public_base_url, bucket, blob);
        };
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(bucket).extend(blob.split('/'));
        }
        url.to_string()
    }

    pub fn handle_upload(&self, params: UploadFileParams) -> ToolResult {
        info!(
            bucket = %params.bucket_name,
            blob = %params.destination_blob_name,
            bytes = params.source_file_content.len(),
            "Uploading blob"
        );

        if let Err(e) = self.store.put(
            &params.bucket_name,
            &params.destination_blob_name,
            params.source_file_content,
        ) {
            error!(bucket = %params.bucket_name, "Upload failed: {:?}", e);
            return store_failure(e);
        }

        let mut result = Map::new();
        result.insert(
            "public_url".into(),
            Value::String(self.public_url(&params.bucket_name, &params.destination_blob_name)),
        );
        result.insert("bucket".into(), Value::String(params.bucket_name));
        result.insert("blob".into(), Value::String(params.destination_blob_name));
        ToolResult::success(result)
    }

    pub fn handle_download(&self, params: DownloadFileParams) -> ToolResult {
        info!(bucket = %params.bucket_name, blob = %params.source_blob_name, "Downloading blob");

        match self.store.get(&params.bucket_name, &params.source_blob_name) {
            Ok(content) => {
                let mut result = Map::new();
                result.insert("bucket".into(), Value::String(params.bucket_name));
                result.insert("blob".into(), Value::String(params.source_blob_name));
                result.insert("content".into(), Value::String(content));
                ToolResult::success(result)
            }
            Err(e) => store_failure(e),
        }
    }

    pub fn handle_delete(&self, params: DeleteFileParams) -> ToolResult {
        info!(bucket = %params.bucket_name, blob = %params.blob_name, "Deleting blob");

        match self.store.delete(&params.bucket_name, &params.blob_name) {
            Ok(()) => {
                let mut result = Map::new();
                result.insert("bucket".into(), Value::String(params.bucket_name));
                result.insert("blob".into(), Value::String(params.blob_name));
                result.insert("status".into(), Value::String("deleted".into()));
                ToolResult::success(result)
            }
            Err(e) => store_failure(e),
        }
    }
}

#[async_trait]
impl ToolHandler for CloudStorageServer {
    fn server_name(&self) -> &'static str {
        "cloud-storage"
    }

    fn tools(&self) -> Vec<ToolDescriptor> {
        vec![
            ToolDescriptor::new::<UploadFileParams>(
                UPLOAD_FILE,
                "Upload text content to a bucket and return its public URL",
            ),
            ToolDescriptor::new::<DownloadFileParams>(
                DOWNLOAD_FILE,
                "Download the text content of a blob",
            ),
            ToolDescriptor::new::<DeleteFileParams>(DELETE_FILE, "Delete a blob from a bucket"),
        ]
    }

    async fn handle(&self, call: ToolCall) -> ToolResult {
        match call.parameters() {
            Ok(ToolParameters::UploadFile(p)) => self.handle_upload(p),
            Ok(ToolParameters::DownloadFile(p)) => self.handle_download(p),
            Ok(ToolParameters::DeleteFile(p)) => self.handle_delete(p),
            Ok(other) => ToolResult::failure(
                "TOOL_NOT_FOUND",
                format!("Tool '{}' not found.", other.tool_name()),
            ),
            Err(e) => {
                warn!(tool = %call.tool_name, error = %e, "Invalid storage parameters");
                ToolResult::failure(e.code, e.message)
            }
        }
    }
}

/// Routes serving stored blobs as plain text.
pub fn blob_routes(store: Arc<BlobStore>) -> Router {
    Router::new()
        .route("/blobs/{bucket}/{*blob}", get(get_blob))
        .with_state(store)
}

async fn get_blob(
    State(store): State<Arc<BlobStore>>,
    Path((bucket, blob)): Path<(String, String)>,
) -> Response {
    match store.get(&bucket, &blob) {
        Ok(content) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            content,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}
