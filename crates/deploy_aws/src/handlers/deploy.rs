use std::fs;
use std::path::Path;

use deploy_core::archive::{
    create_deployment_package, remove_archive, ArchiveError, RemoveOutcome,
};
use deploy_core::artifact_keys::{
    function_name, remote_object_key, PackageLayout, DEFAULT_FUNCTION_NAME_TEMPLATE,
};
use deploy_core::contract::{NormalizedDeployRequest, PackageManifest};
use serde_json::json;

use crate::adapters::artifact_store::ArtifactStore;
use crate::adapters::function_service::FunctionUpdater;

/// Result of one optional remote step. The pipeline records failures instead
/// of aborting so later steps still run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Skipped,
    Completed,
    Failed(String),
}

/// Result of an archive-removal step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemovalOutcome {
    Skipped,
    Removed,
    NotPresent,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployOutcome {
    pub manifest: PackageManifest,
    pub stale_removal: RemovalOutcome,
    pub upload: StepOutcome,
    pub update: StepOutcome,
    pub cleanup: RemovalOutcome,
}

/// Run the deployment pipeline: drop any stale archive, build a fresh one,
/// then upload, update, and clean up as requested.
///
/// Archive construction failures abort the run. Upload, update, and removal
/// failures are carried in the outcome; the caller decides what to surface.
/// The update step assumes the upload placed a valid archive at the derived
/// key and issues the request regardless of the upload outcome.
pub fn handle_deploy_request(
    request: &NormalizedDeployRequest,
    layout: &PackageLayout,
    store: &impl ArtifactStore,
    updater: &impl FunctionUpdater,
) -> Result<DeployOutcome, ArchiveError> {
    let lambda_name = request.lambda_name.as_str();
    let zip_path = layout.archive_path(lambda_name);
    let object_key = remote_object_key(lambda_name);

    log_deploy_info(
        "deploy_started",
        json!({
            "lambda_name": lambda_name,
            "bucket": request.bucket.clone(),
            "upload": request.upload,
            "update": request.update,
            "remove_archive": request.remove_archive,
        }),
    );

    let stale_removal = match remove_archive(&zip_path) {
        Ok(RemoveOutcome::Removed) => RemovalOutcome::Removed,
        Ok(RemoveOutcome::NotPresent) => RemovalOutcome::NotPresent,
        Err(error) => {
            log_deploy_error(
                "stale_archive_removal_failed",
                json!({
                    "lambda_name": lambda_name,
                    "zip_path": zip_path.display().to_string(),
                    "error": error.message(),
                }),
            );
            RemovalOutcome::Failed(error.message().to_string())
        }
    };

    let manifest =
        create_deployment_package(layout, lambda_name, &request.excluded_files).map_err(
            |error| {
                log_deploy_error(
                    "package_creation_failed",
                    json!({
                        "lambda_name": lambda_name,
                        "zip_path": zip_path.display().to_string(),
                        "error": error.message(),
                    }),
                );
                error
            },
        )?;

    log_deploy_info(
        "package_created",
        json!({
            "lambda_name": lambda_name,
            "zipfile": manifest.zipfile.clone(),
            "file_count": manifest.files.len(),
            "code_sha256": manifest.code_sha256.clone(),
        }),
    );

    let upload = run_upload_step(request, &zip_path, &object_key, store);
    let update = run_update_step(request, &object_key, updater);

    let cleanup = if !request.remove_archive {
        RemovalOutcome::Skipped
    } else {
        match remove_archive(&zip_path) {
            Ok(RemoveOutcome::Removed) => RemovalOutcome::Removed,
            Ok(RemoveOutcome::NotPresent) => RemovalOutcome::NotPresent,
            Err(error) => {
                log_deploy_error(
                    "archive_removal_failed",
                    json!({
                        "lambda_name": lambda_name,
                        "zip_path": zip_path.display().to_string(),
                        "error": error.message(),
                    }),
                );
                RemovalOutcome::Failed(error.message().to_string())
            }
        }
    };

    Ok(DeployOutcome {
        manifest,
        stale_removal,
        upload,
        update,
        cleanup,
    })
}

fn run_upload_step(
    request: &NormalizedDeployRequest,
    zip_path: &Path,
    object_key: &str,
    store: &impl ArtifactStore,
) -> StepOutcome {
    if !request.upload {
        return StepOutcome::Skipped;
    }

    let Some(bucket) = request.bucket.as_deref() else {
        return StepOutcome::Failed("No bucket configured for upload".to_string());
    };

    let body = match fs::read(zip_path) {
        Ok(value) => value,
        Err(error) => {
            let message = format!(
                "Failed to read archive '{}' for upload to bucket '{bucket}' at key '{object_key}': {error}",
                zip_path.display()
            );
            log_deploy_error(
                "upload_failed",
                json!({
                    "lambda_name": request.lambda_name.clone(),
                    "bucket": bucket,
                    "key": object_key,
                    "error": message.clone(),
                }),
            );
            return StepOutcome::Failed(message);
        }
    };

    match store.put_object(object_key, &body) {
        Ok(()) => {
            log_deploy_info(
                "upload_completed",
                json!({
                    "lambda_name": request.lambda_name.clone(),
                    "bucket": bucket,
                    "key": object_key,
                    "bytes": body.len(),
                }),
            );
            StepOutcome::Completed
        }
        Err(error) => {
            let message = format!(
                "Failed to upload archive to bucket '{bucket}' at key '{object_key}': {error}"
            );
            log_deploy_error(
                "upload_failed",
                json!({
                    "lambda_name": request.lambda_name.clone(),
                    "bucket": bucket,
                    "key": object_key,
                    "error": message.clone(),
                }),
            );
            StepOutcome::Failed(message)
        }
    }
}

fn run_update_step(
    request: &NormalizedDeployRequest,
    object_key: &str,
    updater: &impl FunctionUpdater,
) -> StepOutcome {
    if !request.update {
        return StepOutcome::Skipped;
    }

    let Some(bucket) = request.bucket.as_deref() else {
        return StepOutcome::Failed("No bucket configured for function update".to_string());
    };

    let target = function_name(DEFAULT_FUNCTION_NAME_TEMPLATE, &request.lambda_name);
    match updater.update_function_code(&target, bucket, object_key) {
        Ok(()) => {
            log_deploy_info(
                "function_updated",
                json!({
                    "function_name": target.clone(),
                    "bucket": bucket,
                    "key": object_key,
                }),
            );
            StepOutcome::Completed
        }
        Err(error) => {
            let message = format!(
                "Failed to update function '{target}' from bucket '{bucket}' at key '{object_key}': {error}"
            );
            log_deploy_error(
                "function_update_failed",
                json!({
                    "function_name": target.clone(),
                    "bucket": bucket,
                    "key": object_key,
                    "error": message.clone(),
                }),
            );
            StepOutcome::Failed(message)
        }
    }
}

fn log_deploy_info(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "deploy_handler",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_deploy_error(event: &str, details: serde_json::Value) {
    eprintln!(
        "{}",
        json!({
            "component": "deploy_handler",
            "level": "error",
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}
