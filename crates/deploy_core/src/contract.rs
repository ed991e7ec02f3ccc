use serde::{Deserialize, Serialize};

/// Raw deployment request as collected from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub lambda_name: String,
    pub bucket: Option<String>,
    pub upload: bool,
    pub update: bool,
    pub remove_archive: bool,
    pub excluded_files: Vec<String>,
}

/// Validated form of [`DeployRequest`]. The lambda name is trimmed and safe
/// to interpolate into paths and object keys; a bucket is present whenever
/// a remote step requested one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedDeployRequest {
    pub lambda_name: String,
    pub bucket: Option<String>,
    pub upload: bool,
    pub update: bool,
    pub remove_archive: bool,
    pub excluded_files: Vec<String>,
}

/// Record of one packaging run, printed as JSON after archive creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageManifest {
    pub zipfile: String,
    pub files: Vec<String>,
    pub code_sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ValidationError {}

pub fn normalize_request(
    request: DeployRequest,
) -> Result<NormalizedDeployRequest, ValidationError> {
    let lambda_name = request.lambda_name.trim().to_string();
    if lambda_name.is_empty() {
        return Err(ValidationError::new("lambda name cannot be empty"));
    }

    if lambda_name.contains(['/', '\\']) || lambda_name == ".." {
        return Err(ValidationError::new(format!(
            "lambda name '{lambda_name}' must not contain path separators"
        )));
    }

    let bucket = match request.bucket {
        Some(value) => {
            let trimmed = value.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        }
        None => None,
    };

    if (request.upload || request.update) && bucket.is_none() {
        return Err(ValidationError::new(
            "a bucket is required when --upload or --update is requested",
        ));
    }

    let mut excluded_files = request.excluded_files;
    excluded_files.sort_unstable();
    excluded_files.dedup();

    Ok(NormalizedDeployRequest {
        lambda_name,
        bucket,
        upload: request.upload,
        update: request.update,
        remove_archive: request.remove_archive,
        excluded_files,
    })
}
