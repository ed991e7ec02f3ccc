use std::path::{Path, PathBuf};

pub const DEFAULT_FUNCTION_NAME_TEMPLATE: &str = "{lambda_name}";
pub const PACKAGE_DIR_NAME: &str = "deployment-packages";

/// Key of the uploaded archive within the artifact bucket.
pub fn remote_object_key(lambda_name: &str) -> String {
    format!("lambda/{lambda_name}.zip")
}

/// Expand a `{lambda_name}` template into the deployed function's name.
pub fn function_name(template: &str, lambda_name: &str) -> String {
    template.replace("{lambda_name}", lambda_name)
}

pub fn archive_file_name(lambda_name: &str) -> String {
    format!("{lambda_name}.zip")
}

/// Local directory layout for one deployment run. All paths hang off an
/// explicit base directory so tests can inject a temporary one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    base_dir: PathBuf,
}

impl PackageLayout {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding the function's source files.
    pub fn source_dir(&self, lambda_name: &str) -> PathBuf {
        self.base_dir.join(lambda_name)
    }

    /// Directory the produced archives are written into.
    pub fn package_dir(&self) -> PathBuf {
        self.base_dir.join(PACKAGE_DIR_NAME)
    }

    pub fn archive_path(&self, lambda_name: &str) -> PathBuf {
        self.package_dir().join(archive_file_name(lambda_name))
    }

    /// `/`-joined archive path relative to the base directory, as reported
    /// in the package manifest.
    pub fn relative_archive_path(&self, lambda_name: &str) -> String {
        format!("{PACKAGE_DIR_NAME}/{}", archive_file_name(lambda_name))
    }
}
