use std::fs;
use std::io::Write;
use std::path::Path;

use sha2::{Digest, Sha256};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::artifact_keys::PackageLayout;
use crate::contract::PackageManifest;

/// Only top-level files with this extension are packaged.
pub const PACKAGED_EXTENSION: &str = "py";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveError {
    message: String,
}

impl ArchiveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ArchiveError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    NotPresent,
}

/// Build the deployment archive for `lambda_name` under `layout`.
///
/// Packages every regular `*.py` file directly inside the function's source
/// directory, minus `excluded_files`, in directory-listing order (not stable
/// across platforms). Overwrites an existing archive at the destination.
/// Fails if the source directory or the destination directory is missing;
/// the destination directory is never created here.
pub fn create_deployment_package(
    layout: &PackageLayout,
    lambda_name: &str,
    excluded_files: &[String],
) -> Result<PackageManifest, ArchiveError> {
    let source_dir = layout.source_dir(lambda_name);
    let zip_path = layout.archive_path(lambda_name);

    let entries = fs::read_dir(&source_dir).map_err(|error| {
        ArchiveError::new(format!(
            "Failed to read source directory '{}': {error}",
            source_dir.display()
        ))
    })?;

    let file = fs::File::create(&zip_path).map_err(|error| {
        ArchiveError::new(format!(
            "Failed to create archive '{}': {error}",
            zip_path.display()
        ))
    })?;
    let mut archive = ZipWriter::new(file);
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|error| {
            ArchiveError::new(format!(
                "Failed to list source directory '{}': {error}",
                source_dir.display()
            ))
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        if path.extension().and_then(|extension| extension.to_str()) != Some(PACKAGED_EXTENSION) {
            continue;
        }
        if excluded_files.iter().any(|excluded| excluded == name) {
            continue;
        }

        let body = fs::read(&path).map_err(|error| {
            ArchiveError::new(format!(
                "Failed to read source file '{}': {error}",
                path.display()
            ))
        })?;
        archive
            .start_file(name, options)
            .map_err(|error| ArchiveError::new(format!("Failed to start entry '{name}': {error}")))?;
        archive
            .write_all(&body)
            .map_err(|error| ArchiveError::new(format!("Failed to write entry '{name}': {error}")))?;
        files.push(name.to_string());
    }

    archive.finish().map_err(|error| {
        ArchiveError::new(format!(
            "Failed to finish archive '{}': {error}",
            zip_path.display()
        ))
    })?;

    Ok(PackageManifest {
        zipfile: layout.relative_archive_path(lambda_name),
        files,
        code_sha256: archive_fingerprint(&zip_path)?,
    })
}

/// Remove the archive at `path` if it exists. Missing files are a no-op.
pub fn remove_archive(path: &Path) -> Result<RemoveOutcome, ArchiveError> {
    if !path.exists() {
        return Ok(RemoveOutcome::NotPresent);
    }

    fs::remove_file(path).map_err(|error| {
        ArchiveError::new(format!(
            "Failed to remove archive '{}': {error}",
            path.display()
        ))
    })?;
    Ok(RemoveOutcome::Removed)
}

fn archive_fingerprint(zip_path: &Path) -> Result<String, ArchiveError> {
    let body = fs::read(zip_path).map_err(|error| {
        ArchiveError::new(format!(
            "Failed to read archive '{}' for fingerprinting: {error}",
            zip_path.display()
        ))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(&body);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use tempfile::TempDir;

    use super::*;

    fn layout_with_source(files: &[(&str, &str)]) -> (TempDir, PackageLayout) {
        let base = TempDir::new().expect("temp dir should be created");
        let layout = PackageLayout::new(base.path());

        fs::create_dir_all(layout.source_dir("demo")).expect("source dir should be created");
        fs::create_dir_all(layout.package_dir()).expect("package dir should be created");
        for (name, body) in files {
            fs::write(layout.source_dir("demo").join(name), body)
                .expect("source file should be written");
        }

        (base, layout)
    }

    fn archive_entry_names(zip_path: &Path) -> Vec<String> {
        let file = fs::File::open(zip_path).expect("archive should open");
        let archive = zip::ZipArchive::new(file).expect("archive should parse");
        archive.file_names().map(str::to_string).collect()
    }

    #[test]
    fn packages_only_matching_top_level_files() {
        let (_base, layout) = layout_with_source(&[
            ("a.py", "print('a')"),
            ("b.py", "print('b')"),
            ("notes.txt", "not packaged"),
        ]);

        let manifest = create_deployment_package(&layout, "demo", &[])
            .expect("package should be created");

        assert_eq!(manifest.zipfile, "deployment-packages/demo.zip");
        let mut files = manifest.files.clone();
        files.sort();
        assert_eq!(files, vec!["a.py".to_string(), "b.py".to_string()]);

        let mut entries = archive_entry_names(&layout.archive_path("demo"));
        entries.sort();
        assert_eq!(entries, vec!["a.py".to_string(), "b.py".to_string()]);
    }

    #[test]
    fn skips_subdirectories() {
        let (_base, layout) = layout_with_source(&[("handler.py", "print('h')")]);
        fs::create_dir_all(layout.source_dir("demo").join("vendored"))
            .expect("nested dir should be created");
        fs::write(
            layout.source_dir("demo").join("vendored").join("dep.py"),
            "print('dep')",
        )
        .expect("nested file should be written");

        let manifest = create_deployment_package(&layout, "demo", &[])
            .expect("package should be created");

        assert_eq!(manifest.files, vec!["handler.py".to_string()]);
    }

    #[test]
    fn honors_exclusion_list() {
        let (_base, layout) = layout_with_source(&[
            ("handler.py", "print('h')"),
            ("build_script.py", "print('tooling')"),
        ]);

        let manifest = create_deployment_package(
            &layout,
            "demo",
            &["build_script.py".to_string()],
        )
        .expect("package should be created");

        assert_eq!(manifest.files, vec!["handler.py".to_string()]);
        assert_eq!(
            archive_entry_names(&layout.archive_path("demo")),
            vec!["handler.py".to_string()]
        );
    }

    #[test]
    fn archive_entries_preserve_file_bodies() {
        let (_base, layout) = layout_with_source(&[("handler.py", "print('payload')")]);

        create_deployment_package(&layout, "demo", &[]).expect("package should be created");

        let file = fs::File::open(layout.archive_path("demo")).expect("archive should open");
        let mut archive = zip::ZipArchive::new(file).expect("archive should parse");
        let mut entry = archive.by_name("handler.py").expect("entry should exist");
        let mut body = String::new();
        entry
            .read_to_string(&mut body)
            .expect("entry should decompress");
        assert_eq!(body, "print('payload')");
    }

    #[test]
    fn fingerprint_matches_archive_bytes() {
        let (_base, layout) = layout_with_source(&[("handler.py", "print('h')")]);

        let manifest = create_deployment_package(&layout, "demo", &[])
            .expect("package should be created");

        let body = fs::read(layout.archive_path("demo")).expect("archive should be readable");
        let mut hasher = Sha256::new();
        hasher.update(&body);
        assert_eq!(manifest.code_sha256, format!("{:x}", hasher.finalize()));
    }

    #[test]
    fn overwrites_existing_archive() {
        let (_base, layout) = layout_with_source(&[("handler.py", "print('h')")]);
        fs::write(layout.archive_path("demo"), b"stale bytes")
            .expect("stale archive should be written");

        let manifest = create_deployment_package(&layout, "demo", &[])
            .expect("package should be created");

        assert_eq!(manifest.files, vec!["handler.py".to_string()]);
        assert_eq!(
            archive_entry_names(&layout.archive_path("demo")),
            vec!["handler.py".to_string()]
        );
    }

    #[test]
    fn fails_when_source_directory_is_missing() {
        let base = TempDir::new().expect("temp dir should be created");
        let layout = PackageLayout::new(base.path());
        fs::create_dir_all(layout.package_dir()).expect("package dir should be created");

        let error = create_deployment_package(&layout, "demo", &[])
            .expect_err("packaging should fail");
        assert!(error.message().contains("Failed to read source directory"));
    }

    #[test]
    fn fails_when_package_directory_is_missing() {
        let base = TempDir::new().expect("temp dir should be created");
        let layout = PackageLayout::new(base.path());
        fs::create_dir_all(layout.source_dir("demo")).expect("source dir should be created");

        let error = create_deployment_package(&layout, "demo", &[])
            .expect_err("packaging should fail");
        assert!(error.message().contains("Failed to create archive"));
    }

    #[test]
    fn removing_missing_archive_is_a_noop() {
        let base = TempDir::new().expect("temp dir should be created");
        let outcome = remove_archive(&base.path().join("absent.zip"))
            .expect("removal should not fail");
        assert_eq!(outcome, RemoveOutcome::NotPresent);
    }

    #[test]
    fn removing_existing_archive_deletes_it() {
        let base = TempDir::new().expect("temp dir should be created");
        let path = base.path().join("demo.zip");
        fs::write(&path, b"zip bytes").expect("archive should be written");

        let outcome = remove_archive(&path).expect("removal should not fail");
        assert_eq!(outcome, RemoveOutcome::Removed);
        assert!(!path.exists());
    }
}
