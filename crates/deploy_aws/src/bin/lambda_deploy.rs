use std::path::PathBuf;
use std::process::exit;

use aws_sdk_s3::primitives::ByteStream;
use clap::Parser;
use deploy_aws::adapters::artifact_store::ArtifactStore;
use deploy_aws::adapters::function_service::FunctionUpdater;
use deploy_aws::handlers::deploy::{
    handle_deploy_request, DeployOutcome, RemovalOutcome, StepOutcome,
};
use deploy_core::artifact_keys::{
    function_name, remote_object_key, PackageLayout, DEFAULT_FUNCTION_NAME_TEMPLATE,
};
use deploy_core::contract::{normalize_request, DeployRequest, NormalizedDeployRequest};

#[derive(Parser)]
#[command(
    name = "lambda-deploy",
    about = "Create, upload, and activate Lambda deployment packages",
    long_about = "Packages the top-level *.py files of a named Lambda function\n\
                  into a zip archive, optionally uploads it to S3, and optionally\n\
                  repoints the function's code at the uploaded artifact."
)]
struct Cli {
    /// Lambda function to package. Example: --lambda-name appflow-activator-lambda
    #[arg(long)]
    lambda_name: String,
    /// Update the AWS Lambda function code after packaging
    #[arg(long)]
    update: bool,
    /// Upload the deployment package to S3
    #[arg(long)]
    upload: bool,
    /// Name of the S3 bucket receiving the deployment package
    #[arg(long, env = "DEPLOY_BUCKET")]
    bucket: Option<String>,
    /// Remove the deployment package after execution
    #[arg(long)]
    rm: bool,
    /// File name to keep out of the package (repeatable)
    #[arg(long = "exclude", value_name = "FILE")]
    excluded_files: Vec<String>,
    /// Base directory holding function sources and deployment-packages/
    #[arg(long, default_value = "lambda")]
    base_dir: PathBuf,
}

struct S3ArtifactStore {
    bucket: String,
    s3_client: aws_sdk_s3::Client,
}

impl ArtifactStore for S3ArtifactStore {
    fn put_object(&self, key: &str, body: &[u8]) -> Result<(), String> {
        let bucket = self.bucket.clone();
        let object_key = key.to_string();
        let body_bytes = body.to_vec();
        let client = self.s3_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .put_object()
                    .bucket(bucket)
                    .key(object_key)
                    .body(ByteStream::from(body_bytes))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to upload object to s3: {error}"))
            })
        })
    }
}

struct LambdaFunctionUpdater {
    lambda_client: aws_sdk_lambda::Client,
}

impl FunctionUpdater for LambdaFunctionUpdater {
    fn update_function_code(
        &self,
        function_name: &str,
        bucket: &str,
        key: &str,
    ) -> Result<(), String> {
        let client = self.lambda_client.clone();
        let target = function_name.to_string();
        let code_bucket = bucket.to_string();
        let code_key = key.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .update_function_code()
                    .function_name(target)
                    .s3_bucket(code_bucket)
                    .s3_key(code_key)
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to update function code: {error}"))
            })
        })
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let layout = PackageLayout::new(cli.base_dir.clone());

    let request = match normalize_request(DeployRequest {
        lambda_name: cli.lambda_name,
        bucket: cli.bucket,
        upload: cli.upload,
        update: cli.update,
        remove_archive: cli.rm,
        excluded_files: cli.excluded_files,
    }) {
        Ok(value) => value,
        Err(error) => {
            eprintln!("Invalid deployment request: {error}");
            exit(2);
        }
    };

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let store = S3ArtifactStore {
        bucket: request.bucket.clone().unwrap_or_default(),
        s3_client: aws_sdk_s3::Client::new(&aws_config),
    };
    let updater = LambdaFunctionUpdater {
        lambda_client: aws_sdk_lambda::Client::new(&aws_config),
    };

    let outcome = match handle_deploy_request(&request, &layout, &store, &updater) {
        Ok(value) => value,
        Err(error) => {
            eprintln!("Failed to create deployment package: {error}");
            exit(1);
        }
    };

    print_report(&request, &layout, &outcome);
}

fn print_report(request: &NormalizedDeployRequest, layout: &PackageLayout, outcome: &DeployOutcome) {
    let lambda_name = request.lambda_name.as_str();
    let zip_path = layout.archive_path(lambda_name);

    match &outcome.stale_removal {
        RemovalOutcome::Skipped | RemovalOutcome::NotPresent => {}
        RemovalOutcome::Removed => {
            println!("Removed stale archive {}.", zip_path.display());
        }
        RemovalOutcome::Failed(message) => {
            println!("Cannot delete stale archive {}.", zip_path.display());
            println!("{message}");
        }
    }

    println!(
        "{}",
        serde_json::to_string_pretty(&outcome.manifest).expect("manifest should serialize")
    );

    match &outcome.upload {
        StepOutcome::Skipped => {}
        StepOutcome::Completed => {
            let bucket = request.bucket.as_deref().unwrap_or_default();
            println!(
                "Successfully uploaded Lambda package to S3. Bucket: {bucket}, Key: {}",
                remote_object_key(lambda_name)
            );
        }
        StepOutcome::Failed(message) => {
            println!("Failed to upload zip file to S3.");
            println!("{message}");
            println!("Zip file: {}", zip_path.display());
        }
    }

    match &outcome.update {
        StepOutcome::Skipped => {}
        StepOutcome::Completed => {
            println!(
                "Successfully updated Lambda Function: {}",
                function_name(DEFAULT_FUNCTION_NAME_TEMPLATE, lambda_name)
            );
        }
        StepOutcome::Failed(message) => {
            println!("Unable to update Lambda Function.");
            println!("{message}");
        }
    }

    match &outcome.cleanup {
        RemovalOutcome::Skipped | RemovalOutcome::NotPresent => {}
        RemovalOutcome::Removed => {
            println!("{} has been removed.", zip_path.display());
        }
        RemovalOutcome::Failed(message) => {
            println!("Cannot delete {}.", zip_path.display());
            println!("{message}");
        }
    }
}
