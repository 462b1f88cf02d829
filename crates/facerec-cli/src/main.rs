use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facerec_capture::Camera;
use facerec_client::{EnrollmentRequest, RecognitionApiClient, RecognitionRequest};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod config;
mod input;
mod menu;
mod render;

use config::Config;

#[derive(Parser)]
#[command(name = "facerec", version, about = "Face recognition API client")]
struct Cli {
    /// TOML config file
    #[arg(long, global = true, env = "FACEREC_CONFIG")]
    config: Option<PathBuf>,
    /// Service base URL (overrides config and FACEREC_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,
    /// API key (overrides config and FACEREC_API_KEY)
    #[arg(long, global = true)]
    api_key: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the service description (GET /)
    Info,
    /// Check service health
    Health,
    /// Recognize faces in an image file, or in a webcam capture
    Recognize {
        /// Image file; captures from the camera when omitted
        #[arg(short, long)]
        image: Option<PathBuf>,
        /// Ask the service to return face embeddings
        #[arg(long)]
        embeddings: bool,
        /// Do not request quality information
        #[arg(long)]
        no_quality: bool,
        /// Minimum similarity for a match, applied server-side
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Recognize faces by uploading an image file as multipart form data
    RecognizeFile {
        path: PathBuf,
    },
    /// Add a training image for an employee
    Enroll {
        /// Employee ID (e.g., "EMP001")
        #[arg(short, long)]
        id: String,
        /// Employee display name
        #[arg(short, long)]
        name: Option<String>,
        /// Image file; captures from the camera when omitted
        #[arg(long)]
        image: Option<PathBuf>,
    },
    /// List stored training images
    List,
    /// Remove an employee's training image
    Remove {
        /// Employee ID to remove
        id: String,
    },
    /// Ask the service to reload its face gallery
    Reload,
    /// List local capture devices
    Devices,
    /// Interactive menu
    Menu,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprint!("{}", render::error(&err));
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    if let Some(key) = cli.api_key {
        config.api_key = Some(key);
    }

    let connect = || -> Result<RecognitionApiClient> {
        let client = RecognitionApiClient::new(config.api_config()?)?;
        tracing::debug!(config = ?client.config(), "client ready");
        Ok(client)
    };

    match cli.command {
        Commands::Info => {
            let info = connect()?.service_info().await?;
            print!("{}", render::service_info(&info));
        }
        Commands::Health => {
            let health = connect()?.health().await?;
            print!("{}", render::health(&health));
        }
        Commands::Recognize {
            image,
            embeddings,
            no_quality,
            threshold,
        } => {
            let client = connect()?;
            let image = input::acquire(image, &config).await?;
            let request = RecognitionRequest {
                image_bytes: image.bytes,
                return_embeddings: embeddings,
                return_quality_info: !no_quality,
                confidence_threshold: threshold,
            };
            let result = client.recognize(&request).await?;
            print!("{}", render::recognition(&result));
        }
        Commands::RecognizeFile { path } => {
            let client = connect()?;
            let image = input::acquire(Some(path), &config).await?;
            let result = client.recognize_file(image.bytes, &image.filename).await?;
            print!("{}", render::recognition(&result));
        }
        Commands::Enroll { id, name, image } => {
            let client = connect()?;
            let image = input::acquire(image, &config).await?;
            let mut request = EnrollmentRequest::new(id, image.bytes);
            if let Some(name) = name {
                request = request.with_name(name);
            }
            let result = client.enroll_employee(&request).await?;
            print!("{}", render::enrollment(&result));
        }
        Commands::List => {
            let listing = connect()?.list_employees().await?;
            print!("{}", render::listing(&listing));
        }
        Commands::Remove { id } => {
            let reply = connect()?
                .delete_training_image(&id)
                .await
                .with_context(|| format!("failed to remove {id}"))?;
            print!("{}", render::reply(&reply));
        }
        Commands::Reload => {
            let reply = connect()?.reload_model().await?;
            print!("{}", render::reply(&reply));
        }
        Commands::Menu => menu::run(&connect()?, &config).await?,
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No capture devices found");
            }
            for dev in devices {
                println!("{}  {} ({}, {})", dev.path, dev.name, dev.driver, dev.bus);
            }
        }
    }

    Ok(())
}
