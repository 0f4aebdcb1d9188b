use clap::{Parser, Subcommand};
use image::ImageReader;
use std::net::SocketAddr;
use std::path::PathBuf;

use modelserve::detection::DigitReader;
use modelserve::server::{self, Service};
use modelserve::services::load_model;
use modelserve::{logging, Config, ServiceKind};

#[derive(Parser)]
#[command(name = "modelserve")]
#[command(about = "Serve pre-trained prediction models over HTTP")]
struct Cli {
    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long, global = true, env = "MODELSERVE_CONFIG", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one prediction service
    Serve {
        #[arg(value_enum)]
        service: ServiceKind,

        /// Address to listen on, overriding the config file
        #[arg(long, env = "MODELSERVE_BIND", value_name = "ADDR")]
        bind: Option<SocketAddr>,
    },

    /// Read the digits in an image file and print them
    ReadDigits {
        /// Path to input image file
        #[arg(value_name = "IMAGE")]
        image_path: PathBuf,

        /// Digit classifier, overriding the config file
        #[arg(long, value_name = "MODEL")]
        model: Option<PathBuf>,

        /// Save debug outputs to directory (must be empty)
        #[arg(long, value_name = "DIR")]
        debug_out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    logging::init_logger(cli.verbose, config.server.json_logs);

    match cli.command {
        Command::Serve { service, bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            tracing::info!("starting {:?} service", service);

            let service = Service::load(service, &config);
            if !service.is_ready() {
                tracing::warn!("artifacts missing; /predict will answer 500 until restarted with valid files");
            }

            let router = server::router(service, &config.server);
            server::serve(router, config.server.bind).await
        }
        Command::ReadDigits {
            image_path,
            model,
            debug_out,
        } => {
            let model_path = model.unwrap_or(config.digits.model);
            tracing::debug!("loading image: {:?}", image_path);
            let img = ImageReader::open(&image_path)?
                .decode()
                .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
            tracing::debug!("image loaded: {}x{}", img.width(), img.height());

            let mut reader = DigitReader::new(&config.digits.segmentation, load_model(&model_path)?);
            if let Some(debug_dir) = debug_out {
                reader = reader.with_debug(debug_dir)?;
            }

            let reading = tokio::task::spawn_blocking(move || reader.read(img)).await??;

            println!("\n=== Digit Reading ===");
            if reading.digits.is_empty() {
                println!("No digits detected.");
            } else {
                println!("Prediction: {}", reading.prediction);
                for d in &reading.digits {
                    println!("  {} at x={} - confidence: {:.2}", d.digit, d.x_position, d.confidence);
                }
            }
            Ok(())
        }
    }
}
