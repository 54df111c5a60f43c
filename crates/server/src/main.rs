mod routes;

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use moosificator_core::assets::overlay_catalog::OverlayCatalog;
use moosificator_core::detection::domain::face_detector::FaceDetector;
use moosificator_core::detection::infrastructure::rustface_detector::RustfaceDetector;
use moosificator_core::media::infrastructure::http_image_source::HttpImageSource;
use moosificator_core::pipeline::moose_service::MooseService;
use moosificator_core::shared::config::{DetectorSettings, ServiceConfig};
use moosificator_core::shared::constants::{
    ANIMATION_CACHE_CAPACITY, FRAME_CACHE_CAPACITY, MAX_CANVAS_PIXELS, SEETA_MODEL_NAME,
    SEETA_MODEL_URL,
};
use moosificator_core::shared::model_resolver;
use moosificator_core::telemetry::event_sink::LogEventSink;

/// Puts moose heads and antlers on every face in an image.
#[derive(Parser, Debug)]
#[command(name = "moosificator", version)]
struct Cli {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value = "8080")]
    port: u16,

    /// Address to bind.
    #[arg(long, env = "MOOSE_BIND", default_value = "0.0.0.0")]
    bind: IpAddr,

    /// Directory containing overlays.json and the images it references.
    #[arg(long, env = "MOOSE_ASSETS", default_value = "assets")]
    assets: PathBuf,

    /// SeetaFace model file. Downloaded into the user cache when omitted.
    #[arg(long, env = "MOOSE_MODEL")]
    model: Option<PathBuf>,

    /// Cached still-image results.
    #[arg(long, default_value_t = FRAME_CACHE_CAPACITY)]
    frame_cache_size: usize,

    /// Cached animated results.
    #[arg(long, default_value_t = ANIMATION_CACHE_CAPACITY)]
    animation_cache_size: usize,

    /// Hours a result (or failure) stays cached.
    #[arg(long, default_value = "24")]
    cache_ttl_hours: u64,

    /// Frames above this many pixels are downscaled before detection.
    #[arg(long, default_value_t = MAX_CANVAS_PIXELS)]
    max_canvas_pixels: u64,

    /// Timeout for fetching source and overlay images, in seconds.
    #[arg(long, default_value = "30")]
    fetch_timeout: u64,

    /// Smallest face the detector looks for, in pixels (at least 20).
    #[arg(long, default_value = "20")]
    min_face_size: u32,

    /// Detector score threshold; higher means fewer, surer faces.
    #[arg(long, default_value = "2.0")]
    score_threshold: f64,

    /// Image pyramid scale step (0.01-0.99).
    #[arg(long, default_value = "0.8")]
    pyramid_scale: f32,

    /// Sliding window step in pixels.
    #[arg(long, default_value = "4")]
    window_step: u32,

    /// Async worker threads (defaults to the number of CPUs).
    #[arg(long)]
    workers: Option<usize>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;
    let config = service_config(&cli)?;

    // Everything below blocks, so it happens before the runtime exists.
    let catalog = Arc::new(OverlayCatalog::load(&cli.assets)?);
    let detector = build_detector(&cli)?;
    let service = Arc::new(MooseService::new(
        &config,
        catalog,
        Arc::new(HttpImageSource::new(config.fetch_timeout)?),
        detector,
        Arc::new(LogEventSink),
    ));

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(workers) = cli.workers {
        builder.worker_threads(workers);
    }
    let runtime = builder.build()?;

    let served = runtime.block_on(serve(
        SocketAddr::new(cli.bind, cli.port),
        Arc::clone(&service),
    ));
    // Tasks holding the service go first, so its blocking HTTP client is
    // dropped outside the runtime.
    drop(runtime);
    drop(service);
    served
}

async fn serve(
    addr: SocketAddr,
    service: Arc<MooseService>,
) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    log::info!("Listening on http://{addr}");
    log::info!("  GET /api/{{kind}}?image=&name=&overlay=&debug=");
    log::info!("  GET /moose?image=&debug=");
    log::info!("  GET /health");
    axum::serve(listener, routes::router(service)).await?;
    Ok(())
}

fn build_detector(cli: &Cli) -> Result<Arc<dyn FaceDetector>, Box<dyn std::error::Error>> {
    log::info!("Resolving model: {SEETA_MODEL_NAME}");
    let model_path = model_resolver::resolve(
        SEETA_MODEL_NAME,
        SEETA_MODEL_URL,
        cli.model.as_deref(),
        Some(Box::new(download_progress)),
    )?;

    let settings = DetectorSettings {
        min_face_size: cli.min_face_size,
        score_threshold: cli.score_threshold,
        pyramid_scale_factor: cli.pyramid_scale,
        window_step: cli.window_step,
    };
    let detector = RustfaceDetector::from_file(&model_path, settings)?;
    log::info!("Loaded face model from {}", model_path.display());
    Ok(Arc::new(detector))
}

fn service_config(cli: &Cli) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    Ok(ServiceConfig {
        frame_cache_capacity: NonZeroUsize::new(cli.frame_cache_size)
            .ok_or("Frame cache size must be at least 1")?,
        animation_cache_capacity: NonZeroUsize::new(cli.animation_cache_size)
            .ok_or("Animation cache size must be at least 1")?,
        result_ttl: Duration::from_secs(cli.cache_ttl_hours.saturating_mul(60 * 60)),
        max_canvas_pixels: cli.max_canvas_pixels,
        fetch_timeout: Duration::from_secs(cli.fetch_timeout),
    })
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.assets.is_dir() {
        return Err(format!("Asset directory not found: {}", cli.assets.display()).into());
    }
    if cli.frame_cache_size == 0 || cli.animation_cache_size == 0 {
        return Err("Cache sizes must be at least 1".into());
    }
    if cli.cache_ttl_hours == 0 {
        return Err("Cache TTL must be at least one hour".into());
    }
    if cli.max_canvas_pixels == 0 {
        return Err("Max canvas pixels must be positive".into());
    }
    if cli.fetch_timeout == 0 {
        return Err("Fetch timeout must be at least one second".into());
    }
    if cli.min_face_size < 20 {
        return Err(format!("Min face size must be at least 20, got {}", cli.min_face_size).into());
    }
    if cli.score_threshold.is_nan() || cli.score_threshold < 0.0 {
        return Err(format!(
            "Score threshold must be non-negative, got {}",
            cli.score_threshold
        )
        .into());
    }
    if !(0.01..=0.99).contains(&cli.pyramid_scale) {
        return Err(format!(
            "Pyramid scale must be between 0.01 and 0.99, got {}",
            cli.pyramid_scale
        )
        .into());
    }
    if cli.window_step == 0 {
        return Err("Window step must be at least 1".into());
    }
    if cli.workers == Some(0) {
        return Err("Worker count must be at least 1".into());
    }
    Ok(())
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        log::debug!("Downloading face detection model... {pct}%");
    } else {
        log::debug!("Downloading face detection model... {downloaded} bytes");
    }
}
