use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::Context as _;
use clap::{ArgAction, Parser, Subcommand};
use slidecap::{
    Captcha, CaptchaConfig, Clock, ManualClock, RasterSurface, VerificationResult, load_image,
};

#[derive(Parser, Debug)]
#[command(name = "slidecap", version)]
struct Cli {
    /// Log to stderr; repeat for more detail.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Cut a piece out of an image and write both layers as PNG.
    Render(RenderArgs),
    /// Run a scripted slider drag against an image and report the outcome.
    Simulate(SimulateArgs),
}

#[derive(Parser, Debug)]
struct ConfigArgs {
    /// Source image (PNG, JPEG, ...).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Captcha config JSON; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Piece body size in pixels.
    #[arg(long)]
    piece_size: Option<u32>,

    /// Placement seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Minimum distance between the piece and the image edges.
    #[arg(long)]
    margin: Option<u32>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    common: ConfigArgs,

    /// Directory for `background.png` and `piece.png`.
    #[arg(long)]
    out_dir: PathBuf,
}

#[derive(Parser, Debug)]
struct SimulateArgs {
    #[command(flatten)]
    common: ConfigArgs,

    /// Slider progress (0-100) to release at. Defaults to the aligned position.
    #[arg(long)]
    release_at: Option<u8>,

    /// Simulated milliseconds between slider updates.
    #[arg(long, default_value_t = 10)]
    step_ms: u64,

    /// Progress increment per slider update.
    #[arg(long, default_value_t = 5)]
    step: u8,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Simulate(args) => cmd_simulate(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();
}

fn build_captcha(args: &ConfigArgs) -> anyhow::Result<Captcha> {
    let mut config = match &args.config {
        Some(path) => CaptchaConfig::load(path)?,
        None => CaptchaConfig::default(),
    };
    if let Some(v) = args.piece_size {
        config.piece_size = v;
    }
    if let Some(v) = args.seed {
        config.seed = v;
    }
    if let Some(v) = args.margin {
        config.margin = v;
    }

    let source = load_image(&args.in_path)
        .with_context(|| format!("load source image '{}'", args.in_path.display()))?;
    let captcha = Captcha::with_defaults(config, source)
        .with_context(|| format!("build captcha for '{}'", args.in_path.display()))?;
    Ok(captcha)
}

fn write_png(path: &Path, surface: &RasterSurface) -> anyhow::Result<()> {
    image::save_buffer_with_format(
        path,
        &surface.to_straight_rgba8(),
        surface.width(),
        surface.height(),
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    eprintln!("wrote {}", path.display());
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let captcha = build_captcha(&args.common)?;
    let layers = captcha
        .layers()
        .context("captcha has no layers after construction")?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("create output dir '{}'", args.out_dir.display()))?;
    write_png(&args.out_dir.join("background.png"), &layers.background)?;
    write_png(&args.out_dir.join("piece.png"), &layers.piece)?;

    let report = serde_json::json!({
        "placement": layers.placement,
        "piece_size": captcha.config().piece_size,
        "extent": layers.mask().extent(),
        "canvas": layers.mask().canvas(),
        "pad": layers.mask().pad(),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_simulate(args: SimulateArgs) -> anyhow::Result<()> {
    if args.step == 0 {
        anyhow::bail!("--step must be > 0");
    }
    let clock = Arc::new(ManualClock::new(0));
    let shared: Arc<dyn Clock> = clock.clone();
    let mut captcha = build_captcha(&args.common)?.with_clock(shared);

    let target = match args.release_at {
        Some(p) => p.min(100),
        None => captcha
            .aligned_progress()
            .context("captcha has no placement")?,
    };

    let armed = captcha.slider_down(0);
    tracing::info!(?armed, target, "slider down");

    let mut progress = 0u8;
    while progress < target {
        progress = progress.saturating_add(args.step).min(target);
        clock.advance(args.step_ms);
        captcha.slider_progress(progress);
    }
    let notice = captcha.slider_up();

    let report = serde_json::json!({
        "placement": captcha.placement(),
        "release_progress": target,
        "piece_offset": captcha.piece_offset(),
        "result": notice.as_ref().map(|n| n.result),
        "message": notice.as_ref().map(|n| n.message.as_str()),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if notice.is_some_and(|n| n.result == VerificationResult::Failure) {
        eprintln!("verification failed");
    }
    Ok(())
}
