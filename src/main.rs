use clap::{Parser, Subcommand};
use image_effect::config::{self, AppConfig};
use image_effect::imaging::{ArrayBackend, BackendKind, ImageBackend, RasterBackend, ResizeBounds};
use image_effect::output;
use image_effect::session::Session;
use std::io;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "image-effect")]
#[command(about = "Open an image from disk or a URL, then resize, filter and save it")]
#[command(long_about = "\
Open an image from disk or a URL, then resize, filter and save it

The image is loaded once and edited in place through a small menu:

  [s]how    display the current image
  [w]rite   save to a path (extension kept, or the default appended)
  [r]esize  crop toward the target aspect ratio, then scale exactly
  [f]ilter  blur, sharpen, smooth or custom
  [i]nfo    dimensions, channels and format
  [l]oad    replace the image with a new source
  [q]uit

Two engines are available and one is chosen per session:

  raster   bitmap object, 8-bit kernels, keeps the source format on save
  array    height x width x channel array, float filters, saves PNG

Run 'image-effect gen-config' to generate a documented image-effect.toml.")]
#[command(version)]
struct Cli {
    /// Engine to use (overrides the config file)
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    /// Directory holding image-effect.toml
    #[arg(long, default_value = ".", global = true)]
    config_dir: PathBuf,

    /// Fallback directory for saves (overrides the config file)
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Log progress at info level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive session (the default)
    Open {
        /// Local path or http(s) URL; prompted for when omitted
        source: Option<String>,
    },
    /// List the filters and parameters of the selected backend
    Filters,
    /// Print a stock image-effect.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let command = cli.command.unwrap_or(Command::Open { source: None });
    if let Command::GenConfig = command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let mut app_config = config::load_config(&cli.config_dir)?;
    if let Some(backend) = cli.backend {
        app_config.backend = backend;
    }
    if let Some(output_dir) = cli.output_dir {
        app_config.output_dir = output_dir;
    }
    app_config.validate()?;

    let settings = app_config.backend_settings();
    match app_config.backend {
        BackendKind::Raster => dispatch(RasterBackend::new(settings), command, &app_config),
        BackendKind::Array => dispatch(ArrayBackend::new(settings), command, &app_config),
    }
}

/// Everything after backend selection is monomorphic in `B`.
fn dispatch<B: ImageBackend + Clone>(
    backend: B,
    command: Command,
    app_config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Open { source } => {
            run_session(backend, source.as_deref(), app_config.resize_bounds())
        }
        Command::Filters => {
            output::print_filter_catalog(backend.filters());
            Ok(())
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            Ok(())
        }
    }
}

fn run_session<B: ImageBackend + Clone>(
    backend: B,
    source: Option<&str>,
    bounds: ResizeBounds,
) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let stdout = io::stdout();
    match Session::start(backend, bounds, source, stdin.lock(), stdout.lock())? {
        Some(mut session) => session.run()?,
        None => println!(),
    }
    Ok(())
}
