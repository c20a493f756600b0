use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use texkit::models::AppConfig;
use texkit::services::{parse_swizzle, TranscodeService};
use texkit_codec::{FormatKind, ImageLayout};

#[derive(Parser)]
#[command(name = "texkit")]
#[command(about = "Convert images to and from GPU and console texture formats")]
struct Cli {
    /// Configuration file (defaults to $TEXKIT_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported texture formats
    Formats,
    /// Decode a raw texture to PNG
    Decode {
        /// Format key (e.g. 0x10) or name (e.g. DXT1)
        #[arg(short, long)]
        format: String,

        #[arg(long)]
        width: usize,

        #[arg(long)]
        height: usize,

        /// Storage order: linear, morton, tiled:WxH or morton-tiled:N
        #[arg(long, default_value = "linear")]
        swizzle: String,

        input: PathBuf,
        output: PathBuf,
    },
    /// Encode a PNG into a raw texture
    Encode {
        /// Format key (e.g. 0x10) or name (e.g. DXT1)
        #[arg(short, long)]
        format: String,

        /// Storage order: linear, morton, tiled:WxH or morton-tiled:N
        #[arg(long, default_value = "linear")]
        swizzle: String,

        input: PathBuf,
        output: PathBuf,
    },
    /// Reduce a PNG to a palette, optionally dithered
    Quantize {
        #[command(flatten)]
        palette: PaletteArgs,

        input: PathBuf,
        output: PathBuf,
    },
    /// Encode a PNG as palette indices plus a separate palette
    Index {
        /// Index format key or name (e.g. I4, AI44)
        #[arg(long)]
        index_format: String,

        /// Palette color format key or name (e.g. RGB565)
        #[arg(long)]
        palette_format: String,

        /// Storage order of the index data
        #[arg(long, default_value = "linear")]
        swizzle: String,

        #[command(flatten)]
        palette: PaletteArgs,

        input: PathBuf,
        output: PathBuf,
        palette_output: PathBuf,
    },
    /// Decode palette indices plus palette back to PNG
    Unindex {
        #[arg(long)]
        index_format: String,

        #[arg(long)]
        palette_format: String,

        #[arg(long)]
        width: usize,

        #[arg(long)]
        height: usize,

        #[arg(long, default_value = "linear")]
        swizzle: String,

        input: PathBuf,
        palette_input: PathBuf,
        output: PathBuf,
    },
}

/// Quantize and dither overrides; unset flags keep the config file values
#[derive(Args)]
struct PaletteArgs {
    /// Palette size
    #[arg(short, long)]
    colors: Option<usize>,

    /// Dither algorithm (none, bayer2/4/8, floyd-steinberg, atkinson, ...)
    #[arg(short, long)]
    dither: Option<String>,

    /// Error diffusion worker threads (0 = one per CPU)
    #[arg(long)]
    threads: Option<usize>,

    /// Error diffusion lag between rows, in pixels
    #[arg(long)]
    threshold: Option<usize>,
}

impl PaletteArgs {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(colors) = self.colors {
            config.quantize.colors = colors;
        }
        if let Some(ref dither) = self.dither {
            config.dither.algorithm = dither.clone();
        }
        if let Some(threads) = self.threads {
            config.threads = threads;
        }
        if let Some(threshold) = self.threshold {
            config.dither.threshold = Some(threshold);
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Minimal logging for CLI
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "texkit=warn,texkit_codec=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().without_time())
        .init();

    let config_path = AppConfig::resolve_path(cli.config.as_deref());
    let mut config = AppConfig::load(config_path.as_deref());

    match cli.command {
        Commands::Formats => {
            let service = TranscodeService::new(&config)?;
            run_formats_command(&service);
            Ok(())
        }
        Commands::Decode {
            format,
            width,
            height,
            swizzle,
            input,
            output,
        } => {
            let service = TranscodeService::new(&config)?;
            let layout = ImageLayout::new(width, height).with_swizzle(parse_swizzle(&swizzle)?);
            service
                .decode_file(&format, layout, &input, &output)
                .with_context(|| format!("Failed to decode {}", input.display()))?;
            println!("{} -> {}", input.display(), output.display());
            Ok(())
        }
        Commands::Encode {
            format,
            swizzle,
            input,
            output,
        } => {
            let service = TranscodeService::new(&config)?;
            let bytes = service
                .encode_file(&format, parse_swizzle(&swizzle)?, &input, &output)
                .with_context(|| format!("Failed to encode {}", input.display()))?;
            println!("{} -> {} ({bytes} bytes)", input.display(), output.display());
            Ok(())
        }
        Commands::Quantize {
            palette,
            input,
            output,
        } => {
            palette.apply(&mut config);
            let service = TranscodeService::new(&config)?;
            let image = service
                .quantize_file(&input, &output)
                .with_context(|| format!("Failed to quantize {}", input.display()))?;
            println!(
                "{} -> {} ({} colors)",
                input.display(),
                output.display(),
                image.palette.len()
            );
            Ok(())
        }
        Commands::Index {
            index_format,
            palette_format,
            swizzle,
            palette,
            input,
            output,
            palette_output,
        } => {
            palette.apply(&mut config);
            let service = TranscodeService::new(&config)?;
            let colors = service
                .index_file(
                    &index_format,
                    &palette_format,
                    parse_swizzle(&swizzle)?,
                    &input,
                    &output,
                    &palette_output,
                )
                .with_context(|| format!("Failed to index {}", input.display()))?;
            println!(
                "{} -> {} + {} ({colors} colors)",
                input.display(),
                output.display(),
                palette_output.display()
            );
            Ok(())
        }
        Commands::Unindex {
            index_format,
            palette_format,
            width,
            height,
            swizzle,
            input,
            palette_input,
            output,
        } => {
            let service = TranscodeService::new(&config)?;
            let layout = ImageLayout::new(width, height).with_swizzle(parse_swizzle(&swizzle)?);
            service
                .unindex_file(
                    &index_format,
                    &palette_format,
                    layout,
                    &input,
                    &palette_input,
                    &output,
                )
                .with_context(|| format!("Failed to decode {}", display_pair(&input, &palette_input)))?;
            println!("{} -> {}", display_pair(&input, &palette_input), output.display());
            Ok(())
        }
    }
}

fn display_pair(a: &Path, b: &Path) -> String {
    format!("{} + {}", a.display(), b.display())
}

/// Print the format table
fn run_formats_command(service: &TranscodeService) {
    println!("{:<6} {:<10} {:>4}  {:<7}  kind", "key", "name", "bpp", "unit");
    for format in service.list_formats() {
        let kind = match format.kind {
            FormatKind::Color => "color",
            FormatKind::Indexed => "indexed",
        };
        let unit = format!("{}x{}", format.block.0, format.block.1);
        println!(
            "{:<6} {:<10} {:>4}  {:<7}  {kind}",
            format!("{:#04x}", format.key),
            format.name,
            format.bits_per_pixel,
            unit
        );
    }
}
