//! # Roundel CLI
//!
//! Command-line interface for print-accurate photo logos.
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! roundel serve --listen 0.0.0.0:8080
//!
//! # Crop a photo to a circle and print its dominant color
//! roundel crop photo.jpg --x 100 --y 50 --width 800 --height 800 --out crop.png
//!
//! # Dominant (or average) color of an image
//! roundel color crop.png --average
//!
//! # Export a square logo with a custom border color
//! roundel export photo.jpg --shape square --color '#c0ffee' --out logo.pdf
//!
//! # Remote photos go through the image relay
//! roundel export https://example.com/photo.jpg --blur 12 --png preview.png
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use roundel::{
    RoundelError, Shape,
    export::{BlurLevel, EXPORT_FILE_NAME, ExportCompositor},
    pipeline::Pipeline,
    relay::RelayConfig,
    render::{color, crop::CropRegion},
    server::{self, ServerConfig},
    source::{ImageRef, SourceImage},
};

/// Roundel - print-accurate photo logos
#[derive(Parser, Debug)]
#[command(name = "roundel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP server (image relay and logo API)
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: String,
    },

    /// Crop an image and report its dominant color
    Crop {
        /// Input image path
        input: PathBuf,

        #[arg(long, default_value = "0")]
        x: u32,

        #[arg(long, default_value = "0")]
        y: u32,

        #[arg(long)]
        width: u32,

        #[arg(long)]
        height: u32,

        /// Mask shape
        #[arg(long, value_enum, default_value = "round")]
        shape: Shape,

        /// Output PNG
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },

    /// Print the dominant color of an image
    Color {
        /// Input image path
        input: PathBuf,

        /// Alpha-weighted average instead of the most frequent color
        #[arg(long)]
        average: bool,
    },

    /// Export a logo as a print-sized PDF
    Export {
        /// Input image path or http(s) URL
        input: String,

        /// Crop rectangle as x,y,width,height (defaults to the centred square)
        #[arg(long, value_parser = parse_crop)]
        crop: Option<(u32, u32, u32, u32)>,

        /// Logo shape
        #[arg(long, value_enum, default_value = "round")]
        shape: Shape,

        /// Background blur level (1-20)
        #[arg(long, default_value = "5")]
        blur: u8,

        /// Border color (#rrggbb), overriding the dominant color
        #[arg(long)]
        color: Option<String>,

        /// Output PDF
        #[arg(long, value_name = "FILE", default_value = EXPORT_FILE_NAME)]
        out: PathBuf,

        /// Also save the print snapshot as PNG
        #[arg(long, value_name = "FILE")]
        png: Option<PathBuf>,
    },
}

/// Parse `x,y,width,height`.
fn parse_crop(s: &str) -> Result<(u32, u32, u32, u32), String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<u32>().map_err(|e| format!("'{}': {}", p, e)))
        .collect::<Result<Vec<_>, _>>()?;
    match parts.as_slice() {
        [x, y, w, h] => Ok((*x, *y, *w, *h)),
        _ => Err(format!("expected x,y,width,height, got '{}'", s)),
    }
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), RoundelError> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { listen } => {
            let config = ServerConfig {
                listen_addr: listen,
                relay: RelayConfig::default(),
            };
            server::serve(config).await?;
        }

        Commands::Crop {
            input,
            x,
            y,
            width,
            height,
            shape,
            out,
        } => {
            let source = SourceImage::decode(ImageRef::File(input)).await?;
            let cropped = roundel::render::crop::crop(&source, CropRegion::new(x, y, width, height, shape)).await?;
            let sample = color::extract_dominant(&cropped.to_ref()).await?;

            std::fs::write(&out, &cropped.png)?;
            println!("Cropped {}x{} ({})", cropped.side(), cropped.side(), shape);
            println!("Dominant color: {}", sample.hex);
            println!("Saved to {}", out.display());
        }

        Commands::Color { input, average } => {
            let image = ImageRef::File(input).decode()?;
            let sample = if average {
                color::average_color(&image)
            } else {
                color::dominant_color(&image)
            };
            println!("{}", sample.hex);
        }

        Commands::Export {
            input,
            crop,
            shape,
            blur,
            color,
            out,
            png,
        } => {
            let pipeline = Pipeline::new(ExportCompositor::with_defaults()?);
            let source = pipeline.load(ImageRef::from_location(&input)).await?;

            let region = match crop {
                Some((x, y, w, h)) => CropRegion::new(x, y, w, h, shape),
                None => CropRegion::centered(source.width(), source.height(), shape),
            };
            let outcome = pipeline.crop(region).await?;
            println!("Cropped {}x{} ({}), dominant color {}", outcome.side, outcome.side, shape, outcome.color.hex);

            if let Some(hex) = color {
                let sample = pipeline.set_color_hex(&hex).await?;
                println!("Border color {}", sample.hex);
            }
            pipeline.set_blur(BlurLevel::new(blur)?).await;

            if let Some(png_path) = png {
                let snapshot = pipeline.preview().await?;
                std::fs::write(&png_path, snapshot)?;
                println!("Saved snapshot to {}", png_path.display());
            }

            let artifact = pipeline.export().await?;
            let page_mm = artifact.page_mm;
            let path = artifact.save(&out)?;
            println!("Saved {}mm page to {}", page_mm, path.display());
        }
    }

    Ok(())
}
