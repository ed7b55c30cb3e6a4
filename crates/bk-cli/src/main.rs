//! `bk`: export and normalize card templates from the command line.

use anyhow::{Context, Result, bail};
use bk_core::model::NodeKind;
use bk_core::{Template, assign_color_roles};
use bk_export::{ExportConfig, export_pdf, export_png, normalize_template};
use bk_render::{AssetCache, IconSet, Renderer, to_svg};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// Native-size PNG, no bleed
    Png,
    /// Print PDF with bleed, centred on the page
    Pdf,
    /// Vector SVG of the card
    Svg,
}

#[derive(Parser)]
#[command(name = "bk")]
#[command(about = "Export and normalize Badgekit card templates")]
struct Args {
    /// Log verbosity (-v debug, -vv trace). `RUST_LOG` overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Render a template to PNG, PDF or SVG
    Export {
        template: PathBuf,

        #[arg(short, long, value_enum, default_value = "png")]
        format: Format,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// JSON file with export settings (camelCase keys)
        #[arg(long)]
        config: Option<PathBuf>,

        /// PNG pixel ratio over the native size
        #[arg(long)]
        pixel_ratio: Option<f32>,

        /// PDF render resolution
        #[arg(long)]
        pdf_dpi: Option<f32>,

        /// PDF bleed per side, in millimetres
        #[arg(long)]
        bleed_mm: Option<f32>,
    },
    /// Renumber node ids and recompute color roles
    Normalize {
        template: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the inferred color role of every node
    Roles { template: PathBuf },
}

fn main() -> Result<()> {
    let args = Args::parse();
    let level = match args.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    match args.command {
        Command::Export {
            template,
            format,
            output,
            config,
            pixel_ratio,
            pdf_dpi,
            bleed_mm,
        } => {
            let mut cfg = load_config(config.as_deref())?;
            if let Some(v) = pixel_ratio {
                cfg.png_pixel_ratio = v;
            }
            if let Some(v) = pdf_dpi {
                cfg.pdf_dpi = v;
            }
            if let Some(v) = bleed_mm {
                cfg.bleed_mm = v;
            }
            run_export(&template, format, &output, &cfg)
        }
        Command::Normalize { template, output } => {
            let mut t = load_template(&template)?;
            normalize_template(&mut t)?;
            let json = t.to_json()?;
            match output {
                Some(path) => fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display())),
                None => {
                    println!("{json}");
                    Ok(())
                }
            }
        }
        Command::Roles { template } => {
            let t = load_template(&template)?;
            let roles = assign_color_roles(t.scene.nodes());
            println!("{}", serde_json::to_string_pretty(&roles)?);
            Ok(())
        }
    }
}

fn load_template(path: &Path) -> Result<Template> {
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Template::from_json(&text).with_context(|| format!("Failed to load template {}", path.display()))
}

fn load_config(path: Option<&Path>) -> Result<ExportConfig> {
    let Some(path) = path else {
        return Ok(ExportConfig::default());
    };
    let text = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Failed to parse export config {}", path.display()))
}

/// Load image sources that name files next to the template. Remote and
/// inline sources are left to the renderer.
fn load_local_assets(template: &Template, base: &Path) -> AssetCache {
    let mut assets = AssetCache::new();
    for node in template.scene.nodes() {
        let NodeKind::Image(img) = &node.kind else {
            continue;
        };
        let src = img.src.as_str();
        if src.is_empty() || src.starts_with("data:") || src.contains("://") {
            continue;
        }
        let path = base.join(src);
        match fs::read(&path) {
            Ok(bytes) => assets.insert_bytes(src, &bytes),
            Err(e) => {
                log::warn!("cannot read image {}: {e}", path.display());
                assets.mark_failed(src, &e.to_string());
            }
        }
    }
    assets
}

fn run_export(template_path: &Path, format: Format, output: &Path, config: &ExportConfig) -> Result<()> {
    let template = load_template(template_path)?;
    let base = template_path.parent().unwrap_or(Path::new("."));
    let assets = load_local_assets(&template, base);
    let icons = IconSet::new();
    let renderer = Renderer::new(&icons, &assets);

    let bytes = match format {
        Format::Png => export_png(&template.scene, &renderer, config)?,
        Format::Pdf => export_pdf(&template.scene, &renderer, config)?,
        Format::Svg => to_svg(&renderer.build(&template.scene)).into_bytes(),
    };
    if bytes.is_empty() {
        bail!("export produced no data");
    }
    // Only a finished export reaches the disk.
    fs::write(output, &bytes).with_context(|| format!("Failed to write {}", output.display()))?;
    log::info!("wrote {} ({} bytes)", output.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn export_flags_parse() {
        let args = Args::try_parse_from([
            "bk", "export", "card.json", "--format", "pdf", "-o", "card.pdf", "--bleed-mm", "5",
        ])
        .unwrap();
        match args.command {
            Command::Export {
                format, bleed_mm, ..
            } => {
                assert_eq!(format, Format::Pdf);
                assert_eq!(bleed_mm, Some(5.0));
            }
            _ => panic!("expected export"),
        }
    }

    #[test]
    fn export_requires_an_output() {
        assert!(Args::try_parse_from(["bk", "export", "card.json"]).is_err());
    }

    #[test]
    fn missing_config_is_default() {
        assert_eq!(load_config(None).unwrap(), ExportConfig::default());
    }
}
