use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use pictura_config::{ConfigScope, Quality};
use pictura_core::{ImageSize, Preset, SupportedRatio};
use pictura_imagegen::{DEFAULT_UPSCALE_SCALE, OutpaintDirection};
use pictura_output::DEFAULT_LIST_LIMIT;

/// Pictura image generator
#[derive(Debug, Parser)]
#[command(name = "pictura", about = "Generate, edit and upscale images across AI providers")]
pub struct Args {
    /// Use a single configuration file instead of merging user and project config
    #[arg(short, long, env = "PICTURA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Project root holding project-scope config and generated output
    #[arg(long, default_value = ".", global = true)]
    pub project: PathBuf,

    /// Log filter, e.g. `info` or `pictura_imagegen=debug`
    #[arg(long, default_value = "warn", env = "PICTURA_LOG", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate images for one or more ratios
    Generate(GenerateArgs),
    /// Edit an existing image
    Edit(EditArgs),
    /// Upscale an existing image
    Upscale(UpscaleArgs),
    /// List recent batches
    List {
        #[arg(short, long, default_value_t = DEFAULT_LIST_LIMIT)]
        limit: usize,
        /// Only batches whose slug contains this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Delete a saved batch
    Delete { timestamp: String, slug: String },
    /// Inspect or change configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, clap::Args)]
pub struct GenerateArgs {
    pub prompt: String,

    /// Aspect ratio; repeat for several. Defaults to `defaultRatio`
    #[arg(short, long = "ratio")]
    pub ratios: Vec<SupportedRatio>,

    /// Named ratio bundle
    #[arg(long, conflicts_with = "ratios")]
    pub preset: Option<Preset>,

    /// Resolution tier. Defaults to `imageSize`
    #[arg(short, long)]
    pub size: Option<ImageSize>,

    /// Picks the model when `--model` names only a provider. Defaults to `defaultQuality`
    #[arg(short, long, value_enum)]
    pub quality: Option<QualityArg>,

    /// Primary model as `provider` or `provider:model`
    #[arg(short, long)]
    pub model: Option<String>,

    /// Fallback models tried in order, same form as `--model`
    #[arg(long = "fallback")]
    pub fallbacks: Vec<String>,

    /// Reference image for style and composition
    #[arg(long)]
    pub reference: Option<PathBuf>,

    /// Things the image should avoid
    #[arg(long)]
    pub negative: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum QualityArg {
    Draft,
    Pro,
}

impl From<QualityArg> for Quality {
    fn from(quality: QualityArg) -> Self {
        match quality {
            QualityArg::Draft => Self::Draft,
            QualityArg::Pro => Self::Pro,
        }
    }
}

#[derive(Debug, clap::Args)]
pub struct EditArgs {
    pub image: PathBuf,
    pub prompt: String,

    #[arg(short, long, value_enum, default_value_t = EditKind::Refine)]
    pub operation: EditKind,

    /// Region to change when inpainting
    #[arg(long)]
    pub mask: Option<String>,

    /// Side to extend when outpainting
    #[arg(long)]
    pub direction: Option<OutpaintDirection>,

    /// Style reference image when restyling
    #[arg(long)]
    pub style_ref: Option<PathBuf>,

    /// Primary model as `provider` or `provider:model`
    #[arg(short, long)]
    pub model: Option<String>,

    #[arg(long = "fallback")]
    pub fallbacks: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EditKind {
    Refine,
    Inpaint,
    Outpaint,
    Restyle,
}

#[derive(Debug, clap::Args)]
pub struct UpscaleArgs {
    pub image: PathBuf,

    #[arg(short, long, default_value_t = DEFAULT_UPSCALE_SCALE)]
    pub scale: u32,

    /// Upscale provider. Defaults to `providers.upscale.default`
    #[arg(short, long)]
    pub provider: Option<String>,

    /// Vendor model. Defaults to the provider's `defaultModel`
    #[arg(short, long)]
    pub model: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration with masked keys
    Show,
    /// Set one value by dotted key, e.g. `providers.generation.gemini.apiKey`
    Set {
        key: String,
        value: String,
        #[arg(long, value_enum, default_value_t = ScopeArg::User)]
        scope: ScopeArg,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeArg {
    User,
    Project,
}

impl From<ScopeArg> for ConfigScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::User => Self::User,
            ScopeArg::Project => Self::Project,
        }
    }
}
