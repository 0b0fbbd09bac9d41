use std::path::Path;

use anyhow::{Context, bail};
use bytes::Bytes;
use pictura_config::{ConfigScope, PicturaConfig, ProviderRole, ProviderSettings, Quality};
use pictura_core::ImageResult;
use pictura_imagegen::{
    EditImageOptions, EditOperation, GenerateImageOptions, GenerateImagesOptions, ImageGenError, ImageProviderRegistry,
    ModelWithFallbacks, ProviderConfigs, UpscaleOptions, builtin_image_providers, builtin_upscale_providers,
    edit_image, generate_image, upscale_image,
};
use pictura_output::{DEFAULT_SLUG_LENGTH, OutputManager, generate_slug, generate_timestamp};
use pictura_retry::{RetryOptions, with_retry};

use crate::{
    args::{EditArgs, EditKind, GenerateArgs, UpscaleArgs},
    store::{ConfigStore, mask_keys, parse_value},
};

pub async fn generate(store: &mut ConfigStore, project: &Path, args: GenerateArgs) -> anyhow::Result<()> {
    let config = store.load().await?.config;
    let registry = builtin_image_providers();
    let quality = args.quality.map_or(config.default_quality, Quality::from);

    let primary = args
        .model
        .unwrap_or_else(|| config.providers.generation.default.as_str().to_owned());
    let chain = std::iter::once(primary.as_str()).chain(args.fallbacks.iter().map(String::as_str));
    let (model, configs) = resolve_chain(&registry, store, chain, quality)?;

    let ratios = if let Some(preset) = args.preset {
        preset.ratios().to_vec()
    } else if args.ratios.is_empty() {
        vec![config.default_ratio]
    } else {
        args.ratios
    };
    let size = args.size.unwrap_or(config.image_size);
    let user_reference = match &args.reference {
        Some(path) => Some(read_image(path).await?),
        None => None,
    };

    let mut options = GenerateImagesOptions::new(model, args.prompt.as_str(), ratios)
        .with_size(size)
        .with_config(configs);
    if let Some(reference) = user_reference {
        options = options.with_reference(reference);
    }
    if let Some(negative) = &args.negative {
        options = options.with_negative_prompt(negative.as_str());
    }

    let results = generate_batch(&registry, &options, retry_options(config.retry_attempts)).await?;

    let slug = generate_slug(&args.prompt, DEFAULT_SLUG_LENGTH);
    let timestamp = generate_timestamp();
    let output = output_manager(project, &config);
    let paths = output.save_batch(&results, &slug, &timestamp).await?;

    println!("Generated {} image(s) for prompt: \"{}\"", results.len(), args.prompt);
    println!();
    println!("Slug: {slug}");
    println!("Timestamp: {timestamp}");
    println!("Model: {}", options.model.primary().model_id);
    println!();
    println!("Images:");
    for (result, path) in results.iter().zip(&paths) {
        println!(
            "  - {}: {} ({}x{}, {} {})",
            result.ratio,
            path.display(),
            result.width,
            result.height,
            result.provider,
            result.model
        );
    }

    Ok(())
}

/// Generate every ratio in order, retrying each image on its own
///
/// Without a caller-supplied reference the first image becomes the
/// reference for every later ratio.
async fn generate_batch(
    registry: &ImageProviderRegistry,
    options: &GenerateImagesOptions,
    retry: impl Fn() -> RetryOptions<ImageGenError>,
) -> anyhow::Result<Vec<ImageResult>> {
    let mut reference = options.reference.clone();
    let mut results: Vec<ImageResult> = Vec::with_capacity(options.ratios.len());

    for &ratio in &options.ratios {
        let mut single = GenerateImageOptions::new(options.model.clone(), options.prompt.as_str(), ratio)
            .with_size(options.size)
            .with_config(options.config.clone());
        if let Some(reference) = &reference {
            single = single.with_reference(reference.clone());
        }
        if let Some(negative) = &options.negative_prompt {
            single = single.with_negative_prompt(negative.as_str());
        }

        let result = with_retry(|| generate_image(registry, &single), retry())
            .await
            .map_err(|e| anyhow::anyhow!("Generation failed: {e}"))?;

        if reference.is_none() {
            reference = Some(result.data.clone());
        }
        results.push(result);
    }

    Ok(results)
}

pub async fn edit(store: &mut ConfigStore, project: &Path, args: EditArgs) -> anyhow::Result<()> {
    let config = store.load().await?.config;
    let registry = builtin_image_providers();

    let primary = args
        .model
        .unwrap_or_else(|| config.providers.generation.default.as_str().to_owned());
    let chain = std::iter::once(primary.as_str()).chain(args.fallbacks.iter().map(String::as_str));
    let (model, configs) = resolve_chain(&registry, store, chain, config.default_quality)?;

    let operation = match args.operation {
        EditKind::Refine => EditOperation::Refine,
        EditKind::Inpaint => EditOperation::Inpaint { mask: args.mask },
        EditKind::Outpaint => EditOperation::Outpaint {
            direction: args.direction,
        },
        EditKind::Restyle => EditOperation::Restyle {
            style_ref: match &args.style_ref {
                Some(path) => Some(read_image(path).await?),
                None => None,
            },
        },
    };

    let image = read_image(&args.image).await?;
    let options = EditImageOptions::new(model, image, args.prompt.as_str())
        .with_operation(operation)
        .with_config(configs);

    let result = edit_image(&registry, &options)
        .await
        .map_err(|e| anyhow::anyhow!("Edit failed: {e}"))?;

    let slug = generate_slug(&args.prompt, DEFAULT_SLUG_LENGTH);
    let timestamp = generate_timestamp();
    let path = output_manager(project, &config).save_image(&result, &slug, &timestamp).await?;

    println!(
        "Edited image ({}) saved to {} ({}x{}, {} {})",
        options.operation.name(),
        path.display(),
        result.width,
        result.height,
        result.provider,
        result.model
    );
    Ok(())
}

pub async fn upscale(store: &mut ConfigStore, project: &Path, args: UpscaleArgs) -> anyhow::Result<()> {
    let config = store.load().await?.config;
    let registry = builtin_upscale_providers();

    let provider = args
        .provider
        .unwrap_or_else(|| config.providers.upscale.default.as_str().to_owned());
    if !registry.contains(&provider) {
        return Err(ImageGenError::UpscaleProviderNotRegistered(provider).into());
    }
    let settings = store.provider_with_key(ProviderRole::Upscale, &provider)?;
    let model = args.model.or_else(|| settings.default_model.clone());

    let mut options = UpscaleOptions::new(provider.as_str(), read_image(&args.image).await?)
        .with_scale(args.scale)
        .with_config(settings);
    if let Some(model) = model {
        options = options.with_model(model);
    }

    let result = upscale_image(&registry, &options)
        .await
        .map_err(|e| anyhow::anyhow!("Upscale failed: {e}"))?;

    let stem = args
        .image
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let slug = format!("{}-upscaled", generate_slug(&stem, DEFAULT_SLUG_LENGTH));
    let timestamp = generate_timestamp();
    let path = output_manager(project, &config).save_image(&result, &slug, &timestamp).await?;

    println!(
        "Upscaled {}x to {} ({}x{}, {} {})",
        args.scale,
        path.display(),
        result.width,
        result.height,
        result.provider,
        result.model
    );
    Ok(())
}

pub async fn list(store: &mut ConfigStore, project: &Path, limit: usize, filter: Option<&str>) -> anyhow::Result<()> {
    let config = store.load().await?.config;
    let mut batches = output_manager(project, &config).list_batches(limit).await?;

    if let Some(filter) = filter {
        let filter = filter.to_lowercase();
        batches.retain(|batch| batch.slug.contains(&filter));
    }

    if batches.is_empty() {
        println!("No image batches found.");
        return Ok(());
    }

    for batch in &batches {
        println!("{} | {}", batch.timestamp, batch.slug);
        for image in &batch.images {
            println!("    - {}", image.ratio);
        }
    }
    Ok(())
}

pub async fn delete(store: &mut ConfigStore, project: &Path, timestamp: &str, slug: &str) -> anyhow::Result<()> {
    let config = store.load().await?.config;

    if output_manager(project, &config).delete_batch(timestamp, slug).await? {
        println!("Deleted batch {timestamp}/{slug}");
        Ok(())
    } else {
        bail!("no batch {slug} at {timestamp}\n  Run: pictura list");
    }
}

pub async fn config_show(store: &mut ConfigStore) -> anyhow::Result<()> {
    let loaded = store.load().await?;

    let mut document = serde_json::to_value(&loaded.config).context("failed to encode configuration")?;
    mask_keys(&mut document);
    println!("{}", serde_json::to_string_pretty(&document)?);

    println!();
    for path in store.paths() {
        let state = if tokio::fs::try_exists(path).await.unwrap_or(false) {
            "found"
        } else {
            "missing"
        };
        println!("{} ({state})", path.display());
    }

    if !loaded.sources.is_empty() {
        println!();
        println!("Sources:");
        for (key, source) in &loaded.sources {
            println!("  {key}: {source}");
        }
    }
    Ok(())
}

pub async fn config_set(store: &mut ConfigStore, scope: ConfigScope, key: &str, value: &str) -> anyhow::Result<()> {
    let path = store.set(scope, key, parse_value(value)).await?;
    println!("Set {key} in {}", path.display());
    Ok(())
}

/// Build a fallback chain from `provider[:model]` entries
///
/// The chain is usable as long as one of its providers has an API key;
/// the others fail inside the chain and are reported with the rest.
fn resolve_chain<'a>(
    registry: &ImageProviderRegistry,
    store: &ConfigStore,
    entries: impl Iterator<Item = &'a str>,
    quality: Quality,
) -> anyhow::Result<(ModelWithFallbacks, ProviderConfigs)> {
    let mut selectors = Vec::new();
    let mut configs = ProviderConfigs::default();

    for entry in entries {
        let (name, alias) = match entry.split_once(':') {
            Some((name, alias)) => (name, Some(alias)),
            None => (entry, None),
        };
        let provider = registry
            .get(name)
            .ok_or_else(|| ImageGenError::ProviderNotRegistered(name.to_owned()))?;
        let settings = store.provider(ProviderRole::Generation, name)?;
        let alias = alias.map_or_else(|| default_model(name, quality, &settings), str::to_owned);

        selectors.push(provider.model(&alias)?);
        configs = configs.with_provider(name, settings);
    }

    let keyed = selectors
        .iter()
        .any(|selector| configs.for_provider(&selector.provider).api_key().is_some());
    if !keyed && let Some(first) = selectors.first() {
        store.provider_with_key(ProviderRole::Generation, &first.provider)?;
    }

    Ok((ModelWithFallbacks::chain(selectors)?, configs))
}

/// Model alias used when an entry names only a provider
fn default_model(provider: &str, quality: Quality, settings: &ProviderSettings) -> String {
    match (provider, quality) {
        ("gemini", Quality::Draft) => "flash".to_owned(),
        ("openai", Quality::Draft) => "gpt-image-1-mini".to_owned(),
        ("gemini", Quality::Pro) => settings.default_model.clone().unwrap_or_else(|| "pro".to_owned()),
        _ => settings
            .default_model
            .clone()
            .unwrap_or_else(|| "gpt-image-1.5".to_owned()),
    }
}

fn retry_options(attempts: u32) -> impl Fn() -> RetryOptions<ImageGenError> {
    move || {
        RetryOptions::new(attempts).with_on_retry(|attempt, error, delay| {
            eprintln!("Attempt {attempt} failed ({error}), retrying in {}ms", delay.as_millis());
        })
    }
}

fn output_manager(project: &Path, config: &PicturaConfig) -> OutputManager {
    OutputManager::new(project.join(&config.output_dir))
}

async fn read_image(path: &Path) -> anyhow::Result<Bytes> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read image {}", path.display()))?;
    Ok(Bytes::from(data))
}
