//! Screen Translator CLI - Classify and translate subtitle lines from the command line.

use anyhow::{Context, Result};
use clap::Parser;
use screen_translator_core::{
    classifier, config::AUTO_LANG, AppConfig, Lang, ProviderConfig, SubtitleClassification, TranslationDispatcher,
    TranslationRequest, TranslationResult,
};
use serde::Serialize;
use std::io::BufRead;
use std::path::PathBuf;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_API_BASE: &str = "http://localhost:8080/v1";
const CLI_PROVIDER: &str = "cli";

#[derive(Parser, Debug)]
#[command(name = "screen-translate")]
#[command(author, version, about = "Classify and translate subtitle text", long_about = None)]
struct Args {
    /// Lines to translate (read from stdin when omitted)
    text: Vec<String>,

    /// Source language code ("auto" to let the provider detect it)
    #[arg(short = 's', long)]
    source: Option<String>,

    /// Target language code
    #[arg(short = 't', long)]
    target: Option<String>,

    /// OpenAI API base URL
    #[arg(long, env = "OPENAI_API_BASE")]
    api_base: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY")]
    api_key: Option<String>,

    /// Model name for OpenAI-compatible API
    #[arg(long, env = "OPENAI_MODEL", default_value = "default_model")]
    model: String,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Skip lines that do not look like subtitles (also `monitor.subtitles_only`)
    #[arg(long)]
    subtitles_only: bool,

    /// Print one JSON object per line
    #[arg(long)]
    json: bool,

    /// Print translation statistics at exit
    #[arg(long)]
    stats: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Serialize)]
struct LineOutput<'a> {
    classification: &'a SubtitleClassification,
    #[serde(flatten)]
    result: &'a TranslationResult,
}

/// Apply command-line overrides on top of the loaded configuration
fn apply_overrides(config: &mut AppConfig, args: &Args) {
    if let Some(source) = &args.source {
        config.source_lang = (source != AUTO_LANG).then(|| Lang::new(source));
    }
    if let Some(target) = &args.target {
        config.target_lang = Lang::new(target);
    }
    config.monitor.subtitles_only |= args.subtitles_only;

    // An explicit endpoint goes first; with no endpoint at all, fall back to a local server
    if args.api_base.is_some() || config.providers.is_empty() {
        let api_base = args.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);
        let mut provider = ProviderConfig::new(CLI_PROVIDER, api_base, args.api_key.clone(), &args.model);
        provider.priority = config
            .providers
            .iter()
            .map(|p| p.priority)
            .min()
            .map_or(0, |min| min.saturating_sub(1));
        config.providers.retain(|p| p.name != CLI_PROVIDER);
        config.providers.push(provider);
    }
}

/// Positional arguments, or stdin lines when there are none
fn collect_inputs(args: &[String]) -> Result<Vec<String>> {
    let lines = if args.is_empty() {
        std::io::stdin()
            .lock()
            .lines()
            .collect::<std::io::Result<Vec<_>>>()
            .context("Failed to read stdin")?
    } else {
        args.to_vec()
    };

    Ok(lines
        .into_iter()
        .map(|line| line.trim().to_string())
        .filter(|line| !line.is_empty())
        .collect())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (before parsing args so env vars are available)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Setup logging
    let log_level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Load or create config
    let mut config = if let Some(config_path) = &args.config {
        AppConfig::from_file(config_path).context("Failed to load config file")?
    } else {
        AppConfig::load()
    };
    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    let dispatcher =
        TranslationDispatcher::from_config(&config).context("Failed to initialize providers")?;
    dispatcher.initialize().await;

    let inputs = collect_inputs(&args.text)?;
    info!("Translating {} lines to {}", inputs.len(), config.target_lang);

    for text in inputs {
        let classification = classifier::classify_with(&text, &config.classifier);
        if config.monitor.subtitles_only && !classification.is_subtitle {
            info!("Skipping non-subtitle line: {}", text);
            continue;
        }

        let request = TranslationRequest::new(text, config.source_lang.clone(), config.target_lang.clone());
        let result = dispatcher.translate(&request).await;
        if result.from_cache() {
            debug!("Served from cache: {}", request.text);
        } else if result.is_fallback() {
            warn!("No translation available: {}", request.text);
        }

        let line = if args.json {
            serde_json::to_string(&LineOutput {
                classification: &classification,
                result: &result,
            })
            .context("Failed to encode result")?
        } else {
            result.translated_text
        };

        // CLI output is intentional
        #[allow(clippy::print_stdout)]
        {
            println!("{line}");
        }
    }

    if args.stats {
        let stats = dispatcher.stats();
        let cache = dispatcher.cache_stats();

        // CLI output is intentional
        #[allow(clippy::print_stderr)]
        {
            eprintln!(
                "translations: {}  cache hits: {} ({:.0}%)  avg latency: {:.1} ms  init: {} ms",
                stats.total_translations,
                stats.cache_hits,
                stats.cache_hit_rate() * 100.0,
                stats.rolling_avg_latency_ms,
                stats.last_init_duration_ms
            );
            eprintln!("cache: {}/{} entries", cache.size, cache.capacity);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        Args::parse_from(std::iter::once("screen-translate").chain(extra.iter().copied()))
    }

    #[test]
    fn test_local_provider_added_when_none_configured() {
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args(&["-t", "fr", "Hello."]));

        assert!(config.source_lang.is_none());
        assert_eq!(config.target_lang.as_str(), "fr");
        assert_eq!(config.providers.len(), 1);
        assert_eq!(config.providers[0].name, CLI_PROVIDER);
    }

    #[test]
    fn test_explicit_endpoint_goes_first() {
        let mut config = AppConfig::default();
        let mut existing = ProviderConfig::new("cloud", "https://api.example.com/v1", None, "m");
        existing.priority = 1;
        config.providers.push(existing);

        apply_overrides(
            &mut config,
            &args(&["--api-base", "http://localhost:9000/v1", "-s", "ja", "Hi."]),
        );

        assert_eq!(config.source_lang.as_ref().map(Lang::as_str), Some("ja"));
        let cli = config.providers.iter().find(|p| p.name == CLI_PROVIDER).unwrap();
        assert_eq!(cli.priority, 0);
        assert_eq!(cli.api_base, "http://localhost:9000/v1");
    }

    #[test]
    fn test_configured_source_kept_without_flag() {
        let mut config = AppConfig::default();
        config.source_lang = Some(Lang::new("ja"));
        apply_overrides(&mut config, &args(&["Hello."]));
        assert_eq!(config.source_lang.as_ref().map(Lang::as_str), Some("ja"));

        apply_overrides(&mut config, &args(&["-s", "auto", "Hello."]));
        assert!(config.source_lang.is_none());
    }

    #[test]
    fn test_subtitles_only_from_config_or_flag() {
        let mut config = AppConfig::default();
        config.monitor.subtitles_only = true;
        apply_overrides(&mut config, &args(&["Hello."]));
        assert!(config.monitor.subtitles_only);

        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args(&["--subtitles-only", "Hello."]));
        assert!(config.monitor.subtitles_only);

        let mut config = AppConfig::default();
        apply_overrides(&mut config, &args(&["Hello."]));
        assert!(!config.monitor.subtitles_only);
    }

    #[test]
    fn test_collect_inputs_skips_blank_lines() {
        let inputs = collect_inputs(&["  Hello. ".to_string(), "   ".to_string()]).unwrap();
        assert_eq!(inputs, vec!["Hello."]);
    }
}
