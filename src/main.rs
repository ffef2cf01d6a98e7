use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{CommandFactory, Parser};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use loc_translator::locale::{format_price, route, Locale, RouteDecision};
use loc_translator::pipeline::{
    init_default_config, is_seo_document_type, seo_patch, ContentRequest, PipelineConfig,
    SeoDocument, SeoRequest, TranslatorPipeline,
};
use loc_translator::portable::{Document, Position};
use loc_translator::progress::ConsoleProgress;
use loc_translator::spans::{extract, reinject_with, Extraction};

#[derive(Parser, Debug)]
#[command(name = "loc-translator")]
#[command(about = "Portable-text translation helpers for the es/pt/en site", long_about = None)]
struct Args {
    /// Generate default config + prompt files, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write config/prompt files (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite existing config/prompt files when used with --init-config
    #[arg(long)]
    force: bool,

    /// Config file path (default: search for loc-translator.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Chat model (overrides [openai].model)
    #[arg(long)]
    model: Option<String>,

    /// API base URL (overrides [openai].base_url)
    #[arg(long)]
    base_url: Option<String>,

    /// Output JSON (default: stdout)
    #[arg(short, long, value_name = "JSON")]
    output: Option<PathBuf>,

    /// Extract span texts + positions from a portable-text body (no LLM)
    #[arg(long, value_name = "JSON")]
    extract: Option<PathBuf>,

    /// Reinject texts into a portable-text body; needs --positions and --texts (no LLM)
    #[arg(long, value_name = "JSON")]
    reinject: Option<PathBuf>,

    /// Positions JSON: output of --extract, or a bare [{"bi":..,"ci":..}] array
    #[arg(long, value_name = "JSON")]
    positions: Option<PathBuf>,

    /// Replacement texts JSON (array of strings, same order as positions)
    #[arg(long, value_name = "JSON")]
    texts: Option<PathBuf>,

    /// Keep the original span text when no replacement is supplied
    #[arg(long)]
    keep_original: bool,

    /// Translate {titleEs, shortEs, bodyEs} to en + pt
    #[arg(long, value_name = "JSON")]
    translate_content: Option<PathBuf>,

    /// Translate {titleEs, descriptionEs} SEO fields to en + pt
    #[arg(long, value_name = "JSON")]
    translate_seo: Option<PathBuf>,

    /// Translate a CMS document's Spanish SEO fields and print the fill-only-missing patch
    #[arg(long, value_name = "JSON")]
    seo_patch: Option<PathBuf>,

    /// With --seo-patch: act as the publish hook and skip documents without autoSyncSeo
    #[arg(long)]
    on_publish: bool,

    /// Print the locale routing decision for a request path
    #[arg(long, value_name = "PATH")]
    route: Option<String>,

    /// Accept-Language header used with --route
    #[arg(long, default_value = "")]
    accept_language: String,

    /// Print a USD price in the currency of --locale
    #[arg(long, value_name = "USD")]
    price: Option<f64>,

    /// Locale for --price (es, pt, en)
    #[arg(long, default_value = "es")]
    locale: String,

    /// Silence progress output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PositionsFile {
    Extraction(Extraction),
    Bare(Vec<Position>),
}

impl PositionsFile {
    fn into_positions(self) -> Vec<Position> {
        match self {
            PositionsFile::Extraction(ex) => ex.positions,
            PositionsFile::Bare(p) => p,
        }
    }
}

#[derive(Serialize)]
struct SeoPatchOutput {
    result: loc_translator::pipeline::SeoResult,
    patch: loc_translator::pipeline::SeoPatch,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet);

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        progress.info(format!("Wrote config: {}", cfg_path.display()));
        return Ok(());
    }

    if let Some(path) = args.route.as_deref() {
        match route(path, &args.accept_language) {
            RouteDecision::Pass => println!("pass"),
            RouteDecision::Redirect(to) => println!("redirect {to}"),
        }
        return Ok(());
    }

    let workdir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let load_cfg = || {
        PipelineConfig::from_paths_and_args(
            &workdir,
            args.config.clone(),
            args.model.clone(),
            args.base_url.clone(),
            args.keep_original,
        )
        .context("build config")
    };

    if let Some(usd) = args.price {
        let cfg = load_cfg()?;
        let locale: Locale = args.locale.parse()?;
        println!("{}", format_price(usd, locale, &cfg.rates));
        return Ok(());
    }

    if let Some(body_path) = args.extract.as_ref() {
        let body: Document = read_json(body_path)?;
        let ex = extract(&body);
        progress.info(format!("Extracted {} spans from {} blocks", ex.len(), body.len()));
        return write_json(args.output.as_deref(), &ex);
    }

    if let Some(body_path) = args.reinject.as_ref() {
        let positions_path = args
            .positions
            .as_ref()
            .context("--reinject requires --positions")?;
        let texts_path = args.texts.as_ref().context("--reinject requires --texts")?;
        let body: Document = read_json(body_path)?;
        let positions = read_json::<PositionsFile>(positions_path)?.into_positions();
        let texts: Vec<String> = read_json(texts_path)?;
        let missing = load_cfg()?.missing_replacement;
        let out = reinject_with(&body, &positions, &texts, missing);
        return write_json(args.output.as_deref(), &out);
    }

    if let Some(req_path) = args.translate_content.as_ref() {
        let req: ContentRequest = read_json(req_path)?;
        let cfg = load_cfg()?;
        let chat = cfg.open_chat()?;
        let mut pipeline = TranslatorPipeline::new(cfg, chat, progress);
        let out = pipeline.translate_content(&req)?;
        return write_json(args.output.as_deref(), &out);
    }

    if let Some(req_path) = args.translate_seo.as_ref() {
        let req: SeoRequest = read_json(req_path)?;
        let cfg = load_cfg()?;
        let chat = cfg.open_chat()?;
        let mut pipeline = TranslatorPipeline::new(cfg, chat, progress);
        let out = pipeline.translate_seo(&req)?;
        return write_json(args.output.as_deref(), &out);
    }

    if let Some(doc_path) = args.seo_patch.as_ref() {
        let doc: SeoDocument = read_json(doc_path)?;
        if !is_seo_document_type(&doc.doc_type) {
            progress.warn(format!("document type {:?} has no localized SEO", doc.doc_type));
            return Ok(());
        }
        let req = if args.on_publish {
            match doc.publish_sync_source() {
                Some(req) => req,
                None => {
                    progress.info("autoSyncSeo off or no Spanish SEO text; nothing to sync");
                    return Ok(());
                }
            }
        } else {
            doc.spanish_source()
                .context("fill in the Spanish SEO title or description before translating")?
        };
        let cfg = load_cfg()?;
        let chat = cfg.open_chat()?;
        let mut pipeline = TranslatorPipeline::new(cfg, chat, progress);
        let result = pipeline.translate_seo(&req)?;
        let patch = seo_patch(&doc, &result);
        if patch.is_empty() {
            log::info!("EN/PT already filled; no changes");
        }
        return write_json(args.output.as_deref(), &SeoPatchOutput { result, patch });
    }

    Args::command().print_help().context("print help")?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read json: {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse json: {}", path.display()))
}

fn write_json<T: Serialize>(output: Option<&Path>, value: &T) -> anyhow::Result<()> {
    let bytes = serde_json::to_vec_pretty(value).context("serialize json")?;
    match output {
        Some(p) => std::fs::write(p, bytes)
            .with_context(|| format!("write json: {}", p.display()))?,
        None => println!("{}", String::from_utf8_lossy(&bytes)),
    }
    Ok(())
}
