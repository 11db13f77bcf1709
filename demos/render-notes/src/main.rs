//! Renders creator notes into public and private markdown pages.
//!
//! ```text
//! render-notes families
//! render-notes inspect public_markdown
//! render-notes render --title "Tool library" --notes-file notes.txt --dry-run
//! render-notes render --title "Tool library" --summary "Shared tools for the block"
//! ```

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use notegen_adapters::openai::{OpenAiConfig, OpenAiService};
use notegen_adapters::{CompletionDispatcher, CompletionService};
use notegen_config::NotegenConfig;
use notegen_kernel::{Assistant, Pipeline, PipelineResult, Rendering, SectionRouter};
use notegen_prompts::builtin::{PRIVATE_MARKDOWN, PUBLIC_MARKDOWN, register_defaults};
use notegen_prompts::{
    ConstraintExtractor, SourceNotes, TemplateStore, VariantResolver, bind, files,
};
use notegen_telemetry::TracingConfig;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "render-notes",
    about = "Render creator notes into public and private markdown",
    version
)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "NOTEGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of extra template files registered after the built-ins.
    #[arg(short, long, env = "NOTEGEN_TEMPLATES")]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered families and their active variants.
    Families,
    /// Show the variant history and constraint overrides of one family.
    Inspect {
        /// Family key, e.g. `public_markdown`.
        family: String,
    },
    /// Render a submission.
    Render(RenderArgs),
}

#[derive(clap::Args)]
struct RenderArgs {
    /// Idea title.
    #[arg(long)]
    title: String,

    /// One-paragraph summary.
    #[arg(long)]
    summary: Option<String>,

    /// Free-form notes.
    #[arg(long, conflicts_with = "notes_file")]
    notes: Option<String>,

    /// Read the notes from a file instead.
    #[arg(long)]
    notes_file: Option<PathBuf>,

    /// Reference link; may be repeated.
    #[arg(long = "link")]
    links: Vec<String>,

    /// Print the bound instructions without calling the completion service.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    TracingConfig::default().with_target(false).init()?;

    let cli = Cli::parse();
    let config = notegen_config::loader::load(cli.config.as_deref())
        .context("failed to load configuration")?;
    let store = build_store(&config, cli.templates.as_ref())?;

    match cli.command {
        Command::Families => list_families(&store),
        Command::Inspect { family } => inspect(&store, &family),
        Command::Render(args) => render(&config, store, args).await,
    }
}

fn build_store(config: &NotegenConfig, templates: Option<&PathBuf>) -> Result<Arc<TemplateStore>> {
    let extractor =
        ConstraintExtractor::from_config(config).context("invalid constraint vocabulary")?;
    let store = TemplateStore::new(extractor);
    register_defaults(&store).context("failed to register built-in templates")?;

    if let Some(dir) = templates {
        let loaded = files::load_dir(&store, dir)
            .with_context(|| format!("failed to load templates from {}", dir.display()))?;
        info!(dir = %dir.display(), loaded, "templates loaded");
    }

    Ok(Arc::new(store))
}

fn list_families(store: &Arc<TemplateStore>) -> Result<()> {
    let resolver = VariantResolver::new(store.clone());
    for family in store.families() {
        let resolution = resolver.resolve(family.as_str())?;
        let selected = resolution.selected();
        let kinds: Vec<String> = selected
            .constraints()
            .kinds()
            .iter()
            .map(ToString::to_string)
            .collect();
        println!(
            "{family:<24} {category:<8} variant {number} of {total}  [{kinds}]",
            family = family.as_str(),
            category = resolution.category().as_str(),
            number = selected.index() + 1,
            total = resolution.history().len(),
            kinds = kinds.join(", "),
        );
    }
    Ok(())
}

fn inspect(store: &Arc<TemplateStore>, family: &str) -> Result<()> {
    let resolution = VariantResolver::new(store.clone()).resolve(family)?;
    println!("{} ({})", resolution.family(), resolution.category());

    for variant in resolution.history() {
        let marker = if variant.index() == resolution.selected().index() {
            "*"
        } else {
            " "
        };
        println!("{marker} variant {}", variant.index() + 1);
        for constraint in variant.constraints() {
            println!("    {constraint}");
        }
    }

    if resolution.is_override() {
        println!("overrides:");
        for change in resolution.overrides() {
            println!("    {:?} {:?}", change.kind, change.change);
        }
    }
    Ok(())
}

async fn render(config: &NotegenConfig, store: Arc<TemplateStore>, args: RenderArgs) -> Result<()> {
    let dry_run = args.dry_run;
    let notes = source_notes(args)?;
    if notes.is_blank() {
        bail!("nothing to render: the submission is empty");
    }
    let resolver = VariantResolver::new(store.clone());

    if dry_run {
        let context = notes.to_context();
        for family in [PUBLIC_MARKDOWN, PRIVATE_MARKDOWN] {
            let resolution = resolver.resolve(family)?;
            let instruction = bind(resolution.selected(), &context)?;
            println!("=== {family} (variant {}) ===", resolution.selected().index() + 1);
            println!("{instruction}\n");
        }
        return Ok(());
    }

    let service: Arc<dyn CompletionService> = Arc::new(OpenAiService::new(
        OpenAiConfig::from_completion_config(&config.completion)?,
    )?);
    let assistant = Assistant::new(
        resolver,
        CompletionDispatcher::from_config(service.clone(), &config.completion),
    );
    let pipeline = Pipeline::from_config(config, store, service, SectionRouter::default());

    let title = assistant.suggest_title(&notes).await;
    println!("Title: {title}\n");

    let rendering = pipeline.render_submission(&notes.retitled(title.as_str())).await;
    let public = print_rendering("public", &rendering.public);
    let private = print_rendering("private", &rendering.private);

    let questions = assistant.clarifying_questions(&title, public, private).await;
    if !questions.is_empty() {
        println!("Clarifying questions:");
        for (number, question) in questions.iter().enumerate() {
            println!("  {}. {question}", number + 1);
        }
    }
    Ok(())
}

fn source_notes(args: RenderArgs) -> Result<SourceNotes> {
    let mut notes = SourceNotes::new(args.title);
    if let Some(summary) = args.summary {
        notes = notes.with_summary(summary);
    }
    let body = match args.notes_file {
        Some(path) => Some(
            fs::read_to_string(&path)
                .with_context(|| format!("failed to read notes from {}", path.display()))?,
        ),
        None => args.notes,
    };
    if let Some(body) = body {
        notes = notes.with_notes(body);
    }
    for link in args.links {
        notes = notes.with_link(link);
    }
    Ok(notes)
}

fn print_rendering<'a>(surface: &str, rendering: &'a PipelineResult<Rendering>) -> &'a str {
    match rendering {
        Ok(rendering) => {
            println!("=== {surface} ({:?}) ===", rendering.routing());
            for check in rendering.outcome().checks() {
                println!("  - {}", check.describe());
            }
            println!("\n{}\n", rendering.output());
            rendering.output()
        }
        Err(err) => {
            eprintln!("{surface} rendering failed: {err}");
            ""
        }
    }
}
