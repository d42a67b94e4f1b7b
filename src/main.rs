//! srs-engine CLI entry point.
//!
//! Parses command-line arguments, builds the configured backend, and
//! dispatches to the document pipeline.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde_json::Value;

use srs_engine::config::{LlmConfig, APP_NAME, APP_VERSION};
use srs_engine::document::{
    enhance_section, BuildOptions, DocumentBuilder, DocumentError, DocumentWriter,
    EnhanceKind, JsonDocumentWriter, MarkdownDocumentWriter, MermaidCliRenderer,
};
use srs_engine::pipeline::backend::build_client;
use srs_engine::pipeline::structuring::SectionOrchestrator;

#[derive(Parser)]
#[command(name = "srs-engine")]
#[command(
    version,
    about = "Generate a Software Requirements Specification from a project description",
    after_help = "EXAMPLES:
    # Build the SRS for a project description
    srs-engine build --input hiresmart.json --out-dir ./output

    # Also render interface diagrams (needs mmdc on PATH) and a Markdown copy
    srs-engine build --input hiresmart.json --render-diagrams --markdown

    # Polish a rough section draft
    srs-engine enhance --section core-features --text \"login, search, export\"

ENVIRONMENT:
    LLM_PROVIDER, LLM_MODEL, GROQ_MODEL, GEMINI_MODEL,
    GROQ_API_KEY, GEMINI_API_KEY / GOOGLE_API_KEY,
    SRS_LLM_TIMEOUT_SECS, SRS_MAX_OUTPUT_TOKENS, RUST_LOG"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate all seven sections and write the document
    Build {
        /// Project description (JSON object)
        #[arg(short, long)]
        input: PathBuf,

        /// Directory for the document and diagram images
        #[arg(short, long, default_value = "./output")]
        out_dir: PathBuf,

        /// Generate sections one at a time
        #[arg(long)]
        sequential: bool,

        /// Render interface diagrams to PNG with the Mermaid CLI
        #[arg(long)]
        render_diagrams: bool,

        /// Drop worked examples from system prompts
        #[arg(long)]
        compact_prompts: bool,

        /// Also write a Markdown rendition
        #[arg(long)]
        markdown: bool,
    },

    /// Rewrite rough notes for one free-text input section
    Enhance {
        #[arg(short, long, value_enum)]
        section: EnhanceKind,

        /// The notes to rewrite
        #[arg(short, long)]
        text: String,
    },

    /// Show the resolved backend configuration and check credentials
    CheckConfig,
}

fn main() {
    srs_engine::init_tracing();
    let cli = Cli::parse();
    let config = LlmConfig::from_env();

    let result = match cli.command {
        Commands::Build {
            input,
            out_dir,
            sequential,
            render_diagrams,
            compact_prompts,
            markdown,
        } => build_command(
            &config,
            &input,
            &out_dir,
            BuildOptions {
                concurrent: !sequential,
                compact_prompts,
                max_output_tokens: config.max_output_tokens,
            },
            render_diagrams,
            markdown,
        ),
        Commands::Enhance { section, text } => enhance_command(&config, section, &text),
        Commands::CheckConfig => check_config_command(&config),
    };

    if let Err(e) = result {
        eprintln!(
            "error [{}] ({}): {e}",
            e.error_code(),
            e.status_code().as_u16()
        );
        std::process::exit(1);
    }
}

fn orchestrator(config: &LlmConfig) -> Result<SectionOrchestrator, DocumentError> {
    let client = build_client(config)?;
    Ok(SectionOrchestrator::with_temperature(client, config.temperature))
}

fn build_command(
    config: &LlmConfig,
    input: &Path,
    out_dir: &Path,
    options: BuildOptions,
    render_diagrams: bool,
    markdown: bool,
) -> Result<(), DocumentError> {
    let raw = fs::read_to_string(input)?;
    let user_inputs: Value = serde_json::from_str(&raw)?;

    let builder = DocumentBuilder::new(orchestrator(config)?, options);
    let mut doc = builder.build(&user_inputs)?;

    fs::create_dir_all(out_dir)?;
    if render_diagrams {
        let renderer = MermaidCliRenderer::default();
        if renderer.is_available() {
            doc.render_diagrams(&renderer, out_dir);
        } else {
            tracing::warn!("mmdc not found on PATH, skipping diagram rendering");
        }
    }

    let json_path = JsonDocumentWriter.write(&doc, out_dir)?;
    println!("{}", json_path.display());
    if markdown {
        let md_path = MarkdownDocumentWriter.write(&doc, out_dir)?;
        println!("{}", md_path.display());
    }

    if !doc.diagram_placeholders.is_empty() {
        eprintln!(
            "note: placeholder diagrams used for {}",
            doc.diagram_placeholders.join(", ")
        );
    }
    Ok(())
}

fn enhance_command(config: &LlmConfig, kind: EnhanceKind, text: &str) -> Result<(), DocumentError> {
    let orchestrator = orchestrator(config)?;
    let enhanced = enhance_section(&orchestrator, kind, text, config.max_output_tokens)?;
    println!("{enhanced}");
    Ok(())
}

fn check_config_command(config: &LlmConfig) -> Result<(), DocumentError> {
    println!("{APP_NAME} v{APP_VERSION}");
    println!("provider:        {}", config.provider);
    println!("model:           {}", config.selected_model());
    println!("groq key:        {}", key_state(&config.groq_api_key));
    println!("gemini key:      {}", key_state(&config.gemini_api_key));
    println!("timeout:         {}s", config.timeout.as_secs());
    println!("max tokens:      {}", config.max_output_tokens);
    println!(
        "mermaid cli:     {}",
        if MermaidCliRenderer::default().is_available() {
            "available"
        } else {
            "not found"
        }
    );
    config.ensure_credentials()?;
    println!("credentials:     ok");
    Ok(())
}

fn key_state(key: &Option<String>) -> &'static str {
    if key.is_some() {
        "set"
    } else {
        "missing"
    }
}
