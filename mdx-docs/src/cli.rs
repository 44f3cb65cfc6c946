///
/// This module implements the CLI interface for mdx-docs: command parsing,
/// argument validation and the async entrypoint shared by `main` and the
/// integration tests.
///
/// All conversion and publishing logic lives in [`mdx-docs-core`]; this
/// module only reads inputs, wires services and prints results.
///
/// ## Features
/// - [`Cli`] holds the global `--config` flag and the subcommand.
/// - [`run`] loads configuration, builds [`Services`] and routes the command.
/// - Failures propagate as `anyhow::Error`; `main` turns them into exit code 1.
///
/// [`mdx-docs-core`]: ../../mdx-docs-core/
use crate::load_config::load_config;
use crate::mcp;
use crate::services::Services;
use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use mdx_docs_core::contract::{
    ContentExtractor, ConversionOptions, PullRequestRequest, RepositoryHost, SourceDocument,
    TextRewriter,
};
use mdx_docs_core::convert::docx_to_markdown;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_COMMIT_MESSAGE: &str = "Add new documentation";
pub const DEFAULT_PR_TITLE: &str = "Add new documentation";

/// CLI for mdx-docs: turn documents into Docusaurus MDX and propose them as pull requests.
#[derive(Parser)]
#[clap(
    name = "mdx-docs",
    version,
    about = "Convert text and DOCX documents to Docusaurus MDX and open GitHub pull requests"
)]
pub struct Cli {
    /// Path to an optional YAML config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a text or DOCX document to MDX
    Convert {
        /// Input file (.txt, .md or .docx)
        #[clap(short, long)]
        input: PathBuf,
        /// Output file (default: input with an .mdx extension)
        #[clap(short, long)]
        output: Option<PathBuf>,
        /// Document title, used for front-matter
        #[clap(short, long)]
        title: Option<String>,
        /// Disable Docusaurus components enhancement
        #[clap(long)]
        no_components: bool,
    },
    /// Open a pull request adding an existing MDX file
    CreatePr {
        /// MDX file to publish
        #[clap(short, long)]
        input: PathBuf,
        /// Target repository as owner/repo
        #[clap(short, long)]
        repo: String,
        /// Path of the file inside the repository
        #[clap(short, long)]
        path: String,
        /// Commit message
        #[clap(short, long, default_value = DEFAULT_COMMIT_MESSAGE)]
        message: String,
        /// Pull request title
        #[clap(long, default_value = DEFAULT_PR_TITLE)]
        title: String,
        /// Pull request description (default from config)
        #[clap(long)]
        description: Option<String>,
        /// Branch name (default: generated)
        #[clap(long)]
        branch: Option<String>,
    },
    /// Convert a document and open a pull request with the result
    ConvertAndPr {
        #[clap(short, long)]
        input: PathBuf,
        #[clap(short, long)]
        repo: String,
        #[clap(short, long)]
        path: String,
        /// Document title, used for front-matter
        #[clap(short, long)]
        title: Option<String>,
        #[clap(short, long, default_value = DEFAULT_COMMIT_MESSAGE)]
        message: String,
        #[clap(long, default_value = DEFAULT_PR_TITLE)]
        pr_title: String,
        #[clap(long)]
        pr_description: Option<String>,
        #[clap(long)]
        branch: Option<String>,
        #[clap(long)]
        no_components: bool,
    },
    /// List the Docusaurus components used during enhancement
    Components,
    /// Extract a DOCX document without calling the model
    Extract {
        #[clap(short, long)]
        input: PathBuf,
        #[clap(long, value_enum, default_value_t = ExtractFormat::Markdown)]
        format: ExtractFormat,
        /// Output file (default: stdout)
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Rewrite a document following a custom instruction
    Rewrite {
        #[clap(short, long)]
        input: PathBuf,
        /// Instruction for the model
        #[clap(long)]
        prompt: String,
        /// Output file (default: stdout)
        #[clap(short, long)]
        output: Option<PathBuf>,
    },
    /// Check that a repository is reachable with the configured token
    CheckRepo {
        #[clap(short, long)]
        repo: String,
        /// Also list the entries of this directory
        #[clap(long)]
        path: Option<String>,
    },
    /// Run the MCP server on stdin/stdout
    Serve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExtractFormat {
    Text,
    Html,
    Markdown,
}

/// Split `owner/repo`.
pub fn parse_repository(repo: &str) -> Result<(String, String)> {
    match repo.split('/').collect::<Vec<_>>().as_slice() {
        [owner, name] if !owner.is_empty() && !name.is_empty() => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => bail!("Invalid repository format '{repo}'. Use: owner/repo"),
    }
}

/// Default output for `convert`: the input path with an `.mdx` extension.
pub fn default_output_path(input: &Path) -> PathBuf {
    input.with_extension("mdx")
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        bail!("Input file not found: {}", path.display());
    }
    Ok(())
}

fn read_source(path: &Path) -> Result<SourceDocument> {
    ensure_exists(path)?;
    let is_docx = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("docx"));
    if is_docx {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(SourceDocument::Docx(bytes))
    } else {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(SourceDocument::Text(text))
    }
}

fn write_or_print(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("📄 Output file: {}", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");
    let config = load_config(cli.config.as_deref())?;
    let services = Services::from_config(&config)?;
    execute(&services, cli.command).await
}

/// Route `command` against already-built services.
pub async fn execute<R, H>(services: &Services<R, H>, command: Commands) -> Result<()>
where
    R: TextRewriter + ?Sized,
    H: RepositoryHost,
{
    match command {
        Commands::Convert {
            input,
            output,
            title,
            no_components,
        } => {
            tracing::info!(command = "convert", input = %input.display(), "Converting document");
            println!("🔄 Converting document to MDX...");
            let document = read_source(&input)?;
            let output = output.unwrap_or_else(|| default_output_path(&input));
            let options = ConversionOptions {
                title,
                enhance_with_components: !no_components,
            };
            let mdx = services
                .converter()?
                .convert_to_mdx(&document, &options)
                .await?;
            fs::write(&output, &mdx)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("✅ Conversion completed!");
            println!("📄 Output file: {}", output.display());
            Ok(())
        }
        Commands::CreatePr {
            input,
            repo,
            path,
            message,
            title,
            description,
            branch,
        } => {
            let (owner, repo) = parse_repository(&repo)?;
            ensure_exists(&input)?;
            tracing::info!(command = "create-pr", owner = %owner, repo = %repo, "Creating pull request");
            println!("🚀 Creating GitHub PR...");
            let content = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let request = PullRequestRequest {
                owner,
                repo,
                file_path: path,
                content,
                commit_message: message,
                pr_title: title,
                pr_description: description,
                branch_name: branch,
            };
            let result = services
                .publisher()?
                .create_pull_request_with_content(&request)
                .await?;
            println!("✅ PR created successfully!");
            println!("🔗 PR URL: {}", result.pull_request_url);
            println!("🌿 Branch: {}", result.branch_name);
            Ok(())
        }
        Commands::ConvertAndPr {
            input,
            repo,
            path,
            title,
            message,
            pr_title,
            pr_description,
            branch,
            no_components,
        } => {
            let (owner, repo) = parse_repository(&repo)?;
            let document = read_source(&input)?;
            tracing::info!(command = "convert-and-pr", owner = %owner, repo = %repo, "Converting and publishing");
            println!("🔄 Converting document and creating PR...");
            let converter = services.converter()?;
            let publisher = services.publisher()?;
            let options = ConversionOptions {
                title,
                enhance_with_components: !no_components,
            };
            let mdx = converter.convert_to_mdx(&document, &options).await?;
            let request = PullRequestRequest {
                owner,
                repo,
                file_path: path,
                content: mdx,
                commit_message: message,
                pr_title,
                pr_description,
                branch_name: branch,
            };
            let result = publisher.create_pull_request_with_content(&request).await?;
            println!("✅ Conversion and PR creation completed!");
            println!("🔗 PR URL: {}", result.pull_request_url);
            println!("🌿 Branch: {}", result.branch_name);
            Ok(())
        }
        Commands::Components => {
            println!("📦 Available Docusaurus Components:\n");
            for component in services.components() {
                println!("🔸 {}", component.name);
                println!("   {}", component.description);
                println!("   Example: {}", component.example);
                println!();
            }
            Ok(())
        }
        Commands::Extract {
            input,
            format,
            output,
        } => {
            ensure_exists(&input)?;
            tracing::info!(command = "extract", input = %input.display(), format = ?format, "Extracting document");
            let bytes =
                fs::read(&input).with_context(|| format!("Failed to read {}", input.display()))?;
            let extractor = services.extractor();
            let content = match format {
                ExtractFormat::Text => extractor.extract_text(&bytes).await?.text,
                ExtractFormat::Html => extractor
                    .extract_text_and_html(&bytes)
                    .await?
                    .html
                    .ok_or_else(|| anyhow!("extractor returned no HTML"))?,
                ExtractFormat::Markdown => docx_to_markdown(extractor, &bytes).await?,
            };
            write_or_print(output.as_deref(), &content)
        }
        Commands::Rewrite {
            input,
            prompt,
            output,
        } => {
            ensure_exists(&input)?;
            tracing::info!(command = "rewrite", input = %input.display(), "Rewriting document");
            let text = fs::read_to_string(&input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            let rewritten = services
                .converter()?
                .convert_with_custom_prompt(&text, &prompt)
                .await?;
            write_or_print(output.as_deref(), &rewritten)
        }
        Commands::CheckRepo { repo, path } => {
            let (owner, repo) = parse_repository(&repo)?;
            let publisher = services.publisher()?;
            if !publisher.check_repository_access(&owner, &repo).await {
                bail!("Repository {owner}/{repo} is not accessible with the configured token");
            }
            println!("✅ Repository {owner}/{repo} is accessible");
            if let Some(path) = path {
                for name in publisher.list_repository_files(&owner, &repo, &path).await? {
                    println!("{name}");
                }
            }
            Ok(())
        }
        Commands::Serve => mcp::serve_stdio(services).await,
    }
}
