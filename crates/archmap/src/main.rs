use std::path::{Path, PathBuf};
use std::process;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use archmap_core::cache::DiagramCache;
use archmap_core::config::ProjectConfig;
use archmap_core::layout::{plan, LayoutOptions};
use archmap_core::pipeline::AnalysisPipeline;
use archmap_core::types::AnalysisResult;
use archmap_go::GoParser;
use archmap_java::JavaParser;
use archmap_python::PythonParser;
use archmap_report::{drawio, html, json, mermaid, text};
use archmap_typescript::TypeScriptParser;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum DiagramFormat {
    Drawio,
    Mermaid,
    Html,
}

impl DiagramFormat {
    fn extension(self) -> &'static str {
        match self {
            DiagramFormat::Drawio => "drawio",
            DiagramFormat::Mermaid => "mmd",
            DiagramFormat::Html => "html",
        }
    }
}

#[derive(Parser)]
#[command(name = "archmap")]
#[command(about = "Analyze module dependencies, layers and architecture health")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a repository and print the health report
    Analyze {
        /// Path to the project root
        path: PathBuf,
        /// Config file path (defaults to .archmap.toml in the project root)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output format
        #[arg(long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
        /// Compact output (single-line JSON)
        #[arg(long)]
        compact: bool,
    },
    /// Render an architecture diagram
    Diagram {
        /// Path to the project root
        path: PathBuf,
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Diagram format
        #[arg(long, value_enum, default_value_t = DiagramFormat::Drawio)]
        format: DiagramFormat,
        /// Write to this file instead of the configured output location
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print to stdout instead of writing a file
        #[arg(long)]
        stdout: bool,
        /// Skip the write when the diagram is unchanged since the last run
        #[arg(long)]
        if_changed: bool,
        /// Reorder modules within each band to reduce edge crossings
        #[arg(long)]
        minimize_crossings: bool,
    },
    /// Analyze and exit non-zero when the health score is below a threshold
    Check {
        /// Path to the project root
        path: PathBuf,
        /// Config file path
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Minimum acceptable health score
        #[arg(long, default_value_t = 70)]
        min_score: u32,
    },
    /// Create a default .archmap.toml configuration file
    Init {
        /// Overwrite an existing config
        #[arg(long)]
        force: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let outcome = match cli.command {
        Commands::Analyze {
            path,
            config,
            format,
            compact,
        } => run_analyze(&path, config.as_deref(), format, compact),
        Commands::Diagram {
            path,
            config,
            format,
            output,
            stdout,
            if_changed,
            minimize_crossings,
        } => run_diagram(
            &path,
            config.as_deref(),
            format,
            output,
            stdout,
            if_changed,
            minimize_crossings,
        ),
        Commands::Check {
            path,
            config,
            min_score,
        } => run_check(&path, config.as_deref(), min_score),
        Commands::Init { force } => run_init(force),
    };

    match outcome {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("{} {err:#}", "Error:".red().bold());
            process::exit(1);
        }
    }
}

fn load_config(root: &Path, config_path: Option<&Path>) -> Result<ProjectConfig> {
    match config_path {
        Some(path) => ProjectConfig::load(path),
        None => Ok(ProjectConfig::load_or_default(root)),
    }
}

fn build_pipeline(config: ProjectConfig) -> AnalysisPipeline {
    AnalysisPipeline::new(
        vec![
            Box::new(TypeScriptParser::new()),
            Box::new(PythonParser::new()),
            Box::new(GoParser::new()),
            Box::new(JavaParser::new()),
        ],
        config,
    )
}

fn analyze(root: &Path, config_path: Option<&Path>) -> Result<(AnalysisResult, ProjectConfig)> {
    let config = load_config(root, config_path)?;
    let pipeline = build_pipeline(config.clone());
    let result = pipeline.analyze(root)?;
    Ok((result, config))
}

fn run_analyze(
    root: &Path,
    config_path: Option<&Path>,
    format: ReportFormat,
    compact: bool,
) -> Result<i32> {
    let (result, _) = analyze(root, config_path)?;
    match format {
        ReportFormat::Text => println!("{}", text::format_report(&result)),
        ReportFormat::Json => println!("{}", json::format_report(&result, compact)),
    }
    Ok(0)
}

fn run_diagram(
    root: &Path,
    config_path: Option<&Path>,
    format: DiagramFormat,
    output: Option<PathBuf>,
    stdout: bool,
    if_changed: bool,
    minimize_crossings: bool,
) -> Result<i32> {
    let (result, config) = analyze(root, config_path)?;
    let options = LayoutOptions { minimize_crossings };

    let content = match format {
        DiagramFormat::Drawio => {
            let layout = plan(&result, options);
            drawio::render(&result, &layout)
        }
        DiagramFormat::Mermaid => mermaid::render(&result),
        DiagramFormat::Html => html::render(&result),
    };

    if stdout {
        println!("{content}");
        return Ok(0);
    }

    if if_changed {
        let cache = DiagramCache::new(root);
        if !cache.has_changed(&content) {
            println!("Diagram unchanged; skipping write.");
            return Ok(0);
        }
    }

    let target = output.unwrap_or_else(|| {
        root.join(&config.output.directory)
            .join(format!("{}.{}", config.output.filename, format.extension()))
    });
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    std::fs::write(&target, &content)
        .with_context(|| format!("failed to write {}", target.display()))?;

    if if_changed {
        DiagramCache::new(root).store(&content)?;
    }
    println!("Wrote {}", target.display());
    Ok(0)
}

fn run_check(root: &Path, config_path: Option<&Path>, min_score: u32) -> Result<i32> {
    let (result, _) = analyze(root, config_path)?;
    let health = &result.health;
    println!(
        "score {} (grade {}, {}) — {} modules, {} cycles, {} layer violations",
        health.score,
        health.grade,
        health.status,
        result.graph.nodes.len(),
        health.circular_dependency_count,
        health.layer_violations,
    );
    if health.score < min_score {
        eprintln!(
            "{} health score {} is below the minimum {min_score}",
            "FAIL:".red().bold(),
            health.score
        );
        return Ok(1);
    }
    Ok(0)
}

fn run_init(force: bool) -> Result<i32> {
    let path = Path::new(".archmap.toml");
    if path.exists() && !force {
        eprintln!(
            "{} .archmap.toml already exists (use --force to overwrite)",
            "Error:".red().bold()
        );
        return Ok(1);
    }
    std::fs::write(path, ProjectConfig::default_toml()).context("failed to write .archmap.toml")?;
    println!("Created .archmap.toml");
    Ok(0)
}
