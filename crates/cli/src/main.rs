//! CLI for generating portfolio flash reports from a PowerPoint template.

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use flashdeck_core::TemplateLayout;
use flashdeck_pptx::{FlashReportGenerator, TemplateAnalysis};
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_TEMPLATE: &str = "templates/ProjectCardAndFollowUp.pptx";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_OUTPUT_DIR: &str = "outputs";
const DEFAULT_MAPPING: &str = "config/template_shapes.json";
const DATA_FILE_SUFFIX: &str = "_projects.json";

/// Generate portfolio flash report decks from a PowerPoint template.
#[derive(Parser, Debug)]
#[command(name = "flashdeck")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Template presentation (.pptx)
    #[arg(short, long, global = true, default_value = DEFAULT_TEMPLATE)]
    template: PathBuf,

    /// Layout file overriding field positions, text limits and styles
    #[arg(short, long, global = true)]
    layout: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill the template with portfolio data
    Generate {
        /// Portfolio data file (default: latest *_projects.json in --data-dir)
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Directory searched for data files
        #[arg(long, default_value = DEFAULT_DATA_DIR)]
        data_dir: PathBuf,

        /// Output presentation (default: outputs/<date>_portfolio.pptx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Check that the template still matches the expected field positions
    Verify,
    /// Print every shape of the template
    Analyze,
    /// Write the template's shape positions as JSON
    ExportMapping {
        #[arg(short, long, default_value = DEFAULT_MAPPING)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    let layout = load_layout(args.layout.as_deref())?;
    log::debug!("Layout with {} fields", layout.fields.len());
    if !args.template.exists() {
        bail!("Template not found at {}", args.template.display());
    }

    match &args.command {
        Command::Generate {
            data,
            data_dir,
            output,
        } => generate(&args, layout, data.as_deref(), data_dir, output.as_deref()),
        Command::Verify => {
            let valid = verify(&args.template, layout)?;
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Command::Analyze => {
            let analysis = TemplateAnalysis::analyze(&args.template, layout.template_slide, Local::now().naive_local())
                .with_context(|| format!("Failed to analyze {}", args.template.display()))?;
            print!("{}", analysis.report(args.verbose));
            Ok(())
        }
        Command::ExportMapping { output } => export_mapping(&args.template, layout, output),
    }
}

fn load_layout(path: Option<&Path>) -> Result<TemplateLayout> {
    match path {
        Some(path) => TemplateLayout::from_json_file(path)
            .with_context(|| format!("Failed to load layout {}", path.display())),
        None => Ok(TemplateLayout::default()),
    }
}

fn generate(
    args: &Args,
    layout: TemplateLayout,
    data: Option<&Path>,
    data_dir: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let data_path = match data {
        Some(path) => path.to_path_buf(),
        None => latest_data_file(data_dir)?,
    };
    println!("Using template: {}", args.template.display());
    println!("Using data: {}", data_path.display());

    let output_path = match output {
        Some(path) => path.to_path_buf(),
        None => default_output_path(Path::new(DEFAULT_OUTPUT_DIR), &Local::now().format("%Y-%m-%d").to_string()),
    };

    let generator = FlashReportGenerator::new(layout);
    let summary = generator
        .generate(&args.template, &data_path, &output_path)
        .with_context(|| format!("Failed to generate {}", output_path.display()))?;

    match summary {
        Some(summary) => {
            println!("Generated: {}", output_path.display());
            println!("  - Summary: 1");
            println!("  - Projects: {}", summary.projects);
            println!("  - Data Notes: 1");
            println!("  - Total slides: {}", summary.slides);
            if args.verbose {
                eprintln!(
                    "  Fields filled: {}, unmatched: {}, data notes: {}",
                    summary.fields_filled, summary.fields_unmatched, summary.data_notes
                );
            }
        }
        None => println!("No projects in {}, nothing generated", data_path.display()),
    }
    Ok(())
}

fn verify(template: &Path, layout: TemplateLayout) -> Result<bool> {
    println!("Running template verification...\n");
    let report = FlashReportGenerator::new(layout)
        .verify(template)
        .with_context(|| format!("Failed to verify {}", template.display()))?;

    for line in report.warnings() {
        println!("{}", line);
    }
    if report.is_valid() {
        println!("\n✓ Template is compatible");
    } else {
        println!("\n✗ Template has compatibility issues");
    }

    let items = report.action_items();
    if !items.is_empty() {
        println!("\nACTION ITEMS:");
        for item in items {
            println!("  {}", item);
        }
    }
    Ok(report.is_valid())
}

fn export_mapping(template: &Path, layout: TemplateLayout, output: &Path) -> Result<()> {
    let analysis = TemplateAnalysis::analyze(template, layout.template_slide, Local::now().naive_local())
        .with_context(|| format!("Failed to analyze {}", template.display()))?;
    let json = analysis.to_json()?;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    fs::write(output, json).with_context(|| format!("Failed to write {}", output.display()))?;

    println!("✓ Template mapping exported to: {}", output.display());
    println!("  Slides: {}", analysis.slides.len());
    println!("  Total shapes: {}", analysis.shape_count());
    println!("\nSummary by slide:");
    for line in analysis.slide_summary() {
        println!("  {}", line);
    }
    Ok(())
}

/// The data file in `dir` whose name sorts last among `*_projects.json`.
fn latest_data_file(dir: &Path) -> Result<PathBuf> {
    let entries = fs::read_dir(dir).with_context(|| format!("Failed to read data directory {}", dir.display()))?;
    let latest = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| name.ends_with(DATA_FILE_SUFFIX))
        .max();

    match latest {
        Some(name) => Ok(dir.join(name)),
        None => bail!("No *{} files found in {}", DATA_FILE_SUFFIX, dir.display()),
    }
}

fn default_output_path(dir: &Path, date: &str) -> PathBuf {
    dir.join(format!("{}_portfolio.pptx", date))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("flashdeck-cli-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_latest_data_file_by_name() {
        let dir = scratch_dir("latest");
        for name in [
            "2025-01-10_projects.json",
            "2025-03-02_projects.json",
            "2025-02-20_projects.json",
            "2025-12-31_notes.json",
        ] {
            fs::write(dir.join(name), "{}").unwrap();
        }
        let latest = latest_data_file(&dir).unwrap();
        assert_eq!(latest, dir.join("2025-03-02_projects.json"));
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_latest_data_file_missing() {
        let dir = scratch_dir("empty");
        assert!(latest_data_file(&dir).is_err());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_default_output_path() {
        assert_eq!(
            default_output_path(Path::new("outputs"), "2025-03-07"),
            PathBuf::from("outputs/2025-03-07_portfolio.pptx")
        );
    }

    #[test]
    fn test_args_parse() {
        let args = Args::parse_from(["flashdeck", "generate", "--data", "d.json", "-v"]);
        assert!(args.verbose);
        assert_eq!(args.template, PathBuf::from(DEFAULT_TEMPLATE));
        match args.command {
            Command::Generate { data, data_dir, output } => {
                assert_eq!(data, Some(PathBuf::from("d.json")));
                assert_eq!(data_dir, PathBuf::from(DEFAULT_DATA_DIR));
                assert_eq!(output, None);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args = Args::parse_from(["flashdeck", "export-mapping", "--layout", "layout.json"]);
        assert_eq!(args.layout, Some(PathBuf::from("layout.json")));
        assert!(matches!(args.command, Command::ExportMapping { .. }));
    }
}
