//! chapterize - inspect how a book is split into chapters

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;

use chapterize::{Config, ConverterConfig, Document, Error, NormalizedBook, Pipeline};

#[derive(Parser)]
#[command(name = "chapterize")]
#[command(version, about = "Normalize a book into numbered chapters", long_about = None)]
#[command(after_help = "EXAMPLES:
    chapterize novel.epub              Show metadata and chapter list
    chapterize notes.dat --format txt  Treat the input as plain text
    chapterize book.mobi --json        Print the normalized book as JSON")]
struct Cli {
    /// Input file (EPUB, PDF, MOBI, AZW3, FB2, TXT, Markdown, or HTML)
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Format tag; defaults to the file extension
    #[arg(short, long, value_name = "TAG")]
    format: Option<String>,

    /// Print the full normalized book as JSON
    #[arg(long)]
    json: bool,

    /// Maximum characters per chapter before truncation
    #[arg(long, value_name = "N")]
    max_chapter_chars: Option<usize>,

    /// Character budget for paragraph packing
    #[arg(long, value_name = "N")]
    pack_chars: Option<usize>,

    /// MOBI/AZW3 to EPUB converter program
    #[arg(long, value_name = "PROGRAM")]
    converter: Option<PathBuf>,

    /// Converter timeout in seconds
    #[arg(long, value_name = "N")]
    timeout_secs: Option<u64>,

    /// Only print errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.quiet { "error" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), String> {
    let doc = open(&cli.input, cli.format.as_deref()).map_err(|e| e.to_string())?;
    let book = Pipeline::new(config(cli))
        .normalize(&doc)
        .map_err(|e| e.to_string())?;

    if cli.json {
        let json = serde_json::to_string_pretty(&book).map_err(|e| e.to_string())?;
        println!("{json}");
    } else if !cli.quiet {
        print_summary(&cli.input, &book);
    }
    Ok(())
}

fn open(path: &Path, format: Option<&str>) -> Result<Document, Error> {
    let doc = Document::open(path)?;
    Ok(match format {
        Some(tag) => doc.with_format_tag(tag),
        None => doc,
    })
}

fn config(cli: &Cli) -> Config {
    let mut config = Config::default();
    if let Some(chars) = cli.max_chapter_chars {
        config = config.with_max_chapter_chars(chars);
    }
    if let Some(chars) = cli.pack_chars {
        config = config.with_pack_chars(chars);
    }
    if cli.converter.is_some() || cli.timeout_secs.is_some() {
        let mut converter = match &cli.converter {
            Some(program) => ConverterConfig::new(program),
            None => ConverterConfig::default(),
        };
        if let Some(secs) = cli.timeout_secs {
            converter = converter.with_timeout(Duration::from_secs(secs));
        }
        config = config.with_converter(converter);
    }
    config
}

fn print_summary(path: &Path, book: &NormalizedBook) {
    let meta = &book.metadata;
    println!("File: {}", path.display());
    if let Some(title) = &meta.title {
        println!("Title: {title}");
    }
    if !meta.authors.is_empty() {
        println!("Authors: {}", meta.authors.join(", "));
    }
    if let Some(language) = &meta.language {
        println!("Language: {language}");
    }
    if let Some(pages) = meta.page_count {
        println!("Pages: {pages}");
    }
    println!("Status: {:?}", book.status);
    println!("Renderer: {}", book.renderer.as_str());
    for diagnostic in &book.diagnostics {
        println!("Diagnostic: {diagnostic}");
    }
    println!("Chapters: {}", book.chapters.len());
    for chapter in &book.chapters {
        let marker = if chapter.truncated { " (truncated)" } else { "" };
        println!(
            "  {:>4}. {} [{} chars]{marker}",
            chapter.number, chapter.title, chapter.word_count
        );
    }
}
