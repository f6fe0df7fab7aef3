use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use imgre::app::{App, CopyOptions, ListOptions, TransformOptions, UploadOptions};
use imgre::config::Config;
use imgre::listing::{DEFAULT_DELIMITER, DEFAULT_MAX_KEYS};
use imgre::models::{ListingPage, OutputFormat, ResizeMode};
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "imgre")]
#[command(about = "Upload, transform and manage images in S3-compatible storage")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a local image
    Upload {
        /// Local file to upload
        input: String,
        /// Object key (defaults to the file name)
        #[arg(short, long)]
        key: Option<String>,
        /// Transform before uploading
        #[arg(short, long)]
        compress: bool,
        #[command(flatten)]
        transform: TransformArgs,
    },
    /// Copy an object, transforming it unless --raw is given
    Cp {
        /// Source object key
        #[arg(short, long)]
        source: String,
        /// Target object key (derived from the source when omitted)
        #[arg(short, long)]
        target: Option<String>,
        /// Server-side copy without transformation
        #[arg(long)]
        raw: bool,
        #[command(flatten)]
        transform: TransformArgs,
    },
    /// List objects one page at a time
    Ls {
        #[arg(short, long)]
        prefix: Option<String>,
        #[arg(short, long, default_value = DEFAULT_DELIMITER)]
        delimiter: String,
        #[arg(short, long, default_value_t = DEFAULT_MAX_KEYS)]
        max_keys: u32,
        /// Continuation token from a previous page
        #[arg(long)]
        token: Option<String>,
        /// Print public URLs
        #[arg(short, long)]
        url: bool,
        /// Ignore the delimiter and list every key under the prefix
        #[arg(short, long)]
        recursive: bool,
        /// Follow continuation tokens until the listing ends
        #[arg(short, long)]
        all: bool,
        /// Print the page as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete one or more objects
    Rm {
        #[arg(required = true)]
        keys: Vec<String>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Debug, Args)]
struct TransformArgs {
    /// Output format: webp, jpeg or png
    #[arg(short, long, value_parser = parse_format_arg)]
    format: Option<OutputFormat>,
    /// Quality 1-100
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,
    /// Target width, 0 keeps the original
    #[arg(short, long)]
    width: Option<u32>,
    /// Target height, 0 keeps the original
    #[arg(short = 'H', long)]
    height: Option<u32>,
    /// Resize mode: fit, fill or exact
    #[arg(long, value_parser = parse_mode_arg)]
    mode: Option<ResizeMode>,
}

impl TransformArgs {
    fn to_options(&self) -> TransformOptions {
        TransformOptions {
            format: self.format,
            quality: self.quality,
            width: dimension_arg(self.width),
            height: dimension_arg(self.height),
            resize_mode: self.mode,
        }
    }
}

fn parse_format_arg(input: &str) -> std::result::Result<OutputFormat, String> {
    input.parse().map_err(|e: imgre::Error| e.to_string())
}

fn parse_mode_arg(input: &str) -> std::result::Result<ResizeMode, String> {
    input.parse().map_err(|e: imgre::Error| e.to_string())
}

fn dimension_arg(value: Option<u32>) -> Option<u32> {
    value.filter(|&d| d > 0)
}

fn is_confirmation(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(is_confirmation(&answer))
}

/// Command that resumes the same traversal at `token`.
fn next_page_command(options: &ListOptions, delimiter: &str, token: &str) -> String {
    let mut command = String::from("imgre ls");
    if let Some(prefix) = options.prefix.as_deref() {
        command.push_str(&format!(" --prefix '{}'", prefix));
    }
    if options.recursive {
        command.push_str(" --recursive");
    } else if delimiter != DEFAULT_DELIMITER {
        command.push_str(&format!(" --delimiter '{}'", delimiter));
    }
    let max_keys = options.max_keys;
    if max_keys != DEFAULT_MAX_KEYS {
        command.push_str(&format!(" --max-keys {}", max_keys));
    }
    command.push_str(&format!(" --token '{}'", token));
    command
}

fn print_page(page: &ListingPage, options: &ListOptions, show_urls: bool) {
    let delimiter = options.delimiter.as_deref().filter(|_| !options.recursive);

    if page.objects.is_empty() && page.prefixes.is_empty() {
        println!("No objects found");
        return;
    }

    for prefix in &page.prefixes {
        println!("[DIR]  {}", prefix.prefix);
    }

    for obj in &page.objects {
        let name = obj.display_name(options.prefix.as_deref(), delimiter);
        let modified = obj
            .last_modified
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!("{:<50} {:>10} {}", name, obj.size_formatted(), modified);
        if show_urls {
            println!("       {}", obj.url);
        }
    }

    println!("\n{}", listing_footer(page));
}

fn listing_footer(page: &ListingPage) -> String {
    if page.prefixes.is_empty() {
        format!("Total: {} objects", page.objects.len())
    } else {
        format!(
            "Total: {} objects, {} prefixes",
            page.objects.len(),
            page.prefixes.len()
        )
    }
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Upload {
            input,
            key,
            compress,
            transform,
        } => {
            let path = Path::new(&input);
            let data = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", input))?;
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .with_context(|| format!("Invalid file name: {}", input))?;

            let options = UploadOptions {
                key,
                compress,
                transform: transform.to_options(),
            };
            let stored = app.upload(data, file_name, &options).await?;
            if compress {
                println!(
                    "Original: {} bytes, processed: {} bytes ({:.1}%)",
                    stored.original_bytes,
                    stored.stored_bytes,
                    stored.ratio_percent()
                );
            }
            println!("{}", stored.url);
        }
        Command::Cp {
            source,
            target,
            raw,
            transform,
        } => {
            let options = CopyOptions {
                target,
                raw,
                transform: transform.to_options(),
            };
            let stored = app.copy(&source, &options).await?;
            if !raw {
                println!(
                    "Original: {} bytes, processed: {} bytes ({:.1}%)",
                    stored.original_bytes,
                    stored.stored_bytes,
                    stored.ratio_percent()
                );
            }
            println!("{}", stored.url);
        }
        Command::Ls {
            prefix,
            delimiter,
            max_keys,
            token,
            url,
            recursive,
            all,
            json,
        } => {
            let options = ListOptions {
                prefix,
                delimiter: Some(delimiter.clone()).filter(|d| !d.is_empty()),
                max_keys,
                token,
                recursive,
            };
            let page = if all {
                app.list_all(&options).await?
            } else {
                app.list(&options).await?
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&page)?);
                return Ok(());
            }

            print_page(&page, &options, url);
            if let (true, Some(token)) = (page.is_truncated, page.next_token.as_deref()) {
                println!("\nMore results available. Next page:");
                println!(
                    "  {}",
                    next_page_command(&options, &delimiter, token)
                );
            }
        }
        Command::Rm { keys, force } => {
            if !force {
                let prompt = format!("Delete {} object(s): {}?", keys.len(), keys.join(", "));
                if !confirm(&prompt)? {
                    println!("Cancelled");
                    return Ok(());
                }
            }

            let summary = app.remove(&keys).await;
            for (key, e) in &summary.failed {
                eprintln!("Failed to delete {}: {}", key, e);
            }
            println!(
                "Deleted {}, failed {}",
                summary.deleted.len(),
                summary.failed.len()
            );
            if !summary.is_complete() {
                bail!("{} deletion(s) failed", summary.failed.len());
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "imgre=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let app = match Config::load() {
        Ok(config) => match App::new(config).await {
            Ok(app) => app,
            Err(e) => {
                error!("Failed to initialize application: {}", e);
                std::process::exit(1);
            }
        },
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    match run(&app, args.command).await {
        Ok(()) => {
            info!("Done");
            Ok(())
        }
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}
