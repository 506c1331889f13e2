use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use snipper::allocator::build_allocator;
use snipper::config::Config;
use snipper::links::{LinkStore, LinkStoreOptions};
use snipper::models::LinkResponse;
use snipper::storage::open_backend;

#[derive(Parser)]
#[command(name = "snipper-admin")]
#[command(about = "Snipper link management CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Shorten a URL
    Shorten {
        /// Target URL (http:// or https://)
        url: String,
    },
    /// Show the link behind a short code
    Lookup {
        /// Short code
        code: String,
    },
    /// List all links, newest first
    List {
        /// Print the same JSON the HTTP API returns
        #[arg(long)]
        json: bool,
    },
    /// Delete every link
    Clear {
        /// Skip the safety check
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    let backend = open_backend(&config.database, &config.cache).await?;
    let allocator = build_allocator(config.codes.policy, config.codes.length, backend.sequence);
    let links = LinkStore::new(
        backend.storage,
        allocator,
        LinkStoreOptions {
            max_attempts: config.codes.max_attempts,
            deduplicate: config.deduplicate_urls,
        },
    );

    match cli.command {
        Commands::Shorten { url } => {
            let record = links.create(&url).await?;
            println!("✓ {} -> {}", record.short_url(&config.base_url), record.original_url);
        }
        Commands::Lookup { code } => {
            let record = links.lookup(&code).await?;
            println!("Short code:   {}", record.short_code);
            println!("Short URL:    {}", record.short_url(&config.base_url));
            println!("Original URL: {}", record.original_url);
            println!("Created at:   {}", record.created_at.to_rfc3339());
        }
        Commands::List { json } => {
            let records = links.list().await?;
            if json {
                let responses: Vec<LinkResponse> = records
                    .into_iter()
                    .map(|record| LinkResponse::from_record(record, &config.base_url))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&responses)?);
            } else if records.is_empty() {
                println!("No links found.");
            } else {
                println!("{:<12} {:<26} {}", "Code", "Created", "Original URL");
                println!("{}", "-".repeat(80));
                for record in records {
                    println!(
                        "{:<12} {:<26} {}",
                        record.short_code,
                        record
                            .created_at
                            .format("%Y-%m-%d %H:%M:%S%.3f UTC")
                            .to_string(),
                        record.original_url
                    );
                }
            }
        }
        Commands::Clear { yes } => {
            if !yes {
                bail!("refusing to delete every link without --yes");
            }
            let removed = links.clear_all().await?;
            println!("✓ Deleted {} link(s)", removed);
        }
    }

    Ok(())
}
