//! Tempt CLI: command-line client for the Tempt API.
//!
//! Set TEMPT_API_URL and TEMPT_TOKEN (a bearer token) for API commands.
//! `access` and `layout` work offline.

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tempt_api_client::ApiClient;
use tempt_cli::{access_matrix, init_tracing, layout_from_file, print_json, render_access_matrix};
use tempt_core::access::Feature;
use tempt_core::models::{
    GalleryQuery, GallerySort, GenerationKind, ImageGenerationRequest, VideoGenerationRequest,
};
use tempt_worker::{PollEvent, Poller, PollerConfig};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "tempt", about = "Tempt gallery CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Kind {
    Image,
    Video,
}

impl From<Kind> for GenerationKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Image => GenerationKind::Image,
            Kind::Video => GenerationKind::Video,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Queue image generation
    Image {
        prompt: String,
        #[arg(long, default_value = "flux-schnell")]
        model: String,
        #[arg(long, default_value = "1024")]
        width: u32,
        #[arg(long, default_value = "1024")]
        height: u32,
        #[arg(long, default_value = "1")]
        count: u32,
        /// Keep the results out of the public gallery
        #[arg(long)]
        private: bool,
        /// Wait for the generations to finish
        #[arg(long)]
        wait: bool,
    },
    /// Queue video generation
    Video {
        prompt: String,
        #[arg(long, default_value = "kling")]
        model: String,
        #[arg(long, default_value = "5")]
        duration: u32,
        /// Animate one of your completed images
        #[arg(long)]
        source_image: Option<Uuid>,
        #[arg(long)]
        private: bool,
        #[arg(long)]
        wait: bool,
    },
    /// Current status of one task
    Status { task_id: String },
    /// Poll tasks until they finish, fail or time out
    Watch {
        task_ids: Vec<String>,
        #[arg(long, value_enum, default_value = "image")]
        kind: Kind,
        /// Use the longer timeout for advanced-mode images
        #[arg(long)]
        advanced: bool,
    },
    /// Browse the public gallery
    Gallery {
        #[arg(long)]
        category: Option<String>,
        /// Order by score instead of recency
        #[arg(long)]
        top: bool,
        #[arg(long, default_value = "20")]
        limit: i64,
        #[arg(long, default_value = "0")]
        offset: i64,
    },
    /// Up-vote (1) or down-vote (-1); repeating a vote retracts it
    Vote {
        image_id: Uuid,
        #[arg(allow_hyphen_values = true)]
        value: i16,
    },
    /// Comment on an image
    Comment { image_id: Uuid, body: String },
    /// Show plans on offer
    Plans,
    /// Show your subscription, usage and unlocked features
    Subscription,
    /// Show your nuts ledger
    Nuts {
        #[arg(long, default_value = "20")]
        limit: i64,
    },
    /// Check access to one feature
    Feature { name: String },
    /// Print the plan/feature access table
    Access {
        #[arg(long)]
        json: bool,
    },
    /// Compute a masonry layout for items in a JSON file
    Layout {
        file: PathBuf,
        #[arg(long, default_value = "1280")]
        width: u32,
        #[arg(long, default_value = "16")]
        gap: f64,
    },
}

/// Poll `task_ids`, printing each event as a JSON line. Ctrl+C cancels.
async fn watch(
    client: ApiClient,
    task_ids: Vec<String>,
    config: PollerConfig,
) -> anyhow::Result<bool> {
    let (tx, mut rx) = mpsc::channel::<PollEvent>(32);
    let poller = Poller::new(client, config)?.with_events(tx);

    let cancel = CancellationToken::new();
    let ctrl_c_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_token.cancel();
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            if let Ok(line) = serde_json::to_string(&event) {
                println!("{}", line);
            }
        }
    });

    let summary = poller.run(task_ids, cancel).await;
    drop(poller);
    printer.await.context("Event printer panicked")?;

    print_json(&summary)?;
    Ok(summary.all_completed())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let client = || {
        ApiClient::from_env()
            .context("Failed to create API client. Set TEMPT_API_URL and TEMPT_TOKEN")
    };

    let ok = match cli.command {
        Commands::Image {
            prompt,
            model,
            width,
            height,
            count,
            private,
            wait,
        } => {
            let client = client()?;
            let req = ImageGenerationRequest {
                prompt,
                negative_prompt: None,
                model,
                width,
                height,
                count,
                advanced: None,
                category_id: None,
                is_public: !private,
            };
            let accepted = client.generate_images(&req).await?;
            print_json(&accepted)?;
            if wait {
                let config = PollerConfig::for_generation(GenerationKind::Image, false);
                watch(client, accepted.task_ids, config).await?
            } else {
                true
            }
        }
        Commands::Video {
            prompt,
            model,
            duration,
            source_image,
            private,
            wait,
        } => {
            let client = client()?;
            let req = VideoGenerationRequest {
                prompt,
                model,
                duration_seconds: duration,
                source_image_id: source_image,
                is_public: !private,
            };
            let accepted = client.generate_video(&req).await?;
            print_json(&accepted)?;
            if wait {
                let config = PollerConfig::for_generation(GenerationKind::Video, false);
                watch(client, accepted.task_ids, config).await?
            } else {
                true
            }
        }
        Commands::Status { task_id } => {
            print_json(&client()?.task_status(&task_id).await?)?;
            true
        }
        Commands::Watch {
            task_ids,
            kind,
            advanced,
        } => {
            anyhow::ensure!(!task_ids.is_empty(), "Give at least one task id");
            let config = PollerConfig::for_generation(kind.into(), advanced);
            watch(client()?, task_ids, config).await?
        }
        Commands::Gallery {
            category,
            top,
            limit,
            offset,
        } => {
            let query = GalleryQuery {
                category,
                sort: if top { GallerySort::Top } else { GallerySort::Newest },
                limit,
                offset,
            };
            print_json(&client()?.list_gallery(&query).await?)?;
            true
        }
        Commands::Vote { image_id, value } => {
            print_json(&client()?.vote(image_id, value).await?)?;
            true
        }
        Commands::Comment { image_id, body } => {
            print_json(&client()?.add_comment(image_id, &body).await?)?;
            true
        }
        Commands::Plans => {
            print_json(&client()?.plans().await?)?;
            true
        }
        Commands::Subscription => {
            print_json(&client()?.my_subscription().await?)?;
            true
        }
        Commands::Nuts { limit } => {
            print_json(&client()?.nuts_history(limit).await?)?;
            true
        }
        Commands::Feature { name } => {
            let feature: Feature = name.parse()?;
            print_json(&client()?.check_feature(feature).await?)?;
            true
        }
        Commands::Access { json } => {
            let rows = access_matrix();
            if json {
                print_json(&rows)?;
            } else {
                print!("{}", render_access_matrix(&rows));
            }
            true
        }
        Commands::Layout { file, width, gap } => {
            print_json(&layout_from_file(&file, width, gap)?)?;
            true
        }
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
