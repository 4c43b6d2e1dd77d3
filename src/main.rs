//! Command line entry point for clonewatch.
//! Registers tracked projects and processes webhook payload files.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clonewatch::application::{ClonePipeline, FileLoader, Outcome};
use clonewatch::config;
use clonewatch::detect::LineHashDetector;
use clonewatch::domain::FileFilter;
use clonewatch::infra::db::Database;
use clonewatch::infra::git::GitWorkspace;
use clonewatch::infra::github::WebhookPayload;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "clonewatch", version, about = "Mines duplicated code across pull requests")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a repository as a tracked project
    Track {
        owner: String,
        name: String,
        /// Per-project minimum clone length, in lines
        #[arg(long)]
        min_clone_length: Option<usize>,
    },
    /// Run the pipeline over a webhook payload stored as JSON
    Process {
        payload: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let cfg = config::load_config();

    let db = match &cfg.database_path {
        Some(path) => Database::open_at(path.clone())?,
        None => Database::open()?,
    };

    match cli.command {
        Command::Track {
            owner,
            name,
            min_clone_length,
        } => {
            let project = db.project_repo().insert(&owner, &name, min_clone_length)?;
            println!(
                "tracking {}/{} as project {}",
                project.repo_owner, project.repo_name, project.id
            );
        }
        Command::Process { payload } => {
            let json = std::fs::read_to_string(&payload)
                .with_context(|| format!("read payload {}", payload.display()))?;
            let event = WebhookPayload::from_json(&json)?;

            let workspace = GitWorkspace::new(cfg.workspace_root())?;
            let loader = FileLoader::new(workspace);
            let pipeline = ClonePipeline::new(
                &db,
                loader,
                Box::new(LineHashDetector),
                FileFilter::sources(),
                cfg.min_clone_length,
            );

            match pipeline.process(&event).await? {
                Outcome::Completed { clones } => println!("recorded {clones} clone(s)"),
                Outcome::UntrackedProject => println!("repository is not tracked; nothing to do"),
            }
        }
    }
    Ok(())
}
