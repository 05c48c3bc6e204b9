// adflow CLI - command-line client for the adflow campaign server

mod client;
mod profile;
mod render;
mod upload;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use uuid::Uuid;

use client::ApiClient;
use profile::Profile;

/// adflow - campaign drafting, proofing and approval
#[derive(Parser)]
#[command(name = "adflow")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Server base URL (defaults to the saved profile, then http://localhost:8000)
    #[arg(long, global = true, env = "ADFLOW_SERVER")]
    server: Option<String>,

    /// Act as this user id (defaults to the saved profile)
    #[arg(long, global = true, env = "ADFLOW_USER")]
    user: Option<Uuid>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a user id (and server) as the default identity
    Login {
        user_id: Uuid,
    },
    /// Register a new user and log in as it
    Register {
        #[arg(long)]
        email: String,

        #[arg(long)]
        name: String,

        /// advertiser, campaign_manager or tech_support
        #[arg(long)]
        role: String,
    },
    /// Show the current user
    Whoami,
    /// Check that the server is up
    Health,
    /// Manage assets
    Asset {
        #[command(subcommand)]
        action: AssetAction,
    },
    /// Manage campaigns
    Campaign {
        #[command(subcommand)]
        action: CampaignAction,
    },
    /// List campaigns awaiting review
    Queue,
    /// Show workflow metrics
    Metrics {
        /// Approval rate and proof timing window in days (1-365)
        #[arg(long, default_value_t = 30)]
        days: u32,
    },
}

#[derive(Subcommand)]
enum AssetAction {
    /// Register a local file as an asset
    Upload {
        path: PathBuf,

        /// Base URL the file is served from
        #[arg(long, env = "ADFLOW_STORAGE_URL", default_value = "https://storage.local")]
        storage_url: String,
    },
    /// List your assets
    List,
    /// Show one asset
    Show { id: Uuid },
    /// Set an asset's category manually
    Categorize {
        id: Uuid,

        /// logo, image, copy or url
        category: String,
    },
    /// Re-run automatic categorization
    Recategorize {
        #[arg(required = true)]
        ids: Vec<Uuid>,
    },
    /// Delete an asset
    Delete { id: Uuid },
}

#[derive(Subcommand)]
enum CampaignAction {
    /// Create a draft campaign
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        audience: Option<String>,

        #[arg(long)]
        goal: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Asset to include (can be specified multiple times)
        #[arg(short, long = "asset", value_name = "ASSET_ID", required = true)]
        assets: Vec<Uuid>,
    },
    /// List your campaigns
    List,
    /// Show a campaign and its assets
    Show { id: Uuid },
    /// Edit a draft's details
    Update {
        id: Uuid,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        audience: Option<String>,

        #[arg(long)]
        goal: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },
    /// Attach more assets to a draft
    Attach {
        id: Uuid,

        #[arg(short, long = "asset", value_name = "ASSET_ID", required = true)]
        assets: Vec<Uuid>,

        /// Placement hint such as "hero" or "footer"
        #[arg(long)]
        role: Option<String>,
    },
    /// Generate the campaign proof
    Proof {
        id: Uuid,

        /// Write the rendered HTML to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Submit a draft for review
    Submit { id: Uuid },
    /// Approve a pending campaign
    Approve { id: Uuid },
    /// Reject a pending campaign
    Reject {
        id: Uuid,

        #[arg(long)]
        reason: String,
    },
    /// Delete a draft
    Delete { id: Uuid },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let saved = profile::load()?;
    let server = saved.resolve_server(cli.server.as_deref());
    let client = ApiClient::new(server, saved.resolve_user(cli.user));

    match cli.command {
        Commands::Login { user_id } => handle_login(&client, saved, user_id),
        Commands::Register { email, name, role } => {
            handle_register(&client, saved, &email, &name, &role)
        }
        Commands::Whoami => {
            client.require_user()?;
            render::print_user(&client.get("/users/me")?);
            Ok(())
        }
        Commands::Health => {
            let health = client.health()?;
            println!(
                "{} {} (version {})",
                "✓".green().bold(),
                client.base(),
                health["version"].as_str().unwrap_or("unknown")
            );
            Ok(())
        }
        Commands::Asset { action } => {
            client.require_user()?;
            handle_asset(&client, action)
        }
        Commands::Campaign { action } => {
            client.require_user()?;
            handle_campaign(&client, action)
        }
        Commands::Queue => {
            client.require_user()?;
            let queue = client.get("/approvals")?;
            let campaigns = as_list(&queue)?;
            if campaigns.is_empty() {
                println!("Approval queue is empty");
            }
            for campaign in campaigns {
                render::print_campaign_row(campaign);
            }
            Ok(())
        }
        Commands::Metrics { days } => {
            client.require_user()?;
            render::print_metrics(&client.get(&format!("/metrics?days={}", days))?);
            Ok(())
        }
    }
}

fn handle_login(client: &ApiClient, saved: Profile, user_id: Uuid) -> Result<()> {
    let scoped = ApiClient::new(client.base(), Some(user_id));
    let user = scoped.get("/users/me")?;
    remember(saved, client.base(), &user)?;

    println!("{} Logged in", "✓".green().bold());
    render::print_user(&user);
    Ok(())
}

fn handle_register(
    client: &ApiClient,
    saved: Profile,
    email: &str,
    name: &str,
    role: &str,
) -> Result<()> {
    let body = json!({ "email": email, "fullName": name, "role": role });
    let user = client.post("/users", Some(&body))?;
    remember(saved, client.base(), &user)?;

    println!("{} Registered and logged in", "✓".green().bold());
    render::print_user(&user);
    Ok(())
}

fn remember(saved: Profile, server: &str, user: &Value) -> Result<()> {
    let user_id = user["id"]
        .as_str()
        .and_then(|id| Uuid::parse_str(id).ok())
        .ok_or_else(|| anyhow!("Server response has no user id"))?;

    profile::save(&Profile {
        server: Some(server.to_string()),
        user_id: Some(user_id),
        email: user["email"].as_str().map(str::to_string),
        role: user["role"].as_str().map(str::to_string),
        ..saved
    })
}

fn handle_asset(client: &ApiClient, action: AssetAction) -> Result<()> {
    match action {
        AssetAction::Upload { path, storage_url } => {
            let body = upload::describe_file(&path, &storage_url)?;
            let asset = client.post("/assets", Some(&body))?;
            println!("{} Asset uploaded", "✓".green().bold());
            render::print_asset(&asset);
        }
        AssetAction::List => {
            let assets = client.get("/assets")?;
            for asset in as_list(&assets)? {
                render::print_asset_row(asset);
            }
        }
        AssetAction::Show { id } => {
            render::print_asset(&client.get(&format!("/assets/{}", id))?);
        }
        AssetAction::Categorize { id, category } => {
            let asset = client.patch(
                &format!("/assets/{}", id),
                &json!({ "category": category }),
            )?;
            render::print_asset(&asset);
        }
        AssetAction::Recategorize { ids } => {
            let outcome =
                client.post("/assets/recategorize", Some(&json!({ "assetIds": ids })))?;
            for asset in as_list(&outcome["updated"])? {
                render::print_asset_row(asset);
            }
            for failure in as_list(&outcome["failed"])? {
                eprintln!(
                    "  {} {}: {}",
                    "✗".red(),
                    failure["assetId"].as_str().unwrap_or("-"),
                    failure["reason"].as_str().unwrap_or("unknown")
                );
            }
        }
        AssetAction::Delete { id } => {
            client.delete(&format!("/assets/{}", id))?;
            println!("{} Asset {} deleted", "✓".green().bold(), id);
        }
    }
    Ok(())
}

fn handle_campaign(client: &ApiClient, action: CampaignAction) -> Result<()> {
    match action {
        CampaignAction::Create {
            name,
            audience,
            goal,
            notes,
            assets,
        } => {
            let body = json!({
                "name": name,
                "targetAudience": audience,
                "goal": goal,
                "notes": notes,
                "assetIds": assets,
            });
            let campaign = client.post("/campaigns", Some(&body))?;
            println!("{} Draft created", "✓".green().bold());
            render::print_campaign(&campaign);
        }
        CampaignAction::List => {
            let campaigns = client.get("/campaigns")?;
            for campaign in as_list(&campaigns)? {
                render::print_campaign_row(campaign);
            }
        }
        CampaignAction::Show { id } => {
            render::print_campaign(&client.get(&format!("/campaigns/{}", id))?);
        }
        CampaignAction::Update {
            id,
            name,
            audience,
            goal,
            notes,
        } => {
            let patch = detail_patch(name, audience, goal, notes);
            if patch.is_empty() {
                return Err(anyhow!("Nothing to update. Pass --name, --audience, --goal or --notes"));
            }
            let campaign = client.patch(&format!("/campaigns/{}", id), &Value::Object(patch))?;
            render::print_campaign(&campaign);
        }
        CampaignAction::Attach { id, assets, role } => {
            let body = json!({ "assetIds": assets, "assetRole": role });
            let campaign = client.post(&format!("/campaigns/{}/assets", id), Some(&body))?;
            render::print_campaign(&campaign);
        }
        CampaignAction::Proof { id, output } => {
            let proof = client.post(&format!("/campaigns/{}/generate-proof", id), None)?;
            println!(
                "{} Proof generated in {:.2}s",
                "✓".green().bold(),
                proof["generationTimeSeconds"].as_f64().unwrap_or_default()
            );
            if let Some(path) = output {
                let html = proof["html"].as_str().unwrap_or_default();
                std::fs::write(&path, html)
                    .map_err(|e| anyhow!("Failed to write '{}': {}", path.display(), e))?;
                println!("  HTML written to: {}", path.display());
            }
        }
        CampaignAction::Submit { id } => {
            transition(client, id, "submit", None, "Submitted for review")?;
        }
        CampaignAction::Approve { id } => {
            transition(client, id, "approve", None, "Approved")?;
        }
        CampaignAction::Reject { id, reason } => {
            let body = json!({ "reason": reason });
            transition(client, id, "reject", Some(&body), "Rejected")?;
        }
        CampaignAction::Delete { id } => {
            client.delete(&format!("/campaigns/{}", id))?;
            println!("{} Campaign {} deleted", "✓".green().bold(), id);
        }
    }
    Ok(())
}

fn transition(
    client: &ApiClient,
    id: Uuid,
    action: &str,
    body: Option<&Value>,
    done: &str,
) -> Result<()> {
    let campaign = client.post(&format!("/campaigns/{}/{}", id, action), body)?;
    println!("{} {}", "✓".green().bold(), done);
    render::print_campaign(&campaign);
    Ok(())
}

/// Only the fields the user passed, so the rest stay unchanged.
fn detail_patch(
    name: Option<String>,
    audience: Option<String>,
    goal: Option<String>,
    notes: Option<String>,
) -> Map<String, Value> {
    [
        ("name", name),
        ("targetAudience", audience),
        ("goal", goal),
        ("notes", notes),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.map(|v| (key.to_string(), Value::String(v))))
    .collect()
}

fn as_list(value: &Value) -> Result<&Vec<Value>> {
    value
        .as_array()
        .ok_or_else(|| anyhow!("Expected a list from the server"))
}
