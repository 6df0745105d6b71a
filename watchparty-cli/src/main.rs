use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::Password;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use watchparty_core::{CapturedInput, NormalizedPoint};
use watchparty_session::{
    MemoryNetwork, Session, SessionConfig, SessionEnvironment, SessionHandle, SessionNotice,
    SessionObserver, SessionSnapshot, StaticDevices,
};

#[derive(Parser)]
#[command(name = "watchparty-cli")]
#[command(about = "Peer-to-peer watch party sessions")]
struct Cli {
    /// JSON session config; every field is optional.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a whole party in-process and narrate what each member sees.
    Demo {
        #[arg(long, default_value_t = 2)]
        guests: usize,

        #[arg(long, default_value = "host")]
        host_name: String,

        /// Prompted for when omitted.
        #[arg(long)]
        password: Option<String>,
    },
    /// Print the effective session config as JSON.
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        Commands::Demo {
            guests,
            host_name,
            password,
        } => {
            let password = match password {
                Some(p) => p,
                None => Password::new()
                    .with_prompt("Room password")
                    .interact()
                    .context("Failed to read password")?,
            };
            run_demo(config, guests, host_name, password).await?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SessionConfig> {
    match path {
        Some(path) => SessionConfig::from_path(path),
        None => Ok(SessionConfig::default()),
    }
}

/// Prints every notice, prefixed with whose session it came from.
struct PrintObserver {
    label: String,
}

#[async_trait]
impl SessionObserver for PrintObserver {
    async fn on_notice(&self, notice: SessionNotice) {
        let line = notice.to_string();
        let line = match notice {
            SessionNotice::JoinFailed { .. }
            | SessionNotice::CaptureDenied { .. }
            | SessionNotice::PeerUnreachable { .. } => line.red(),
            SessionNotice::ChatReceived(_) => line.normal(),
            _ => line.dimmed(),
        };
        println!("{} {}", format!("[{}]", self.label).cyan(), line);
    }
}

fn spawn_member(network: &MemoryNetwork, config: &SessionConfig, label: &str) -> SessionHandle {
    let env = SessionEnvironment::new(Arc::new(network.clone()))
        .with_devices(Arc::new(StaticDevices::default()))
        .with_observer(Arc::new(PrintObserver {
            label: label.to_owned(),
        }));
    Session::spawn(config.clone(), env)
}

async fn settle(
    handle: &SessionHandle,
    what: &str,
    pred: impl Fn(&SessionSnapshot) -> bool,
) -> Result<SessionSnapshot> {
    for attempt in 0..300 {
        let snapshot = handle.snapshot().await?;
        if pred(&snapshot) {
            debug!("Settled on {} after {} poll(s)", what, attempt + 1);
            return Ok(snapshot);
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    bail!("Timed out waiting for {what}")
}

async fn run_demo(
    config: SessionConfig,
    guests: usize,
    host_name: String,
    password: String,
) -> Result<()> {
    println!("{}", "🎬 Starting watch party demo...".green().bold());
    info!(
        "Demo with {} guest(s), expiry {}s, join timeout {:?}",
        guests, config.room_expiry_secs, config.join_timeout_secs
    );

    let network = MemoryNetwork::new();
    let host = spawn_member(&network, &config, &host_name);
    let room = host.create_room(host_name.clone(), password.clone()).await?;
    println!("   🔑 Room: {}", room.room_id.to_string().bold());

    let mut members = Vec::new();
    for i in 0..guests {
        let name = format!("guest{}", i + 1);
        let handle = spawn_member(&network, &config, &name);
        let joined = handle
            .join_room(room.room_id.clone(), name.clone(), password.clone())
            .await
            .with_context(|| format!("{name} could not join"))?;
        println!("   👋 {} joined as {}", name, joined.local_id);
        members.push(handle);
    }

    println!("{}", "🔗 Waiting for the mesh...".cyan());
    for handle in std::iter::once(&host).chain(&members) {
        settle(handle, "full mesh", |s| {
            s.participants.len() == guests && s.open_connections == guests
        })
        .await?;
    }

    println!("{}", "💬 Chatting...".cyan());
    host.send_chat("Welcome! Movie starts in a minute.").await?;
    for (i, handle) in members.iter().enumerate() {
        handle.send_chat(format!("Hi from guest{}", i + 1)).await?;
    }
    for handle in std::iter::once(&host).chain(&members) {
        settle(handle, "chat", |s| s.chat.len() == guests + 1).await?;
    }

    println!("{}", "📺 Sharing the host screen...".cyan());
    let stream = host.start_screen_share().await?;
    println!("   {} track(s) in {}", stream.tracks.len(), stream.id);
    for handle in &members {
        settle(handle, "remote stream", |s| s.remote_streams.contains(&room.host)).await?;
    }

    if let Some(driver) = members.first() {
        println!("{}", "🖱  Handing over remote control...".cyan());
        let driver_id = driver
            .snapshot()
            .await?
            .local_id
            .context("guest has no identity")?;

        driver.request_control(&room.host).await?;
        settle(&host, "control request", |s| {
            s.pending_control_requests.contains(&driver_id)
        })
        .await?;

        let dims = host
            .grant_control(&driver_id)
            .await?
            .context("grant was not delivered")?;
        println!("   granted at {}x{}", dims.width, dims.height);
        settle(driver, "grant", |s| s.held_control.contains(&room.host)).await?;

        driver
            .forward_input(CapturedInput::pointer_move(NormalizedPoint::new(0.5, 0.5)))
            .await?;
        driver
            .forward_input(CapturedInput::click(NormalizedPoint::new(0.5, 0.5), 0))
            .await?;
        let replayed = settle(&host, "input replay", |s| s.replayed_events >= 2).await?;
        println!("   host replayed {} event(s)", replayed.replayed_events);

        host.revoke_control(&driver_id).await?;
    }

    println!("{}", "🧹 Closing the room...".cyan());
    host.destroy_room().await?;
    for handle in &members {
        settle(handle, "room teardown", |s| !s.phase.in_room()).await?;
        handle.shutdown().await?;
    }
    host.shutdown().await?;
    info!("All sessions stopped");

    println!("{}", "✨ Demo finished!".green().bold());
    Ok(())
}
