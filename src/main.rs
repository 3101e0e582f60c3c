use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tarvenote::graph::ClickEvent;
use tarvenote::mcp::HttpMcpServer;
use tarvenote::settings::FileSettingsStore;
use tarvenote::viewer::terminal::{read_line, ConsoleNotifier, StdinPicker, TerminalRenderer};
use tarvenote::viewer::GraphViewer;
use tarvenote::{Bridge, Config};

#[derive(Parser)]
#[command(name = "tarvenote")]
#[command(version)]
#[command(about = "Campaign knowledge-graph bridge and viewer for TRPG sessions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the campaign tools over MCP stdio
    Serve,

    /// Serve the campaign tools over MCP HTTP
    ServeHttp {
        /// Overrides http_server.port
        #[arg(long)]
        port: Option<u16>,
    },

    /// List campaigns on the backend
    Campaigns,

    /// Show settings, or save them when a flag is given
    Settings {
        /// Backend URL; blank resets to the configured default
        #[arg(long)]
        backend_url: Option<String>,

        /// Register the campaign tools with the host
        #[arg(long)]
        enable_tools: Option<bool>,
    },

    /// Interactive graph viewer
    Graph,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    // MCP stdio owns stdout; logs go to stderr
    env_logger::Builder::from_env(env_logger::Env::default().filter_or("RUST_LOG", config.log_filter()))
        .init();

    let store = Arc::new(FileSettingsStore::new(config.settings_path()));
    let bridge = Bridge::startup(config, store)?;

    match cli.command {
        Commands::Serve => run_mcp_server(&bridge).await,
        Commands::ServeHttp { port } => run_http_server(&bridge, port).await,
        Commands::Campaigns => list_campaigns(&bridge).await,
        Commands::Settings {
            backend_url,
            enable_tools,
        } => update_settings(&bridge, backend_url, enable_tools),
        Commands::Graph => run_graph_viewer(&bridge).await,
    }
}

/// Run MCP server (stdio transport)
async fn run_mcp_server(bridge: &Bridge) -> Result<()> {
    log::info!("Starting Tarven Note MCP server v{}", env!("CARGO_PKG_VERSION"));
    bridge.mcp_server().run().await?;
    Ok(())
}

/// Run HTTP MCP server
async fn run_http_server(bridge: &Bridge, port: Option<u16>) -> Result<()> {
    log::info!("Starting Tarven Note HTTP server v{}", env!("CARGO_PKG_VERSION"));
    let config = bridge.config();
    let http_server = HttpMcpServer::new(Arc::new(bridge.mcp_server()), &config.http_server)?;
    http_server.run(port.unwrap_or(config.http_server.port)).await?;
    Ok(())
}

async fn list_campaigns(bridge: &Bridge) -> Result<()> {
    let campaigns = bridge.client().list_campaigns().await?;
    if campaigns.is_empty() {
        println!("No campaigns found.");
    }
    for campaign in campaigns {
        println!(
            "{}  {}  {}",
            campaign.campaign_id,
            campaign.name,
            campaign.created_label()
        );
    }
    Ok(())
}

fn update_settings(bridge: &Bridge, backend_url: Option<String>, enable_tools: Option<bool>) -> Result<()> {
    let current = bridge.session().settings();
    let settings = if backend_url.is_none() && enable_tools.is_none() {
        current
    } else {
        bridge.save_settings(
            backend_url.as_deref().unwrap_or(&current.backend_url),
            enable_tools.unwrap_or(current.tools_enabled),
        )?
    };
    println!("backend_url   = {}", settings.backend_url);
    println!("tools_enabled = {}", settings.tools_enabled);
    Ok(())
}

const GRAPH_HELP: &str = "Commands: search <name>, full, switch, node <id>, edge <id>, blank, close, open, quit";

async fn run_graph_viewer(bridge: &Bridge) -> Result<()> {
    let viewer = GraphViewer::new(
        bridge.client().clone(),
        TerminalRenderer,
        StdinPicker,
        ConsoleNotifier,
        bridge.config().graph.clone(),
    );

    if !viewer.open().await {
        return Ok(());
    }
    println!("{}", GRAPH_HELP);

    while let Some(line) = read_line().await? {
        let line = line.trim();
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command {
            "" => continue,
            "quit" | "exit" => break,
            "open" => {
                viewer.open().await;
            }
            "close" => viewer.close(),
            _ if !viewer.is_modal_open() => println!("Viewer is closed. Type 'open' or 'quit'."),
            "search" => {
                viewer.search(arg).await;
            }
            "full" => {
                viewer.show_full().await;
            }
            "switch" => {
                viewer.switch_campaign().await;
            }
            "node" | "edge" | "blank" => {
                let event = match command {
                    "node" => ClickEvent::node(arg),
                    "edge" => ClickEvent::edge(arg),
                    _ => ClickEvent::background(),
                };
                viewer.click(event).await;
                match viewer.panel().content() {
                    Some(content) if viewer.panel().is_open() => println!("{}", content.render()),
                    _ => println!("(details closed)"),
                }
            }
            _ => println!("{}", GRAPH_HELP),
        }
    }

    viewer.close();
    Ok(())
}
