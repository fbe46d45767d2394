//! Splitchain daemon: entry point for running a node and inspecting the fork.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use splitchain_fork::{FileMarkerStore, ForkActivationController, ForkStatus};
use splitchain_node::{
    init_logging, ChainState, FileWalletBackup, ForkMetrics, LogFormat, NodeConfig,
    ShutdownController,
};
use splitchain_types::{ConsensusParams, NetworkId};
use splitchain_utils::format_duration;

#[derive(Parser)]
#[command(name = "splitchain-daemon", about = "Splitchain node daemon")]
struct Cli {
    /// Network to follow: "main", "test", "nol" or "regtest".
    /// When a config file is provided, defaults to the file's network value.
    #[arg(long, env = "SPLITCHAIN_NETWORK")]
    network: Option<String>,

    /// Data directory holding the activation marker and wallet.
    #[arg(long, env = "SPLITCHAIN_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Path to a TOML configuration file. If provided, file settings
    /// are used as the base; CLI flags and env vars override them.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, env = "SPLITCHAIN_LOG_LEVEL")]
    log_level: Option<String>,

    /// Log format: "human" or "json".
    #[arg(long, env = "SPLITCHAIN_LOG_FORMAT")]
    log_format: Option<String>,

    /// Fork trigger height.
    #[arg(long, env = "SPLITCHAIN_FORK_HEIGHT", allow_hyphen_values = true)]
    fork_height: Option<i64>,

    /// Fork id (24 bits).
    #[arg(long, env = "SPLITCHAIN_FORK_ID", allow_hyphen_values = true)]
    fork_id: Option<i64>,

    /// Block whose wallet state is backed up at the fork.
    #[arg(long, env = "SPLITCHAIN_AUTO_BACKUP_BLOCK", allow_hyphen_values = true)]
    auto_backup_block: Option<i64>,

    /// Backup destination; `@` is replaced by the backup block height.
    #[arg(long, env = "SPLITCHAIN_AUTO_BACKUP_WALLET_PATH")]
    auto_backup_wallet_path: Option<String>,

    /// Retarget even on networks that normally do not.
    #[arg(long, env = "SPLITCHAIN_FORCE_RETARGET")]
    force_retarget: bool,

    /// Allow activation by on-chain signal.
    #[arg(long, env = "SPLITCHAIN_SEGWIT_FORK")]
    segwit_fork: bool,

    /// Run without a wallet; no backup is taken at the fork.
    #[arg(long, env = "SPLITCHAIN_DISABLE_WALLET")]
    disable_wallet: bool,

    /// Subcommand.
    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the node.
    #[command(name = "node")]
    Node {
        #[command(subcommand)]
        action: NodeAction,
    },
    /// Inspect the fork activation state.
    #[command(name = "fork")]
    Fork {
        #[command(subcommand)]
        action: ForkAction,
    },
    /// Inspect the post-fork retarget schedule.
    #[command(name = "retarget")]
    Retarget {
        #[command(subcommand)]
        action: RetargetAction,
    },
}

#[derive(clap::Subcommand)]
enum NodeAction {
    /// Run the node until interrupted.
    Run,
}

#[derive(clap::Subcommand)]
enum ForkAction {
    /// Show the resolved fork parameters and marker state.
    Status {
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

#[derive(clap::Subcommand)]
enum RetargetAction {
    /// Print the retarget window for each stretch of blocks after the fork.
    Schedule,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = build_config(&cli)?;
    let (format, level) = log_settings(&cli, &config)?;
    init_logging(format, &level)?;

    match cli.command {
        Command::Node {
            action: NodeAction::Run,
        } => run_node(config).await,
        Command::Fork {
            action: ForkAction::Status { json },
        } => fork_status(&config, json),
        Command::Retarget {
            action: RetargetAction::Schedule,
        } => {
            print_schedule(&config);
            Ok(())
        }
    }
}

/// Log format and level for the command. The one-shot inspection commands
/// stay at `warn` unless a level is given on the command line.
fn log_settings(cli: &Cli, config: &NodeConfig) -> anyhow::Result<(LogFormat, String)> {
    let format: LogFormat = config.log_format.parse()?;
    let level = match cli.command {
        Command::Node { .. } => config.log_level.clone(),
        _ => cli.log_level.clone().unwrap_or_else(|| "warn".to_string()),
    };
    Ok((format, level))
}

/// Layer the configuration: built-in defaults, then the TOML file, then
/// command-line flags. The activation marker is applied later by the fork
/// controller.
fn build_config(cli: &Cli) -> anyhow::Result<NodeConfig> {
    let mut config = match &cli.config {
        Some(path) => NodeConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => NodeConfig::default(),
    };

    if let Some(network) = &cli.network {
        config.network = network
            .parse::<NetworkId>()
            .with_context(|| format!("invalid --network {network:?}"))?;
    }
    if let Some(data_dir) = &cli.data_dir {
        config.data_dir = data_dir.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(format) = &cli.log_format {
        config.log_format = format.clone();
    }

    let fork = &mut config.fork;
    fork.fork_height = cli.fork_height.or(fork.fork_height);
    fork.fork_id = cli.fork_id.or(fork.fork_id);
    fork.auto_backup_block = cli.auto_backup_block.or(fork.auto_backup_block);
    if let Some(path) = &cli.auto_backup_wallet_path {
        fork.auto_backup_wallet_path = Some(path.clone());
    }
    fork.force_retarget |= cli.force_retarget;
    fork.segwit_fork |= cli.segwit_fork;
    config.disable_wallet |= cli.disable_wallet;

    Ok(config)
}

fn setup_fork(
    config: &NodeConfig,
    shutdown: &ShutdownController,
) -> ForkActivationController {
    let store = Arc::new(FileMarkerStore::new(&config.data_dir));
    let fork = ForkActivationController::setup(
        config.network,
        &config.fork_overrides(),
        store,
        shutdown,
    );
    if config.disable_wallet {
        fork
    } else {
        fork.with_wallet_backup(Arc::new(FileWalletBackup::new(
            &config.data_dir,
            config.wallet_file.clone(),
        )))
    }
}

async fn run_node(config: NodeConfig) -> anyhow::Result<()> {
    std::fs::create_dir_all(&config.data_dir)
        .with_context(|| format!("creating data dir {}", config.data_dir.display()))?;

    let shutdown = Arc::new(ShutdownController::new());
    let fork = setup_fork(&config, &shutdown);
    if let Some(err) = fork.setup_error() {
        anyhow::bail!("invalid fork configuration: {err}");
    }

    tracing::info!(
        network = %config.network,
        data_dir = %config.data_dir.display(),
        fork_height = fork.resolved_fork_height(),
        fork_id = %format!("{:#08x}", fork.resolved_fork_id()),
        activated_before = fork.was_activated_before(),
        "starting splitchain node"
    );

    let metrics = Arc::new(ForkMetrics::new()?);
    let params = config.consensus_params();
    let genesis_bits = params.pow_limit_bits();
    let mut chain = ChainState::new(params, fork, shutdown.clone(), metrics.clone())
        .with_backup(!config.disable_wallet)
        .with_segwit_fork(config.fork.segwit_fork);
    chain.genesis(0, genesis_bits)?;

    let mut stop = shutdown.subscribe();
    tokio::select! {
        _ = shutdown.wait_for_signal() => {}
        _ = stop.recv() => {}
    }

    if let Some(reason) = shutdown.reason() {
        tracing::info!(reason, "shutdown signal received, stopping node");
    }
    if config.enable_metrics {
        tracing::info!(metrics = %metrics.encode()?, "final metrics");
    }
    tracing::info!("splitchain daemon exited cleanly");
    Ok(())
}

fn fork_status(config: &NodeConfig, json: bool) -> anyhow::Result<()> {
    let shutdown = ShutdownController::new();
    let status = setup_fork(config, &shutdown).status();

    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        print!("{}", render_status(&status));
    }
    if let Some(err) = &status.setup_error {
        anyhow::bail!("invalid fork configuration: {err}");
    }
    Ok(())
}

fn render_status(status: &ForkStatus) -> String {
    let mut out = String::new();
    out.push_str(&format!("network:            {}\n", status.network));
    out.push_str(&format!("state:              {:?}\n", status.state));
    out.push_str(&format!("consensus id:       {}\n", status.consensus_id));
    out.push_str(&format!("fork height:        {}\n", status.fork_height));
    out.push_str(&format!("fork id:            {:#08x}\n", status.fork_id));
    out.push_str(&format!("auto backup block:  {}\n", status.auto_backup_block));
    out.push_str(&format!("activated before:   {}\n", status.activated_before));
    out.push_str(&format!("backup done:        {}\n", status.backup_done));
    if let Some(err) = &status.setup_error {
        out.push_str(&format!("setup error:        {err}\n"));
    }
    out
}

fn print_schedule(config: &NodeConfig) {
    let params = config.consensus_params();
    print!("{}", render_schedule(&params));
}

fn render_schedule(params: &ConsensusParams) -> String {
    let mut out = format!(
        "{} network, target spacing {}\n",
        params.network,
        format_duration(params.pow_target_spacing)
    );
    let mut first = 0u32;
    for bp in params.schedule.breakpoints() {
        let timespan = bp.spacing_multiple * params.pow_target_spacing;
        out.push_str(&format!(
            "blocks {:>6} - {:>6} after fork: window {:>7}, retarget every {} blocks\n",
            first,
            bp.last_block,
            format_duration(timespan),
            bp.spacing_multiple
        ));
        first = bp.last_block.saturating_add(1);
    }
    match params.retarget_period_blocks {
        Some(blocks) => out.push_str(&format!(
            "from block {} after fork: legacy window {}, every {} blocks\n",
            blocks,
            format_duration(params.pow_target_timespan),
            params.difficulty_adjustment_interval()
        )),
        None => out.push_str(&format!(
            "after the table: window {} (unbounded period)\n",
            format_duration(params.pow_target_timespan)
        )),
    }
    if params.retargeting_disabled() {
        out.push_str("retargeting is disabled on this network\n");
    }
    out
}
