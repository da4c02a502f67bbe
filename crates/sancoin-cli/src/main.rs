use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sancoin_core::constants::BLOCK_REWARD;
use sancoin_core::{
    unix_now, Block, CancelToken, ChainValidator, ConsensusParams, MineOutcome, Miner,
    Transaction, Wallet,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "sancoin")]
#[command(about = "Mine and validate SanCoin proof-of-work chains")]
struct Cli {
    /// JSON file with consensus parameters (difficulty, clock skew, genesis)
    #[arg(long, global = true)]
    params: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a new wallet and print its address and secret key
    Keygen,
    /// Mine a new chain from genesis
    Mine {
        /// Number of blocks to mine after genesis
        #[arg(long, default_value_t = 3)]
        blocks: u64,
        /// Leading zero hex digits required of each block hash
        #[arg(long)]
        difficulty: Option<u32>,
        /// Where to write the chain; stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
        /// Miner secret key (hex); a fresh wallet is used when omitted
        #[arg(long)]
        secret: Option<String>,
        /// Stop mining after this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Spread the nonce search over all cores
        #[arg(long)]
        parallel: bool,
    },
    /// Validate a chain file
    Validate {
        /// Chain file written by `sancoin mine`
        #[arg(long)]
        chain: PathBuf,
        /// Leading zero hex digits required of each block hash
        #[arg(long)]
        difficulty: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let params = load_params(cli.params.as_deref()).await?;

    match cli.cmd {
        Command::Keygen => {
            let wallet = Wallet::generate();
            println!("address: {}", wallet.address());
            println!("secret:  {}", wallet.secret_hex());
        }
        Command::Mine {
            blocks,
            difficulty,
            out,
            secret,
            timeout_secs,
            parallel,
        } => {
            let params = with_difficulty(params, difficulty);
            let wallet = match secret {
                Some(hex) => Wallet::from_hex(&hex).context("invalid --secret")?,
                None => Wallet::generate(),
            };
            let miner = Miner::new(params.difficulty).with_parallel(parallel);
            let cancel = stop_signal(timeout_secs.map(Duration::from_secs));

            let (chain, cancelled) = mine_chain(&params, miner, &wallet, blocks, &cancel).await?;
            let json = serde_json::to_string_pretty(&chain)?;
            let mined = chain.len() - 1;
            let summary = if cancelled {
                format!("mining cancelled after {mined} of {blocks} blocks")
            } else {
                format!("mined {mined} blocks")
            };
            match &out {
                Some(path) => {
                    tokio::fs::write(path, json)
                        .await
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("{summary}, chain written to {}", path.display());
                }
                // keep stdout clean for the chain itself
                None => {
                    println!("{json}");
                    eprintln!("{summary}");
                }
            }
        }
        Command::Validate { chain, difficulty } => {
            let params = with_difficulty(params, difficulty);
            let blocks = read_chain(&chain).await?;
            let result = ChainValidator::new(params).validate_chain(&blocks);
            println!("{result}");
            if !result.is_valid() {
                return Ok(ExitCode::FAILURE);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

async fn load_params(path: Option<&Path>) -> Result<ConsensusParams> {
    let Some(path) = path else {
        return Ok(ConsensusParams::default());
    };
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read params file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("{} is not a valid params file", path.display()))
}

fn with_difficulty(mut params: ConsensusParams, difficulty: Option<u32>) -> ConsensusParams {
    if let Some(d) = difficulty {
        params.difficulty = d;
    }
    params
}

async fn read_chain(path: &Path) -> Result<Vec<Block>> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read chain file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not a chain file", path.display()))
}

/// Token that trips on Ctrl-C or, when given, after `timeout`.
fn stop_signal(timeout: Option<Duration>) -> CancelToken {
    let cancel = CancelToken::new();

    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping miner");
            on_interrupt.cancel();
        }
    });

    if let Some(timeout) = timeout {
        let on_timeout = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            warn!("mining timeout of {:?} reached", timeout);
            on_timeout.cancel();
        });
    }
    cancel
}

/// Mine `blocks` blocks on top of genesis. Returns the chain so far and
/// whether the run was cut short.
async fn mine_chain(
    params: &ConsensusParams,
    miner: Miner,
    wallet: &Wallet,
    blocks: u64,
    cancel: &CancelToken,
) -> Result<(Vec<Block>, bool)> {
    let payee = Wallet::generate().address();
    let mut chain = vec![Block::genesis(&params.genesis)];
    info!(
        "mining {} blocks at difficulty {} for {}",
        blocks,
        miner.difficulty(),
        wallet.address()
    );

    for _ in 0..blocks {
        let tip = &chain[chain.len() - 1];
        let timestamp = unix_now().max(tip.header().timestamp);
        let txs = vec![
            Transaction::coinbase(wallet.address(), BLOCK_REWARD, timestamp),
            wallet.transfer(&payee, 1, timestamp),
        ];
        let handle = miner.spawn(miner.next_block(tip, txs, timestamp), cancel.clone())?;

        match tokio::task::spawn_blocking(move || handle.join()).await?? {
            MineOutcome::Mined(block) => chain.push(block),
            MineOutcome::Cancelled { attempts } => {
                warn!("stopped after {} attempts on block {}", attempts, chain.len());
                return Ok((chain, true));
            }
        }
    }
    Ok((chain, false))
}
