use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eyre::{eyre, Error, Result};
use firestation::client::{LedgerClient, PriceSource};
use firestation::config::{Config, DEFAULT_CONFIG_PATH};
use firestation::engine::{SessionOutcome, Stabilizer, VolumeGenerator};
use firestation::tx::TxSigner;
use firestation::utils::app_context::AppContext;
use firestation::utils::logger::setup_logger;
use log::{info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep the configured pool near its reference rate (default)
    Stabilize,
    /// Generate volume across randomly chosen pools
    Volume {
        /// Seed for pool selection; random when omitted
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Print the reference USD price of a denom
    Price { denom: String },
    /// Print the derived address and its on-chain account state
    Account,
}

async fn stabilize(ctx: &AppContext) -> Result<(), Error> {
    let signer = ctx.signer()?;
    let builder = ctx.tx_builder().await?;
    let target = ctx.config.pair_target(&ctx.price_ids)?;
    info!(
        "stabilizing pool {} ({}/{}) from {}",
        target.pool_id,
        target.denom_x,
        target.denom_y,
        signer.address()
    );

    let stabilizer = Stabilizer::new(
        &ctx.ledger,
        &ctx.prices,
        &signer,
        builder,
        target,
        ctx.config.stabilizer_settings(),
    );
    match stabilizer.run().await? {
        outcome @ SessionOutcome::Converged { .. } => info!("{outcome}"),
        outcome => warn!("{outcome}"),
    }
    Ok(())
}

async fn volume(ctx: &AppContext, seed: Option<u64>) -> Result<(), Error> {
    let signer = ctx.signer()?;
    let builder = ctx.tx_builder().await?;
    let rng = seed.map_or_else(StdRng::from_os_rng, StdRng::seed_from_u64);

    let mut generator = VolumeGenerator::new(
        &ctx.ledger,
        &ctx.prices,
        &signer,
        builder,
        ctx.price_ids.clone(),
        ctx.config.volume_settings(),
        rng,
    );
    let report = generator.run().await?;
    println!(
        "cycles: {}\ntransactions: {}\nmessages: {}\nremaining notional: {} USD",
        report.cycles, report.transactions, report.messages, report.remaining_notional_usd
    );
    Ok(())
}

async fn price(ctx: &AppContext, denom: &str) -> Result<(), Error> {
    let id = ctx
        .price_ids
        .id_for(denom)
        .ok_or_else(|| eyre!("no price id known for {denom}"))?;
    let usd = ctx.prices.price(id).await?;
    println!("{denom} (id {id}): {usd} USD");
    Ok(())
}

async fn account(ctx: &AppContext) -> Result<(), Error> {
    let signer = ctx.signer()?;
    let state = ctx.ledger.account(signer.address()).await?;
    println!(
        "address: {}\naccount number: {}\nsequence: {}",
        state.address, state.account_number, state.sequence
    );
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();
    setup_logger()?;

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;
    let ctx = AppContext::new(config)?;

    match cli.command {
        Some(Commands::Volume { seed }) => volume(&ctx, seed).await?,
        Some(Commands::Price { denom }) => price(&ctx, &denom).await?,
        Some(Commands::Account) => account(&ctx).await?,
        Some(Commands::Stabilize) | None => stabilize(&ctx).await?,
    }

    Ok(())
}
