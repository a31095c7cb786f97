use std::env;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lmsr_market::actions::ActionOutcome;
use lmsr_market::client::MarketClient;
use lmsr_market::config::Config;
use lmsr_market::forms::{Asset, MarketDraft, TradeTicket, TransferDraft};
use lmsr_market::models::{ActiveMarkets, Market, Outcome};
use lmsr_market::workers::MarketScannerWorker;

const USAGE: &str = "usage: market_board [--watch | balances | buy <id> <yes|no> <amount> | \
create <draft.json> | transfer <to> <amount> <eth|usdc> | claim-tokens | claim-eth]";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_board=info,lmsr_market=info,warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Parse arguments
    let args: Vec<String> = env::args().skip(1).collect();

    let config = Config::from_env()?;
    let (client, mut notices) = MarketClient::from_config(&config)?;

    // Transaction progress
    let notice_handle = tokio::spawn(async move {
        while let Some(notice) = notices.recv().await {
            info!("{}", notice);
        }
    });

    let cancel = CancellationToken::new();
    let command = args.first().map(String::as_str).unwrap_or("");

    match command {
        "" => {
            let markets = client.board.list_markets(&cancel).await?;
            print_board(&markets);
        }
        "--watch" => {
            watch(client, config.market_scan_interval, cancel).await;
            return Ok(());
        }
        "balances" => {
            let owner = client
                .session
                .address()
                .context("WALLET_PRIVATE_KEY is required for balances")?;
            let balances = client.wallet.balances(owner).await;
            let faucet = client.wallet.faucet_status(owner).await;
            println!("{}  ETH   {}", owner, balances.native_display());
            println!("{}  USDC  {}", owner, balances.token_display());
            println!("ETH claimed from faucet: {}", faucet.has_claimed_eth);
        }
        "buy" => {
            let [id, side, amount] = operands::<3>(&args)?;
            let market_id = id.parse().context("Market id must be a number")?;
            let outcome = match side.to_ascii_lowercase().as_str() {
                "yes" => Outcome::Yes,
                "no" => Outcome::No,
                other => bail!("Unknown outcome {}, expected yes or no", other),
            };
            let mut ticket = TradeTicket::new(market_id, outcome).with_amount(amount);
            let outcome = client
                .actions
                .buy(&client.session, &mut ticket, &cancel)
                .await?;
            report(outcome);
        }
        "create" => {
            let [path] = operands::<1>(&args)?;
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path))?;
            let draft: MarketDraft =
                serde_json::from_str(&text).context("Failed to parse market draft")?;
            let outcome = client
                .actions
                .create_market(&client.session, &draft, Utc::now(), &cancel)
                .await?;
            report(outcome);
        }
        "transfer" => {
            let [to, amount, asset] = operands::<3>(&args)?;
            let asset = match asset.to_ascii_lowercase().as_str() {
                "eth" => Asset::Eth,
                "usdc" => Asset::Usdc,
                other => bail!("Unknown asset {}, expected eth or usdc", other),
            };
            let draft = TransferDraft {
                recipient: to.to_string(),
                amount: amount.to_string(),
                asset,
            };
            let receipt = client
                .wallet
                .transfer(&client.session, &draft, &cancel)
                .await?;
            println!("Transfer confirmed in {}", receipt.hash);
        }
        "claim-tokens" => {
            let receipt = client.wallet.claim_tokens(&client.session, &cancel).await?;
            println!("Tokens claimed in {}", receipt.hash);
        }
        "claim-eth" => {
            let receipt = client.wallet.claim_eth(&client.session, &cancel).await?;
            println!("ETH claimed in {}", receipt.hash);
        }
        other => bail!("Unknown command {}\n{}", other, USAGE),
    }

    drop(client);
    if let Err(e) = notice_handle.await {
        error!("Notice logger panicked: {:?}", e);
    }
    Ok(())
}

/// The `N` arguments following the command
fn operands<const N: usize>(args: &[String]) -> Result<[&str; N]> {
    let rest: Vec<&str> = args.iter().skip(1).map(String::as_str).collect();
    match rest.try_into() {
        Ok(operands) => Ok(operands),
        Err(_) => bail!("Expected {} arguments\n{}", N, USAGE),
    }
}

fn report(outcome: ActionOutcome) {
    match outcome {
        ActionOutcome::Completed { approval, receipt } => {
            if let Some(approval) = approval {
                println!("Approved in {}", approval);
            }
            println!("Confirmed in {}", receipt.hash);
        }
        ActionOutcome::ApprovalConfirmed { approval } => {
            println!("Approved in {}, run the command again to continue", approval);
        }
    }
}

async fn watch(client: MarketClient, interval: u64, cancel: CancellationToken) {
    let active_markets: Arc<RwLock<ActiveMarkets>> = Arc::new(RwLock::new(Default::default()));
    let scanner = MarketScannerWorker::new(client.board, Arc::clone(&active_markets), interval);

    let worker_cancel = cancel.clone();
    let mut scanner_handle = tokio::spawn(async move {
        scanner.run(worker_cancel).await;
    });

    info!("Watching markets, press Ctrl+C to stop");

    // Wait for shutdown signal
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            cancel.cancel();
            if let Err(e) = (&mut scanner_handle).await {
                error!("Market scanner panicked: {:?}", e);
            }
        }
        result = &mut scanner_handle => {
            error!("Market scanner exited unexpectedly: {:?}", result);
        }
    }

    print_board(&*active_markets.read().await);
}

fn print_board(markets: &ActiveMarkets) {
    let now = Utc::now();

    println!("{:>4}  {:>5}  {:>5}  {:<14}  QUESTION", "ID", "YES", "NO", "STATUS");
    for market in markets.values() {
        println!(
            "{:>4}  {:>4}%  {:>4}%  {:<14}  {}",
            market.id,
            market.probabilities.yes(),
            market.probabilities.no(),
            status(market, now),
            market.title
        );
    }
    println!("{} markets", markets.len());
}

fn status(market: &Market, now: chrono::DateTime<Utc>) -> String {
    if market.resolved {
        let winner = if market.yes_won { "YES" } else { "NO" };
        return format!("resolved {}", winner);
    }
    match market.time_left(now) {
        Some(left) => left.to_string(),
        None => "ended".to_string(),
    }
}
