//! `walletd`: a lightweight SPV Bitcoin wallet daemon.
//!
//! Three long-lived threads share the wallet's state: the network
//! reactor (owns every peer socket and does all protocol-local
//! handling), the message handler (turns chain-relevant messages into
//! database work), and the database thread (the only thread that
//! touches the store). A shared `best_block` height and inventory
//! scheduler cross thread boundaries behind an atomic and a mutex
//! respectively; no other state is shared.

mod cli;
mod config;
mod db;
mod handler_thread;
mod keys;
mod seeds;

use std::io::{self, IsTerminal, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use tracing::info;

use wallet_chain::parameters::Network;
use wallet_chain::transparent::Address;
use wallet_network::protocol::external::Message;
use wallet_network::{BloomFilter, InventoryScheduler, Reactor};
use wallet_state::{Config, SledStore, WalletStore};

use cli::Cli;

fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let network = cli.network().wrap_err("parsing network argument")?;
    let payment_uri = cli.payment_uri().wrap_err("parsing payment uri argument")?;

    let config = Config::new(network);
    std::fs::create_dir_all(&config.data_dir)
        .wrap_err_with(|| format!("creating data directory {}", config.data_dir.display()))?;

    let file_config = config::load(&config.data_dir.join("BitcoinWallet.conf"))
        .wrap_err("loading BitcoinWallet.conf")?;

    let store: Arc<dyn WalletStore + Send + Sync> =
        Arc::new(SledStore::open(&config).wrap_err("opening wallet store")?);

    let passphrase = resolve_passphrase(&file_config)?;

    info!(%network, data_dir = %config.data_dir.display(), "starting walletd");

    let known_addrs = if file_config.connect.is_empty() {
        seeds::discover(network)
    } else {
        file_config
            .connect
            .iter()
            .map(|addr| wallet_network::MetaAddr::new_static(*addr))
            .collect()
    };
    let static_only = !file_config.connect.is_empty();

    let chain_head = store.chain_head().wrap_err("reading chain head")?;
    let best_block = Arc::new(AtomicU32::new(chain_head.as_ref().map(|head| head.height.0).unwrap_or(0)));
    let chain_tip = Arc::new(Mutex::new(chain_head.map(|head| head.hash)));
    let scheduler = Arc::new(Mutex::new(InventoryScheduler::new()));
    let shutdown = Arc::new(AtomicBool::new(false));

    let (inbound_tx, inbound_rx) = mpsc::channel();
    let (jobs_tx, jobs_rx) = mpsc::channel();
    let (broadcast_tx, broadcast_rx) = mpsc::channel();

    let filter = build_filter_load(store.as_ref()).wrap_err("building bloom filter")?;

    let listen_addr: Option<SocketAddr> = None;
    let reactor = Reactor::new(
        listen_addr,
        known_addrs,
        static_only,
        scheduler.clone(),
        inbound_tx,
        network,
        best_block.clone(),
        chain_tip.clone(),
        filter,
        broadcast_rx,
    )
    .wrap_err("initializing network reactor")?;

    let reactor_shutdown = shutdown.clone();
    let reactor_thread = thread::Builder::new()
        .name("wallet-reactor".to_string())
        .spawn(move || {
            if let Err(e) = reactor.run(reactor_shutdown) {
                tracing::error!(error = %e, "reactor thread exited with an error");
            }
        })
        .wrap_err("spawning reactor thread")?;

    let handler_scheduler = scheduler.clone();
    let handler_thread = thread::Builder::new()
        .name("wallet-handler".to_string())
        .spawn(move || handler_thread::run(inbound_rx, jobs_tx, handler_scheduler))
        .wrap_err("spawning message handler thread")?;

    let db_store = store.clone();
    let db_scheduler = scheduler.clone();
    let db_best_block = best_block.clone();
    let db_chain_tip = chain_tip.clone();
    let db_thread = thread::Builder::new()
        .name("wallet-db".to_string())
        .spawn(move || db::run(db_store, network, db_scheduler, db_best_block, db_chain_tip, jobs_rx))
        .wrap_err("spawning database thread")?;

    if let Some(uri) = payment_uri {
        if let Some(passphrase) = &passphrase {
            if let Err(e) = dispatch_payment(store.as_ref(), network, uri, passphrase, &broadcast_tx) {
                tracing::error!(error = %e, "payment dispatch failed");
            }
        } else {
            tracing::error!("a bitcoin: uri was given but no passphrase is configured to unlock spending keys");
        }
    }

    let ctrlc_shutdown = shutdown.clone();
    ctrlc::set_handler(move || ctrlc_shutdown.store(true, Ordering::Relaxed))
        .wrap_err("installing Ctrl+C handler")?;

    while !shutdown.load(Ordering::Relaxed) {
        thread::sleep(std::time::Duration::from_millis(200));
    }

    drop(broadcast_tx);
    let _ = reactor_thread.join();
    let _ = handler_thread.join();
    let _ = db_thread.join();

    info!("walletd shut down cleanly");
    Ok(())
}

/// Builds the `filterload` message installed on every peer connection from
/// the wallet's currently known addresses (§4.5 step 6a). An empty address
/// book still yields a (maximally over-matching) filter rather than no
/// filter at all, since a wallet with no addresses yet still wants to learn
/// about deposits to addresses it derives later in the session.
fn build_filter_load(store: &dyn WalletStore) -> Result<Message> {
    let elements: Vec<Vec<u8>> = store
        .get_address_list()
        .wrap_err("reading address list")?
        .into_iter()
        .map(|stored| match stored.address {
            Address::PayToPublicKeyHash { pub_key_hash, .. } => pub_key_hash.to_vec(),
            Address::PayToScriptHash { script_hash, .. } => script_hash.to_vec(),
        })
        .collect();
    let tweak: u32 = rand::random();
    let bloom = BloomFilter::new(&elements, wallet_network::constants::FILTER_FALSE_POSITIVE_RATE, tweak);
    let (filter, hash_functions_count, tweak) = bloom.into_parts();
    Ok(Message::FilterLoad { filter, hash_functions_count, tweak, flags: 0 })
}

/// `passphrase=` in the config file, or an interactive prompt when
/// standard input is a terminal. A wallet with no keys yet has no
/// passphrase to unlock, so a missing one here is not an error.
fn resolve_passphrase(file_config: &config::FileConfig) -> Result<Option<String>> {
    if let Some(passphrase) = &file_config.passphrase {
        return Ok(Some(passphrase.clone()));
    }
    if !io::stdin().is_terminal() {
        return Ok(None);
    }
    print!("Wallet passphrase: ");
    io::stdout().flush().ok();
    let mut line = String::new();
    io::stdin().read_line(&mut line).wrap_err("reading passphrase")?;
    let trimmed = line.trim();
    if trimmed.is_empty() {
        Ok(None)
    } else {
        Ok(Some(trimmed.to_string()))
    }
}

fn dispatch_payment(
    store: &dyn WalletStore,
    network: Network,
    uri: &str,
    passphrase: &str,
    broadcast: &mpsc::Sender<Arc<wallet_chain::transaction::Transaction>>,
) -> Result<()> {
    let parsed = wallet_payment::parse_uri(uri).wrap_err("parsing payment uri")?;
    let keys = keys::load_keys(store, passphrase).wrap_err("decrypting wallet keys")?;
    let change_key = keys::change_key(store, passphrase).wrap_err("preparing change key")?;

    let amount = parsed.amount.ok_or_else(|| eyre!("payment uri has no amount"))?;

    let (transaction, fee) = if let Some(payment_request_url) = &parsed.payment_request_url {
        let request = wallet_payment::fetch_payment_request(payment_request_url, chrono::Utc::now())
            .wrap_err("fetching payment request")?;
        let plan = wallet_tx::build_and_sign(store, network, parsed.address, amount, &change_key, &keys)
            .wrap_err("building payment transaction")?;
        let outcome = wallet_payment::send_payment(&request, &plan.transaction, parsed.message.clone())
            .wrap_err("submitting payment to merchant")?;
        info!(memo = ?outcome.memo, "payment acknowledged by merchant");
        (plan.transaction, plan.fee)
    } else {
        let plan = wallet_tx::build_and_sign(store, network, parsed.address, amount, &change_key, &keys)
            .wrap_err("building payment transaction")?;
        (plan.transaction, plan.fee)
    };

    info!(fee, "broadcasting payment transaction");
    broadcast
        .send(Arc::new(transaction))
        .map_err(|_| eyre!("network reactor is no longer accepting broadcasts"))?;

    Ok(())
}
