//! ppool
//!
//! Command-line wallet for privacy-pool notes. Every state change is an event
//! appended to the history file; the ledger is rebuilt by replaying it on
//! each invocation.
//!
//! Commands:
//! 1. `note`: fresh nullifier/secret and the deposit commitment they produce
//! 2. `deposit` / `withdraw` / `ragequit`: apply one event and save
//! 3. `show`: replay and print accounts
//! 4. `witness`: build the circuit inputs for spending an account's note

mod config;
mod store;

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ppool_common::{Commitment, FieldElement, PoseidonOracle};
use ppool_ledger::{CommitmentScheme, NoteSecrets};
use ppool_witness::{LocalMerkleTree, WithdrawalRequest, WitnessBuilder};
use rand::{rngs::OsRng, RngCore};
use serde_json::json;
use tracing::{info, warn};

use crate::config::CliConfig;
use crate::store::{load_leaves, load_wallet, save_wallet};

#[derive(Parser)]
#[command(name = "ppool", version, about = "Privacy-pool note wallet")]
struct Args {
    /// History file (overrides PPOOL_HISTORY).
    #[arg(long, global = true)]
    history: Option<PathBuf>,
    /// Pool label or 0x-prefixed scope id (overrides PPOOL_SCOPE).
    #[arg(long, global = true)]
    scope: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate note secrets and print the deposit commitment.
    Note {
        #[arg(long)]
        depositor: String,
        #[arg(long)]
        amount: u64,
    },
    /// Record a deposit. Secrets are generated when not given.
    Deposit {
        #[arg(long)]
        depositor: String,
        #[arg(long)]
        amount: u64,
        #[arg(long)]
        nullifier: Option<String>,
        #[arg(long)]
        secret: Option<String>,
    },
    /// Record a withdrawal from an account's current note.
    Withdraw {
        /// Initial commitment of the account.
        #[arg(long)]
        account: String,
        #[arg(long)]
        amount: u64,
        /// Nullifier of the change note.
        #[arg(long)]
        nullifier: Option<String>,
        /// Secret of the change note.
        #[arg(long)]
        secret: Option<String>,
    },
    /// Exit an account's full remaining balance.
    Ragequit {
        #[arg(long)]
        account: String,
        /// Defaults to the remaining balance.
        #[arg(long)]
        amount: Option<u64>,
    },
    /// Replay the history and print every account.
    Show {
        #[arg(long)]
        json: bool,
    },
    /// Build the withdrawal witness JSON for an account.
    Witness {
        #[arg(long)]
        account: String,
        #[arg(long)]
        amount: u64,
        #[arg(long)]
        recipient: String,
        #[arg(long)]
        relayer: String,
        #[arg(long, default_value_t = 0)]
        fee: u64,
        #[arg(long, default_value_t = 0)]
        refund: u64,
        /// JSON array of every leaf in the pool tree, in insertion order.
        /// Defaults to this wallet's own commitments.
        #[arg(long)]
        leaves: Option<PathBuf>,
        /// Tree depth (overrides PPOOL_TREE_DEPTH).
        #[arg(long)]
        depth: Option<usize>,
        #[arg(long)]
        new_nullifier: Option<String>,
        #[arg(long)]
        new_secret: Option<String>,
        /// Write the witness here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ppool=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    dotenvy::dotenv().ok();
    let mut config = CliConfig::from_env()?;
    let args = Args::parse();
    if let Some(history) = args.history {
        config.history_path = history;
    }
    if let Some(scope) = args.scope {
        config.scope = scope;
    }
    let scope = config.scope()?;

    match args.command {
        Command::Note { depositor, amount } => {
            let depositor = parse_field("depositor", &depositor)?;
            let secrets = fresh_secrets()?;
            let scheme = CommitmentScheme::new(PoseidonOracle);
            let commitment = scheme.commit(
                scope,
                depositor,
                amount,
                None,
                secrets.nullifier,
                secrets.secret,
            )?;
            print_json(&json!({
                "scope": scope,
                "commitment": commitment,
                "nullifier": secrets.nullifier,
                "secret": secrets.secret,
            }))?;
        }

        Command::Deposit {
            depositor,
            amount,
            nullifier,
            secret,
        } => {
            let depositor = parse_field("depositor", &depositor)?;
            let secrets = secrets_or_fresh(nullifier.as_deref(), secret.as_deref())?;
            let mut wallet = load_wallet(&config.history_path)?;
            let commitment = wallet
                .deposit(scope, depositor, amount, secrets.secret, secrets.nullifier)
                .context("deposit rejected")?;
            save_wallet(&config.history_path, &wallet)?;
            info!(%scope, %commitment, amount, "deposit recorded");
            println!("{}", commitment);
        }

        Command::Withdraw {
            account,
            amount,
            nullifier,
            secret,
        } => {
            let account = Commitment(parse_field("account", &account)?);
            let secrets = secrets_or_fresh(nullifier.as_deref(), secret.as_deref())?;
            let mut wallet = load_wallet(&config.history_path)?;
            let commitment = wallet
                .withdraw(scope, account, amount, secrets.secret, secrets.nullifier)
                .context("withdrawal rejected")?;
            save_wallet(&config.history_path, &wallet)?;
            info!(%scope, %account, %commitment, amount, "withdrawal recorded");
            println!("{}", commitment);
        }

        Command::Ragequit { account, amount } => {
            let account = Commitment(parse_field("account", &account)?);
            let mut wallet = load_wallet(&config.history_path)?;
            let amount = match amount {
                Some(amount) => amount,
                None => {
                    wallet
                        .account(&scope, &account)
                        .with_context(|| format!("no account {} in scope {}", account, scope))?
                        .balance
                }
            };
            wallet
                .ragequit(scope, account, amount)
                .context("ragequit rejected")?;
            save_wallet(&config.history_path, &wallet)?;
            info!(%scope, %account, amount, "ragequit recorded");
        }

        Command::Show { json } => {
            let wallet = load_wallet(&config.history_path)?;
            if json {
                print_json(wallet.state())?;
            } else {
                for book in wallet.state().books() {
                    println!("scope {}", book.scope());
                    for account in book.accounts() {
                        let latest = account
                            .latest_commitment
                            .map(|c| c.to_string())
                            .unwrap_or_else(|| "-".to_string());
                        println!(
                            "  {}  {:<20}  balance {:>12}  withdrawals {:>3}  latest {}",
                            account.initial_commitment,
                            account.status().to_string(),
                            account.balance,
                            account.withdrawals.len(),
                            latest
                        );
                    }
                }
            }
        }

        Command::Witness {
            account,
            amount,
            recipient,
            relayer,
            fee,
            refund,
            leaves,
            depth,
            new_nullifier,
            new_secret,
            output,
        } => {
            let initial = Commitment(parse_field("account", &account)?);
            let secrets = secrets_or_fresh(new_nullifier.as_deref(), new_secret.as_deref())?;
            let request = WithdrawalRequest {
                amount,
                recipient: parse_field("recipient", &recipient)?,
                relayer: parse_field("relayer", &relayer)?,
                fee,
                refund,
                new_nullifier: secrets.nullifier,
                new_secret: secrets.secret,
            };
            let depth = depth.unwrap_or(config.tree_depth);

            let wallet = load_wallet(&config.history_path)?;
            let book = wallet
                .ledger()
                .book(&scope)
                .with_context(|| format!("scope {} has no accounts", scope))?;
            let account = book
                .account(&initial)
                .with_context(|| format!("no account {} in scope {}", initial, scope))?;
            let leaves = match leaves {
                Some(path) => load_leaves(&path)?,
                None => {
                    warn!("no leaves file given, using only this wallet's commitments");
                    book.leaves().iter().map(|c| c.as_field()).collect()
                }
            };

            let builder = WitnessBuilder::new(
                PoseidonOracle,
                LocalMerkleTree::with_depth(PoseidonOracle, depth),
                (),
            )
            .with_tree_depth(depth);
            let witness = builder
                .build(scope, account, &request, &leaves)
                .await
                .context("failed to build withdrawal witness")?;

            let json = witness.to_json()?;
            match output {
                Some(path) => {
                    fs::write(&path, json)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!(path = %path.display(), "witness written");
                }
                None => println!("{}", json),
            }
        }
    }

    Ok(())
}

fn parse_field(name: &str, raw: &str) -> Result<FieldElement> {
    FieldElement::parse_padded(raw).with_context(|| format!("invalid {}: {}", name, raw))
}

/// 31 random bytes, always below the field modulus.
fn random_field() -> Result<FieldElement> {
    let mut bytes = [0u8; 31];
    OsRng.fill_bytes(&mut bytes);
    Ok(FieldElement::from_be_slice(&bytes)?)
}

fn fresh_secrets() -> Result<NoteSecrets> {
    Ok(NoteSecrets::new(random_field()?, random_field()?))
}

fn secrets_or_fresh(nullifier: Option<&str>, secret: Option<&str>) -> Result<NoteSecrets> {
    let nullifier = match nullifier {
        Some(raw) => parse_field("nullifier", raw)?,
        None => random_field()?,
    };
    let secret = match secret {
        Some(raw) => parse_field("secret", raw)?,
        None => random_field()?,
    };
    Ok(NoteSecrets::new(nullifier, secret))
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("failed to serialize output")?
    );
    Ok(())
}
