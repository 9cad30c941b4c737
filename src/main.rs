//! Photolock - CLI
//!
//! Command-line interface for PIN setup, verification and duress management.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rand::RngCore;

use photolock::{
    JsonFileStore, KeyValueStore, MemoryPurge, PhotoLock, SecurityLevel, SoftKeystore,
};

#[derive(Parser)]
#[command(name = "photolock")]
#[command(version = photolock::VERSION)]
#[command(about = "Photolock - PIN authentication and duress core for photo vaults")]
struct Cli {
    /// Vault directory
    #[arg(short, long, default_value = "./vault")]
    vault: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set the primary PIN
    Setup {
        /// PIN code
        #[arg(short, long)]
        pin: String,
    },

    /// Verify a PIN and open a session
    Verify {
        /// PIN code
        #[arg(short, long)]
        pin: String,
    },

    /// Configure the duress (poison pill) PIN
    SetDuress {
        /// Duress PIN code
        #[arg(short, long)]
        pin: String,
    },

    /// Remove the duress PIN
    RemoveDuress,

    /// Mark a photo id as a decoy
    MarkDecoy {
        /// Photo ID
        id: String,
    },

    /// Show lock status
    Status,

    /// Full security reset (destroys all key material)
    Reset,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn open_lock(vault: &PathBuf) -> anyhow::Result<PhotoLock> {
    let store = Arc::new(JsonFileStore::open(vault.join("store.json"))?);

    // Device identity: random, generated on first run.
    let device_id = match store.get_string("device.id") {
        Some(id) => id.into_bytes(),
        None => {
            let mut raw = [0u8; 16];
            rand::thread_rng().fill_bytes(&mut raw);
            let id = hex::encode(raw);
            store.set_string("device.id", &id)?;
            id.into_bytes()
        }
    };

    // The CLI has no platform keystore; run in the software tier.
    Ok(PhotoLock::new(
        store,
        Arc::new(SoftKeystore::new(SecurityLevel::Software)),
        &vault.join("keys"),
        device_id,
        Arc::new(MemoryPurge::new()),
    ))
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let lock = open_lock(&cli.vault)?;

    match cli.command {
        Commands::Setup { pin } => {
            let config = lock.set_pin(&pin)?;
            println!("🔐 Primary PIN set ({:?} scheme)", config);
            println!("📁 Vault at: {}", cli.vault.display());
        }

        Commands::Verify { pin } => {
            if lock.verify_pin(&pin)? {
                println!("✅ PIN accepted, session open");
            } else {
                let backoff = lock.calculate_remaining_backoff_seconds();
                println!("❌ PIN rejected ({} failed attempt(s))", lock.failed_attempts());
                if backoff > 0 {
                    println!("⏳ Locked out for {}s", backoff);
                }
            }
        }

        Commands::SetDuress { pin } => {
            lock.set_poison_pill_pin(&pin)?;
            println!("💊 Duress PIN armed");
        }

        Commands::RemoveDuress => {
            lock.remove_poison_pill_pin()?;
            println!("💊 Duress PIN removed");
        }

        Commands::MarkDecoy { id } => {
            lock.decoys().mark(&id)?;
            println!("🎭 Decoy marked ({}/10 slots used)", lock.decoys().count());
        }

        Commands::Status => {
            println!("🔎 Photolock status");
            println!("   Security tier:   {:?}", lock.detect_security_level());
            println!("   PIN length:      {:?}", lock.pin_size_range());
            println!("   Duress armed:    {}", lock.has_poison_pill_pin());
            println!("   Decoys:          {}", lock.decoys().count());
            println!("   Failed attempts: {}", lock.failed_attempts());
            let backoff = lock.calculate_remaining_backoff_seconds();
            if backoff > 0 {
                println!("   Locked out for:  {}s", backoff);
            }
        }

        Commands::Reset => {
            lock.security_failure_reset()?;
            println!("🧨 Full security reset complete");
        }
    }

    Ok(())
}
