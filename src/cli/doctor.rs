use std::path::Path;

use roster_core::{SqliteStore, Store};

use crate::app::AppConfig;

pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    println!("🏥 Roster Doctor\n");

    print_config(&config)?;

    let mut all_ok = true;
    all_ok &= check_env_file();
    all_ok &= check_config(&config);
    all_ok &= check_database(&config).await;

    println!();
    if all_ok {
        println!("✅ All checks passed! Ready to run Roster.");
    } else {
        println!("⚠️  Some checks failed. Please fix the issues above.");
        std::process::exit(1);
    }

    Ok(())
}

fn print_config(config: &AppConfig) -> anyhow::Result<()> {
    println!("Resolved configuration:");
    println!("{}\n", serde_json::to_string_pretty(&config.masked())?);
    Ok(())
}

fn check_env_file() -> bool {
    print!("Checking .env file... ");

    if Path::new(".env").exists() {
        println!("✅ Found");
    } else {
        println!("ℹ️  Not found (settings come from config/ and the environment)");
    }
    true
}

fn check_config(config: &AppConfig) -> bool {
    print!("Checking configuration... ");

    match config.validate() {
        Ok(()) => {
            println!("✅ Valid");
            if config.auth.jwt_secret.len() < 32 {
                println!("  ⚠️  auth.jwt_secret is shorter than 32 bytes");
            }
            true
        }
        Err(e) => {
            println!("❌ {}", e);
            false
        }
    }
}

async fn check_database(config: &AppConfig) -> bool {
    print!("Checking database... ");

    let path = Path::new(&config.database.path);
    let existed = path.exists();

    let store = match SqliteStore::open_with(
        path,
        config.database.max_connections.max(1),
        config.database.busy_timeout(),
    )
    .await
    {
        Ok(store) => store,
        Err(e) => {
            println!("❌ Cannot open {}: {}", path.display(), e);
            return false;
        }
    };

    match store.health_check().await {
        Ok(()) => {
            println!("✅ {}", path.display());
            if !existed {
                println!("  ℹ️  Database created with a fresh schema");
            }
            true
        }
        Err(e) => {
            println!("❌ Health check failed: {}", e);
            false
        }
    }
}
