//! Status command implementation

use std::path::Path;

use anyhow::Result;
use momento_core::db::DB_KEY_ENV;
use momento_core::models::StatusSummary;

use super::open_db;

pub fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!();
    println!("📊 Momento Status");
    println!("   ─────────────────────────────────────────────────────────────");

    // Database path
    println!("   Database: {}", db_path.display());

    // Check if database file exists and get size
    if db_path.exists() {
        if let Ok(metadata) = std::fs::metadata(db_path) {
            let size_kb = metadata.len() as f64 / 1024.0;
            if size_kb < 1024.0 {
                println!("   Size: {:.1} KB", size_kb);
            } else {
                println!("   Size: {:.1} MB", size_kb / 1024.0);
            }
        }
    } else {
        println!("   Size: (database not initialized)");
        return Ok(());
    }

    // Check encryption status
    let has_key = std::env::var(DB_KEY_ENV).is_ok();
    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else if has_key {
        println!("   🔒 Encryption: ENABLED ({}=***)", DB_KEY_ENV);
    } else {
        println!("   ❌ Encryption: REQUIRED but {} not set", DB_KEY_ENV);
    }

    match open_db(db_path, no_encrypt) {
        Ok(db) => {
            let users = db.list_users()?.len();
            let summary = db.status_summary()?;
            println!();
            println!("   Users: {}", users);
            print_summary(&summary);
        }
        Err(e) => {
            println!();
            println!("   ❌ Error opening database: {}", e);
            if !no_encrypt && !has_key {
                println!("      Set {} or use --no-encrypt", DB_KEY_ENV);
            }
        }
    }

    Ok(())
}

fn print_summary(summary: &StatusSummary) {
    println!("   Diaries: {}", summary.total());
    println!("      ⏳ Queued:     {}", summary.queued);
    println!("      🔍 Analyzing:  {}", summary.analyzing);
    println!("      🎨 Generating: {}", summary.generating);
    println!("      ✅ Completed:  {}", summary.completed);
    println!("      ❌ Failed:     {}", summary.failed);
    if summary.failed > 0 {
        println!();
        println!("   Re-process a failed diary with: momento process <id>");
    }
}
