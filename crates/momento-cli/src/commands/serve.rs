//! Server command implementation

use std::path::Path;

use anyhow::{Context, Result};

use super::{load_config, open_db};

pub async fn cmd_serve(
    db_path: &Path,
    host: &str,
    port: u16,
    no_encrypt: bool,
    static_dir: Option<&Path>,
) -> Result<()> {
    let config = load_config()?;
    // Fail before printing the banner if tokens cannot be verified
    config.require_auth()?;

    println!("🚀 Starting Momento web server...");
    println!("   Database: {}", db_path.display());
    println!("   Listening: http://{}:{}", host, port);
    if let Some(dir) = static_dir {
        println!("   Static files: {}", dir.display());
    }
    println!("   🔄 Pipeline: {}", config.pipeline);
    if config.use_mock_ai {
        println!("   🧪 AI backends: MOCK (AI_BACKEND=mock)");
    } else {
        match config.analysis_server {
            Some(ref server) => println!("   🎨 Analysis server: {}", server.base_url),
            None => println!("   💡 Tip: Set MOMENTO_AI_SERVER_URL for emotion and image analysis"),
        }
        match config.completion {
            Some(ref completion) => println!(
                "   🤖 Completion API: {} ({})",
                completion.base_url, completion.model
            ),
            None => println!("   💡 Tip: Set OPENAI_COMPATIBLE_API_KEY for tags and comments"),
        }
    }
    if !config.allowed_origins.is_empty() {
        println!(
            "   🌐 Allowed origins: {} (MOMENTO_ALLOWED_ORIGINS)",
            config.allowed_origins.join(", ")
        );
    }
    if no_encrypt {
        println!("   ⚠️  Encryption DISABLED (--no-encrypt)");
    }
    println!();
    println!("   Press Ctrl+C to stop");

    let db = open_db(db_path, no_encrypt)?;

    let static_dir_str = static_dir
        .map(|p| p.to_str().context("static_dir path must be valid UTF-8"))
        .transpose()?;
    momento_server::serve_with_config(db, host, port, static_dir_str, &config).await?;

    Ok(())
}
