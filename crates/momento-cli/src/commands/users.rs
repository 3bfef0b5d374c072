//! User management commands

use anyhow::{bail, Context, Result};
use momento_core::{AuthConfig, Database};
use momento_server::auth::issue_access_token;

/// Nickname used when none is given: the local part of the email
fn default_nickname(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

pub fn cmd_users_list(db: &Database) -> Result<()> {
    let users = db.list_users().context("Failed to list users")?;

    if users.is_empty() {
        println!("No users yet. Create one with: momento users add you@example.com");
        return Ok(());
    }

    println!();
    println!("👤 Users");
    println!("   ─────────────────────────────────────────────────────────────");
    for user in &users {
        println!(
            "   #{:<4} {:<32} {:<16} {}",
            user.id,
            user.email,
            user.nickname,
            user.created_at.format("%Y-%m-%d")
        );
    }
    println!();
    println!("   Total: {}", users.len());

    Ok(())
}

pub fn cmd_users_add(
    db: &Database,
    auth: &AuthConfig,
    email: &str,
    nickname: Option<&str>,
) -> Result<()> {
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        bail!("Invalid email address: {}", email);
    }
    let nickname = nickname.unwrap_or_else(|| default_nickname(email));

    let user = db
        .create_user(email, nickname)
        .with_context(|| format!("Failed to create user {}", email))?;
    let token = issue_access_token(auth, user.id)?;

    println!("✅ Created user #{} ({})", user.id, user.email);
    println!();
    println!("Access token (valid {} minutes):", auth.access_token_minutes);
    println!("{}", token);

    Ok(())
}

pub fn cmd_users_token(db: &Database, auth: &AuthConfig, email: &str) -> Result<()> {
    let Some(user) = db.get_user_by_email(email.trim())? else {
        bail!("No user with email {}", email);
    };
    let token = issue_access_token(auth, user.id)?;

    println!("Access token for #{} (valid {} minutes):", user.id, auth.access_token_minutes);
    println!("{}", token);

    Ok(())
}
