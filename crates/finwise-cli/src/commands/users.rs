//! User management command implementations

use anyhow::{bail, Result};
use rust_decimal::Decimal;

use finwise_core::db::Database;
use finwise_core::models::{NewUser, Role};
use finwise_server::auth::hash_password;

pub fn cmd_create_user(
    db: &Database,
    username: &str,
    email: &str,
    password: &str,
    phone: Option<&str>,
    income: Option<Decimal>,
    admin: bool,
) -> Result<()> {
    if username.trim().is_empty() {
        bail!("Username is required");
    }
    if !email.contains('@') {
        bail!("A valid email is required");
    }
    if password.len() < 8 {
        bail!("Password must be at least 8 characters");
    }

    let role = if admin { Role::Admin } else { Role::User };
    let password_hash = hash_password(password).map_err(anyhow::Error::msg)?;

    let user = db.create_user(&NewUser {
        username: username.trim().to_string(),
        email: email.trim().to_string(),
        password_hash,
        phone: phone.map(str::to_string),
        income: income.unwrap_or(Decimal::ZERO),
        role,
    })?;

    println!("✅ Created user '{}' (id {})", user.username, user.id);
    if admin {
        println!("   Role: admin");
    }
    Ok(())
}
