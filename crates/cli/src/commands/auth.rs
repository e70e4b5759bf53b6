//! Account commands: sign in, register, inspect and sign out.

use std::io::BufRead;

use bazaar_storefront::models::RegisterRequest;
use bazaar_storefront::services::Credentials;
use bazaar_storefront::{AppContext, AppError};
use clap::Args;
use secrecy::SecretString;

use super::{non_blank, say};

#[derive(Args)]
pub struct LoginArgs {
    /// Username
    pub username: String,
    /// Password; read from stdin when omitted
    #[arg(short, long)]
    pub password: Option<String>,
}

#[derive(Args)]
pub struct RegisterArgs {
    /// Username
    pub username: String,
    /// Password; read from stdin when omitted
    #[arg(short, long)]
    pub password: Option<String>,
    #[arg(long)]
    pub first_name: String,
    #[arg(long)]
    pub last_name: String,
    #[arg(long)]
    pub email: Option<String>,
    #[arg(long)]
    pub age: Option<i64>,
    #[arg(long)]
    pub phone: Option<String>,
    /// `YYYY-MM-DD`
    #[arg(long)]
    pub birthday: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub gender_id: Option<u64>,
}

/// Password from the flag, or the first line of stdin.
fn password(flag: Option<String>) -> Result<String, AppError> {
    if let Some(password) = flag {
        return Ok(password);
    }
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| AppError::BadRequest(format!("cannot read password: {e}")))?;
    let line = line.trim_end_matches(['\r', '\n']).to_string();
    if line.is_empty() {
        return Err(AppError::BadRequest("password is required".to_string()));
    }
    Ok(line)
}

pub async fn login(ctx: &AppContext, args: LoginArgs) -> Result<(), AppError> {
    let credentials = Credentials::new(args.username, password(args.password)?);
    let session = ctx.account().login(&credentials).await?;
    let username = session
        .user
        .as_ref()
        .map(|u| u.username.clone())
        .unwrap_or_default();
    say(&format!("Signed in as {username}."));
    if session.has_shop() {
        say("You have a shop.");
    }
    Ok(())
}

pub async fn register(ctx: &AppContext, args: RegisterArgs) -> Result<(), AppError> {
    let request = RegisterRequest {
        username: args.username,
        password: SecretString::from(password(args.password)?),
        first_name: args.first_name,
        last_name: args.last_name,
        email: non_blank(args.email),
        age: args.age,
        phone: non_blank(args.phone),
        birthday: non_blank(args.birthday),
        address: non_blank(args.address),
        gender_id: args.gender_id,
    };
    let outcome = ctx.account().register(&request).await?;
    if outcome.signed_in() {
        say(&format!("Registered and signed in as {}.", outcome.user.username));
    } else {
        say(&format!(
            "Registered {}. Sign in with `bazaar login`.",
            outcome.user.username
        ));
    }
    Ok(())
}

pub async fn whoami(ctx: &AppContext) -> Result<(), AppError> {
    let Some(user) = ctx.account().refresh_user().await? else {
        say("Not signed in.");
        return Ok(());
    };
    let snapshot = ctx.store().snapshot();
    say(&format!("{} (member #{})", user.username, user.id));
    if let Some(seller) = user.seller_id {
        say(&format!("Seller #{seller}"));
    }
    say(if snapshot.session.has_shop() {
        "Shop: yes"
    } else {
        "Shop: no"
    });
    Ok(())
}

pub fn logout(ctx: &AppContext, wipe: bool) {
    ctx.account().logout(wipe);
    say(if wipe {
        "Signed out and local data wiped."
    } else {
        "Signed out."
    });
}
