//! Command implementations.
//!
//! Results go to stdout; diagnostics go through `tracing` on stderr.

#![allow(clippy::print_stdout, clippy::print_stderr)]

pub mod admin;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod dm;
pub mod seller;

use bazaar_storefront::models::ProductListing;
use bazaar_storefront::AppError;
use rust_decimal::Decimal;

/// Print one line of command output.
pub fn say(line: &str) {
    println!("{line}");
}

/// Print an error for the user.
pub fn fail(message: &str) {
    eprintln!("error: {message}");
}

/// Print a value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::BadRequest(format!("cannot render output: {e}")))?;
    say(&text);
    Ok(())
}

/// `฿1,250.00` style amount.
pub fn money(amount: Decimal) -> String {
    bazaar_core::Price::from_amount(amount).display()
}

/// One summary line per listing.
pub fn print_listings(listings: &[ProductListing]) {
    if listings.is_empty() {
        say("No listings.");
        return;
    }
    for listing in listings {
        let seller = listing
            .seller
            .as_ref()
            .map(|s| s.name.as_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("-");
        say(&format!(
            "#{:<6} {:<32} {:>14}  {seller}",
            listing.id,
            listing.name(),
            money(listing.price()),
        ));
    }
}

/// Treat blank strings as absent.
pub fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  ".to_string())), None);
        assert_eq!(non_blank(Some("x".to_string())), Some("x".to_string()));
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_money_uses_baht() {
        assert_eq!(money(Decimal::new(125_000, 2)), "฿1,250.00");
    }
}
