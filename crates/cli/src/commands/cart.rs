//! Local cart commands.

use bazaar_core::PostId;
use bazaar_storefront::store::cart::ProductRef;
use bazaar_storefront::{AppContext, AppError};
use clap::Subcommand;

use super::{money, say};

#[derive(Subcommand)]
pub enum CartAction {
    /// Add a listing to the cart
    Add { id: PostId },
    /// Show the cart
    List,
    /// Set the quantity of a line (minimum 1)
    Qty {
        id: PostId,
        #[arg(allow_hyphen_values = true)]
        count: i64,
    },
    /// Remove a listing from the cart
    Rm { id: PostId },
    /// Show the cart total
    Total,
}

pub async fn run(ctx: &AppContext, action: CartAction) -> Result<(), AppError> {
    let store = ctx.store();
    match action {
        CartAction::Add { id } => {
            let listing = ctx.catalog().listing(id).await?;
            let product = ProductRef::try_from(&listing)?;
            store.add_to_cart(product);
            say(&format!(
                "Added {}. Cart has {} line(s).",
                listing.name(),
                store.cart_count()
            ));
        }
        CartAction::List => {
            let snapshot = store.snapshot();
            if snapshot.carts.is_empty() {
                say("Cart is empty.");
            }
            for line in &snapshot.carts {
                say(&format!(
                    "#{:<6} {:<32} {:>4} x {:>12} = {:>14}",
                    line.key(),
                    line.product.name().unwrap_or_default(),
                    line.count,
                    money(line.product.price()),
                    money(line.subtotal()),
                ));
            }
        }
        CartAction::Qty { id, count } => {
            if store.line(id).is_none() {
                return Err(AppError::NotFound(format!("listing {id} is not in the cart")));
            }
            store.update_quantity(id, count);
        }
        CartAction::Rm { id } => store.remove_product(id),
        CartAction::Total => say(&store.total_display()),
    }
    Ok(())
}
