//! Product browsing commands.

use bazaar_core::{PostId, SellerId};
use bazaar_storefront::{AppContext, AppError};
use clap::Subcommand;

use super::{money, print_json, print_listings, say};

#[derive(Subcommand)]
pub enum ProductsAction {
    /// List every listing
    List,
    /// Show one listing in full
    Show { id: PostId },
    /// List your own listings
    Mine,
    /// Show a shop and its listings
    Shop {
        /// Seller id; your own shop when omitted
        seller: Option<SellerId>,
    },
}

pub async fn run(ctx: &AppContext, action: ProductsAction) -> Result<(), AppError> {
    let catalog = ctx.catalog();
    match action {
        ProductsAction::List => print_listings(&catalog.list_all_products().await?),
        ProductsAction::Show { id } => {
            let listing = catalog.listing(id).await?;
            say(&format!("{} - {}", listing.name(), money(listing.price())));
            print_json(&listing)?;
        }
        ProductsAction::Mine => print_listings(&catalog.my_listings().await?),
        ProductsAction::Shop { seller } => {
            let (profile, listings) = match seller {
                Some(seller) => (
                    catalog.shop_profile(seller).await?,
                    catalog.shop_listings(seller).await?,
                ),
                None => {
                    let profile = catalog.my_shop_profile().await?;
                    let listings = catalog.my_listings().await?;
                    (profile, listings)
                }
            };
            say(&profile.shop_name);
            if !profile.slogan.is_empty() {
                say(&profile.slogan);
            }
            if let Some(address) = &profile.address {
                say(&address.one_line());
            }
            say("");
            print_listings(&listings);
        }
    }
    Ok(())
}
