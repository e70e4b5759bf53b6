//! Administration commands for categories, shop categories and discount
//! codes.

use std::path::PathBuf;

use bazaar_core::{CategoryId, DiscountCodeId, ShopCategoryId};
use bazaar_storefront::models::DiscountCodeForm;
use bazaar_storefront::{AppContext, AppError};
use clap::{Args, Subcommand};

use super::{money, say};

#[derive(Subcommand)]
pub enum AdminAction {
    /// Product categories
    Categories {
        #[command(subcommand)]
        action: CategoryAction,
    },
    /// Shop categories
    ShopCategories {
        #[command(subcommand)]
        action: ShopCategoryAction,
    },
    /// Discount codes
    Discounts {
        #[command(subcommand)]
        action: DiscountAction,
    },
}

#[derive(Subcommand)]
pub enum CategoryAction {
    List,
    Create { name: String },
    Rename { id: CategoryId, name: String },
    Delete { id: CategoryId },
}

#[derive(Subcommand)]
pub enum ShopCategoryAction {
    List,
    Create { name: String },
    Rename { id: ShopCategoryId, name: String },
    Delete { id: ShopCategoryId },
}

#[derive(Subcommand)]
pub enum DiscountAction {
    List,
    Create(DiscountArgs),
    Update {
        id: DiscountCodeId,
        #[command(flatten)]
        fields: DiscountArgs,
    },
    Delete { id: DiscountCodeId },
}

#[derive(Args)]
pub struct DiscountArgs {
    #[arg(long)]
    pub name: String,
    /// Discount in whole baht
    #[arg(long)]
    pub amount: i64,
    #[arg(long, default_value_t = 0)]
    pub min_order: i64,
    #[arg(long, default_value_t = 0)]
    pub usage_limit: i64,
    /// `YYYY-MM-DD` or RFC 3339
    #[arg(long)]
    pub starts_at: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339
    #[arg(long)]
    pub expires_at: Option<String>,
    #[arg(long)]
    pub image: Option<PathBuf>,
}

impl From<DiscountArgs> for DiscountCodeForm {
    fn from(args: DiscountArgs) -> Self {
        Self {
            name: args.name,
            amount: args.amount,
            min_order: args.min_order,
            usage_limit: args.usage_limit,
            starts_at: args.starts_at,
            expires_at: args.expires_at,
            image: args.image,
        }
    }
}

fn confirm(message: &str, fallback: &str) {
    say(if message.is_empty() { fallback } else { message });
}

pub async fn run(ctx: &AppContext, action: AdminAction) -> Result<(), AppError> {
    let admin = ctx.admin();
    match action {
        AdminAction::Categories { action } => match action {
            CategoryAction::List => {
                for category in admin.categories().await? {
                    say(&format!("#{:<4} {}", category.id, category.name));
                }
            }
            CategoryAction::Create { name } => {
                let category = admin.create_category(&name).await?;
                say(&format!("Created category #{}.", category.id));
            }
            CategoryAction::Rename { id, name } => {
                confirm(&admin.update_category(id, &name).await?, "Renamed.");
            }
            CategoryAction::Delete { id } => {
                confirm(&admin.delete_category(id).await?, "Deleted.");
            }
        },
        AdminAction::ShopCategories { action } => match action {
            ShopCategoryAction::List => {
                for category in admin.shop_categories().await? {
                    say(&format!("#{:<4} {}", category.id, category.category_name));
                }
            }
            ShopCategoryAction::Create { name } => {
                let category = admin.create_shop_category(&name).await?;
                say(&format!("Created shop category #{}.", category.id));
            }
            ShopCategoryAction::Rename { id, name } => {
                confirm(&admin.update_shop_category(id, &name).await?, "Renamed.");
            }
            ShopCategoryAction::Delete { id } => {
                confirm(&admin.delete_shop_category(id).await?, "Deleted.");
            }
        },
        AdminAction::Discounts { action } => match action {
            DiscountAction::List => {
                let now = chrono::Utc::now();
                for code in admin.discount_codes().await? {
                    let status = if code.is_active(now) { "active" } else { "inactive" };
                    say(&format!(
                        "#{:<4} {:<20} {:>12}  used {}/{}  {status}",
                        code.id,
                        code.name,
                        money(code.amount.into()),
                        code.times_used,
                        code.usage_limit,
                    ));
                }
            }
            DiscountAction::Create(args) => {
                let code = admin.create_discount_code(&args.into()).await?;
                say(&format!("Created discount code #{}.", code.id));
            }
            DiscountAction::Update { id, fields } => {
                let code = admin.update_discount_code(id, &fields.into()).await?;
                say(&format!("Updated discount code #{}.", code.id));
            }
            DiscountAction::Delete { id } => {
                confirm(&admin.delete_discount_code(id).await?, "Deleted.");
            }
        },
    }
    Ok(())
}
