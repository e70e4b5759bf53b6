//! Seller commands: open and edit a shop, manage listings.

use std::path::PathBuf;

use bazaar_core::{CategoryId, PostId, SellerId, ShopCategoryId};
use bazaar_storefront::models::{
    NewProduct, NewSellerShop, ProductUpdate, ShopAddress, ShopAddressInput, ShopProfileUpdate,
};
use bazaar_storefront::{AppContext, AppError};
use clap::{Args, Subcommand};

use super::{non_blank, print_json, say};

#[derive(Subcommand)]
pub enum ShopAction {
    /// Register as a seller and open a shop
    Create(CreateShopArgs),
    /// Edit your shop profile
    Update(UpdateShopArgs),
    /// Upload a logo and print its path
    UploadLogo { file: PathBuf },
    /// Upload images, create a product and list it
    Post(PostArgs),
    /// Edit a listing
    UpdatePost(UpdatePostArgs),
    /// Delete a listing
    DeletePost { id: PostId },
    /// Upload product images and print their paths
    UploadImages {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Args)]
pub struct CreateShopArgs {
    #[arg(long)]
    pub seller_name: String,
    #[arg(long)]
    pub seller_address: String,
    #[arg(long)]
    pub shop_name: String,
    #[arg(long, default_value = "")]
    pub slogan: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Shop category id
    #[arg(long)]
    pub category: ShopCategoryId,
    /// Logo image to upload first
    #[arg(long)]
    pub logo: Option<PathBuf>,
    #[arg(long, default_value = "")]
    pub address: String,
    #[arg(long, default_value = "")]
    pub sub_district: String,
    #[arg(long, default_value = "")]
    pub district: String,
    #[arg(long, default_value = "")]
    pub province: String,
}

#[derive(Args)]
pub struct UpdateShopArgs {
    #[arg(long)]
    pub shop_name: Option<String>,
    #[arg(long)]
    pub slogan: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub category: Option<ShopCategoryId>,
    /// New logo image to upload
    #[arg(long)]
    pub logo: Option<PathBuf>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub sub_district: Option<String>,
    #[arg(long)]
    pub district: Option<String>,
    #[arg(long)]
    pub province: Option<String>,
}

#[derive(Args)]
pub struct PostArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long, default_value = "")]
    pub description: String,
    /// Whole baht
    #[arg(long)]
    pub price: i64,
    #[arg(long, default_value_t = 1)]
    pub quantity: i64,
    #[arg(long)]
    pub category: CategoryId,
    /// Product images; at least one
    #[arg(long = "image", required = true)]
    pub images: Vec<PathBuf>,
}

#[derive(Args)]
pub struct UpdatePostArgs {
    pub id: PostId,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub price: Option<i64>,
    #[arg(long)]
    pub quantity: Option<i64>,
    #[arg(long)]
    pub category: Option<CategoryId>,
    /// Replacement images
    #[arg(long = "image")]
    pub images: Vec<PathBuf>,
}

/// Seller id of the signed-in member, asking the backend when the session
/// does not carry one.
async fn my_seller_id(ctx: &AppContext) -> Result<SellerId, AppError> {
    let cached = ctx
        .store()
        .snapshot()
        .session
        .user
        .as_ref()
        .and_then(|u| u.seller_id);
    if let Some(id) = cached {
        return Ok(id);
    }
    let refreshed = ctx.account().refresh_user().await?;
    if let Some(id) = refreshed.and_then(|u| u.seller_id) {
        return Ok(id);
    }
    ctx.catalog()
        .my_shop_profile()
        .await?
        .seller_id
        .ok_or_else(|| AppError::NotFound("you do not have a shop yet".to_string()))
}

pub async fn run(ctx: &AppContext, action: ShopAction) -> Result<(), AppError> {
    let seller = ctx.seller();
    match action {
        ShopAction::Create(args) => {
            let logo_path = match &args.logo {
                Some(file) => seller.upload_logo(file).await?,
                None => String::new(),
            };
            let shop = NewSellerShop {
                seller_name: args.seller_name,
                seller_address: args.seller_address,
                shop_name: args.shop_name,
                slogan: args.slogan,
                shop_description: args.description,
                category_id: args.category,
                logo_path,
                address: ShopAddress {
                    address: args.address,
                    sub_district: args.sub_district,
                    district: args.district,
                    province: args.province,
                },
            };
            let created = seller.create_seller_shop(&shop).await?;
            // The shop flag lives on the member record.
            ctx.account().refresh_user().await?;
            say(&format!(
                "Opened {} (seller #{}).",
                created.shop.shop_name, created.seller.id
            ));
        }
        ShopAction::Update(args) => {
            let mut update = ShopProfileUpdate::new(my_seller_id(ctx).await?);
            update.shop_name = non_blank(args.shop_name);
            update.slogan = args.slogan;
            update.shop_description = args.description;
            update.category_id = args.category;
            if let Some(file) = &args.logo {
                update.logo_path = Some(seller.upload_logo(file).await?);
            }
            let address = ShopAddressInput {
                address: args.address,
                sub_district: args.sub_district,
                district: args.district,
                province: args.province,
            };
            if address != ShopAddressInput::default() {
                update.address = Some(address);
            }
            let profile = seller.update_shop_profile(&update).await?;
            say(&format!("Updated {}.", profile.shop_name));
        }
        ShopAction::UploadLogo { file } => say(&seller.upload_logo(&file).await?),
        ShopAction::Post(args) => {
            let seller_id = my_seller_id(ctx).await?;
            let images = seller.upload_product_images(&args.images).await?;
            let product = NewProduct {
                name: args.name,
                description: args.description,
                price: args.price,
                quantity: args.quantity,
                category_id: args.category,
                seller_id,
                images,
            };
            let created = seller.create_product(&product).await?;
            say(&format!(
                "Listed {} as #{}.",
                created.product.name, created.post.id
            ));
        }
        ShopAction::UpdatePost(args) => {
            let images = if args.images.is_empty() {
                None
            } else {
                Some(seller.upload_product_images(&args.images).await?)
            };
            let update = ProductUpdate {
                name: non_blank(args.name),
                description: args.description,
                price: args.price,
                quantity: args.quantity,
                category_id: args.category,
                images,
            };
            let listing = seller.update_product(args.id, &update).await?;
            print_json(&listing)?;
        }
        ShopAction::DeletePost { id } => {
            let message = seller.delete_listing(id).await?;
            say(if message.is_empty() { "Deleted." } else { &message });
        }
        ShopAction::UploadImages { files } => {
            for url in seller.upload_product_images(&files).await? {
                say(&url);
            }
        }
    }
    Ok(())
}
