//! Cart route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use bazaar_core::ProductId;
use bazaar_core::cart::{CartSummary, Quantity, QuantityUpdate};
use rust_decimal::Decimal;
use tower_sessions::Session;
use tracing::instrument;

use super::parse_id;
use super::views::ProductCard;
use crate::error::{AppError, Result};
use crate::filters;
use crate::forms::QuantityForm;
use crate::middleware::{FlashLevel, PageContext, RequireAuth, push_flash};
use crate::services::CartService;
use crate::state::AppState;

const CART_PATH: &str = "/cart";

/// One cart line for display.
#[derive(Clone)]
pub struct CartLineView {
    pub product: ProductCard,
    pub quantity: Quantity,
    pub total_price: Decimal,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub lines: Vec<CartLineView>,
    pub summary: CartSummary,
}

/// Display the cart.
#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> Result<CartShowTemplate> {
    let contents = CartService::new(state.repo()).contents(user.id).await?;
    let summary = contents.summary();
    let lines = contents
        .items
        .iter()
        .map(|item| CartLineView {
            product: ProductCard::with_category(&item.product, None, false),
            quantity: item.quantity,
            total_price: item.total_price(),
        })
        .collect();

    Ok(CartShowTemplate {
        page,
        lines,
        summary,
    })
}

/// Add a product, merging with an existing line.
#[instrument(skip(state, user, session), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<QuantityForm>,
) -> Result<Redirect> {
    let product_id: ProductId = parse_id(&id)?;
    let quantity = form.to_add().map_err(AppError::BadRequest)?;
    let (product, total) = CartService::new(state.repo())
        .add(user.id, product_id, quantity)
        .await?;

    push_flash(
        &session,
        FlashLevel::Success,
        format!("\"{}\" added to cart ({} in cart).", product.name, total.get()),
    )
    .await?;
    Ok(Redirect::to(CART_PATH))
}

/// Set a line's quantity; zero removes it.
#[instrument(skip(state, user, session), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<QuantityForm>,
) -> Result<Redirect> {
    let product_id: ProductId = parse_id(&id)?;
    let requested = form.to_update().map_err(AppError::BadRequest)?;
    let update = QuantityUpdate::from_requested(requested);
    CartService::new(state.repo())
        .update(user.id, product_id, update)
        .await?;

    let message = match update {
        QuantityUpdate::Set(_) => "Cart updated.",
        QuantityUpdate::Remove => "Item removed from cart.",
    };
    push_flash(&session, FlashLevel::Success, message).await?;
    Ok(Redirect::to(CART_PATH))
}

/// Remove a line.
#[instrument(skip(state, user, session), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let product_id: ProductId = parse_id(&id)?;
    CartService::new(state.repo())
        .remove(user.id, product_id)
        .await?;

    push_flash(&session, FlashLevel::Info, "Item removed from cart.").await?;
    Ok(Redirect::to(CART_PATH))
}
