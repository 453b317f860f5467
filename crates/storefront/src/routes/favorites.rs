//! Favorites route handlers.

use std::collections::BTreeSet;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Json,
    extract::{Path, State},
    response::Redirect,
};
use bazaar_core::ProductId;
use tower_sessions::Session;
use tracing::instrument;

use super::parse_id;
use super::views::ProductCard;
use crate::db::FavoriteStore;
use crate::error::Result;
use crate::filters;
use crate::middleware::{FlashLevel, PageContext, RequireAuth, push_flash};
use crate::services::{CatalogService, FavoriteService, FavoriteState};
use crate::state::AppState;

const FAVORITES_PATH: &str = "/favorites";

/// Favorites page template.
#[derive(Template, WebTemplate)]
#[template(path = "favorites/list.html")]
pub struct FavoriteListTemplate {
    pub page: PageContext,
    pub products: Vec<ProductCard>,
}

/// Display the user's favorites, newest first.
#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    page: PageContext,
) -> Result<FavoriteListTemplate> {
    let index = CatalogService::new(state.repo()).category_index().await?;
    let entries = state.repo().list_favorites(user.id).await?;
    let ids: BTreeSet<ProductId> = entries.iter().map(|e| e.product.id).collect();

    Ok(FavoriteListTemplate {
        page,
        products: entries
            .iter()
            .map(|e| ProductCard::new(&e.product, &index, &ids))
            .collect(),
    })
}

#[instrument(skip(state, user, session), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let product_id: ProductId = parse_id(&id)?;
    let added = FavoriteService::new(state.repo())
        .add(user.id, product_id)
        .await?;

    let (level, message) = if added {
        (FlashLevel::Success, "Added to favorites.")
    } else {
        (FlashLevel::Info, "Already in favorites.")
    };
    push_flash(&session, level, message).await?;
    Ok(Redirect::to(FAVORITES_PATH))
}

/// Remove a favorite; 404 when the product is not one.
#[instrument(skip(state, user, session), fields(user_id = %user.id))]
pub async fn remove(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let product_id: ProductId = parse_id(&id)?;
    FavoriteService::new(state.repo())
        .remove(user.id, product_id)
        .await?;

    push_flash(&session, FlashLevel::Info, "Removed from favorites.").await?;
    Ok(Redirect::to(FAVORITES_PATH))
}

/// Flip the favorite flag. Answers `{"is_favorite": bool, "count": n}`.
#[instrument(skip(state, user), fields(user_id = %user.id))]
pub async fn toggle(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<FavoriteState>> {
    let product_id: ProductId = parse_id(&id)?;
    let favorite = FavoriteService::new(state.repo())
        .toggle(user.id, product_id)
        .await?;
    Ok(Json(favorite))
}
