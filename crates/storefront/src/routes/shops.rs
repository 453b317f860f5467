//! Shop route handlers.
//!
//! Managers see and edit their own shops; admins see and edit all of them.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use bazaar_core::ShopId;
use bazaar_core::geo::{self, Coordinates};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::views::ShopView;
use super::{invalid_form, parse_id};
use crate::db::{Repository, ShopStore};
use crate::error::{AppError, Result};
use crate::filters;
use crate::forms::{FormErrors, ShopForm};
use crate::middleware::{FlashLevel, PageContext, RequireManager, push_flash};
use crate::models::{CurrentUser, Shop};
use crate::state::AppState;

const MANAGE_PATH: &str = "/shops/manage";

/// How many shops the nearest-shop search returns.
pub const NEAREST_LIMIT: usize = 10;

/// Shop list template.
#[derive(Template, WebTemplate)]
#[template(path = "shops/list.html")]
pub struct ShopListTemplate {
    pub page: PageContext,
    pub shops: Vec<ShopView>,
}

/// Nearest shops template.
#[derive(Template, WebTemplate)]
#[template(path = "shops/nearest.html")]
pub struct NearestShopsTemplate {
    pub page: PageContext,
    pub lat: String,
    pub lon: String,
    pub error: Option<String>,
    /// `None` until a location was submitted.
    pub shops: Option<Vec<ShopView>>,
}

/// Shop management template.
#[derive(Template, WebTemplate)]
#[template(path = "shops/manage.html")]
pub struct ShopManageTemplate {
    pub page: PageContext,
    pub shops: Vec<ShopView>,
    pub show_all: bool,
}

/// Shop create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "shops/form.html")]
pub struct ShopFormTemplate {
    pub page: PageContext,
    pub title: String,
    pub action: String,
    pub form: ShopForm,
    pub errors: FormErrors,
}

/// Query of the nearest-shop search.
#[derive(Debug, Default, Deserialize)]
pub struct NearestQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

impl NearestQuery {
    /// `None` when no location was given at all.
    fn origin(&self) -> Option<std::result::Result<Coordinates, String>> {
        let lat = self.lat.as_deref().map(str::trim).unwrap_or_default();
        let lon = self.lon.as_deref().map(str::trim).unwrap_or_default();
        if lat.is_empty() && lon.is_empty() {
            return None;
        }
        let parse = |v: &str| v.replace(',', ".").parse::<f64>().ok();
        Some(match (parse(lat), parse(lon)) {
            (Some(lat), Some(lon)) => Coordinates::new(lat, lon).map_err(|e| e.to_string()),
            _ => Err("Enter numeric latitude and longitude.".to_owned()),
        })
    }
}

/// Display every shop.
#[instrument(skip(state, page))]
pub async fn index(State(state): State<AppState>, page: PageContext) -> Result<ShopListTemplate> {
    let shops = state.repo().list_shops().await?;
    let shops = shops
        .iter()
        .map(|shop| ShopView::new(shop).editable(can_edit(page.user.as_ref(), shop)))
        .collect();
    Ok(ShopListTemplate { page, shops })
}

/// Shops nearest to `lat`/`lon`, closest first.
#[instrument(skip(state, page))]
pub async fn nearest(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<NearestQuery>,
) -> Result<NearestShopsTemplate> {
    let (error, shops) = match query.origin() {
        None => (None, None),
        Some(Err(error)) => (Some(error), None),
        Some(Ok(origin)) => {
            let all = state.repo().list_shops().await?;
            let ranked = geo::nearest(
                all.iter().map(|shop| (shop, shop.coordinates())),
                &origin,
                NEAREST_LIMIT,
            );
            let views = ranked
                .into_iter()
                .map(|(shop, km)| ShopView::new(shop).with_distance(km))
                .collect();
            (None, Some(views))
        }
    };

    Ok(NearestShopsTemplate {
        page,
        lat: query.lat.clone().unwrap_or_default(),
        lon: query.lon.clone().unwrap_or_default(),
        error,
        shops,
    })
}

/// The manager's own shops; admins see every shop.
#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn manage(
    State(state): State<AppState>,
    RequireManager(user): RequireManager,
    page: PageContext,
) -> Result<ShopManageTemplate> {
    let show_all = user.is_admin();
    let shops = if show_all {
        state.repo().list_shops().await?
    } else {
        state.repo().list_shops_by_owner(user.id).await?
    };
    Ok(ShopManageTemplate {
        page,
        shops: shops
            .iter()
            .map(|shop| ShopView::new(shop).editable(true))
            .collect(),
        show_all,
    })
}

#[instrument(skip(_manager, page))]
pub async fn add_page(
    RequireManager(_manager): RequireManager,
    page: PageContext,
) -> ShopFormTemplate {
    ShopFormTemplate::new(page, None, ShopForm::default(), FormErrors::default())
}

#[instrument(skip(state, user, session), fields(user_id = %user.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireManager(user): RequireManager,
    session: Session,
    Form(form): Form<ShopForm>,
) -> Result<Response> {
    let input = match form.clone().into_input() {
        Ok(input) => input,
        Err(errors) => {
            let page = PageContext::load(&session).await;
            return Ok(invalid_form(ShopFormTemplate::new(page, None, form, errors)));
        }
    };

    let shop = state.repo().create_shop(user.id, input).await?;
    tracing::info!(shop_id = %shop.id, "Shop created");
    push_flash(
        &session,
        FlashLevel::Success,
        format!("Shop \"{}\" created.", shop.name),
    )
    .await?;
    Ok(Redirect::to(MANAGE_PATH).into_response())
}

#[instrument(skip(state, user, page), fields(user_id = %user.id))]
pub async fn edit_page(
    State(state): State<AppState>,
    RequireManager(user): RequireManager,
    page: PageContext,
    Path(id): Path<String>,
) -> Result<ShopFormTemplate> {
    let shop = load_owned_shop(state.repo(), &user, &id).await?;
    let form = ShopForm {
        name: shop.name.clone(),
        address: shop.address.clone(),
        phone: shop.phone.clone(),
        opening_hours: shop.opening_hours.clone(),
        latitude: shop.latitude.map(|v| v.to_string()).unwrap_or_default(),
        longitude: shop.longitude.map(|v| v.to_string()).unwrap_or_default(),
    };
    Ok(ShopFormTemplate::new(page, Some(&shop), form, FormErrors::default()))
}

#[instrument(skip(state, user, session), fields(user_id = %user.id))]
pub async fn edit(
    State(state): State<AppState>,
    RequireManager(user): RequireManager,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<ShopForm>,
) -> Result<Response> {
    let shop = load_owned_shop(state.repo(), &user, &id).await?;
    let input = match form.clone().into_input() {
        Ok(input) => input,
        Err(errors) => {
            let page = PageContext::load(&session).await;
            return Ok(invalid_form(ShopFormTemplate::new(
                page,
                Some(&shop),
                form,
                errors,
            )));
        }
    };

    let shop = state.repo().update_shop(shop.id, input).await?;
    tracing::info!(shop_id = %shop.id, "Shop updated");
    push_flash(
        &session,
        FlashLevel::Success,
        format!("Shop \"{}\" updated.", shop.name),
    )
    .await?;
    Ok(Redirect::to(MANAGE_PATH).into_response())
}

#[instrument(skip(state, user, session), fields(user_id = %user.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireManager(user): RequireManager,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let shop = load_owned_shop(state.repo(), &user, &id).await?;
    if !state.repo().delete_shop(shop.id).await? {
        return Err(AppError::NotFound(format!("shop {}", shop.id)));
    }

    tracing::info!(shop_id = %shop.id, "Shop deleted");
    push_flash(
        &session,
        FlashLevel::Success,
        format!("Shop \"{}\" deleted.", shop.name),
    )
    .await?;
    Ok(Redirect::to(MANAGE_PATH))
}

impl ShopFormTemplate {
    fn new(page: PageContext, shop: Option<&Shop>, form: ShopForm, errors: FormErrors) -> Self {
        let (title, action) = match shop {
            Some(s) => (format!("Edit {}", s.name), format!("/shops/edit/{}", s.id)),
            None => ("Add shop".to_owned(), "/shops/add".to_owned()),
        };
        Self {
            page,
            title,
            action,
            form,
            errors,
        }
    }
}

/// Owners edit their own shops; admins edit any.
fn can_edit(user: Option<&CurrentUser>, shop: &Shop) -> bool {
    user.is_some_and(|u| u.is_admin() || (u.can_manage() && u.id == shop.owner_id))
}

/// Load a shop the user may edit: 404 when missing, 403 when foreign.
async fn load_owned_shop(repo: &dyn Repository, user: &CurrentUser, raw_id: &str) -> Result<Shop> {
    let id: ShopId = parse_id(raw_id)?;
    let shop = repo
        .get_shop(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("shop {id}")))?;
    if !can_edit(Some(user), &shop) {
        tracing::warn!(user_id = %user.id, shop_id = %id, "Shop belongs to another owner");
        return Err(AppError::Forbidden(format!("shop {id} belongs to another owner")));
    }
    Ok(shop)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{UserId, UserRole, Username};
    use chrono::Utc;

    use super::*;

    fn user(id: i32, role: UserRole) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            username: Username::parse("someone").unwrap(),
            role,
        }
    }

    fn shop(owner: i32) -> Shop {
        Shop {
            id: ShopId::new(1),
            name: "Corner".to_owned(),
            address: "Main st 1".to_owned(),
            phone: String::new(),
            opening_hours: String::new(),
            latitude: None,
            longitude: None,
            owner_id: UserId::new(owner),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_can_edit_owner_or_admin() {
        let shop = shop(7);
        assert!(can_edit(Some(&user(7, UserRole::Manager)), &shop));
        assert!(!can_edit(Some(&user(8, UserRole::Manager)), &shop));
        assert!(can_edit(Some(&user(8, UserRole::Admin)), &shop));
        assert!(!can_edit(Some(&user(7, UserRole::User)), &shop));
        assert!(!can_edit(None, &shop));
    }

    #[test]
    fn test_nearest_query_origin() {
        assert!(NearestQuery::default().origin().is_none());

        let query = NearestQuery {
            lat: Some("55,75".to_owned()),
            lon: Some("37.61".to_owned()),
        };
        let origin = query.origin().unwrap().unwrap();
        assert!((origin.latitude() - 55.75).abs() < 1e-9);

        let query = NearestQuery {
            lat: Some("north".to_owned()),
            lon: Some("1".to_owned()),
        };
        assert!(query.origin().unwrap().is_err());

        let query = NearestQuery {
            lat: Some("95".to_owned()),
            lon: Some("1".to_owned()),
        };
        assert!(query.origin().unwrap().is_err());
    }
}
