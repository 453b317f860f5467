//! Catalog and product management route handlers.

use std::collections::BTreeSet;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::catalog::{CategoryIndex, Pagination};
use bazaar_core::{CategoryId, ProductId, ShopId};

use super::views::{
    ProductCard, SelectOption, category_options, shop_options, sort_options,
};
use super::{invalid_form, parse_id};
use crate::db::{CategoryStore, FavoriteStore, ProductStore, Repository, ShopStore};
use crate::error::{AppError, Result};
use crate::filters;
use crate::forms::{FormErrors, ProductForm};
use crate::middleware::{FlashLevel, PageContext, RequireManager, push_flash};
use crate::models::{Category, Product, Shop};
use crate::services::media::media_url;
use crate::services::{CatalogService, ImageKind, ListingQuery, MediaStorage};
use crate::state::AppState;

const MANAGE_PATH: &str = "/manage";

/// Product list page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/list.html")]
pub struct ProductListTemplate {
    pub page: PageContext,
    pub products: Vec<ProductCard>,
    pub pagination: Pagination,
    /// Current filters as a query string ending in `&`, for page links.
    pub page_query: String,
    pub q: String,
    pub min_price: String,
    pub max_price: String,
    pub sort_options: Vec<SelectOption>,
    pub category_options: Vec<SelectOption>,
    pub shop_options: Vec<SelectOption>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/detail.html")]
pub struct ProductDetailTemplate {
    pub page: PageContext,
    pub product: ProductCard,
    pub gallery: Vec<String>,
    /// `name - address` of every shop selling the product.
    pub shops: Vec<String>,
}

/// Product management table template.
#[derive(Template, WebTemplate)]
#[template(path = "products/manage.html")]
pub struct ProductManageTemplate {
    pub page: PageContext,
    pub products: Vec<ProductCard>,
    pub pagination: Pagination,
    pub page_query: String,
}

/// Product create/edit form template.
#[derive(Template, WebTemplate)]
#[template(path = "products/form.html")]
pub struct ProductFormTemplate {
    pub page: PageContext,
    pub title: String,
    pub action: String,
    pub form: ProductForm,
    pub errors: FormErrors,
    pub category_options: Vec<SelectOption>,
    pub shop_options: Vec<SelectOption>,
    pub current_image: Option<String>,
    pub gallery: Vec<String>,
}

/// Display the product list.
#[instrument(skip(state, page))]
pub async fn index(
    State(state): State<AppState>,
    page: PageContext,
    Query(query): Query<ListingQuery>,
) -> Result<ProductListTemplate> {
    let repo = state.repo();
    let catalog = CatalogService::new(repo);
    let index = catalog.category_index().await?;
    let listing = catalog.list(&query, &index, false).await?;

    let favorites = match &page.user {
        Some(user) => repo.favorite_product_ids(user.id).await?,
        None => BTreeSet::new(),
    };
    let shops = repo.list_shops().await?;

    let selected_category: Vec<CategoryId> = query.category_id().into_iter().collect();
    let selected_shop: Vec<ShopId> = query.shop_id().into_iter().collect();

    Ok(ProductListTemplate {
        products: listing
            .products
            .iter()
            .map(|p| ProductCard::new(p, &index, &favorites))
            .collect(),
        pagination: listing.pagination,
        page_query: query_without_page(&query),
        q: query.q.clone().unwrap_or_default(),
        min_price: query.min_price.clone().unwrap_or_default(),
        max_price: query.max_price.clone().unwrap_or_default(),
        sort_options: sort_options(listing.sort),
        category_options: category_options(&index, &selected_category),
        shop_options: shop_options(&shops, &selected_shop),
        page,
    })
}

/// Display one product.
#[instrument(skip(state, page))]
pub async fn show(
    State(state): State<AppState>,
    page: PageContext,
    Path(id): Path<String>,
) -> Result<ProductDetailTemplate> {
    let id: ProductId = parse_id(&id)?;
    let detail = CatalogService::new(state.repo())
        .detail(id, page.can_manage())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let is_favorite = match &page.user {
        Some(user) => state
            .repo()
            .favorite_product_ids(user.id)
            .await?
            .contains(&id),
        None => false,
    };

    Ok(ProductDetailTemplate {
        product: ProductCard::with_category(&detail.product, detail.category, is_favorite),
        gallery: detail.images.iter().map(|i| media_url(&i.image)).collect(),
        shops: detail.shops.iter().map(Shop::display_name).collect(),
        page,
    })
}

/// Management table, inactive products included.
#[instrument(skip(state, page, _manager))]
pub async fn manage(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    page: PageContext,
    Query(query): Query<ListingQuery>,
) -> Result<ProductManageTemplate> {
    let catalog = CatalogService::new(state.repo());
    let index = catalog.category_index().await?;
    let listing = catalog.list(&query, &index, true).await?;

    Ok(ProductManageTemplate {
        products: listing
            .products
            .iter()
            .map(|p| ProductCard::new(p, &index, &BTreeSet::new()))
            .collect(),
        pagination: listing.pagination,
        page_query: query_without_page(&query),
        page,
    })
}

/// Display the new product form.
#[instrument(skip(state, page, _manager))]
pub async fn add_page(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    page: PageContext,
) -> Result<ProductFormTemplate> {
    let choices = Choices::load(state.repo()).await?;
    let form = ProductForm {
        is_active: true,
        ..ProductForm::default()
    };
    Ok(ProductFormTemplate::new(page, None, form, FormErrors::default(), &choices))
}

/// Create a product from a multipart form.
#[instrument(skip(state, manager, session, multipart), fields(user_id = %manager.id))]
pub async fn add(
    State(state): State<AppState>,
    RequireManager(manager): RequireManager,
    session: Session,
    multipart: Multipart,
) -> Result<Response> {
    let submission = ProductSubmission::read(multipart).await?;
    let choices = Choices::load(state.repo()).await?;

    let input = match submission.validate(&choices, state.media()) {
        Ok(input) => input,
        Err(errors) => {
            let page = PageContext::load(&session).await;
            let template =
                ProductFormTemplate::new(page, None, submission.form, errors, &choices);
            return Ok(invalid_form(template));
        }
    };

    let uploads = SavedUploads::save(state.media(), &submission).await?;
    let product = match state
        .repo()
        .create_product(manager.id, input, uploads.image.clone())
        .await
    {
        Ok(product) => product,
        Err(e) => {
            uploads.discard(state.media()).await;
            return Err(e.into());
        }
    };
    uploads.attach_gallery(&state, product.id).await?;

    tracing::info!(product_id = %product.id, "Product created");
    push_flash(
        &session,
        FlashLevel::Success,
        format!("Product \"{}\" created.", product.name),
    )
    .await?;
    Ok(Redirect::to(MANAGE_PATH).into_response())
}

/// Display the edit form.
#[instrument(skip(state, page, _manager))]
pub async fn edit_page(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    page: PageContext,
    Path(id): Path<String>,
) -> Result<ProductFormTemplate> {
    let product = load_product(state.repo(), &id).await?;
    let gallery = state.repo().list_product_images(product.id).await?;
    let choices = Choices::load(state.repo()).await?;

    let form = ProductForm {
        name: product.name.clone(),
        description: product.description.clone(),
        price: product.price.to_string(),
        category: product
            .category_id
            .map(|c| c.to_string())
            .unwrap_or_default(),
        shops: product.shop_ids.iter().map(ToString::to_string).collect(),
        is_active: product.is_active,
    };
    let mut template =
        ProductFormTemplate::new(page, Some(&product), form, FormErrors::default(), &choices);
    template.gallery = gallery.iter().map(|i| media_url(&i.image)).collect();
    Ok(template)
}

/// Update a product from a multipart form.
#[instrument(skip(state, _manager, session, multipart))]
pub async fn edit(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    session: Session,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<Response> {
    let existing = load_product(state.repo(), &id).await?;
    let submission = ProductSubmission::read(multipart).await?;
    let choices = Choices::load(state.repo()).await?;

    let input = match submission.validate(&choices, state.media()) {
        Ok(input) => input,
        Err(errors) => {
            let gallery = state.repo().list_product_images(existing.id).await?;
            let page = PageContext::load(&session).await;
            let mut template = ProductFormTemplate::new(
                page,
                Some(&existing),
                submission.form,
                errors,
                &choices,
            );
            template.gallery = gallery.iter().map(|i| media_url(&i.image)).collect();
            return Ok(invalid_form(template));
        }
    };

    let uploads = SavedUploads::save(state.media(), &submission).await?;
    let product = match state
        .repo()
        .update_product(existing.id, input, uploads.image.clone())
        .await
    {
        Ok(product) => product,
        Err(e) => {
            uploads.discard(state.media()).await;
            return Err(e.into());
        }
    };
    if uploads.image.is_some()
        && let Some(old) = &existing.image
    {
        remove_media(state.media(), old).await;
    }
    uploads.attach_gallery(&state, product.id).await?;

    tracing::info!(product_id = %product.id, "Product updated");
    push_flash(
        &session,
        FlashLevel::Success,
        format!("Product \"{}\" updated.", product.name),
    )
    .await?;
    Ok(Redirect::to(MANAGE_PATH).into_response())
}

/// Delete a product and its files.
#[instrument(skip(state, _manager, session))]
pub async fn delete(
    State(state): State<AppState>,
    RequireManager(_manager): RequireManager,
    session: Session,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let id: ProductId = parse_id(&id)?;
    let gallery = state.repo().list_product_images(id).await?;
    let product = state
        .repo()
        .delete_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    if let Some(image) = &product.image {
        remove_media(state.media(), image).await;
    }
    for image in &gallery {
        remove_media(state.media(), &image.image).await;
    }

    tracing::info!(product_id = %id, "Product deleted");
    push_flash(
        &session,
        FlashLevel::Success,
        format!("Product \"{}\" deleted.", product.name),
    )
    .await?;
    Ok(Redirect::to(MANAGE_PATH))
}

// =============================================================================
// Helpers
// =============================================================================

impl ProductFormTemplate {
    fn new(
        page: PageContext,
        product: Option<&Product>,
        form: ProductForm,
        errors: FormErrors,
        choices: &Choices,
    ) -> Self {
        let selected_categories: Vec<CategoryId> =
            form.category.parse().ok().into_iter().collect();
        let selected_shops: Vec<ShopId> = form.shops.iter().filter_map(|s| s.parse().ok()).collect();

        let (title, action) = match product {
            Some(p) => (format!("Edit {}", p.name), format!("/edit/{}", p.id)),
            None => ("Add product".to_owned(), "/add".to_owned()),
        };

        Self {
            page,
            title,
            action,
            category_options: category_options(&choices.index, &selected_categories),
            shop_options: shop_options(&choices.shops, &selected_shops),
            current_image: product.and_then(|p| p.image.as_deref()).map(media_url),
            gallery: Vec::new(),
            form,
            errors,
        }
    }
}

/// Categories and shops a product may reference.
struct Choices {
    index: CategoryIndex,
    category_ids: Vec<CategoryId>,
    shops: Vec<Shop>,
}

impl Choices {
    async fn load(repo: &dyn Repository) -> Result<Self> {
        let categories = repo.list_categories().await?;
        let shops = repo.list_shops().await?;
        Ok(Self {
            index: CategoryIndex::new(categories.iter().map(Category::node)),
            category_ids: categories.iter().map(|c| c.id).collect(),
            shops,
        })
    }

    fn shop_ids(&self) -> Vec<ShopId> {
        self.shops.iter().map(|s| s.id).collect()
    }
}

struct UploadedFile {
    filename: String,
    bytes: Bytes,
}

/// A decoded multipart product form.
struct ProductSubmission {
    form: ProductForm,
    image: Option<UploadedFile>,
    gallery: Vec<UploadedFile>,
}

impl ProductSubmission {
    async fn read(mut multipart: Multipart) -> Result<Self> {
        let mut form = ProductForm::default();
        let mut image = None;
        let mut gallery = Vec::new();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_owned();
            if name == "image" || name == "gallery" {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                // An untouched file input still sends an empty part.
                if filename.is_empty() && bytes.is_empty() {
                    continue;
                }
                let file = UploadedFile { filename, bytes };
                if name == "image" {
                    image = Some(file);
                } else {
                    gallery.push(file);
                }
                continue;
            }

            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            match name.as_str() {
                "name" => form.name = value,
                "description" => form.description = value,
                "price" => form.price = value,
                "category" => form.category = value,
                "shops" => form.shops.push(value),
                "is_active" => form.is_active = true,
                _ => {}
            }
        }

        Ok(Self {
            form,
            image,
            gallery,
        })
    }

    /// Field and upload checks, all reported together.
    fn validate(
        &self,
        choices: &Choices,
        media: &MediaStorage,
    ) -> std::result::Result<crate::models::ProductInput, FormErrors> {
        let (input, mut errors) = match self.form.to_input(&choices.category_ids, &choices.shop_ids())
        {
            Ok(input) => (Some(input), FormErrors::default()),
            Err(errors) => (None, errors),
        };
        if let Some(file) = &self.image
            && let Err(e) = media.validate(&file.filename, file.bytes.len())
        {
            errors.add("image", e.to_string());
        }
        for file in &self.gallery {
            if let Err(e) = media.validate(&file.filename, file.bytes.len()) {
                errors.add("gallery", format!("{}: {e}", file.filename));
            }
        }

        match input {
            Some(input) if errors.is_empty() => Ok(input),
            _ => Err(errors),
        }
    }
}

/// Files written for one submission, before the product row refers to them.
struct SavedUploads {
    image: Option<String>,
    gallery: Vec<String>,
}

impl SavedUploads {
    /// Write the main image and every gallery file. On a failed write the
    /// files already written are removed.
    async fn save(media: &MediaStorage, submission: &ProductSubmission) -> Result<Self> {
        let mut saved = Self {
            image: None,
            gallery: Vec::with_capacity(submission.gallery.len()),
        };
        let main = submission.image.iter().map(|f| (ImageKind::ProductMain, f));
        let gallery = submission
            .gallery
            .iter()
            .map(|f| (ImageKind::ProductGallery, f));
        for (kind, file) in main.chain(gallery) {
            match media.save(kind, &file.filename, &file.bytes).await {
                Ok(path) if kind == ImageKind::ProductMain => saved.image = Some(path),
                Ok(path) => saved.gallery.push(path),
                Err(e) => {
                    saved.discard(media).await;
                    return Err(e.into());
                }
            }
        }
        Ok(saved)
    }

    /// Record the gallery files against a stored product. The main image is
    /// already referenced, so only the gallery files go if this fails.
    async fn attach_gallery(self, state: &AppState, id: ProductId) -> Result<()> {
        if self.gallery.is_empty() {
            return Ok(());
        }
        if let Err(e) = state
            .repo()
            .add_product_images(id, self.gallery.clone())
            .await
        {
            for path in &self.gallery {
                remove_media(state.media(), path).await;
            }
            return Err(e.into());
        }
        Ok(())
    }

    async fn discard(&self, media: &MediaStorage) {
        for path in self.image.iter().chain(&self.gallery) {
            remove_media(media, path).await;
        }
    }
}

async fn remove_media(media: &MediaStorage, path: &str) {
    if let Err(e) = media.delete(path).await {
        tracing::warn!(path, error = %e, "Could not remove media file");
    }
}

async fn load_product(repo: &dyn Repository, raw_id: &str) -> Result<Product> {
    let id: ProductId = parse_id(raw_id)?;
    repo.get_product(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// The active filters as `k=v&` pairs, page excluded.
fn query_without_page(query: &ListingQuery) -> String {
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    let params = [
        ("q", &query.q),
        ("category", &query.category),
        ("shop", &query.shop),
        ("min_price", &query.min_price),
        ("max_price", &query.max_price),
        ("sort", &query.sort),
    ];
    for (key, value) in params {
        if let Some(value) = value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            serializer.append_pair(key, value);
        }
    }
    let mut encoded = serializer.finish();
    if !encoded.is_empty() {
        encoded.push('&');
    }
    encoded
}
