//! In-process tests for the storefront router.
//!
//! The full application runs against `MemoryStore` and an in-memory session
//! store, so no database or server is needed.

#![allow(clippy::unwrap_used)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use secrecy::SecretString;
use tower::ServiceExt;

use bazaar_core::catalog::{ListingFilter, SortKey};
use bazaar_core::{CategoryId, Price, ProductId, ShopId, UserId, UserRole};
use bazaar_storefront::config::{DEFAULT_MAX_UPLOAD_BYTES, StorefrontConfig};
use bazaar_storefront::db::{CategoryStore, MemoryStore, ProductStore, ShopStore};
use bazaar_storefront::middleware::session_layer;
use bazaar_storefront::models::{NewCategory, Product, ProductInput, ShopInput};
use bazaar_storefront::services::AuthService;
use bazaar_storefront::state::AppState;

const PASSWORD: &str = "correct horse battery";
const BOUNDARY: &str = "bazaar-test-boundary";

fn test_config(media_root: PathBuf) -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/unused"),
        host: "127.0.0.1".parse().unwrap(),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("k".repeat(64)),
        media_root,
        max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 0.0,
    }
}

/// A `multipart/form-data` body, built part by part.
#[derive(Default)]
struct MultipartBody {
    bytes: Vec<u8>,
}

impl MultipartBody {
    fn text(mut self, name: &str, value: &str) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, name: &str, filename: &str, content: &[u8]) -> Self {
        self.bytes.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        self.bytes.extend_from_slice(content);
        self.bytes.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.bytes
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        self.bytes
    }
}

/// One browser: the app plus the session cookie it was handed.
struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    media_root: PathBuf,
    cookie: Option<String>,
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.media_root);
    }
}

impl TestApp {
    fn new() -> Self {
        let media_root = std::env::temp_dir().join(format!(
            "bazaar-route-tests-{}",
            uuid::Uuid::new_v4().simple()
        ));
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(test_config(media_root.clone()), store.clone());
        let sessions = session_layer(tower_sessions::MemoryStore::default(), false);
        Self {
            router: bazaar_storefront::app(state, sessions),
            store,
            media_root,
            cookie: None,
        }
    }

    async fn send(&mut self, request: Request<Body>) -> Response {
        let response = self.router.clone().oneshot(request).await.unwrap();
        if let Some(value) = response.headers().get(header::SET_COOKIE) {
            let pair = value.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_owned());
        }
        response
    }

    fn request(&self, method: &str, uri: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(uri);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    async fn get(&mut self, uri: &str) -> Response {
        let request = self.request("GET", uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn post_form(&mut self, uri: &str, form: &[(&str, &str)]) -> Response {
        let body: String = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form)
            .finish();
        let request = self
            .request("POST", uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn post_multipart(&mut self, uri: &str, body: MultipartBody) -> Response {
        let request = self
            .request("POST", uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body.finish()))
            .unwrap();
        self.send(request).await
    }

    /// Every product, inactive ones included, newest first.
    async fn all_products(&self) -> Vec<Product> {
        let filter = ListingFilter {
            include_inactive: true,
            ..ListingFilter::default()
        };
        self.store
            .search_products(&filter, SortKey::NewestFirst, 0, 100)
            .await
            .unwrap()
    }

    fn media_file(&self, relative: &str) -> PathBuf {
        self.media_root.join(relative)
    }

    async fn create_user(&self, username: &str, role: UserRole) -> UserId {
        AuthService::new(&*self.store)
            .create_user(username, &format!("{username}@example.com"), PASSWORD, role)
            .await
            .unwrap()
            .id
    }

    async fn login_as(&mut self, username: &str, role: UserRole) -> UserId {
        let id = self.create_user(username, role).await;
        let response = self
            .post_form(
                "/users/login",
                &[("username", username), ("password", PASSWORD)],
            )
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        id
    }

    async fn category(&self, name: &str, parent: Option<CategoryId>) -> CategoryId {
        self.store
            .create_category(NewCategory {
                name: name.to_owned(),
                parent_id: parent,
            })
            .await
            .unwrap()
            .id
    }

    async fn product(&self, name: &str, category: Option<CategoryId>) -> ProductId {
        self.store
            .create_product(
                UserId::new(1),
                ProductInput {
                    name: name.to_owned(),
                    category_id: category,
                    description: String::new(),
                    price: Price::from_cents(19_900).unwrap(),
                    is_active: true,
                    shop_ids: vec![],
                },
                None,
            )
            .await
            .unwrap()
            .id
    }

    async fn shop(&self, owner: UserId, name: &str) -> ShopId {
        self.store
            .create_shop(
                owner,
                ShopInput {
                    name: name.to_owned(),
                    address: "Market st 1".to_owned(),
                    phone: String::new(),
                    opening_hours: String::new(),
                    latitude: None,
                    longitude: None,
                },
            )
            .await
            .unwrap()
            .id
    }
}

async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
}

// ============================================================================
// Health
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let mut app = TestApp::new();
    let response = app.get("/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");

    assert_eq!(app.get("/health/ready").await.status(), StatusCode::OK);
}

// ============================================================================
// Catalog
// ============================================================================

#[tokio::test]
async fn test_listing_paginates_and_clamps() {
    let mut app = TestApp::new();
    for n in 1..=8 {
        app.product(&format!("Widget {n}"), None).await;
    }

    let first = body_text(app.get("/").await).await;
    assert_eq!(first.matches("<article class=\"product-card").count(), 6);
    assert!(first.contains("Page 1 of 2"));
    assert!(first.contains("Found: 8"));

    let beyond = body_text(app.get("/?page=99").await).await;
    assert_eq!(beyond.matches("<article class=\"product-card").count(), 2);
    assert!(beyond.contains("Page 2 of 2"));

    let garbage = body_text(app.get("/?page=abc").await).await;
    assert!(garbage.contains("Page 1 of 2"));
}

#[tokio::test]
async fn test_category_filter_includes_descendants() {
    let mut app = TestApp::new();
    let electronics = app.category("Electronics", None).await;
    let phones = app.category("Phones", Some(electronics)).await;
    let food = app.category("Groceries", None).await;
    app.product("Pocket phone", Some(phones)).await;
    app.product("Desk lamp", Some(electronics)).await;
    app.product("Oat milk", Some(food)).await;

    let body = body_text(app.get(&format!("/?category={electronics}")).await).await;
    assert!(body.contains("Pocket phone"));
    assert!(body.contains("Desk lamp"));
    assert!(!body.contains("Oat milk"));
    assert!(body.contains("Found: 2"));

    // An id that matches no category matches no products.
    let body = body_text(app.get("/?category=9999").await).await;
    assert!(body.contains("Found: 0"));
}

#[tokio::test]
async fn test_product_detail_missing_and_malformed_ids() {
    let mut app = TestApp::new();
    let id = app.product("Teapot", None).await;

    let response = app.get(&format!("/product/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("Teapot"));

    assert_eq!(app.get("/product/424242").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/product/teapot").await.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_cart_requires_login() {
    let mut app = TestApp::new();
    let response = app.get("/cart").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/users/login?next=%2Fcart");
}

#[tokio::test]
async fn test_cart_add_accumulates_quantity() {
    let mut app = TestApp::new();
    let id = app.product("Kettle", None).await;
    app.login_as("shopper", UserRole::User).await;

    let add = format!("/cart/add/{id}");
    let response = app.post_form(&add, &[("quantity", "2")]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/cart");
    app.post_form(&add, &[]).await;

    let body = body_text(app.get("/cart").await).await;
    assert!(body.contains("Kettle"));
    assert!(body.contains("name=\"quantity\" value=\"3\""));
}

#[tokio::test]
async fn test_cart_add_rejects_bad_quantity() {
    let mut app = TestApp::new();
    let id = app.product("Kettle", None).await;
    app.login_as("shopper", UserRole::User).await;

    let response = app
        .post_form(&format!("/cart/add/{id}"), &[("quantity", "0")])
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_update_to_zero_removes_line() {
    let mut app = TestApp::new();
    let id = app.product("Kettle", None).await;
    app.login_as("shopper", UserRole::User).await;

    app.post_form(&format!("/cart/add/{id}"), &[("quantity", "4")])
        .await;
    let response = app
        .post_form(&format!("/cart/update/{id}"), &[("quantity", "0")])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let body = body_text(app.get("/cart").await).await;
    assert!(body.contains("Your cart is empty"));
}

// ============================================================================
// Favorites
// ============================================================================

#[tokio::test]
async fn test_favorite_toggle_json() {
    let mut app = TestApp::new();
    let id = app.product("Scarf", None).await;
    app.login_as("shopper", UserRole::User).await;

    let toggle = format!("/favorites/toggle/{id}");
    let on: serde_json::Value =
        serde_json::from_str(&body_text(app.post_form(&toggle, &[]).await).await).unwrap();
    assert_eq!(on, serde_json::json!({"is_favorite": true, "count": 1}));

    let off: serde_json::Value =
        serde_json::from_str(&body_text(app.post_form(&toggle, &[]).await).await).unwrap();
    assert_eq!(off, serde_json::json!({"is_favorite": false, "count": 0}));
}

#[tokio::test]
async fn test_favorite_toggle_unauthenticated_is_401() {
    let mut app = TestApp::new();
    let id = app.product("Scarf", None).await;

    let response = app.post_form(&format!("/favorites/toggle/{id}"), &[]).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_favorite_remove_absent_is_404() {
    let mut app = TestApp::new();
    let id = app.product("Scarf", None).await;
    app.login_as("shopper", UserRole::User).await;

    let remove = format!("/favorites/remove/{id}");
    assert_eq!(
        app.post_form(&remove, &[]).await.status(),
        StatusCode::NOT_FOUND
    );

    app.post_form(&format!("/favorites/add/{id}"), &[]).await;
    assert_eq!(
        app.post_form(&remove, &[]).await.status(),
        StatusCode::SEE_OTHER
    );
}

// ============================================================================
// Roles
// ============================================================================

#[tokio::test]
async fn test_manager_pages_redirect_plain_users_with_message() {
    let mut app = TestApp::new();
    app.login_as("shopper", UserRole::User).await;

    let response = app.get("/manage").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let body = body_text(app.get("/").await).await;
    assert!(body.contains("You do not have permission to access that page."));

    let response = app.get("/shops/manage").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let body = body_text(app.get("/").await).await;
    assert!(body.contains("You do not have permission to access that page."));
    assert!(!body.contains("manage products"));
}

#[tokio::test]
async fn test_manager_sees_management_pages() {
    let mut app = TestApp::new();
    app.login_as("manager", UserRole::Manager).await;

    assert_eq!(app.get("/manage").await.status(), StatusCode::OK);
    assert_eq!(app.get("/add").await.status(), StatusCode::OK);
    assert_eq!(app.get("/shops/manage").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_foreign_shop_is_forbidden_to_manager_but_not_admin() {
    let mut app = TestApp::new();
    let owner = app.create_user("owner", UserRole::Manager).await;
    let shop = app.shop(owner, "Corner store").await;

    app.login_as("rival", UserRole::Manager).await;
    let response = app.get(&format!("/shops/edit/{shop}")).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let mut admin = TestApp {
        router: app.router.clone(),
        store: app.store.clone(),
        media_root: app.media_root.clone(),
        cookie: None,
    };
    admin.login_as("root", UserRole::Admin).await;
    assert_eq!(
        admin.get(&format!("/shops/edit/{shop}")).await.status(),
        StatusCode::OK
    );
}

#[tokio::test]
async fn test_manager_creates_shop() {
    let mut app = TestApp::new();
    app.login_as("manager", UserRole::Manager).await;

    let response = app
        .post_form(
            "/shops/add",
            &[
                ("name", "Riverside"),
                ("address", "Quay 3"),
                ("phone", ""),
                ("opening_hours", "9-18"),
                ("latitude", "55.75"),
                ("longitude", "37.61"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/shops/manage");

    let body = body_text(app.get("/shops/manage").await).await;
    assert!(body.contains("Riverside"));
}

// ============================================================================
// Product management
// ============================================================================

fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).map_or(0, |entries| {
        entries
            .filter(|e| e.as_ref().unwrap().file_name() != ".gitkeep")
            .count()
    })
}

/// A manager with one category and two of their own shops.
async fn manager_with_catalog(app: &mut TestApp) -> (CategoryId, ShopId, ShopId) {
    let manager = app.login_as("manager", UserRole::Manager).await;
    let category = app.category("Kitchen", None).await;
    let north = app.shop(manager, "North").await;
    let south = app.shop(manager, "South").await;
    (category, north, south)
}

#[tokio::test]
async fn test_add_product_with_images() {
    let mut app = TestApp::new();
    let (category, north, south) = manager_with_catalog(&mut app).await;

    let body = MultipartBody::default()
        .text("name", "Teapot")
        .text("description", "Cast iron")
        .text("price", "12.5")
        .text("category", &category.to_string())
        .text("shops", &south.to_string())
        .text("shops", &north.to_string())
        .text("shops", &south.to_string())
        .text("is_active", "on")
        .file("image", "front.PNG", b"png bytes")
        .file("gallery", "side.jpg", b"jpg bytes")
        .file("gallery", "top.webp", b"webp bytes")
        .file("gallery", "", b"");
    let response = app.post_multipart("/add", body).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/manage");

    let products = app.all_products().await;
    assert_eq!(products.len(), 1);
    let product = &products[0];
    assert_eq!(product.name, "Teapot");
    assert_eq!(product.price.to_string(), "12.50");
    assert_eq!(product.category_id, Some(category));
    assert!(product.is_active);
    let mut shops = product.shop_ids.clone();
    shops.sort_unstable();
    assert_eq!(shops, [north, south]);

    let image = product.image.as_deref().unwrap();
    assert!(image.starts_with("products/main/") && image.ends_with(".png"));
    assert!(app.media_file(image).exists());

    let gallery = app.store.list_product_images(product.id).await.unwrap();
    assert_eq!(gallery.len(), 2);
    assert!(gallery[0].image.ends_with(".jpg"));
    assert!(gallery[1].image.ends_with(".webp"));
    for entry in &gallery {
        assert!(app.media_file(&entry.image).exists());
    }

    let response = app.get(&format!("/media/{image}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "png bytes");
}

#[tokio::test]
async fn test_add_product_without_checkbox_is_inactive() {
    let mut app = TestApp::new();
    manager_with_catalog(&mut app).await;

    let body = MultipartBody::default()
        .text("name", "Draft")
        .text("price", "1")
        .file("image", "", b"");
    let response = app.post_multipart("/add", body).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let products = app.all_products().await;
    assert_eq!(products.len(), 1);
    assert!(!products[0].is_active);
    assert!(products[0].image.is_none());
    assert!(products[0].shop_ids.is_empty());
    assert_eq!(files_in(&app.media_file("products/main")), 0);
}

#[tokio::test]
async fn test_add_product_invalid_price_is_422_and_writes_nothing() {
    let mut app = TestApp::new();
    manager_with_catalog(&mut app).await;

    let body = MultipartBody::default()
        .text("name", "Teapot")
        .text("price", "-3")
        .file("image", "front.png", b"png bytes")
        .file("gallery", "side.jpg", b"jpg bytes");
    let response = app.post_multipart("/add", body).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let page = body_text(response).await;
    assert!(page.contains("value=\"Teapot\""));
    assert!(page.contains("class=\"field-error\""));

    assert!(app.all_products().await.is_empty());
    assert_eq!(files_in(&app.media_file("products/main")), 0);
    assert_eq!(files_in(&app.media_file("products/gallery")), 0);
}

#[tokio::test]
async fn test_add_product_rejects_non_image_upload() {
    let mut app = TestApp::new();
    manager_with_catalog(&mut app).await;

    let body = MultipartBody::default()
        .text("name", "Teapot")
        .text("price", "3")
        .file("gallery", "notes.txt", b"hello");
    let response = app.post_multipart("/add", body).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("notes.txt"));
    assert!(app.all_products().await.is_empty());
}

#[tokio::test]
async fn test_edit_product_appends_gallery_and_keeps_main_image() {
    let mut app = TestApp::new();
    let (category, north, _) = manager_with_catalog(&mut app).await;

    let body = MultipartBody::default()
        .text("name", "Teapot")
        .text("price", "12.50")
        .text("is_active", "on")
        .file("image", "front.png", b"png bytes")
        .file("gallery", "side.jpg", b"jpg bytes");
    app.post_multipart("/add", body).await;
    let product = app.all_products().await.remove(0);
    let first_gallery = app.store.list_product_images(product.id).await.unwrap();

    let body = MultipartBody::default()
        .text("name", "Big teapot")
        .text("price", "15")
        .text("category", &category.to_string())
        .text("shops", &north.to_string())
        .file("image", "", b"")
        .file("gallery", "back.gif", b"gif bytes");
    let response = app
        .post_multipart(&format!("/edit/{}", product.id), body)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/manage");

    let updated = app.store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(updated.name, "Big teapot");
    assert_eq!(updated.price.to_string(), "15.00");
    assert_eq!(updated.category_id, Some(category));
    assert_eq!(updated.shop_ids, [north]);
    assert!(!updated.is_active);
    assert_eq!(updated.image, product.image);
    assert!(app.media_file(updated.image.as_deref().unwrap()).exists());

    let gallery = app.store.list_product_images(product.id).await.unwrap();
    assert_eq!(gallery.len(), 2);
    assert_eq!(gallery[0].image, first_gallery[0].image);
    assert!(gallery[1].image.ends_with(".gif"));
    assert!(app.media_file(&gallery[1].image).exists());
}

#[tokio::test]
async fn test_edit_product_new_main_image_replaces_old_file() {
    let mut app = TestApp::new();
    manager_with_catalog(&mut app).await;

    let body = MultipartBody::default()
        .text("name", "Teapot")
        .text("price", "2")
        .file("image", "old.png", b"old");
    app.post_multipart("/add", body).await;
    let product = app.all_products().await.remove(0);
    let old = product.image.clone().unwrap();

    let body = MultipartBody::default()
        .text("name", "Teapot")
        .text("price", "2")
        .file("image", "new.jpeg", b"new");
    let response = app
        .post_multipart(&format!("/edit/{}", product.id), body)
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let updated = app.store.get_product(product.id).await.unwrap().unwrap();
    let new = updated.image.unwrap();
    assert_ne!(new, old);
    assert!(app.media_file(&new).exists());
    assert!(!app.media_file(&old).exists());
}

#[tokio::test]
async fn test_invalid_edit_keeps_gallery_on_page() {
    let mut app = TestApp::new();
    manager_with_catalog(&mut app).await;

    let body = MultipartBody::default()
        .text("name", "Teapot")
        .text("price", "2")
        .file("gallery", "side.jpg", b"jpg bytes");
    app.post_multipart("/add", body).await;
    let product = app.all_products().await.remove(0);
    let gallery = app.store.list_product_images(product.id).await.unwrap();

    let body = MultipartBody::default()
        .text("name", "Teapot")
        .text("price", "two")
        .file("gallery", "extra.png", b"png bytes");
    let response = app
        .post_multipart(&format!("/edit/{}", product.id), body)
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let page = body_text(response).await;
    assert!(page.contains(&format!("/media/{}", gallery[0].image)));

    assert_eq!(app.store.list_product_images(product.id).await.unwrap().len(), 1);
    assert_eq!(files_in(&app.media_file("products/gallery")), 1);
}

#[tokio::test]
async fn test_edit_and_delete_unknown_product_is_404() {
    let mut app = TestApp::new();
    manager_with_catalog(&mut app).await;

    let body = MultipartBody::default().text("name", "Ghost").text("price", "1");
    assert_eq!(
        app.post_multipart("/edit/424242", body).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.post_form("/delete/424242", &[]).await.status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        app.post_form("/delete/ghost", &[]).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_delete_product_removes_files() {
    let mut app = TestApp::new();
    manager_with_catalog(&mut app).await;

    let body = MultipartBody::default()
        .text("name", "Teapot")
        .text("price", "12.50")
        .file("image", "front.png", b"png bytes")
        .file("gallery", "side.jpg", b"jpg bytes")
        .file("gallery", "top.jpg", b"jpg bytes");
    app.post_multipart("/add", body).await;
    let product = app.all_products().await.remove(0);
    let gallery = app.store.list_product_images(product.id).await.unwrap();
    let mut files: Vec<String> = gallery.into_iter().map(|i| i.image).collect();
    files.extend(product.image.clone());
    assert_eq!(files.len(), 3);
    assert!(files.iter().all(|f| app.media_file(f).exists()));

    let response = app
        .post_form(&format!("/delete/{}", product.id), &[])
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/manage");

    assert!(app.store.get_product(product.id).await.unwrap().is_none());
    assert!(files.iter().all(|f| !app.media_file(f).exists()));
    assert_eq!(
        app.get(&format!("/product/{}", product.id)).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_product_management_requires_manager() {
    let mut app = TestApp::new();
    let id = app.product("Teapot", None).await;
    app.login_as("shopper", UserRole::User).await;

    let body = MultipartBody::default().text("name", "Mine").text("price", "1");
    let response = app.post_multipart("/add", body).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = app.post_form(&format!("/delete/{id}"), &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.all_products().await.len(), 1);
}

// ============================================================================
// Accounts
// ============================================================================

#[tokio::test]
async fn test_register_logs_in() {
    let mut app = TestApp::new();
    let response = app
        .post_form(
            "/users/register",
            &[
                ("username", "newcomer"),
                ("email", "newcomer@example.com"),
                ("password1", PASSWORD),
                ("password2", PASSWORD),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/");

    let response = app.get("/users/profile").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("newcomer"));
}

#[tokio::test]
async fn test_register_mismatched_passwords_is_422() {
    let mut app = TestApp::new();
    let response = app
        .post_form(
            "/users/register",
            &[
                ("username", "newcomer"),
                ("email", "newcomer@example.com"),
                ("password1", PASSWORD),
                ("password2", "something else"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body_text(response).await.contains("password fields didn"));
}

#[tokio::test]
async fn test_login_failure_and_next_redirect() {
    let mut app = TestApp::new();
    app.create_user("shopper", UserRole::User).await;

    let response = app
        .post_form(
            "/users/login",
            &[("username", "shopper"), ("password", "wrong password")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .post_form(
            "/users/login",
            &[
                ("username", "shopper"),
                ("password", PASSWORD),
                ("next", "/favorites"),
            ],
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/favorites");
}

#[tokio::test]
async fn test_logout_ends_session() {
    let mut app = TestApp::new();
    app.login_as("shopper", UserRole::User).await;
    assert_eq!(app.get("/users/profile").await.status(), StatusCode::OK);

    let response = app.post_form("/users/logout", &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(app.get("/users/profile").await.status(), StatusCode::SEE_OTHER);
}
