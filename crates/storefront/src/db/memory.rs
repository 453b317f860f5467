//! In-memory store.
//!
//! Mirrors the `PostgreSQL` constraints the handlers rely on (unique
//! usernames, one cart per user, one line per product, unique favorites,
//! cascading deletes) so router tests can run without a database.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use bazaar_core::cart::Quantity;
use bazaar_core::catalog::{ListingFilter, SortKey};
use bazaar_core::{
    CartId, CartItemId, CategoryId, FavoriteId, ProductId, ProductImageId, ShopId, UserId,
    UserRole,
};

use super::{
    CartStore, CategoryStore, FavoriteStore, ProductStore, Repository, RepositoryError,
    ShopStore, UserStore,
};
use crate::models::{
    Cart, CartItem, Category, FavoriteEntry, NewCategory, NewUser, Product, ProductImage,
    ProductInput, Shop, ShopInput, User,
};

#[derive(Debug, Clone)]
struct StoredItem {
    id: CartItemId,
    cart_id: CartId,
    product_id: ProductId,
    quantity: Quantity,
    added_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredFavorite {
    id: FavoriteId,
    user_id: UserId,
    product_id: ProductId,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Tables {
    next_id: i32,
    users: BTreeMap<UserId, (User, String)>,
    categories: BTreeMap<CategoryId, Category>,
    shops: BTreeMap<ShopId, Shop>,
    products: BTreeMap<ProductId, Product>,
    images: Vec<ProductImage>,
    carts: BTreeMap<CartId, Cart>,
    items: Vec<StoredItem>,
    favorites: Vec<StoredFavorite>,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    /// Timestamps strictly increase so "newest first" is deterministic.
    fn now(&self) -> DateTime<Utc> {
        Utc::now() + chrono::Duration::microseconds(i64::from(self.next_id))
    }

    fn existing_shops(&self, ids: &[ShopId]) -> Vec<ShopId> {
        let set: BTreeSet<ShopId> = ids
            .iter()
            .copied()
            .filter(|id| self.shops.contains_key(id))
            .collect();
        set.into_iter().collect()
    }

    fn cart_items(&self, cart: CartId) -> Vec<CartItem> {
        let mut items: Vec<CartItem> = self
            .items
            .iter()
            .filter(|item| item.cart_id == cart)
            .filter_map(|item| {
                self.products.get(&item.product_id).map(|product| CartItem {
                    id: item.id,
                    product: product.clone(),
                    quantity: item.quantity,
                    added_at: item.added_at,
                })
            })
            .collect();
        items.sort_by_key(|item| (item.added_at, item.id));
        items
    }

    fn touch_cart(&mut self, cart: CartId) {
        let now = self.now();
        if let Some(cart) = self.carts.get_mut(&cart) {
            cart.updated_at = now;
        }
    }
}

/// Store holding everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let mut t = self.tables.lock().await;
        if t.users.values().any(|(u, _)| u.username == user.username) {
            return Err(RepositoryError::Conflict("username already exists".to_owned()));
        }
        let id = UserId::new(t.next_id());
        let created = User {
            id,
            username: user.username,
            email: user.email,
            role: user.role,
            date_joined: t.now(),
        };
        t.users.insert(id, (created.clone(), user.password_hash));
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let t = self.tables.lock().await;
        Ok(t.users.get(&id).map(|(u, _)| u.clone()))
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let t = self.tables.lock().await;
        Ok(t.users
            .values()
            .find(|(u, _)| u.username.as_str() == username)
            .cloned())
    }

    async fn set_role(&self, id: UserId, role: UserRole) -> Result<User, RepositoryError> {
        let mut t = self.tables.lock().await;
        let (user, _) = t.users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        user.role = role;
        Ok(user.clone())
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn list_categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let t = self.tables.lock().await;
        let mut all: Vec<Category> = t.categories.values().cloned().collect();
        all.sort_by(|a, b| {
            (a.parent_id.is_some(), a.parent_id, &a.name, a.id)
                .cmp(&(b.parent_id.is_some(), b.parent_id, &b.name, b.id))
        });
        Ok(all)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>, RepositoryError> {
        Ok(self.tables.lock().await.categories.get(&id).cloned())
    }

    async fn find_category_by_name(
        &self,
        name: &str,
    ) -> Result<Option<Category>, RepositoryError> {
        let t = self.tables.lock().await;
        Ok(t.categories.values().find(|c| c.name == name).cloned())
    }

    async fn create_category(&self, category: NewCategory) -> Result<Category, RepositoryError> {
        let mut t = self.tables.lock().await;
        if let Some(parent) = category.parent_id
            && !t.categories.contains_key(&parent)
        {
            return Err(RepositoryError::NotFound);
        }
        let id = CategoryId::new(t.next_id());
        let created = Category {
            id,
            name: category.name,
            parent_id: category.parent_id,
            created_at: t.now(),
        };
        t.categories.insert(id, created.clone());
        Ok(created)
    }
}

#[async_trait]
impl ShopStore for MemoryStore {
    async fn list_shops(&self) -> Result<Vec<Shop>, RepositoryError> {
        let t = self.tables.lock().await;
        let mut all: Vec<Shop> = t.shops.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(all)
    }

    async fn list_shops_by_owner(&self, owner: UserId) -> Result<Vec<Shop>, RepositoryError> {
        let mut all = self.list_shops().await?;
        all.retain(|s| s.owner_id == owner);
        Ok(all)
    }

    async fn get_shop(&self, id: ShopId) -> Result<Option<Shop>, RepositoryError> {
        Ok(self.tables.lock().await.shops.get(&id).cloned())
    }

    async fn create_shop(&self, owner: UserId, shop: ShopInput) -> Result<Shop, RepositoryError> {
        let mut t = self.tables.lock().await;
        let id = ShopId::new(t.next_id());
        let created = Shop {
            id,
            name: shop.name,
            address: shop.address,
            phone: shop.phone,
            opening_hours: shop.opening_hours,
            latitude: shop.latitude,
            longitude: shop.longitude,
            owner_id: owner,
            created_at: t.now(),
        };
        t.shops.insert(id, created.clone());
        Ok(created)
    }

    async fn update_shop(&self, id: ShopId, shop: ShopInput) -> Result<Shop, RepositoryError> {
        let mut t = self.tables.lock().await;
        let stored = t.shops.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.name = shop.name;
        stored.address = shop.address;
        stored.phone = shop.phone;
        stored.opening_hours = shop.opening_hours;
        stored.latitude = shop.latitude;
        stored.longitude = shop.longitude;
        Ok(stored.clone())
    }

    async fn delete_shop(&self, id: ShopId) -> Result<bool, RepositoryError> {
        let mut t = self.tables.lock().await;
        if t.shops.remove(&id).is_none() {
            return Ok(false);
        }
        for product in t.products.values_mut() {
            product.shop_ids.retain(|s| *s != id);
        }
        Ok(true)
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn search_products(
        &self,
        filter: &ListingFilter,
        sort: SortKey,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Product>, RepositoryError> {
        let t = self.tables.lock().await;
        let mut matched: Vec<&Product> = t
            .products
            .values()
            .filter(|p| filter.matches(&p.filter_fields()))
            .collect();
        matched.sort_by(|a, b| sort.compare(&a.sort_fields(), &b.sort_fields()));
        Ok(matched
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_products(&self, filter: &ListingFilter) -> Result<u64, RepositoryError> {
        let t = self.tables.lock().await;
        Ok(t.products
            .values()
            .filter(|p| filter.matches(&p.filter_fields()))
            .count() as u64)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn create_product(
        &self,
        created_by: UserId,
        product: ProductInput,
        image: Option<String>,
    ) -> Result<Product, RepositoryError> {
        let mut t = self.tables.lock().await;
        let id = ProductId::new(t.next_id());
        let created = Product {
            id,
            name: product.name,
            category_id: product.category_id,
            description: product.description,
            image,
            price: product.price,
            created_by,
            created_at: t.now(),
            is_active: product.is_active,
            shop_ids: t.existing_shops(&product.shop_ids),
        };
        t.products.insert(id, created.clone());
        Ok(created)
    }

    async fn update_product(
        &self,
        id: ProductId,
        product: ProductInput,
        image: Option<String>,
    ) -> Result<Product, RepositoryError> {
        let mut t = self.tables.lock().await;
        let shop_ids = t.existing_shops(&product.shop_ids);
        let stored = t.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        stored.name = product.name;
        stored.category_id = product.category_id;
        stored.description = product.description;
        stored.price = product.price;
        stored.is_active = product.is_active;
        stored.shop_ids = shop_ids;
        if image.is_some() {
            stored.image = image;
        }
        Ok(stored.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let mut t = self.tables.lock().await;
        let removed = t.products.remove(&id);
        if removed.is_some() {
            t.images.retain(|i| i.product_id != id);
            t.items.retain(|i| i.product_id != id);
            t.favorites.retain(|f| f.product_id != id);
        }
        Ok(removed)
    }

    async fn list_product_images(
        &self,
        id: ProductId,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let t = self.tables.lock().await;
        let mut images: Vec<ProductImage> = t
            .images
            .iter()
            .filter(|i| i.product_id == id)
            .cloned()
            .collect();
        images.sort_by_key(|i| (i.order, i.id));
        Ok(images)
    }

    async fn add_product_images(
        &self,
        id: ProductId,
        images: Vec<String>,
    ) -> Result<Vec<ProductImage>, RepositoryError> {
        let mut t = self.tables.lock().await;
        if !t.products.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        let next = t
            .images
            .iter()
            .filter(|i| i.product_id == id)
            .map(|i| i.order + 1)
            .max()
            .unwrap_or(0);
        let mut added = Vec::with_capacity(images.len());
        for (order, image) in (next..).zip(images) {
            let created = ProductImage {
                id: ProductImageId::new(t.next_id()),
                product_id: id,
                image,
                order,
                created_at: t.now(),
            };
            t.images.push(created.clone());
            added.push(created);
        }
        Ok(added)
    }

    async fn set_product_category(
        &self,
        id: ProductId,
        category: Option<CategoryId>,
    ) -> Result<(), RepositoryError> {
        let mut t = self.tables.lock().await;
        let product = t.products.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        product.category_id = category;
        Ok(())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get_or_create_cart(&self, user: UserId) -> Result<Cart, RepositoryError> {
        let mut t = self.tables.lock().await;
        if let Some(cart) = t.carts.values().find(|c| c.user_id == user) {
            return Ok(cart.clone());
        }
        let now = t.now();
        let cart = Cart {
            id: CartId::new(t.next_id()),
            user_id: user,
            created_at: now,
            updated_at: now,
        };
        t.carts.insert(cart.id, cart.clone());
        Ok(cart)
    }

    async fn cart_items(&self, cart: CartId) -> Result<Vec<CartItem>, RepositoryError> {
        Ok(self.tables.lock().await.cart_items(cart))
    }

    async fn add_to_cart(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, RepositoryError> {
        let mut t = self.tables.lock().await;
        if !t.products.contains_key(&product) {
            return Err(RepositoryError::NotFound);
        }
        let total = if let Some(item) = t
            .items
            .iter_mut()
            .find(|i| i.cart_id == cart && i.product_id == product)
        {
            item.quantity = item.quantity.saturating_add(quantity);
            item.quantity
        } else {
            let item = StoredItem {
                id: CartItemId::new(t.next_id()),
                cart_id: cart,
                product_id: product,
                quantity,
                added_at: t.now(),
            };
            t.items.push(item);
            quantity
        };
        t.touch_cart(cart);
        Ok(total)
    }

    async fn set_cart_quantity(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<bool, RepositoryError> {
        let mut t = self.tables.lock().await;
        let Some(item) = t
            .items
            .iter_mut()
            .find(|i| i.cart_id == cart && i.product_id == product)
        else {
            return Ok(false);
        };
        item.quantity = quantity;
        t.touch_cart(cart);
        Ok(true)
    }

    async fn remove_from_cart(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut t = self.tables.lock().await;
        let before = t.items.len();
        t.items
            .retain(|i| !(i.cart_id == cart && i.product_id == product));
        let found = t.items.len() != before;
        if found {
            t.touch_cart(cart);
        }
        Ok(found)
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn list_favorites(&self, user: UserId) -> Result<Vec<FavoriteEntry>, RepositoryError> {
        let t = self.tables.lock().await;
        let mut entries: Vec<FavoriteEntry> = t
            .favorites
            .iter()
            .filter(|f| f.user_id == user)
            .filter_map(|f| {
                t.products.get(&f.product_id).map(|product| FavoriteEntry {
                    id: f.id,
                    product: product.clone(),
                    created_at: f.created_at,
                })
            })
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(entries)
    }

    async fn favorite_product_ids(
        &self,
        user: UserId,
    ) -> Result<BTreeSet<ProductId>, RepositoryError> {
        let t = self.tables.lock().await;
        Ok(t.favorites
            .iter()
            .filter(|f| f.user_id == user)
            .map(|f| f.product_id)
            .collect())
    }

    async fn add_favorite(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut t = self.tables.lock().await;
        if !t.products.contains_key(&product) {
            return Err(RepositoryError::NotFound);
        }
        if t
            .favorites
            .iter()
            .any(|f| f.user_id == user && f.product_id == product)
        {
            return Ok(false);
        }
        let favorite = StoredFavorite {
            id: FavoriteId::new(t.next_id()),
            user_id: user,
            product_id: product,
            created_at: t.now(),
        };
        t.favorites.push(favorite);
        Ok(true)
    }

    async fn remove_favorite(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<bool, RepositoryError> {
        let mut t = self.tables.lock().await;
        let before = t.favorites.len();
        t.favorites
            .retain(|f| !(f.user_id == user && f.product_id == product));
        Ok(t.favorites.len() != before)
    }

    async fn count_favorites(&self, user: UserId) -> Result<u64, RepositoryError> {
        let t = self.tables.lock().await;
        Ok(t.favorites.iter().filter(|f| f.user_id == user).count() as u64)
    }
}

#[async_trait]
impl Repository for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bazaar_core::{Email, Price, Username};

    use super::*;

    async fn seed_product(store: &MemoryStore, name: &str, cents: i64) -> Product {
        store
            .create_product(
                UserId::new(999),
                ProductInput {
                    name: name.to_owned(),
                    category_id: None,
                    description: String::new(),
                    price: Price::from_cents(cents).unwrap(),
                    is_active: true,
                    shop_ids: vec![],
                },
                None,
            )
            .await
            .unwrap()
    }

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: Username::parse(name).unwrap(),
            email: Email::parse("a@example.com").unwrap(),
            password_hash: "hash".to_owned(),
            role: UserRole::User,
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("alice")).await.unwrap();
        let err = store.create_user(new_user("alice")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_cart_add_merges_lines() {
        let store = MemoryStore::new();
        let product = seed_product(&store, "Milk", 9900).await;
        let cart = store.get_or_create_cart(UserId::new(1)).await.unwrap();
        let again = store.get_or_create_cart(UserId::new(1)).await.unwrap();
        assert_eq!(cart.id, again.id);

        let two = Quantity::new(2).unwrap();
        store.add_to_cart(cart.id, product.id, two).await.unwrap();
        let total = store.add_to_cart(cart.id, product.id, two).await.unwrap();
        assert_eq!(total.get(), 4);
        assert_eq!(store.cart_items(cart.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_product_cascades() {
        let store = MemoryStore::new();
        let product = seed_product(&store, "Milk", 9900).await;
        let user = UserId::new(1);
        let cart = store.get_or_create_cart(user).await.unwrap();
        store
            .add_to_cart(cart.id, product.id, Quantity::ONE)
            .await
            .unwrap();
        store.add_favorite(user, product.id).await.unwrap();
        store
            .add_product_images(product.id, vec!["products/gallery/a.png".to_owned()])
            .await
            .unwrap();

        assert!(store.delete_product(product.id).await.unwrap().is_some());
        assert!(store.cart_items(cart.id).await.unwrap().is_empty());
        assert_eq!(store.count_favorites(user).await.unwrap(), 0);
        assert!(store.list_product_images(product.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_favorites_are_unique() {
        let store = MemoryStore::new();
        let product = seed_product(&store, "Milk", 9900).await;
        let user = UserId::new(1);
        assert!(store.add_favorite(user, product.id).await.unwrap());
        assert!(!store.add_favorite(user, product.id).await.unwrap());
        assert_eq!(store.count_favorites(user).await.unwrap(), 1);
        assert!(store.remove_favorite(user, product.id).await.unwrap());
        assert!(!store.remove_favorite(user, product.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_gallery_order_appends() {
        let store = MemoryStore::new();
        let product = seed_product(&store, "Milk", 9900).await;
        store
            .add_product_images(product.id, vec!["a".to_owned(), "b".to_owned()])
            .await
            .unwrap();
        let more = store
            .add_product_images(product.id, vec!["c".to_owned()])
            .await
            .unwrap();
        assert_eq!(more[0].order, 2);
        let orders: Vec<i32> = store
            .list_product_images(product.id)
            .await
            .unwrap()
            .iter()
            .map(|i| i.order)
            .collect();
        assert_eq!(orders, [0, 1, 2]);
    }
}
