//! Catalog reads and admin product management.

use crate::client::ApiClient;
use reqwest::Method;
use serde::Deserialize;
use shop_core::{AuthSession, Product, ProductCatalog, ProductDraft, ProductId, ShopResult};
use tracing::{info, instrument};

/// `GET /products` answers either a bare array or `{ "products": [...] }`
#[derive(Deserialize)]
#[serde(untagged)]
enum ProductList {
    Bare(Vec<Product>),
    Wrapped { products: Vec<Product> },
}

impl ApiClient {
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> ShopResult<ProductCatalog> {
        let list: ProductList = self.send(self.request(Method::GET, &["products"])?).await?;
        let products = match list {
            ProductList::Bare(products) | ProductList::Wrapped { products } => products,
        };
        info!("Fetched {} products", products.len());
        Ok(ProductCatalog::new(products))
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: &ProductId) -> ShopResult<Product> {
        self.send(self.request(Method::GET, &["products", id.as_str()])?)
            .await
    }

    #[instrument(skip(self, session, draft), fields(title = %draft.title))]
    pub async fn create_product(&self, session: &AuthSession, draft: &ProductDraft) -> ShopResult<Product> {
        let request = self.authed(Method::POST, &["products"], session)?.json(draft);
        self.send(request).await
    }

    #[instrument(skip(self, session, draft))]
    pub async fn update_product(
        &self,
        session: &AuthSession,
        id: &ProductId,
        draft: &ProductDraft,
    ) -> ShopResult<Product> {
        let request = self
            .authed(Method::PUT, &["products", id.as_str()], session)?
            .json(draft);
        self.send(request).await
    }

    #[instrument(skip(self, session))]
    pub async fn delete_product(&self, session: &AuthSession, id: &ProductId) -> ShopResult<()> {
        let request = self.authed(Method::DELETE, &["products", id.as_str()], session)?;
        self.send_empty(request).await
    }
}
