//! Sales ledger and monthly closings.
//!
//! Recording a sale is public (it happens at the end of a shopper's checkout);
//! listing, deleting and closing months are admin operations.

use crate::client::ApiClient;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Method;
use shop_core::{AuthSession, Month, Recaudation, Sale, SalesLedger, ShopResult};
use tracing::{info, instrument};

/// `SalesLedger` backed by `POST /boughtProduct`
#[derive(Debug, Clone)]
pub struct ApiSalesLedger {
    client: ApiClient,
}

impl ApiSalesLedger {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SalesLedger for ApiSalesLedger {
    #[instrument(skip(self, sale), fields(title = %sale.title, quantity = sale.quantity))]
    async fn record_sale(&self, sale: &Sale) -> ShopResult<()> {
        self.client
            .send_empty(self.client.request(Method::POST, &["boughtProduct"])?.json(sale))
            .await
    }
}

impl ApiClient {
    #[instrument(skip(self, session))]
    pub async fn list_sales(&self, session: &AuthSession) -> ShopResult<Vec<Sale>> {
        let request = self.authed(Method::GET, &["boughtProduct", "AllboughtProducts"], session)?;
        self.send(request).await
    }

    #[instrument(skip(self, session))]
    pub async fn delete_sale(&self, session: &AuthSession, id: &str) -> ShopResult<()> {
        let request = self.authed(Method::DELETE, &["boughtProduct", id], session)?;
        self.send_empty(request).await
    }

    #[instrument(skip(self, session))]
    pub async fn list_recaudations(&self, session: &AuthSession) -> ShopResult<Vec<Recaudation>> {
        let request = self.authed(Method::GET, &["recaudation", "recaudations"], session)?;
        self.send(request).await
    }

    #[instrument(skip(self, session, recaudation))]
    pub async fn create_recaudation(
        &self,
        session: &AuthSession,
        recaudation: &Recaudation,
    ) -> ShopResult<()> {
        let request = self
            .authed(Method::POST, &["recaudation", "recaudation"], session)?
            .json(recaudation);
        self.send_empty(request).await
    }

    #[instrument(skip(self, session))]
    pub async fn delete_recaudation(&self, session: &AuthSession, id: &str) -> ShopResult<()> {
        let request = self.authed(Method::DELETE, &["recaudation", "recaudation", id], session)?;
        self.send_empty(request).await
    }

    /// Sum the month's sales and store the closing
    #[instrument(skip(self, session), fields(year = month.year, month = month.month))]
    pub async fn close_month(&self, session: &AuthSession, month: Month) -> ShopResult<Recaudation> {
        session.require_admin()?;

        let sales = self.list_sales(session).await?;
        let recaudation = Recaudation::close_month(&sales, month, Utc::now());
        self.create_recaudation(session, &recaudation).await?;

        info!(
            "Closed {}-{:02}: {} sales, {}",
            month.year, month.month, recaudation.sales_count, recaudation.amount
        );
        Ok(recaudation)
    }
}
