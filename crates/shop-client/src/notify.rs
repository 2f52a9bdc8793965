//! Order confirmations sent to the store's WhatsApp channel.

use crate::client::ApiClient;
use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use shop_core::{OrderNotifier, ShopResult};
use tracing::{info, instrument};

#[derive(Debug, Clone)]
pub struct WhatsAppNotifier {
    client: ApiClient,
}

impl WhatsAppNotifier {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[derive(Serialize)]
struct SendMessage<'a> {
    message: &'a str,
}

#[async_trait]
impl OrderNotifier for WhatsAppNotifier {
    #[instrument(skip(self, message), fields(len = message.len()))]
    async fn notify(&self, message: &str) -> ShopResult<()> {
        let request = self
            .client
            .request(Method::POST, &["whatsapp", "send"])?
            .json(&SendMessage { message });
        self.client.send_empty(request).await?;

        info!("Order confirmation delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiConfig;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_notify_posts_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/whatsapp/send"))
            .and(body_json(json!({"message": "Total: $ 6.000"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WhatsAppNotifier::new(ApiClient::new(ApiConfig::new(server.uri())).unwrap());
        notifier.notify("Total: $ 6.000").await.unwrap();
    }

    #[tokio::test]
    async fn test_unpaired_channel_surfaces_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/whatsapp/send"))
            .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "WhatsApp not connected"})))
            .mount(&server)
            .await;

        let notifier = WhatsAppNotifier::new(ApiClient::new(ApiConfig::new(server.uri())).unwrap());
        let err = notifier.notify("hello").await.unwrap_err();
        assert!(err.to_string().contains("WhatsApp not connected"));
    }
}
