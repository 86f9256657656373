//! HTTP implementation of [`CommerceApi`].

use std::sync::Arc;

use kiosk_core::{PaymentReference, PaymentStatus, Product, ProductId};
use reqwest::RequestBuilder;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};
use url::Url;
use uuid::Uuid;

use super::cache::ProductCache;
use super::conversions::{convert_cart, convert_coupon, convert_product, convert_remote_cart};
use super::types::{
    AddToCartRequest, ApiResponse, ApplyCouponRequest, CartPayload, ConfirmPaymentRequest,
    CouponPayload, RemovedItemPayload, UpdateQuantityRequest,
};
use super::{ApiError, CommerceApi, Freshness};
use crate::cart::{CartContents, Coupon, RemoteCart};
use crate::config::CommerceApiConfig;

/// Header carrying a per-request correlation id.
const REQUEST_ID_HEADER: &str = "x-request-id";

// =============================================================================
// CommerceClient
// =============================================================================

/// Client for the commerce API.
///
/// Cheap to clone; clones share the connection pool and product cache.
#[derive(Clone)]
pub struct CommerceClient {
    inner: Arc<CommerceClientInner>,
}

struct CommerceClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: ProductCache,
}

impl std::fmt::Debug for CommerceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceClient")
            .field("base_url", &self.inner.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CommerceClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if the access token is not a valid header value or
    /// the HTTP client cannot be built.
    pub fn new(config: &CommerceApiConfig) -> Result<Self, ApiError> {
        let mut auth = HeaderValue::from_str(&format!(
            "Bearer {}",
            config.access_token.expose_secret()
        ))
        .map_err(|_| ApiError::InvalidData("access token is not a valid header value".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(CommerceClientInner {
                client,
                base_url: config.base_url.clone(),
                cache: ProductCache::new(config.product_cache_ttl),
            }),
        })
    }

    /// Build an endpoint URL from path segments. Segments are percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.inner.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Send a request and parse the response envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<ApiResponse<T>, ApiError> {
        let request_id = Uuid::new_v4().to_string();
        let response = request
            .header(REQUEST_ID_HEADER, &request_id)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                request_id = %request_id,
                body = %body.chars().take(500).collect::<String>(),
                "Commerce API returned non-success status"
            );
            return Err(status_error(status.as_u16(), &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(
                error = %e,
                request_id = %request_id,
                body = %body.chars().take(500).collect::<String>(),
                "Failed to parse commerce API response"
            );
            ApiError::Parse(e)
        })
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Product, ApiError> {
        let url = self.endpoint(&["products", product_id.as_str()])?;
        let response: ApiResponse<Product> = self.send(self.inner.client.get(url)).await?;
        convert_product(response.into_data("product")?)
    }

    async fn post_add_to_cart(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartContents, ApiError> {
        let url = self.endpoint(&["cart", "add-to-cart"])?;
        let body = AddToCartRequest {
            product_id,
            quantity,
        };
        let response: ApiResponse<CartPayload> =
            self.send(self.inner.client.post(url).json(&body)).await?;
        convert_cart(response.into_data("cart")?)
    }
}

impl CommerceApi for CommerceClient {
    #[instrument(skip(self))]
    async fn fetch_cart(&self) -> Result<RemoteCart, ApiError> {
        let url = self.endpoint(&["cart"])?;
        let response: ApiResponse<CartPayload> = self.send(self.inner.client.get(url)).await?;
        convert_remote_cart(response.into_data("cart")?)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn add_to_cart(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartContents, ApiError> {
        let result = self.post_add_to_cart(product_id, quantity).await;
        if result.is_err() {
            // Stock may have moved; the next read must hit the catalog.
            self.inner.cache.invalidate(product_id).await;
        }
        result
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn update_quantity(
        &self,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<CartContents, ApiError> {
        let url = self.endpoint(&["cart", "item", product_id.as_str()])?;
        let body = UpdateQuantityRequest { quantity };
        let response: ApiResponse<CartPayload> =
            self.send(self.inner.client.patch(url).json(&body)).await?;
        convert_cart(response.into_data("cart")?)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn remove_item(&self, product_id: &ProductId) -> Result<ProductId, ApiError> {
        let url = self.endpoint(&["cart", "item", product_id.as_str()])?;
        let response: ApiResponse<RemovedItemPayload> =
            self.send(self.inner.client.delete(url)).await?;
        Ok(response.into_data("removed item")?.product_id)
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), ApiError> {
        let url = self.endpoint(&["cart"])?;
        let response: ApiResponse<serde_json::Value> =
            self.send(self.inner.client.delete(url)).await?;
        response.into_ack()
    }

    #[instrument(skip(self, code))]
    async fn apply_coupon(&self, code: &str) -> Result<Coupon, ApiError> {
        let url = self.endpoint(&["cart", "coupon"])?;
        let body = ApplyCouponRequest { code };
        let response: ApiResponse<CouponPayload> =
            self.send(self.inner.client.post(url).json(&body)).await?;
        convert_coupon(response.into_data("coupon")?)
    }

    #[instrument(skip(self), fields(reference = %reference))]
    async fn confirm_payment(
        &self,
        reference: &PaymentReference,
        status: PaymentStatus,
    ) -> Result<(), ApiError> {
        let url = self.endpoint(&["payment", "confirm"])?;
        let body = ConfirmPaymentRequest {
            payment_reference: reference,
            status,
        };
        let response: ApiResponse<serde_json::Value> =
            self.send(self.inner.client.post(url).json(&body)).await?;
        response.into_ack()
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn fetch_product(
        &self,
        product_id: &ProductId,
        freshness: Freshness,
    ) -> Result<Product, ApiError> {
        if freshness == Freshness::Cached
            && let Some(product) = self.inner.cache.get(product_id).await
        {
            debug!("Cache hit for product");
            return Ok(product);
        }

        let product = self.get_product(product_id).await?;
        self.inner.cache.insert(product.clone()).await;
        Ok(product)
    }
}

/// Error for a non-success response. Only a message from a response envelope
/// is kept; raw bodies stay in the logs.
fn status_error(status: u16, body: &str) -> ApiError {
    let message = serde_json::from_str::<ApiResponse<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.message);
    ApiError::Status { status, message }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::SecretString;

    use crate::config::StorefrontConfig;

    fn client(base: &str) -> CommerceClient {
        let config =
            StorefrontConfig::for_base_url(base, SecretString::from("kiosk-live-token-1234"))
                .unwrap();
        CommerceClient::new(&config.api).unwrap()
    }

    #[test]
    fn test_endpoint_appends_segments() {
        let client = client("https://api.kiosk.test/v1");
        let url = client.endpoint(&["cart", "item", "p-1"]).unwrap();
        assert_eq!(url.as_str(), "https://api.kiosk.test/v1/cart/item/p-1");
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let client = client("https://api.kiosk.test/");
        let url = client.endpoint(&["products", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "https://api.kiosk.test/products/a%2Fb%20c");
    }

    #[test]
    fn test_status_error_keeps_envelope_message_only() {
        let err = status_error(409, r#"{"success":false,"message":"Cart belongs to another shop"}"#);
        assert_eq!(err.reason(), Some("Cart belongs to another shop"));

        let err = status_error(502, "<html><body>Bad Gateway</body></html>");
        assert!(matches!(err, ApiError::Status { status: 502, message: None }));
        assert_eq!(err.reason(), None);
    }

    #[test]
    fn test_debug_hides_token() {
        let client = client("https://api.kiosk.test/");
        let debug = format!("{client:?}");
        assert!(!debug.contains("kiosk-live-token-1234"));
    }
}
