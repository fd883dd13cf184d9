//! [`DestinationApi`] over the negotiated HTTP transport.

use crate::destination::{
    DestId, DestinationApi, DestinationFault, DestinationResult, ImageTarget, NewCategory,
    NewProduct, NewVariation,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shopmove_storage::KvStore;
use shopmove_transport::{HttpTransport, Method, Policies, RequestArgs};
use tracing::debug;
use url::Url;

/// A destination store reached through a JSON REST API.
///
/// Every call goes through [`HttpTransport`], so each endpoint negotiates
/// its back-end independently. Nothing is retried here.
pub struct HttpDestination<S: KvStore> {
    transport: HttpTransport<S>,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    #[serde(default)]
    categories_enabled: bool,
}

#[derive(Deserialize)]
struct Page {
    total: usize,
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    id: DestId,
    #[serde(default)]
    is_sample_product: bool,
}

#[derive(Deserialize)]
struct Created {
    id: DestId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    error_message: Option<String>,
}

impl<S: KvStore> HttpDestination<S> {
    /// Creates a destination rooted at `base_url`.
    pub fn new(transport: HttpTransport<S>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
            token: None,
        }
    }

    /// Sends `token` as a bearer credential.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Returns the transport.
    pub fn transport(&self) -> &HttpTransport<S> {
        &self.transport
    }

    /// Resolves `path` against the base URL.
    fn endpoint(&self, path: &str) -> DestinationResult<Url> {
        let raw = format!("{}/{path}", self.base_url);
        Url::parse(&raw)
            .map_err(|e| DestinationFault::Transport(format!("invalid endpoint {raw}: {e}")))
    }

    fn send(
        &self,
        method: Method,
        name: &str,
        url: Url,
        mut args: RequestArgs,
    ) -> DestinationResult<Vec<u8>> {
        if let Some(token) = &self.token {
            args = args.with_header("Authorization", format!("Bearer {token}"));
        }

        let mut call = self.transport.create(method, name, url, Policies::none());
        let Some(processed) = call.do_request(args) else {
            let message = call
                .error_message()
                .unwrap_or("no transport delivered the request")
                .to_string();
            return Err(DestinationFault::Transport(message));
        };

        let meta = call.response_meta();
        if !meta.is_success() {
            let status = meta.code.unwrap_or_default();
            debug!(request = name, status, "destination rejected request");
            return Err(DestinationFault::api(status, error_message(&meta.data)));
        }
        Ok(processed.body().map(<[u8]>::to_vec).unwrap_or_default())
    }

    fn get<T: DeserializeOwned>(&self, name: &str, url: Url) -> DestinationResult<T> {
        let body = self.send(Method::Get, name, url, RequestArgs::new())?;
        decode(&body)
    }

    fn send_json<B: Serialize, T: DeserializeOwned>(
        &self,
        method: Method,
        name: &str,
        path: &str,
        body: &B,
    ) -> DestinationResult<T> {
        let args = RequestArgs::new()
            .with_json(body)
            .map_err(|e| DestinationFault::Malformed(e.to_string()))?;
        let body = self.send(method, name, self.endpoint(path)?, args)?;
        decode(&body)
    }
}

impl<S: KvStore> DestinationApi for HttpDestination<S> {
    fn supports_categories(&self) -> DestinationResult<bool> {
        let profile: Profile = self.get("profile", self.endpoint("profile")?)?;
        Ok(profile.categories_enabled)
    }

    fn count_products(&self) -> DestinationResult<usize> {
        let page: Page = self.get("products", self.endpoint("products?limit=1")?)?;
        Ok(page.total)
    }

    fn count_categories(&self) -> DestinationResult<usize> {
        let page: Page = self.get("categories", self.endpoint("categories?limit=1")?)?;
        Ok(page.total)
    }

    fn list_demo_products(&self, limit: usize) -> DestinationResult<Vec<DestId>> {
        let mut url = self.endpoint("products")?;
        url.query_pairs_mut().append_pair("limit", &limit.to_string());
        let page: Page = self.get("products", url)?;
        Ok(page
            .items
            .into_iter()
            .filter(|item| item.is_sample_product)
            .map(|item| item.id)
            .collect())
    }

    fn create_category(&self, category: &NewCategory) -> DestinationResult<DestId> {
        let created: Created = self.send_json(Method::Post, "categories", "categories", category)?;
        Ok(created.id)
    }

    fn create_product(&self, product: &NewProduct) -> DestinationResult<DestId> {
        let created: Created = self.send_json(Method::Post, "products", "products", product)?;
        Ok(created.id)
    }

    fn find_product_by_sku(&self, sku: &str) -> DestinationResult<Option<DestId>> {
        let mut url = self.endpoint("products")?;
        url.query_pairs_mut().append_pair("sku", sku);
        let page: Page = self.get("product_by_sku", url)?;
        Ok(page.items.first().map(|item| item.id))
    }

    fn update_product(&self, id: DestId, product: &NewProduct) -> DestinationResult<()> {
        self.send_json::<_, serde_json::Value>(
            Method::Put,
            "product",
            &format!("products/{id}"),
            product,
        )?;
        Ok(())
    }

    fn create_variation(
        &self,
        product: DestId,
        variation: &NewVariation,
    ) -> DestinationResult<DestId> {
        let created: Created = self.send_json(
            Method::Post,
            "combinations",
            &format!("products/{product}/combinations"),
            variation,
        )?;
        Ok(created.id)
    }

    fn upload_image(&self, target: ImageTarget, bytes: &[u8]) -> DestinationResult<()> {
        let path = match target {
            ImageTarget::Category(id) => format!("categories/{id}/image"),
            ImageTarget::Product(id) => format!("products/{id}/image"),
            ImageTarget::Variation { product, variation } => {
                format!("products/{product}/combinations/{variation}/image")
            }
            ImageTarget::Gallery { product, .. } => format!("products/{product}/gallery"),
        };
        let args = RequestArgs::new()
            .with_header("Content-Type", "application/octet-stream")
            .with_body(bytes.to_vec());
        self.send(Method::Post, "image", self.endpoint(&path)?, args)?;
        Ok(())
    }

    fn delete_products(&self, ids: &[DestId]) -> DestinationResult<()> {
        for id in ids {
            let url = self.endpoint(&format!("products/{id}"))?;
            self.send(Method::Delete, "product", url, RequestArgs::new())?;
        }
        Ok(())
    }
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> DestinationResult<T> {
    serde_json::from_slice(body).map_err(|e| DestinationFault::Malformed(e.to_string()))
}

/// Extracts `errorMessage` from an error body.
fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|body| body.error_message)
}
