//! Root category discovery
//!
//! The menu endpoint is fetched once per run. Any failure here is fatal: with
//! no roots there is nothing to walk.

use crate::crawler::category::{decode_categories, CategoryNode};
use crate::CatwalkError;
use reqwest::Client;

/// Fetches and decodes the root category list from `url`
pub async fn fetch_root_categories(
    client: &Client,
    url: &str,
) -> Result<Vec<CategoryNode>, CatwalkError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| CatwalkError::Bootstrap {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(CatwalkError::BootstrapStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|source| CatwalkError::Bootstrap {
            url: url.to_string(),
            source,
        })?;

    decode_categories(&bytes).map_err(|source| CatwalkError::BootstrapDecode {
        url: url.to_string(),
        source,
    })
}
