//! The remote data source seam and the typed loaders built on top of it.

use super::endpoints::ApiRequest;
use super::types::Envelope;
use crate::error::FetchError;
use crate::pagination::{Listing, PaginationMeta};
use crate::validation::{validate, validate_one, Record};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Anything that can answer a GET request with a JSON body
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn get_json(&self, request: &ApiRequest) -> Result<Value, FetchError>;
}

/// Shared handle passed to every controller
pub type SharedSource = Arc<dyn DataSource>;

/// Load one page of a paginated list endpoint
pub async fn fetch_listing<R: Record>(
    source: SharedSource,
    request: ApiRequest,
) -> Result<Listing<R>, FetchError> {
    let envelope = Envelope::from_value(source.get_json(&request).await?)?;
    let items = validate(&envelope.data)?;
    let pagination = PaginationMeta::from_envelope(envelope.pagination.as_ref(), request.page())?;
    Ok(Listing::new(items, pagination))
}

/// Load an unpaginated list endpoint
pub async fn fetch_list<R: Record>(
    source: SharedSource,
    request: ApiRequest,
) -> Result<Vec<R>, FetchError> {
    let envelope = Envelope::from_value(source.get_json(&request).await?)?;
    validate(&envelope.data)
}

/// Load a list nested under `data.<field>` (e.g. `data.promo` of the videos endpoint)
pub async fn fetch_nested_list<R: Record>(
    source: SharedSource,
    request: ApiRequest,
    field: &'static str,
) -> Result<Vec<R>, FetchError> {
    let envelope = Envelope::from_value(source.get_json(&request).await?)?;
    let nested = envelope
        .data
        .get(field)
        .ok_or_else(|| FetchError::malformed(format!("missing `data.{}`", field)))?;
    validate(nested)
}

/// Load a single entity
pub async fn fetch_entity<R: Record>(
    source: SharedSource,
    request: ApiRequest,
) -> Result<Option<R>, FetchError> {
    let envelope = Envelope::from_value(source.get_json(&request).await?)?;
    validate_one(&envelope.data)
}
