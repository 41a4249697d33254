//! Generic REST handlers, one set shared by every resource

use crate::core::crud::Crud;
use crate::core::error::{AdminError, AdminResult, ValidationError};
use crate::core::query::RawQuery;
use crate::core::resource::Resource;
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{OriginalUri, Path, State};
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;
use url::Url;

/// Per-resource handler state
pub struct ResourceState<T: Resource> {
    pub crud: Crud<T>,
    /// Base the request path is resolved against for pagination links
    pub public_url: Url,
}

impl<T: Resource> Clone for ResourceState<T> {
    fn clone(&self) -> Self {
        Self {
            crud: self.crud.clone(),
            public_url: self.public_url.clone(),
        }
    }
}

impl<T: Resource> ResourceState<T> {
    pub fn new(crud: Crud<T>, public_url: Url) -> Self {
        Self { crud, public_url }
    }

    /// Absolute URL of the current request
    fn current_url(&self, uri: &Uri) -> AdminResult<Url> {
        let path_and_query = uri.path_and_query().map_or("/", |pq| pq.as_str());
        self.public_url
            .join(path_and_query)
            .map_err(|e| AdminError::Internal(format!("cannot build request URL: {}", e)))
    }
}

fn raw_query(uri: &Uri) -> RawQuery {
    RawQuery::from_query_str(uri.query().unwrap_or(""))
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> AdminResult<Value> {
    match body {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(ValidationError::field(
            "body",
            Value::Null,
            "json",
            rejection.body_text(),
        )
        .into()),
    }
}

/// `GET /{plural}`
pub async fn list_resources<T: Resource>(
    State(state): State<ResourceState<T>>,
    OriginalUri(uri): OriginalUri,
) -> Result<Response, AdminError> {
    let current = state.current_url(&uri)?;
    let page = state.crud.list(&raw_query(&uri), &current).await?;

    let mut response = Json(page.items).into_response();
    if let Some(links) = page.links.to_header_value() {
        let value = HeaderValue::from_str(&links)
            .map_err(|e| AdminError::Internal(format!("invalid Link header: {}", e)))?;
        response.headers_mut().insert(header::LINK, value);
    }
    Ok(response)
}

/// `GET /{plural}/{id}`
pub async fn read_resource<T: Resource>(
    State(state): State<ResourceState<T>>,
    Path(id): Path<String>,
    OriginalUri(uri): OriginalUri,
) -> Result<Json<Value>, AdminError> {
    Ok(Json(state.crud.read(&id, &raw_query(&uri)).await?))
}

/// `POST /{plural}`
pub async fn create_resource<T: Resource>(
    State(state): State<ResourceState<T>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AdminError> {
    let body = json_body(body)?;
    Ok(Json(state.crud.create(&body).await?))
}

/// `PUT /{plural}/{id}`
pub async fn update_resource<T: Resource>(
    State(state): State<ResourceState<T>>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, AdminError> {
    let body = json_body(body)?;
    Ok(Json(state.crud.update(&id, &body).await?))
}

/// `DELETE /{plural}/{id}`
pub async fn delete_resource<T: Resource>(
    State(state): State<ResourceState<T>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AdminError> {
    state.crud.destroy(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
