use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use inventaris_core::ProductId;
use inventaris_products::ProductPatch;

use crate::app::routes::respond;
use crate::app::extract::JsonBody;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/categories", get(categories))
        .route("/bulk", post(bulk_action))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

pub async fn list_products(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<dto::ProductListParams>,
) -> axum::response::Response {
    let query = match params.query() {
        Ok(q) => q,
        Err(resp) => return resp,
    };
    let page = params.page_request(dto::PRODUCTS_PER_PAGE);

    match services.list_products(&query, page).await {
        Ok(page) => match page.try_map(|p| dto::product_to_json(&p)) {
            Ok(page) => (StatusCode::OK, Json(dto::PageBody::from(page))).into_response(),
            Err(resp) => resp,
        },
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    actor: ActorContext,
    JsonBody(body): JsonBody<dto::CreateProductRequest>,
) -> axum::response::Response {
    match services
        .create_product(body.product, body.sku, actor.into_actor())
        .await
    {
        Ok(product) => match dto::product_to_json(&product) {
            Ok(body) => (StatusCode::CREATED, Json(body)).into_response(),
            Err(resp) => resp,
        },
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_param(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.get_product(id).await {
        Ok(detail) => {
            let (mut body, transactions) = match (
                dto::product_to_json(&detail.product),
                errors::to_json(&detail.recent_transactions),
            ) {
                (Ok(body), Ok(transactions)) => (body, transactions),
                (Err(resp), _) | (_, Err(resp)) => return resp,
            };
            if let Some(map) = body.as_object_mut() {
                map.insert("recent_transactions".into(), transactions);
            }
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    JsonBody(patch): JsonBody<ProductPatch>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_param(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.update_product(id, patch).await {
        Ok(product) => match dto::product_to_json(&product) {
            Ok(body) => (StatusCode::OK, Json(body)).into_response(),
            Err(resp) => resp,
        },
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ProductId = match errors::parse_param(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.delete_product(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn categories(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    respond(StatusCode::OK, services.product_categories().await)
}

pub async fn bulk_action(
    Extension(services): Extension<Arc<AppServices>>,
    JsonBody(body): JsonBody<dto::BulkProductRequest>,
) -> axum::response::Response {
    respond(
        StatusCode::OK,
        services
            .bulk_product_action(body.action, &body.product_ids, body.category)
            .await,
    )
}
