use crate::cors::CorsPolicy;
use crate::error::{ApiError, StoreError};
use crate::models::{Todo, TodoPayload};
use crate::store::Store;
use bytes::Buf;
use hyper::{header, Body, Method, Request, Response, StatusCode};
use log::{info, warn};
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::time::Instant;
use tower::util::BoxCloneService;
use tower::{service_fn, BoxError, ServiceBuilder};

type Result<T> = std::result::Result<T, ApiError>;

pub type TodoService = BoxCloneService<Request<Body>, Response<Body>, BoxError>;

/// The todo handlers, holding the storage handle they share.
#[derive(Clone)]
pub struct App {
    store: Store,
}

impl App {
    pub fn new(store: Store) -> App {
        App { store }
    }

    /// Wraps the router in the CORS layer for `cors`, if any.
    pub fn into_service(self, cors: &CorsPolicy) -> TodoService {
        let router = service_fn(move |req: Request<Body>| {
            let app = self.clone();
            async move { Ok::<_, Infallible>(app.handle(req).await) }
        });
        let service = ServiceBuilder::new()
            .option_layer(cors.layer())
            .service(router);
        BoxCloneService::new(service)
    }

    /// Routes one request and always produces a response.
    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let started = Instant::now();
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let response = match self.route(req).await {
            Ok(response) => response,
            Err(err) => err.into_response(),
        };

        info!(
            "{} {} {} {:?}",
            method,
            path,
            response.status().as_u16(),
            started.elapsed()
        );
        response
    }

    async fn route(&self, req: Request<Body>) -> Result<Response<Body>> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();

        match (&method, segments.as_slice()) {
            (&Method::GET, ["todos"]) => self.list_todos().await,
            (&Method::POST, ["todos"]) => self.create_todo(req).await,
            (&Method::PUT, ["todos", id]) => self.update_todo(parse_id(id), req).await,
            (&Method::DELETE, ["todos", id]) => self.delete_todo(parse_id(id)).await,
            _ => Err(ApiError::RouteNotFound),
        }
    }

    async fn list_todos(&self) -> Result<Response<Body>> {
        let todos = self.with_store(|store| store.list()).await?;
        info!("todos: {:?}", todos);
        json_response(StatusCode::OK, &todos)
    }

    async fn create_todo(&self, req: Request<Body>) -> Result<Response<Body>> {
        let payload = match decode_payload(req).await {
            Ok(payload) => payload,
            Err(err) => {
                warn!("error creating todo: {}", err);
                return Err(err);
            }
        };

        let todo = self
            .with_store(move |store| store.create(&payload.to_new_todo()))
            .await?;
        info!("new todo created: {:?}", todo);
        json_response(StatusCode::CREATED, &todo)
    }

    async fn update_todo(&self, id: Option<i32>, req: Request<Body>) -> Result<Response<Body>> {
        let mut todo = match id {
            Some(id) => self.with_store(move |store| store.find(id)).await?,
            None => None,
        }
        .ok_or(ApiError::NotFound)?;

        let payload = decode_payload(req).await?;
        payload.apply_to(&mut todo);

        let saved = self.save_existing(todo).await?;
        json_response(StatusCode::OK, &saved)
    }

    /// Saves a record loaded earlier in the request. The row may have been
    /// deleted since; that is reported as not found.
    async fn save_existing(&self, todo: Todo) -> Result<Todo> {
        let (updated, todo) = self
            .with_store(move |store| store.save(&todo).map(|updated| (updated, todo)))
            .await?;
        if updated == 0 {
            return Err(ApiError::NotFound);
        }
        Ok(todo)
    }

    async fn delete_todo(&self, id: Option<i32>) -> Result<Response<Body>> {
        if let Some(id) = id {
            self.with_store(move |store| store.delete(id)).await?;
        }
        json_response(StatusCode::OK, &json!({ "message": "todo deleted" }))
    }

    /// Runs a synchronous storage call on the blocking pool.
    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Store) -> std::result::Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        let result = tokio::task::spawn_blocking(move || f(&store)).await?;
        Ok(result?)
    }
}

/// Path ids that are not integers can never match a row.
fn parse_id(raw: &str) -> Option<i32> {
    raw.parse().ok()
}

/// A `null` body is an empty payload: nothing to overwrite.
async fn decode_payload(req: Request<Body>) -> Result<TodoPayload> {
    let whole_body = hyper::body::to_bytes(req.into_body())
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let payload: Option<TodoPayload> = serde_json::from_reader(whole_body.reader())
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    Ok(payload.unwrap_or_default())
}

fn json_response<T: Serialize>(status: StatusCode, data: &T) -> Result<Response<Body>> {
    let json = serde_json::to_string(data).map_err(|e| ApiError::Internal(e.to_string()))?;
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json))
        .map_err(|e| ApiError::Internal(e.to_string()))
}
