use crate::error::ConfigError;
use hyper::header::HeaderValue;
use hyper::Method;
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer};

const MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// Which cross-origin callers get CORS headers.
#[derive(Clone, Debug, PartialEq)]
pub enum CorsPolicy {
    Disabled,
    AllowAny,
    AllowList(Vec<HeaderValue>),
}

impl CorsPolicy {
    /// `*` allows any origin, an empty string disables CORS, anything else
    /// is a comma separated list of origins.
    pub fn from_setting(setting: &str) -> Result<CorsPolicy, ConfigError> {
        let setting = setting.trim();
        if setting.is_empty() {
            return Ok(CorsPolicy::Disabled);
        }

        let origins: Vec<&str> = setting
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .collect();
        if origins.contains(&"*") {
            return Ok(CorsPolicy::AllowAny);
        }

        origins
            .into_iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .map_err(|_| ConfigError::InvalidOrigin(origin.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()
            .map(CorsPolicy::AllowList)
    }

    /// The layer enforcing this policy, or `None` when CORS is off.
    pub fn layer(&self) -> Option<CorsLayer> {
        let allow_origin: AllowOrigin = match self {
            CorsPolicy::Disabled => return None,
            CorsPolicy::AllowAny => Any.into(),
            CorsPolicy::AllowList(origins) => AllowOrigin::list(origins.iter().cloned()),
        };

        let layer = CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods(AllowMethods::list(vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::HEAD,
                Method::OPTIONS,
            ]))
            .allow_headers(AllowHeaders::mirror_request())
            .max_age(MAX_AGE);
        Some(layer)
    }
}

impl Default for CorsPolicy {
    fn default() -> Self {
        CorsPolicy::AllowAny
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::{header, Body, Request, Response, StatusCode};
    use pretty_assertions::assert_eq;
    use std::convert::Infallible;
    use tower::{service_fn, ServiceBuilder, ServiceExt};

    fn preflight_request(origin: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/todos")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PUT")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap()
    }

    async fn through_layer(policy: &CorsPolicy, req: Request<Body>) -> Response<Body> {
        let inner = service_fn(|_req: Request<Body>| async {
            Ok::<_, Infallible>(Response::new(Body::empty()))
        });
        ServiceBuilder::new()
            .layer(policy.layer().unwrap())
            .service(inner)
            .oneshot(req)
            .await
            .unwrap()
    }

    #[test]
    fn parses_settings() {
        assert_eq!(CorsPolicy::from_setting("*").unwrap(), CorsPolicy::AllowAny);
        assert_eq!(CorsPolicy::from_setting("  ").unwrap(), CorsPolicy::Disabled);
        assert_eq!(
            CorsPolicy::from_setting("http://a.test, http://b.test").unwrap(),
            CorsPolicy::AllowList(vec![
                HeaderValue::from_static("http://a.test"),
                HeaderValue::from_static("http://b.test"),
            ])
        );
        assert_eq!(
            CorsPolicy::from_setting("http://a.test,*").unwrap(),
            CorsPolicy::AllowAny
        );
    }

    #[test]
    fn rejects_unusable_origin() {
        let err = CorsPolicy::from_setting("http://a.test,bad\norigin").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidOrigin(_)));
    }

    #[test]
    fn disabled_policy_has_no_layer() {
        assert!(CorsPolicy::Disabled.layer().is_none());
    }

    #[tokio::test]
    async fn allow_any_answers_preflight() {
        let response = through_layer(
            &CorsPolicy::AllowAny,
            preflight_request("http://anywhere.test"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "content-type");
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "43200");
        let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
        assert!(methods.contains("PUT"));
        assert!(methods.contains("DELETE"));
    }

    #[tokio::test]
    async fn allow_list_echoes_known_origin() {
        let policy = CorsPolicy::from_setting("http://a.test").unwrap();
        let req = Request::builder()
            .uri("/todos")
            .header(header::ORIGIN, "http://a.test")
            .body(Body::empty())
            .unwrap();
        let response = through_layer(&policy, req).await;
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "http://a.test"
        );
    }

    #[tokio::test]
    async fn allow_list_ignores_unknown_origin() {
        let policy = CorsPolicy::from_setting("http://a.test").unwrap();
        let response = through_layer(&policy, preflight_request("http://evil.test")).await;
        assert!(!response
            .headers()
            .contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
