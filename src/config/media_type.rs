use std::task::{Context, Poll};

use axum::body::Body;
use axum::http::{header, HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use tower::{Layer, Service};

use crate::jsonapi::{ErrorDocument, ErrorObject, MEDIA_TYPE};

/// Plain JSON is accepted on the way in; responses always go out as
/// JSON:API.
const FALLBACK_MEDIA_TYPE: &str = "application/json";

/// Content negotiation for the JSON:API media type: rejects write requests
/// tagged with a foreign content type (415) and stamps
/// `application/vnd.api+json` on JSON responses.
#[derive(Clone)]
pub struct MediaTypeLayer;

impl<S> Layer<S> for MediaTypeLayer {
    type Service = MediaTypeService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MediaTypeService { inner }
    }
}

#[derive(Clone)]
pub struct MediaTypeService<S> {
    inner: S,
}

impl<S, ReqBody> Service<Request<ReqBody>> for MediaTypeService<S>
where
    S: Service<Request<ReqBody>, Response = Response<Body>>,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = MediaTypeFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        if carries_document(request.method()) {
            if let Some(content_type) = request.headers().get(header::CONTENT_TYPE) {
                let accepted = content_type
                    .to_str()
                    .map(acceptable_content_type)
                    .unwrap_or(false);
                if !accepted {
                    return MediaTypeFuture::Reject;
                }
            }
        }

        MediaTypeFuture::Forward {
            future: self.inner.call(request),
        }
    }
}

#[pin_project::pin_project(project = MediaTypeFutureProj)]
pub enum MediaTypeFuture<F> {
    Forward {
        #[pin]
        future: F,
    },
    Reject,
}

impl<F, E> std::future::Future for MediaTypeFuture<F>
where
    F: std::future::Future<Output = Result<Response<Body>, E>>,
{
    type Output = Result<Response<Body>, E>;

    fn poll(self: std::pin::Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project() {
            MediaTypeFutureProj::Forward { future } => match future.poll(cx) {
                Poll::Ready(Ok(mut response)) => {
                    stamp_media_type(response.headers_mut());
                    Poll::Ready(Ok(response))
                }
                Poll::Ready(Err(e)) => Poll::Ready(Err(e)),
                Poll::Pending => Poll::Pending,
            },
            MediaTypeFutureProj::Reject => Poll::Ready(Ok(rejection_response())),
        }
    }
}

/// Builds the 415 response. Errors go out as JSON:API error documents,
/// the same shape the handlers produce.
fn rejection_response() -> Response<Body> {
    let document = ErrorDocument::single(ErrorObject {
        status: StatusCode::UNSUPPORTED_MEDIA_TYPE.as_u16().to_string(),
        title: "Unsupported Media Type".to_string(),
        detail: format!("Requests with a document must use {MEDIA_TYPE}"),
        source: None,
    });
    let body = serde_json::to_vec(&document).unwrap_or_default();

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::UNSUPPORTED_MEDIA_TYPE;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
    response
}

fn carries_document(method: &Method) -> bool {
    *method == Method::POST || *method == Method::PATCH || *method == Method::PUT
}

/// Accepts the JSON:API media type and plain JSON, ignoring parameters such
/// as charset.
fn acceptable_content_type(value: &str) -> bool {
    let essence = value.split(';').next().unwrap_or("").trim();
    essence.eq_ignore_ascii_case(MEDIA_TYPE) || essence.eq_ignore_ascii_case(FALLBACK_MEDIA_TYPE)
}

/// Rewrites `application/json` responses to the JSON:API media type;
/// non-JSON responses pass through untouched.
fn stamp_media_type(headers: &mut HeaderMap) {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let essence = v.split(';').next().unwrap_or("").trim();
            essence.eq_ignore_ascii_case(FALLBACK_MEDIA_TYPE)
        })
        .unwrap_or(false);

    if is_json {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(MEDIA_TYPE));
    }
}

pub fn create_media_type_layer() -> MediaTypeLayer {
    MediaTypeLayer
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acceptable_content_types() {
        assert!(acceptable_content_type("application/vnd.api+json"));
        assert!(acceptable_content_type("application/vnd.api+json; charset=utf-8"));
        assert!(acceptable_content_type("application/json"));
        assert!(acceptable_content_type("Application/JSON"));
        assert!(!acceptable_content_type("text/plain"));
        assert!(!acceptable_content_type("application/xml"));
    }

    #[test]
    fn test_stamp_rewrites_json_only() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        stamp_media_type(&mut headers);
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            &HeaderValue::from_static(MEDIA_TYPE)
        );

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/html"));
        stamp_media_type(&mut headers);
        assert_eq!(
            headers.get(header::CONTENT_TYPE).unwrap(),
            &HeaderValue::from_static("text/html")
        );
    }

    #[tokio::test]
    async fn test_rejection_carries_error_document() {
        use http_body_util::BodyExt;

        let response = rejection_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            &HeaderValue::from_static(MEDIA_TYPE)
        );

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["errors"][0]["status"], "415");
        assert_eq!(body["errors"][0]["title"], "Unsupported Media Type");
    }

    #[test]
    fn test_only_write_methods_carry_documents() {
        assert!(carries_document(&Method::POST));
        assert!(carries_document(&Method::PATCH));
        assert!(!carries_document(&Method::GET));
        assert!(!carries_document(&Method::DELETE));
    }
}
