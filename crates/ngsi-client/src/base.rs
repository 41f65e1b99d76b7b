//! Request plumbing shared by the service clients

use std::sync::Arc;
use std::time::Duration;

use ngsi_core::FiwareHeader;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use url::Url;

use crate::error::{NgsiClientError, Result};
use crate::types::ErrorResponse;

/// Default request timeout
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
pub(crate) const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Tenant header shared between clients
pub type SharedHeader = Arc<RwLock<FiwareHeader>>;

/// Base URL, connection pool and tenant of one remote service
#[derive(Debug, Clone)]
pub(crate) struct ServiceEndpoint {
    client: Client,
    base_url: Url,
    header: SharedHeader,
}

impl ServiceEndpoint {
    pub(crate) fn new(
        base_url: &str,
        header: SharedHeader,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .build()?;

        let base_url = Url::parse(base_url)?;

        Ok(Self {
            client,
            base_url,
            header,
        })
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn header(&self) -> &SharedHeader {
        &self.header
    }

    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    /// URL built from path segments, each percent-encoded on its own
    ///
    /// Ids and names are pushed as single segments, so `/` and `%` inside
    /// them are escaped. `.` and `..` cannot be addressed and are rejected.
    pub(crate) fn resource_url(&self, segments: &[&str]) -> Result<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || **s == "." || **s == "..")
        {
            return Err(NgsiClientError::InvalidPathSegment(bad.to_string()));
        }

        let mut resource = self.base_url.clone();
        resource
            .path_segments_mut()
            .map_err(|_| {
                NgsiClientError::InvalidUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase)
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(resource)
    }

    /// Tenant headers for the next request; an empty service is omitted
    fn tenant_headers(&self) -> Result<HeaderMap> {
        let header = self.header.read();
        let mut map = HeaderMap::new();
        for (name, value) in header.header_pairs() {
            if value.is_empty() {
                continue;
            }
            let value = HeaderValue::from_str(value)
                .map_err(|e| NgsiClientError::ParseError(format!("Invalid {} header: {}", name, e)))?;
            map.insert(name, value);
        }
        Ok(map)
    }

    /// Start a request carrying the tenant headers
    pub(crate) fn request(&self, method: Method, url: Url) -> Result<RequestBuilder> {
        Ok(self.client.request(method, url).headers(self.tenant_headers()?))
    }

    /// Deserialize a successful response body
    pub(crate) async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| NgsiClientError::ParseError(e.to_string()))
        } else {
            Err(self.extract_error_from_status(response, status).await)
        }
    }

    /// Check a response whose body is irrelevant
    pub(crate) async fn handle_empty(&self, response: reqwest::Response) -> Result<()> {
        let status = response.status();

        if status.is_success() {
            Ok(())
        } else {
            Err(self.extract_error_from_status(response, status).await)
        }
    }

    pub(crate) async fn extract_error_from_status(
        &self,
        response: reqwest::Response,
        status: StatusCode,
    ) -> NgsiClientError {
        let message = match response.json::<ErrorResponse>().await {
            Ok(err) if !err.error.is_empty() => err.message(),
            _ => format!("HTTP {}", status),
        };

        match status {
            StatusCode::NOT_FOUND => NgsiClientError::NotFound(message),
            StatusCode::CONFLICT => NgsiClientError::AlreadyExists(message),
            StatusCode::UNPROCESSABLE_ENTITY if message.contains("Already Exists") => {
                NgsiClientError::AlreadyExists(message)
            }
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => NgsiClientError::Timeout,
            _ => NgsiClientError::server_error(status.as_u16(), message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint(header: FiwareHeader) -> ServiceEndpoint {
        ServiceEndpoint::new(
            "http://localhost:1026",
            Arc::new(RwLock::new(header)),
            DEFAULT_TIMEOUT,
            DEFAULT_CONNECT_TIMEOUT,
        )
        .unwrap()
    }

    #[test]
    fn test_tenant_headers() {
        let ep = endpoint(FiwareHeader::new("smartcity", "/testing").unwrap());
        let headers = ep.tenant_headers().unwrap();
        assert_eq!(headers["fiware-service"], "smartcity");
        assert_eq!(headers["fiware-servicepath"], "/testing");
    }

    #[test]
    fn test_default_tenant_omits_service() {
        let ep = endpoint(FiwareHeader::default());
        let headers = ep.tenant_headers().unwrap();
        assert!(headers.get("fiware-service").is_none());
        assert_eq!(headers["fiware-servicepath"], "/");
    }

    #[test]
    fn test_resource_url_encodes_segments() {
        let ep = endpoint(FiwareHeader::default());

        let url = ep.resource_url(&["v2", "entities", "a%2Fb", "attrs"]).unwrap();
        assert_eq!(url.path(), "/v2/entities/a%252Fb/attrs");

        let url = ep.resource_url(&["v2", "entities", "a/b", "attrs", "ns:temp"]).unwrap();
        assert_eq!(url.path(), "/v2/entities/a%2Fb/attrs/ns:temp");

        let url = ep.resource_url(&["v2", "entities", "...", "attrs"]).unwrap();
        assert_eq!(url.path(), "/v2/entities/.../attrs");
    }

    #[test]
    fn test_resource_url_rejects_dot_segments() {
        let ep = endpoint(FiwareHeader::default());
        for id in ["..", ".", ""] {
            assert!(matches!(
                ep.resource_url(&["v2", "entities", id]),
                Err(NgsiClientError::InvalidPathSegment(_))
            ));
        }
    }

    #[test]
    fn test_resource_url_keeps_base_path() {
        let ep = ServiceEndpoint::new(
            "http://localhost:8080/orion/",
            Arc::new(RwLock::new(FiwareHeader::default())),
            DEFAULT_TIMEOUT,
            DEFAULT_CONNECT_TIMEOUT,
        )
        .unwrap();
        let url = ep.resource_url(&["v2", "entities", "Room1"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/orion/v2/entities/Room1");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ServiceEndpoint::new(
            "not a url",
            Arc::new(RwLock::new(FiwareHeader::default())),
            DEFAULT_TIMEOUT,
            DEFAULT_CONNECT_TIMEOUT,
        );
        assert!(matches!(result, Err(NgsiClientError::InvalidUrl(_))));
    }
}
