// crates.io
use reqwest::{
	Body, Method,
	header::{HeaderMap, HeaderName, HeaderValue},
};

/// Outbound request addressed relative to a downstream API's base address.
///
/// Everything set here reaches the downstream API unchanged except `Authorization`, which the
/// dispatcher always replaces with the broker's bearer token.
#[derive(Debug)]
pub struct OutboundRequest {
	/// HTTP method.
	pub method: Method,
	/// Path (and optional query) relative to the API base address.
	pub path: String,
	/// Additional request headers.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Body>,
}
impl OutboundRequest {
	/// Creates a body-less request.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: HeaderMap::new(), body: None }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::GET, path)
	}

	/// Appends a header.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.append(name, value);

		self
	}

	/// Sets the request body.
	pub fn body(mut self, body: impl Into<Body>) -> Self {
		self.body = Some(body.into());

		self
	}
}
