//! HTTP routing, request/response codec, chunked-payload verification, and
//! the hyper service for the cargohold S3 gateway.
//!
//! - **Routing** ([`router`]): maps HTTP requests to [`cargohold_model::S3Operation`]
//!   by method, path, query parameters, and headers. Supports both path-style
//!   and virtual-hosted-style bucket addressing.
//! - **Request codec** ([`request`]): converts HTTP request parts into typed
//!   `cargohold_model::input::*` DTOs.
//! - **Response codec** ([`response`]): converts `cargohold_model::output::*`
//!   DTOs into HTTP responses with the right status, headers, and body.
//! - **Chunked payloads** ([`chunked`]): decodes and verifies `aws-chunked`
//!   streaming request bodies.
//! - **Dispatch** ([`dispatch`]): routes an identified operation to the
//!   matching `cargohold_engine` call.
//! - **Service** ([`service`]): the [`GatewayService`](service::GatewayService)
//!   hyper `Service` tying routing, auth, chunk decoding, dispatch, and common
//!   response headers together.
//! - **Body** ([`body`]): the [`S3ResponseBody`](body::S3ResponseBody) type.
//!
//! # Architecture
//!
//! ```text
//! HTTP Request
//!   -> GatewayService (hyper Service)
//!     -> Health check / CORS interception
//!     -> S3Router (virtual hosting + operation identification)
//!     -> Body collection
//!     -> x-amz-content-sha256 validation
//!     -> SigV4 / presigned authentication + bucket permission check
//!     -> aws-chunked decode + per-chunk signature verification
//!     -> dispatch (cargohold_engine::ops::*)
//!     -> Common response headers (x-amz-request-id, x-amz-id-2, Server, Date)
//!   <- HTTP Response
//! ```

pub mod body;
pub mod chunked;
pub mod dispatch;
pub mod request;
pub mod response;
pub mod router;
pub mod service;

pub use body::S3ResponseBody;
pub use router::{RoutingContext, RoutingError, S3Router};
pub use service::{GatewayService, ServiceConfig};
