//! Minimal clients for the two generation services a story session talks to.
//!
//! - [`Claude`]: the Anthropic Messages API, used for narrative text. A
//!   request can pin the reply to a JSON shape by forcing a single tool call
//!   whose input schema is that shape.
//! - [`ImageClient`]: an OpenAI-compatible `/images/generations` endpoint.
//!
//! Both clients are cheap to clone and hold no per-request state.

mod claude;
mod error;
mod images;

pub use claude::{Claude, OutputTool, Request, Response, StopReason, Usage};
pub use error::Error;
pub use images::{GeneratedImage, ImageClient, ImageSize};
