//! API Module
//!
//! HTTP facade over one shared cache manager.
//!
//! # Endpoints
//! - `PUT /set` - Store a JSON value
//! - `GET /get/:key` - Retrieve a value by key
//! - `GET /has/:key` - Check for a live key
//! - `DELETE /del/:key` - Delete a key
//! - `DELETE /tag/:tag` - Invalidate every key carrying a tag
//! - `POST /clear` - Drop all items
//! - `GET /keys` - List keys and stored size
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
