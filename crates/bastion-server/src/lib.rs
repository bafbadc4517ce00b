// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Bastion HTTP server.
//!
//! Serves sign-in, the resolved user session, team membership, tickets,
//! documents and streamed AI suggestions over a SQLite database.

pub mod api;
pub mod auth_middleware;
pub mod error;
pub mod identity;
pub mod routes;
pub mod session_registry;
pub mod version;

pub use api::{create_app_state, create_router, AppState};
pub use bastion_server_config::ServerConfig;
pub use error::{ErrorResponse, ServerError};
pub use identity::{IdentityError, IdentityVerifier};
pub use session_registry::{SessionRegistry, SharedSession};
