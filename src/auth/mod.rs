//! # Zoho OAuth2 Authentication Module
//!
//! ## Responsibilities:
//! - Authorization-code and refresh-token exchanges against Zoho accounts
//! - Process-wide credential cache with single-flight refresh
//! - Validation of the caller application token
//! - One-time authorization flow (`/auth/zoho`, `/auth/zoho/callback`)
//!
//! ## Layout:
//! - `config.rs`: OAuth2 settings
//! - `credential.rs`: credential value and token endpoint response
//! - `client.rs`: HTTP exchange client
//! - `token_manager.rs`: credential store
//! - `app_token.rs`: caller token decoding
//! - `handlers.rs`: HTTP handlers

pub mod app_token;
pub mod client;
pub mod config;
pub mod credential;
pub mod handlers;
pub mod token_manager;

pub use app_token::{validate_app_token, AppClaims};
pub use client::{CredentialExchange, OAuth2Client};
pub use config::OAuth2Config;
pub use credential::Credential;
pub use handlers::{handle_oauth_callback, start_oauth_flow, OAuth2State};
pub use token_manager::{TokenInfo, TokenManager};
