//! Client-side state and API bindings for the sign-in / sign-up flow.
//!
//! [`store::Store`] is the single injected state container; [`auth_api::AuthClient`]
//! and [`modal::ModalController`] read from and dispatch into it.

pub mod auth_api;
pub mod modal;
pub mod store;

pub use auth_api::{AuthClient, ClientError};
pub use modal::{ClickTarget, ModalController, ModalView, ScrollLock};
pub use store::{Action, ClientState, ModalType, Store};
