//! flutter-probar: end-to-end harness for Flutter Web applications.
//!
//! Flutter draws to a canvas, so the DOM holds nothing to click until the
//! engine's semantics tree is switched on. This crate turns that tree on,
//! finds elements in it by accessible name, role or text, and drives them by
//! pointer or, where the rendering surface swallows pointer events, by Tab
//! and Enter focus traversal.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  journeys ──► actors ──► page objects ──► FlutterHelper       │
//! │      │                                       │                │
//! │      ▼                                       ▼                │
//! │  BackendClient ◄── Rendezvous      SemanticLocator / traversal│
//! │  (/test/* API)                               │                │
//! │                                              ▼                │
//! │                        SemanticsDriver (CdpPage | Mock)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::float_cmp))]

mod actor;
mod config;
mod driver;
mod helper;
mod locator;
mod page_object;
mod rendezvous;
mod result;
mod semantics;
mod traversal;
mod wait;

/// Typed client for the backend's test-control API
pub mod backend;

/// Chromium driver over the DevTools protocol
#[cfg(feature = "browser")]
pub mod browser;

/// Scripted journeys and their reports
pub mod journey;

/// `tracing` subscriber setup
pub mod logging;

/// In-memory semantics tree for tests
pub mod mock;

/// Page objects for the application's screens
pub mod pages;

pub use actor::{Actor, ActorRole};
pub use config::{
    join_url, BrowserSettings, ProbeConfig, Timeouts, DEFAULT_API_URL, DEFAULT_APP_URL,
};
pub use driver::{ElementRef, FocusDescriptor, Key, NodeSnapshot, SemanticsDriver};
pub use helper::{ActivationPath, FlutterHelper};
pub use locator::{FocusMatcher, Resolved, SemanticLocator, Strategy};
pub use page_object::PageObject;
pub use rendezvous::Rendezvous;
pub use result::{Lookup, ProbeError, ProbeResult};
pub use semantics::{
    enable_accessibility, EnableOptions, Enablement, EMAIL_FIELD, ENABLE_PLACEHOLDER, GLASS_PANE,
    SEMANTICS_HOST, SEMANTICS_NODE, TEXT_FIELD,
};
pub use traversal::{
    tab_to_and_activate, tab_to_element, FocusHit, TraversalOptions, DEFAULT_MAX_STEPS,
};
pub use wait::{
    poll_until, settle, wait_for_attached, wait_for_url, Backoff, WaitOptions,
    DEFAULT_MAX_POLL_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS, DEFAULT_WAIT_TIMEOUT_MS,
};
