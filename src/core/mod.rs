//! Core linking flow: models, backend-facing services and the session state machine.

pub mod account;
pub mod catalog;
pub mod credential_hash;
pub mod http;
pub mod logging;
pub mod models;
pub mod opener;
pub mod orchestrator;
pub mod provider;
pub mod registrar;
pub mod retry;
pub mod session;

pub use account::{HealthAccountLink, UserSession};
pub use catalog::{CatalogService, ProviderCatalog, filter_by_search, sort_for_display};
pub use models::{
    ConnectPayload, ProviderEntry, ProvidersPayload, RobotMeta, RobotOutput, SCHEMA_VERSION,
    SessionPayload, SetupPayload, StatusPayload,
};
pub use opener::{NoopOpener, SystemOpener, UrlOpener};
pub use orchestrator::{Handoff, LinkOrchestrator, validate_authorization_url};
pub use provider::{AuthType, DEFAULT_FEATURED, Provider};
pub use registrar::{Registrar, Registration};
pub use retry::{RetryPolicies, RetryPolicy};
pub use session::{LinkEvent, LinkPhase, LinkSession};
