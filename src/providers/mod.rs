//! providers
//!
//! Host providers and their registry.
//!
//! # Architecture
//!
//! A [`HostProvider`] recognises a family of remotes and produces
//! credentials for them. The [`HostProviderRegistry`] holds every provider
//! in a priority bucket and picks the one that services a request:
//! explicit overrides first, then static matching and a single shared
//! HTTP probe per priority tier.
//!
//! # Shipped Providers
//!
//! - [`GitHubProvider`] (Normal priority): GitHub and GitHub Enterprise
//! - [`GenericProvider`] (Low priority): basic auth for anything else

pub mod generic;
pub mod github;
pub mod mock;
mod probe;
mod registry;
mod traits;

pub use generic::GenericProvider;
pub use github::GitHubProvider;
pub use probe::{HttpProber, ProbeError, Prober};
pub use registry::{HostProviderRegistry, RegistryError};
pub use traits::{default_service_name, HostProvider, HostProviderPriority, ProbeResponse, ProviderError};
