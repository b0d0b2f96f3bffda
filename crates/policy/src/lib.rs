//! Label-assignment policies.
//!
//! A [`Policy`] is the per-template configuration that decides, at admission
//! time, which node label a task must satisfy: the text of a script and
//! whether that script runs sandboxed.
//!
//! Policies are persisted as TOML. Older files stored only the bare script
//! string; [`PersistedPolicy`] accepts both shapes and [`PersistedPolicy::migrate`]
//! upgrades the old one explicitly.

mod error;
mod persisted;
mod policy;

pub use error::{Error, Result};
pub use persisted::{Migrated, PersistedPolicy, PolicyFile};
pub use policy::Policy;
