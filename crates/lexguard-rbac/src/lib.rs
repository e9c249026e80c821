//! # lexguard-rbac: Role-Based Authorization
//!
//! Maps an authenticated principal's role to a closed capability set and
//! gates every mutating operation of the governance core.
//!
//! ## Capability table
//!
//! | Role      | view | decide | manage_settings | manage_users | view_audit |
//! |-----------|------|--------|-----------------|--------------|------------|
//! | Admin     | ✓    | ✓      | ✓               | ✓            | ✓          |
//! | Reviewer  | ✓    | ✓      | ✗               | ✗            | ✗          |
//! | Publisher | ✓    | ✓      | ✗               | ✗            | ✗          |
//!
//! The table is fixed at compile time. Per-document or per-category
//! permissions are not modelled.
//!
//! ## Example
//!
//! ```
//! use lexguard_rbac::{Capability, Principal, Role, authorize};
//! use lexguard_types::Language;
//!
//! let reviewer = Principal::new("u-17", "Fatima Ali", Role::Reviewer, Language::Arabic);
//!
//! assert!(authorize(&reviewer, Capability::Decide));
//! assert!(!authorize(&reviewer, Capability::ManageUsers));
//! ```

pub mod capabilities;
pub mod directory;
pub mod enforcement;
pub mod principal;
pub mod roles;

pub use capabilities::{Capability, CapabilitySet};
pub use directory::{UserDirectory, UserRecord};
pub use enforcement::{AuthorizationError, Authorizer, authorize};
pub use principal::{Actor, Principal, Session};
pub use roles::Role;
