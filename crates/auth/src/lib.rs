//! `shelfwise-auth`: authentication/authorization boundary.
//!
//! Tokens are issued by an external identity provider; this crate verifies
//! them, maps roles to permissions and models the staff directory. It knows
//! nothing about HTTP or storage.

pub mod account;
pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod roles;

pub use account::StaffAccount;
pub use authorize::{AuthzError, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::{Permission, role_permissions};
pub use roles::Role;
