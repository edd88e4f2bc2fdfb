//! Well-known role name constants.
//!
//! Global roles live on `users.role`; project roles live on
//! `project_members.role`. Both must match the CHECK constraints in the
//! initial migration.

/// Global administrator.
pub const ROLE_ADMIN: &str = "admin";
/// Regular account.
pub const ROLE_USER: &str = "user";

/// Project role: owns the backlog and runs estimation.
pub const PROJECT_ROLE_PRODUCT_OWNER: &str = "product_owner";
/// Project role: manages the project and runs estimation.
pub const PROJECT_ROLE_PRODUCT_MANAGER: &str = "product_manager";
/// Project role: regular team member, may vote and chat.
pub const PROJECT_ROLE_MEMBER: &str = "member";

/// Project roles allowed to start voting, accept votes, and drive the
/// session lifecycle.
pub const MANAGING_ROLES: &[&str] = &[PROJECT_ROLE_PRODUCT_OWNER, PROJECT_ROLE_PRODUCT_MANAGER];

/// Returns `true` if the project role may run estimation.
pub fn is_managing_role(role: &str) -> bool {
    MANAGING_ROLES.contains(&role)
}
