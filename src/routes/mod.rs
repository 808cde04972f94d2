/// Router Module Index
///
/// Organizes the application's routing into security-segregated modules,
/// so access control is applied explicitly at the module level (via Axum
/// layers) rather than remembered handler by handler.
///
/// The two modules map directly to the access tiers the API exposes.

/// Routes accessible to all users (anonymous, read-only).
/// Listing handlers default to published-only visibility.
pub mod public;

/// Routes protected by the `AuthUser` extractor middleware.
/// Requires a valid bearer token.
pub mod authenticated;
