/// Router Module Index
///
/// Pages and the JSON API are kept apart. Everything sits behind the
/// pre-render gate middleware, but only page paths are registered in the
/// policy table; the API resolves sessions per handler.

/// Pages anyone may open (landing, terminal views, sign-out).
pub mod public;

/// Pages whose requirements come from the policy table.
pub mod protected;

/// JSON endpoints used by the client runtime after hydration.
pub mod api;
