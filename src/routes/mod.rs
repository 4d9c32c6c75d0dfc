//! Router modules, one per access tier.
//!
//! Access control is attached per module in `create_router`, so a route cannot end up in a
//! tier without the layer that guards it.

/// Anonymous routes: login and read-only content.
pub mod public;

/// Routes behind the `AuthUser` middleware. Ownership checks happen in the handlers.
pub mod authenticated;

/// Routes behind the `AuthUser` middleware plus the `admin` role check.
pub mod admin;
