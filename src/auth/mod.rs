//! Authentication state exposed to request handlers.

pub mod callback;
pub mod context;

pub use callback::{CallbackOutcome, CallbackParams, CallbackStatus, resolve_callback};
pub use context::{AuthContext, AuthProvider, AuthSnapshot, AuthState, AuthStatus, ConfigurationError, GOOGLE_PROVIDER};
