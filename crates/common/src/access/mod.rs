mod authenticator;
mod authorization;
mod resolver;

pub use authenticator::{password_digest, Authenticator, MemoryAuthenticator};
pub use authorization::{AuthorizationProvider, ContainerPolicy, MemoryAuthorization};
pub use resolver::{
    AccessDecision, AccessOutcome, AccessReason, AccessResolver, AccessState, AccessTarget,
    lookup, ResolvedRead, WriteGrant,
};
