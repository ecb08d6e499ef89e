/**
 * Read and write access resolution.
 *  - Anonymous-first read resolution (two store scopes, never both open)
 *  - Write checks across every container referencing a content unit
 *  - Reference authenticator and authorization table
 */
pub mod access;
/**
 * Core settings and startup fixtures, loaded from TOML.
 */
pub mod config;
/**
 * Disseminators render a container's stored content
 *  into an external representation (zip archive, atom feed).
 */
pub mod disseminate;
/**
 * Error taxonomy shared by every component.
 */
pub mod error;
/**
 * Deposit ingest: acceptance policy, format-specific
 *  ingesters, and retention of rejected packages.
 */
pub mod ingest;
/**
 * The media resource orchestrator tying access,
 *  negotiation, versioning and workflow together
 *  for one request.
 */
pub mod manager;
/**
 * Containers, groups, content units, deposit packages,
 *  principals and deposit results.
 */
pub mod model;
/**
 * Accept / Accept-Packaging content negotiation.
 */
pub mod negotiation;
/**
 * Content store collaborator: scoped units of work
 *  over containers, groups and content units, plus
 *  an in-memory implementation.
 */
pub mod store;
/**
 * Per-request verbose trace, threaded explicitly
 *  through every call.
 */
pub mod trace;
/**
 * Mapping between edit-media URIs and store targets.
 */
pub mod urls;
/**
 * Replace and remove semantics over a store that only
 *  supports adding and removing unit links.
 */
pub mod versioning;
/**
 * Bridge to the external workflow engine.
 */
pub mod workflow;

pub mod prelude {
    pub use crate::access::{
        AccessDecision, AccessResolver, AuthorizationProvider, Authenticator,
        MemoryAuthenticator, MemoryAuthorization,
    };
    pub use crate::config::SwordConfig;
    pub use crate::error::SwordError;
    pub use crate::ingest::{AcceptPolicy, IngestPipeline, IngesterRegistry};
    pub use crate::manager::{
        DepositOutcome, MediaResource, MediaResourceManager, ReceiptKind, UnitReplaceMode,
    };
    pub use crate::model::{
        packaging, Container, ContainerId, ContentUnit, Credentials, DepositPackage,
        DepositResult, Principal, UnitId,
    };
    pub use crate::negotiation::{NegotiationEngine, NegotiationRequest};
    pub use crate::store::{ContentStore, MemoryContentStore, StoreScope};
    pub use crate::trace::Trace;
    pub use crate::urls::{MediaTarget, UrlManager};
    pub use crate::workflow::{WorkflowBridge, WorkflowEngine, WorkflowStatus};
}
