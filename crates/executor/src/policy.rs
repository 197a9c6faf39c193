use async_trait::async_trait;

/// Decision returned by a [`CommandPolicy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyDecision {
    Allow,
    Deny(String),
}

/// A shell line about to be handed to the executor.
#[derive(Debug, Clone)]
pub struct PolicyRequest {
    pub operation: String,
    pub command_line: String,
    pub working_directory: String,
}

/// Admission check consulted before any caller-supplied shell line is spawned.
///
/// Command lines reach `sh -c` verbatim, so shell operators in caller input are honoured. A
/// policy is the single place where allow-lists or escaping can be enforced.
#[async_trait]
pub trait CommandPolicy: Send + Sync {
    async fn check(&self, request: &PolicyRequest) -> PolicyDecision;
}

/// Admits every command: the orchestrator is granted full shell capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedCaller;

#[async_trait]
impl CommandPolicy for TrustedCaller {
    async fn check(&self, request: &PolicyRequest) -> PolicyDecision {
        tracing::debug!(
            operation = %request.operation,
            "Trusted caller admitted command: {}",
            request.command_line
        );
        PolicyDecision::Allow
    }
}
