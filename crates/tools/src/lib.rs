pub mod availability;
pub mod registry;
pub mod resolver;

pub use availability::{Availability, AvailabilityProbe};
pub use registry::{
    known_tool_dirs, lookup, supported_tool_names, Launch, Lookup, ToolDescriptor, TOOL_REGISTRY,
};
pub use resolver::{ResolveError, ResolvedInvocation, ToolResolver, Verification};
