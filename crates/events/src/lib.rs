//! Host application events and the hooks that react to them.
//!
//! The host posts events (e.g. `part_part.created`) to the service. They are
//! published on an in-process bus and fanned out to registered hooks on a
//! background runner.

pub mod bus;
pub mod event;
pub mod hook;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::{HostEvent, PART_CREATED, PART_DELETED};
pub use hook::{EventHook, HookError, HookRunner, HookRunnerHandle, LogPartCreated, dispatch};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
