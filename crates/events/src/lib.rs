//! Domain event mechanics: the `Event` contract and pub/sub transport abstraction.
//!
//! Concrete events live next to the entities they describe (`dealership-inventory`);
//! broker-backed buses live in `dealership-infra`.

pub mod bus;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::{encode, Event};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
