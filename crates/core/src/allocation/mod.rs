//! Native allocation gateway.
//!
//! The allocated amount and the actual spend for a budget key are held by
//! the host. This module defines the read/adjust boundary and an in-memory
//! implementation used by tests and the simulator.

pub mod error;
pub mod gateway;
pub mod memory;

pub use error::AllocationError;
pub use gateway::{DateWindow, NativeAllocationGateway};
pub use memory::InMemoryAllocations;
