pub mod case;
pub mod command;
pub mod device;
pub mod event;
pub mod topology;
pub mod types;

pub use case::*;
pub use command::*;
pub use device::*;
pub use event::*;
pub use topology::*;
pub use types::*;
