pub mod engine;
pub mod error;
pub mod hash;
pub mod ignore;
pub mod index;
pub mod record;
pub mod sink;
pub mod worker;

pub use engine::{run, EngineConfig};
pub use error::EngineError;
pub use ignore::IgnoreScope;
pub use record::{Algo, Event, FileRecord, Status};
pub use sink::RunReport;
