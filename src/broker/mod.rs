pub mod engine;
pub mod registry;
pub mod session;
pub mod topic;

pub use engine::{Broker, PublishReport};
pub use registry::Registry;
pub use session::{Session, SessionState};
pub use topic::SubscriberId;
