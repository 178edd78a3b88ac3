pub mod codec;
pub mod queue;
pub mod registry;
pub mod storage;
pub mod worker;
