pub mod value;

pub mod connection;
pub mod deserializer;
pub mod driver;
pub mod result;

pub const DEFAULT_POOL_NAME: &str = "default";
