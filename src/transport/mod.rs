/// CSV output store and table persistence.
pub mod fs;
/// Paced detail client and snapshot streaming.
pub mod http;
