pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Boxed error used at the trait boundary; the core maps it to typed errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Durable key/value storage for small records (device app storage, a file, ...).
///
/// Values are opaque bytes; the persistence gateway owns the encoding.
pub trait KvStore {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, BoxError>;
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), BoxError>;
    fn delete(&mut self, key: &str) -> Result<(), BoxError>;
}

impl<T: KvStore + ?Sized> KvStore for Box<T> {
    fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>, BoxError> {
        (**self).get(key)
    }
    fn put(&mut self, key: &str, value: &[u8]) -> Result<(), BoxError> {
        (**self).put(key, value)
    }
    fn delete(&mut self, key: &str) -> Result<(), BoxError> {
        (**self).delete(key)
    }
}
