pub mod clock;

pub use clock::{Clock, ManualClock, SystemClock};

/// Error type crossing the trait boundary; callers map it to their own enums.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Access to individual files inside a raw filesystem image.
///
/// Names are the inner 8.3 file names (e.g. `LOGGER.GAM`). Implementations do no
/// locking of their own; callers serialize access.
pub trait ImageFs {
    /// Full contents of `name`, or `Ok(None)` when the file is absent from the image.
    fn read_file(&mut self, name: &str) -> Result<Option<Vec<u8>>, BoxError>;

    /// Replace the contents of `name` (creating it if needed).
    fn write_file(&mut self, name: &str, contents: &[u8]) -> Result<(), BoxError>;
}

impl<T: ImageFs + ?Sized> ImageFs for Box<T> {
    fn read_file(&mut self, name: &str) -> Result<Option<Vec<u8>>, BoxError> {
        (**self).read_file(name)
    }

    fn write_file(&mut self, name: &str, contents: &[u8]) -> Result<(), BoxError> {
        (**self).write_file(name, contents)
    }
}
