use tracing::trace;

use crate::error::{GenerationError, Rejection};

/// Bounded accept/reject loop shared by segment growth, intersection
/// synthesis and point mutation.
///
/// `attempt` receives the zero-based try number and either produces an
/// accepted value or a [`Rejection`]. After `max_tries` rejections the loop
/// gives up with [`GenerationError::Exhausted`].
pub fn with_retries<T>(
    max_tries: usize,
    mut attempt: impl FnMut(usize) -> Result<T, Rejection>,
) -> Result<T, GenerationError> {
    for tries in 0..max_tries {
        match attempt(tries) {
            Ok(value) => return Ok(value),
            Err(reason) => trace!(tries, %reason, "proposal rejected"),
        }
    }
    Err(GenerationError::Exhausted { tries: max_tries })
}
