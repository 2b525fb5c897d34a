use crate::error::TransportError;

/// Status the server uses to reject a value.
pub const UNPROCESSABLE_ENTITY: u16 = 422;

/// Content type marking a response as an HTML fragment.
pub const FRAGMENT_CONTENT_TYPE: &str = "text/html; fragment";

/// Human-readable message for a failed check, if the server supplied one.
///
/// Only a 422 response with a non-empty HTML fragment body yields a message;
/// every other failure yields `None`.
pub fn error_message(error: &TransportError) -> Option<String> {
    if error.status_code == UNPROCESSABLE_ENTITY
        && !error.response_text.is_empty()
        && error.content_type.contains(FRAGMENT_CONTENT_TYPE)
    {
        Some(error.response_text.clone())
    } else {
        None
    }
}
