//! HTTP middleware: correlation ids and request logging.

pub mod correlation;
pub mod logging;

pub use correlation::{
    correlation_scope, current_correlation_id, propagate_correlation_id_layer,
    set_correlation_id_layer, CORRELATION_ID_HEADER,
};
pub use logging::{request_logging, trace_layer};
