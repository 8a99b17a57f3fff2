//! Error reporting capability.
//!
//! The client forwards unexpected failures to an [`ErrorReporter`] injected
//! at construction. [`NoopReporter`] is the default; [`TracingReporter`]
//! turns reports into `tracing` error events so any subscriber (or an
//! error-tracking layer installed on it) can pick them up.

use std::sync::Arc;

use crate::error::ApiError;

/// Where a reported error happened.
#[derive(Debug, Clone)]
pub struct ReportContext {
    /// HTTP method of the failed call.
    pub method: String,
    /// Path relative to the base URL.
    pub path: String,
}

impl ReportContext {
    /// Create a context for a request.
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
        }
    }
}

/// Sink for unexpected API failures.
///
/// Only errors for which [`ApiError::is_reportable`] holds are passed in.
pub trait ErrorReporter: Send + Sync {
    /// Record a failure.
    fn report(&self, error: &ApiError, context: &ReportContext);
}

/// Reporter that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl ErrorReporter for NoopReporter {
    fn report(&self, _error: &ApiError, _context: &ReportContext) {}
}

/// Reporter that emits a `tracing` error event per failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ErrorReporter for TracingReporter {
    fn report(&self, error: &ApiError, context: &ReportContext) {
        tracing::error!(
            method = %context.method,
            path = %context.path,
            status = error.status,
            "API request failed: {}",
            error.message
        );
    }
}

impl<R: ErrorReporter + ?Sized> ErrorReporter for Arc<R> {
    fn report(&self, error: &ApiError, context: &ReportContext) {
        (**self).report(error, context)
    }
}
