//! Request dispatch.
//!
//! Turns one request line into exactly one envelope. Nothing here fails: parse
//! errors, unknown methods and handler errors all become error envelopes, so a
//! bad request never ends the session that sent it.

use std::sync::Arc;

use tracing::debug;

use crate::rpc::methods::MethodTable;
use crate::rpc::protocol::{parse_request, Envelope, Request, METHOD_NOT_IMPLEMENTED};

/// Resolves requests against a shared, read-only [`MethodTable`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    methods: Arc<MethodTable>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given table.
    #[must_use]
    pub const fn new(methods: Arc<MethodTable>) -> Self {
        Self { methods }
    }

    /// Parses and dispatches one request line.
    ///
    /// Unparsable input yields an error envelope with a `null` id.
    #[must_use]
    pub fn dispatch(&self, line: &[u8]) -> Envelope {
        match parse_request(line) {
            Ok(request) => self.dispatch_request(request),
            Err(error) => {
                debug!(error = %error.error, "Rejected unparsable request");
                error.into()
            }
        }
    }

    /// Dispatches an already parsed request.
    #[must_use]
    pub fn dispatch_request(&self, request: Request) -> Envelope {
        let params = request.params_or_default();
        let Request { method, id, .. } = request;

        let Some(entry) = method.as_deref().and_then(|name| self.methods.lookup(name)) else {
            debug!(method = ?method, "Method not implemented");
            return Envelope::error(METHOD_NOT_IMPLEMENTED, id);
        };

        match entry.invoke(params) {
            Ok(result) => Envelope::success(result, id),
            Err(error) => {
                debug!(method = entry.name, error = %error, "Method invocation failed");
                Envelope::error(error.to_string(), id)
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Arc::new(MethodTable::standard()))
    }
}
