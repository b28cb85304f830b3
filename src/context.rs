//! Request-scoped, typed storage for validated payloads and auth claims.
//!
//! Each validation middleware owns exactly one slot, chosen by
//! [`PayloadKind`]. Downstream handlers read it back through the typed
//! accessors on [`Request`](crate::Request); asking for the wrong type, or
//! for a slot no middleware filled, returns `None` ("not validated").

use std::any::Any;

type Slot = Box<dyn Any + Send + Sync>;

/// Which request source a payload was bound from.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PayloadKind {
    Path,
    Query,
    Form,
    Json,
}

/// Typed slots carried by every request.
#[derive(Default)]
pub struct Context {
    path: Option<Slot>,
    query: Option<Slot>,
    form: Option<Slot>,
    json: Option<Slot>,
    claims: Option<Slot>,
}

impl Context {
    pub fn payload<T: 'static>(&self, kind: PayloadKind) -> Option<&T> {
        self.slot(kind).as_deref()?.downcast_ref::<T>()
    }

    pub fn claims<T: 'static>(&self) -> Option<&T> {
        self.claims.as_deref()?.downcast_ref::<T>()
    }

    pub(crate) fn set_payload<T: Send + Sync + 'static>(&mut self, kind: PayloadKind, value: T) {
        *self.slot_mut(kind) = Some(Box::new(value));
    }

    pub(crate) fn set_claims<T: Send + Sync + 'static>(&mut self, value: T) {
        self.claims = Some(Box::new(value));
    }

    fn slot(&self, kind: PayloadKind) -> &Option<Slot> {
        match kind {
            PayloadKind::Path => &self.path,
            PayloadKind::Query => &self.query,
            PayloadKind::Form => &self.form,
            PayloadKind::Json => &self.json,
        }
    }

    fn slot_mut(&mut self, kind: PayloadKind) -> &mut Option<Slot> {
        match kind {
            PayloadKind::Path => &mut self.path,
            PayloadKind::Query => &mut self.query,
            PayloadKind::Form => &mut self.form,
            PayloadKind::Json => &mut self.json,
        }
    }
}
