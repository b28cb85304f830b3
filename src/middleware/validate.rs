//! Payload binding and validation middleware.
//!
//! Every request runs through the same pipeline; only the source differs:
//!
//! ```text
//! [json only] content-type check ── mismatch ──▶ 400 "Invalid request"
//!        ↓
//! bind source → Payload::conform ─── failure ──▶ 400 generic message
//!        ↓
//! validator::Validate ────── field failures ───▶ 400 "Validation error" + error tree
//!        ↓
//! store in request context → next
//! ```

use std::any::type_name;
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::bind::{Payload, Shape, bind_form, bind_json, bind_path, bind_query, media_type};
use crate::context::PayloadKind;
use crate::error::PayloadError;
use crate::middleware::{Middleware, Next, from_fn};
use crate::request::Request;
use crate::response::IntoResponse;
use crate::translate::Translations;

/// Builds validation middleware sharing one set of message templates.
///
/// ```rust
/// use routekit::middleware::Validator;
///
/// let validator = Validator::new()
///     .translation("required", "{0} cannot be empty")
///     .translation("range.exclusive_min", "{0} must be above {1}");
/// # #[derive(serde::Deserialize, validator::Validate)]
/// # struct Search { q: String }
/// # impl routekit::Payload for Search {}
/// let search = validator.query::<Search>();
/// ```
#[derive(Clone, Debug, Default)]
pub struct Validator {
    translations: Arc<Translations>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the message template for a rule code (`"length"`) or rule
    /// variant (`"length.min"`). `{0}` is the field, `{1}` the rule parameter.
    pub fn translation(mut self, key: impl Into<String>, template: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.translations).set(key, template);
        self
    }

    /// Binds `T` from the matched route's path parameters.
    pub fn path<T: Payload>(&self) -> Middleware {
        self.build::<T>(PayloadKind::Path)
    }

    /// Binds `T` from the query string.
    pub fn query<T: Payload>(&self) -> Middleware {
        self.build::<T>(PayloadKind::Query)
    }

    /// Binds `T` from a urlencoded or multipart form body.
    pub fn form<T: Payload>(&self) -> Middleware {
        self.build::<T>(PayloadKind::Form)
    }

    /// Binds `T` from an `application/json` body.
    pub fn json<T: Payload>(&self) -> Middleware {
        self.build::<T>(PayloadKind::Json)
    }

    fn build<T: Payload>(&self, kind: PayloadKind) -> Middleware {
        let shape = Shape::of::<T>();
        if !shape.is_supported() {
            error!(payload = type_name::<T>(), ?kind, "payload type must deserialize from a struct or map");
        }
        let translations = Arc::clone(&self.translations);

        from_fn(move |mut req: Request, next: Next| {
            let outcome = run::<T>(&req, kind, &shape, &translations);
            async move {
                match outcome {
                    Ok(payload) => {
                        req.context_mut().set_payload(kind, payload);
                        next.run(req).await
                    }
                    Err(e) => e.into_response(),
                }
            }
        })
    }
}

/// Binds and validates `T` from the path parameters.
pub fn validate_path<T: Payload>() -> Middleware {
    Validator::new().path::<T>()
}

/// Binds and validates `T` from the query string.
pub fn validate_query<T: Payload>() -> Middleware {
    Validator::new().query::<T>()
}

/// Binds and validates `T` from a form body.
pub fn validate_form<T: Payload>() -> Middleware {
    Validator::new().form::<T>()
}

/// Binds and validates `T` from a JSON body.
pub fn validate_json<T: Payload>() -> Middleware {
    Validator::new().json::<T>()
}

fn run<T: Payload>(
    req: &Request,
    kind: PayloadKind,
    shape: &Shape,
    translations: &Translations,
) -> Result<T, PayloadError> {
    if kind == PayloadKind::Json {
        let content_type = req.header("content-type").unwrap_or_default();
        if media_type(content_type) != "application/json" {
            warn!(path = req.path(), content_type, "expected a JSON body");
            return Err(PayloadError::ContentTypeMismatch(content_type.to_owned()));
        }
    }

    if !shape.is_supported() {
        return Err(PayloadError::UnsupportedShape(type_name::<T>()));
    }

    let mut payload: T = match kind {
        PayloadKind::Path => bind_path(req, shape),
        PayloadKind::Query => bind_query(req, shape),
        PayloadKind::Form => bind_form(req, shape),
        PayloadKind::Json => bind_json(req),
    }
    .inspect_err(|e| warn!(path = req.path(), ?kind, error = %e, "failed to bind payload"))?;

    payload
        .conform()
        .inspect_err(|e| warn!(path = req.path(), ?kind, error = %e, "failed to conform payload"))?;

    match validator::Validate::validate(&payload) {
        Ok(()) => Ok(payload),
        Err(errors) => {
            let failures = translations.failures(&errors);
            if failures.is_empty() {
                error!(path = req.path(), ?kind, error = %errors, "validation failed without field errors");
                return Err(PayloadError::Rejected(errors.to_string()));
            }
            debug!(path = req.path(), ?kind, failures = failures.len(), "payload failed validation");
            Err(PayloadError::Validation(failures))
        }
    }
}
