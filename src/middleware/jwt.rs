//! JWT signing, verification and the authentication middleware.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::middleware::{Middleware, Next, from_fn};
use crate::request::Request;
use crate::response::Response;

/// Why a token was not accepted.
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("missing token")]
    Missing,

    #[error("malformed authorization header")]
    Malformed,

    #[error("token has expired")]
    Expired,

    #[error("invalid token: {0}")]
    Invalid(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid(err.to_string()),
        }
    }
}

/// HMAC-signed JSON Web Tokens with a shared secret.
///
/// ```rust
/// use jsonwebtoken::Algorithm;
/// use routekit::middleware::Jwt;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Deserialize, Serialize)]
/// struct Claims {
///     sub: String,
/// }
///
/// let jwt = Jwt::new("secret");
/// let token = jwt.sign(Algorithm::HS256, &Claims { sub: "42".into() }).unwrap();
/// let claims: Claims = jwt.verify(&token).unwrap();
/// assert_eq!(claims.sub, "42");
///
/// // Accept `?token=` when no Authorization header is sent.
/// let auth = jwt.authenticate::<Claims>(&["token"]);
/// ```
#[derive(Clone)]
pub struct Jwt {
    secret: Arc<[u8]>,
}

impl std::fmt::Debug for Jwt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jwt").finish_non_exhaustive()
    }
}

impl Jwt {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self { secret: Arc::from(secret.as_ref()) }
    }

    /// Signs `claims` with one of the HMAC algorithms.
    pub fn sign<C: Serialize>(&self, algorithm: Algorithm, claims: &C) -> Result<String, JwtError> {
        let key = EncodingKey::from_secret(&self.secret);
        Ok(encode(&Header::new(algorithm), claims, &key)?)
    }

    /// Verifies the signature and decodes the claims.
    ///
    /// `exp` is checked when present; no claim is required.
    pub fn verify<C: DeserializeOwned>(&self, token: &str) -> Result<C, JwtError> {
        if token.is_empty() {
            return Err(JwtError::Missing);
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
        validation.set_required_spec_claims::<&str>(&[]);
        validation.validate_aud = false;

        let key = DecodingKey::from_secret(&self.secret);
        Ok(decode::<C>(token, &key, &validation)?.claims)
    }

    /// Middleware that rejects requests without a valid token with
    /// `401 Unauthorized` and stores the decoded claims for
    /// [`Request::claims`].
    ///
    /// The token comes from `Authorization: Bearer <token>`. When that header
    /// is absent, the first non-empty query parameter among `query_keys` is
    /// used instead.
    pub fn authenticate<C>(&self, query_keys: &[&str]) -> Middleware
    where
        C: DeserializeOwned + Send + Sync + 'static,
    {
        let jwt = self.clone();
        let query_keys: Arc<[String]> = query_keys.iter().map(|k| (*k).to_owned()).collect();

        from_fn(move |mut req: Request, next: Next| {
            let claims = token(&req, &query_keys).and_then(|token| jwt.verify::<C>(&token));
            async move {
                match claims {
                    Ok(claims) => {
                        req.context_mut().set_claims(claims);
                        next.run(req).await
                    }
                    Err(e) => {
                        debug!(path = req.path(), error = %e, "authentication failed");
                        Response::unauthorized()
                    }
                }
            }
        })
    }
}

fn token(req: &Request, query_keys: &[String]) -> Result<String, JwtError> {
    match req.header("authorization") {
        Some(header) => {
            let mut parts = header.split(' ');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
                    Ok(token.to_owned())
                }
                _ => Err(JwtError::Malformed),
            }
        }
        None if query_keys.is_empty() => Err(JwtError::Missing),
        None => {
            let query: Vec<(String, String)> =
                serde_urlencoded::from_str(req.query().unwrap_or_default()).unwrap_or_default();
            query_keys
                .iter()
                .find_map(|key| query.iter().find(|(k, v)| k == key && !v.is_empty()))
                .map(|(_, v)| v.clone())
                .ok_or(JwtError::Missing)
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct Claims {
        sub: String,
        exp: u64,
    }

    fn request(uri: &str, authorization: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri(uri);
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        builder.body(Bytes::new()).unwrap().into()
    }

    #[test]
    fn rejects_expired_tokens() {
        let jwt = Jwt::new("secret");
        let token = jwt.sign(Algorithm::HS256, &Claims { sub: "1".into(), exp: 1 }).unwrap();

        assert!(matches!(jwt.verify::<Claims>(&token), Err(JwtError::Expired)));
    }

    #[test]
    fn rejects_foreign_signatures() {
        let token = Jwt::new("other").sign(Algorithm::HS512, &Claims { sub: "1".into(), exp: u64::MAX / 2 }).unwrap();

        assert!(matches!(Jwt::new("secret").verify::<Claims>(&token), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn token_sources() {
        let keys = vec!["token".to_owned(), "access_token".to_owned()];

        assert_eq!(token(&request("/", Some("Bearer abc")), &keys).unwrap(), "abc");
        assert_eq!(token(&request("/", Some("bearer abc")), &keys).unwrap(), "abc");
        assert!(matches!(token(&request("/", Some("Basic abc")), &keys), Err(JwtError::Malformed)));
        assert!(matches!(token(&request("/", Some("Bearer a b")), &keys), Err(JwtError::Malformed)));
        assert_eq!(token(&request("/?token=&access_token=xyz", None), &keys).unwrap(), "xyz");
        assert!(matches!(token(&request("/?token=xyz", None), &[]), Err(JwtError::Missing)));
    }
}
