//! Binding request sources onto typed payloads.
//!
//! A payload is any `serde` + `validator` type. Its `Deserialize` impl is the
//! schema: JSON bodies go straight through `serde_json`, while key-value
//! sources (path parameters, query strings and form bodies) are decoded by a
//! small deserializer over a tree of string values:
//!
//! - a repeated key binds to a sequence field;
//! - dotted and indexed keys reach nested data: `profile.name`,
//!   `addresses[0].street`, `tags[1]`, `labels[env]`;
//! - list slots no key mentions (`tags[2]` without `tags[1]`) take their
//!   zero value, so indexes in error paths match the client's;
//! - an empty value is skipped, so the field keeps its `Default`;
//! - values are parsed into the field's primitive type;
//! - keys whose first segment is not a field of the payload struct are
//!   dropped, and so is a key that needs a different kind of node than an
//!   earlier key put there (`a=1` then `a.b=2`).
//!
//! Payload types should carry `#[serde(default)]` so missing keys leave
//! fields at their default and are reported by validation rather than by the
//! binder.

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::de::value::{BorrowedStrDeserializer, Error as DeError, MapDeserializer, SeqDeserializer};
use serde::de::{self, DeserializeOwned, Deserializer, IntoDeserializer, Visitor};
use tracing::debug;
use validator::Validate;

use crate::error::PayloadError;
use crate::request::Request;

/// A type that can be bound from a request and validated.
///
/// ```rust
/// use routekit::{Payload, PayloadError};
/// use serde::{Deserialize, Serialize};
/// use validator::Validate;
///
/// #[derive(Default, Deserialize, Serialize, Validate)]
/// #[serde(default)]
/// struct Signup {
///     #[validate(email)]
///     email: String,
/// }
///
/// impl Payload for Signup {
///     fn conform(&mut self) -> Result<(), PayloadError> {
///         self.email = self.email.trim().to_lowercase();
///         Ok(())
///     }
/// }
/// ```
pub trait Payload: DeserializeOwned + Validate + Send + Sync + 'static {
    /// Field-level normalization run after binding and before validation.
    fn conform(&mut self) -> Result<(), PayloadError> {
        Ok(())
    }
}

// ── Shape probing ─────────────────────────────────────────────────────────────

/// How a payload type deserializes, learned once per type without building a
/// value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Shape {
    Struct { name: &'static str, fields: &'static [&'static str] },
    Map,
    Unsupported,
}

impl Shape {
    pub fn of<T: DeserializeOwned>() -> Self {
        let mut probe = Probe { shape: Shape::Unsupported };
        // The probe bails out with an error as soon as the shape is known.
        let _ = T::deserialize(&mut probe);
        probe.shape
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Self::Unsupported)
    }

    fn has_field(&self, key: &str) -> bool {
        match self {
            Self::Struct { fields, .. } => fields.contains(&key),
            Self::Map | Self::Unsupported => true,
        }
    }
}

struct Probe {
    shape: Shape,
}

impl<'de> Deserializer<'de> for &mut Probe {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("unsupported payload shape"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.shape = Shape::Struct { name, fields };
        Err(de::Error::custom("probed"))
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        self.shape = Shape::Map;
        Err(de::Error::custom("probed"))
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct seq tuple tuple_struct enum
        identifier ignored_any
    }
}

// ── Key-value decoding ────────────────────────────────────────────────────────

/// Highest list index a key may address.
const MAX_INDEX: usize = 10_000;

/// Decodes `T` from key-value pairs.
pub(crate) fn from_pairs<T, I>(pairs: I, shape: &Shape) -> Result<T, PayloadError>
where
    T: DeserializeOwned,
    I: IntoIterator<Item = (String, String)>,
{
    let mut root = Node::Fields(Vec::new());
    for (key, value) in pairs {
        if value.is_empty() {
            continue;
        }
        let steps = steps(&key);
        match steps.first() {
            Some(Step::Field(name)) if shape.has_field(name) => {}
            _ => continue,
        }
        if steps.iter().any(|s| matches!(s, Step::Index(i) if *i > MAX_INDEX)) {
            return Err(PayloadError::Bind(format!("`{key}` indexes past {MAX_INDEX}")));
        }
        if !root.insert(&steps, value) {
            debug!(key = %key, "dropping value whose key conflicts with an earlier one");
        }
    }

    T::deserialize(Tree(&root)).map_err(|e| PayloadError::Bind(e.to_string()))
}

/// One segment of a key such as `addresses[0].street`.
#[derive(Debug, PartialEq)]
enum Step {
    Field(String),
    Index(usize),
}

/// Splits a key on `.` and `[..]`. Bracketed integers index lists, other
/// bracketed text names a map entry. A part with unbalanced brackets is kept
/// whole as a field name.
fn steps(key: &str) -> Vec<Step> {
    let mut out = Vec::new();
    for part in key.split('.') {
        match bracketed(part) {
            Some(steps) => out.extend(steps),
            None => out.push(Step::Field(part.to_owned())),
        }
    }
    out
}

fn bracketed(part: &str) -> Option<Vec<Step>> {
    let open = part.find('[').unwrap_or(part.len());
    let (name, mut rest) = part.split_at(open);
    let mut steps = Vec::new();
    if !name.is_empty() || rest.is_empty() {
        steps.push(Step::Field(name.to_owned()));
    }
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let content = &inner[..close];
        steps.push(match content.parse() {
            Ok(index) => Step::Index(index),
            Err(_) => Step::Field(content.to_owned()),
        });
        rest = &inner[close + 1..];
    }
    Some(steps)
}

/// Values grouped by key path.
#[derive(Debug, Default)]
enum Node {
    #[default]
    Empty,
    Values(Vec<String>),
    Fields(Vec<(String, Node)>),
    Items(BTreeMap<usize, Node>),
}

static EMPTY: Node = Node::Empty;

impl Node {
    /// Stores `value` under `steps`. Returns `false`, leaving the tree as it
    /// was, when a node on the way already has another kind.
    fn insert(&mut self, steps: &[Step], value: String) -> bool {
        let Some((step, rest)) = steps.split_first() else {
            return match self {
                Self::Empty => {
                    *self = Self::Values(vec![value]);
                    true
                }
                Self::Values(values) => {
                    values.push(value);
                    true
                }
                _ => false,
            };
        };

        if matches!(self, Self::Empty) {
            *self = match step {
                Step::Field(_) => Self::Fields(Vec::new()),
                Step::Index(_) => Self::Items(BTreeMap::new()),
            };
        }

        match (step, self) {
            (Step::Field(name), Self::Fields(fields)) => {
                let slot = match fields.iter().position(|(k, _)| k == name) {
                    Some(slot) => slot,
                    None => {
                        fields.push((name.clone(), Self::Empty));
                        fields.len() - 1
                    }
                };
                fields[slot].1.insert(rest, value)
            }
            (Step::Index(index), Self::Items(items)) => items.entry(*index).or_default().insert(rest, value),
            _ => false,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Empty => "nothing",
            Self::Values(_) => "a value",
            Self::Fields(_) => "nested fields",
            Self::Items(_) => "an indexed list",
        }
    }
}

/// Deserializer over one [`Node`].
#[derive(Clone, Copy)]
struct Tree<'de>(&'de Node);

impl Tree<'_> {
    fn unexpected(&self, wanted: &str) -> DeError {
        de::Error::custom(format_args!("expected {wanted}, found {}", self.0.describe()))
    }
}

impl<'de> IntoDeserializer<'de, DeError> for Tree<'de> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! tree_scalar {
    ($($method:ident => $visit:ident,)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            match self.0 {
                Node::Values(values) => Values(values.as_slice()).$method(visitor),
                Node::Empty => visitor.$visit(Default::default()),
                _ => Err(self.unexpected("a value")),
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for Tree<'de> {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Node::Values(values) => Values(values.as_slice()).deserialize_any(visitor),
            Node::Fields(_) => self.deserialize_map(visitor),
            Node::Items(_) => self.deserialize_seq(visitor),
            Node::Empty => visitor.visit_unit(),
        }
    }

    tree_scalar! {
        deserialize_bool => visit_bool,
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_i128 => visit_i128,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_u128 => visit_u128,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
        deserialize_char => visit_char,
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Node::Values(values) => Values(values.as_slice()).deserialize_str(visitor),
            Node::Empty => visitor.visit_borrowed_str(""),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Node::Values(values) => Values(values.as_slice()).deserialize_bytes(visitor),
            Node::Empty => visitor.visit_borrowed_bytes(&[]),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Node::Empty => visitor.visit_none(),
            _ => visitor.visit_some(self),
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Node::Values(values) => Values(values.as_slice()).deserialize_seq(visitor),
            Node::Items(items) => {
                let len = items.keys().next_back().map_or(0, |last| last + 1);
                let slots = (0..len).map(|i| Tree(items.get(&i).unwrap_or(&EMPTY)));
                let mut seq = SeqDeserializer::<_, DeError>::new(slots);
                let value = visitor.visit_seq(&mut seq)?;
                seq.end()?;
                Ok(value)
            }
            Node::Empty => visitor.visit_seq(SeqDeserializer::<_, DeError>::new(std::iter::empty::<Tree<'de>>())),
            Node::Fields(_) => Err(self.unexpected("a list")),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            Node::Fields(fields) => {
                let entries = fields.iter().map(|(key, node)| (key.as_str(), Tree(node)));
                let mut map = MapDeserializer::<_, DeError>::new(entries);
                let value = visitor.visit_map(&mut map)?;
                map.end()?;
                Ok(value)
            }
            Node::Empty => {
                let entries = std::iter::empty::<(&'de str, Tree<'de>)>();
                visitor.visit_map(MapDeserializer::<_, DeError>::new(entries))
            }
            _ => Err(self.unexpected("nested fields")),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_map(visitor)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        match self.0 {
            Node::Values(values) => Values(values.as_slice()).deserialize_enum(name, variants, visitor),
            _ => Err(self.unexpected("a value")),
        }
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }
}

/// All values sent for one key.
#[derive(Clone, Copy)]
struct Values<'de>(&'de [String]);

impl<'de> Values<'de> {
    fn first(&self) -> Result<&'de str, DeError> {
        self.0
            .first()
            .map(String::as_str)
            .ok_or_else(|| de::Error::custom("missing value"))
    }
}

impl<'de> IntoDeserializer<'de, DeError> for Values<'de> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! parse_scalar {
    ($($method:ident => $visit:ident,)*) => {$(
        fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
            let raw = self.first()?;
            match raw.trim().parse() {
                Ok(value) => visitor.$visit(value),
                Err(e) => Err(de::Error::custom(format_args!("invalid value `{raw}`: {e}"))),
            }
        }
    )*};
}

impl<'de> Deserializer<'de> for Values<'de> {
    type Error = DeError;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        match self.0 {
            [single] => visitor.visit_borrowed_str(single),
            _ => self.deserialize_seq(visitor),
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let raw = self.first()?;
        match raw.trim() {
            "1" | "t" | "T" | "true" | "TRUE" | "True" | "on" => visitor.visit_bool(true),
            "0" | "f" | "F" | "false" | "FALSE" | "False" | "off" => visitor.visit_bool(false),
            _ => Err(de::Error::custom(format_args!("invalid boolean `{raw}`"))),
        }
    }

    parse_scalar! {
        deserialize_i8 => visit_i8,
        deserialize_i16 => visit_i16,
        deserialize_i32 => visit_i32,
        deserialize_i64 => visit_i64,
        deserialize_i128 => visit_i128,
        deserialize_u8 => visit_u8,
        deserialize_u16 => visit_u16,
        deserialize_u32 => visit_u32,
        deserialize_u64 => visit_u64,
        deserialize_u128 => visit_u128,
        deserialize_f32 => visit_f32,
        deserialize_f64 => visit_f64,
        deserialize_char => visit_char,
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_borrowed_str(self.first()?)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_str(visitor)
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_borrowed_bytes(self.first()?.as_bytes())
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        self.deserialize_bytes(visitor)
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_some(self)
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        let mut seq = SeqDeserializer::<_, DeError>::new(self.0.chunks(1).map(Values));
        let value = visitor.visit_seq(&mut seq)?;
        seq.end()?;
        Ok(value)
    }

    fn deserialize_tuple<V: Visitor<'de>>(
        self,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("nested maps cannot be bound from key-value pairs"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        _fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom(format_args!(
            "nested struct `{name}` cannot be bound from key-value pairs"
        )))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error> {
        visitor.visit_enum(BorrowedStrDeserializer::<DeError>::new(self.first()?))
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Self::Error> {
        visitor.visit_unit()
    }
}

// ── Request sources ───────────────────────────────────────────────────────────

/// Binds path parameters captured by the matched route.
///
/// Fails if a parameter is not valid percent-encoded UTF-8.
pub fn bind_path<T: DeserializeOwned>(req: &Request, shape: &Shape) -> Result<T, PayloadError> {
    if let Some(key) = req.malformed_params().first() {
        return Err(PayloadError::Bind(format!("path parameter `{key}` is not valid UTF-8")));
    }
    let pairs = req.params().iter().map(|(k, v)| (k.clone(), v.clone()));
    from_pairs(pairs, shape)
}

/// Binds the query string.
pub fn bind_query<T: DeserializeOwned>(req: &Request, shape: &Shape) -> Result<T, PayloadError> {
    let pairs = parse_urlencoded(req.query().unwrap_or_default().as_bytes())?;
    from_pairs(pairs, shape)
}

/// Binds an `application/x-www-form-urlencoded` body or the text fields of a
/// `multipart/form-data` body.
pub fn bind_form<T: DeserializeOwned>(req: &Request, shape: &Shape) -> Result<T, PayloadError> {
    let content_type = req.header("content-type").unwrap_or_default();
    let pairs = match media_type(content_type).as_str() {
        "application/x-www-form-urlencoded" => parse_urlencoded(req.body())?,
        "multipart/form-data" => {
            let boundary = boundary(content_type)
                .ok_or_else(|| PayloadError::Bind("multipart body without boundary".into()))?;
            multipart_text_fields(req.body(), &boundary)
        }
        other => return Err(PayloadError::Bind(format!("unsupported form content type `{other}`"))),
    };
    from_pairs(pairs, shape)
}

/// Binds a JSON body. The content type is checked by the caller.
pub fn bind_json<T: DeserializeOwned>(req: &Request) -> Result<T, PayloadError> {
    serde_json::from_slice(req.body()).map_err(|e| PayloadError::Bind(e.to_string()))
}

/// The lowercased media type of a content-type value, without parameters.
pub(crate) fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn parse_urlencoded(input: &[u8]) -> Result<Vec<(String, String)>, PayloadError> {
    serde_urlencoded::from_bytes(input).map_err(|e| PayloadError::Bind(e.to_string()))
}

fn boundary(content_type: &str) -> Option<String> {
    content_type.split(';').find_map(|part| {
        let (key, value) = part.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("boundary")
            .then(|| value.trim().trim_matches('"').to_owned())
            .filter(|b| !b.is_empty())
    })
}

/// Extracts the non-file fields of a multipart body. File parts are skipped.
fn multipart_text_fields(body: &Bytes, boundary: &str) -> Vec<(String, String)> {
    let body = String::from_utf8_lossy(body);
    let delimiter = format!("--{boundary}");
    let mut fields = Vec::new();

    for part in body.split(delimiter.as_str()).skip(1) {
        if part.starts_with("--") {
            break;
        }
        let part = part.strip_prefix("\r\n").or_else(|| part.strip_prefix('\n')).unwrap_or(part);
        let Some((head, value)) = part.split_once("\r\n\r\n").or_else(|| part.split_once("\n\n"))
        else {
            continue;
        };

        let mut name = None;
        let mut is_file = false;
        for line in head.lines() {
            let Some((key, header_value)) = line.split_once(':') else {
                continue;
            };
            if !key.trim().eq_ignore_ascii_case("content-disposition") {
                continue;
            }
            for param in header_value.split(';').map(str::trim) {
                if let Some(n) = param.strip_prefix("name=") {
                    name = Some(n.trim_matches('"').to_owned());
                } else if param.starts_with("filename=") {
                    is_file = true;
                }
            }
        }

        if let (Some(name), false) = (name, is_file) {
            let value = value.strip_suffix("\r\n").or_else(|| value.strip_suffix('\n')).unwrap_or(value);
            fields.push((name, value.to_owned()));
        }
    }
    fields
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Filter {
        page: u32,
        active: bool,
        ratio: f64,
        tags: Vec<String>,
        sort: Option<Order>,
        name: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    #[serde(rename_all = "lowercase")]
    enum Order {
        Asc,
        Desc,
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| ((*k).to_owned(), (*v).to_owned())).collect()
    }

    #[test]
    fn records_struct_fields() {
        match Shape::of::<Filter>() {
            Shape::Struct { name, fields } => {
                assert_eq!(name, "Filter");
                assert!(fields.contains(&"tags"));
            }
            other => panic!("unexpected shape {other:?}"),
        }
        assert_eq!(Shape::of::<std::collections::HashMap<String, String>>(), Shape::Map);
        assert_eq!(Shape::of::<Box<Filter>>(), Shape::of::<Filter>());
        assert_eq!(Shape::of::<String>(), Shape::Unsupported);
        assert_eq!(Shape::of::<Vec<Filter>>(), Shape::Unsupported);
    }

    #[test]
    fn decodes_typed_values() {
        let shape = Shape::of::<Filter>();
        let filter: Filter = from_pairs(
            pairs(&[
                ("page", "3"),
                ("active", "on"),
                ("ratio", "0.5"),
                ("tags", "a"),
                ("tags", "b"),
                ("sort", "desc"),
                ("name", ""),
                ("unknown", "dropped"),
            ]),
            &shape,
        )
        .unwrap();

        assert_eq!(
            filter,
            Filter {
                page: 3,
                active: true,
                ratio: 0.5,
                tags: vec!["a".into(), "b".into()],
                sort: Some(Order::Desc),
                name: String::new(),
            }
        );
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Street {
        street: String,
        number: Option<u32>,
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(default)]
    struct Profile {
        name: String,
        addresses: Vec<Street>,
        scores: Vec<u8>,
        labels: std::collections::BTreeMap<String, String>,
    }

    #[test]
    fn splits_keys_into_steps() {
        use Step::{Field, Index};

        assert_eq!(steps("a[0][k].b"), [Field("a".into()), Index(0), Field("k".into()), Field("b".into())]);
        assert_eq!(steps("[3]"), [Index(3)]);
        assert_eq!(steps("a[x"), [Field("a[x".into())]);
        assert_eq!(steps("plain"), [Field("plain".into())]);
    }

    #[test]
    fn decodes_nested_and_indexed_keys() {
        let shape = Shape::of::<Profile>();
        let profile: Profile = from_pairs(
            pairs(&[
                ("name", "Ann"),
                ("addresses[0].street", "Main"),
                ("addresses[0].number", "7"),
                ("addresses[2].street", "Elm"),
                ("scores[1]", "9"),
                ("labels[env]", "prod"),
                ("labels.tier", "gold"),
            ]),
            &shape,
        )
        .unwrap();

        assert_eq!(
            profile,
            Profile {
                name: "Ann".into(),
                addresses: vec![
                    Street { street: "Main".into(), number: Some(7) },
                    Street::default(),
                    Street { street: "Elm".into(), number: None },
                ],
                scores: vec![0, 9],
                labels: [("env".into(), "prod".into()), ("tier".into(), "gold".into())].into(),
            }
        );
    }

    #[test]
    fn conflicting_keys_keep_the_first_kind() {
        let shape = Shape::of::<Profile>();
        let profile: Profile = from_pairs(
            pairs(&[("name", "Ann"), ("name.first", "x"), ("scores", "1"), ("scores[3]", "2")]),
            &shape,
        )
        .unwrap();

        assert_eq!(profile.name, "Ann");
        assert_eq!(profile.scores, [1]);
    }

    #[test]
    fn huge_indexes_are_bind_errors() {
        let shape = Shape::of::<Profile>();
        let err = from_pairs::<Profile, _>(pairs(&[("scores[10001]", "1")]), &shape).unwrap_err();
        assert!(matches!(err, PayloadError::Bind(_)));
    }

    #[test]
    fn scalar_where_struct_expected_is_a_bind_error() {
        let shape = Shape::of::<Profile>();
        let err = from_pairs::<Profile, _>(pairs(&[("addresses[0]", "Main")]), &shape).unwrap_err();
        assert!(matches!(err, PayloadError::Bind(msg) if msg.contains("nested fields")));
    }

    #[test]
    fn unparsable_values_are_bind_errors() {
        let shape = Shape::of::<Filter>();
        let err = from_pairs::<Filter, _>(pairs(&[("page", "two")]), &shape).unwrap_err();
        assert!(matches!(err, PayloadError::Bind(msg) if msg.contains("two")));
    }

    #[test]
    fn multipart_skips_files() {
        let body = Bytes::from_static(
            b"--XYZ\r\n\
              Content-Disposition: form-data; name=\"name\"\r\n\r\n\
              Asif\r\n\
              --XYZ\r\n\
              Content-Disposition: form-data; name=\"avatar\"; filename=\"a.png\"\r\n\
              Content-Type: image/png\r\n\r\n\
              PNG\r\n\
              --XYZ\r\n\
              Content-Disposition: form-data; name=\"age\"\r\n\r\n\
              13.5\r\n\
              --XYZ--\r\n",
        );

        assert_eq!(
            multipart_text_fields(&body, "XYZ"),
            pairs(&[("name", "Asif"), ("age", "13.5")])
        );
        assert_eq!(boundary("multipart/form-data; boundary=\"XYZ\""), Some("XYZ".into()));
    }

    #[test]
    fn media_type_ignores_parameters_and_case() {
        assert_eq!(media_type("Application/JSON; charset=utf-8"), "application/json");
        assert_eq!(media_type(""), "");
    }
}
