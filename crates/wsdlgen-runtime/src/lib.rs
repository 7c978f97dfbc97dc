//! Support types for code generated by `wsdlgen`.
//!
//! Generated modules import these wholesale; they map the XML Schema
//! built-ins that have no direct Rust counterpart.

use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;

mod datetime;
mod fault;

pub use datetime::{ParseError, XsdDate, XsdDateTime, XsdTime};
pub use fault::SoapFault;

/// An `xs:anyType` value or wildcard content
///
/// Only text content is kept; nested elements are accepted and dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AnyType(pub String);

impl AnyType {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Serialize for AnyType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for AnyType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AnyVisitor;

        impl<'de> Visitor<'de> for AnyVisitor {
            type Value = AnyType;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("any XML content")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<AnyType, E> {
                Ok(AnyType(v.to_string()))
            }

            fn visit_string<E: serde::de::Error>(self, v: String) -> Result<AnyType, E> {
                Ok(AnyType(v))
            }

            fn visit_unit<E: serde::de::Error>(self) -> Result<AnyType, E> {
                Ok(AnyType::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<AnyType, A::Error> {
                let mut text = String::new();
                while let Some(key) = map.next_key::<String>()? {
                    if key == "$text" {
                        text.push_str(&map.next_value::<String>()?);
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                Ok(AnyType(text))
            }
        }

        deserializer.deserialize_any(AnyVisitor)
    }
}

macro_rules! string_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Deref for $name {
            type Target = str;

            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

string_newtype!(
    /// An `xs:anyURI`, kept as written
    AnyUri
);

string_newtype!(
    /// An `xs:NCName`
    NcName
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_any_type_text() {
        let value: AnyType = serde_json::from_str(r#""hello""#).unwrap();
        assert_eq!(value.as_str(), "hello");
        assert_eq!(serde_json::to_string(&value).unwrap(), r#""hello""#);

        let value: AnyType = serde_json::from_str(r#"{"$text": "inner", "child": {"a": 1}}"#).unwrap();
        assert_eq!(value, AnyType("inner".into()));
    }

    #[test]
    fn test_string_newtypes() {
        let uri = AnyUri::new("http://example.com/");
        assert_eq!(uri.len(), 19);
        assert_eq!(uri.to_string(), "http://example.com/");
        assert_eq!(serde_json::to_string(&NcName::from("local")).unwrap(), r#""local""#);
    }
}
