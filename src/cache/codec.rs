//! Entry codec: the envelope every cached value travels in.
//!
//! A value is wrapped together with the key it was stored under and written
//! as JSON. Decoding checks the key so bytes copied between keys (or read
//! back under the wrong key) surface as an error instead of a wrong value.
//! JSON has no NaN or infinity, so values holding one are refused rather
//! than written as `null`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::cache::CacheError;

#[derive(Serialize)]
struct EntryRef<'a, T: ?Sized> {
    key: &'a str,
    value: &'a T,
}

#[derive(Deserialize)]
struct Entry<T> {
    key: String,
    value: T,
}

/// Serializes single-key entries to bytes and back.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryCodec;

impl EntryCodec {
    pub fn new() -> Self {
        Self
    }

    /// Encode `value` as the entry for `key`.
    pub fn encode<T>(&self, key: &str, value: &T) -> Result<Vec<u8>, CacheError>
    where
        T: Serialize + ?Sized,
    {
        value
            .serialize(finite::FiniteCheck)
            .map_err(|e| CacheError::Serialization(format!("encode '{}': {}", key, e)))?;

        serde_json::to_vec(&EntryRef { key, value })
            .map_err(|e| CacheError::Serialization(format!("encode '{}': {}", key, e)))
    }

    /// Decode bytes previously produced by [`EntryCodec::encode`] for `key`.
    pub fn decode<T>(&self, key: &str, bytes: &[u8]) -> Result<T, CacheError>
    where
        T: DeserializeOwned,
    {
        let entry: Entry<T> = serde_json::from_slice(bytes)
            .map_err(|e| CacheError::Serialization(format!("decode '{}': {}", key, e)))?;

        if entry.key != key {
            return Err(CacheError::Serialization(format!(
                "entry key mismatch: expected '{}', found '{}'",
                key, entry.key
            )));
        }

        Ok(entry.value)
    }
}

mod finite {
    //! A serializer that produces nothing and fails on the first NaN or
    //! infinite float it meets.

    use std::fmt;

    use serde::Serialize;
    use serde::ser;

    #[derive(Debug)]
    pub struct NonFinite(String);

    impl fmt::Display for NonFinite {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl std::error::Error for NonFinite {}

    impl ser::Error for NonFinite {
        fn custom<T: fmt::Display>(msg: T) -> Self {
            NonFinite(msg.to_string())
        }
    }

    fn check(finite: bool, value: impl fmt::Display) -> Result<(), NonFinite> {
        if finite {
            Ok(())
        } else {
            Err(NonFinite(format!("{} cannot be represented in JSON", value)))
        }
    }

    pub struct FiniteCheck;

    macro_rules! accept {
        ($($method:ident($ty:ty)),* $(,)?) => {
            $(fn $method(self, _: $ty) -> Result<(), NonFinite> { Ok(()) })*
        };
    }

    impl ser::Serializer for FiniteCheck {
        type Ok = ();
        type Error = NonFinite;
        type SerializeSeq = Self;
        type SerializeTuple = Self;
        type SerializeTupleStruct = Self;
        type SerializeTupleVariant = Self;
        type SerializeMap = Self;
        type SerializeStruct = Self;
        type SerializeStructVariant = Self;

        accept!(
            serialize_bool(bool),
            serialize_i8(i8),
            serialize_i16(i16),
            serialize_i32(i32),
            serialize_i64(i64),
            serialize_i128(i128),
            serialize_u8(u8),
            serialize_u16(u16),
            serialize_u32(u32),
            serialize_u64(u64),
            serialize_u128(u128),
            serialize_char(char),
            serialize_str(&str),
            serialize_bytes(&[u8]),
            serialize_unit_struct(&'static str),
        );

        fn serialize_f32(self, v: f32) -> Result<(), NonFinite> {
            check(v.is_finite(), v)
        }

        fn serialize_f64(self, v: f64) -> Result<(), NonFinite> {
            check(v.is_finite(), v)
        }

        fn serialize_none(self) -> Result<(), NonFinite> {
            Ok(())
        }

        fn serialize_some<T: ?Sized + Serialize>(self, value: &T) -> Result<(), NonFinite> {
            value.serialize(self)
        }

        fn serialize_unit(self) -> Result<(), NonFinite> {
            Ok(())
        }

        fn serialize_unit_variant(
            self,
            _name: &'static str,
            _index: u32,
            _variant: &'static str,
        ) -> Result<(), NonFinite> {
            Ok(())
        }

        fn serialize_newtype_struct<T: ?Sized + Serialize>(
            self,
            _name: &'static str,
            value: &T,
        ) -> Result<(), NonFinite> {
            value.serialize(self)
        }

        fn serialize_newtype_variant<T: ?Sized + Serialize>(
            self,
            _name: &'static str,
            _index: u32,
            _variant: &'static str,
            value: &T,
        ) -> Result<(), NonFinite> {
            value.serialize(self)
        }

        fn serialize_seq(self, _len: Option<usize>) -> Result<Self, NonFinite> {
            Ok(self)
        }

        fn serialize_tuple(self, _len: usize) -> Result<Self, NonFinite> {
            Ok(self)
        }

        fn serialize_tuple_struct(self, _name: &'static str, _len: usize) -> Result<Self, NonFinite> {
            Ok(self)
        }

        fn serialize_tuple_variant(
            self,
            _name: &'static str,
            _index: u32,
            _variant: &'static str,
            _len: usize,
        ) -> Result<Self, NonFinite> {
            Ok(self)
        }

        fn serialize_map(self, _len: Option<usize>) -> Result<Self, NonFinite> {
            Ok(self)
        }

        fn serialize_struct(self, _name: &'static str, _len: usize) -> Result<Self, NonFinite> {
            Ok(self)
        }

        fn serialize_struct_variant(
            self,
            _name: &'static str,
            _index: u32,
            _variant: &'static str,
            _len: usize,
        ) -> Result<Self, NonFinite> {
            Ok(self)
        }
    }

    impl ser::SerializeSeq for FiniteCheck {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
            value.serialize(FiniteCheck)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }

    impl ser::SerializeTuple for FiniteCheck {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_element<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
            value.serialize(FiniteCheck)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }

    impl ser::SerializeTupleStruct for FiniteCheck {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
            value.serialize(FiniteCheck)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }

    impl ser::SerializeTupleVariant for FiniteCheck {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_field<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
            value.serialize(FiniteCheck)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }

    impl ser::SerializeMap for FiniteCheck {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_key<T: ?Sized + Serialize>(&mut self, key: &T) -> Result<(), NonFinite> {
            key.serialize(FiniteCheck)
        }

        fn serialize_value<T: ?Sized + Serialize>(&mut self, value: &T) -> Result<(), NonFinite> {
            value.serialize(FiniteCheck)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }

    impl ser::SerializeStruct for FiniteCheck {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_field<T: ?Sized + Serialize>(
            &mut self,
            _key: &'static str,
            value: &T,
        ) -> Result<(), NonFinite> {
            value.serialize(FiniteCheck)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }

    impl ser::SerializeStructVariant for FiniteCheck {
        type Ok = ();
        type Error = NonFinite;

        fn serialize_field<T: ?Sized + Serialize>(
            &mut self,
            _key: &'static str,
            value: &T,
        ) -> Result<(), NonFinite> {
            value.serialize(FiniteCheck)
        }

        fn end(self) -> Result<(), NonFinite> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct SessionPayload {
        user_id: i64,
        roles: Vec<String>,
        flash: Option<String>,
        attributes: BTreeMap<String, serde_json::Value>,
    }

    #[test]
    fn test_struct_round_trip() {
        let codec = EntryCodec::new();
        let mut attributes = BTreeMap::new();
        attributes.insert("theme".to_string(), serde_json::json!("dark"));
        let payload = SessionPayload {
            user_id: 42,
            roles: vec!["admin".to_string(), "editor".to_string()],
            flash: None,
            attributes,
        };

        let bytes = codec.encode("session:abc", &payload).unwrap();
        let decoded: SessionPayload = codec.decode("session:abc", &bytes).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_unsized_str_encodes() {
        let codec = EntryCodec::new();
        let bytes = codec.encode("greeting", "hello").unwrap();
        let decoded: String = codec.decode("greeting", &bytes).unwrap();
        assert_eq!(decoded, "hello");
    }

    #[test]
    fn test_key_mismatch_is_codec_error() {
        let codec = EntryCodec::new();
        let bytes = codec.encode("a", &1u32).unwrap();
        let err = codec.decode::<u32>("b", &bytes).unwrap_err();
        assert!(err.is_codec());
        assert!(err.to_string().contains("mismatch"));
    }

    #[test]
    fn test_type_mismatch_is_codec_error() {
        let codec = EntryCodec::new();
        let bytes = codec.encode("n", &"text").unwrap();
        assert!(codec.decode::<u64>("n", &bytes).unwrap_err().is_codec());
    }

    #[test]
    fn test_garbage_is_codec_error() {
        let codec = EntryCodec::new();
        let err = codec.decode::<String>("k", b"\x00\x01 not json").unwrap_err();
        assert!(err.is_codec());
    }

    #[test]
    fn test_non_finite_floats_are_refused() {
        let codec = EntryCodec::new();

        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = codec.encode("f", &value).unwrap_err();
            assert!(err.is_codec(), "{} should be refused", value);
        }

        // Nested inside collections and options as well
        assert!(codec.encode("v", &vec![1.0, f64::NAN]).unwrap_err().is_codec());
        assert!(codec.encode("o", &Some(f32::INFINITY)).unwrap_err().is_codec());

        let mut scores = BTreeMap::new();
        scores.insert("ada".to_string(), f64::NEG_INFINITY);
        assert!(codec.encode("m", &scores).unwrap_err().is_codec());
    }

    #[test]
    fn test_hard_float_round_trips_exactly() {
        let codec = EntryCodec::new();
        let value = f64::from_bits(4525619201375995911);
        let bytes = codec.encode("f", &value).unwrap();
        let decoded: f64 = codec.decode("f", &bytes).unwrap();
        assert_eq!(decoded.to_bits(), value.to_bits());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_f64_bit_patterns(bits in any::<u64>()) {
            let codec = EntryCodec::new();
            let value = f64::from_bits(bits);

            if value.is_finite() {
                let bytes = codec.encode("f", &value).unwrap();
                let decoded: f64 = codec.decode("f", &bytes).unwrap();
                prop_assert_eq!(decoded.to_bits(), value.to_bits());
            } else {
                prop_assert!(codec.encode("f", &value).unwrap_err().is_codec());
            }
        }

        #[test]
        fn prop_decode_reproduces_encoded_value(
            key in "[a-z:]{1,24}",
            user_id in any::<i64>(),
            roles in prop::collection::vec("[a-z]{0,8}", 0..5),
            flash in prop::option::of(".{0,32}"),
        ) {
            let codec = EntryCodec::new();
            let payload = SessionPayload { user_id, roles, flash, attributes: BTreeMap::new() };
            let bytes = codec.encode(&key, &payload).unwrap();
            let decoded: SessionPayload = codec.decode(&key, &bytes).unwrap();
            prop_assert_eq!(decoded, payload);
        }

        #[test]
        fn prop_bytes_round_trip(key in "[a-z]{1,8}", data in prop::collection::vec(any::<u8>(), 0..256)) {
            let codec = EntryCodec::new();
            let bytes = codec.encode(&key, &data).unwrap();
            let decoded: Vec<u8> = codec.decode(&key, &bytes).unwrap();
            prop_assert_eq!(decoded, data);
        }
    }
}
