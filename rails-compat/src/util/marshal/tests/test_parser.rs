#[cfg(test)]
mod parser_tests {
    use num_bigint::BigInt;

    use crate::{
        error::marshal::{EncodingError, MarshalError},
        util::marshal::{
            load, load_base64,
            models::{Value, WrapperKind, WrapperTag},
            parser::{MarshalReader, DEFAULT_MAX_DEPTH},
        },
    };

    /// `Marshal.dump` of a Rails 7 cookie session hash
    const SESSION_PAYLOAD: &str = "BAh7EUkiEF9jc3JmX3Rva2VuBjoGRUZJIjE0UFFmNjFubXVyVEwzSUNtR1VLd1EwWWtkVXc0cWlXYjZxVXJMWVZBaUFRPQY7AEZJIhFhY2NvdW50X3R5cGUGOwBGSSILZG9jdG9yBjsAVEkiEmNvbm5lY3Rpb25faWQGOwBGSSIpYzIzMTQ2YjQtZWZhYy00YTJhLTk4NjQtMjczZDZhMTg3Y2MwBjsARkkiFW9yZ2FuaXphdGlvbl9pZHMGOwBGSSIONDM0MDg3MDIwBjsARkkiD3Nlc3Npb25faWQGOwBUSSIlZGMyOTRkYzI0MTIyM2VkMzVkZTg2MzA1NTZjZTUwM2UGOwBUSSILbG9jYWxlBjsARjoHZnJJIg9hY2NvdW50X2lkBjsARmkEQUbgB0kiFWF1dGhlbnRpY2F0ZWRfYXQGOwBGbCsHL3gVZUkiGWFic29sdXRlX2xvZ291dF9kYXRlBjsARlU6IEFjdGl2ZVN1cHBvcnQ6OlRpbWVXaXRoWm9uZVsISXU6CVRpbWUNoOMewAAAAAAGOgl6b25lSSIIVVRDBjsARkkiClBhcmlzBjsAVEl1OwgNouMewAAAAAAGOwlAF0kiHXJlbGF0aXZlX2xvZ291dF9kdXJhdGlvbgY7AEZvOhxBY3RpdmVTdXBwb3J0OjpEdXJhdGlvbgg6C0BwYXJ0c3sGOgpob3Vyc2kGOgtAdmFsdWVpAhAOOg5AdmFyaWFibGVGSSIZcmVsYXRpdmVfbG9nb3V0X2RhdGUGOwBGVTsHWwhJdTsIDY3jHsClHVXlBjsJQBdAGUl1OwgNj+MewKUdVeUGOwlAF0kiImxhc3RfcGFzc3dvcmRfY2hhbmdlX2NoZWNrX2F0BjsARmwrBzB4FWU=";

    /// Prefix some value bytes with the version header
    fn stream(body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0x04, 0x08];
        bytes.extend_from_slice(body);
        bytes
    }

    fn symbol(name: &str) -> Value {
        Value::Symbol(format!(":{name}"))
    }

    #[test]
    fn test_parse_header() {
        let bytes = stream(&[0x30]);
        let mut parser = MarshalReader::from(&bytes);
        assert!(parser.validate_header().is_ok());
    }

    #[test]
    fn cant_parse_wrong_version() {
        assert_eq!(
            load(&[0x04, 0x09, 0x30]),
            Err(MarshalError::UnsupportedVersion(4, 9))
        );
    }

    #[test]
    fn cant_parse_empty() {
        assert_eq!(load(&[]), Err(MarshalError::UnexpectedEndOfInput(0, 2)));
        assert_eq!(load_base64(""), Err(MarshalError::UnexpectedEndOfInput(0, 2)));
    }

    #[test]
    fn cant_parse_truncated_header() {
        assert_eq!(load(&[0x04]), Err(MarshalError::UnexpectedEndOfInput(0, 2)));
    }

    #[test]
    fn cant_parse_missing_value() {
        assert_eq!(
            load(&[0x04, 0x08]),
            Err(MarshalError::UnexpectedEndOfInput(2, 1))
        );
    }

    #[test]
    fn cant_parse_invalid_base64() {
        assert!(matches!(
            load_base64("invalid_base64_data!"),
            Err(MarshalError::InvalidEncoding(EncodingError::Base64(_)))
        ));
    }

    #[test]
    fn cant_parse_base64_that_is_not_marshal() {
        // "abcdefgh"
        assert_eq!(
            load_base64("YWJjZGVmZ2g="),
            Err(MarshalError::UnsupportedVersion(b'a', b'b'))
        );
    }

    #[test]
    fn cant_parse_unknown_type() {
        assert_eq!(
            load(&stream(&[0x78])),
            Err(MarshalError::UnsupportedType(0x78, 2))
        );
    }

    #[test]
    fn test_parse_nil_true_false() {
        assert_eq!(load(&stream(b"0")), Ok(Value::Nil));
        assert_eq!(load(&stream(b"T")), Ok(Value::Bool(true)));
        assert_eq!(load(&stream(b"F")), Ok(Value::Bool(false)));
    }

    #[test]
    fn test_parse_known_integer() {
        assert_eq!(load_base64("BAhpBg=="), Ok(Value::from(1)));
    }

    #[test]
    fn test_parse_integers() {
        let cases: Vec<(Vec<u8>, i64)> = vec![
            (vec![0x80], -123),
            (vec![0xfa], -1),
            (vec![0x00], 0),
            (vec![0x06], 1),
            (vec![0x7f], 122),
            (vec![0x01, 0x7b], 123),
            (vec![0x01, 0xff], 255),
            (vec![0x03, 0x00, 0x00, 0x01], 65536),
            (vec![0xfe, 0x00, 0x00], -65536),
            (vec![0xff, 0x84], -124),
            (vec![0xfe, 0xff, 0xfe], -257),
            (vec![0x04, 0xff, 0xff, 0xff, 0x3f], 1_073_741_823),
            (vec![0xfc, 0x00, 0x00, 0x00, 0xc0], -1_073_741_824),
        ];

        for (packed, expected) in cases {
            let mut body = vec![b'i'];
            body.extend_from_slice(&packed);
            let result = load(&stream(&body)).unwrap();
            assert_eq!(result.as_i64(), Some(expected), "packed as {packed:x?}");
        }
    }

    #[test]
    fn cant_parse_truncated_integer() {
        assert_eq!(
            load(&stream(&[b'i', 0x03, 0x00])),
            Err(MarshalError::UnexpectedEndOfInput(4, 3))
        );
    }

    #[test]
    fn test_parse_bignum_positive() {
        // 2 ** 100
        let mut body = vec![b'l', b'+', 0x0c];
        body.extend([0; 12]);
        body.extend([0x10, 0x00]);

        let result = load(&stream(&body)).unwrap();
        assert_eq!(result, Value::Integer(BigInt::from(1u8) << 100));
        assert_eq!(result.as_i64(), None);
    }

    #[test]
    fn test_parse_bignum_negative() {
        // -(2 ** 100)
        let mut body = vec![b'l', b'-', 0x0c];
        body.extend([0; 12]);
        body.extend([0x10, 0x00]);

        let result = load(&stream(&body)).unwrap();
        assert_eq!(result, Value::Integer(-(BigInt::from(1u8) << 100usize)));
    }

    #[test]
    fn test_parse_bignum_fits_i64() {
        let result = load(&stream(&[b'l', b'+', 0x07, 0x30, 0x78, 0x15, 0x65])).unwrap();
        assert_eq!(result.as_i64(), Some(1_695_905_840));
    }

    #[test]
    fn test_parse_known_string() {
        let result = load_base64("BAhJIgthemVydHkGOgZFVA==").unwrap();
        assert_eq!(result, Value::from("azerty"));
    }

    #[test]
    fn test_parse_empty_string() {
        assert_eq!(load(&stream(&[b'"', 0x00])), Ok(Value::from("")));
    }

    #[test]
    fn test_parse_unicode_string() {
        let mut body = vec![b'"', 0x0b];
        body.extend("héllo".as_bytes());
        assert_eq!(load(&stream(&body)), Ok(Value::from("héllo")));
    }

    #[test]
    fn cant_parse_invalid_utf8_string() {
        assert!(matches!(
            load(&stream(&[b'"', 0x06, 0xff])),
            Err(MarshalError::InvalidEncoding(EncodingError::Utf8(_)))
        ));
    }

    #[test]
    fn cant_parse_truncated_string() {
        assert_eq!(
            load(&stream(b"\"\x0babc")),
            Err(MarshalError::UnexpectedEndOfInput(4, 6))
        );
    }

    #[test]
    fn cant_parse_negative_length() {
        assert_eq!(
            load(&stream(&[b'"', 0xfa])),
            Err(MarshalError::InvalidLength(-1, 3))
        );
        assert_eq!(
            load(&stream(&[b'[', 0x80])),
            Err(MarshalError::InvalidLength(-123, 3))
        );
    }

    #[test]
    fn test_parse_known_symbol() {
        assert_eq!(load_base64("BAg6C2F6ZXJ0eQ=="), Ok(symbol("azerty")));
    }

    #[test]
    fn test_parse_empty_symbol() {
        assert_eq!(load(&stream(&[b':', 0x00])), Ok(Value::Symbol(":".to_string())));
    }

    #[test]
    fn test_parse_symbol_reuse() {
        // [:same, :same, :other, :same]
        let bytes = stream(b"[\x09:\x09same;\x00:\x0aother;\x00");
        let result = load(&bytes).unwrap();
        let items = result.as_array().unwrap();

        assert_eq!(items.len(), 4);
        assert_eq!(items[0], symbol("same"));
        assert_eq!(items[0], items[1]);
        assert_eq!(items[0], items[3]);
        assert_eq!(items[2], symbol("other"));
        assert_ne!(items[2], items[0]);
    }

    #[test]
    fn test_parse_symbol_links_count_spellings_only() {
        // [:a, :a, :b, :b] where the second :b links to index 1, not 2
        let bytes = stream(b"[\x09:\x06a;\x00:\x06b;\x06");
        let result = load(&bytes).unwrap();

        assert_eq!(
            result,
            Value::Array(vec![symbol("a"), symbol("a"), symbol("b"), symbol("b")])
        );
    }

    #[test]
    fn cant_parse_symbol_link_past_table() {
        assert_eq!(
            load(&stream(&[b';', 0x06])),
            Err(MarshalError::InvalidSymbolLink(1, 0))
        );
        assert_eq!(
            load(&stream(b"[\x07:\x06a;\x06")),
            Err(MarshalError::InvalidSymbolLink(1, 1))
        );
    }

    #[test]
    fn cant_parse_negative_symbol_link() {
        assert_eq!(
            load(&stream(&[b';', 0xfa])),
            Err(MarshalError::InvalidSymbolLink(-1, 0))
        );
    }

    #[test]
    fn test_parse_known_hash() {
        let result = load_base64("BAh7BkkiB2F6BjoGRVRJIgdxcwY7AFQ=").unwrap();

        assert_eq!(
            result,
            Value::Hash(vec![(Value::from("az"), Value::from("qs"))])
        );
        assert_eq!(result.get("az"), Some(&Value::from("qs")));
    }

    #[test]
    fn test_parse_hash_keeps_duplicate_keys() {
        // {:a => 1, :a => 2}
        let result = load(&stream(b"{\x07:\x06ai\x06;\x00i\x07")).unwrap();

        assert_eq!(
            result.as_hash().unwrap(),
            &[
                (symbol("a"), Value::from(1)),
                (symbol("a"), Value::from(2)),
            ]
        );
        assert_eq!(result.get("a"), Some(&Value::from(2)));
    }

    #[test]
    fn cant_parse_truncated_hash() {
        // One pair promised, only a key present
        assert_eq!(
            load(&stream(b"{\x06i\x06")),
            Err(MarshalError::UnexpectedEndOfInput(6, 1))
        );
    }

    #[test]
    fn test_parse_nested_arrays() {
        let levels = 50;
        let mut body = b"[\x06".repeat(levels);
        body.push(b'0');

        let mut result = load(&stream(&body)).unwrap();
        let mut depth = 0;
        while let Value::Array(mut items) = result {
            assert_eq!(items.len(), 1);
            result = items.remove(0);
            depth += 1;
        }

        assert_eq!(depth, levels);
        assert_eq!(result, Value::Nil);
    }

    #[test]
    fn test_parse_hash_of_hashes() {
        let entries: u8 = 20;
        // {0 => {"n" => 0}, 1 => {"n" => 1}, ...}
        let mut body = vec![b'{', entries + 5];
        for idx in 0..entries {
            body.extend([b'i', idx + 5]);
            body.extend([b'{', 0x06, b'"', 0x06, b'n', b'i', idx + 5]);
        }

        let result = load(&stream(&body)).unwrap();
        let pairs = result.as_hash().unwrap();

        assert_eq!(pairs.len(), entries as usize);
        for (idx, (key, value)) in pairs.iter().enumerate() {
            assert_eq!(key.as_i64(), Some(idx as i64));
            let inner = value.as_hash().unwrap();
            assert_eq!(inner.len(), 1);
            assert_eq!(value.get("n").and_then(Value::as_i64), Some(idx as i64));
        }
    }

    #[test]
    fn cant_parse_past_max_depth() {
        let mut body = b"[\x06".repeat(20);
        body.push(b'0');
        let bytes = stream(&body);

        let mut parser = MarshalReader::with_max_depth(&bytes, 10);
        assert_eq!(parser.parse(), Err(MarshalError::ExcessiveNesting(10)));

        let mut parser = MarshalReader::with_max_depth(&bytes, 21);
        assert!(parser.parse().is_ok());
    }

    #[test]
    fn cant_parse_past_default_max_depth() {
        let mut body = b"[\x06".repeat(DEFAULT_MAX_DEPTH + 10);
        body.push(b'0');

        assert_eq!(
            load(&stream(&body)),
            Err(MarshalError::ExcessiveNesting(DEFAULT_MAX_DEPTH))
        );
    }

    #[test]
    fn test_parse_object() {
        // #<Foo @a=1>
        let result = load(&stream(b"o:\x08Foo\x06:\x07@ai\x06")).unwrap();
        let object = result.as_object().unwrap();

        assert_eq!(object.kind, WrapperKind::Object);
        assert_eq!(object.tag, Some(WrapperTag::Symbol(":Foo".to_string())));
        assert_eq!(object.class_name(), Some("Foo"));
        assert_eq!(object.children, vec![symbol("@a"), Value::from(1)]);
        assert_eq!(
            object.fields().collect::<Vec<_>>(),
            vec![(&symbol("@a"), &Value::from(1))]
        );
    }

    #[test]
    fn test_parse_object_with_linked_class_name() {
        // [#<Foo>, #<Foo>]
        let result = load(&stream(b"[\x07o:\x08Foo\x00o;\x00\x00")).unwrap();
        let items = result.as_array().unwrap();

        assert_eq!(items[0], items[1]);
        assert_eq!(items[1].as_object().unwrap().class_name(), Some("Foo"));
    }

    #[test]
    fn cant_parse_object_without_symbol() {
        assert_eq!(
            load(&stream(b"o\"\x08Foo\x00")),
            Err(MarshalError::UnexpectedType("SYMBOL", b'"', 3))
        );
    }

    #[test]
    fn test_parse_userdef() {
        // Time#_dump output is binary
        let result = load(&stream(b"u:\x09Time\x0d\xa0\xe3\x1e\xc0\x00\x00\x00\x00")).unwrap();
        let object = result.as_object().unwrap();

        assert_eq!(object.kind, WrapperKind::UserDef);
        assert_eq!(object.class_name(), Some("Time"));
        assert_eq!(object.children.len(), 1);
        assert!(object.children[0].as_str().unwrap().ends_with("\0\0\0\0"));
    }

    #[test]
    fn test_parse_usr_marshal() {
        let result = load(&stream(b"U:\x08Foo[\x06i\x06")).unwrap();
        let object = result.as_object().unwrap();

        assert_eq!(object.kind, WrapperKind::UsrMarshal);
        assert_eq!(object.class_name(), Some("Foo"));
        assert_eq!(object.children, vec![Value::Array(vec![Value::from(1)])]);
    }

    #[test]
    fn test_parse_extended() {
        let result = load(&stream(b"e")).unwrap();
        let object = result.as_object().unwrap();

        assert_eq!(object.kind, WrapperKind::Extended);
        assert!(object.tag.is_none());
        assert!(object.children.is_empty());
    }

    #[test]
    fn test_parse_link() {
        let result = load(&stream(b"@\x06")).unwrap();
        let object = result.as_object().unwrap();

        assert_eq!(object.kind, WrapperKind::Link);
        assert_eq!(object.tag, Some(WrapperTag::Link(1)));
        assert!(object.children.is_empty());
    }

    #[test]
    fn test_parse_ivars_with_linked_keys() {
        // ["a", "b"] where both strings carry E=true
        let result = load(&stream(b"[\x07I\"\x06a\x06:\x06ETI\"\x06b\x06;\x00T")).unwrap();
        assert_eq!(
            result,
            Value::Array(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn cant_parse_ivars_with_non_symbol_key() {
        assert_eq!(
            load(&stream(b"I\"\x06a\x06i\x06T")),
            Err(MarshalError::UnexpectedType("SYMBOL", b'i', 7))
        );
    }

    #[test]
    fn test_parse_session() {
        let result = load_base64(SESSION_PAYLOAD).unwrap();

        assert_eq!(result.as_hash().unwrap().len(), 12);
        assert_eq!(
            result.get("_csrf_token").and_then(Value::as_str),
            Some("4PQf61nmurTL3ICmGUKwQ0YkdUw4qiWb6qUrLYVAiAQ=")
        );
        assert_eq!(result.get("account_type").and_then(Value::as_str), Some("doctor"));
        assert_eq!(result.get("locale").and_then(Value::as_symbol), Some("fr"));
        assert_eq!(result.get("account_id").and_then(Value::as_i64), Some(132_138_561));
        assert_eq!(
            result.get("authenticated_at").and_then(Value::as_i64),
            Some(1_695_905_839)
        );
        assert_eq!(
            result
                .get("last_password_change_check_at")
                .and_then(Value::as_i64),
            Some(1_695_905_840)
        );
    }

    #[test]
    fn test_parse_session_objects() {
        let result = load_base64(SESSION_PAYLOAD).unwrap();

        let duration = result
            .get("relative_logout_duration")
            .and_then(Value::as_object)
            .unwrap();
        assert_eq!(duration.kind, WrapperKind::Object);
        assert_eq!(duration.class_name(), Some("ActiveSupport::Duration"));
        let fields: Vec<_> = duration.fields().collect();
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[0].0, &symbol("@parts"));
        assert_eq!(fields[0].1.get("hours").and_then(Value::as_i64), Some(1));
        assert_eq!(fields[1], (&symbol("@value"), &Value::from(3600)));
        assert_eq!(fields[2], (&symbol("@variable"), &Value::Bool(false)));

        let date = result
            .get("absolute_logout_date")
            .and_then(Value::as_object)
            .unwrap();
        assert_eq!(date.kind, WrapperKind::UsrMarshal);
        assert_eq!(date.class_name(), Some("ActiveSupport::TimeWithZone"));
        let parts = date.children[0].as_array().unwrap();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].as_object().unwrap().class_name(), Some("Time"));
        assert_eq!(parts[1], Value::from("Paris"));

        let relative = result
            .get("relative_logout_date")
            .and_then(Value::as_object)
            .unwrap();
        let parts = relative.children[0].as_array().unwrap();
        assert_eq!(
            parts[1].as_object().unwrap().tag,
            Some(WrapperTag::Link(20))
        );
    }

    #[test]
    fn test_parse_is_repeatable() {
        let first = load_base64(SESSION_PAYLOAD).unwrap();
        let second = load_base64(SESSION_PAYLOAD).unwrap();
        assert_eq!(first, second);

        // A fresh reader has an empty symbol table, so a bare link fails every time
        let bytes = stream(&[b';', 0x00]);
        assert_eq!(load(&bytes), Err(MarshalError::InvalidSymbolLink(0, 0)));
        assert_eq!(load(&bytes), Err(MarshalError::InvalidSymbolLink(0, 0)));
    }

    #[test]
    fn test_parse_ignores_trailing_bytes() {
        assert_eq!(load(&stream(b"i\x06garbage")), Ok(Value::from(1)));
    }
}
