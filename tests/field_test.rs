//! Integration tests for field descriptors, the check pipeline and value conversion.

use std::cmp::Ordering;

use chrono::{TimeZone, Utc};
use docmodel::{
    numeric_cmp, Category, Check, Decimal, DefinitionError, ErrorTree, FieldSpec, ObjectId,
    ResolutionError, SchemaBuilder, SchemaRef, ValidateError, Value,
};

fn message(result: Result<(), ValidateError>) -> String {
    match result {
        Err(ValidateError::Invalid(tree)) => tree.to_string(),
        other => panic!("expected invalid, got {:?}", other),
    }
}

// === Declaration Tests ===

mod declaration {
    use super::*;

    #[test]
    fn defaults() {
        let spec = FieldSpec::string();
        assert!(spec.is_required());
        assert!(!spec.is_nullable());
        assert!(spec.default_value().is_none());
    }

    #[test]
    fn wire_name_falls_back_to_name() {
        let schema = SchemaBuilder::embedded("tests.field.declaration.Counter")
            .field("count", FieldSpec::int())
            .field("total", FieldSpec::int().external_name("tot"))
            .finalize()
            .unwrap();
        assert_eq!(schema.field("count").unwrap().wire_name(), "count");
        assert_eq!(schema.field("total").unwrap().wire_name(), "tot");
        assert_eq!(schema.field("total").unwrap().name(), "total");
    }

    #[test]
    fn generator_default_is_invoked_per_use() {
        let spec = FieldSpec::list(FieldSpec::int()).default_with(|| Value::List(vec![]));
        assert_eq!(spec.default_value(), spec.default_value());

        let spec = FieldSpec::object_id().default_with(|| Value::ObjectId(ObjectId::new()));
        assert_ne!(spec.default_value(), spec.default_value());
    }

    #[test]
    fn invalid_pattern_is_definition_error() {
        let err = FieldSpec::string().pattern("(").unwrap_err();
        assert!(matches!(err, DefinitionError::InvalidPattern { .. }));
    }

    #[test]
    fn inapplicable_options_are_reported() {
        let err = SchemaBuilder::embedded("tests.field.declaration.Flags")
            .field("flag", FieldSpec::boolean().max_length(3))
            .finalize()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "option 'max_length' does not apply to bool field 'tests.field.declaration.Flags.flag'"
        );

        let err = SchemaBuilder::embedded("tests.field.declaration.Bounded")
            .field("n", FieldSpec::int().gte("x"))
            .finalize()
            .unwrap_err();
        assert!(matches!(err, DefinitionError::InapplicableOption { .. }));
    }

    #[test]
    fn pending_target_name() {
        let spec = FieldSpec::embedded("blog.Address");
        let target = spec.path_target().unwrap();
        assert_eq!(target.name(), "blog.Address");
        assert!(matches!(
            target,
            SchemaRef::Pending {
                category: Category::Embedded,
                ..
            }
        ));
        assert!(FieldSpec::list(FieldSpec::int()).path_target().is_none());
    }
}

// === Check Order Tests ===

mod check_order {
    use super::*;

    #[test]
    fn string_checks() {
        let spec = FieldSpec::string()
            .pattern("[a-z]+")
            .unwrap()
            .min_length(1)
            .max_length(5);
        assert_eq!(
            spec.checks(),
            vec![
                Check::NotNull,
                Check::Type,
                Check::Pattern,
                Check::Blank,
                Check::MinLength,
                Check::MaxLength
            ]
        );
    }

    #[test]
    fn choices_bypass_constraints() {
        let spec = FieldSpec::int().gte(3).choices([1, 2]);
        assert_eq!(
            spec.checks(),
            vec![Check::NotNull, Check::Type, Check::Choices]
        );
    }

    #[test]
    fn any_and_reference_skip_type_check() {
        assert_eq!(FieldSpec::any().checks(), vec![Check::NotNull]);
        assert_eq!(
            FieldSpec::reference("nowhere.Doc").checks(),
            vec![Check::NotNull, Check::Reference]
        );
    }

    #[test]
    fn list_checks_items_last() {
        let spec = FieldSpec::list(FieldSpec::int()).min_length(1).max_length(3);
        assert_eq!(
            spec.checks(),
            vec![
                Check::NotNull,
                Check::Type,
                Check::MinLength,
                Check::MaxLength,
                Check::Items
            ]
        );
    }
}

// === Validation Tests ===

mod validation {
    use super::*;

    #[test]
    fn null_handling() {
        assert_eq!(
            message(FieldSpec::int().validate(&Value::Null)),
            "none value is not allowed"
        );
        assert!(FieldSpec::int().nullable(true).validate(&Value::Null).is_ok());
    }

    #[test]
    fn type_mismatch() {
        assert_eq!(
            message(FieldSpec::int().validate(&Value::from("1"))),
            "invalid value type"
        );
        assert_eq!(
            message(FieldSpec::float().validate(&Value::Int(1))),
            "invalid value type"
        );
        assert!(FieldSpec::any().validate(&Value::from("x")).is_ok());
    }

    #[test]
    fn blank_strings() {
        assert_eq!(
            message(FieldSpec::string().validate(&Value::from(""))),
            "blank value is not allowed"
        );
        let spec = FieldSpec::string().allow_blank(true).min_length(3);
        assert!(spec.validate(&Value::from("")).is_ok());
    }

    #[test]
    fn string_constraints() {
        let spec = FieldSpec::string().min_length(2).max_length(4);
        assert_eq!(
            message(spec.validate(&Value::from("a"))),
            "length is less than 2"
        );
        assert_eq!(
            message(spec.validate(&Value::from("abcde"))),
            "length is greater than 4"
        );
        assert!(spec.validate(&Value::from("abc")).is_ok());
    }

    #[test]
    fn pattern_is_anchored_at_start() {
        let spec = FieldSpec::string().pattern(r"\d+").unwrap();
        assert!(spec.validate(&Value::from("12ab")).is_ok());
        assert_eq!(
            message(spec.validate(&Value::from("ab12"))),
            r"value does not match pattern \d+"
        );
    }

    #[test]
    fn email_addresses() {
        let spec = FieldSpec::email();
        assert!(spec.validate(&Value::from("totti@example.com")).is_ok());
        assert_eq!(
            message(spec.validate(&Value::from("not an email"))),
            "value is not a valid email address"
        );
    }

    #[test]
    fn numeric_bounds() {
        let spec = FieldSpec::int().gte(1).lte(10);
        assert_eq!(message(spec.validate(&Value::Int(0))), "value is less than 1");
        assert_eq!(
            message(spec.validate(&Value::Int(11))),
            "value is greater than 10"
        );
        assert!(spec.validate(&Value::Int(10)).is_ok());

        let spec = FieldSpec::float().gt(0).lt(1.5);
        assert_eq!(
            message(spec.validate(&Value::Float(0.0))),
            "value should be greater than 0"
        );
        assert_eq!(
            message(spec.validate(&Value::Float(1.5))),
            "value should be less than 1.5"
        );
    }

    #[test]
    fn decimal_bounds() {
        let spec = FieldSpec::decimal().gte(Decimal::parse("0.5").unwrap());
        assert!(spec
            .validate(&Value::Decimal(Decimal::parse("0.50").unwrap()))
            .is_ok());
        assert_eq!(
            message(spec.validate(&Value::Decimal(Decimal::parse("0.4").unwrap()))),
            "value is less than 0.5"
        );
    }

    #[test]
    fn choices_stop_the_pipeline() {
        let spec = FieldSpec::string().max_length(1).choices(["xxx", "yyy"]);
        assert!(spec.validate(&Value::from("xxx")).is_ok());
        assert_eq!(
            message(spec.validate(&Value::from("zzz"))),
            "value does not match any variant"
        );
    }

    #[test]
    fn list_length_and_items() {
        let spec = FieldSpec::list(FieldSpec::int()).min_length(1).max_length(3);
        assert_eq!(
            message(spec.validate(&Value::List(vec![]))),
            "list length is less than 1"
        );
        let four = Value::List((1..=4).map(Value::from).collect());
        assert_eq!(message(spec.validate(&four)), "list length is greater than 3");

        let mixed = Value::List(vec![Value::Int(1), Value::from("x"), Value::Null]);
        assert_eq!(
            message(spec.validate(&mixed)),
            "{1: invalid value type, 2: none value is not allowed}"
        );
    }

    #[test]
    fn custom_validator_runs_last() {
        let spec = FieldSpec::int().gte(0).validator(|v| match v.as_i64() {
            Some(n) if n % 2 == 0 => Ok(()),
            _ => Err(ErrorTree::leaf("value should be even")),
        });
        assert_eq!(message(spec.validate(&Value::Int(-1))), "value is less than 0");
        assert_eq!(message(spec.validate(&Value::Int(3))), "value should be even");
        assert!(spec.validate(&Value::Int(4)).is_ok());
    }

    #[test]
    fn numeric_comparison_across_kinds() {
        assert_eq!(
            numeric_cmp(&Value::Int(1), &Value::Float(1.5)),
            Some(Ordering::Less)
        );
        assert_eq!(
            numeric_cmp(&Value::Decimal(Decimal::from_i64(2)), &Value::Int(2)),
            Some(Ordering::Equal)
        );
        assert_eq!(numeric_cmp(&Value::from("1"), &Value::Int(1)), None);
    }
}

// === Conversion Tests ===

mod conversion {
    use super::*;

    #[test]
    fn int_coercion() {
        let spec = FieldSpec::int();
        assert_eq!(
            spec.convert_from_user(Value::from(" 42 ")).unwrap(),
            Value::Int(42)
        );
        assert_eq!(
            spec.convert_from_user(Value::Float(3.0)).unwrap(),
            Value::Int(3)
        );
        // not coercible values are kept for validation to report
        assert_eq!(
            spec.convert_from_user(Value::Float(3.5)).unwrap(),
            Value::Float(3.5)
        );
        assert_eq!(
            spec.convert_from_user(Value::from("abc")).unwrap(),
            Value::from("abc")
        );
    }

    #[test]
    fn float_coercion() {
        let spec = FieldSpec::float();
        assert_eq!(
            spec.convert_from_user(Value::Int(2)).unwrap(),
            Value::Float(2.0)
        );
        assert_eq!(
            spec.convert_from_user(Value::from("1.25")).unwrap(),
            Value::Float(1.25)
        );
    }

    #[test]
    fn decimal_coercion_and_wire() {
        let spec = FieldSpec::decimal();
        let value = spec.convert_from_user(Value::from("13.456")).unwrap();
        assert_eq!(value, Value::Decimal(Decimal::parse("13.456").unwrap()));

        let wire = spec.to_wire(&value).unwrap();
        match &wire {
            Value::Decimal128(d) => assert_eq!(d.to_string(), "13.456"),
            other => panic!("expected a wire decimal, got {:?}", other),
        }
        assert_eq!(spec.from_wire(wire).unwrap(), value);
    }

    #[test]
    fn decimal_exponent_overflow_is_kept_as_given() {
        let spec = FieldSpec::decimal();
        for input in [
            "0.1e-9223372036854775808".to_string(),
            format!("1{}e9223372036854775807", "0".repeat(40)),
        ] {
            let value = spec.convert_from_user(Value::from(input.as_str())).unwrap();
            assert_eq!(value, Value::from(input.as_str()));
            assert_eq!(
                message(spec.validate(&value)),
                "invalid value type"
            );
        }
    }

    #[test]
    fn plain_stored_decimals_are_read_back() {
        let spec = FieldSpec::decimal();
        assert_eq!(
            spec.from_wire(Value::Int(3)).unwrap(),
            Value::Decimal(Decimal::from_i64(3))
        );
        assert_eq!(
            spec.from_wire(Value::from("2.50")).unwrap(),
            Value::Decimal(Decimal::parse("2.50").unwrap())
        );
        assert_eq!(
            spec.from_wire(Value::Float(0.25)).unwrap(),
            Value::Decimal(Decimal::parse("0.25").unwrap())
        );
        assert!(spec.validate(&spec.from_wire(Value::Int(3)).unwrap()).is_ok());
    }

    #[test]
    fn datetime_and_object_id_from_strings() {
        let dt = FieldSpec::datetime()
            .convert_from_user(Value::from("2017-03-19T10:00:00Z"))
            .unwrap();
        assert_eq!(
            dt,
            Value::DateTime(Utc.with_ymd_and_hms(2017, 3, 19, 10, 0, 0).unwrap())
        );

        let oid = FieldSpec::object_id()
            .convert_from_user(Value::from("58ce6d537e592254b67a503d"))
            .unwrap();
        assert_eq!(
            oid,
            Value::ObjectId(ObjectId::parse_str("58ce6d537e592254b67a503d").unwrap())
        );

        let bad = FieldSpec::object_id()
            .convert_from_user(Value::from("58ce6d537e592254b67a503z"))
            .unwrap();
        assert_eq!(bad, Value::from("58ce6d537e592254b67a503z"));
    }

    #[test]
    fn null_passes_through() {
        for spec in [FieldSpec::int(), FieldSpec::decimal(), FieldSpec::string()] {
            assert!(spec.convert_from_user(Value::Null).unwrap().is_null());
            assert!(spec.to_wire(&Value::Null).unwrap().is_null());
            assert!(spec.from_wire(Value::Null).unwrap().is_null());
        }
    }

    #[test]
    fn list_converts_element_wise() {
        let spec = FieldSpec::list(FieldSpec::decimal());
        let value = spec
            .convert_from_user(Value::List(vec![Value::Int(1), Value::from("2.5")]))
            .unwrap();
        let wire = spec.to_wire(&value).unwrap();
        let items = wire.as_list().unwrap();
        assert!(items.iter().all(|v| matches!(v, Value::Decimal128(_))));
        assert_eq!(spec.from_wire(wire).unwrap(), value);
    }

    #[test]
    fn unresolved_target_is_an_error() {
        let spec = FieldSpec::embedded("tests.field.conversion.Missing");
        let err = spec
            .convert_from_user(Value::Map(Default::default()))
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Unknown { .. }));
    }
}
