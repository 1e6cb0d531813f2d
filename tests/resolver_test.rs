//! Integration tests for forward reference resolution.

use std::sync::{Arc, Barrier};
use std::thread;

use docmodel::{
    Category, DefinitionError, Document, FieldSpec, ForwardRefResolver, ResolutionError,
    SchemaBuilder, Value,
};
use serde_json::json;

// === Cache Tests ===

mod cache {
    use super::*;

    #[test]
    fn resolves_and_caches() {
        let schema = SchemaBuilder::embedded("tests.resolver.cache.Address")
            .field("city", FieldSpec::string())
            .finalize()
            .unwrap();
        let resolver = ForwardRefResolver::new();
        resolver.register(Arc::clone(&schema)).unwrap();

        assert!(!resolver.is_cached("tests.resolver.cache.Address"));
        let first = resolver
            .resolve("tests.resolver.cache.Address", Category::Embedded)
            .unwrap();
        let second = resolver
            .resolve("tests.resolver.cache.Address", Category::Embedded)
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &schema));
        assert_eq!(resolver.import_count(), 1);
    }

    #[test]
    fn wrong_category_is_checked_on_cache_hit() {
        let schema = SchemaBuilder::embedded("tests.resolver.cache.Tag")
            .finalize()
            .unwrap();
        let resolver = ForwardRefResolver::new();
        resolver.register(schema).unwrap();
        resolver
            .resolve("tests.resolver.cache.Tag", Category::Embedded)
            .unwrap();

        let err = resolver
            .resolve("tests.resolver.cache.Tag", Category::Document)
            .unwrap_err();
        assert_eq!(
            err,
            ResolutionError::WrongCategory {
                name: "tests.resolver.cache.Tag".into(),
                expected: Category::Document,
                actual: Category::Embedded,
            }
        );
    }

    #[test]
    fn failures_are_not_cached() {
        let resolver = ForwardRefResolver::new();
        let err = resolver
            .resolve("tests.resolver.cache.Late", Category::Document)
            .unwrap_err();
        assert!(matches!(err, ResolutionError::Unknown { .. }));
        assert!(!resolver.is_cached("tests.resolver.cache.Late"));

        let schema = SchemaBuilder::document("tests.resolver.cache.Late")
            .finalize()
            .unwrap();
        resolver.register(schema).unwrap();
        assert!(resolver
            .resolve("tests.resolver.cache.Late", Category::Document)
            .is_ok());
    }

    #[test]
    fn duplicate_registration() {
        let schema = SchemaBuilder::mixin("tests.resolver.cache.Dup")
            .finalize()
            .unwrap();
        let resolver = ForwardRefResolver::new();
        resolver.register(Arc::clone(&schema)).unwrap();
        let err = resolver.register(schema).unwrap_err();
        assert!(matches!(err, DefinitionError::DuplicateSchema { .. }));
    }
}

// === Concurrency Tests ===

mod concurrency {
    use super::*;

    #[test]
    fn concurrent_first_access_imports_once() {
        let comment = SchemaBuilder::embedded("tests.resolver.pkg.Comment")
            .field("body", FieldSpec::string())
            .finalize()
            .unwrap();
        let resolver = Arc::new(ForwardRefResolver::new());
        resolver.register(Arc::clone(&comment)).unwrap();

        let threads = 8;
        let barrier = Arc::new(Barrier::new(threads));
        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    resolver
                        .resolve("tests.resolver.pkg.Comment", Category::Embedded)
                        .unwrap()
                })
            })
            .collect();

        let resolved: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(resolved.iter().all(|s| Arc::ptr_eq(s, &comment)));
        assert_eq!(resolver.import_count(), 1);
        assert!(resolver.is_cached("tests.resolver.pkg.Comment"));
    }

    #[test]
    fn concurrent_path_composition_through_global_resolver() {
        let tag = SchemaBuilder::embedded("tests.resolver.pkg.Tag")
            .field("label", FieldSpec::string().external_name("l"))
            .finalize()
            .unwrap();
        let post = SchemaBuilder::document("tests.resolver.pkg.Post")
            .field(
                "tags",
                FieldSpec::list(FieldSpec::embedded("tests.resolver.pkg.Tag")),
            )
            .finalize()
            .unwrap();

        let barrier = Arc::new(Barrier::new(4));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let post = Arc::clone(&post);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    post.path("tags").unwrap().child("label").unwrap().render()
                })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "tags.l");
        }

        let resolved = ForwardRefResolver::global()
            .resolve("tests.resolver.pkg.Tag", Category::Embedded)
            .unwrap();
        assert!(Arc::ptr_eq(&resolved, &tag));
    }
}

// === Failure Tests ===

mod failures {
    use super::*;

    #[test]
    fn declared_later_resolves_on_retry() {
        let holder = SchemaBuilder::document("tests.resolver.late.Holder")
            .field(
                "item",
                FieldSpec::embedded("tests.resolver.late.Item").required(false),
            )
            .finalize()
            .unwrap();

        let mut doc = Document::empty(&holder).unwrap();
        let err = doc
            .set("item", Value::from(docmodel::RawDocument::new()))
            .unwrap_err();
        assert!(err.is_recoverable());

        SchemaBuilder::embedded("tests.resolver.late.Item")
            .field("n", FieldSpec::int().default(1))
            .finalize()
            .unwrap();
        doc.set("item", Value::from(docmodel::RawDocument::new()))
            .unwrap();
        let wire = doc.to_wire().unwrap();
        assert_eq!(
            wire["item"],
            Value::Map([("n".to_string(), Value::Int(1))].into_iter().collect())
        );
    }

    #[test]
    fn wrong_category_at_use() {
        SchemaBuilder::document("tests.resolver.wrong.Target")
            .finalize()
            .unwrap();
        let holder = SchemaBuilder::embedded("tests.resolver.wrong.Holder")
            .field("inner", FieldSpec::embedded("tests.resolver.wrong.Target"))
            .finalize()
            .unwrap();
        let err = Document::from_json(
            &holder,
            json!({"inner": {}}).as_object().unwrap().clone(),
        )
        .unwrap_err();
        match err {
            docmodel::Error::Resolution(ResolutionError::WrongCategory {
                expected, actual, ..
            }) => {
                assert_eq!(expected, Category::Embedded);
                assert_eq!(actual, Category::Document);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
