//! Resolution behavior as seen through the public API

use latent::context::Context;
use latent::deferred::Deferred;
use latent::error::{ErrorKind, ResolveError};
use latent::registry::Registry;
use latent::resolve::{resolve, ResolveOptions, MAX_DEPTH};
use latent::value::{Callable, Construct, Resolved, Value};
use pretty_assertions::assert_eq;
use std::sync::{Arc, OnceLock};

fn vpc_id() -> Deferred {
    Deferred::hinted("VpcId", |_| Value::from("vpc-123")).unwrap()
}

/// Resolve with the global registry, which is what `format!("{deferred}")` registers with
fn resolve_default(value: &Value) -> Result<Option<Resolved>, ResolveError> {
    resolve(value, &ResolveOptions::default())
}

fn resolve_with(
    value: &Value,
    context: Context,
    registry: &Registry,
) -> Result<Option<Resolved>, ResolveError> {
    resolve(
        value,
        &ResolveOptions {
            context,
            registry: Some(registry),
            ..Default::default()
        },
    )
}

fn nested_arrays(depth: usize) -> Value {
    (0..depth).fold(Value::from(1), |inner, _| Value::Array(vec![inner]))
}

#[derive(Debug)]
struct StackNode;

impl Construct for StackNode {
    fn node_path(&self) -> String {
        "GoedeMorgen/MyVpc".to_string()
    }
}

#[test]
fn example_scenario() {
    let d1 = vpc_id();

    assert_eq!(
        resolve_default(&Value::object([
            ("id", Value::from(d1.clone())),
            ("tags", Value::Undefined),
        ])),
        Ok(Some(Resolved::object([("id", "vpc-123")])))
    );

    assert_eq!(
        resolve_default(&Value::from(format!("arn:{d1}"))),
        Ok(Some(Resolved::from("arn:vpc-123")))
    );

    assert_eq!(
        resolve_default(&Callable::new(|_| Value::Null).into()),
        Err(ErrorKind::UnsupportedDeferred.at("/"))
    );
}

#[test]
fn literals_round_trip() {
    let value = Value::object([
        ("name", Value::from("web")),
        ("cpu", Value::from(1024)),
        ("ratio", Value::from(0.25)),
        ("essential", Value::from(true)),
        ("nothing", Value::Null),
        (
            "ports",
            Value::from(vec![Value::from(80), Value::object([("host", 8080)])]),
        ),
    ]);

    let expected = Resolved::object([
        ("name", Resolved::from("web")),
        ("cpu", Resolved::from(1024)),
        ("ratio", Resolved::from(0.25)),
        ("essential", Resolved::from(true)),
        ("nothing", Resolved::Null),
        (
            "ports",
            Resolved::from(vec![Resolved::from(80), Resolved::object([("host", 8080)])]),
        ),
    ]);

    assert_eq!(resolve_default(&value), Ok(Some(expected)));
}

#[test]
fn producers_see_the_context() {
    let registry = Registry::new();
    let region = Deferred::hinted("AWS::Region", |context| {
        context.get_str("region").map(Value::from).into()
    })
    .unwrap();
    let context: Context = [("region", "eu-central-1")].into_iter().collect();

    assert_eq!(
        resolve_with(&region.clone().into(), context, &registry),
        Ok(Some(Resolved::from("eu-central-1")))
    );
    assert_eq!(resolve_with(&region.into(), Context::new(), &registry), Ok(None));
}

#[test]
fn producer_results_are_resolved_again() {
    let registry = Registry::new();
    let inner = vpc_id();
    let marker = inner.to_scalar_marker(&registry);
    let outer = Deferred::from_fn(move |_| {
        Value::object([
            ("direct", Value::from(inner.clone())),
            ("embedded", Value::from(format!("{marker}/subnet"))),
            ("dropped", Value::Undefined),
        ])
    });

    assert_eq!(
        resolve_with(&outer.into(), Context::new(), &registry),
        Ok(Some(Resolved::object([
            ("direct", "vpc-123"),
            ("embedded", "vpc-123/subnet"),
        ])))
    );
}

#[test]
fn sole_marker_resolves_like_the_value() {
    let registry = Registry::new();
    let ports = Deferred::from_fn(|_| Value::from(vec![80, 443]));

    let direct = resolve_with(&ports.clone().into(), Context::new(), &registry);
    let embedded = resolve_with(
        &ports.to_scalar_marker(&registry).into(),
        Context::new(),
        &registry,
    );

    assert_eq!(direct, Ok(Some(Resolved::from(vec![80, 443]))));
    assert_eq!(embedded, direct);
}

#[test]
fn concatenation_stringifies_each_part() {
    let registry = Registry::new();
    let port = Deferred::from_fn(|_| Value::from(8080));
    let host = Deferred::hinted("Host", |_| Value::from("example.org")).unwrap();

    let url = format!(
        "https://{}:{}/{}",
        host.to_scalar_marker(&registry),
        port.to_scalar_marker(&registry),
        host.to_scalar_marker(&registry)
    );

    assert_eq!(
        resolve_with(&url.into(), Context::new(), &registry),
        Ok(Some(Resolved::from("https://example.org:8080/example.org")))
    );
}

#[test]
fn undefined_members_are_pruned_in_order() {
    let registry = Registry::new();
    let missing = Deferred::from_fn(|_| Value::Undefined);

    let value = Value::object([
        (
            "first",
            Value::from(vec![
                Value::from("a"),
                Value::from(missing.clone()),
                Value::from("b"),
                Value::Undefined,
                Value::from("c"),
            ]),
        ),
        ("second", Value::from(missing)),
        ("third", Value::from(3)),
    ]);

    assert_eq!(
        resolve_with(&value, Context::new(), &registry),
        Ok(Some(Resolved::object([
            ("first", Resolved::from(vec!["a", "b", "c"])),
            ("third", Resolved::from(3)),
        ])))
    );
}

#[test]
fn list_marker_alone_resolves_to_the_value() {
    let registry = Registry::new();
    let zones = Deferred::from_fn(|_| Value::from(vec!["eu-west-1a", "eu-west-1b"]));

    assert_eq!(
        resolve_with(
            &zones.to_list_marker(&registry).unwrap().into(),
            Context::new(),
            &registry
        ),
        Ok(Some(Resolved::from(vec!["eu-west-1a", "eu-west-1b"])))
    );
}

#[test]
fn list_marker_does_not_take_text() {
    let registry = Registry::new();
    let zones = Deferred::from_fn(|_| Value::from(vec!["eu-west-1a"]));
    let marker = zones.to_list_marker(&registry).unwrap().remove(0);

    let with_text = Value::from(vec![format!("zone-{marker}")]);
    assert_eq!(
        resolve_with(&with_text, Context::new(), &registry),
        Err(ErrorKind::InvalidListConcatenation {
            text: format!("zone-{marker}")
        }
        .at("/"))
    );

    let with_elements = Value::from(vec![marker.clone(), "extra".to_string()]);
    assert!(matches!(
        resolve_with(&with_elements, Context::new(), &registry),
        Err(ResolveError {
            kind: ErrorKind::InvalidListConcatenation { .. },
            ..
        })
    ));

    let doubled = Value::from(vec![format!("{marker}{marker}")]);
    assert!(matches!(
        resolve_with(&doubled, Context::new(), &registry),
        Err(ResolveError {
            kind: ErrorKind::CannotConcatenateListToken { .. },
            ..
        })
    ));
}

#[test]
fn depth_limit() {
    assert_eq!(
        resolve_default(&nested_arrays(MAX_DEPTH)),
        Ok(Some(
            (0..MAX_DEPTH).fold(Resolved::from(1), |inner, _| Resolved::Array(vec![inner]))
        ))
    );

    let err = resolve_default(&nested_arrays(MAX_DEPTH + 1)).expect_err("too deep");
    assert_eq!(err.kind, ErrorKind::StructureTooDeep);
    assert_eq!(err.path, format!("/{}", vec!["0"; MAX_DEPTH + 1].join("/")));
}

#[test]
fn self_reference_is_too_deep() {
    let slot: Arc<OnceLock<Deferred>> = Arc::new(OnceLock::new());
    let inner = Arc::clone(&slot);
    let cyclic = Deferred::from_fn(move |_| {
        Value::object([("self", Value::from(inner.get().cloned()))])
    });
    slot.set(cyclic.clone()).unwrap();

    let err = resolve_default(&cyclic.into()).expect_err("cycle");
    assert_eq!(err.kind, ErrorKind::StructureTooDeep);
}

#[test]
fn constructs_are_rejected() {
    let value = Value::object([(
        "Resources",
        Value::object([("MyVpc", Value::Construct(Arc::new(StackNode)))]),
    )]);

    assert_eq!(
        resolve_default(&value),
        Err(ErrorKind::CyclicStructure {
            node: "GoedeMorgen/MyVpc".to_string()
        }
        .at("/Resources/MyVpc"))
    );
}

#[test]
fn markers_from_another_registry_are_unknown() {
    let one = Registry::new();
    let two = Registry::new();
    let marker = vpc_id().to_scalar_marker(&one);

    assert_eq!(
        resolve_with(&marker.into(), Context::new(), &two),
        Err(ErrorKind::UnrecognizedTokenKey {
            key: "VpcId.0".to_string()
        }
        .at("/"))
    );
}

#[test]
fn generic_serialization_is_refused() {
    let value = Value::object([("id", Value::from(vpc_id()))]);

    let err = serde_json::to_string(&value).expect_err("deferred values cannot be serialized");
    assert!(err.to_string().contains("Resolve it first"));

    let resolved = resolve_default(&value).unwrap();
    assert_eq!(
        serde_json::to_string(&resolved).unwrap(),
        r#"{"id":"vpc-123"}"#
    );
}

#[test]
fn concurrent_registration_yields_unique_keys() {
    let registry = Registry::new();
    let shared = Deferred::from_fn(|_| Value::Null);

    let markers: Vec<String> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let shared = shared.clone();
                let registry = &registry;
                scope.spawn(move || {
                    let own = Deferred::from_fn(|_| Value::Null).to_scalar_marker(registry);
                    (own, shared.to_scalar_marker(registry))
                })
            })
            .collect();

        handles
            .into_iter()
            .flat_map(|handle| {
                let (own, shared) = handle.join().unwrap();
                [own, shared]
            })
            .collect()
    });

    let mut distinct = markers.clone();
    distinct.sort();
    distinct.dedup();

    // 8 own markers plus the single shared one
    assert_eq!(distinct.len(), 9);
    assert_eq!(registry.len(), 9);
}
