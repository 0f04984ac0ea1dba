//! Snapshot tests
//!
//! Renders small documents with deferred values in them and compares the resolved output.

use latent::context::Context;
use latent::deferred::Deferred;
use latent::registry::Registry;
use latent::resolve::{resolve, ResolveOptions};
use latent::value::{Resolved, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("LATENT_LOG"))
        .with_writer(std::io::stderr)
        .try_init();
}

fn render(value: &Value, context: Context, registry: &Registry) -> Resolved {
    resolve(
        value,
        &ResolveOptions {
            context,
            registry: Some(registry),
            ..Default::default()
        },
    )
    .expect("valid document")
    .expect("document is not undefined")
}

#[test]
fn container_definition() {
    init_tracing();

    let registry = Registry::new();
    let family = Deferred::hinted("Family", |context| {
        context.get_str("family").map(Value::from).into()
    })
    .unwrap();
    let memory = Deferred::from_fn(|context| match context.get("memory") {
        Some(memory) => memory.clone().into(),
        None => Value::from(512),
    });
    let log_group = Deferred::hinted("LogGroup", |_| Value::Undefined).unwrap();

    let document = Value::object([
        ("Family", Value::from(family.clone())),
        (
            "Container",
            Value::object([
                ("Name", Value::from("web")),
                ("Image", Value::from("amazon/amazon-ecs-sample")),
                ("Cpu", Value::from(1024)),
                ("Memory", Value::from(memory)),
                ("Essential", Value::from(true)),
                ("LogGroup", Value::from(log_group)),
                (
                    "Hostname",
                    Value::from(format!("{}-web", family.to_scalar_marker(&registry))),
                ),
            ]),
        ),
    ]);

    let context: Context = [("family", "demo")].into_iter().collect();
    let rendered = render(&document, context, &registry);

    insta::assert_yaml_snapshot!(rendered, @r###"
    Family: demo
    Container:
      Name: web
      Image: amazon/amazon-ecs-sample
      Cpu: 1024
      Memory: 512
      Essential: true
      Hostname: demo-web
    "###);
}

#[test]
fn unknown_context_drops_optional_values() {
    init_tracing();

    let registry = Registry::new();
    let description = Deferred::from_fn(|context| {
        context.get_str("description").map(Value::from).into()
    });

    let document = Value::object([
        ("Type", Value::from("Cluster")),
        ("Description", Value::from(description)),
        ("Tags", Value::object([("Owner", Value::Undefined)])),
    ]);

    let rendered = render(&document, Context::new(), &registry);

    insta::assert_yaml_snapshot!(rendered, @r###"
    Type: Cluster
    Tags: {}
    "###);
}
