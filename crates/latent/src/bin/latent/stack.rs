//! sample container service stack
//!
//! A small document with all the usual suspects: references to other resources, attributes, pseudo parameters,
//! strings built from them and a list valued attribute. Whatever the context provides is filled in, everything
//! else is left to the deployment engine as an intrinsic function.
use indexmap::IndexMap;
use latent::context::Context;
use latent::deferred::{Deferred, Joiner, Producer};
use latent::registry::Registry;
use latent::value::{Resolved, Value};

const FN_JOIN: &str = "Fn::Join";

/// Concatenates text, or builds a `Fn::Join` when some part is only known at deploy time
#[derive(Debug, Clone, Copy)]
pub struct IntrinsicJoiner;

impl Joiner for IntrinsicJoiner {
    fn join(&self, parts: Vec<Resolved>) -> Value {
        let mut items: Vec<Resolved> = vec![];
        for part in parts {
            match split_join(part) {
                Ok(nested) => nested.into_iter().for_each(|item| push_merged(&mut items, item)),
                Err(part) => push_merged(&mut items, part),
            }
        }

        if items.len() > 1 {
            return Value::object([(
                FN_JOIN,
                Value::from(vec![Resolved::from(""), Resolved::Array(items)]),
            )]);
        }

        // a single part does not need joining
        items.pop().map(Value::from).unwrap_or_else(|| Value::from(""))
    }
}

/// The items of an empty-delimiter `Fn::Join`, or the part itself
fn split_join(part: Resolved) -> Result<Vec<Resolved>, Resolved> {
    let mut object = match part {
        Resolved::Object(object) => object,
        other => return Err(other),
    };

    let is_join = object.len() == 1
        && matches!(
            object.get(FN_JOIN),
            Some(Resolved::Array(args)) if args.len() == 2 && args[0] == Resolved::from("")
        );
    if !is_join {
        return Err(Resolved::Object(object));
    }

    match object.swap_remove(FN_JOIN) {
        Some(Resolved::Array(mut args)) => match args.pop() {
            Some(Resolved::Array(items)) => Ok(items),
            other => Err(Resolved::object([(
                FN_JOIN,
                Resolved::Array(args.into_iter().chain(other).collect()),
            )])),
        },
        _ => Err(Resolved::Object(object)),
    }
}

fn push_merged(items: &mut Vec<Resolved>, item: Resolved) {
    if let (Some(Resolved::String(last)), Resolved::String(text)) = (items.last_mut(), &item) {
        last.push_str(text);
        return;
    }

    items.push(item);
}

fn intrinsic(
    hint: &str,
    context_key: &'static str,
    fallback: Resolved,
) -> anyhow::Result<Deferred> {
    let producer = Producer::from_fn(move |context: &Context| match context.get(context_key) {
        Some(value) => value.clone().into(),
        None => fallback.clone().into(),
    });

    Ok(Deferred::builder(producer)
        .hint(hint)?
        .joiner(IntrinsicJoiner)
        .build())
}

/// `{ "Ref": logical_id }` unless the context knows the value
fn reference(logical_id: &str, context_key: &'static str) -> anyhow::Result<Deferred> {
    intrinsic(logical_id, context_key, Resolved::object([("Ref", logical_id)]))
}

/// `{ "Fn::GetAtt": [logical_id, attribute] }` unless the context knows the value
fn attribute(
    logical_id: &str,
    attribute: &str,
    context_key: &'static str,
) -> anyhow::Result<Deferred> {
    intrinsic(
        &format!("{logical_id}.{attribute}"),
        context_key,
        Resolved::object([("Fn::GetAtt", vec![logical_id, attribute])]),
    )
}

/// Comma separated context value as list, `Fn::GetAZs` otherwise
fn availability_zones() -> anyhow::Result<Deferred> {
    let producer = Producer::from_fn(|context: &Context| match context.get_str("azs") {
        Some(zones) => Value::from(zones.split(',').map(str::trim).collect::<Vec<_>>()),
        None => Value::object([("Fn::GetAZs", Value::from(""))]),
    });

    Ok(Deferred::builder(producer)
        .hint("AvailabilityZones")?
        .joiner(IntrinsicJoiner)
        .build())
}

fn resource(kind: &str, properties: Value) -> Value {
    Value::object([("Type", Value::from(kind)), ("Properties", properties)])
}

/// Build the stack document
///
/// Markers are registered with `registry`, which has to be the one used for resolving.
pub fn sample_stack(name: &str, registry: &Registry) -> anyhow::Result<Value> {
    let region = reference("AWS::Region", "region")?;
    let account = reference("AWS::AccountId", "account")?;
    let vpc = reference("MyVpc", "vpc")?;
    let cluster = reference("DemoCluster", "cluster")?;
    let task_definition = reference("MyTD", "task-definition")?;
    let service_name = attribute("Service", "Name", "service")?;
    let zones = availability_zones()?;

    let mut resources: IndexMap<String, Value> = IndexMap::new();
    resources.insert(
        "MyVpc".into(),
        resource(
            "AWS::EC2::VPC",
            Value::object([
                ("CidrBlock", Value::from("10.0.0.0/16")),
                (
                    "Tags",
                    Value::from(vec![Value::object([
                        ("Key", "Name".to_string()),
                        ("Value", format!("{name}/MyVpc")),
                    ])]),
                ),
            ]),
        ),
    );
    resources.insert(
        "PublicSubnet".into(),
        resource(
            "AWS::EC2::Subnet",
            Value::object([
                ("VpcId", Value::from(vpc.clone())),
                ("AvailabilityZones", Value::from(zones.to_list_marker(registry)?)),
            ]),
        ),
    );
    resources.insert(
        "DemoCluster".into(),
        resource(
            "AWS::ECS::Cluster",
            // no explicit name, let the engine pick one
            Value::object([("ClusterName", Value::Undefined)]),
        ),
    );
    resources.insert(
        "MyTD".into(),
        resource(
            "AWS::ECS::TaskDefinition",
            Value::object([
                ("Family", Value::from("ecs-task-definition")),
                (
                    "ContainerDefinitions",
                    Value::from(vec![Value::object([
                        ("Name", Value::from("web")),
                        ("Image", Value::from("amazon/amazon-ecs-sample")),
                        ("Cpu", Value::from(1024)),
                        ("Memory", Value::from(512)),
                        ("Essential", Value::from(true)),
                    ])]),
                ),
            ]),
        ),
    );
    resources.insert(
        "Service".into(),
        resource(
            "AWS::ECS::Service",
            Value::object([
                ("Cluster", Value::from(cluster.clone())),
                ("TaskDefinition", Value::from(task_definition)),
                ("DesiredCount", Value::from(1)),
            ]),
        ),
    );

    let service_arn = format!(
        "arn:aws:ecs:{}:{}:service/{}/{}",
        region.to_scalar_marker(registry),
        account.to_scalar_marker(registry),
        cluster.to_scalar_marker(registry),
        service_name.to_scalar_marker(registry),
    );

    Ok(Value::object([
        ("Description", Value::from(format!("{name} container service"))),
        ("Resources", Value::from(resources)),
        (
            "Outputs",
            Value::object([(
                "ServiceArn",
                Value::object([("Value", Value::from(service_arn))]),
            )]),
        ),
    ]))
}
