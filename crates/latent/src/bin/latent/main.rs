mod cli;
mod stack;

use anyhow::Context as _;
use latent::context::Context;
use latent::registry::Registry;
use latent::resolve::{resolve, ResolveOptions};
use latent::value::{Resolved, Value};

const STACK_NAME: &str = "GoedeMorgen";

fn main() {
    use clap::Parser;
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_env("LATENT_LOG"))
        .with_writer(std::io::stderr)
        .init();

    for new_path in cli.directory.iter() {
        match new_path.canonicalize() {
            Err(e) => {
                eprintln!(
                    "Failed to resolve path for -C/--directory {}\n{}",
                    new_path.display(),
                    e
                );
                std::process::exit(1);
            }
            Ok(cwd) => {
                if let Err(err) = std::env::set_current_dir(&cwd) {
                    eprintln!("Failed to set work directory to {}\n{}", cwd.display(), err,);
                    std::process::exit(1);
                }

                tracing::info!(directory=%cwd.display(), "Changed working directory");
            }
        }
    }

    let command_result = match cli.command {
        cli::Command::Render(render_cli) => render(render_cli),
        cli::Command::Dev(dev_cli) => dev(dev_cli),
    };

    if let Err(e) = command_result {
        for error in e.chain() {
            eprintln!("{error}")
        }
        std::process::exit(1);
    }
}

pub fn render(cli: cli::RenderCommand) -> anyhow::Result<()> {
    let context = load_context(&cli.context)?;
    let registry = Registry::new();
    let stack = stack::sample_stack(STACK_NAME, &registry)?;

    let value = resolve_stack(&stack, context, &registry)?;

    output(&cli.output, &value)?;
    Ok(())
}

fn resolve_stack(stack: &Value, context: Context, registry: &Registry) -> anyhow::Result<Resolved> {
    let options = ResolveOptions {
        context,
        prefix: vec![],
        registry: Some(registry),
    };

    let Some(value) = resolve(stack, &options)? else {
        anyhow::bail!("Stack {STACK_NAME} resolved to nothing");
    };

    Ok(value)
}

fn load_context(args: &cli::ContextArgs) -> anyhow::Result<Context> {
    let mut context = Context::new();

    for file_path in &args.files {
        let file_path = file_path.canonicalize()?;
        tracing::info!(path=%file_path.display(), "loading context file");

        // yaml is a superset of json, one parser covers both
        let contents = std::fs::read_to_string(&file_path)?;
        let values: serde_json::Map<String, serde_json::Value> = serde_yaml::from_str(&contents)
            .with_context(|| format!("Unable to parse {}", file_path.display()))?;

        for (key, value) in values {
            context.insert(key, Resolved::from(value));
        }
    }

    for (key, value) in &args.values {
        context.insert(key.clone(), value.as_str());
    }

    tracing::debug!(values = context.len(), "context loaded");
    Ok(context)
}

fn output(output: &cli::OutputArgs, value: &Resolved) -> anyhow::Result<()> {
    match output.format {
        cli::OutputFormat::Yaml => serde_yaml::to_writer(std::io::stdout(), value)?,
        cli::OutputFormat::Json => serde_json::to_writer_pretty(std::io::stdout(), value)?,
    };

    Ok(())
}

/// (latent-)developer utilities
///
/// A quick way to expose internal structures for debugging purposes
pub fn dev(cli: cli::DevCommand) -> anyhow::Result<()> {
    let context = load_context(&cli.context)?;
    let registry = Registry::new();
    let stack = stack::sample_stack(STACK_NAME, &registry)?;

    match cli.command {
        cli::DevSubCommand::Registry => {
            resolve_stack(&stack, context, &registry)?;
            for key in registry.keys() {
                println!("{key}");
            }
        }
        cli::DevSubCommand::Stack => println!("{stack:#?}"),
    }

    Ok(())
}
