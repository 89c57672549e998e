//! A thin CLI demonstrating both sides of the toolkit (§10.4): drive a
//! remote WSDL-described service, or serve the bundled calculator demo.

use std::collections::HashMap;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use soap_toolkit::client::{ClientOptions, DynamicClient};
use soap_toolkit::dispatcher::{CallOptions, CallOutcome, ParamValue};
use soap_toolkit::envelope::SoapVersion;
use soap_toolkit::server::{router, soap_fault, OperationSpec, ParamSpec, ServiceRegistry};
use soap_toolkit::xml::tree::Value;

#[derive(Parser)]
#[command(name = "soap-cli", about = "Dynamic SOAP client and demo service host")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Call an operation on a remote WSDL-described service.
    Call {
        wsdl_url: String,
        operation: String,
        /// Repeatable `key=value` input parameter.
        #[arg(long = "param", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Serve the bundled calculator demo service.
    Serve {
        #[arg(long, default_value = "0.0.0.0:8080")]
        bind: String,
        #[arg(long, default_value = "/calculator")]
        path: String,
    },
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected `key=value`, got `{raw}`"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Call {
            wsdl_url,
            operation,
            params,
            timeout_ms,
        } => run_call(&wsdl_url, &operation, params, timeout_ms),
        Command::Serve { bind, path } => run_serve(&bind, &path),
    }
}

fn run_call(wsdl_url: &str, operation: &str, params: Vec<(String, String)>, timeout_ms: Option<u64>) {
    let client = match DynamicClient::new(wsdl_url, ClientOptions::default()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("failed to load WSDL: {e}");
            std::process::exit(1);
        }
    };

    let mut tree = ParamValue::tree();
    for (key, value) in params {
        tree = tree.with(&key, ParamValue::text(value));
    }

    let opts = CallOptions {
        timeout_ms,
        ..Default::default()
    };

    match client.call(operation, &tree, &opts) {
        Ok(result) => println!("{result}"),
        Err(CallOutcome::Fault(fault)) => {
            eprintln!("remote fault [{}]: {}", fault.code, fault.string);
            std::process::exit(1);
        }
        Err(CallOutcome::Error(err)) => {
            eprintln!("call failed: {err}");
            std::process::exit(1);
        }
    }
}

fn run_serve(bind: &str, path: &str) {
    let registry = Arc::new(calculator_demo_registry());
    let base_url = format!("http://{bind}{path}");
    let app = router(registry, path, base_url);

    let runtime = tokio::runtime::Runtime::new().expect("failed to start async runtime");
    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(bind)
            .await
            .unwrap_or_else(|e| panic!("failed to bind {bind}: {e}"));
        tracing::info!(%bind, %path, "serving calculator demo");
        axum::serve(listener, app)
            .await
            .expect("server exited unexpectedly");
    });
}

fn calculator_demo_registry() -> ServiceRegistry {
    let add = OperationSpec::new(
        "Add",
        Arc::new(|params: HashMap<String, Value>| {
            let a = decimal_param(&params, "a")?;
            let b = decimal_param(&params, "b")?;
            let mut out = HashMap::new();
            out.insert("result".to_string(), Value::text((a + b).to_string()));
            Ok(out)
        }),
    )
    .description("Adds two decimals")
    .input(ParamSpec::new("a", "xsd:decimal", true))
    .input(ParamSpec::new("b", "xsd:decimal", true))
    .output(ParamSpec::new("result", "xsd:decimal", true))
    .soap_action("urn:soap-toolkit:calculator#Add");

    let divide = OperationSpec::new(
        "Divide",
        Arc::new(|params: HashMap<String, Value>| {
            let a = decimal_param(&params, "a")?;
            let b = decimal_param(&params, "b")?;
            if b == 0.0 {
                return Err(soap_fault("Client", "Division by zero"));
            }
            let mut out = HashMap::new();
            out.insert("result".to_string(), Value::text((a / b).to_string()));
            Ok(out)
        }),
    )
    .description("Divides two decimals")
    .input(ParamSpec::new("a", "xsd:decimal", true))
    .input(ParamSpec::new("b", "xsd:decimal", true))
    .output(ParamSpec::new("result", "xsd:decimal", true))
    .soap_action("urn:soap-toolkit:calculator#Divide");

    ServiceRegistry::new(
        "CalculatorService",
        "urn:soap-toolkit:calculator",
        SoapVersion::V1_1,
    )
    .register(add)
    .register(divide)
}

fn decimal_param(params: &HashMap<String, Value>, name: &str) -> Result<f64, soap_toolkit::fault::Fault> {
    params
        .get(name)
        .and_then(|v| v.as_text())
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| soap_fault("Client", format!("missing or invalid parameter `{name}`")))
}
