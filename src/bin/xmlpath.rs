//! Command-line front end: evaluate XPath expressions against an XML file.
//!
//! ```text
//! xmlpath cpacs.xml '//c:wing' --ns c=http://www.dlr.de/cpacs --output paths
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use xmlpath::{Result, XmlDocument};

/// Evaluate namespace-aware XPath expressions against an XML file.
#[derive(Parser, Debug)]
#[command(name = "xmlpath", version, about, long_about = None)]
struct Cli {
    /// XML file to load.
    file: PathBuf,

    /// Expressions to evaluate, in order.
    #[arg(required = true)]
    expressions: Vec<String>,

    /// Bind a prefix for use in expressions (`prefix=uri`). Repeatable.
    #[arg(long = "ns", value_name = "PREFIX=URI", value_parser = parse_binding)]
    namespaces: Vec<(String, String)>,

    /// Also register every prefixed declaration found in the document.
    #[arg(long)]
    document_namespaces: bool,

    /// What to print for each expression.
    #[arg(long, value_enum, default_value_t = Output::Text)]
    output: Output,

    /// Log at debug level unless `RUST_LOG` says otherwise.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Output {
    /// Number of selected nodes.
    Count,
    /// Qualified name of each selected node.
    Names,
    /// Absolute path of each selected node.
    Paths,
    /// String value of each selected node, or the scalar result.
    Text,
}

fn parse_binding(arg: &str) -> std::result::Result<(String, String), String> {
    match arg.split_once('=') {
        Some((prefix, uri)) if !prefix.is_empty() && !uri.is_empty() => {
            Ok((prefix.to_string(), uri.to_string()))
        }
        _ => Err(format!("expected PREFIX=URI, got '{arg}'")),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {e}", cli.file.display());
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run(cli: &Cli) -> Result<()> {
    let mut doc = XmlDocument::open(&cli.file)?;
    if cli.document_namespaces {
        doc.register_namespaces_from_document();
    }
    // Explicit bindings win over the document's.
    for (prefix, uri) in &cli.namespaces {
        doc.register_namespace(uri, prefix)?;
    }

    for expression in &cli.expressions {
        for line in evaluate(&doc, expression, cli.output)? {
            println!("{line}");
        }
    }
    Ok(())
}

fn evaluate(doc: &XmlDocument, expression: &str, output: Output) -> Result<Vec<String>> {
    if output == Output::Count {
        return Ok(vec![doc.count_matches(expression)?.to_string()]);
    }

    let value = doc.evaluate(expression)?;
    let Some(nodes) = value.as_node_set() else {
        // Scalars print as themselves whatever the output mode.
        return Ok(vec![value.to_string()]);
    };
    (1..=nodes.len())
        .map(|index| match output {
            Output::Names => doc.match_name(expression, index),
            Output::Paths => doc.match_path(expression, index),
            Output::Text | Output::Count => doc.match_text(expression, index),
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binding() {
        assert_eq!(
            parse_binding("c=http://www.dlr.de/cpacs"),
            Ok(("c".to_string(), "http://www.dlr.de/cpacs".to_string()))
        );
        assert!(parse_binding("c").is_err());
        assert!(parse_binding("=urn:x").is_err());
        assert!(parse_binding("c=").is_err());
    }

    #[test]
    fn test_cli_parses_repeated_namespaces() {
        let cli = Cli::try_parse_from([
            "xmlpath", "f.xml", "//a:x", "//b:y", "--ns", "a=urn:a", "--ns", "b=urn:b",
            "--output", "paths",
        ])
        .unwrap();
        assert_eq!(cli.expressions, ["//a:x", "//b:y"]);
        assert_eq!(cli.namespaces.len(), 2);
        assert_eq!(cli.output, Output::Paths);
        assert!(!cli.document_namespaces);
    }

    #[test]
    fn test_evaluate_output_modes() {
        let mut doc =
            XmlDocument::parse_str(r#"<r xmlns:a="urn:a"><a:x>1</a:x><a:x>2</a:x></r>"#).unwrap();
        doc.register_namespace("urn:a", "n").unwrap();
        assert_eq!(evaluate(&doc, "//n:x", Output::Count).unwrap(), ["2"]);
        assert_eq!(evaluate(&doc, "//n:x", Output::Names).unwrap(), ["a:x", "a:x"]);
        assert_eq!(
            evaluate(&doc, "//n:x", Output::Paths).unwrap(),
            ["/r/a:x[1]", "/r/a:x[2]"]
        );
        assert_eq!(evaluate(&doc, "//n:x", Output::Text).unwrap(), ["1", "2"]);
        assert_eq!(evaluate(&doc, "sum(//n:x)", Output::Text).unwrap(), ["3"]);
    }
}
