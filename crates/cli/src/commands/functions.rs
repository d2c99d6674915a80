use crate::OutputFormat;
use crate::util::{CliResult, colorize_dimmed, colorize_heading};
use clap::{Args, ValueEnum};
use opxpath::FunctionTable;
use opxpath::functions::FunctionNamespace;
use serde::Serialize;
use std::fmt::Write;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum NamespaceFilter {
    Core,
    Math,
    Map,
    Array,
}

impl From<NamespaceFilter> for FunctionNamespace {
    fn from(filter: NamespaceFilter) -> Self {
        match filter {
            NamespaceFilter::Core => FunctionNamespace::Core,
            NamespaceFilter::Math => FunctionNamespace::Math,
            NamespaceFilter::Map => FunctionNamespace::Map,
            NamespaceFilter::Array => FunctionNamespace::Array,
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct FunctionsArgs {
    #[arg(long = "namespace", value_enum)]
    pub namespace: Option<NamespaceFilter>,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub(crate) struct FunctionSummary {
    id: u32,
    namespace: &'static str,
    name: &'static str,
    arity: String,
}

pub fn run(args: &FunctionsArgs) -> CliResult<String> {
    let wanted = args.namespace.map(FunctionNamespace::from);
    let summaries: Vec<FunctionSummary> = FunctionTable::builtins()
        .iter()
        .zip(0u32..)
        .filter(|(spec, _)| wanted.is_none_or(|ns| spec.ns == ns))
        .map(|(spec, id)| FunctionSummary {
            id,
            namespace: spec.ns.prefix(),
            name: spec.local,
            arity: spec.arity.to_string(),
        })
        .collect();
    let output = match args.format {
        OutputFormat::Text => render_functions_text(&summaries),
        OutputFormat::Json => serde_json::to_string_pretty(&summaries)?,
    };
    Ok(output)
}

pub(crate) fn render_functions_text(functions: &[FunctionSummary]) -> String {
    let mut output = String::new();
    for f in functions {
        let name = colorize_heading(&format!("{}:{}", f.namespace, f.name));
        let arity = colorize_dimmed(&format!("arity {}", f.arity));
        let _ = writeln!(&mut output, "{:>4}  {name}  {arity}", f.id);
    }
    output.trim_end().to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::strip_ansi;
    use rstest::rstest;

    #[rstest]
    fn lists_every_builtin_without_a_filter() {
        let output = run(&FunctionsArgs { namespace: None, format: OutputFormat::Text }).expect("functions");
        assert_eq!(output.lines().count(), FunctionTable::builtin_count());
        let plain = strip_ansi(&output);
        assert!(plain.contains("fn:concat  arity 2 or more"));
    }

    #[rstest]
    #[case(NamespaceFilter::Map, "map")]
    #[case(NamespaceFilter::Array, "array")]
    fn namespace_filter(#[case] filter: NamespaceFilter, #[case] prefix: &str) {
        let output =
            run(&FunctionsArgs { namespace: Some(filter), format: OutputFormat::Json }).expect("functions");
        let json: serde_json::Value = serde_json::from_str(&output).expect("json");
        let items = json.as_array().expect("array");
        assert!(!items.is_empty());
        assert!(items.iter().all(|f| f["namespace"] == prefix));
    }

    #[rstest]
    fn ids_match_the_function_table() {
        let output = run(&FunctionsArgs { namespace: None, format: OutputFormat::Json }).expect("functions");
        let json: serde_json::Value = serde_json::from_str(&output).expect("json");
        let count = FunctionTable::new().function_id("count", None).expect("count");
        let entry = json.as_array().expect("array").iter().find(|f| f["name"] == "count").expect("listed");
        assert_eq!(entry["id"], u64::from(count.0));
    }
}
