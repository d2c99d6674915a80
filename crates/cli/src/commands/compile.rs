use crate::OutputFormat;
use crate::util::{CliResult, colorize_dimmed, colorize_heading, parse_namespace_bindings};
use clap::Args;
use opxpath::{Compilation, CompileMode, CompileOptions, CompiledTree, XPathCompiler, XPathVersion};
use serde::Serialize;
use std::fmt::Write;

#[derive(Args, Debug, Clone)]
pub struct CompileArgs {
    #[arg(value_name = "XPATH")]
    pub expression: String,
    /// Compile as an XSLT match pattern.
    #[arg(long = "pattern", conflicts_with = "deep")]
    pub pattern: bool,
    /// Also compile every deferred part.
    #[arg(long = "deep")]
    pub deep: bool,
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Additional namespace binding as PREFIX=URI.
    #[arg(long = "namespace", value_name = "PREFIX=URI")]
    pub namespaces: Vec<String>,
    #[arg(long = "max-depth")]
    pub max_depth: Option<usize>,
    /// Reject constructs that XPath 2.0 does not have.
    #[arg(long = "xpath20")]
    pub xpath20: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub(crate) struct CompilationSummary {
    source: String,
    mode: &'static str,
    slots: usize,
    objects: usize,
    outline: String,
    disassembly: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    deferred: Vec<CompilationSummary>,
}

impl CompilationSummary {
    fn from_compilation(compilation: &Compilation) -> Self {
        let mode = match compilation.mode() {
            CompileMode::Select => "select",
            CompileMode::MatchPattern => "pattern",
        };
        let op_map = compilation.op_map();
        Self {
            source: compilation.source(),
            mode,
            slots: op_map.len(),
            objects: op_map.objects_len(),
            outline: op_map.outline(),
            disassembly: compilation.disassemble().lines().map(str::to_owned).collect(),
            deferred: Vec::new(),
        }
    }

    fn from_tree(tree: &CompiledTree) -> Self {
        let mut summary = Self::from_compilation(&tree.compilation);
        summary.deferred = tree.children.iter().map(Self::from_tree).collect();
        summary
    }
}

fn compiler_for(args: &CompileArgs) -> CliResult<XPathCompiler> {
    let mut builder = CompileOptions::builder();
    for (prefix, uri) in parse_namespace_bindings(&args.namespaces)? {
        builder = builder.with_namespace(prefix, &uri);
    }
    if let Some(depth) = args.max_depth {
        builder = builder.with_max_depth(depth);
    }
    if args.xpath20 {
        builder = builder.with_version(XPathVersion::V20);
    }
    Ok(XPathCompiler::new(builder.build()))
}

pub fn run(args: &CompileArgs) -> CliResult<String> {
    let compiler = compiler_for(args)?;
    let summary = if args.deep {
        CompilationSummary::from_tree(&compiler.compile_deep(&args.expression)?)
    } else if args.pattern {
        CompilationSummary::from_compilation(&compiler.compile_pattern(&args.expression)?)
    } else {
        CompilationSummary::from_compilation(&compiler.compile(&args.expression)?)
    };

    let output = match args.format {
        OutputFormat::Text => render_compilation_text(&summary),
        OutputFormat::Json => serde_json::to_string_pretty(&summary)?,
    };
    Ok(output)
}

pub(crate) fn render_compilation_text(summary: &CompilationSummary) -> String {
    let mut output = String::new();
    render_into(&mut output, summary, "");
    output.trim_end().to_owned()
}

fn render_into(output: &mut String, summary: &CompilationSummary, label: &str) {
    let heading = if label.is_empty() { summary.source.clone() } else { format!("{label}: {}", summary.source) };
    let _ = writeln!(output, "{}", colorize_heading(&heading));
    let _ = writeln!(
        output,
        "{}",
        colorize_dimmed(&format!("{} mode, {} slots, {} objects", summary.mode, summary.slots, summary.objects))
    );
    for line in &summary.disassembly {
        let _ = writeln!(output, "{line}");
    }
    for (i, child) in summary.deferred.iter().enumerate() {
        let child_label = if label.is_empty() { format!("deferred {i}") } else { format!("{label}.{i}") };
        output.push('\n');
        render_into(output, child, &child_label);
    }
}
