use anyhow::Result;
use std::ffi::OsString;
use std::path::PathBuf;

pub const USAGE: &str = "\
usage: schemascope-viewer [--tree <path>] [--graph <path>] [options]

  --tree <path>       hierarchy tree JSON
  --graph <path>      lineage graph JSON
  --export <path>     write the projection as JSON and exit
  --query <text>      search query applied to the export
  --emit-intents      print user intents as JSON lines on stdout
  -h, --help          show this help
";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    pub tree: Option<PathBuf>,
    pub graph: Option<PathBuf>,
    pub export: Option<PathBuf>,
    pub query: Option<String>,
    pub emit_intents: bool,
    pub help: bool,
}

pub fn parse_args() -> Result<Args> {
    parse_args_from(std::env::args_os().skip(1))
}

fn parse_args_from<I>(args: I) -> Result<Args>
where
    I: IntoIterator<Item = OsString>,
{
    let mut out = Args::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        if arg == "--tree" {
            let Some(path) = args.next() else {
                anyhow::bail!("--tree expects a path");
            };
            out.tree = Some(PathBuf::from(path));
        } else if arg == "--graph" {
            let Some(path) = args.next() else {
                anyhow::bail!("--graph expects a path");
            };
            out.graph = Some(PathBuf::from(path));
        } else if arg == "--export" {
            let Some(path) = args.next() else {
                anyhow::bail!("--export expects a path");
            };
            out.export = Some(PathBuf::from(path));
        } else if arg == "--query" {
            let Some(value) = args.next() else {
                anyhow::bail!("--query expects a search text");
            };
            out.query = Some(value.to_string_lossy().into_owned());
        } else if arg == "--emit-intents" {
            out.emit_intents = true;
        } else if arg == "--help" || arg == "-h" {
            out.help = true;
        } else {
            anyhow::bail!("unknown argument: {:?}", arg);
        }
    }

    if out.query.is_some() && out.export.is_none() {
        anyhow::bail!("--query only applies together with --export");
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn os(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[test]
    fn parses_inputs_and_export() {
        let args = parse_args_from(os(&[
            "--tree",
            "tree.json",
            "--graph",
            "graph.json",
            "--export",
            "out.json",
            "--query",
            "email",
        ]))
        .expect("args parsed");
        assert_eq!(args.tree, Some(PathBuf::from("tree.json")));
        assert_eq!(args.graph, Some(PathBuf::from("graph.json")));
        assert_eq!(args.export, Some(PathBuf::from("out.json")));
        assert_eq!(args.query.as_deref(), Some("email"));
        assert!(!args.emit_intents);
    }

    #[test]
    fn rejects_missing_values_and_unknown_flags() {
        assert!(parse_args_from(os(&["--graph"])).is_err());
        assert!(parse_args_from(os(&["--verbose"])).is_err());
    }

    #[test]
    fn query_requires_export() {
        assert!(parse_args_from(os(&["--query", "x"])).is_err());
    }

    #[test]
    fn flags_without_values() {
        let args = parse_args_from(os(&["--emit-intents", "-h"])).expect("args parsed");
        assert!(args.emit_intents);
        assert!(args.help);
    }
}
