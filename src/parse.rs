//! Parser for the flow-file format: line-oriented `key=value` text,
//! grouped under the most recent header line.

use std::fs;
use std::path::Path;

use crate::catalog::{Catalog, Component, Concatenate, FileSource, Node, Pipe, Stderr};
use crate::error::{FlowError, Result};

#[derive(Default)]
struct NodeBuilder {
    command: Option<String>,
}

#[derive(Default)]
struct PipeBuilder {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Default)]
struct ConcatBuilder {
    declared_parts: Option<usize>,
    parts: Vec<Option<String>>,
}

#[derive(Default)]
struct FileBuilder {
    path: Option<String>,
}

#[derive(Default)]
struct StderrBuilder {
    from: Option<String>,
}

enum Current {
    None,
    Node(String, NodeBuilder),
    Pipe(String, PipeBuilder),
    Concat(String, ConcatBuilder),
    File(String, FileBuilder),
    Stderr(String, StderrBuilder),
}

/// Reads and parses the flow file at `path`, returning a fully-populated
/// and validated `Catalog`.
pub fn parse_flow_file(path: &Path) -> Result<Catalog> {
    let text = fs::read_to_string(path)?;
    let catalog = parse_flow_text(&text)?;
    validate(&catalog)?;
    Ok(catalog)
}

fn parse_flow_text(text: &str) -> Result<Catalog> {
    let mut catalog = Catalog::new();
    let mut current = Current::None;

    for raw_line in text.lines() {
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }

        if let Some(name) = line.strip_prefix("node=") {
            flush(&mut catalog, std::mem::replace(&mut current, Current::None))?;
            current = Current::Node(name.to_owned(), NodeBuilder::default());
            continue;
        }
        if let Some(name) = line.strip_prefix("pipe=") {
            flush(&mut catalog, std::mem::replace(&mut current, Current::None))?;
            current = Current::Pipe(name.to_owned(), PipeBuilder::default());
            continue;
        }
        if let Some(name) = line.strip_prefix("concatenate=") {
            flush(&mut catalog, std::mem::replace(&mut current, Current::None))?;
            current = Current::Concat(name.to_owned(), ConcatBuilder::default());
            continue;
        }
        if let Some(name) = line.strip_prefix("file=") {
            flush(&mut catalog, std::mem::replace(&mut current, Current::None))?;
            current = Current::File(name.to_owned(), FileBuilder::default());
            continue;
        }
        if let Some(name) = line.strip_prefix("stderr=") {
            flush(&mut catalog, std::mem::replace(&mut current, Current::None))?;
            current = Current::Stderr(name.to_owned(), StderrBuilder::default());
            continue;
        }

        if let Some(value) = line.strip_prefix("command=") {
            match &mut current {
                Current::Node(_, b) => b.command = Some(value.to_owned()),
                _ => return Err(FlowError::Parse("command= must follow node=".into())),
            }
            continue;
        }
        if let Some(value) = line.strip_prefix("from=") {
            match &mut current {
                Current::Pipe(_, b) => b.from = Some(value.to_owned()),
                Current::Stderr(_, b) => b.from = Some(value.to_owned()),
                _ => return Err(FlowError::Parse("from= without context".into())),
            }
            continue;
        }
        if let Some(value) = line.strip_prefix("to=") {
            match &mut current {
                Current::Pipe(_, b) => b.to = Some(value.to_owned()),
                _ => return Err(FlowError::Parse("to= must follow pipe=".into())),
            }
            continue;
        }
        if let Some(value) = line.strip_prefix("parts=") {
            match &mut current {
                Current::Concat(_, b) => {
                    let n: usize = value
                        .parse()
                        .map_err(|_| FlowError::Parse("parts out of range".into()))?;
                    b.parts.resize_with(n, || None);
                    b.declared_parts = Some(n);
                }
                _ => return Err(FlowError::Parse("parts= must follow concatenate=".into())),
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("part_") {
            match &mut current {
                Current::Concat(_, b) => {
                    let mut split = rest.splitn(2, '=');
                    let idx_str = split
                        .next()
                        .ok_or_else(|| FlowError::Parse("malformed part_ line".into()))?;
                    let value = split
                        .next()
                        .ok_or_else(|| FlowError::Parse("malformed part_ line".into()))?;
                    let idx: usize = idx_str
                        .parse()
                        .map_err(|_| FlowError::Parse("part index out of range".into()))?;
                    if idx >= b.parts.len() {
                        return Err(FlowError::Parse("part index out of range".into()));
                    }
                    b.parts[idx] = Some(value.to_owned());
                }
                _ => return Err(FlowError::Parse("part_* must follow concatenate=".into())),
            }
            continue;
        }
        if let Some(value) = line.strip_prefix("name=") {
            match &mut current {
                Current::File(_, b) => b.path = Some(value.to_owned()),
                _ => return Err(FlowError::Parse("name= must follow file=".into())),
            }
            continue;
        }

        return Err(FlowError::Parse(format!(
            "unrecognized line in flow: {}",
            line
        )));
    }

    flush(&mut catalog, current)?;
    Ok(catalog)
}

fn flush(catalog: &mut Catalog, current: Current) -> Result<()> {
    match current {
        Current::None => Ok(()),
        Current::Node(name, b) => {
            let command = b
                .command
                .ok_or_else(|| FlowError::Parse(format!("node '{}' missing command=", name)))?;
            catalog.declare(&name, Component::Node(Node { command }))
        }
        Current::Pipe(name, b) => {
            let from = b
                .from
                .ok_or_else(|| FlowError::Parse(format!("pipe '{}' missing from=/to=", name)))?;
            let to = b
                .to
                .ok_or_else(|| FlowError::Parse(format!("pipe '{}' missing from=/to=", name)))?;
            catalog.declare(&name, Component::Pipe(Pipe { from, to }))
        }
        Current::Concat(name, b) => {
            let declared = b.declared_parts.unwrap_or(0);
            let mut parts = Vec::with_capacity(declared);
            for (i, part) in b.parts.into_iter().enumerate() {
                parts.push(part.ok_or_else(|| {
                    FlowError::Parse(format!("concatenate '{}' missing part_{}", name, i))
                })?);
            }
            catalog.declare(&name, Component::Concatenate(Concatenate { parts }))
        }
        Current::File(name, b) => {
            let path = b
                .path
                .ok_or_else(|| FlowError::Parse(format!("file '{}' missing name=", name)))?;
            catalog.declare(&name, Component::File(FileSource { path }))
        }
        Current::Stderr(name, b) => {
            let from = b
                .from
                .ok_or_else(|| FlowError::Parse(format!("stderr '{}' missing from=", name)))?;
            catalog.declare(&name, Component::Stderr(Stderr { from }))
        }
    }
}

/// Cross-reference checks the original performs in `main()` right after
/// parsing, before any evaluation starts.
fn validate(catalog: &Catalog) -> Result<()> {
    for (name, pipe) in catalog.pipes() {
        if !catalog.contains(&pipe.from) {
            return Err(FlowError::Parse(format!(
                "pipe '{}' references unknown component '{}'",
                name, pipe.from
            )));
        }
        if !catalog.contains(&pipe.to) {
            return Err(FlowError::Parse(format!(
                "pipe '{}' references unknown component '{}'",
                name, pipe.to
            )));
        }
    }
    for (name, stderr) in catalog.stderrs() {
        if catalog.node(&stderr.from).is_none() {
            return Err(FlowError::Parse(format!(
                "stderr '{}' refers to unknown node '{}'",
                name, stderr.from
            )));
        }
    }
    for (name, concat) in catalog.concatenates() {
        for (i, part) in concat.parts.iter().enumerate() {
            if !catalog.contains(part) {
                return Err(FlowError::Parse(format!(
                    "concatenate '{}' part_{} references unknown component '{}'",
                    name, i, part
                )));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_node_with_command() {
        let cat = parse_flow_text("node=hello\ncommand=echo hi\n").unwrap();
        match cat.lookup("hello") {
            Some(Component::Node(n)) => assert_eq!(n.command, "echo hi"),
            other => panic!("unexpected: {:?}", other.is_some()),
        }
    }

    #[test]
    fn ignores_blank_and_comment_lines() {
        let cat = parse_flow_text("# comment\n\n// also comment\nnode=n\ncommand=true\n").unwrap();
        assert!(cat.contains("n"));
    }

    #[test]
    fn header_resets_context_so_stray_attribute_errors() {
        let err = parse_flow_text("node=a\ncommand=true\nfile=b\ncommand=true\n").unwrap_err();
        assert!(matches!(err, FlowError::Parse(_)));
    }

    #[test]
    fn from_is_valid_under_pipe_and_stderr() {
        let cat = parse_flow_text(
            "node=n\ncommand=true\npipe=p\nfrom=n\nto=n\nstderr=s\nfrom=n\n",
        )
        .unwrap();
        assert!(cat.contains("p"));
        assert!(cat.contains("s"));
    }

    #[test]
    fn from_outside_context_is_parse_error() {
        let err = parse_flow_text("from=x\n").unwrap_err();
        assert!(matches!(err, FlowError::Parse(_)));
    }

    #[test]
    fn concatenate_parses_indexed_parts() {
        let cat = parse_flow_text(
            "concatenate=c\nparts=2\npart_0=a\npart_1=b\n",
        )
        .unwrap();
        match cat.lookup("c") {
            Some(Component::Concatenate(c)) => assert_eq!(c.parts, vec!["a", "b"]),
            other => panic!("unexpected: {:?}", other.is_some()),
        }
    }

    #[test]
    fn unrecognized_line_is_parse_error() {
        let err = parse_flow_text("bogus=1\n").unwrap_err();
        assert!(matches!(err, FlowError::Parse(_)));
    }

    #[test]
    fn duplicate_name_across_kinds_is_rejected() {
        let err = parse_flow_text("node=x\ncommand=true\nfile=x\nname=/tmp/x\n").unwrap_err();
        assert!(matches!(err, FlowError::Parse(_)));
    }

    #[test]
    fn validate_rejects_pipe_to_unknown_component() {
        let err = parse_flow_text("node=n\ncommand=true\npipe=p\nfrom=n\nto=nope\n").unwrap_err();
        assert!(matches!(err, FlowError::Parse(_)));
    }
}
