//! In-memory registry of named flow components.
//!
//! Mirrors the five separate lookup tables of the original C
//! implementation (`find_node`/`find_pipe`/`find_concat`/`find_filecomp`/
//! `find_stderrcomp`) as five `HashMap`s, checked at lookup time in the
//! documented precedence order Node > Pipe > Concatenate > Stderr > File,
//! rather than collapsing everything into one map. `declare` enforces
//! name-uniqueness across all five tables at parse time, which is the
//! resolution `SPEC_FULL.md` §9 gives for the source's "duplicate names
//! across kinds" oversight; the precedence order remains in place as the
//! documented tie-breaker and is only observable through the test-only
//! `insert_unchecked` escape hatch below.

use std::collections::HashMap;

use crate::error::{FlowError, Result};

#[derive(Debug, Clone)]
pub struct Node {
    pub command: String,
}

#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: String,
}

#[derive(Debug, Clone)]
pub struct Pipe {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone)]
pub struct Concatenate {
    pub parts: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Stderr {
    pub from: String,
}

/// A single declared component, tagged by kind.
#[derive(Debug, Clone)]
pub enum Component {
    Node(Node),
    Pipe(Pipe),
    Concatenate(Concatenate),
    Stderr(Stderr),
    File(FileSource),
}

impl Component {
    fn kind_name(&self) -> &'static str {
        match self {
            Component::Node(_) => "node",
            Component::Pipe(_) => "pipe",
            Component::Concatenate(_) => "concatenate",
            Component::Stderr(_) => "stderr",
            Component::File(_) => "file",
        }
    }
}

/// All components declared by a flow file, keyed by name within their
/// kind.
#[derive(Debug, Default)]
pub struct Catalog {
    nodes: HashMap<String, Node>,
    pipes: HashMap<String, Pipe>,
    concatenates: HashMap<String, Concatenate>,
    stderrs: HashMap<String, Stderr>,
    files: HashMap<String, FileSource>,
}

impl Catalog {
    pub fn new() -> Catalog {
        Catalog::default()
    }

    fn any_kind_has(&self, name: &str) -> Option<&'static str> {
        if self.nodes.contains_key(name) {
            Some("node")
        } else if self.pipes.contains_key(name) {
            Some("pipe")
        } else if self.concatenates.contains_key(name) {
            Some("concatenate")
        } else if self.stderrs.contains_key(name) {
            Some("stderr")
        } else if self.files.contains_key(name) {
            Some("file")
        } else {
            None
        }
    }

    /// Declares `name` as `component`. Fails with `FlowError::Parse` if
    /// `name` is already declared under any kind, including its own.
    pub fn declare(&mut self, name: &str, component: Component) -> Result<()> {
        if let Some(existing_kind) = self.any_kind_has(name) {
            return Err(FlowError::Parse(format!(
                "duplicate component name '{}' (already declared as {})",
                name, existing_kind
            )));
        }
        match component {
            Component::Node(n) => {
                self.nodes.insert(name.to_owned(), n);
            }
            Component::Pipe(p) => {
                self.pipes.insert(name.to_owned(), p);
            }
            Component::Concatenate(c) => {
                self.concatenates.insert(name.to_owned(), c);
            }
            Component::Stderr(s) => {
                self.stderrs.insert(name.to_owned(), s);
            }
            Component::File(f) => {
                self.files.insert(name.to_owned(), f);
            }
        }
        Ok(())
    }

    /// Looks up `name`, checking each kind in precedence order: Node,
    /// Pipe, Concatenate, Stderr, then File.
    pub fn lookup(&self, name: &str) -> Option<Component> {
        if let Some(n) = self.nodes.get(name) {
            return Some(Component::Node(n.clone()));
        }
        if let Some(p) = self.pipes.get(name) {
            return Some(Component::Pipe(p.clone()));
        }
        if let Some(c) = self.concatenates.get(name) {
            return Some(Component::Concatenate(c.clone()));
        }
        if let Some(s) = self.stderrs.get(name) {
            return Some(Component::Stderr(s.clone()));
        }
        if let Some(f) = self.files.get(name) {
            return Some(Component::File(f.clone()));
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.any_kind_has(name).is_some()
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&String, &Node)> {
        self.nodes.iter()
    }

    pub fn pipes(&self) -> impl Iterator<Item = (&String, &Pipe)> {
        self.pipes.iter()
    }

    pub fn concatenates(&self) -> impl Iterator<Item = (&String, &Concatenate)> {
        self.concatenates.iter()
    }

    pub fn stderrs(&self) -> impl Iterator<Item = (&String, &Stderr)> {
        self.stderrs.iter()
    }

    /// Test-only escape hatch that bypasses `declare`'s uniqueness check,
    /// inserting directly into the given kind's table, so the
    /// precedence-order tie-breaker can be exercised even though
    /// well-formed flow files can never produce a collision.
    #[cfg(test)]
    pub(crate) fn insert_unchecked(&mut self, name: &str, component: Component) {
        match component {
            Component::Node(n) => {
                self.nodes.insert(name.to_owned(), n);
            }
            Component::Pipe(p) => {
                self.pipes.insert(name.to_owned(), p);
            }
            Component::Concatenate(c) => {
                self.concatenates.insert(name.to_owned(), c);
            }
            Component::Stderr(s) => {
                self.stderrs.insert(name.to_owned(), s);
            }
            Component::File(f) => {
                self.files.insert(name.to_owned(), f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_rejects_duplicate_name_across_kinds() {
        let mut cat = Catalog::new();
        cat.declare(
            "x",
            Component::Node(Node {
                command: "true".into(),
            }),
        )
        .unwrap();
        let err = cat
            .declare(
                "x",
                Component::File(FileSource {
                    path: "/tmp/x".into(),
                }),
            )
            .unwrap_err();
        assert!(matches!(err, FlowError::Parse(_)));
    }

    #[test]
    fn lookup_returns_declared_component() {
        let mut cat = Catalog::new();
        cat.declare(
            "greet",
            Component::Node(Node {
                command: "echo hi".into(),
            }),
        )
        .unwrap();
        assert!(matches!(cat.lookup("greet"), Some(Component::Node(_))));
        assert!(cat.lookup("missing").is_none());
    }

    #[test]
    fn lookup_precedence_prefers_node_over_file_on_collision() {
        let mut cat = Catalog::new();
        cat.insert_unchecked(
            "dup",
            Component::File(FileSource {
                path: "/tmp/dup".into(),
            }),
        );
        cat.insert_unchecked(
            "dup",
            Component::Node(Node {
                command: "true".into(),
            }),
        );
        assert!(matches!(cat.lookup("dup"), Some(Component::Node(_))));
    }

    #[test]
    fn lookup_precedence_prefers_pipe_over_concatenate_and_stderr_and_file() {
        let mut cat = Catalog::new();
        cat.insert_unchecked(
            "dup",
            Component::File(FileSource {
                path: "/tmp/dup".into(),
            }),
        );
        cat.insert_unchecked(
            "dup",
            Component::Stderr(Stderr { from: "n".into() }),
        );
        cat.insert_unchecked(
            "dup",
            Component::Concatenate(Concatenate { parts: vec![] }),
        );
        cat.insert_unchecked(
            "dup",
            Component::Pipe(Pipe {
                from: "a".into(),
                to: "b".into(),
            }),
        );
        assert!(matches!(cat.lookup("dup"), Some(Component::Pipe(_))));
    }
}
