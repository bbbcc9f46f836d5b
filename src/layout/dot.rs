//! Parser for the DOT subset emitted by the structure-graph backend.
//!
//! Supported:
//! - `strict`, `graph` and `digraph` headers with an optional name
//! - node statements, edge chains (`a -> b -> c`) and `graph`/`node`/`edge` attribute statements
//! - `key = value` graph attributes
//! - nested `subgraph` blocks, recorded as clusters with their member nodes
//! - quoted strings, HTML labels, ports (ignored) and `//`, `/* */`, `#` comments
//!
//! Unlike a lenient reader, anything outside this grammar is rejected with a position.

use std::collections::{BTreeMap, HashMap};

use petgraph::stable_graph::{NodeIndex, StableGraph};

pub type Attrs = BTreeMap<String, String>;

/// Deepest subgraph nesting accepted before the input is rejected.
pub const MAX_SUBGRAPH_DEPTH: usize = 64;

/// Error for malformed graph descriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DotParseError {
    pub message: String,
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for DotParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DOT parse error at {}:{}: {}",
            self.line, self.col, self.message
        )
    }
}

impl std::error::Error for DotParseError {}

#[derive(Debug, Clone, PartialEq)]
pub struct DotNode {
    pub id: String,
    pub attrs: Attrs,
}

impl DotNode {
    /// Display text of the node, `\N` expanded to the node id.
    pub fn label(&self) -> String {
        match self.attrs.get("label") {
            Some(label) => label.replace("\\N", &self.id),
            None => self.id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DotEdge {
    pub attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DotCluster {
    pub name: Option<String>,
    pub attrs: Attrs,
    /// Nodes mentioned inside the block, including nested blocks.
    pub members: Vec<NodeIndex>,
    pub parent: Option<usize>,
}

impl DotCluster {
    /// Only subgraphs named `cluster*` are drawn as boxes.
    pub fn is_cluster(&self) -> bool {
        self.name
            .as_deref()
            .is_some_and(|n| n.starts_with("cluster"))
    }
}

#[derive(Debug, Clone)]
pub struct DotGraph {
    pub directed: bool,
    pub strict: bool,
    pub name: Option<String>,
    pub attrs: Attrs,
    pub g: StableGraph<DotNode, DotEdge>,
    /// Subgraphs in order of appearance; a parent always precedes its children.
    pub subgraphs: Vec<DotCluster>,
}

impl DotGraph {
    pub fn node_count(&self) -> usize {
        self.g.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.g.edge_count()
    }

    pub fn node_by_id(&self, id: &str) -> Option<&DotNode> {
        self.g.node_weights().find(|n| n.id == id)
    }
}

/// Parses a DOT description.
///
/// # Errors
///
/// Returns [`DotParseError`] with the position of the first construct outside the
/// supported grammar.
pub fn parse_dot(input: &str) -> Result<DotGraph, DotParseError> {
    DotParser::new(input).parse()
}

struct Token {
    text: String,
    bare: bool,
}

impl Token {
    fn is_keyword(&self, kw: &str) -> bool {
        self.bare && self.text.eq_ignore_ascii_case(kw)
    }
}

#[derive(Clone, Default)]
struct Scope {
    node_defaults: Attrs,
    edge_defaults: Attrs,
}

struct DotParser<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    col: usize,
    directed: bool,
    depth: usize,

    g: StableGraph<DotNode, DotEdge>,
    node_map: HashMap<String, NodeIndex>,
    graph_attrs: Attrs,
    subgraphs: Vec<DotCluster>,
}

impl<'a> DotParser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            pos: 0,
            line: 1,
            col: 1,
            directed: false,
            depth: 0,
            g: StableGraph::default(),
            node_map: HashMap::new(),
            graph_attrs: Attrs::new(),
            subgraphs: Vec::new(),
        }
    }

    fn error(&self, message: impl Into<String>) -> DotParseError {
        DotParseError {
            message: message.into(),
            line: self.line,
            col: self.col,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(b)
    }

    fn skip_whitespace(&mut self) {
        while let Some(b) = self.peek() {
            match b {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    self.advance();
                }
                b'/' if self.peek_at(1) == Some(b'/') => self.skip_line(),
                b'#' => self.skip_line(),
                b'/' if self.peek_at(1) == Some(b'*') => {
                    self.advance();
                    self.advance();
                    while !self.at_end() {
                        if self.peek() == Some(b'*') && self.peek_at(1) == Some(b'/') {
                            self.advance();
                            self.advance();
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while !self.at_end() && self.peek() != Some(b'\n') {
            self.advance();
        }
    }

    fn describe_next(&self) -> String {
        match self.peek() {
            None => "end of input".to_string(),
            Some(_) => {
                let rest = String::from_utf8_lossy(&self.bytes[self.pos..]);
                let c = rest.chars().next().unwrap_or('?');
                format!("'{c}'")
            }
        }
    }

    fn expect_char(&mut self, c: u8) -> Result<(), DotParseError> {
        self.skip_whitespace();
        if self.peek() == Some(c) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{}', found {}",
                c as char,
                self.describe_next()
            )))
        }
    }

    fn consume_separator(&mut self) {
        self.skip_whitespace();
        if matches!(self.peek(), Some(b';' | b',')) {
            self.advance();
        }
    }

    fn read_token(&mut self) -> Result<Option<Token>, DotParseError> {
        self.skip_whitespace();
        match self.peek() {
            None => Ok(None),
            Some(b'"') => self.read_quoted().map(Some),
            Some(b'<') => self.read_html().map(Some),
            Some(b) if is_id_byte(b) => Ok(Some(self.read_bare())),
            Some(_) => Ok(None),
        }
    }

    fn expect_token(&mut self, what: &str) -> Result<Token, DotParseError> {
        match self.read_token()? {
            Some(t) => Ok(t),
            None => Err(self.error(format!("expected {what}, found {}", self.describe_next()))),
        }
    }

    fn read_bare(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(is_id_byte) {
            self.advance();
        }
        Token {
            text: String::from_utf8_lossy(&self.bytes[start..self.pos]).into_owned(),
            bare: true,
        }
    }

    fn read_quoted(&mut self) -> Result<Token, DotParseError> {
        let (line, col) = (self.line, self.col);
        self.advance();
        let mut buf = Vec::new();
        loop {
            match self.advance() {
                None => {
                    return Err(DotParseError {
                        message: "unterminated string".to_string(),
                        line,
                        col,
                    })
                }
                Some(b'"') => break,
                Some(b'\\') => match self.advance() {
                    Some(b'n' | b'l' | b'r') => buf.push(b'\n'),
                    Some(b'"') => buf.push(b'"'),
                    Some(b'\\') => buf.push(b'\\'),
                    // line continuation
                    Some(b'\n') => {}
                    Some(other) => {
                        buf.push(b'\\');
                        buf.push(other);
                    }
                    None => {
                        return Err(DotParseError {
                            message: "unterminated string".to_string(),
                            line,
                            col,
                        })
                    }
                },
                Some(b) => buf.push(b),
            }
        }
        let mut text = String::from_utf8_lossy(&buf).into_owned();

        // "a" + "b" concatenation
        self.skip_whitespace();
        if self.peek() == Some(b'+') {
            self.advance();
            self.skip_whitespace();
            if self.peek() != Some(b'"') {
                return Err(self.error("expected string after '+'"));
            }
            text.push_str(&self.read_quoted()?.text);
        }

        Ok(Token { text, bare: false })
    }

    fn read_html(&mut self) -> Result<Token, DotParseError> {
        let (line, col) = (self.line, self.col);
        self.advance();
        let start = self.pos;
        let mut depth = 1u32;
        loop {
            match self.advance() {
                None => {
                    return Err(DotParseError {
                        message: "unterminated HTML label".to_string(),
                        line,
                        col,
                    })
                }
                Some(b'<') => depth += 1,
                Some(b'>') => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                Some(_) => {}
            }
        }
        let raw = String::from_utf8_lossy(&self.bytes[start..self.pos - 1]);
        Ok(Token {
            text: html_to_text(&raw),
            bare: false,
        })
    }

    /// Skips `:port` and `:port:compass` suffixes of a node id.
    fn skip_port(&mut self) -> Result<(), DotParseError> {
        for _ in 0..2 {
            self.skip_whitespace();
            if self.peek() != Some(b':') {
                return Ok(());
            }
            self.advance();
            self.expect_token("port name")?;
        }
        Ok(())
    }

    /// Reads zero or more `[k=v, ...]` lists.
    fn read_attrs(&mut self) -> Result<Attrs, DotParseError> {
        let mut attrs = Attrs::new();
        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'[') {
                return Ok(attrs);
            }
            self.advance();
            loop {
                self.skip_whitespace();
                match self.peek() {
                    None => return Err(self.error("unterminated attribute list")),
                    Some(b']') => {
                        self.advance();
                        break;
                    }
                    Some(_) => {}
                }
                let key = self.expect_token("attribute name")?;
                self.expect_char(b'=')?;
                let value = self.expect_token("attribute value")?;
                attrs.insert(key.text.to_ascii_lowercase(), value.text);
                self.consume_separator();
            }
        }
    }

    fn edge_op(&self) -> Option<&'static str> {
        match (self.peek(), self.peek_at(1)) {
            (Some(b'-'), Some(b'>')) => Some("->"),
            (Some(b'-'), Some(b'-')) => Some("--"),
            _ => None,
        }
    }

    fn ensure_node(&mut self, id: &str, scope: &Scope) -> NodeIndex {
        if let Some(&idx) = self.node_map.get(id) {
            return idx;
        }
        let idx = self.g.add_node(DotNode {
            id: id.to_string(),
            attrs: scope.node_defaults.clone(),
        });
        self.node_map.insert(id.to_string(), idx);
        idx
    }

    fn parse(mut self) -> Result<DotGraph, DotParseError> {
        let mut head = self.expect_token("'graph' or 'digraph'")?;
        let strict = head.is_keyword("strict");
        if strict {
            head = self.expect_token("'graph' or 'digraph'")?;
        }
        if head.is_keyword("digraph") {
            self.directed = true;
        } else if !head.is_keyword("graph") {
            return Err(self.error(format!("expected 'graph' or 'digraph', found '{}'", head.text)));
        }

        self.skip_whitespace();
        let name = if self.peek() == Some(b'{') {
            None
        } else {
            Some(self.expect_token("graph name or '{'")?.text)
        };

        self.expect_char(b'{')?;
        let mut members = Vec::new();
        self.parse_body(&mut Scope::default(), None, &mut members)?;

        self.skip_whitespace();
        if !self.at_end() {
            return Err(self.error(format!(
                "unexpected {} after closing brace",
                self.describe_next()
            )));
        }

        Ok(DotGraph {
            directed: self.directed,
            strict,
            name,
            attrs: self.graph_attrs,
            g: self.g,
            subgraphs: self.subgraphs,
        })
    }

    /// Parses statements up to and including the closing brace.
    fn parse_body(
        &mut self,
        scope: &mut Scope,
        subgraph: Option<usize>,
        members: &mut Vec<NodeIndex>,
    ) -> Result<(), DotParseError> {
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error("unexpected end of input, expected '}'")),
                Some(b'}') => {
                    self.advance();
                    return Ok(());
                }
                Some(b'{') => {
                    self.advance();
                    self.parse_subgraph(None, scope, subgraph, members)?;
                    self.consume_separator();
                    continue;
                }
                Some(_) => {}
            }

            let Some(first) = self.read_token()? else {
                return Err(self.error(format!("unexpected {}", self.describe_next())));
            };

            if first.is_keyword("subgraph") {
                self.skip_whitespace();
                let name = if self.peek() == Some(b'{') {
                    None
                } else {
                    Some(self.expect_token("subgraph name")?.text)
                };
                self.expect_char(b'{')?;
                self.parse_subgraph(name, scope, subgraph, members)?;
                self.consume_separator();
                continue;
            }

            if first.is_keyword("graph") {
                let attrs = self.read_attrs()?;
                self.graph_scope_attrs(subgraph).extend(attrs);
                self.consume_separator();
                continue;
            }
            if first.is_keyword("node") {
                let attrs = self.read_attrs()?;
                scope.node_defaults.extend(attrs);
                self.consume_separator();
                continue;
            }
            if first.is_keyword("edge") {
                let attrs = self.read_attrs()?;
                scope.edge_defaults.extend(attrs);
                self.consume_separator();
                continue;
            }

            self.skip_port()?;
            self.skip_whitespace();

            if self.peek() == Some(b'=') {
                self.advance();
                let value = self.expect_token("attribute value")?;
                self.graph_scope_attrs(subgraph)
                    .insert(first.text.to_ascii_lowercase(), value.text);
                self.consume_separator();
                continue;
            }

            if let Some(op) = self.edge_op() {
                self.parse_edge_chain(first.text, op, scope, members)?;
            } else {
                let attrs = self.read_attrs()?;
                let idx = self.ensure_node(&first.text, scope);
                self.g[idx].attrs.extend(attrs);
                members.push(idx);
            }
            self.consume_separator();
        }
    }

    fn parse_subgraph(
        &mut self,
        name: Option<String>,
        scope: &Scope,
        parent: Option<usize>,
        members: &mut Vec<NodeIndex>,
    ) -> Result<(), DotParseError> {
        if self.depth >= MAX_SUBGRAPH_DEPTH {
            return Err(self.error(format!(
                "subgraphs nested deeper than {MAX_SUBGRAPH_DEPTH} levels"
            )));
        }
        let id = self.subgraphs.len();
        self.subgraphs.push(DotCluster {
            name,
            attrs: Attrs::new(),
            members: Vec::new(),
            parent,
        });

        let mut inner_scope = scope.clone();
        let mut inner = Vec::new();
        self.depth += 1;
        self.parse_body(&mut inner_scope, Some(id), &mut inner)?;
        self.depth -= 1;

        let mut seen = std::collections::HashSet::new();
        inner.retain(|idx| seen.insert(*idx));
        members.extend(inner.iter().copied());
        self.subgraphs[id].members = inner;
        Ok(())
    }

    fn parse_edge_chain(
        &mut self,
        first: String,
        first_op: &'static str,
        scope: &Scope,
        members: &mut Vec<NodeIndex>,
    ) -> Result<(), DotParseError> {
        let expected = if self.directed { "->" } else { "--" };
        let mut chain = vec![first];
        let mut op = Some(first_op);
        while let Some(found) = op {
            if found != expected {
                let kind = if self.directed { "digraph" } else { "graph" };
                return Err(self.error(format!("'{found}' is not allowed in a {kind}")));
            }
            self.advance();
            self.advance();
            let next = self.expect_token(&format!("node id after '{found}'"))?;
            if next.is_keyword("subgraph") || next.is_keyword("node") || next.is_keyword("edge") {
                return Err(self.error(format!(
                    "'{}' cannot be used as an edge endpoint",
                    next.text
                )));
            }
            chain.push(next.text);
            self.skip_port()?;
            self.skip_whitespace();
            op = self.edge_op();
        }

        let mut attrs = scope.edge_defaults.clone();
        attrs.extend(self.read_attrs()?);

        let indices: Vec<NodeIndex> = chain
            .iter()
            .map(|id| self.ensure_node(id, scope))
            .collect();
        for pair in indices.windows(2) {
            self.g.add_edge(
                pair[0],
                pair[1],
                DotEdge {
                    attrs: attrs.clone(),
                },
            );
        }
        members.extend(indices);
        Ok(())
    }

    fn graph_scope_attrs(&mut self, subgraph: Option<usize>) -> &mut Attrs {
        match subgraph {
            Some(id) => &mut self.subgraphs[id].attrs,
            None => &mut self.graph_attrs,
        }
    }
}

fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || b >= 0x80
}

/// Converts an HTML-like label to plain text: `<BR/>` and row ends become line breaks,
/// other tags are dropped and the basic entities are decoded.
pub fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '<' => {
                let mut tag = String::new();
                for t in chars.by_ref() {
                    if t == '>' {
                        break;
                    }
                    tag.push(t);
                }
                let name: String = tag
                    .trim_start_matches('/')
                    .chars()
                    .take_while(char::is_ascii_alphanumeric)
                    .collect::<String>()
                    .to_ascii_uppercase();
                let closing = tag.starts_with('/');
                match (name.as_str(), closing) {
                    ("BR", _) | ("TR", true) => out.push('\n'),
                    ("TD", true) => out.push(' '),
                    _ => {}
                }
            }
            '&' => {
                let mut entity = String::new();
                while let Some(&e) = chars.peek() {
                    if e == ';' || entity.len() > 6 {
                        break;
                    }
                    entity.push(e);
                    chars.next();
                }
                if chars.peek() == Some(&';') {
                    chars.next();
                    out.push_str(match entity.as_str() {
                        "lt" => "<",
                        "gt" => ">",
                        "amp" => "&",
                        "quot" => "\"",
                        "apos" | "#39" => "'",
                        "nbsp" => " ",
                        _ => "?",
                    });
                } else {
                    out.push('&');
                    out.push_str(&entity);
                }
            }
            _ => out.push(c),
        }
    }

    out.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim_matches('\n')
        .to_string()
}
