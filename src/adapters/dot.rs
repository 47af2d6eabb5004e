//! Minimal Graphviz DOT subset: `LabeledGraph` round-tripping, and a
//! nested-subgraph DOT dialect for `Rsm` (one subgraph per box, named by
//! its nonterminal; node attributes `is_start`/`is_final`; edge attribute
//! `label`, capitalized for nonterminal/variable edges).
//!
//! This is a hand-rolled reader, not a pest grammar: DOT's brace nesting
//! and attribute-list syntax is irregular enough that manual brace-matching
//! reads more directly than a PEG grammar would, and nothing else in this
//! adapter set needs a shared parsing toolkit with it.

use crate::automaton::{Label, Nfa, Rsm};
use crate::error::{EngineError, EngineResult};
use crate::graph::LabeledGraph;
use crate::value::VertexId;
use std::collections::HashMap;

fn find_matching_brace(s: &str, open_pos: usize) -> EngineResult<usize> {
    let bytes = s.as_bytes();
    let mut depth = 0i32;
    for (i, &b) in bytes.iter().enumerate().skip(open_pos) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => {}
        }
    }
    Err(EngineError::ParseError("unbalanced braces in DOT source".to_string()))
}

/// Split a `{ ... }` body into top-level `;`-terminated statements, not
/// splitting on `;` that occurs inside a nested `{ }` or a quoted string.
fn split_statements(body: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut depth = 0i32;
    let mut in_quotes = false;
    let mut cur = String::new();
    for c in body.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                cur.push(c);
            }
            '{' if !in_quotes => {
                depth += 1;
                cur.push(c);
            }
            '}' if !in_quotes => {
                depth -= 1;
                cur.push(c);
            }
            ';' if !in_quotes && depth == 0 => {
                let trimmed = cur.trim().to_string();
                if !trimmed.is_empty() {
                    out.push(trimmed);
                }
                cur.clear();
            }
            _ => cur.push(c),
        }
    }
    let trimmed = cur.trim().to_string();
    if !trimmed.is_empty() {
        out.push(trimmed);
    }
    out
}

/// Split a bracketed attribute list `[key=val, key2=val2]` into `(key,
/// value)` pairs, stripping quotes from quoted values.
fn split_attrs(attrs: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for part in attrs.split(',') {
        if let Some((k, v)) = part.split_once('=') {
            out.insert(k.trim().to_string(), extract_quoted_or_bare(v.trim()));
        }
    }
    out
}

fn extract_quoted_or_bare(s: &str) -> String {
    let trimmed = s.trim();
    if trimmed.starts_with('"') && trimmed.ends_with('"') && trimmed.len() >= 2 {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

fn parse_node_id(token: &str) -> VertexId {
    let token = extract_quoted_or_bare(token);
    match token.parse::<i64>() {
        Ok(n) => VertexId::int(n),
        Err(_) => VertexId::str(token),
    }
}

/// Find a statement's attribute bracket, if any, returning the text before
/// it and the attributes map.
fn extract_attrs(stmt: &str) -> (&str, HashMap<String, String>) {
    match stmt.find('[') {
        Some(open) => {
            let close = stmt.rfind(']').unwrap_or(stmt.len());
            (stmt[..open].trim(), split_attrs(&stmt[open + 1..close]))
        }
        None => (stmt.trim(), HashMap::new()),
    }
}

fn bool_attr(attrs: &HashMap<String, String>, key: &str, default: bool) -> bool {
    attrs.get(key).map_or(default, |v| v.eq_ignore_ascii_case("true"))
}

fn ensure_node(g: &mut LabeledGraph, id: VertexId) {
    g.add_vertex(id);
}

/// Read a plain DOT graph: `digraph name { a -> b [label="x"]; ... }`. Edge
/// statements carry a `label`; bare node statements register isolated
/// vertices.
pub fn read_graph_dot(source: &str) -> EngineResult<LabeledGraph> {
    let open = source.find('{').ok_or_else(|| EngineError::ParseError("DOT source has no graph body".to_string()))?;
    let close = find_matching_brace(source, open)?;
    let body = &source[open + 1..close];

    let mut g = LabeledGraph::new();
    for stmt in split_statements(body) {
        let (head, attrs) = extract_attrs(&stmt);
        if let Some((lhs, rhs)) = head.split_once("->") {
            let from = parse_node_id(lhs.trim());
            let to = parse_node_id(rhs.trim());
            let label = attrs.get("label").cloned().unwrap_or_default();
            g.add_edge(from, label, to);
        } else if !head.is_empty() {
            ensure_node(&mut g, parse_node_id(head));
        }
    }
    Ok(g)
}

fn dot_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\\\""))
}

/// Write a plain DOT graph in the dialect [`read_graph_dot`] accepts.
#[must_use]
pub fn write_graph_dot(graph: &LabeledGraph, name: &str) -> String {
    let mut out = format!("digraph {name} {{\n");
    for v in graph.vertices() {
        out.push_str(&format!("  {};\n", dot_quote(&v.to_string())));
    }
    for e in graph.edges() {
        out.push_str(&format!(
            "  {} -> {} [label={}];\n",
            dot_quote(&e.source.to_string()),
            dot_quote(&e.target.to_string()),
            dot_quote(&e.label)
        ));
    }
    out.push_str("}\n");
    out
}

fn is_nonterminal_label(label: &str) -> bool {
    label.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}

/// Parse a single box's body (already stripped of its `subgraph NAME { ...
/// }` wrapper) into an `Nfa<u32>` over the box's local node ids, assigned
/// in first-seen order.
fn parse_box(body: &str) -> EngineResult<Nfa<u32>> {
    let mut nfa_box: Nfa<u32> = Nfa::new();
    let mut local_id: HashMap<String, usize> = HashMap::new();
    let mut pending_attrs: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut edges: Vec<(String, String, String)> = Vec::new();

    for stmt in split_statements(body) {
        let (head, attrs) = extract_attrs(&stmt);
        if let Some((lhs, rhs)) = head.split_once("->") {
            let from = extract_quoted_or_bare(lhs.trim());
            let to = extract_quoted_or_bare(rhs.trim());
            let label = attrs.get("label").cloned().unwrap_or_default();
            edges.push((from, label, to));
        } else if !head.is_empty() {
            let name = extract_quoted_or_bare(head);
            pending_attrs.insert(name, attrs);
        }
    }

    let mut node_of = |name: &str, nfa_box: &mut Nfa<u32>, local_id: &mut HashMap<String, usize>| -> usize {
        if let Some(&idx) = local_id.get(name) {
            return idx;
        }
        let attrs = pending_attrs.get(name).cloned().unwrap_or_default();
        let is_start = bool_attr(&attrs, "is_start", true);
        let is_final = bool_attr(&attrs, "is_final", true);
        let idx = nfa_box.add_state(local_id.len() as u32, is_start, is_final);
        local_id.insert(name.to_string(), idx);
        idx
    };

    for name in pending_attrs.keys().cloned().collect::<Vec<_>>() {
        node_of(&name, &mut nfa_box, &mut local_id);
    }
    for (from, label, to) in &edges {
        let f = node_of(from, &mut nfa_box, &mut local_id);
        let t = node_of(to, &mut nfa_box, &mut local_id);
        let parsed_label = if is_nonterminal_label(label) {
            Label::variable(label.clone())
        } else {
            Label::terminal(label.clone())
        };
        nfa_box.add_transition(f, parsed_label, t);
    }
    Ok(nfa_box)
}

/// Read the RSM DOT dialect: a top-level graph named by the start
/// nonterminal, containing one `subgraph NAME { ... }` per box.
pub fn read_rsm_dot(source: &str) -> EngineResult<Rsm> {
    let open = source.find('{').ok_or_else(|| EngineError::ParseError("RSM DOT source has no graph body".to_string()))?;
    let header = source[..open].trim();
    let start = header
        .split_whitespace()
        .last()
        .ok_or_else(|| EngineError::ParseError("RSM DOT source has no graph name".to_string()))?
        .to_string();
    let close = find_matching_brace(source, open)?;
    let body = &source[open + 1..close];

    let mut boxes = HashMap::new();
    let mut search_from = 0usize;
    while let Some(rel_pos) = body[search_from..].find("subgraph") {
        let sub_start = search_from + rel_pos;
        let header_end = body[sub_start..]
            .find('{')
            .ok_or_else(|| EngineError::ParseError("subgraph with no body".to_string()))?
            + sub_start;
        let sub_name = body[sub_start + "subgraph".len()..header_end].trim().to_string();
        let sub_close = find_matching_brace(body, header_end)?;
        let sub_body = &body[header_end + 1..sub_close];
        boxes.insert(sub_name, parse_box(sub_body)?);
        search_from = sub_close + 1;
    }

    if boxes.is_empty() {
        return Err(EngineError::ParseError("RSM DOT source declares no boxes".to_string()));
    }
    Ok(Rsm::new(start, boxes))
}

/// Write the RSM DOT dialect [`read_rsm_dot`] accepts.
#[must_use]
pub fn write_rsm_dot(rsm: &Rsm) -> String {
    let mut out = format!("digraph {} {{\n", dot_quote(rsm.start()));
    let mut names: Vec<&String> = rsm.boxes().keys().collect();
    names.sort();
    for name in names {
        let nfa_box = &rsm.boxes()[name];
        out.push_str(&format!("  subgraph {} {{\n", dot_quote(name)));
        for (i, s) in nfa_box.states().iter().enumerate() {
            out.push_str(&format!(
                "    {} [is_start={}, is_final={}];\n",
                dot_quote(&i.to_string()),
                s.is_start,
                s.is_final
            ));
        }
        for (f, label, t) in nfa_box.transitions() {
            out.push_str(&format!(
                "    {} -> {} [label={}];\n",
                dot_quote(&f.to_string()),
                dot_quote(&t.to_string()),
                dot_quote(&label.to_string())
            ));
        }
        out.push_str("  }\n");
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_graph_dot_round_trips_edges() {
        let src = r#"digraph g { "0" -> "1" [label="a"]; "1" -> "0" [label="b"]; }"#;
        let g = read_graph_dot(src).unwrap();
        assert_eq!(g.edges().len(), 2);
        assert_eq!(g.len(), 2);
    }

    #[test]
    fn write_then_read_graph_dot_preserves_edge_count() {
        let mut g = LabeledGraph::new();
        g.add_edge(VertexId::int(0), "a", VertexId::int(1));
        g.add_edge(VertexId::int(1), "b", VertexId::int(2));
        let dot = write_graph_dot(&g, "roundtrip");
        let reread = read_graph_dot(&dot).unwrap();
        assert_eq!(reread.edges().len(), 2);
        assert_eq!(reread.len(), 3);
    }

    #[test]
    fn read_rsm_dot_parses_one_box_with_nonterminal_edge() {
        let src = r#"digraph S {
            subgraph S {
                "0" [is_start=True, is_final=True];
                "1" [is_start=False, is_final=False];
                "0" -> "1" [label="a"];
                "1" -> "1" [label="S"];
                "1" -> "0" [label="b"];
            }
        }"#;
        let rsm = read_rsm_dot(src).unwrap();
        assert_eq!(rsm.start(), "S");
        assert_eq!(rsm.boxes().len(), 1);
        let s_box = &rsm.boxes()["S"];
        assert!(s_box
            .transitions()
            .iter()
            .any(|(_, l, _)| matches!(l, Label::Variable(v) if v == "S")));
    }

    #[test]
    fn write_then_read_rsm_dot_preserves_box_count() {
        let mut nfa_box: Nfa<u32> = Nfa::new();
        let q0 = nfa_box.add_state(0, true, true);
        let q1 = nfa_box.add_state(1, false, false);
        nfa_box.add_transition(q0, Label::terminal("a"), q1);
        let mut boxes = HashMap::new();
        boxes.insert("S".to_string(), nfa_box);
        let rsm = Rsm::new("S", boxes);
        let dot = write_rsm_dot(&rsm);
        let reread = read_rsm_dot(&dot).unwrap();
        assert_eq!(reread.boxes().len(), 1);
    }

    #[test]
    fn malformed_dot_source_is_a_parse_error() {
        let result = read_graph_dot("not a dot graph");
        assert!(matches!(result, Err(EngineError::ParseError(_))));
    }
}
