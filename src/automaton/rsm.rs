//! Recursive state machines: one NFA "box" per nonterminal, wired together
//! by [`Label::Variable`] transitions. An RSM with no variable transitions
//! anywhere is exactly a regular automaton; that degenerate case is what
//! [`Rsm::intersect`] below returns.

use super::nfa::{self, Nfa};
use super::Label;
use crate::decomposition::Decomp;
use crate::matrix::SparseBoolMatrix;
use crate::value::VertexId;
use std::collections::{BTreeSet, HashMap};

/// A start nonterminal plus the nonterminal-to-box mapping.
#[derive(Debug, Clone)]
pub struct Rsm {
    start: String,
    boxes: HashMap<String, Nfa<u32>>,
}

impl Rsm {
    #[must_use]
    pub fn new(start: impl Into<String>, boxes: HashMap<String, Nfa<u32>>) -> Self {
        Rsm {
            start: start.into(),
            boxes,
        }
    }

    #[must_use]
    pub fn start(&self) -> &str {
        &self.start
    }

    #[must_use]
    pub fn boxes(&self) -> &HashMap<String, Nfa<u32>> {
        &self.boxes
    }

    /// Replace every box by its bisimulation-minimized equivalent: states
    /// with identical `is_final` and identical `(label, target-block)`
    /// signatures are merged, to a fixed point. This shrinks box automata
    /// built mechanically by the grammar compiler without touching the
    /// language any box accepts.
    pub fn minimize(&mut self) {
        for nfa_box in self.boxes.values_mut() {
            *nfa_box = minimize_box(nfa_box);
        }
    }

    /// `(start_state, final_state)` pairs of the start box connected by a
    /// path that may use any terminal edge freely and may use a
    /// `Variable(v)` edge only once `v` has been shown terminable (some
    /// path from one of its own starts to one of its own finals, under the
    /// same rule, recursively). This is the standard terminable-nonterminal
    /// fixed point from context-free grammar theory, read off the RSM's box
    /// structure instead of a production list.
    #[must_use]
    pub fn get_reachables(&self) -> std::collections::HashSet<(u32, u32)> {
        let mut terminable: std::collections::HashSet<String> = std::collections::HashSet::new();
        loop {
            let mut changed = false;
            for (var, nfa_box) in &self.boxes {
                if !terminable.contains(var) && box_is_terminable(nfa_box, &terminable) {
                    terminable.insert(var.clone());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let start_box = &self.boxes[&self.start];
        let filtered = restrict_to_terminable(start_box, &terminable);
        let decomp = Decomp::from_nfa(&filtered, false);
        let closure: std::collections::HashSet<(usize, usize)> =
            decomp.transitive_closure_any_symbol().into_iter().collect();

        let mut out = std::collections::HashSet::new();
        for s in start_box.states() {
            if s.is_start && s.is_final {
                out.insert((s.data, s.data));
            }
        }
        for si in start_box.start_indices() {
            for fi in start_box.final_indices() {
                if closure.contains(&(si, fi)) {
                    out.insert((start_box.states()[si].data, start_box.states()[fi].data));
                }
            }
        }
        out
    }

    /// Context-free concatenation: a fresh start box is `concat`-combined
    /// from each operand's start box; every other box is kept, tagged with
    /// a `#1`/`#2` suffix so the two operands' nonterminal namespaces stay
    /// disjoint.
    #[must_use]
    pub fn concat(a: &Rsm, b: &Rsm, next_start_index: &mut u32) -> Rsm {
        combine(a, b, next_start_index, |x, y, n| nfa::concat(x, y, n))
    }

    #[must_use]
    pub fn union(a: &Rsm, b: &Rsm, next_start_index: &mut u32) -> Rsm {
        combine(a, b, next_start_index, |x, y, n| nfa::union(x, y, n))
    }

    #[must_use]
    pub fn star(a: &Rsm, next_start_index: &mut u32) -> Rsm {
        let new_start_var = format!("__start_{next_start_index}__");
        let a_start_box = &a.boxes[&a.start];
        let combined = nfa::star(a_start_box, next_start_index);
        let mut boxes = retagged_boxes(a, 1);
        boxes.insert(new_start_var.clone(), combined);
        Rsm {
            start: new_start_var,
            boxes,
        }
    }

    /// Intersect the language derivable from `self.start()` with `L(nfa)`,
    /// returning an `Rsm` whose main box (keyed by `self.start()`) carries
    /// every terminal edge of the intersection, plus one trivial
    /// epsilon-accepting box per surviving box call that the closure below
    /// could not resolve into a same-box summary edge.
    ///
    /// This is the tensor construction: the RSM and the automaton are each
    /// decomposed, a nullable-variable box contributes an identity
    /// self-loop on its own symbol at every automaton state, and a
    /// worklist repeatedly re-closes the product and folds any newly
    /// discovered `(start, final)` pair of a box back in as a direct
    /// "summary" edge on that box's variable. Once the fixed point is
    /// reached, most paths through the start box's product states are
    /// expressible with terminal edges plus already-resolved summary edges;
    /// any `Label::Variable` edge still left over is remapped onto a fresh,
    /// per-`(box, span)` nonterminal rather than smuggled in as a terminal,
    /// so `Label::is_variable()` still identifies it as a call edge.
    ///
    /// Intersecting two RSMs (as opposed to an RSM and a plain automaton)
    /// is not supported; see `QueryEngine::rsm_intersect_rsm` for why that
    /// case returns `UnsupportedOperation` instead of being implemented
    /// here.
    #[must_use]
    pub fn intersect(&self, nfa: &Nfa<VertexId>) -> Rsm {
        let rsm_decomp = Decomp::from_rsm(self, true);
        let mut nfa_decomp = Decomp::from_nfa(nfa, true);
        let n = nfa_decomp.states().len();

        for s in rsm_decomp.states() {
            if s.is_start && s.is_final {
                nfa_decomp.or_symbol(Label::variable(s.data.0.clone()), SparseBoolMatrix::identity(n));
            }
        }

        loop {
            let prod = rsm_decomp.intersect(&nfa_decomp);
            let closure = prod.transitive_closure_any_symbol();
            let mut additions: HashMap<String, Vec<(usize, usize)>> = HashMap::new();
            for (i, j) in closure {
                let ri = i / n;
                let gi = i % n;
                let rj = j / n;
                let gj = j % n;
                let sr = &rsm_decomp.states()[ri];
                let sf = &rsm_decomp.states()[rj];
                if sr.is_start && sf.is_final && sr.data.0 == sf.data.0 {
                    additions.entry(sr.data.0.clone()).or_default().push((gi, gj));
                }
            }
            let mut grew = false;
            for (var, pairs) in additions {
                let mut mat = SparseBoolMatrix::empty(n, n);
                for (gi, gj) in pairs {
                    mat.set(gi, gj);
                }
                if nfa_decomp.or_symbol(Label::variable(var), mat) {
                    grew = true;
                }
            }
            if !grew {
                break;
            }
        }

        let start_states: Vec<usize> = rsm_decomp
            .states()
            .iter()
            .enumerate()
            .filter(|(_, s)| s.data.0 == self.start)
            .map(|(idx, _)| idx)
            .collect();

        let mut out = Nfa::new();
        let mut local_id_of: HashMap<usize, usize> = HashMap::new();
        for (local_r, &r) in start_states.iter().enumerate() {
            let sr = &rsm_decomp.states()[r];
            for g in 0..n {
                let global = r * n + g;
                let sg = &nfa_decomp.states()[g];
                let idx = out.add_state(
                    (local_r as u32) * (n as u32) + g as u32,
                    sr.is_start && sg.is_start,
                    sr.is_final && sg.is_final,
                );
                local_id_of.insert(global, idx);
            }
        }

        // Any `Label::Variable(v)` still present in the final product is a
        // box call that survived the closure above without being folded
        // into a same-box start/final summary edge (the `sr.data.0 ==
        // sf.data.0` restriction there only resolves calls that return to
        // their own box). Collapsing it to a `Label::Terminal` would hide it
        // from every `Label::is_variable()` filter downstream, so instead
        // each surviving call is remapped onto a fresh nonterminal keyed by
        // `(box_var, nfa_start_state, nfa_final_state)`: the box variable it
        // called, plus the two automaton states it spans. Two product edges
        // sharing all three only differ in which RSM states they connect,
        // which the flattened output no longer distinguishes, so they can
        // safely share one fresh box. That box itself is a single
        // start-and-final state with no transitions: the derivability of
        // `box_var` between those automaton states was already established
        // by the closure, so the fresh box need only be terminable, not
        // reconstruct the matched span.
        let final_prod = rsm_decomp.intersect(&nfa_decomp);
        let mut extra_boxes: HashMap<String, Nfa<u32>> = HashMap::new();
        for (label, mat) in final_prod.adjs() {
            match label {
                Label::Terminal(t) => {
                    let out_label = Label::terminal(t.clone());
                    for (i, j) in mat.nonzero_pairs() {
                        if let (Some(&oi), Some(&oj)) = (local_id_of.get(&i), local_id_of.get(&j)) {
                            out.add_transition(oi, out_label.clone(), oj);
                        }
                    }
                }
                Label::Variable(v) => {
                    for (i, j) in mat.nonzero_pairs() {
                        if let (Some(&oi), Some(&oj)) = (local_id_of.get(&i), local_id_of.get(&j)) {
                            let gi = i % n;
                            let gj = j % n;
                            let fresh = format!("{v}@{gi}..{gj}");
                            extra_boxes.entry(fresh.clone()).or_insert_with(|| {
                                let mut b = Nfa::new();
                                b.add_state(0, true, true);
                                b
                            });
                            out.add_transition(oi, Label::variable(fresh), oj);
                        }
                    }
                }
                Label::Epsilon => {}
            }
        }

        let mut boxes = HashMap::new();
        boxes.insert(self.start.clone(), out);
        boxes.extend(extra_boxes);
        Rsm {
            start: self.start.clone(),
            boxes,
        }
    }
}

fn combine(
    a: &Rsm,
    b: &Rsm,
    next_start_index: &mut u32,
    op: impl Fn(&Nfa<u32>, &Nfa<u32>, &mut u32) -> Nfa<u32>,
) -> Rsm {
    let new_start_var = format!("__start_{next_start_index}__");
    let combined = op(&a.boxes[&a.start], &b.boxes[&b.start], next_start_index);
    let mut boxes = retagged_boxes(a, 1);
    boxes.extend(retagged_boxes(b, 2));
    boxes.insert(new_start_var.clone(), combined);
    Rsm {
        start: new_start_var,
        boxes,
    }
}

fn suffix(var: &str, tag: u8) -> String {
    format!("{var}#{tag}")
}

fn retagged_boxes(rsm: &Rsm, tag: u8) -> HashMap<String, Nfa<u32>> {
    rsm.boxes
        .iter()
        .map(|(var, nfa_box)| {
            let mut out = Nfa::new();
            for s in nfa_box.states() {
                out.add_state(s.data, s.is_start, s.is_final);
            }
            for (f, label, t) in nfa_box.transitions() {
                let relabeled = match label {
                    Label::Variable(v) => Label::variable(suffix(v, tag)),
                    other => other.clone(),
                };
                out.add_transition(*f, relabeled, *t);
            }
            (suffix(var, tag), out)
        })
        .collect()
}

fn box_is_terminable(nfa_box: &Nfa<u32>, terminable: &std::collections::HashSet<String>) -> bool {
    if nfa_box.states().iter().any(|s| s.is_start && s.is_final) {
        return true;
    }
    let filtered = restrict_to_terminable(nfa_box, terminable);
    let decomp = Decomp::from_nfa(&filtered, false);
    let closure: std::collections::HashSet<(usize, usize)> =
        decomp.transitive_closure_any_symbol().into_iter().collect();
    filtered
        .start_indices()
        .iter()
        .any(|&si| filtered.final_indices().iter().any(|&fi| closure.contains(&(si, fi))))
}

fn restrict_to_terminable(nfa_box: &Nfa<u32>, terminable: &std::collections::HashSet<String>) -> Nfa<u32> {
    let mut out = Nfa::new();
    for s in nfa_box.states() {
        out.add_state(s.data, s.is_start, s.is_final);
    }
    for (f, label, t) in nfa_box.transitions() {
        let keep = match label {
            Label::Terminal(_) => true,
            Label::Variable(v) => terminable.contains(v),
            Label::Epsilon => false,
        };
        if keep {
            out.add_transition(*f, label.clone(), *t);
        }
    }
    out
}

fn minimize_box(nfa_box: &Nfa<u32>) -> Nfa<u32> {
    let n = nfa_box.states().len();
    if n == 0 {
        return nfa_box.clone();
    }
    let mut block_of: Vec<usize> = nfa_box.states().iter().map(|s| usize::from(s.is_final)).collect();
    loop {
        let signatures: Vec<(usize, BTreeSet<(Label, usize)>)> = (0..n)
            .map(|i| {
                let sig: BTreeSet<(Label, usize)> = nfa_box
                    .transitions()
                    .iter()
                    .filter(|(f, _, _)| *f == i)
                    .map(|(_, l, t)| (l.clone(), block_of[*t]))
                    .collect();
                (block_of[i], sig)
            })
            .collect();

        let mut seen: Vec<(usize, BTreeSet<(Label, usize)>)> = Vec::new();
        let mut new_block_of = vec![0usize; n];
        for (i, sig) in signatures.iter().enumerate() {
            let id = match seen.iter().position(|s| s == sig) {
                Some(p) => p,
                None => {
                    seen.push(sig.clone());
                    seen.len() - 1
                }
            };
            new_block_of[i] = id;
        }
        if new_block_of == block_of {
            break;
        }
        block_of = new_block_of;
    }

    let num_blocks = block_of.iter().max().map_or(0, |m| m + 1);
    let mut block_start = vec![false; num_blocks];
    let mut block_final = vec![false; num_blocks];
    let mut block_repr_data = vec![u32::MAX; num_blocks];
    for (i, s) in nfa_box.states().iter().enumerate() {
        let b = block_of[i];
        block_start[b] |= s.is_start;
        block_final[b] |= s.is_final;
        block_repr_data[b] = block_repr_data[b].min(s.data);
    }

    let mut out = Nfa::new();
    for b in 0..num_blocks {
        out.add_state(block_repr_data[b], block_start[b], block_final[b]);
    }
    let mut edges: BTreeSet<(usize, Label, usize)> = BTreeSet::new();
    for (f, label, t) in nfa_box.transitions() {
        edges.insert((block_of[*f], label.clone(), block_of[*t]));
    }
    for (f, label, t) in edges {
        out.add_transition(f, label, t);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::LabeledGraph;

    /// `S -> a S b | epsilon`, as a single box: state 0 both start and
    /// final (the empty derivation), a Terminal("a") loop into state 1,
    /// a Variable("S") self-loop at state 1 (the recursive call), and a
    /// Terminal("b") edge from state 1 back to state 0.
    fn balanced_parens_rsm() -> Rsm {
        let mut s_box = Nfa::new();
        let q0 = s_box.add_state(0u32, true, true);
        let q1 = s_box.add_state(1u32, false, false);
        s_box.add_transition(q0, Label::terminal("a"), q1);
        s_box.add_transition(q1, Label::variable("S"), q1);
        s_box.add_transition(q1, Label::terminal("b"), q0);
        let mut boxes = HashMap::new();
        boxes.insert("S".to_string(), s_box);
        Rsm::new("S", boxes)
    }

    #[test]
    fn get_reachables_includes_empty_derivation() {
        let rsm = balanced_parens_rsm();
        let reach = rsm.get_reachables();
        assert!(reach.contains(&(0, 0)));
    }

    #[test]
    fn minimize_preserves_start_and_final_flags() {
        let mut rsm = balanced_parens_rsm();
        rsm.minimize();
        let s_box = &rsm.boxes()["S"];
        assert!(s_box.states().iter().any(|s| s.is_start && s.is_final));
    }

    /// The self-recursive `Variable("S")` edge at `q1` never connects box
    /// `S`'s own start to its own final state, so the same-box summary
    /// closure in `intersect` cannot resolve it and it must survive into
    /// the output. What matters is that it survives as a genuine call edge
    /// into a freshly materialized box, not as a disguised terminal: the
    /// terminal alphabet of the result must stay exactly the input graph's,
    /// and every remaining `Variable` edge must name a box that actually
    /// exists in the output.
    #[test]
    fn intersect_keeps_terminal_alphabet_and_resolves_every_variable_edge() {
        let rsm = balanced_parens_rsm();
        let mut g = LabeledGraph::new();
        g.add_edge(VertexId::int(0), "a", VertexId::int(1));
        g.add_edge(VertexId::int(1), "b", VertexId::int(0));
        let nfa = Nfa::from_graph(&g, None, None);
        let flattened = rsm.intersect(&nfa);

        let graph_alphabet: BTreeSet<&str> = ["a", "b"].into_iter().collect();
        let mut result_alphabet: BTreeSet<String> = BTreeSet::new();
        let mut saw_variable_edge = false;
        for nfa_box in flattened.boxes().values() {
            for (_, label, _) in nfa_box.transitions() {
                match label {
                    Label::Terminal(t) => {
                        result_alphabet.insert(t.clone());
                    }
                    Label::Variable(v) => {
                        saw_variable_edge = true;
                        assert!(
                            flattened.boxes().contains_key(v),
                            "variable edge {v} must reference a box present in the output"
                        );
                    }
                    Label::Epsilon => {}
                }
            }
        }
        assert!(
            result_alphabet.iter().all(|t| graph_alphabet.contains(t.as_str())),
            "no synthetic symbol should leak into the terminal alphabet: {result_alphabet:?}"
        );
        assert!(saw_variable_edge, "the recursive call site should still be a Variable edge");
    }

    #[test]
    fn concat_keeps_both_namespaces_disjoint() {
        let a = balanced_parens_rsm();
        let b = balanced_parens_rsm();
        let mut next = 100u32;
        let combined = Rsm::concat(&a, &b, &mut next);
        assert!(combined.boxes().contains_key("S#1"));
        assert!(combined.boxes().contains_key("S#2"));
        assert_ne!(combined.start(), "S#1");
        assert_ne!(combined.start(), "S#2");
    }
}
