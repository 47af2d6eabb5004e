//! Context-free grammar dialect: one production per line, `->` separating
//! head from body, `|` for alternation, lowercase terminals, uppercase
//! nonterminals, `epsilon` or `$` for the empty word.
//!
//! [`Grammar::to_wcnf`] performs the textbook TERM/BIN/DEL/UNIT construction
//! (weak Chomsky Normal Form: epsilon survives only as a flag on the start
//! symbol, never inside a body). [`Grammar::to_rsm`] instead builds one NFA
//! box per nonterminal directly from the alternative bodies, skipping the
//! CNF detour entirely — the natural shape for a recursive state machine.

use crate::automaton::{Label, Nfa, Rsm};
use crate::cfpq::Wcnf;
use crate::error::{EngineError, EngineResult};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use std::collections::{HashMap, HashSet};

#[derive(Parser)]
#[grammar = "adapters/grammar/cfg.pest"]
struct CfgDslParser;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Terminal(String),
    Nonterminal(String),
}

#[derive(Debug, Clone, Default)]
pub struct Grammar {
    pub start: String,
    pub productions: Vec<(String, Vec<Symbol>)>,
}

fn build_body(pair: Pair<Rule>) -> Vec<Symbol> {
    pair.into_inner()
        .filter(|p| p.as_rule() == Rule::symbol)
        .map(|sym| {
            let inner = sym.into_inner().next().expect("symbol wraps nonterminal or terminal");
            match inner.as_rule() {
                Rule::nonterminal => Symbol::Nonterminal(inner.as_str().to_string()),
                Rule::terminal => Symbol::Terminal(inner.as_str().to_string()),
                _ => unreachable!("symbol only wraps nonterminal/terminal"),
            }
        })
        .collect()
}

/// Parse a CFG source string. The head of the first production line is
/// taken as the grammar's start symbol.
pub fn parse_cfg(source: &str) -> EngineResult<Grammar> {
    let mut pairs = CfgDslParser::parse(Rule::grammar, source)
        .map_err(|e| EngineError::ParseError(e.to_string()))?;
    let root = pairs.next().ok_or_else(|| EngineError::ParseError("empty grammar".to_string()))?;

    let mut start: Option<String> = None;
    let mut productions = Vec::new();
    for production in root.into_inner().filter(|p| p.as_rule() == Rule::production) {
        let mut inner = production.into_inner();
        let head = inner.next().expect("production has a head nonterminal").as_str().to_string();
        if start.is_none() {
            start = Some(head.clone());
        }
        let alternation = inner.next().expect("production has an alternation body");
        for body in alternation.into_inner().filter(|p| p.as_rule() == Rule::body) {
            productions.push((head.clone(), build_body(body)));
        }
    }

    let start = start.ok_or_else(|| EngineError::ParseError("grammar has no productions".to_string()))?;
    Ok(Grammar { start, productions })
}

impl Grammar {
    fn nonterminals(&self) -> HashSet<String> {
        self.productions.iter().map(|(h, _)| h.clone()).collect()
    }

    /// Textbook CNF construction, stopping one step short of strict CNF:
    /// the empty word survives as `wcnf.epsilon` containing the *original*
    /// start symbol, never as a production body.
    #[must_use]
    pub fn to_wcnf(&self) -> Wcnf {
        let mut fresh_counter: u32 = 0;
        let mut fresh = || {
            fresh_counter += 1;
            format!("__G{fresh_counter}__")
        };

        let new_start = fresh();
        let mut bodies: Vec<(String, Vec<Symbol>)> = vec![(new_start.clone(), vec![Symbol::Nonterminal(self.start.clone())])];
        bodies.extend(self.productions.iter().cloned());

        // DEL: nullable-symbol fixed point, then expand every production
        // into every subset-with-nullables-dropped variant of its body.
        let mut nullable: HashSet<String> = HashSet::new();
        loop {
            let mut changed = false;
            for (head, body) in &bodies {
                if !nullable.contains(head)
                    && (body.is_empty() || body.iter().all(|s| matches!(s, Symbol::Nonterminal(n) if nullable.contains(n))))
                {
                    nullable.insert(head.clone());
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        let mut del_bodies: Vec<(String, Vec<Symbol>)> = Vec::new();
        for (head, body) in &bodies {
            let nullable_positions: Vec<usize> = body
                .iter()
                .enumerate()
                .filter(|(_, s)| matches!(s, Symbol::Nonterminal(n) if nullable.contains(n)))
                .map(|(i, _)| i)
                .collect();
            let variants = 1usize << nullable_positions.len();
            for mask in 0..variants {
                let mut variant = Vec::with_capacity(body.len());
                for (i, sym) in body.iter().enumerate() {
                    let drop = nullable_positions
                        .iter()
                        .position(|&p| p == i)
                        .map(|bit| (mask >> bit) & 1 == 1)
                        .unwrap_or(false);
                    if !drop {
                        variant.push(sym.clone());
                    }
                }
                // A bare epsilon production survives DEL only for the new
                // start symbol (weak CNF: epsilon belongs to the language
                // only if the *original* start was nullable).
                if !variant.is_empty() || head == &new_start {
                    del_bodies.push((head.clone(), variant));
                }
            }
        }

        // TERM: replace terminals inside bodies of length >= 2 with a fresh
        // nonterminal that produces exactly that terminal.
        let mut term_defs: HashMap<String, String> = HashMap::new();
        let mut extra_productions: Vec<(String, Vec<Symbol>)> = Vec::new();
        let mut term_bodies: Vec<(String, Vec<Symbol>)> = Vec::new();
        for (head, body) in &del_bodies {
            if body.len() == 1 {
                term_bodies.push((head.clone(), body.clone()));
                continue;
            }
            let rewritten: Vec<Symbol> = body
                .iter()
                .map(|s| match s {
                    Symbol::Terminal(t) => {
                        let nt = term_defs.entry(t.clone()).or_insert_with(|| fresh());
                        if !extra_productions.iter().any(|(h, _)| h == nt) {
                            extra_productions.push((nt.clone(), vec![Symbol::Terminal(t.clone())]));
                        }
                        Symbol::Nonterminal(nt.clone())
                    }
                    other => other.clone(),
                })
                .collect();
            term_bodies.push((head.clone(), rewritten));
        }
        term_bodies.extend(extra_productions);

        // BIN: right-factor bodies longer than 2 into a chain of binary
        // productions through fresh nonterminals.
        let mut binary: Vec<(String, String, String)> = Vec::new();
        let mut terminal: Vec<(String, String)> = Vec::new();
        let mut epsilon: HashSet<String> = HashSet::new();
        for (head, body) in &term_bodies {
            match body.as_slice() {
                [] => {
                    epsilon.insert(head.clone());
                }
                [Symbol::Terminal(t)] => terminal.push((head.clone(), t.clone())),
                [Symbol::Nonterminal(_)] => {
                    // UNIT productions are resolved below.
                }
                [a, b] => {
                    if let (Symbol::Nonterminal(a), Symbol::Nonterminal(b)) = (a, b) {
                        binary.push((head.clone(), a.clone(), b.clone()));
                    }
                }
                symbols => {
                    // TERM already replaced every terminal in bodies this
                    // long, so every entry here is a nonterminal.
                    let names: Vec<String> = symbols
                        .iter()
                        .map(|s| match s {
                            Symbol::Nonterminal(n) => n.clone(),
                            Symbol::Terminal(t) => t.clone(),
                        })
                        .collect();
                    let mut cur_head = head.clone();
                    for name in &names[..names.len() - 2] {
                        let tail_var = fresh();
                        binary.push((cur_head.clone(), name.clone(), tail_var.clone()));
                        cur_head = tail_var;
                    }
                    binary.push((cur_head, names[names.len() - 2].clone(), names[names.len() - 1].clone()));
                }
            }
        }

        // UNIT: transitive unit-pair closure, then replace `A -> B` by
        // every non-unit production reachable from `B`.
        let unit_pairs: Vec<(String, String)> = term_bodies
            .iter()
            .filter_map(|(h, b)| match b.as_slice() {
                [Symbol::Nonterminal(n)] => Some((h.clone(), n.clone())),
                _ => None,
            })
            .collect();
        let mut reach: HashMap<String, HashSet<String>> = HashMap::new();
        for (h, n) in &unit_pairs {
            reach.entry(h.clone()).or_default().insert(n.clone());
        }
        loop {
            let mut changed = false;
            let keys: Vec<String> = reach.keys().cloned().collect();
            for k in keys {
                let via: Vec<String> = reach[&k].iter().cloned().collect();
                for v in via {
                    if let Some(further) = reach.get(&v).cloned() {
                        for f in further {
                            if reach.get_mut(&k).map_or(true, |s| !s.contains(&f)) {
                                reach.entry(k.clone()).or_default().insert(f);
                                changed = true;
                            }
                        }
                    }
                }
            }
            if !changed {
                break;
            }
        }

        for (head, targets) in &reach {
            for target in targets {
                for (t_head, t) in terminal.clone() {
                    if &t_head == target {
                        terminal.push((head.clone(), t));
                    }
                }
                for (b_head, l, r) in binary.clone() {
                    if &b_head == target {
                        binary.push((head.clone(), l, r));
                    }
                }
                if epsilon.contains(target) {
                    epsilon.insert(head.clone());
                }
            }
        }
        terminal.sort();
        terminal.dedup();
        binary.sort();
        binary.dedup();

        Wcnf {
            start: new_start,
            epsilon,
            terminal,
            binary,
        }
    }

    /// Build one NFA box per nonterminal: a fresh start state per box, a
    /// chain of states per alternative, `Variable` transitions for
    /// nonterminal symbols. An epsilon alternative marks the box's start
    /// state also final (via `Nfa::set_final`, applied after the rest of
    /// the box is laid down).
    #[must_use]
    pub fn to_rsm(&self) -> Rsm {
        let mut grouped: HashMap<String, Vec<Vec<Symbol>>> = HashMap::new();
        for (head, body) in &self.productions {
            grouped.entry(head.clone()).or_default().push(body.clone());
        }

        let mut boxes = HashMap::new();
        for nonterminal in self.nonterminals() {
            let alternatives = &grouped[&nonterminal];
            let mut nfa_box: Nfa<u32> = Nfa::new();
            let mut next_id = 0u32;
            let start = nfa_box.add_state(next_id, true, false);
            next_id += 1;

            for alt in alternatives {
                if alt.is_empty() {
                    nfa_box.set_final(start, true);
                    continue;
                }
                let mut cur = start;
                for (i, sym) in alt.iter().enumerate() {
                    let is_last = i == alt.len() - 1;
                    let target = if is_last {
                        nfa_box.add_state(next_id, false, true)
                    } else {
                        nfa_box.add_state(next_id, false, false)
                    };
                    next_id += 1;
                    let label = match sym {
                        Symbol::Terminal(t) => Label::terminal(t.clone()),
                        Symbol::Nonterminal(n) => Label::variable(n.clone()),
                    };
                    nfa_box.add_transition(cur, label, target);
                    cur = target;
                }
            }
            boxes.insert(nonterminal, nfa_box);
        }

        Rsm::new(self.start.clone(), boxes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_alternation_and_epsilon() {
        let g = parse_cfg("S -> a S b | epsilon").unwrap();
        assert_eq!(g.start, "S");
        assert_eq!(g.productions.len(), 2);
        assert!(g.productions.iter().any(|(_, b)| b.is_empty()));
    }

    #[test]
    fn to_rsm_marks_epsilon_alternative_start_as_final() {
        let g = parse_cfg("S -> a S b | epsilon").unwrap();
        let rsm = g.to_rsm();
        let s_box = &rsm.boxes()["S"];
        assert!(s_box.start_indices().iter().any(|&i| s_box.states()[i].is_final));
    }

    #[test]
    fn to_wcnf_keeps_epsilon_only_at_new_start() {
        let g = parse_cfg("S -> a S b | epsilon").unwrap();
        let wcnf = g.to_wcnf();
        assert!(wcnf.epsilon.contains(&wcnf.start));
        assert_eq!(wcnf.epsilon.len(), 1, "only the fresh start symbol should carry epsilon");
    }

    #[test]
    fn to_wcnf_terminal_productions_present_for_simple_grammar() {
        let g = parse_cfg("S -> a b").unwrap();
        let wcnf = g.to_wcnf();
        assert!(!wcnf.terminal.is_empty());
        assert!(!wcnf.binary.is_empty());
    }

    #[test]
    fn malformed_grammar_source_is_a_parse_error() {
        let result = parse_cfg("S ->");
        assert!(matches!(result, Err(EngineError::ParseError(_))));
    }
}
