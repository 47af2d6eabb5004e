//! Regex dialect: whitespace-separated concatenation, `|` alternation, `*`
//! postfix star, parenthesized grouping. Compiled to an `Nfa<u32>` via
//! straightforward Thompson construction over the automaton combinators in
//! [`crate::automaton::nfa`].

use crate::automaton::{nfa, Label, Nfa};
use crate::error::{EngineError, EngineResult};
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "adapters/grammar/regex.pest"]
struct RegexDslParser;

#[derive(Debug, Clone, PartialEq, Eq)]
enum RegexAst {
    Symbol(String),
    Concat(Vec<RegexAst>),
    Union(Vec<RegexAst>),
    Star(Box<RegexAst>),
}

fn build_ast(pair: Pair<Rule>) -> RegexAst {
    match pair.as_rule() {
        Rule::regex => build_ast(pair.into_inner().next().expect("regex wraps union")),
        Rule::union => {
            let mut branches: Vec<RegexAst> = pair.into_inner().map(build_ast).collect();
            if branches.len() == 1 {
                branches.pop().expect("checked len")
            } else {
                RegexAst::Union(branches)
            }
        }
        Rule::concat => {
            let mut factors: Vec<RegexAst> = pair.into_inner().map(build_ast).collect();
            if factors.len() == 1 {
                factors.pop().expect("checked len")
            } else {
                RegexAst::Concat(factors)
            }
        }
        Rule::star => {
            let inner = build_ast(pair.into_inner().next().expect("star wraps an atom"));
            RegexAst::Star(Box::new(inner))
        }
        Rule::symbol => RegexAst::Symbol(pair.as_str().to_string()),
        Rule::WHITESPACE | Rule::EOI | Rule::atom | Rule::factor => {
            unreachable!("silent or end-of-input rule")
        }
    }
}

fn single_symbol_nfa(sym: &str, next: &mut u32) -> Nfa<u32> {
    let mut out = Nfa::new();
    let s0 = out.add_state(*next, true, false);
    *next += 1;
    let s1 = out.add_state(*next, false, true);
    *next += 1;
    out.add_transition(s0, Label::terminal(sym), s1);
    out
}

fn compile_ast(ast: &RegexAst, next: &mut u32) -> Nfa<u32> {
    match ast {
        RegexAst::Symbol(s) => single_symbol_nfa(s, next),
        RegexAst::Star(inner) => {
            let compiled = compile_ast(inner, next);
            nfa::star(&compiled, next)
        }
        RegexAst::Concat(parts) => {
            let mut iter = parts.iter();
            let first = iter.next().expect("concat has at least one factor");
            let mut acc = compile_ast(first, next);
            for part in iter {
                let next_piece = compile_ast(part, next);
                acc = nfa::concat(&acc, &next_piece, next);
            }
            acc
        }
        RegexAst::Union(branches) => {
            let mut iter = branches.iter();
            let first = iter.next().expect("union has at least one branch");
            let mut acc = compile_ast(first, next);
            for branch in iter {
                let next_piece = compile_ast(branch, next);
                acc = nfa::union(&acc, &next_piece, next);
            }
            acc
        }
    }
}

/// Parse and compile a regex source string into an automaton over fresh
/// `u32` state ids starting at `next_start_index`, advancing it past every
/// id the result uses.
pub fn compile_regex(source: &str, next_start_index: &mut u32) -> EngineResult<Nfa<u32>> {
    let mut pairs = RegexDslParser::parse(Rule::regex, source)
        .map_err(|e| EngineError::ParseError(e.to_string()))?;
    let root = pairs.next().ok_or_else(|| EngineError::ParseError("empty regex".to_string()))?;
    let ast = build_ast(root);
    Ok(compile_ast(&ast, next_start_index))
}
