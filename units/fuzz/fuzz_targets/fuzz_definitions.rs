//! Fuzz target for the definition loader
//!
//! Builds definition files from structured fragments and loads them into an
//! in-memory registry. Loading may fail, but must never panic.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sounio_units::definitions::parse_sections;
use sounio_units::{Config, DefinitionSource, Exponents, Quantity, UnitRegistry, Value};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    entries: Vec<Entry>,
    use_quantities: bool,
}

#[derive(Debug, Arbitrary)]
enum Entry {
    Section(SmallIdent),
    Definition(SmallIdent, Vec<Term>),
    Comment,
    Raw(String),
}

#[derive(Debug, Arbitrary)]
struct SmallIdent(u8);

impl SmallIdent {
    fn render(&self) -> String {
        const NAMES: &[&str] = &["m", "s", "K", "x", "y", "km", "degX", "N_A", "g_0"];
        NAMES[self.0 as usize % NAMES.len()].to_string()
    }
}

#[derive(Debug, Arbitrary)]
enum Term {
    Name(SmallIdent),
    Number(i16),
    Float(f32),
    Operator(Operator),
    Open,
    Close,
    Comma,
    Bool(bool),
    Lambda(SmallIdent),
    Helper(Helper),
    Str(SmallIdent),
}

#[derive(Debug, Arbitrary)]
enum Operator {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
}

#[derive(Debug, Arbitrary)]
enum Helper {
    Exp,
    Log,
    Sqrt,
    Quantity,
    ScalarUnit,
}

impl Term {
    fn render(&self) -> String {
        match self {
            Term::Name(name) => name.render(),
            Term::Number(n) => n.to_string(),
            Term::Float(f) => format!("{f:?}"),
            Term::Operator(op) => match op {
                Operator::Add => " + ",
                Operator::Sub => " - ",
                Operator::Mul => "*",
                Operator::Div => "/",
                Operator::FloorDiv => "//",
                Operator::Mod => "%",
                Operator::Pow => "**",
            }
            .to_string(),
            Term::Open => "(".to_string(),
            Term::Close => ")".to_string(),
            Term::Comma => ", ".to_string(),
            Term::Bool(b) => if *b { "True" } else { "False" }.to_string(),
            Term::Lambda(param) => format!("lambda {}: ", param.render()),
            Term::Helper(helper) => match helper {
                Helper::Exp => "exp(",
                Helper::Log => "log(",
                Helper::Sqrt => "sqrt(",
                Helper::Quantity => "Quantity(",
                Helper::ScalarUnit => "ScalarUnit(",
            }
            .to_string(),
            Term::Str(name) => format!("'{}'", name.render()),
        }
    }
}

fn render(entries: &[Entry]) -> String {
    let mut text = String::from("[fuzz]\n");
    for entry in entries {
        match entry {
            Entry::Section(name) => text.push_str(&format!("[{}]\n", name.render())),
            Entry::Definition(symbol, terms) => {
                let expression: String = terms.iter().map(Term::render).collect();
                text.push_str(&format!("{} = {}\n", symbol.render(), expression));
            }
            Entry::Comment => text.push_str("; comment\n"),
            Entry::Raw(raw) => {
                text.push_str(raw);
                text.push('\n');
            }
        }
    }
    text
}

fuzz_target!(|input: FuzzInput| {
    let text = render(&input.entries);
    let _ = parse_sections(&text);

    let config = Config {
        use_quantities: input.use_quantities,
        ..Config::default()
    };
    let metre = Quantity::new(1.0, Exponents::symbol("L"), Exponents::new()).bind_unit("m", true);
    let mut registry = UnitRegistry::from_entries(
        config,
        [("m".to_string(), Value::Quantity(metre))],
        Vec::new(),
    );
    if registry
        .load_definitions(&[DefinitionSource::new("fuzz.ini", text)])
        .is_ok()
    {
        for (symbol, value) in registry.entries() {
            let _ = value.format_with(&registry, &Default::default());
            let _ = registry.lookup(&format!("k{symbol}"));
        }
    }
});
