use crate::automaton::{Act, Automaton, GenOptions, compile};
use anyhow::{Result, bail};
use std::io::Write;
use std::path::Path;

fn capitalize_first(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().collect::<String>() + c.as_str(),
    }
}

fn act_to_string(act: &Act) -> String {
    match act {
        Act::Error => "Action::Error".into(),
        Act::Accept => "Action::Accept".into(),
        Act::Shift(s) => format!("Action::Shift(StateId({s}))"),
        Act::Reduce(r) => format!("Action::Reduce(RuleId({r}))"),
        Act::Conflict(c) => format!("Action::Conflict(ConflictId({c}))"),
        Act::Goto(s) => format!("Action::Goto(StateId({s}))"),
    }
}

/// Compiles the grammar at `grammar_path` and writes `{name}.rs` into
/// `output_dir`.
///
/// The generated file defines the `ProdID` and `TokenID` enums, the static
/// table arrays and `table_data()`, which hands them to
/// `lalrbt::ParseTable::try_new`.
pub fn generate<P1, P2, S>(grammar_path: P1, output_dir: P2, name: S, options: &GenOptions) -> Result<()>
where
    P1: AsRef<Path>,
    P2: AsRef<Path>,
    S: AsRef<str>,
{
    let grammar = std::fs::read_to_string(&grammar_path)?;
    let auto = compile(&grammar, options)?;
    if auto.states.len() > u16::MAX as usize || auto.rules.len() > u16::MAX as usize {
        bail!("automaton too large for 16-bit ids");
    }
    let out_path = output_dir.as_ref().join(format!("{}.rs", name.as_ref()));
    let mut out = std::fs::File::create(&out_path)?;
    write_tables(&mut out, &auto, options)?;
    log::info!("wrote {}", out_path.display());
    Ok(())
}

/// Writes the generated Rust source for `auto`.
pub fn write_tables<W: Write>(out: &mut W, auto: &Automaton, options: &GenOptions) -> Result<()> {
    let n_symbols = auto.symbols.len();

    writeln!(out, "/*")?;
    writeln!(out, "Produced by the lalrbt-gen LALR(1) table generator")?;
    writeln!(out, "\n")?;
    auto.write_prods(out)?;
    writeln!(out)?;
    if options.debug {
        auto.write_item_sets(out)?;
    }
    writeln!(out, "*/\n")?;

    writeln!(
        out,
        "use lalrbt::{{Action, ConflictId, EntryPoint, RuleId, RuleInfo, StateId, SymbolId, TableData}};"
    )?;
    writeln!(out, "use num_enum::{{IntoPrimitive, TryFromPrimitive}};")?;
    writeln!(out)?;
    writeln!(out, "pub const N_SYMBOLS: usize = {};", n_symbols)?;
    writeln!(out, "pub const N_NONTERMINALS: usize = {};", auto.n_nonterminals)?;
    writeln!(out, "pub const N_TERMINALS: usize = {};", auto.n_terminals())?;
    writeln!(out, "pub const N_PRODUCTIONS: usize = {};", auto.rules.len())?;
    writeln!(out, "pub const N_STATES: usize = {};", auto.states.len())?;
    writeln!(out, "pub const N_CONFLICTS: usize = {};", auto.conflicts.len())?;
    writeln!(out, "pub const N_ENTRIES: usize = {};", auto.entries.len())?;
    writeln!(out, "pub const BACKTRACK: bool = {};", auto.backtrack)?;
    writeln!(out)?;

    writeln!(
        out,
        "#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]\n#[repr(u16)]\npub enum ProdID {{"
    )?;
    for (i, r) in auto.rules.iter().enumerate() {
        writeln!(out, "    {} = {},", capitalize_first(&r.label), i)?;
    }
    writeln!(out, "}}\n")?;

    writeln!(
        out,
        "#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]\n#[repr(u16)]\npub enum TokenID {{"
    )?;
    for (i, s) in auto.symbols.iter().enumerate() {
        if i == 0 {
            writeln!(out, "    // Nonterminals:")?;
        }
        if i == auto.n_nonterminals {
            writeln!(out, "\n    // Terminals:")?;
        }
        writeln!(out, "    {} = {},", capitalize_first(s), i)?;
    }
    writeln!(out, "}}\n")?;

    writeln!(out, "pub static SYMBOLS: [&str; N_SYMBOLS] = [")?;
    for (i, s) in auto.symbols.iter().enumerate() {
        writeln!(out, "    {:?}, // {}", s, i)?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub static SPELLINGS: [&str; N_SYMBOLS] = [")?;
    for (i, s) in auto.spellings.iter().enumerate() {
        writeln!(out, "    {:?}, // {}", s, i)?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub static RULES: [RuleInfo<'static>; N_PRODUCTIONS] = [")?;
    for (i, r) in auto.rules.iter().enumerate() {
        writeln!(
            out,
            "    RuleInfo {{ lhs: SymbolId({}), arity: {}, label: {:?} }}, // {}",
            r.lhs,
            r.rhs.len(),
            r.label,
            i
        )?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub static TAB: [Action; N_STATES * N_SYMBOLS] = [")?;
    for (i, row) in auto.states.iter().enumerate() {
        writeln!(out, "    /* STATE {} */", i)?;
        for (j, act) in row.iter().enumerate() {
            writeln!(out, "    {}, /* {}({}) */", act_to_string(act), j, auto.symbols[j])?;
        }
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub static CONFLICTS: [&[Action]; N_CONFLICTS] = [")?;
    for (i, alts) in auto.conflicts.iter().enumerate() {
        let alts: Vec<String> = alts.iter().map(act_to_string).collect();
        writeln!(out, "    &[{}], // {}", alts.join(", "), i)?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub static ENTRIES: [EntryPoint; N_ENTRIES] = [")?;
    for &(marker, nonterminal) in &auto.entries {
        writeln!(
            out,
            "    EntryPoint {{ marker: SymbolId({}), nonterminal: SymbolId({}) }}, // {}",
            marker, nonterminal, auto.symbols[nonterminal]
        )?;
    }
    writeln!(out, "];\n")?;

    writeln!(out, "pub fn table_data() -> TableData<'static> {{")?;
    writeln!(out, "    TableData {{")?;
    writeln!(out, "        symbols: &SYMBOLS,")?;
    writeln!(out, "        spellings: &SPELLINGS,")?;
    writeln!(out, "        n_nonterminals: N_NONTERMINALS,")?;
    writeln!(out, "        rules: &RULES,")?;
    writeln!(out, "        actions: &TAB,")?;
    writeln!(out, "        conflicts: &CONFLICTS,")?;
    writeln!(out, "        eof: SymbolId({}),", auto.eof)?;
    writeln!(out, "        entries: &ENTRIES,")?;
    writeln!(out, "        backtrack: BACKTRACK,")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    Ok(())
}
