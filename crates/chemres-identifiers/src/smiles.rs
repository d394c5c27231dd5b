//! Lightweight SMILES tokenizer
//!
//! This is a syntactic screen, not a parser: it accepts strings made only of
//! SMILES tokens, with balanced branches and at least one atom. It does not
//! check valence, ring closure pairing or aromaticity.

/// A single lexical unit of a SMILES string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmilesToken<'a> {
    /// Organic-subset or aromatic atom (`C`, `Cl`, `c`, `*`)
    Atom(&'a str),
    /// Bracket atom including brackets (`[NH4+]`)
    BracketAtom(&'a str),
    /// Bond symbol (`-`, `=`, `#`, `$`, `:`, `/`, `\`)
    Bond(char),
    /// Ring closure label (`1`, `%12`)
    RingClosure(u8),
    BranchOpen,
    BranchClose,
    /// Disconnected component separator
    Dot,
}

impl SmilesToken<'_> {
    pub fn is_atom(&self) -> bool {
        matches!(self, SmilesToken::Atom(_) | SmilesToken::BracketAtom(_))
    }
}

const TWO_LETTER_ORGANIC: [&str; 2] = ["Cl", "Br"];
const ONE_LETTER_ORGANIC: &str = "BCNOPSFI";
const AROMATIC: &str = "bcnops";
const BONDS: &str = "-=#$:/\\";

/// Split a string into SMILES tokens. Returns `None` at the first character
/// that cannot start a token.
pub fn tokenize(input: &str) -> Option<Vec<SmilesToken<'_>>> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let rest = &input[i..];
        let c = bytes[i] as char;

        if let Some(two) = TWO_LETTER_ORGANIC.iter().find(|t| rest.starts_with(**t)) {
            tokens.push(SmilesToken::Atom(&input[i..i + two.len()]));
            i += two.len();
        } else if ONE_LETTER_ORGANIC.contains(c) || AROMATIC.contains(c) || c == '*' {
            tokens.push(SmilesToken::Atom(&input[i..i + 1]));
            i += 1;
        } else if c == '[' {
            let close = rest.find(']')?;
            let inner = &rest[1..close];
            if !is_bracket_atom_body(inner) {
                return None;
            }
            tokens.push(SmilesToken::BracketAtom(&input[i..i + close + 1]));
            i += close + 1;
        } else if BONDS.contains(c) {
            tokens.push(SmilesToken::Bond(c));
            i += 1;
        } else if c.is_ascii_digit() {
            tokens.push(SmilesToken::RingClosure(c as u8 - b'0'));
            i += 1;
        } else if c == '%' {
            let label = rest.get(1..3)?;
            if !label.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            tokens.push(SmilesToken::RingClosure(label.parse().ok()?));
            i += 3;
        } else if c == '(' {
            tokens.push(SmilesToken::BranchOpen);
            i += 1;
        } else if c == ')' {
            tokens.push(SmilesToken::BranchClose);
            i += 1;
        } else if c == '.' {
            tokens.push(SmilesToken::Dot);
            i += 1;
        } else {
            return None;
        }
    }

    Some(tokens)
}

/// Inside of a bracket atom: optional isotope, element symbol, then chirality,
/// hydrogen count, charge and atom class characters.
fn is_bracket_atom_body(inner: &str) -> bool {
    if inner.is_empty() || inner.contains('[') {
        return false;
    }
    let symbol_start = inner.trim_start_matches(|c: char| c.is_ascii_digit());
    let has_symbol = symbol_start
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '*');
    has_symbol
        && inner
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '@' | '+' | '-' | ':' | '*'))
}

/// Whether a string looks like a SMILES structure.
///
/// Requires every character to belong to a token, the first token to be an
/// atom, branches to balance, and no bond or branch to dangle at the end.
pub fn is_smiles_like(input: &str) -> bool {
    let Some(tokens) = tokenize(input) else {
        return false;
    };
    let Some(first) = tokens.first() else {
        return false;
    };
    if !first.is_atom() {
        return false;
    }

    let mut depth: i32 = 0;
    for token in &tokens {
        match token {
            SmilesToken::BranchOpen => depth += 1,
            SmilesToken::BranchClose => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }

    let dangling = matches!(
        tokens.last(),
        Some(SmilesToken::Bond(_) | SmilesToken::BranchOpen | SmilesToken::Dot)
    );
    depth == 0 && !dangling
}
