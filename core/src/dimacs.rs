//! DIMACS CNF (and the iCNF incremental variant) writer and reader (`spec.md` §6, specified
//! bit-exactly). A textual front-end is explicitly out of scope for the core as a *program*
//! (`spec.md` §1), but the wire format itself is part of the core's external interface, so both
//! directions are implemented here, grounded on `varisat-dimacs`'s `DimacsParser`/`write_dimacs*`
//! split between a header, a clause-only body, and incremental append.
//!
//! Unlike the teacher's `varisat-dimacs` (a chunked, restartable byte scanner so a parser can be fed
//! a `Read` stream piecemeal), this reader consumes the whole input up front: nothing in `spec.md`
//! calls for streaming parsing, only for round-tripping a complete instance, so a simpler
//! whitespace-tokenising scan is enough.

use std::io::{self, BufRead, Write};

use thiserror::Error;

use crate::ids::AtomId;

/// A literal as it appears on the wire: a non-zero signed integer, positive for a positive atom.
pub type DimacsLit = i64;

/// Maps an [`AtomId`] onto a 1-based signed DIMACS literal, using the atom's dense arena index as
/// the variable number (every boolean term gets a contiguous atom-pair slot in allocation order,
/// regardless of which plugin owns it, so this numbering is stable and gap-free).
pub fn atom_to_lit(atom: AtomId) -> DimacsLit {
    let var = atom.local_index() as i64 + 1;
    if atom.is_positive() { var } else { -var }
}

/// The inverse of [`atom_to_lit`].
pub fn lit_to_atom(lit: DimacsLit) -> AtomId {
    debug_assert_ne!(lit, 0, "0 is a clause terminator, not a literal");
    let pos = AtomId::positive(lit.unsigned_abs() as u32 - 1);
    if lit > 0 { pos } else { pos.negate() }
}

/// The `p cnf N M` (or `p inccnf`) header.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DimacsHeader {
    pub num_vars: u64,
    pub num_clauses: u64,
}

/// A fully parsed (non-incremental) DIMACS CNF instance.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DimacsCnf {
    pub header: Option<DimacsHeader>,
    pub clauses: Vec<Vec<DimacsLit>>,
}

/// Errors recognising a DIMACS CNF input (`spec.md` §7 kind 5's sibling for the textual format:
/// malformed input is reported, not panicked on).
#[derive(Debug, Error)]
pub enum DimacsError {
    #[error("line {line}: invalid header line: {text:?}")]
    InvalidHeader { line: usize, text: String },
    #[error("line {line}: literal `{token}` is not a valid non-zero integer")]
    InvalidLiteral { line: usize, token: String },
    #[error("clause section ended with an unterminated clause (missing trailing `0`)")]
    UnterminatedClause,
    #[error("header declared {header_vars} variables but clauses use variable {used_var}")]
    VarCountMismatch { header_vars: u64, used_var: u64 },
    #[error("header declared {header_clauses} clauses but {actual_clauses} were read")]
    ClauseCountMismatch { header_clauses: u64, actual_clauses: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Writes `p cnf {num_vars} {num_clauses}\n`.
pub fn write_cnf_header(out: &mut impl Write, header: DimacsHeader) -> io::Result<()> {
    writeln!(out, "p cnf {} {}", header.num_vars, header.num_clauses)
}

/// Writes `p inccnf\n`, the iCNF header (`spec.md` §6).
pub fn write_icnf_header(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "p inccnf")
}

/// Writes the clause body: each clause as space-separated literals terminated by `0\n`
/// (`spec.md` §6, bit-exact).
pub fn write_clauses<'a>(out: &mut impl Write, clauses: impl IntoIterator<Item = &'a [DimacsLit]>) -> io::Result<()> {
    for clause in clauses {
        for lit in clause {
            write!(out, "{lit} ")?;
        }
        writeln!(out, "0")?;
    }
    Ok(())
}

/// Writes a complete headered CNF instance.
pub fn write_cnf(out: &mut impl Write, clauses: &[Vec<DimacsLit>]) -> io::Result<()> {
    let num_vars = clauses
        .iter()
        .flat_map(|c| c.iter())
        .map(|&lit| lit.unsigned_abs())
        .max()
        .unwrap_or(0);
    write_cnf_header(
        out,
        DimacsHeader {
            num_vars,
            num_clauses: clauses.len() as u64,
        },
    )?;
    write_clauses(out, clauses.iter().map(|c| c.as_slice()))
}

/// Appends one `a <lits> 0\n` assumption line to an existing iCNF stream (`spec.md` §6: "appendable
/// across invocations").
pub fn append_icnf_assumptions(out: &mut impl Write, assumptions: &[DimacsLit]) -> io::Result<()> {
    write!(out, "a ")?;
    for lit in assumptions {
        write!(out, "{lit} ")?;
    }
    writeln!(out, "0")
}

/// Parses a complete DIMACS CNF (or the CNF prefix of an iCNF) instance.
///
/// Comment lines (`c ...`) are skipped. The header line (`p cnf N M` or `p inccnf`) is optional;
/// when present, a mismatch between its counts and what is actually read is reported rather than
/// silently corrected, mirroring `varisat-dimacs`'s `check_header`.
pub fn parse_cnf(input: impl io::Read) -> Result<DimacsCnf, DimacsError> {
    let reader = io::BufReader::new(input);
    let mut header = None;
    let mut clauses = Vec::new();
    let mut partial: Vec<DimacsLit> = Vec::new();
    let mut max_var = 0u64;

    for (line_index, line) in reader.lines().enumerate() {
        let line_number = line_index + 1;
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('c') {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('p') {
            header = Some(parse_header_line(line_number, rest.trim())?);
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix('a') {
            // An iCNF assumption line reached while parsing the CNF body: the clause section has
            // ended (assumption lines never interleave with clause lines in a single write).
            let _ = rest;
            break;
        }
        for token in trimmed.split_whitespace() {
            let lit: DimacsLit = token
                .parse()
                .map_err(|_| DimacsError::InvalidLiteral { line: line_number, token: token.to_string() })?;
            if lit == 0 {
                clauses.push(std::mem::take(&mut partial));
            } else {
                max_var = max_var.max(lit.unsigned_abs());
                partial.push(lit);
            }
        }
    }

    if !partial.is_empty() {
        return Err(DimacsError::UnterminatedClause);
    }

    if let Some(h) = header {
        if h.num_vars < max_var {
            return Err(DimacsError::VarCountMismatch { header_vars: h.num_vars, used_var: max_var });
        }
        if h.num_clauses != clauses.len() as u64 {
            return Err(DimacsError::ClauseCountMismatch {
                header_clauses: h.num_clauses,
                actual_clauses: clauses.len() as u64,
            });
        }
    }

    Ok(DimacsCnf { header, clauses })
}

fn parse_header_line(line: usize, rest: &str) -> Result<DimacsHeader, DimacsError> {
    let mut fields = rest.split_whitespace();
    match fields.next() {
        Some("inccnf") => Ok(DimacsHeader { num_vars: 0, num_clauses: 0 }),
        Some("cnf") => {
            let num_vars = fields
                .next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| DimacsError::InvalidHeader { line, text: rest.to_string() })?;
            let num_clauses = fields
                .next()
                .and_then(|v| v.parse().ok())
                .ok_or_else(|| DimacsError::InvalidHeader { line, text: rest.to_string() })?;
            if fields.next().is_some() {
                return Err(DimacsError::InvalidHeader { line, text: rest.to_string() });
            }
            Ok(DimacsHeader { num_vars, num_clauses })
        }
        _ => Err(DimacsError::InvalidHeader { line, text: rest.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_small_instance() {
        let clauses = vec![vec![1, -2], vec![2, 3]];
        let mut buf = Vec::new();
        write_cnf(&mut buf, &clauses).unwrap();
        assert_eq!(buf, b"p cnf 3 2\n1 -2 0\n2 3 0\n");

        let parsed = parse_cnf(&buf[..]).unwrap();
        assert_eq!(parsed.header, Some(DimacsHeader { num_vars: 3, num_clauses: 2 }));
        assert_eq!(parsed.clauses, clauses);
    }

    #[test]
    fn parses_the_spec_example_verbatim() {
        let parsed = parse_cnf(&b"p cnf 3 2\n1 -2 0\n2 3 0\n"[..]).unwrap();
        assert_eq!(parsed.clauses, vec![vec![1, -2], vec![2, 3]]);
    }

    #[test]
    fn skips_comment_lines() {
        let parsed = parse_cnf(&b"c a comment\np cnf 1 1\nc another\n1 0\n"[..]).unwrap();
        assert_eq!(parsed.clauses, vec![vec![1]]);
    }

    #[test]
    fn rejects_a_clause_count_mismatch() {
        let err = parse_cnf(&b"p cnf 2 2\n1 0\n"[..]).unwrap_err();
        assert!(matches!(err, DimacsError::ClauseCountMismatch { header_clauses: 2, actual_clauses: 1 }));
    }

    #[test]
    fn rejects_an_unterminated_clause() {
        let err = parse_cnf(&b"1 2 3"[..]).unwrap_err();
        assert!(matches!(err, DimacsError::UnterminatedClause));
    }

    #[test]
    fn atom_lit_conversion_round_trips_polarity() {
        let a = AtomId::positive(5);
        assert_eq!(atom_to_lit(a), 6);
        assert_eq!(atom_to_lit(a.negate()), -6);
        assert_eq!(lit_to_atom(6), a);
        assert_eq!(lit_to_atom(-6), a.negate());
    }

    #[test]
    fn icnf_header_and_assumption_lines_round_trip() {
        let mut buf = Vec::new();
        write_icnf_header(&mut buf).unwrap();
        write_clauses(&mut buf, [&[1i64, 2][..]]).unwrap();
        append_icnf_assumptions(&mut buf, &[1]).unwrap();
        assert_eq!(buf, b"p inccnf\n1 2 0\na 1 0\n");
    }
}
