use std::io::{self, Write};

use codesearch_core::{FormattedMatch, SearchResponse};
use crossterm::style::Stylize;

/// Minimum query length worth sending to the search tool from the terminal.
pub const MIN_QUERY_CHARS: usize = 3;

pub fn print_results(out: &mut impl Write, response: &SearchResponse, color: bool) -> io::Result<()> {
    if response.results.is_empty() {
        writeln!(out, "No results for \"{}\" in {}", response.query, response.path.display())?;
        return Ok(());
    }

    let mut current: Option<&str> = None;
    for m in &response.results {
        if current != Some(m.file.as_str()) {
            if current.is_some() {
                writeln!(out)?;
            }
            write_header(out, m, color)?;
            current = Some(m.file.as_str());
        }
        write_line(out, m, color)?;
    }

    let noun = if response.count == 1 { "result" } else { "results" };
    writeln!(out)?;
    writeln!(
        out,
        "{} {noun} for \"{}\" in {}",
        response.count,
        response.query,
        response.path.display()
    )
}

fn write_header(out: &mut impl Write, m: &FormattedMatch, color: bool) -> io::Result<()> {
    let dir = m.dir();
    let name = m.file_name();
    if !color {
        return if dir.is_empty() {
            writeln!(out, "{name}")
        } else {
            writeln!(out, "{name}  {dir}")
        };
    }
    if dir.is_empty() {
        writeln!(out, "{}", name.bold())
    } else {
        writeln!(out, "{}  {}", name.bold(), dir.dark_grey())
    }
}

fn write_line(out: &mut impl Write, m: &FormattedMatch, color: bool) -> io::Result<()> {
    let gutter = format!("{:>6}:", m.line);
    let (before, hit, after) = split_match(m);
    if color {
        writeln!(
            out,
            "{} {}{}{}",
            gutter.dark_grey(),
            before,
            hit.yellow().bold(),
            after
        )
    } else {
        writeln!(out, "{gutter} {before}{hit}{after}")
    }
}

/// Splits the line around the first submatch. Falls back to the whole line
/// when the recorded offset does not land on the match text.
pub fn split_match(m: &FormattedMatch) -> (&str, &str, &str) {
    let line = m.line_text.trim_end_matches(['\n', '\r']);
    let end = m.column + m.match_text.len();
    if m.match_text.is_empty() || line.get(m.column..end) != Some(m.match_text.as_str()) {
        return (line, "", "");
    }
    (&line[..m.column], &line[m.column..end], &line[end..])
}
