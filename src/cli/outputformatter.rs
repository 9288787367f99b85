use terminal_size::{terminal_size, Height, Width};

use crate::config::ColumnAlignment;

// Render a card listing as an ASCII table no wider than `termw` visible columns.
// Column widths grow to fit the widest cell; lines that still overflow are elided
// in the middle.
pub fn render_table(headers: &[String], rows: &[Vec<String>], alignment: ColumnAlignment, termw: usize) -> Vec<String> {
    let mut widths: Vec<usize> = headers.iter().map(|s| visible_len(s).min(termw)).collect();
    for r in rows {
        for (i, cell) in r.iter().enumerate().take(headers.len()) {
            let w = visible_len(cell);
            if w > widths[i] { widths[i] = w.min(termw); }
        }
    }

    let mut out = Vec::with_capacity(rows.len() + 5);
    let sep = build_separator(&widths);
    out.push(fit_line_to_width(&sep, termw));
    out.push(fit_line_to_width(&build_row_header_colored(headers, &widths), termw));
    out.push(fit_line_to_width(&sep, termw));
    for r in rows {
        out.push(fit_line_to_width(&build_row(r, &widths, alignment), termw));
    }
    out.push(fit_line_to_width(&sep, termw));
    out.push(fit_line_to_width(&format!("cards: {}, columns: {}", rows.len(), headers.len()), termw));
    out
}

pub fn print_table(headers: &[String], rows: &[Vec<String>], alignment: ColumnAlignment) {
    let termw = get_terminal_width();
    crate::tprintln!("[cli.outputformatter] detected terminal width={} columns", termw);
    for line in render_table(headers, rows, alignment, termw) {
        println!("{}", line);
    }
}

fn build_separator(widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('+');
    for w in widths {
        s.push_str(&"-".repeat(*w + 2));
        s.push('+');
    }
    s
}

fn build_row(cells: &[String], widths: &[usize], alignment: ColumnAlignment) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        let pad = w.saturating_sub(visible_len(&text));
        // numbers hug the right edge regardless of alignment
        let (left, right) = if is_numeric_like(cell) {
            (pad, 0)
        } else {
            match alignment {
                ColumnAlignment::Start => (0, pad),
                ColumnAlignment::Center => (pad / 2, pad - pad / 2),
            }
        };
        s.push(' ');
        s.push_str(&" ".repeat(left));
        s.push_str(&text);
        s.push_str(&" ".repeat(right));
        s.push(' ');
        s.push('|');
    }
    s
}

// Build header row with column names colored green. Keep padding based on visible width.
fn build_row_header_colored(cells: &[String], widths: &[usize]) -> String {
    let mut s = String::new();
    s.push('|');
    for (i, w) in widths.iter().enumerate() {
        let cell = cells.get(i).map(String::as_str).unwrap_or("");
        let text = truncate(cell, *w);
        s.push(' ');
        s.push_str(&format!("\x1b[32m{}\x1b[0m", text));
        s.push_str(&" ".repeat(w.saturating_sub(visible_len(&text))));
        s.push(' ');
        s.push('|');
    }
    s
}

fn truncate(s: &str, max: usize) -> String {
    let len = s.chars().count();
    if len <= max { return s.to_string(); }
    if max <= 1 { return "…".to_string(); }
    s.chars().take(max - 1).collect::<String>() + "…"
}

fn is_numeric_like(s: &str) -> bool {
    let st = s.trim();
    if st.is_empty() { return false; }
    let mut has_digit = false;
    for ch in st.chars() {
        if ch.is_ascii_digit() { has_digit = true; continue; }
        if ".-+,_".contains(ch) { continue; }
        return false;
    }
    has_digit
}

// --- Terminal fitting & ANSI helpers ---

fn get_terminal_width() -> usize {
    if let Some((Width(w), Height(_h))) = terminal_size() {
        return (w as usize).saturating_sub(4).max(20);
    }
    80
}

fn fit_line_to_width(s: &str, maxw: usize) -> String {
    if visible_len(s) <= maxw { return s.to_string(); }
    elide_middle_preserving_ansi(s, maxw)
}

// Split into (is_ansi, text) runs; CSI sequences (ESC [ ... letter) are one run each.
fn tokenize(s: &str) -> Vec<(bool, &str)> {
    let bytes = s.as_bytes();
    let mut toks = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        if bytes[i] == 0x1B {
            i += 1;
            if i < bytes.len() && bytes[i] == b'[' {
                i += 1;
                while i < bytes.len() {
                    let b = bytes[i];
                    i += 1;
                    if b.is_ascii_alphabetic() { break; }
                }
            }
            toks.push((true, &s[start..i]));
            continue;
        }
        // ESC is ASCII, so this never splits a UTF-8 sequence
        while i < bytes.len() && bytes[i] != 0x1B {
            i += 1;
        }
        toks.push((false, &s[start..i]));
    }
    toks
}

fn visible_len(s: &str) -> usize {
    tokenize(s).iter().filter(|(ansi, _)| !ansi).map(|(_, t)| t.chars().count()).sum()
}

fn elide_middle_preserving_ansi(s: &str, maxw: usize) -> String {
    if maxw <= 3 { return "…".repeat(maxw.min(1)); }
    let budget = maxw - 3;
    let front_keep = budget / 2;
    let back_keep = budget - front_keep;
    let toks = tokenize(s);

    let mut front = String::new();
    let mut collected = 0usize;
    for (ansi, t) in &toks {
        if *ansi {
            front.push_str(t);
            continue;
        }
        let vis = t.chars().count();
        if collected + vis <= front_keep {
            front.push_str(t);
            collected += vis;
        } else {
            front.extend(t.chars().take(front_keep - collected));
            break;
        }
    }

    let mut back_parts: Vec<String> = Vec::new();
    let mut collected = 0usize;
    for (ansi, t) in toks.iter().rev() {
        if *ansi {
            back_parts.push(t.to_string());
            continue;
        }
        let vis = t.chars().count();
        if collected + vis <= back_keep {
            back_parts.push(t.to_string());
            collected += vis;
        } else {
            back_parts.push(t.chars().skip(vis - (back_keep - collected)).collect());
            break;
        }
    }
    back_parts.reverse();

    let mut out = front;
    out.push_str("...");
    out.push_str(&back_parts.concat());
    // reset colour in case an escape was cut
    out.push_str("\x1b[0m");
    out
}

#[cfg(test)]
#[path = "outputformatter_tests.rs"]
mod outputformatter_tests;
