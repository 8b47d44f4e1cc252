// src/extractors/grid.rs

/// Tokenizes delimited text into a 2D cell grid.
///
/// Recognizes `,`, tab and `;` as delimiters outside quotes; `"` toggles
/// quoting (no escaped-quote support). Rows end on `\n`, `\r` or `\r\n`.
/// Fully blank rows are dropped; a trailing unterminated non-blank row is
/// flushed.
pub fn parse_grid(text: &str) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' | '\t' | ';' if !in_quotes => {
                row.push(cell.trim().to_string());
                cell.clear();
            }
            '\n' | '\r' if !in_quotes => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next(); // consume the \n of a \r\n pair
                }
                row.push(cell.trim().to_string());
                cell.clear();
                if row.iter().any(|c| !c.is_empty()) {
                    rows.push(std::mem::take(&mut row));
                } else {
                    row.clear();
                }
            }
            _ => cell.push(c),
        }
    }

    // Flush a trailing row without a line terminator
    if !cell.trim().is_empty() || !row.is_empty() {
        row.push(cell.trim().to_string());
        if row.iter().any(|c| !c.is_empty()) {
            rows.push(row);
        }
    }

    rows
}
