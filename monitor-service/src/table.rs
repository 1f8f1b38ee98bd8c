//! Plain-text rendering of a frame as a boxed table.
//!
//! ```text
//! +-----------------------------------------------------+
//! | Hostname | Id | User | Host      | ... | Info       |
//! +-----------------------------------------------------+
//! | db1      | 26 | root | localhost | ... | SELECT 1   |
//! +-----------------------------------------------------+
//! ```

use common::models::{Process, RenderFrame};

pub const DEFAULT_WIDTH: usize = 160;
pub const MIN_WIDTH: usize = 40;
pub const MAX_WIDTH: usize = 1000;

const HEADERS: [&str; 8] = ["Hostname", "Id", "User", "Host", "Db", "Command", "Time", "State"];

/// Renders the status view followed by the log box (when there are logs).
pub fn render(frame: &RenderFrame, width: usize) -> String {
    let width = width.clamp(MIN_WIDTH, MAX_WIDTH);
    let widths = column_widths(frame);
    let mut lines = Vec::new();

    lines.push(box_line(width));
    let mut header = String::new();
    for (title, w) in HEADERS.iter().zip(widths.iter()) {
        cell(&mut header, title, *w);
    }
    cell(&mut header, "Info", 0);
    lines.push(close(header, width));
    lines.push(box_line(width));

    for (name, snapshot) in frame.view.iter() {
        for process in &snapshot.processes {
            let mut line = String::new();
            for (value, w) in row_values(name, process).iter().zip(widths.iter()) {
                cell(&mut line, value, *w);
            }
            cell(&mut line, &single_line(process.info_or_empty()), 0);
            lines.push(close(line, width));
        }
    }
    lines.push(box_line(width));

    if !frame.logs.is_empty() {
        lines.push(String::new());
        lines.push(box_line(width));
        for entry in &frame.logs {
            let mut line = String::new();
            cell(&mut line, &single_line(&entry.line()), 0);
            lines.push(close(line, width));
        }
        lines.push(box_line(width));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn row_values(name: &str, p: &Process) -> [String; 8] {
    [
        name.to_string(),
        p.id.to_string(),
        p.user.clone(),
        p.host.clone(),
        p.db_or_empty().to_string(),
        p.command.clone(),
        p.time.to_string(),
        p.state_or_empty().to_string(),
    ]
}

/// Widest of header and values, per column.
fn column_widths(frame: &RenderFrame) -> [usize; 8] {
    let mut widths = HEADERS.map(char_len);
    for (name, snapshot) in frame.view.iter() {
        for process in &snapshot.processes {
            for (w, value) in widths.iter_mut().zip(row_values(name, process).iter()) {
                *w = (*w).max(char_len(value));
            }
        }
    }
    widths
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn cell(line: &mut String, value: &str, width: usize) {
    line.push_str("| ");
    line.push_str(value);
    for _ in char_len(value)..width {
        line.push(' ');
    }
    line.push(' ');
}

/// Truncates or pads to `width - 1` columns and closes the row with `|`.
fn close(line: String, width: usize) -> String {
    let inner = width - 1;
    let mut out: String = line.chars().take(inner).collect();
    for _ in char_len(&out)..inner {
        out.push(' ');
    }
    out.push('|');
    out
}

fn box_line(width: usize) -> String {
    format!("+{}+", "-".repeat(width - 2))
}

fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use common::models::{LogEntry, ProcessSnapshot, StatusView};

    fn frame() -> RenderFrame {
        let mut view = StatusView::new();
        view.upsert(ProcessSnapshot::new(
            "db1",
            vec![
                Process {
                    id: 26,
                    user: "root".into(),
                    host: "localhost".into(),
                    db: Some("mysql".into()),
                    command: "Query".into(),
                    time: 0,
                    state: Some("executing".into()),
                    info: Some("SHOW FULL\n  PROCESSLIST".into()),
                },
                Process {
                    id: 4,
                    user: "root".into(),
                    host: "localhost".into(),
                    db: None,
                    command: "Sleep".into(),
                    time: 33363,
                    state: None,
                    info: None,
                },
            ],
        ));
        RenderFrame {
            generation: 1,
            view,
            ..RenderFrame::default()
        }
    }

    #[test]
    fn test_every_line_has_requested_width() {
        let text = render(&frame(), 100);
        for line in text.lines().filter(|l| !l.is_empty()) {
            assert_eq!(line.chars().count(), 100, "{:?}", line);
        }
    }

    #[test]
    fn test_rows_are_aligned_and_nulls_blank() {
        let text = render(&frame(), 120);
        let lines: Vec<_> = text.lines().collect();
        assert!(lines[1].starts_with("| Hostname | Id | User | Host      | Db    | Command | Time  | State     | Info"));
        assert!(lines[3].starts_with("| db1      | 26 | root | localhost | mysql | Query   | 0     | executing | SHOW FULL PROCESSLIST"));
        assert!(lines[4].starts_with("| db1      | 4  | root | localhost |       | Sleep   | 33363 |           | "));
        assert_eq!(lines.len(), 6);
    }

    #[test]
    fn test_log_box_follows_table() {
        let mut frame = frame();
        frame.logs.push(LogEntry {
            timestamp: Local.with_ymd_and_hms(2024, 3, 1, 12, 0, 1).unwrap(),
            message: "Connection to db2 failed".into(),
        });
        let text = render(&frame, 80);
        let last: Vec<_> = text.lines().rev().take(2).collect();
        assert!(last[1].starts_with("| 12:00:01 Connection to db2 failed"));
        assert!(last[0].starts_with('+'));
    }

    #[test]
    fn test_width_is_clamped() {
        let text = render(&RenderFrame::default(), 5);
        assert_eq!(text.lines().next().unwrap().len(), MIN_WIDTH);
    }
}
