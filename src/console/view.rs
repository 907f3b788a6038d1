use crate::debugger::symbol::SequencePoint;
use crate::debugger::Place;
use crossterm::style::Stylize;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Source files cache, each file read once per session.
pub struct FileView {
    cached_lines: RefCell<HashMap<PathBuf, Rc<[String]>>>,
}

impl FileView {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            cached_lines: RefCell::default(),
        }
    }

    fn lines(&self, file: &Path) -> anyhow::Result<Rc<[String]>> {
        let path = fs::canonicalize(file)?;
        let mut cache = self.cached_lines.borrow_mut();
        if let Some(lines) = cache.get(&path) {
            return Ok(Rc::clone(lines));
        }

        let file = fs::File::open(&path)?;
        let lines: Rc<[String]> = std::io::BufReader::new(file)
            .lines()
            .map_while(Result::ok)
            .collect();
        cache.insert(path, Rc::clone(&lines));
        Ok(lines)
    }

    /// Render source lines covered by a place, covered columns are highlighted.
    pub fn render_source(&self, place: &Place) -> anyhow::Result<String> {
        let lines = self.lines(Path::new(&place.file))?;
        Ok(render_lines(&lines, &place.point))
    }
}

/// Render lines `[start_line, end_line]` of a sequence point. Columns are 1-based,
/// end column is exclusive.
pub fn render_lines(lines: &[String], sp: &SequencePoint) -> String {
    let width = lines.len().to_string().len();
    let mut result = String::new();

    let file_end = u32::try_from(lines.len()).unwrap_or(u32::MAX);
    let last_line = sp.end_line.min(file_end.max(sp.start_line));

    for num in sp.start_line..=last_line {
        let line: Vec<char> = num
            .checked_sub(1)
            .and_then(|idx| lines.get(idx as usize))
            .map(|l| l.chars().collect())
            .unwrap_or_default();
        let start = if num == sp.start_line {
            sp.start_column as usize
        } else {
            1
        };
        let end = if num == sp.end_line {
            sp.end_column as usize
        } else {
            line.len() + 1
        };
        let start = start.clamp(1, line.len() + 1) - 1;
        let end = end.clamp(start + 1, line.len() + 1) - 1;

        let part = |from: usize, to: usize| line[from..to].iter().collect::<String>();
        result.push_str(&format!("{:>width$}: ", num).cyan().to_string());
        result.push_str(&part(0, start).grey().to_string());
        result.push_str(&part(start, end).yellow().to_string());
        result.push_str(&part(end, line.len()).grey().to_string());
        if sp.start_line == sp.end_line && sp.start_column == sp.end_column {
            result.push_str(&" ^^^".yellow().to_string());
        }
        result.push('\n');
    }
    result
}
