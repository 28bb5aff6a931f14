use super::{strip_comment, Convention, ReadOptions};
use crate::tree::{node::dotted, ConfigNode, Keylist};
use crate::{Result, TreeConfigError};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

static SECTION_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(.+)\]$").expect("section header pattern is valid"));

/// Parses `lines` into `config` following `options.convention`.
///
/// Cross-references are left untouched; see [`super::resolve_references`].
pub fn parse_lines<I, S>(config: &ConfigNode, lines: I, options: &ReadOptions) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = LineParser::new(config, options);
    let mut count = 0;
    for (index, line) in lines.into_iter().enumerate() {
        parser.read_line(index + 1, line.as_ref())?;
        count += 1;
    }
    debug!(convention = %options.convention, lines = count, "Parsed configuration lines");
    Ok(())
}

/// Where the next option line lands.
enum Position {
    /// Keylist of the most recently opened nested section
    Nested(Keylist),
    /// Name of the current flat section, if any was opened yet
    Flat(Option<String>),
    Dotted,
}

struct LineParser<'a> {
    config: &'a ConfigNode,
    options: &'a ReadOptions,
    position: Position,
}

impl<'a> LineParser<'a> {
    fn new(config: &'a ConfigNode, options: &'a ReadOptions) -> Self {
        let position = match options.convention {
            Convention::Nested => Position::Nested(Vec::new()),
            Convention::Flat => Position::Flat(None),
            Convention::Dotted => Position::Dotted,
        };
        Self {
            config,
            options,
            position,
        }
    }

    fn read_line(&mut self, line_number: usize, raw: &str) -> Result<()> {
        let line = strip_comment(raw, self.options.comment_char);
        if line.trim().is_empty() {
            return Ok(());
        }

        match &mut self.position {
            Position::Nested(keylist) => {
                let depth = nested_depth(&line, self.options.indentation, keylist.len())
                    .ok_or_else(|| TreeConfigError::Indentation {
                        line_number,
                        line: raw.to_string(),
                    })?;
                keylist.truncate(depth);

                if let Some(name) = section_name(&line) {
                    keylist.push(name.to_string());
                    debug!(section = %dotted(keylist.as_slice()), line_number, "Opened section");
                } else {
                    let (key, value) = split_assignment(&line);
                    let mut target = keylist.clone();
                    target.push(key.to_string());
                    self.config.set(&target, value, true)?;
                }
            }
            Position::Flat(section) => {
                if let Some(name) = section_name(&line) {
                    *section = Some(name.to_string());
                    debug!(section = name, line_number, "Opened section");
                } else {
                    let (key, value) = split_assignment(&line);
                    match section {
                        Some(section) => self.config.set(&[section.as_str(), key], value, true)?,
                        None => self.config.set(&[key], value, true)?,
                    }
                }
            }
            Position::Dotted => {
                let (key, value) = split_assignment(&line);
                let keylist: Vec<&str> = key.split('.').collect();
                self.config.set(&keylist, value, true)?;
            }
        }

        Ok(())
    }
}

/// Name between the brackets of a `[name]` header line.
fn section_name(line: &str) -> Option<&str> {
    SECTION_HEADER
        .captures(line.trim())
        .and_then(|captures| captures.get(1))
        .map(|name| name.as_str())
}

/// Splits on the first `=`. A line without `=` is an option with an empty value.
fn split_assignment(line: &str) -> (&str, &str) {
    match line.split_once('=') {
        Some((key, value)) => (key.trim(), value.trim()),
        None => (line.trim(), ""),
    }
}

/// Depth of a nested-convention line, or `None` when its indentation is not
/// a whole number of units or goes deeper than the open sections allow.
fn nested_depth(line: &str, indentation: usize, open_sections: usize) -> Option<usize> {
    let width = line.chars().take_while(|c| c.is_whitespace()).count();
    if indentation == 0 || width % indentation != 0 {
        return None;
    }
    let depth = width / indentation;
    (depth <= open_sections).then_some(depth)
}
