use super::{Convention, WriteOptions};
use crate::tree::{ConfigNode, Node};

/// Serializes `config` to lines following `options.convention`.
///
/// The flat convention is the nested layout without indentation: every
/// section still gets its `[name]` header, which loses the nesting of
/// subsections when read back.
pub fn render_lines(config: &ConfigNode, options: &WriteOptions) -> Vec<String> {
    let mut lines = Vec::new();
    let escape = |text: &str| escape_comment(text, options.comment_char);
    match options.convention {
        Convention::Nested => write_sections(config, 0, options.indentation, &escape, &mut lines),
        Convention::Flat => write_sections(config, 0, 0, &escape, &mut lines),
        Convention::Dotted => write_dotted(config, &mut Vec::new(), &escape, &mut lines),
    }
    lines
}

fn write_sections(
    section: &ConfigNode,
    depth: usize,
    indentation: usize,
    escape: &dyn Fn(&str) -> String,
    lines: &mut Vec<String>,
) {
    let pad = " ".repeat(depth * indentation);
    for (key, node) in section.entries() {
        match node {
            Node::Section(subsection) => {
                lines.push(format!("{}[{}]", pad, escape(&key)));
                write_sections(&subsection, depth + 1, indentation, escape, lines);
            }
            Node::Leaf(value) => {
                lines.push(format!("{}{} = {}", pad, escape(&key), escape(&value)));
            }
        }
    }
}

fn write_dotted(
    section: &ConfigNode,
    prefix: &mut Vec<String>,
    escape: &dyn Fn(&str) -> String,
    lines: &mut Vec<String>,
) {
    for (key, node) in section.entries() {
        prefix.push(escape(&key));
        match node {
            Node::Section(subsection) => write_dotted(&subsection, prefix, escape, lines),
            Node::Leaf(value) => lines.push(format!("{} = {}", prefix.join("."), escape(&value))),
        }
        prefix.pop();
    }
}

fn escape_comment(text: &str, comment_char: char) -> String {
    if !text.contains(comment_char) {
        return text.to_string();
    }
    text.replace(comment_char, &format!("\\{}", comment_char))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ConfigNode {
        let config = ConfigNode::new();
        config.set(&["option1"], "1", false).unwrap();
        config.set(&["section1", "option2"], "2", true).unwrap();
        config
            .set(&["section1", "subsection11", "option3"], "3", true)
            .unwrap();
        config.set(&["section1", "option4"], "4", false).unwrap();
        config
    }

    #[test]
    fn test_nested_layout() {
        let lines = render_lines(&sample(), &WriteOptions::default());
        assert_eq!(
            lines,
            vec![
                "option1 = 1",
                "[section1]",
                "    option2 = 2",
                "    [subsection11]",
                "        option3 = 3",
                "    option4 = 4",
            ]
        );
    }

    #[test]
    fn test_nested_layout_custom_indentation() {
        let options = WriteOptions::default().with_indentation(2);
        let lines = render_lines(&sample(), &options);
        assert_eq!(lines[4], "    option3 = 3");
    }

    #[test]
    fn test_flat_layout_has_no_indentation() {
        let options = WriteOptions::default().with_convention(Convention::Flat);
        let lines = render_lines(&sample(), &options);
        assert_eq!(
            lines,
            vec![
                "option1 = 1",
                "[section1]",
                "option2 = 2",
                "[subsection11]",
                "option3 = 3",
                "option4 = 4",
            ]
        );
    }

    #[test]
    fn test_dotted_layout() {
        let options = WriteOptions::default().with_convention(Convention::Dotted);
        let lines = render_lines(&sample(), &options);
        assert_eq!(
            lines,
            vec![
                "option1 = 1",
                "section1.option2 = 2",
                "section1.subsection11.option3 = 3",
                "section1.option4 = 4",
            ]
        );
    }

    #[test]
    fn test_comment_characters_are_escaped() {
        let config = ConfigNode::new();
        config.set(&["color"], "#ff0000", false).unwrap();
        let lines = render_lines(&config, &WriteOptions::default());
        assert_eq!(lines, vec![r"color = \#ff0000"]);
    }
}
