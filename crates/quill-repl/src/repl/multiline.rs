//! Multi-line input collection for the REPL
//!
//! Blocks can be typed (or pasted) directly as XML elements. Lines are
//! collected until every opened element has been closed, with quoted
//! attribute values and `<?...?>`/`<!...>` markup skipped.

/// Result of processing a line of input
#[derive(Debug)]
pub enum LineProcessResult {
    /// A complete element is ready to be built
    Complete(String),
    /// More input is needed to close the element
    NeedMore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    /// Just saw `<`, kind not known yet
    Pending,
    Open,
    Close,
    /// Declarations, comments and processing instructions
    Markup,
}

/// Collects multi-line input for complete elements
pub struct MultiLineCollector {
    /// Buffer for collecting lines
    buffer: String,
    /// Elements opened but not yet closed
    nesting_level: i32,
    /// Kind of the tag being read, if inside `<...>`
    tag: Option<TagKind>,
    /// Quote character of the attribute value being read
    string_delimiter: Option<char>,
    /// Last non-whitespace character inside the current tag
    last_in_tag: Option<char>,
    /// Whether at least one element tag has been completed
    seen_element: bool,
}

impl MultiLineCollector {
    /// Create a new multi-line collector
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            nesting_level: 0,
            tag: None,
            string_delimiter: None,
            last_in_tag: None,
            seen_element: false,
        }
    }

    /// Get the appropriate prompt for the current state
    pub fn get_prompt(&self) -> &'static str {
        if self.is_collecting() {
            "   " // Continuation prompt
        } else {
            ">> " // Main prompt
        }
    }

    /// Check if we're currently collecting a multi-line element
    pub fn is_collecting(&self) -> bool {
        !self.buffer.is_empty()
    }

    /// Reset the collector state
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.nesting_level = 0;
        self.tag = None;
        self.string_delimiter = None;
        self.last_in_tag = None;
        self.seen_element = false;
    }

    /// Process a line of input
    pub fn process_line(&mut self, line: &str) -> LineProcessResult {
        if !self.buffer.is_empty() {
            self.buffer.push('\n');
        }
        self.buffer.push_str(line);

        self.update_parsing_state(line);

        if self.is_complete_element() {
            let complete = self.buffer.clone();
            self.reset();
            LineProcessResult::Complete(complete)
        } else {
            LineProcessResult::NeedMore
        }
    }

    fn update_parsing_state(&mut self, line: &str) {
        for ch in line.chars() {
            if let Some(delimiter) = self.string_delimiter {
                if ch == delimiter {
                    self.string_delimiter = None;
                }
                continue;
            }
            let Some(kind) = self.tag else {
                if ch == '<' {
                    self.tag = Some(TagKind::Pending);
                    self.last_in_tag = None;
                }
                continue;
            };
            match (kind, ch) {
                (TagKind::Pending, '/') => self.tag = Some(TagKind::Close),
                (TagKind::Pending, '?' | '!') => self.tag = Some(TagKind::Markup),
                (TagKind::Pending, _) => {
                    self.tag = Some(TagKind::Open);
                    self.last_in_tag = Some(ch);
                }
                (TagKind::Markup, '>') => self.tag = None,
                (TagKind::Markup, _) => {}
                (_, '"' | '\'') => {
                    self.string_delimiter = Some(ch);
                    self.last_in_tag = Some(ch);
                }
                (_, '>') => {
                    match kind {
                        TagKind::Close => self.nesting_level -= 1,
                        _ if self.last_in_tag == Some('/') => {}
                        _ => self.nesting_level += 1,
                    }
                    self.tag = None;
                    self.seen_element = true;
                }
                (_, c) if c.is_whitespace() => {}
                (_, c) => self.last_in_tag = Some(c),
            }
        }
    }

    fn is_complete_element(&self) -> bool {
        self.seen_element
            && self.tag.is_none()
            && self.string_delimiter.is_none()
            && self.nesting_level <= 0
    }
}

impl Default for MultiLineCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_closing_element_is_complete() {
        let mut collector = MultiLineCollector::new();

        match collector.process_line(r#"<Integer value="42"/>"#) {
            LineProcessResult::Complete(xml) => assert_eq!(xml, r#"<Integer value="42"/>"#),
            LineProcessResult::NeedMore => panic!("Expected complete element"),
        }
        assert!(!collector.is_collecting());
    }

    #[test]
    fn test_multiline_element() {
        let mut collector = MultiLineCollector::new();

        match collector.process_line("<If>") {
            LineProcessResult::NeedMore => {}
            LineProcessResult::Complete(_) => panic!("Expected need more"),
        }
        assert_eq!(collector.get_prompt(), "   ");

        match collector.process_line("  <Slot/>\n  <Body/>") {
            LineProcessResult::NeedMore => {}
            LineProcessResult::Complete(_) => panic!("Expected need more"),
        }

        match collector.process_line("</If>") {
            LineProcessResult::Complete(xml) => {
                assert!(xml.starts_with("<If>"));
                assert!(xml.ends_with("</If>"));
            }
            LineProcessResult::NeedMore => panic!("Expected complete element"),
        }
    }

    #[test]
    fn test_quoted_brackets_are_ignored() {
        let mut collector = MultiLineCollector::new();

        match collector.process_line(r#"<Text value="a > b />"#) {
            LineProcessResult::NeedMore => {}
            LineProcessResult::Complete(_) => panic!("Expected need more"),
        }
        match collector.process_line(r#"" />"#) {
            LineProcessResult::Complete(_) => {}
            LineProcessResult::NeedMore => panic!("Expected complete element"),
        }
    }

    #[test]
    fn test_declaration_alone_is_not_an_element() {
        let mut collector = MultiLineCollector::new();

        match collector.process_line(r#"<?xml version="1.0"?>"#) {
            LineProcessResult::NeedMore => {}
            LineProcessResult::Complete(_) => panic!("Expected need more"),
        }
        match collector.process_line("<Not><Slot/></Not>") {
            LineProcessResult::Complete(xml) => assert!(xml.starts_with("<?xml")),
            LineProcessResult::NeedMore => panic!("Expected complete element"),
        }
    }
}
