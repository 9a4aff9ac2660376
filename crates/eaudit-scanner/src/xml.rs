//! Owned XML element tree for reference extraction
//!
//! Detail documents are read as XML rather than JSON because the platform's
//! JSON encoding collapses single-element collections into bare objects.

use crate::error::{ApiError, ApiResult};
use quick_xml::events::Event;
use quick_xml::Reader;

/// A parsed XML element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Local tag name
    pub name: String,
    /// Concatenated text content directly inside this element
    pub text: String,
    /// Child elements in document order
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn named(name: &[u8]) -> Self {
        Self {
            name: String::from_utf8_lossy(name).into_owned(),
            ..Self::default()
        }
    }

    fn collect_path<'a>(&'a self, path: &[&str], out: &mut Vec<&'a str>) {
        match path.split_first() {
            None => {
                if !self.text.is_empty() {
                    out.push(&self.text);
                }
            }
            Some((head, rest)) => {
                for child in self.children.iter().filter(|c| c.name == *head) {
                    child.collect_path(rest, out);
                }
            }
        }
    }

    fn collect_descendants<'a>(&'a self, name: &str, out: &mut Vec<&'a str>) {
        if self.name == name && !self.text.is_empty() {
            out.push(&self.text);
        }
        for child in &self.children {
            child.collect_descendants(name, out);
        }
    }
}

/// A parsed XML document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: XmlElement,
}

impl XmlDocument {
    /// Parse a document
    ///
    /// # Errors
    /// Returns [`ApiError::Decode`] for malformed or empty input
    pub fn parse(source: &str) -> ApiResult<Self> {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text(true);

        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => stack.push(XmlElement::named(start.local_name().as_ref())),
                Event::Empty(start) => {
                    let element = XmlElement::named(start.local_name().as_ref());
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| ApiError::Decode("unbalanced closing tag".to_string()))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    if let Some(current) = stack.last_mut() {
                        let value = text
                            .unescape()
                            .map_err(|e| ApiError::Decode(e.to_string()))?;
                        current.text.push_str(&value);
                    }
                }
                Event::CData(data) => {
                    if let Some(current) = stack.last_mut() {
                        current.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(open) = stack.last() {
            return Err(ApiError::Decode(format!("unclosed element <{}>", open.name)));
        }
        root.map(|root| Self { root })
            .ok_or_else(|| ApiError::Decode("document has no root element".to_string()))
    }

    pub fn root(&self) -> &XmlElement {
        &self.root
    }

    /// Text values at a path below the root, e.g. `["criteria", "criterion", "name"]`
    pub fn texts_at(&self, path: &[&str]) -> Vec<&str> {
        let mut out = Vec::new();
        if !path.is_empty() {
            self.root.collect_path(path, &mut out);
        }
        out
    }

    /// First text value at a path below the root
    pub fn first_text_at(&self, path: &[&str]) -> Option<&str> {
        self.texts_at(path).into_iter().next()
    }

    /// Text values of every element with this tag name anywhere in the document
    pub fn descendant_texts(&self, name: &str) -> Vec<&str> {
        let mut out = Vec::new();
        self.root.collect_descendants(name, &mut out);
        out
    }
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    element: XmlElement,
) -> ApiResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err(ApiError::Decode("multiple root elements".to_string()));
    }
    Ok(())
}
