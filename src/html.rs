//! HTML backing for the markup capability trait.
//!
//! Parses pages with `scraper` (html5ever) and exposes element handles as
//! [`MarkupNode`]s. Tag lookups compile a selector per call; an invalid
//! tag name simply matches nothing.

use scraper::{ElementRef, Html, Node, Selector};

use tvgrid_core::markup::MarkupNode;

/// A parsed HTML document.
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    pub fn parse(text: &str) -> Self {
        Self {
            html: Html::parse_document(text),
        }
    }

    /// The document's root element.
    pub fn root(&self) -> HtmlNode<'_> {
        HtmlNode(self.html.root_element())
    }
}

/// An element of an [`HtmlDocument`].
#[derive(Clone, Copy)]
pub struct HtmlNode<'a>(ElementRef<'a>);

impl<'a> MarkupNode for HtmlNode<'a> {
    fn first(&self, tag: &str) -> Option<Self> {
        let selector = Selector::parse(tag).ok()?;
        self.0.select(&selector).next().map(HtmlNode)
    }

    fn all(&self, tag: &str) -> Vec<Self> {
        match Selector::parse(tag) {
            Ok(selector) => self.0.select(&selector).map(HtmlNode).collect(),
            Err(_) => Vec::new(),
        }
    }

    fn attr(&self, name: &str) -> Option<String> {
        self.0.value().attr(name).map(str::to_string)
    }

    fn text(&self) -> String {
        self.0.text().collect()
    }

    fn has_next_sibling(&self) -> bool {
        self.0.next_siblings().any(|node| match node.value() {
            Node::Element(_) => true,
            Node::Text(text) => !text.trim().is_empty(),
            _ => false,
        })
    }
}
