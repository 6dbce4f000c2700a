//! In-memory model of the host page.
//!
//! The overlay never owns the page: it reads and writes through this tree the
//! way a content script goes through the DOM. Child-list mutations are
//! reported to an optional observer channel, mirroring a mutation observer
//! registered with `childList` and `subtree`.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use ego_tree::{NodeRef, Tree};
use scraper::Html;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use url::Url;

pub use ego_tree::NodeId;

/// Handle shared between the host (which mutates the page) and the overlay.
pub type SharedDocument = Arc<Mutex<Document>>;

/// Locks a shared document, recovering the guard if a writer panicked.
pub fn lock_document(document: &SharedDocument) -> MutexGuard<'_, Document> {
    document.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Document,
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    tag: String,
    attrs: BTreeMap<String, String>,
    style: BTreeMap<String, String>,
}

impl ElementData {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: BTreeMap::new(),
            style: BTreeMap::new(),
        }
    }

    fn from_scraper(element: &scraper::node::Element) -> Self {
        let mut data = Self::new(element.name());
        for (name, value) in element.attrs() {
            if name.eq_ignore_ascii_case("style") {
                data.style = parse_inline_style(value);
            } else {
                data.attrs.insert(name.to_ascii_lowercase(), value.to_string());
            }
        }
        data
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn style(&self, property: &str) -> Option<&str> {
        self.style.get(property).map(String::as_str)
    }

    fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let joined = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {class}", existing.trim()),
            _ => class.to_string(),
        };
        self.attrs.insert("class".to_string(), joined);
    }

    fn remove_class(&mut self, class: &str) {
        if !self.has_class(class) {
            return;
        }
        let kept: Vec<&str> = self.classes().filter(|c| *c != class).collect();
        let joined = kept.join(" ");
        self.attrs.insert("class".to_string(), joined);
    }
}

fn parse_inline_style(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .filter(|(k, v)| !k.is_empty() && !v.is_empty())
        .collect()
}

/// One batch of child-list changes under `target`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub target: NodeId,
    pub added: usize,
    pub removed: usize,
}

/// Detached subtree to be inserted into a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    node: Node,
    children: Vec<Fragment>,
}

impl Fragment {
    pub fn element(tag: &str) -> Self {
        Self {
            node: Node::Element(ElementData::new(tag)),
            children: Vec::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            node: Node::Text(text.into()),
            children: Vec::new(),
        }
    }

    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        if let Node::Element(data) = &mut self.node {
            data.attrs.insert(name.to_ascii_lowercase(), value.into());
        }
        self
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn class(mut self, class: &str) -> Self {
        if let Node::Element(data) = &mut self.node {
            data.add_class(class);
        }
        self
    }

    pub fn style(mut self, property: &str, value: impl Into<String>) -> Self {
        if let Node::Element(data) = &mut self.node {
            data.style.insert(property.to_string(), value.into());
        }
        self
    }

    pub fn child(mut self, child: Fragment) -> Self {
        self.children.push(child);
        self
    }

    pub fn children(mut self, children: impl IntoIterator<Item = Fragment>) -> Self {
        self.children.extend(children);
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    Append,
    Prepend,
    After,
}

/// Host page tree plus its location.
///
/// Removal detaches a subtree but does not free it: `ego_tree` keeps every
/// node allocated for the lifetime of the document, and stale `NodeId`s stay
/// queryable. Text rewritten repeatedly goes through [`Document::update_text`].
pub struct Document {
    tree: Tree<Node>,
    body: NodeId,
    location: Url,
    observer: Option<UnboundedSender<MutationRecord>>,
}

impl Document {
    /// Empty `html > head, body` skeleton.
    pub fn new(location: Url) -> Self {
        let mut tree = Tree::new(Node::Document);
        let body = {
            let mut root = tree.root_mut();
            let mut html = root.append(Node::Element(ElementData::new("html")));
            html.append(Node::Element(ElementData::new("head")));
            html.append(Node::Element(ElementData::new("body"))).id()
        };
        Self {
            tree,
            body,
            location,
            observer: None,
        }
    }

    pub fn parse(markup: &str, location: Url) -> Self {
        let parsed = Html::parse_document(markup);
        let tree = Tree::new(Node::Document);
        let root = tree.root().id();
        let mut document = Self {
            tree,
            body: root,
            location,
            observer: None,
        };
        for child in parsed.tree.root().children() {
            document.import(root, child);
        }
        document.body = document
            .find_descendant(root, |el| el.tag() == "body")
            .unwrap_or(root);
        document
    }

    pub fn into_shared(self) -> SharedDocument {
        Arc::new(Mutex::new(self))
    }

    pub fn location(&self) -> &Url {
        &self.location
    }

    /// Client-side navigation: the location changes, the tree does not.
    pub fn navigate(&mut self, location: Url) {
        self.location = location;
    }

    /// Starts reporting child-list mutations. A later call replaces the
    /// previous observer.
    pub fn observe(&mut self) -> UnboundedReceiver<MutationRecord> {
        let (tx, rx) = unbounded_channel();
        self.observer = Some(tx);
        rx
    }

    pub fn root(&self) -> NodeId {
        self.tree.root().id()
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    pub fn element(&self, node: NodeId) -> Option<&ElementData> {
        match self.tree.get(node)?.value() {
            Node::Element(data) => Some(data),
            _ => None,
        }
    }

    fn with_element_mut<R>(
        &mut self,
        node: NodeId,
        edit: impl FnOnce(&mut ElementData) -> R,
    ) -> Option<R> {
        let mut node = self.tree.get_mut(node)?;
        match node.value() {
            Node::Element(data) => Some(edit(data)),
            _ => None,
        }
    }

    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.element(node)?.attr(name)
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.element(node).is_some_and(|el| el.has_class(class))
    }

    pub fn style(&self, node: NodeId, property: &str) -> Option<&str> {
        self.element(node)?.style(property)
    }

    pub fn is_hidden(&self, node: NodeId) -> bool {
        self.style(node, "display") == Some("none")
    }

    /// A node is live when its ancestor chain reaches the document root.
    pub fn is_connected(&self, node: NodeId) -> bool {
        let root = self.root();
        match self.tree.get(node) {
            Some(n) => n.id() == root || n.ancestors().any(|a| a.id() == root),
            None => false,
        }
    }

    pub fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.tree.get(node)?.parent()?;
        matches!(parent.value(), Node::Element(_)).then(|| parent.id())
    }

    /// Nearest ancestor-or-self element with the given tag.
    pub fn closest(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        let start = self.tree.get(node)?;
        std::iter::once(start)
            .chain(start.ancestors())
            .find(|n| matches!(n.value(), Node::Element(el) if el.tag().eq_ignore_ascii_case(tag)))
            .map(|n| n.id())
    }

    /// Elements strictly below `scope`, in document order.
    pub fn descendants_where<F>(&self, scope: NodeId, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&ElementData) -> bool,
    {
        let Some(scope) = self.tree.get(scope) else {
            return Vec::new();
        };
        scope
            .descendants()
            .skip(1)
            .filter(|n| matches!(n.value(), Node::Element(el) if predicate(el)))
            .map(|n| n.id())
            .collect()
    }

    pub fn find_descendant<F>(&self, scope: NodeId, predicate: F) -> Option<NodeId>
    where
        F: Fn(&ElementData) -> bool,
    {
        self.tree
            .get(scope)?
            .descendants()
            .skip(1)
            .find(|n| matches!(n.value(), Node::Element(el) if predicate(el)))
            .map(|n| n.id())
    }

    pub fn find_by_class(&self, scope: NodeId, class: &str) -> Option<NodeId> {
        self.find_descendant(scope, |el| el.has_class(class))
    }

    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_descendant(self.root(), |el| el.attr("id") == Some(id))
    }

    pub fn text_content(&self, node: NodeId) -> String {
        let Some(node) = self.tree.get(node) else {
            return String::new();
        };
        node.descendants()
            .filter_map(|n| match n.value() {
                Node::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        self.with_element_mut(node, |el| {
            el.attrs.insert(name.to_ascii_lowercase(), value.to_string());
        });
    }

    pub fn remove_attr(&mut self, node: NodeId, name: &str) {
        self.with_element_mut(node, |el| {
            el.attrs.remove(name);
        });
    }

    pub fn add_class(&mut self, node: NodeId, class: &str) {
        self.with_element_mut(node, |el| el.add_class(class));
    }

    pub fn remove_class(&mut self, node: NodeId, class: &str) {
        self.with_element_mut(node, |el| el.remove_class(class));
    }

    pub fn toggle_class(&mut self, node: NodeId, class: &str, on: bool) {
        if on {
            self.add_class(node, class);
        } else {
            self.remove_class(node, class);
        }
    }

    /// `None` clears the property.
    pub fn set_style(&mut self, node: NodeId, property: &str, value: Option<&str>) {
        self.with_element_mut(node, |el| match value {
            Some(value) => {
                el.style.insert(property.to_string(), value.to_string());
            }
            None => {
                el.style.remove(property);
            }
        });
    }

    pub fn append(&mut self, parent: NodeId, fragment: Fragment) -> Option<NodeId> {
        let id = self.insert(parent, fragment, Placement::Append)?;
        self.notify(parent, 1, 0);
        Some(id)
    }

    pub fn prepend(&mut self, parent: NodeId, fragment: Fragment) -> Option<NodeId> {
        let id = self.insert(parent, fragment, Placement::Prepend)?;
        self.notify(parent, 1, 0);
        Some(id)
    }

    pub fn insert_after(&mut self, sibling: NodeId, fragment: Fragment) -> Option<NodeId> {
        let parent = self.tree.get(sibling)?.parent()?.id();
        let id = self.insert(sibling, fragment, Placement::After)?;
        self.notify(parent, 1, 0);
        Some(id)
    }

    /// Replaces all children of `node`, like assigning `innerHTML`.
    pub fn replace_children(&mut self, node: NodeId, fragments: Vec<Fragment>) {
        let Some(existing) = self
            .tree
            .get(node)
            .map(|n| n.children().map(|c| c.id()).collect::<Vec<_>>())
        else {
            return;
        };
        for child in &existing {
            if let Some(mut child) = self.tree.get_mut(*child) {
                child.detach();
            }
        }
        let mut added = 0;
        for fragment in fragments {
            if self.insert(node, fragment, Placement::Append).is_some() {
                added += 1;
            }
        }
        self.notify(node, added, existing.len());
    }

    pub fn set_text(&mut self, node: NodeId, text: &str) {
        self.replace_children(node, vec![Fragment::text(text)]);
    }

    /// Rewrites the text of `node` in place when its only child is a text
    /// node; otherwise behaves like [`Document::set_text`]. An in-place edit
    /// is a character-data change and is not reported to the observer.
    pub fn update_text(&mut self, node: NodeId, text: &str) {
        let sole_text = self.tree.get(node).and_then(|n| {
            let mut children = n.children();
            match (children.next(), children.next()) {
                (Some(child), None) if matches!(child.value(), Node::Text(_)) => Some(child.id()),
                _ => None,
            }
        });
        if let Some(child) = sole_text {
            if let Some(mut child) = self.tree.get_mut(child) {
                *child.value() = Node::Text(text.to_string());
                return;
            }
        }
        self.set_text(node, text);
    }

    /// Detaches `node` from its parent. Removed nodes stay addressable but
    /// are no longer connected.
    pub fn remove(&mut self, node: NodeId) {
        let Some(parent) = self.tree.get(node).and_then(|n| n.parent()).map(|p| p.id()) else {
            return;
        };
        if let Some(mut node) = self.tree.get_mut(node) {
            node.detach();
        }
        self.notify(parent, 0, 1);
    }

    /// Host-side rendering: parses `markup` and appends the result to `parent`.
    pub fn append_html(&mut self, parent: NodeId, markup: &str) -> Vec<NodeId> {
        let parsed = Html::parse_fragment(markup);
        let container = parsed.root_element();
        let mut added = Vec::new();
        for child in container.children() {
            if let Some(id) = self.import(parent, child) {
                added.push(id);
            }
        }
        if !added.is_empty() {
            self.notify(parent, added.len(), 0);
        }
        added
    }

    fn insert(&mut self, anchor: NodeId, fragment: Fragment, at: Placement) -> Option<NodeId> {
        let Fragment { node, children } = fragment;
        let id = {
            let mut anchor = self.tree.get_mut(anchor)?;
            match at {
                Placement::Append => anchor.append(node).id(),
                Placement::Prepend => anchor.prepend(node).id(),
                Placement::After => {
                    anchor.parent()?;
                    anchor.insert_after(node).id()
                }
            }
        };
        for child in children {
            self.insert(id, child, Placement::Append);
        }
        Some(id)
    }

    fn import(&mut self, parent: NodeId, source: NodeRef<'_, scraper::Node>) -> Option<NodeId> {
        let node = match source.value() {
            scraper::Node::Element(element) => Node::Element(ElementData::from_scraper(element)),
            scraper::Node::Text(text) => {
                let text: &str = text;
                Node::Text(text.to_string())
            }
            scraper::Node::Document | scraper::Node::Fragment => {
                for child in source.children() {
                    self.import(parent, child);
                }
                return None;
            }
            // comments, doctype and processing instructions carry nothing we query
            _ => return None,
        };
        let id = self.tree.get_mut(parent)?.append(node).id();
        for child in source.children() {
            self.import(id, child);
        }
        Some(id)
    }

    fn notify(&mut self, target: NodeId, added: usize, removed: usize) {
        if added == 0 && removed == 0 {
            return;
        }
        let Some(tx) = &self.observer else {
            return;
        };
        let record = MutationRecord {
            target,
            added,
            removed,
        };
        if tx.send(record).is_err() {
            self.observer = None;
        }
    }
}
