//! Retained element tree
//!
//! A small document model the view controller mutates and the terminal
//! painter draws. Elements are shared `Rc<RefCell<_>>` nodes so a cached
//! handle stays valid while the tree changes around it.

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::rc::Rc;

pub type ElementRef = Rc<RefCell<Element>>;

/// One node of the document
#[derive(Debug, Default)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: BTreeSet<String>,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    pub visible: bool,
    pub disabled: bool,
    pub value: String,
    /// Set when the element was last asked to scroll to its end.
    pub scrolled_to_end: bool,
    pub children: Vec<ElementRef>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            visible: true,
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn into_ref(self) -> ElementRef {
        Rc::new(RefCell::new(self))
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.remove(class);
    }

    pub fn toggle_class(&mut self, class: &str, on: bool) {
        if on {
            self.add_class(class);
        } else {
            self.remove_class(class);
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_string(), value.to_string());
    }

    pub fn append(&mut self, child: ElementRef) {
        self.children.push(child);
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }
}

/// The page: a root element plus an id index
pub struct Document {
    root: ElementRef,
    ids: RefCell<HashMap<String, ElementRef>>,
}

impl Document {
    pub fn new(root: ElementRef) -> Self {
        let doc = Self {
            root,
            ids: RefCell::new(HashMap::new()),
        };
        doc.reindex();
        doc
    }

    /// The kiosk page layout
    pub fn kiosk() -> Self {
        let recording = Element::new("div")
            .with_id("recordingIndicator")
            .with_class("recording-indicator")
            .with_text("Recording...")
            .hidden()
            .into_ref();

        let dropdown = Element::new("select")
            .with_id("personalityDropdown")
            .with_class("personality-dropdown")
            .into_ref();
        dropdown.borrow_mut().append(
            Element::new("option")
                .with_attr("value", "")
                .with_text("Loading personalities...")
                .into_ref(),
        );

        let mut confirm = Element::new("button")
            .with_id("confirmPersonalityBtn")
            .with_class("confirm-btn")
            .with_text("Start Your Beer Journey");
        confirm.disabled = true;

        let overlay = Element::new("div")
            .with_id("personalityOverlay")
            .with_class("personality-overlay")
            .into_ref();
        {
            let mut overlay = overlay.borrow_mut();
            overlay.append(Element::new("h2").with_text("Select Terry's Personality").into_ref());
            overlay.append(dropdown);
            overlay.append(confirm.into_ref());
        }

        let connection = Element::new("div")
            .with_id("connectionIndicator")
            .with_class("connection-indicator")
            .with_class("disconnected")
            .into_ref();
        {
            let mut connection = connection.borrow_mut();
            connection.append(
                Element::new("span")
                    .with_id("connectionDot")
                    .with_class("connection-dot")
                    .into_ref(),
            );
            connection.append(
                Element::new("span")
                    .with_id("connectionText")
                    .with_text("Disconnected")
                    .into_ref(),
            );
        }

        let header = Element::new("div").with_class("header").into_ref();
        {
            let mut header = header.borrow_mut();
            header.append(Element::new("h1").with_text("TERRY THE TUBE").into_ref());
            header.append(connection);
        }

        let status = Element::new("div")
            .with_id("status")
            .with_class("status")
            .with_attr("icon", "beer")
            .with_text("Ready to serve beer!")
            .into_ref();

        let chat = Element::new("div").with_class("chat-container").into_ref();
        {
            let mut chat = chat.borrow_mut();
            chat.append(
                Element::new("p")
                    .with_id("personalityDisplay")
                    .with_text("Your AI Bartender")
                    .into_ref(),
            );
            chat.append(
                Element::new("div")
                    .with_id("messages")
                    .with_class("messages")
                    .into_ref(),
            );
            chat.append(
                Element::new("div")
                    .with_id("responseLoading")
                    .with_class("loading")
                    .with_text("Terry is thinking...")
                    .into_ref(),
            );
            chat.append(
                Element::new("div")
                    .with_id("ttsLoading")
                    .with_class("loading")
                    .with_text("Terry is finding his voice...")
                    .into_ref(),
            );
        }

        let text_chat = Element::new("div")
            .with_id("textChatContainer")
            .with_class("text-chat")
            .hidden()
            .into_ref();
        {
            let mut text_chat = text_chat.borrow_mut();
            text_chat.append(
                Element::new("input")
                    .with_id("textChatInput")
                    .with_attr("placeholder", "Type a message...")
                    .into_ref(),
            );
            text_chat.append(
                Element::new("button")
                    .with_id("textChatSendBtn")
                    .with_text("Send")
                    .into_ref(),
            );
        }

        let controls = Element::new("div").with_class("controls").into_ref();
        controls.borrow_mut().append(
            Element::new("button")
                .with_id("talkButton")
                .with_class("talk-button")
                .with_text("Hold to Talk")
                .into_ref(),
        );

        let body = Element::new("body").into_ref();
        {
            let mut body = body.borrow_mut();
            body.append(recording);
            body.append(overlay);
            body.append(header);
            body.append(status);
            body.append(chat);
            body.append(text_chat);
            body.append(controls);
        }

        Self::new(body)
    }

    pub fn body(&self) -> ElementRef {
        self.root.clone()
    }

    pub fn element_by_id(&self, id: &str) -> Option<ElementRef> {
        self.ids.borrow().get(id).cloned()
    }

    /// Attach `child` under `parent`, indexing any ids it carries
    pub fn append_child(&self, parent: &ElementRef, child: ElementRef) {
        self.index(&child);
        parent.borrow_mut().append(child);
    }

    /// First element, depth first, whose attribute `name` equals `value`
    pub fn find_by_attr(&self, name: &str, value: &str) -> Option<ElementRef> {
        find(&self.root, &|el| el.attr(name) == Some(value))
    }

    /// First element, depth first, carrying `class`
    pub fn find_by_class(&self, class: &str) -> Option<ElementRef> {
        find(&self.root, &|el| el.has_class(class))
    }

    /// Detach `target` from wherever it sits in the tree
    pub fn remove(&self, target: &ElementRef) -> bool {
        let removed = remove_from(&self.root, target);
        if removed {
            if let Some(id) = target.borrow().id.clone() {
                self.ids.borrow_mut().remove(&id);
            }
        }
        removed
    }

    fn reindex(&self) {
        self.ids.borrow_mut().clear();
        self.index(&self.root);
    }

    fn index(&self, element: &ElementRef) {
        let el = element.borrow();
        if let Some(id) = &el.id {
            self.ids.borrow_mut().insert(id.clone(), element.clone());
        }
        for child in &el.children {
            self.index(child);
        }
    }
}

fn find(node: &ElementRef, pred: &dyn Fn(&Element) -> bool) -> Option<ElementRef> {
    if pred(&node.borrow()) {
        return Some(node.clone());
    }
    node.borrow()
        .children
        .iter()
        .find_map(|child| find(child, pred))
}

fn remove_from(node: &ElementRef, target: &ElementRef) -> bool {
    let mut el = node.borrow_mut();
    if let Some(pos) = el.children.iter().position(|c| Rc::ptr_eq(c, target)) {
        el.children.remove(pos);
        return true;
    }
    el.children.iter().any(|child| remove_from(child, target))
}
