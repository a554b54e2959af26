// Copyright 2025 the Reforest Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The declarative element model.
//!
//! An [`Element`] tree describes what to render. [`Component`]s are functions of a
//! [`Cx`], [`Host`] elements stand in for concrete widgets and render as markup tags, and
//! the grouping variants control how children are positioned.
//!
//! | Variant        | Position among indexed siblings |
//! |----------------|---------------------------------|
//! | `Component`    | one                             |
//! | `Host`         | one                             |
//! | `Text`, `Empty`| none, rendered in place         |
//! | `Fragment`     | its children continue the count |
//! | `Keyed`        | per [`WrapperPolicy`]           |
//! | `Indexed`      | none; carries its own positions |

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use reforest_index::{ChildSlot, Placement, Position, SlotKind, WrapperPolicy, assign_positions};

use crate::cx::Cx;
use crate::error::Error;

type RenderFn<T> = dyn Fn(&mut Cx<'_, T>) -> Result<Element<T>, Error>;

/// A node of the declarative tree.
pub enum Element<T> {
    /// A function of its [`Cx`].
    Component(Component<T>),
    /// A named markup element.
    Host(Host<T>),
    /// Literal text.
    Text(Cow<'static, str>),
    /// Renders nothing.
    Empty,
    /// Transparent grouping.
    Fragment(Vec<Element<T>>),
    /// Keyed wrapper boundary.
    Keyed {
        /// Wrapper key.
        key: Cow<'static, str>,
        /// Wrapped children.
        children: Vec<Element<T>>,
    },
    /// Children positioned by [`Cx::tree`] or [`Cx::indexed_children`].
    Indexed(Indexed<T>),
}

impl<T> Clone for Element<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Component(c) => Self::Component(c.clone()),
            Self::Host(h) => Self::Host(h.clone()),
            Self::Text(t) => Self::Text(t.clone()),
            Self::Empty => Self::Empty,
            Self::Fragment(children) => Self::Fragment(children.clone()),
            Self::Keyed { key, children } => Self::Keyed {
                key: key.clone(),
                children: children.clone(),
            },
            Self::Indexed(indexed) => Self::Indexed(indexed.clone()),
        }
    }
}

impl<T> fmt::Debug for Element<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Component(c) => c.fmt(f),
            Self::Host(h) => h.fmt(f),
            Self::Text(t) => f.debug_tuple("Text").field(t).finish(),
            Self::Empty => f.write_str("Empty"),
            Self::Fragment(children) => f.debug_tuple("Fragment").field(children).finish(),
            Self::Keyed { key, children } => f
                .debug_struct("Keyed")
                .field("key", key)
                .field("children", children)
                .finish(),
            Self::Indexed(indexed) => indexed.fmt(f),
        }
    }
}

impl<T> Element<T> {
    /// A text element.
    pub fn text(text: impl Into<Cow<'static, str>>) -> Self {
        Self::Text(text.into())
    }

    /// A fragment of `children`.
    pub fn fragment(children: impl IntoIterator<Item = Self>) -> Self {
        Self::Fragment(children.into_iter().collect())
    }

    /// A keyed wrapper around `children`.
    pub fn keyed(
        key: impl Into<Cow<'static, str>>,
        children: impl IntoIterator<Item = Self>,
    ) -> Self {
        Self::Keyed {
            key: key.into(),
            children: children.into_iter().collect(),
        }
    }

    /// True for elements that take a sibling position.
    pub fn is_addressable(&self) -> bool {
        matches!(self, Self::Component(_) | Self::Host(_))
    }
}

impl<T> From<Component<T>> for Element<T> {
    fn from(component: Component<T>) -> Self {
        Self::Component(component)
    }
}

impl<T> From<Host<T>> for Element<T> {
    fn from(host: Host<T>) -> Self {
        Self::Host(host)
    }
}

impl<T> From<&'static str> for Element<T> {
    fn from(text: &'static str) -> Self {
        Self::Text(Cow::Borrowed(text))
    }
}

impl<T> From<String> for Element<T> {
    fn from(text: String) -> Self {
        Self::Text(Cow::Owned(text))
    }
}

impl<T> ChildSlot for Element<T> {
    fn kind(&self) -> SlotKind<'_, Self> {
        match self {
            Self::Component(_) | Self::Host(_) => SlotKind::Node,
            Self::Text(_) | Self::Empty | Self::Indexed(_) => SlotKind::Skip,
            Self::Fragment(children) => SlotKind::Fragment(children),
            Self::Keyed { children, .. } => SlotKind::Wrapper(children),
        }
    }
}

/// A component: a named render function.
///
/// ```
/// use reforest::{Component, Element};
///
/// let hello: Element<()> = Component::new("Hello", |_cx| Ok(Element::text("hi"))).into();
/// assert!(hello.is_addressable());
/// ```
pub struct Component<T> {
    name: Cow<'static, str>,
    render: Rc<RenderFn<T>>,
}

impl<T> Clone for Component<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            render: self.render.clone(),
        }
    }
}

impl<T> fmt::Debug for Component<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<T> Component<T> {
    /// Create a component from its render function.
    pub fn new<F>(name: impl Into<Cow<'static, str>>, render: F) -> Self
    where
        F: Fn(&mut Cx<'_, T>) -> Result<Element<T>, Error> + 'static,
    {
        Self {
            name: name.into(),
            render: Rc::new(render),
        }
    }

    /// The component's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn render(&self, cx: &mut Cx<'_, T>) -> Result<Element<T>, Error> {
        (self.render)(cx)
    }
}

/// A markup element with attributes and children.
pub struct Host<T> {
    tag: Cow<'static, str>,
    attrs: Vec<(Cow<'static, str>, String)>,
    children: Vec<Element<T>>,
}

impl<T> Clone for Host<T> {
    fn clone(&self) -> Self {
        Self {
            tag: self.tag.clone(),
            attrs: self.attrs.clone(),
            children: self.children.clone(),
        }
    }
}

impl<T> fmt::Debug for Host<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("tag", &self.tag)
            .field("attrs", &self.attrs)
            .field("children", &self.children)
            .finish()
    }
}

impl<T> Host<T> {
    /// An element named `tag` with no attributes or children.
    pub fn new(tag: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tag: tag.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Add an attribute.
    pub fn attr(mut self, name: impl Into<Cow<'static, str>>, value: impl ToString) -> Self {
        self.attrs.push((name.into(), value.to_string()));
        self
    }

    /// Append a child.
    pub fn child(mut self, child: impl Into<Element<T>>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Append several children.
    pub fn children(mut self, children: impl IntoIterator<Item = Element<T>>) -> Self {
        self.children.extend(children);
        self
    }

    /// Tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Attributes in declared order.
    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.attrs.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// Child elements.
    pub fn child_elements(&self) -> &[Element<T>] {
        &self.children
    }
}

/// Children together with the position and boundary they were indexed under.
pub struct Indexed<T> {
    pub(crate) children: Vec<Element<T>>,
    pub(crate) base: Position,
    pub(crate) policy: WrapperPolicy,
    pub(crate) root: Option<Rc<str>>,
}

impl<T> Clone for Indexed<T> {
    fn clone(&self) -> Self {
        Self {
            children: self.children.clone(),
            base: self.base.clone(),
            policy: self.policy,
            root: self.root.clone(),
        }
    }
}

impl<T> fmt::Debug for Indexed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Indexed")
            .field("base", &self.base.path)
            .field("policy", &self.policy)
            .field("root", &self.root)
            .field("children", &self.children)
            .finish()
    }
}

impl<T> Indexed<T> {
    /// Id of the boundary these children register into, if any.
    pub fn root_id(&self) -> Option<&str> {
        self.root.as_deref()
    }

    /// The positioned children.
    pub fn children(&self) -> &[Element<T>] {
        &self.children
    }
}

/// Find the element at `path` among `children`, the way an indexed parent would number them.
///
/// Each segment selects an addressable child; the next segment continues inside that
/// child's markup children (for a [`Host`]) or inside a nested keyed wrapper. Component
/// output is not rendered here, so a path cannot descend through a component.
///
/// ```
/// use reforest::{Element, Host, find_descendant};
/// use reforest_index::WrapperPolicy;
///
/// let list: Vec<Element<()>> = vec![
///     Element::text("Fruit:"),
///     Host::new("li").child("apple").into(),
///     Host::new("li").child(Host::new("b").child("pear")).into(),
/// ];
/// let found = find_descendant(&list, &[1, 0], WrapperPolicy::Flatten).unwrap();
/// assert!(matches!(found, Element::Host(h) if h.tag() == "b"));
/// ```
pub fn find_descendant<'a, T>(
    children: &'a [Element<T>],
    path: &[usize],
    policy: WrapperPolicy,
) -> Option<&'a Element<T>> {
    let (&first, rest) = path.split_first()?;
    let placements = assign_positions(&Position::root(), children, policy);
    let placement = find_placement(&placements, first)?;
    match placement {
        Placement::Node { slot, .. } if rest.is_empty() => Some(*slot),
        Placement::Node { slot, .. } => match *slot {
            Element::Host(host) => find_descendant(&host.children, rest, policy),
            _ => None,
        },
        Placement::Wrapper { slot, .. } if rest.is_empty() => Some(*slot),
        Placement::Wrapper { slot, .. } => match *slot {
            Element::Keyed { children, .. } => find_descendant(children, rest, policy),
            _ => None,
        },
        Placement::Passthrough { .. } => None,
    }
}

fn find_placement<'p, 'a, T>(
    placements: &'p [Placement<'a, Element<T>>],
    index: usize,
) -> Option<&'p Placement<'a, Element<T>>> {
    for placement in placements {
        match placement {
            Placement::Wrapper {
                position: None,
                children,
                ..
            } => {
                if let Some(found) = find_placement(children, index) {
                    return Some(found);
                }
            }
            other => {
                if other.position().and_then(|p| p.path.last()) == Some(index) {
                    return Some(other);
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn li(text: &'static str) -> Element<()> {
        Host::new("li").child(text).into()
    }

    #[test]
    fn text_and_empty_take_no_position() {
        let children = vec![Element::text("a"), li("x"), Element::Empty, li("y")];
        let found = find_descendant(&children, &[1], WrapperPolicy::Flatten).unwrap();
        match found {
            Element::Host(host) => {
                assert!(matches!(host.child_elements()[0], Element::Text(ref t) if t == "y"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(find_descendant(&children, &[2], WrapperPolicy::Flatten).is_none());
    }

    #[test]
    fn keyed_wrappers_follow_policy() {
        let children = vec![
            li("a"),
            Element::keyed("group", [li("b"), li("c")]),
            li("d"),
        ];
        let flat = find_descendant(&children, &[3], WrapperPolicy::Flatten);
        assert!(flat.is_some(), "flattened wrapper continues the count");

        let nested = find_descendant(&children, &[1, 1], WrapperPolicy::Nest).unwrap();
        let Element::Host(host) = nested else {
            panic!("expected a host, got {nested:?}");
        };
        assert!(matches!(host.child_elements()[0], Element::Text(ref t) if t == "c"));
        assert!(matches!(
            find_descendant(&children, &[1], WrapperPolicy::Nest),
            Some(Element::Keyed { .. })
        ));
        assert!(find_descendant(&children, &[3], WrapperPolicy::Nest).is_none());
    }

    #[test]
    fn fragments_are_spliced() {
        let children = vec![Element::fragment([li("a"), li("b")]), li("c")];
        assert!(find_descendant(&children, &[2], WrapperPolicy::Nest).is_some());
        assert!(find_descendant(&children, &[], WrapperPolicy::Nest).is_none());
    }
}
