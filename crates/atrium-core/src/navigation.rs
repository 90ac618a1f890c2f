//! Back-office navigation and its permission filter.
//!
//! The navigation is a list of sections, each a list of [`NavigationItem`]s that
//! may nest children. Items optionally name the permission that gates them.
//! Two read-only operations are derived from that declaration:
//!
//! - [`find_required_permission`]: which permission gates a given path
//! - [`filter_navigation`]: the part of the tree a permission set may see

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Sections of items, rendered with a separator between each section.
pub type NavigationTree = Vec<Vec<NavigationItem>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationKind {
    #[default]
    Link,
    /// Non-clickable section heading.
    Label,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationItem {
    pub label: String,
    #[serde(rename = "type", default)]
    pub kind: NavigationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default_open: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NavigationItem>,
}

impl NavigationItem {
    fn new(label: impl Into<String>, kind: NavigationKind) -> Self {
        Self {
            label: label.into(),
            kind,
            icon: None,
            to: None,
            permission: None,
            badge: None,
            default_open: false,
            children: Vec::new(),
        }
    }

    pub fn link(label: impl Into<String>, to: impl Into<String>) -> Self {
        let mut item = Self::new(label, NavigationKind::Link);
        item.to = Some(to.into());
        item
    }

    /// A collapsible entry without its own link.
    pub fn group(label: impl Into<String>) -> Self {
        Self::new(label, NavigationKind::Link)
    }

    pub fn heading(label: impl Into<String>) -> Self {
        Self::new(label, NavigationKind::Label)
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn requires(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn with_badge(mut self, badge: impl Into<String>) -> Self {
        self.badge = Some(badge.into());
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = NavigationItem>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn open_by_default(mut self) -> Self {
        self.default_open = true;
        self
    }

    fn is_heading(&self) -> bool {
        self.kind == NavigationKind::Label
    }
}

/// Returns the permission gating `path`, searching depth-first in declaration
/// order. The first node whose `to` equals `path` decides; a node without its
/// own permission inherits the nearest ancestor's. `None` means the path is not
/// gated by the navigation.
pub fn find_required_permission<'a>(tree: &'a [Vec<NavigationItem>], path: &str) -> Option<&'a str> {
    tree.iter()
        .flatten()
        .find_map(|item| search(item, path, None))
        .flatten()
}

fn search<'a>(
    item: &'a NavigationItem,
    path: &str,
    inherited: Option<&'a str>,
) -> Option<Option<&'a str>> {
    let effective = item.permission.as_deref().or(inherited);

    if item.to.as_deref() == Some(path) {
        return Some(effective);
    }

    item.children
        .iter()
        .find_map(|child| search(child, path, effective))
}

/// Keeps what `permissions` may see.
///
/// An item stays when it names no permission or a held one. Children are
/// filtered the same way; a group without a link whose children were all
/// removed is removed too. Headings stay only while a visible item follows them
/// in their section, and empty sections are dropped.
pub fn filter_navigation(
    tree: &[Vec<NavigationItem>],
    permissions: &BTreeSet<String>,
) -> NavigationTree {
    tree.iter()
        .map(|section| filter_section(section, permissions))
        .filter(|section| section.iter().any(|item| !item.is_heading()))
        .collect()
}

fn filter_section(section: &[NavigationItem], permissions: &BTreeSet<String>) -> Vec<NavigationItem> {
    let visible: Vec<NavigationItem> = section
        .iter()
        .filter_map(|item| filter_item(item, permissions))
        .collect();

    visible
        .iter()
        .enumerate()
        .filter(|(idx, item)| {
            !item.is_heading()
                || visible[idx + 1..]
                    .iter()
                    .take_while(|next| !next.is_heading())
                    .next()
                    .is_some()
        })
        .map(|(_, item)| item.clone())
        .collect()
}

fn filter_item(item: &NavigationItem, permissions: &BTreeSet<String>) -> Option<NavigationItem> {
    if let Some(required) = &item.permission {
        if !permissions.contains(required) {
            return None;
        }
    }

    let children: Vec<NavigationItem> = item
        .children
        .iter()
        .filter_map(|child| filter_item(child, permissions))
        .collect();

    if item.to.is_none() && !item.children.is_empty() && children.is_empty() {
        return None;
    }

    Some(NavigationItem {
        children,
        ..item.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn perms(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn sample_tree() -> NavigationTree {
        vec![
            vec![NavigationItem::link("Dashboard", "/admin").requires("dashboard:read")],
            vec![
                NavigationItem::heading("Content"),
                NavigationItem::group("Content Management").with_children([
                    NavigationItem::link("Pages", "/admin/pages").requires("pages:read"),
                    NavigationItem::link("Blog", "/admin/blog").requires("blog:read"),
                ]),
            ],
            vec![
                NavigationItem::group("Components")
                    .requires("components:read")
                    .with_children([
                        NavigationItem::link("All Components", "/admin/components"),
                        NavigationItem::link("Builder", "/admin/components/builder"),
                    ]),
            ],
            vec![NavigationItem::link("Help", "/admin/help")],
        ]
    }

    #[test]
    fn test_find_required_permission_nested_child() {
        let tree = sample_tree();
        assert_eq!(
            find_required_permission(&tree, "/admin/blog"),
            Some("blog:read")
        );
    }

    #[test]
    fn test_find_required_permission_unmapped_path() {
        let tree = sample_tree();
        assert_eq!(find_required_permission(&tree, "/admin/unmapped"), None);
    }

    #[test]
    fn test_find_required_permission_top_level() {
        let tree = sample_tree();
        assert_eq!(
            find_required_permission(&tree, "/admin"),
            Some("dashboard:read")
        );
    }

    #[test]
    fn test_find_required_permission_inherits_from_group() {
        let tree = sample_tree();
        assert_eq!(
            find_required_permission(&tree, "/admin/components/builder"),
            Some("components:read")
        );
    }

    #[test]
    fn test_find_required_permission_ungated_link() {
        let tree = sample_tree();
        assert_eq!(find_required_permission(&tree, "/admin/help"), None);
    }

    #[test]
    fn test_find_required_permission_first_match_wins() {
        let tree = vec![
            vec![NavigationItem::link("Blog", "/admin/blog").requires("blog:read")],
            vec![NavigationItem::link("Blog again", "/admin/blog").requires("blog:write")],
        ];
        assert_eq!(
            find_required_permission(&tree, "/admin/blog"),
            Some("blog:read")
        );
    }

    #[test]
    fn test_filter_keeps_only_permitted_children() {
        let tree = sample_tree();
        let filtered = filter_navigation(&tree, &perms(&["blog:read"]));

        assert_eq!(filtered.len(), 2);
        let content = &filtered[0];
        assert_eq!(content[0].label, "Content");
        let children: Vec<_> = content[1].children.iter().map(|c| c.to.as_deref()).collect();
        assert_eq!(children, vec![Some("/admin/blog")]);
        assert_eq!(filtered[1][0].label, "Help");
    }

    #[test]
    fn test_filter_drops_empty_group_and_heading() {
        let tree = sample_tree();
        let filtered = filter_navigation(&tree, &perms(&["dashboard:read"]));

        let labels: Vec<_> = filtered
            .iter()
            .flatten()
            .map(|item| item.label.as_str())
            .collect();
        assert_eq!(labels, vec!["Dashboard", "Help"]);
    }

    #[test]
    fn test_filter_gated_group_hides_ungated_children() {
        let tree = sample_tree();
        let without = filter_navigation(&tree, &perms(&[]));
        assert!(
            without
                .iter()
                .flatten()
                .all(|item| item.label != "Components")
        );

        let with = filter_navigation(&tree, &perms(&["components:read"]));
        let components = with
            .iter()
            .flatten()
            .find(|item| item.label == "Components")
            .unwrap();
        assert_eq!(components.children.len(), 2);
    }

    #[test]
    fn test_filter_with_no_permissions_keeps_ungated_items() {
        let tree = sample_tree();
        let filtered = filter_navigation(&tree, &BTreeSet::new());
        assert_eq!(filtered, vec![vec![NavigationItem::link("Help", "/admin/help")]]);
    }

    #[test]
    fn test_serializes_kind_as_type() {
        let heading = serde_json::to_value(NavigationItem::heading("Content")).unwrap();
        assert_eq!(heading["type"], "label");
        assert!(heading.get("children").is_none());

        let link = serde_json::to_value(
            NavigationItem::link("Blog", "/admin/blog")
                .with_icon("i-lucide-newspaper")
                .open_by_default(),
        )
        .unwrap();
        assert_eq!(link["type"], "link");
        assert_eq!(link["to"], "/admin/blog");
        assert_eq!(link["defaultOpen"], true);
    }
}
