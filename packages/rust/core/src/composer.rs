//! Channel tree composition.
//!
//! Assembled collections arrive in index order, not dependency order: a
//! curricular unit may be composed before or after the lessons it
//! schedules. The composer keeps a `built` map of finished subtrees and a
//! placeholder protocol so both orders converge on the same final tree.

use std::collections::BTreeMap;

use tracing::warn;

use currichef_shared::{ChannelTree, CollectionType, ContentNode};

use crate::context::CrossRefContext;

/// Composes assembled collection subtrees into the channel tree.
pub struct TreeComposer {
    channel: ChannelTree,
    /// Resource URL → finished subtree, for placeholder backfill.
    built: BTreeMap<String, ContentNode>,
}

impl TreeComposer {
    pub fn new(channel: ChannelTree) -> Self {
        Self {
            channel,
            built: BTreeMap::new(),
        }
    }

    /// File a collection subtree under channel → subject area → type.
    ///
    /// Curricular units additionally get one child per scheduled resource:
    /// the finished subtree when it is already built, a placeholder
    /// otherwise. Non-units backfill any placeholder already standing for
    /// them inside previously inserted units.
    pub fn insert(
        &mut self,
        mut node: ContentNode,
        collection: CollectionType,
        subject_areas: &[String],
        ctx: &CrossRefContext,
    ) {
        let url = node.source_id.clone();

        if collection == CollectionType::CurricularUnit {
            for child_url in ctx.scheduled_children(&url) {
                let child = self
                    .built
                    .get(child_url)
                    .cloned()
                    .unwrap_or_else(|| ContentNode::placeholder(child_url));
                node.children.push(child);
            }
        } else {
            for root in &mut self.channel.children {
                replace_placeholders(root, &url, &node);
            }
        }

        self.built.insert(url, node.clone());

        let general = [DEFAULT_SUBJECT.to_string()];
        let subjects: &[String] = if subject_areas.is_empty() {
            &general
        } else {
            subject_areas
        };
        for subject in subjects {
            let subject_topic = self.subject_topic(subject);
            let type_topic = child_topic(
                subject_topic,
                &format!("{subject}/{}", collection.as_str()),
                collection.as_str(),
            );
            type_topic.children.push(node.clone());
        }
    }

    /// Final pass: remaining placeholders are swapped for their built
    /// subtree, or dropped with a warning when the resource never got
    /// assembled.
    pub fn resolve(mut self) -> ChannelTree {
        for root in &mut self.channel.children {
            resolve_node(root, &self.built);
        }
        self.channel
    }

    fn subject_topic(&mut self, subject: &str) -> &mut ContentNode {
        child_topic(&mut self.channel, subject, subject)
    }
}

/// Subject fallback when the page lists no subject areas.
pub const DEFAULT_SUBJECT: &str = "General";

trait TopicParent {
    fn children_mut(&mut self) -> &mut Vec<ContentNode>;
}

impl TopicParent for ChannelTree {
    fn children_mut(&mut self) -> &mut Vec<ContentNode> {
        &mut self.children
    }
}

impl TopicParent for ContentNode {
    fn children_mut(&mut self) -> &mut Vec<ContentNode> {
        &mut self.children
    }
}

/// Find or create a topic child by source id.
fn child_topic<'a, P: TopicParent>(
    parent: &'a mut P,
    source_id: &str,
    title: &str,
) -> &'a mut ContentNode {
    let children = parent.children_mut();
    if let Some(idx) = children.iter().position(|c| c.source_id == source_id) {
        return &mut children[idx];
    }
    children.push(ContentNode::topic(source_id, title));
    children.last_mut().expect("just pushed")
}

fn replace_placeholders(node: &mut ContentNode, url: &str, replacement: &ContentNode) {
    for child in &mut node.children {
        if child.placeholder && child.source_id == url {
            *child = replacement.clone();
        } else {
            replace_placeholders(child, url, replacement);
        }
    }
}

fn resolve_node(node: &mut ContentNode, built: &BTreeMap<String, ContentNode>) {
    node.children.retain_mut(|child| {
        if child.placeholder {
            match built.get(&child.source_id) {
                Some(subtree) => {
                    *child = subtree.clone();
                    true
                }
                None => {
                    warn!(url = %child.source_id, "dropping unresolved cross-reference");
                    false
                }
            }
        } else {
            resolve_node(child, built);
            true
        }
    });
}
