use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::{BTreeSet, HashMap};

use super::category::{Category, CategoryId, CategoryStatus};

/// A category together with its descendants expanded to some depth.
///
/// At the depth limit `expanded` is `None` and `children` serializes as the
/// raw list of ids, otherwise it serializes as nested records.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryNode {
    pub category: Category,
    pub expanded: Option<Vec<CategoryNode>>,
}

impl CategoryNode {
    pub fn leaf(category: Category) -> Self {
        Self {
            category,
            expanded: None,
        }
    }

    pub fn id(&self) -> CategoryId {
        self.category.id
    }

    /// Expanded children, empty when this node sits at the depth limit.
    pub fn child_nodes(&self) -> &[CategoryNode] {
        self.expanded.as_deref().unwrap_or(&[])
    }

    /// Number of levels below this node that carry full records.
    pub fn depth(&self) -> usize {
        match &self.expanded {
            None => 0,
            Some(children) => 1 + children.iter().map(CategoryNode::depth).max().unwrap_or(0),
        }
    }
}

/// Expand `level` into nodes with `depth` levels of inline children.
///
/// `load` fetches full records for a set of ids; it is called once per level.
/// Ids listed in a `children` set but missing from the store are dropped from
/// the expansion.
pub fn build_forest<F>(
    level: Vec<Category>,
    depth: usize,
    load: &mut F,
) -> Result<Vec<CategoryNode>, crate::DomainError>
where
    F: FnMut(&[CategoryId]) -> Result<Vec<Category>, crate::DomainError>,
{
    if depth == 0 {
        return Ok(level.into_iter().map(CategoryNode::leaf).collect());
    }

    let wanted: Vec<CategoryId> = level
        .iter()
        .flat_map(|c| c.children.iter().copied())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let below = if wanted.is_empty() {
        Vec::new()
    } else {
        build_forest(load(&wanted)?, depth - 1, load)?
    };
    let by_id: HashMap<CategoryId, CategoryNode> =
        below.into_iter().map(|node| (node.id(), node)).collect();

    Ok(level
        .into_iter()
        .map(|category| {
            let children = category
                .children
                .iter()
                .filter_map(|id| by_id.get(id).cloned())
                .collect();
            CategoryNode {
                category,
                expanded: Some(children),
            }
        })
        .collect())
}

#[derive(Serialize)]
#[serde(untagged)]
enum ChildrenView<'a> {
    Ids(&'a [CategoryId]),
    Nodes(&'a [CategoryNode]),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NodeView<'a> {
    id: &'a CategoryId,
    parent_id: &'a Option<CategoryId>,
    name: &'a str,
    description: &'a str,
    status: CategoryStatus,
    stock_availability: bool,
    children: ChildrenView<'a>,
    created_at: &'a DateTime<Utc>,
    updated_at: &'a DateTime<Utc>,
}

impl Serialize for CategoryNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let c = &self.category;
        let children = match &self.expanded {
            Some(nodes) => ChildrenView::Nodes(nodes),
            None => ChildrenView::Ids(&c.children),
        };
        NodeView {
            id: &c.id,
            parent_id: &c.parent_id,
            name: &c.name,
            description: &c.description,
            status: c.status,
            stock_availability: c.stock_availability,
            children,
            created_at: &c.created_at,
            updated_at: &c.updated_at,
        }
        .serialize(serializer)
    }
}
