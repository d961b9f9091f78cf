//! Relay-style connections.

use serde::{Deserialize, Serialize};

/// A paginated list as returned by connection fields.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    /// The page's edges in server order.
    pub edges: Vec<Edge<T>>,
    /// Cursor state for the page.
    pub page_info: PageInfo,
}

/// One node of a [`Connection`] with its cursor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge<T> {
    /// Opaque position of this node.
    pub cursor: String,
    /// The node.
    pub node: T,
}

/// Page boundaries of a [`Connection`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    /// Whether a page follows.
    pub has_next_page: bool,
    /// Whether a page precedes.
    pub has_previous_page: bool,
    /// Cursor of the first edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_cursor: Option<String>,
    /// Cursor of the last edge.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_cursor: Option<String>,
}

/// Flattens a connection into its nodes, preserving order.
///
/// # Example
///
/// ```rust
/// use serde_json::json;
/// use shopify_runtime::clients::graphql::{nodes_from_connection, Connection};
///
/// let connection: Connection<u32> = serde_json::from_value(json!({
///     "edges": [{"cursor": "a", "node": 1}, {"cursor": "b", "node": 2}],
///     "pageInfo": {"hasNextPage": false, "hasPreviousPage": false}
/// }))
/// .unwrap();
///
/// assert_eq!(nodes_from_connection(connection), vec![1, 2]);
/// ```
#[must_use]
pub fn nodes_from_connection<T>(connection: Connection<T>) -> Vec<T> {
    connection.edges.into_iter().map(|edge| edge.node).collect()
}

impl<T> Connection<T> {
    /// Returns the cursor to request the next page with, if there is one.
    #[must_use]
    pub fn next_cursor(&self) -> Option<&str> {
        if !self.page_info.has_next_page {
            return None;
        }
        self.page_info
            .end_cursor
            .as_deref()
            .or_else(|| self.edges.last().map(|edge| edge.cursor.as_str()))
    }
}
