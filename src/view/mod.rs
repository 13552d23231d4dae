//! Read models behind the browser viewer: the node table, relation lists
//! and the entity detail panel.

mod object;
mod relations;
mod table;

pub use object::{FieldRow, ObjectView};
pub use relations::{object_relations, RelationDescriptor, RelationEntry, RelationTree, RelationType};
pub use table::{filter_rows, paginate, sort_rows, Column, Order, Page};
