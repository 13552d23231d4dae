//! Nested relation lists of one entity ("owned by", "owns", ...).

use serde::Serialize;
use std::collections::HashSet;
use std::fmt::Write as _;

use crate::error::{KekError, Result};
use crate::kek::{KekObject, ObjectSource};

/// Relation lists shown below an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    /// Complementary partners among the owners
    Partners,
    /// Complementary partners among the holdings
    Partners2,
    OwnedBy,
    OperatedBy,
    Owns,
    Operates,
}

/// How a relation type is read from the raw record
#[derive(Debug, Clone, Copy)]
pub struct RelationDescriptor {
    pub title: &'static str,
    pub array_name: &'static str,
    pub relation_name: &'static str,
    /// Required value of `complementaryPartner`; `None` keeps all entries.
    pub complementary_partner: Option<bool>,
}

impl RelationType {
    pub const ALL: [RelationType; 6] = [
        RelationType::Partners,
        RelationType::Partners2,
        RelationType::OwnedBy,
        RelationType::OperatedBy,
        RelationType::Owns,
        RelationType::Operates,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            RelationType::Partners => "partners",
            RelationType::Partners2 => "partners2",
            RelationType::OwnedBy => "owned_by",
            RelationType::OperatedBy => "operated_by",
            RelationType::Owns => "owns",
            RelationType::Operates => "operates",
        }
    }

    pub fn parse(key: &str) -> Result<Self> {
        RelationType::ALL
            .iter()
            .copied()
            .find(|t| t.key() == key)
            .ok_or_else(|| KekError::InvalidInput(format!("unknown relation type '{}'", key)))
    }

    pub fn descriptor(&self) -> RelationDescriptor {
        let (title, array_name, relation_name, complementary_partner) = match self {
            RelationType::Partners => ("complementary partners", "ownedBy", "holder", Some(true)),
            RelationType::Partners2 => ("complementary partners", "owns", "held", Some(true)),
            RelationType::OwnedBy => ("owned by", "ownedBy", "holder", Some(false)),
            RelationType::OperatedBy => ("operated by", "operatedBy", "holder", None),
            RelationType::Owns => ("owns", "owns", "held", Some(false)),
            RelationType::Operates => ("operates", "operates", "held", None),
        };
        RelationDescriptor {
            title,
            array_name,
            relation_name,
            complementary_partner,
        }
    }
}

/// One related entity, with its own relations when more levels were asked for
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationEntry {
    pub squuid: String,
    pub name: String,
    pub shares: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<RelationEntry>>,
    /// Set when the entity was already listed further up; its relations are
    /// then not repeated by [`RelationTree::render`].
    pub listed_before: bool,
}

/// Relations of `object` of one type, `level` levels deep.
///
/// Deeper levels look the related entities up in `source`; entities it does
/// not know end the branch. `None` when there is nothing to list.
pub fn object_relations(
    source: &dyn ObjectSource,
    object: &KekObject,
    relation_type: RelationType,
    level: usize,
) -> Result<Option<Vec<RelationEntry>>> {
    let descriptor = relation_type.descriptor();

    let mut entries = Vec::new();
    for rel in object.relations(descriptor.array_name, descriptor.relation_name) {
        if let Some(required) = descriptor.complementary_partner {
            if rel.complementary_partner != required {
                continue;
            }
        }

        let relations = if level > 1 {
            match source.object(&rel.squuid)? {
                Some(related) => object_relations(source, &related, relation_type, level - 1)?,
                None => None,
            }
        } else {
            None
        };

        entries.push(RelationEntry {
            squuid: rel.squuid,
            name: rel.name,
            shares: rel.shares,
            relations,
            listed_before: false,
        });
    }

    if entries.is_empty() {
        return Ok(None);
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries.sort_by(|a, b| match (a.shares, b.shares) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    Ok(Some(entries))
}

/// Titled relation listing, ready to serve or print
#[derive(Debug, Clone, Serialize)]
pub struct RelationTree {
    pub relation_type: RelationType,
    pub title: &'static str,
    pub level: usize,
    pub entries: Vec<RelationEntry>,
}

impl RelationTree {
    /// Build the tree; `None` when the entity has no such relations.
    pub fn build(
        source: &dyn ObjectSource,
        object: &KekObject,
        relation_type: RelationType,
        level: usize,
    ) -> Result<Option<Self>> {
        let level = level.max(1);
        let Some(mut entries) = object_relations(source, object, relation_type, level)? else {
            return Ok(None);
        };
        let mut listed = HashSet::new();
        mark_listed(&mut entries, &mut listed);

        Ok(Some(Self {
            relation_type,
            title: relation_type.descriptor().title,
            level,
            entries,
        }))
    }

    /// Nested bullet list; shares are printed as `"<shares>% "`.
    pub fn render(&self) -> String {
        let mut out = format!("{}:\n", self.title);
        render_entries(&self.entries, 1, &mut out);
        out
    }
}

fn mark_listed(entries: &mut [RelationEntry], listed: &mut HashSet<String>) {
    for entry in entries {
        entry.listed_before = listed.contains(&entry.squuid);
        if !entry.listed_before {
            if let Some(relations) = entry.relations.as_mut() {
                mark_listed(relations, listed);
            }
        }
        listed.insert(entry.squuid.clone());
    }
}

fn render_entries(entries: &[RelationEntry], depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth - 1);
    for entry in entries {
        let _ = write!(out, "{}- ", indent);
        if let Some(shares) = entry.shares {
            let _ = write!(out, "{}% ", shares);
        }
        let _ = writeln!(out, "{}", entry.name);

        if let Some(relations) = &entry.relations {
            if entry.listed_before {
                let _ = writeln!(out, "{}  - ...", indent);
            } else {
                render_entries(relations, depth + 1, out);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kek::{sample_kek, Kek};
    use serde_json::json;

    fn partners_kek() -> Kek {
        let obj = |v: serde_json::Value| KekObject::new(v).unwrap();
        Kek::from_objects(
            Vec::new(),
            vec![
                obj(json!({
                    "squuid": "h-kg", "name": "Kommandit KG",
                    "ownedBy": [
                        {"holder": {"squuid": "h-gmbh", "name": "Verwaltungs GmbH"}, "complementaryPartner": true},
                        {"holder": {"squuid": "h-a", "name": "Anna"}, "capitalShares": 50.0},
                        {"holder": {"squuid": "h-b", "name": "Bert"}, "capitalShares": 50.0},
                        {"holder": {"squuid": "h-c", "name": "Carla"}}
                    ]
                })),
                obj(json!({"squuid": "h-gmbh", "name": "Verwaltungs GmbH"})),
            ],
        )
    }

    #[test]
    fn test_relation_type_keys() {
        for t in RelationType::ALL {
            assert_eq!(RelationType::parse(t.key()).unwrap(), t);
        }
        assert!(RelationType::parse("friends").is_err());
        assert_eq!(RelationType::OwnedBy.descriptor().array_name, "ownedBy");
    }

    #[test]
    fn test_complementary_partner_filter() {
        let kek = partners_kek();
        let kg = kek.get("h-kg").unwrap();

        let partners = object_relations(&kek, kg, RelationType::Partners, 1).unwrap().unwrap();
        assert_eq!(partners.len(), 1);
        assert_eq!(partners[0].name, "Verwaltungs GmbH");

        let owners = object_relations(&kek, kg, RelationType::OwnedBy, 1).unwrap().unwrap();
        let names: Vec<_> = owners.iter().map(|e| e.name.as_str()).collect();
        // equal shares keep name order, missing shares last
        assert_eq!(names, vec!["Anna", "Bert", "Carla"]);
        assert_eq!(owners[2].shares, None);

        assert!(object_relations(&kek, kg, RelationType::Operates, 1).unwrap().is_none());
    }

    #[test]
    fn test_levels_follow_relations() {
        let kek = sample_kek();
        let verlag = kek.get("h-verlag").unwrap();

        let flat = object_relations(&kek, verlag, RelationType::OwnedBy, 1).unwrap().unwrap();
        assert_eq!(flat.len(), 1);
        assert!(flat[0].relations.is_none());

        let deep = object_relations(&kek, verlag, RelationType::OwnedBy, 2).unwrap().unwrap();
        let hold = &deep[0];
        assert_eq!(hold.squuid, "h-hold");
        let above: Vec<_> = hold
            .relations
            .as_ref()
            .unwrap()
            .iter()
            .map(|e| (e.name.as_str(), e.shares))
            .collect();
        assert_eq!(above, vec![("Familie", Some(60.0)), ("Bank", Some(40.0))]);
    }

    #[test]
    fn test_render_marks_repeated_entities() {
        let kek = sample_kek();
        let hold = kek.get("h-hold").unwrap();
        let tree = RelationTree::build(&kek, hold, RelationType::Owns, 3).unwrap().unwrap();
        assert_eq!(tree.title, "owns");
        assert_eq!(
            tree.render(),
            "owns:\n- 100% Radio GmbH\n- 50% Verlag\n"
        );

        let mut tree = tree;
        let first = tree.entries[0].clone();
        tree.entries.push(first);
        tree.entries[0].relations = Some(vec![tree.entries[1].clone()]);
        tree.entries[2].relations = Some(Vec::new());
        let mut listed = HashSet::new();
        mark_listed(&mut tree.entries, &mut listed);
        assert!(tree.entries[2].listed_before);
        assert!(tree.render().ends_with("- 100% Radio GmbH\n  - ...\n"));
    }
}
