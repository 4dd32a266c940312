use std::collections::HashMap;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Smallest bookable cell of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannableUnit {
    pub id: Ulid,
    pub header_name: String,
}

/// A physical pitch. With no units the field itself is the bookable surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: Ulid,
    pub name: String,
    #[serde(default)]
    pub units: Vec<PlannableUnit>,
}

impl Field {
    pub fn unit_ids(&self) -> impl Iterator<Item = Ulid> + '_ {
        self.units.iter().map(|u| u.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commune {
    pub id: Ulid,
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

/// What a booking target id resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target<'a> {
    Unit {
        unit: &'a PlannableUnit,
        field: &'a Field,
    },
    Field(&'a Field),
}

/// One bookable grid column, in display order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    /// Unit id, or field id for a field without units.
    pub id: Ulid,
    pub commune: String,
    pub field: String,
    pub header: String,
}

/// Read-only index over Commune → Field → Unit.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
    communes: Vec<Commune>,
    /// field id → (commune index, field index)
    fields: HashMap<Ulid, (usize, usize)>,
    /// unit id → (commune index, field index, unit index)
    units: HashMap<Ulid, (usize, usize, usize)>,
}

impl Hierarchy {
    /// Index the tree. Ids must be unique across fields and units.
    pub fn new(communes: Vec<Commune>) -> io::Result<Self> {
        let mut fields = HashMap::new();
        let mut units = HashMap::new();
        for (ci, commune) in communes.iter().enumerate() {
            for (fi, field) in commune.fields.iter().enumerate() {
                if fields.insert(field.id, (ci, fi)).is_some() || units.contains_key(&field.id) {
                    return Err(duplicate(field.id));
                }
                for (ui, unit) in field.units.iter().enumerate() {
                    if units.insert(unit.id, (ci, fi, ui)).is_some() || fields.contains_key(&unit.id) {
                        return Err(duplicate(unit.id));
                    }
                }
            }
        }
        Ok(Self {
            communes,
            fields,
            units,
        })
    }

    /// Load a hierarchy from a JSON array of communes.
    pub fn load_json(path: &Path) -> io::Result<Self> {
        let raw = std::fs::read(path)?;
        let communes: Vec<Commune> = serde_json::from_slice(&raw)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let hierarchy = Self::new(communes)?;
        tracing::info!(
            "loaded hierarchy from {}: {} fields, {} units",
            path.display(),
            hierarchy.fields.len(),
            hierarchy.units.len()
        );
        Ok(hierarchy)
    }

    pub fn communes(&self) -> &[Commune] {
        &self.communes
    }

    pub fn field(&self, id: &Ulid) -> Option<&Field> {
        self.fields
            .get(id)
            .map(|&(ci, fi)| &self.communes[ci].fields[fi])
    }

    pub fn field_of_unit(&self, unit_id: &Ulid) -> Option<&Field> {
        self.units
            .get(unit_id)
            .map(|&(ci, fi, _)| &self.communes[ci].fields[fi])
    }

    pub fn target(&self, id: &Ulid) -> Option<Target<'_>> {
        if let Some(&(ci, fi, ui)) = self.units.get(id) {
            let field = &self.communes[ci].fields[fi];
            return Some(Target::Unit {
                unit: &field.units[ui],
                field,
            });
        }
        self.field(id).map(Target::Field)
    }

    /// Bookable grid columns: every unit, plus every field that has no units.
    pub fn columns(&self) -> Vec<Column> {
        let mut cols = Vec::new();
        for commune in &self.communes {
            for field in &commune.fields {
                if field.units.is_empty() {
                    cols.push(Column {
                        id: field.id,
                        commune: commune.name.clone(),
                        field: field.name.clone(),
                        header: field.name.clone(),
                    });
                }
                for unit in &field.units {
                    cols.push(Column {
                        id: unit.id,
                        commune: commune.name.clone(),
                        field: field.name.clone(),
                        header: unit.header_name.clone(),
                    });
                }
            }
        }
        cols
    }
}

fn duplicate(id: Ulid) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("duplicate location id in hierarchy: {id}"),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// One commune: field "A" with three units, field "B" with none.
    pub(crate) fn sample() -> Hierarchy {
        let units = (1..=3)
            .map(|i| PlannableUnit {
                id: Ulid::new(),
                header_name: format!("A{i}"),
            })
            .collect();
        Hierarchy::new(vec![Commune {
            id: Ulid::new(),
            name: "Ville".into(),
            fields: vec![
                Field {
                    id: Ulid::new(),
                    name: "Terrain A".into(),
                    units,
                },
                Field {
                    id: Ulid::new(),
                    name: "Terrain B".into(),
                    units: vec![],
                },
            ],
        }])
        .unwrap()
    }

    #[test]
    fn target_resolution() {
        let h = sample();
        let field_a = &h.communes()[0].fields[0];
        let unit = &field_a.units[1];

        match h.target(&unit.id) {
            Some(Target::Unit { unit: u, field }) => {
                assert_eq!(u.header_name, "A2");
                assert_eq!(field.id, field_a.id);
            }
            other => panic!("expected unit target, got {other:?}"),
        }
        assert!(matches!(h.target(&field_a.id), Some(Target::Field(_))));
        assert!(h.target(&Ulid::new()).is_none());
        assert_eq!(h.field_of_unit(&unit.id).map(|f| f.id), Some(field_a.id));
    }

    #[test]
    fn columns_skip_fields_with_units() {
        let h = sample();
        let headers: Vec<_> = h.columns().into_iter().map(|c| c.header).collect();
        assert_eq!(headers, vec!["A1", "A2", "A3", "Terrain B"]);
    }

    #[test]
    fn duplicate_ids_rejected() {
        let id = Ulid::new();
        let result = Hierarchy::new(vec![Commune {
            id: Ulid::new(),
            name: "X".into(),
            fields: vec![Field {
                id,
                name: "F".into(),
                units: vec![PlannableUnit {
                    id,
                    header_name: "U".into(),
                }],
            }],
        }]);
        assert!(result.is_err());
    }

    #[test]
    fn load_json_file() {
        let dir = std::env::temp_dir().join("stadeplan_test_hierarchy");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("hierarchy.json");
        let h = sample();
        std::fs::write(&path, serde_json::to_vec(h.communes()).unwrap()).unwrap();

        let loaded = Hierarchy::load_json(&path).unwrap();
        assert_eq!(loaded.communes(), h.communes());
        assert_eq!(loaded.columns().len(), 4);

        let _ = std::fs::remove_file(&path);
    }
}
