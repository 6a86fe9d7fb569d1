//! Resolved query output

use serde::Serialize;

use qv_core::{ImageSlot, ParamValue, QuerySnapshot};

/// Kind of resource a descriptor points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Image,
}

/// Address of one resource plus the slot its decoded form is cached in
#[derive(Debug, Clone, Serialize)]
pub struct ResourceDescriptor {
    #[serde(rename = "type")]
    pub kind: ResourceKind,
    pub address: String,
    /// Filled by the renderer once the image is decoded
    #[serde(skip)]
    pub image: ImageSlot,
}

impl ResourceDescriptor {
    pub fn image(address: impl Into<String>) -> Self {
        Self {
            kind: ResourceKind::Image,
            address: address.into(),
            image: ImageSlot::new(),
        }
    }
}

impl PartialEq for ResourceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.address == other.address
    }
}

/// One cell of a matrix result, keyed by its axis2 value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixCell {
    pub key: ParamValue,
    pub resource: ResourceDescriptor,
}

/// One row of a matrix result, keyed by its axis1 value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixRow {
    pub key: ParamValue,
    pub cells: Vec<MatrixCell>,
}

/// Grid of descriptors. Rows follow the axis1 query order, cells within a row
/// follow the axis2 query order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultMatrix {
    pub axis1: String,
    pub axis2: String,
    pub rows: Vec<MatrixRow>,
}

impl ResultMatrix {
    /// Descriptor at `(a, b)`; the first match wins when keys repeat
    pub fn get(&self, a: &ParamValue, b: &ParamValue) -> Option<&ResourceDescriptor> {
        self.rows
            .iter()
            .filter(|row| row.key.numerically_eq(a))
            .flat_map(|row| row.cells.iter())
            .find(|cell| cell.key.numerically_eq(b))
            .map(|cell| &cell.resource)
    }

    pub fn cell_count(&self) -> usize {
        self.rows.iter().map(|row| row.cells.len()).sum()
    }

    /// Every cell as `(a, b, descriptor)` in row-major order
    pub fn iter(&self) -> impl Iterator<Item = (&ParamValue, &ParamValue, &ResourceDescriptor)> {
        self.rows.iter().flat_map(|row| {
            row.cells
                .iter()
                .map(move |cell| (&row.key, &cell.key, &cell.resource))
        })
    }

    pub fn row_keys(&self) -> impl Iterator<Item = &ParamValue> {
        self.rows.iter().map(|row| &row.key)
    }

    /// Column keys of the first row
    pub fn column_keys(&self) -> impl Iterator<Item = &ParamValue> {
        self.rows.first().into_iter().flat_map(|row| row.cells.iter().map(|cell| &cell.key))
    }
}

/// Payload of a result set
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ResultData {
    Single(ResourceDescriptor),
    Matrix(ResultMatrix),
}

/// A resolved query: the snapshot it was computed from and its resources
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub snapshot: QuerySnapshot,
    pub data: ResultData,
}

impl ResultSet {
    pub fn single(&self) -> Option<&ResourceDescriptor> {
        match &self.data {
            ResultData::Single(descriptor) => Some(descriptor),
            ResultData::Matrix(_) => None,
        }
    }

    pub fn matrix(&self) -> Option<&ResultMatrix> {
        match &self.data {
            ResultData::Matrix(matrix) => Some(matrix),
            ResultData::Single(_) => None,
        }
    }

    /// Every descriptor, row-major for matrices
    pub fn descriptors(&self) -> Vec<&ResourceDescriptor> {
        match &self.data {
            ResultData::Single(descriptor) => vec![descriptor],
            ResultData::Matrix(matrix) => matrix.iter().map(|(_, _, d)| d).collect(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix() -> ResultMatrix {
        let row = |a: i32, cells: &[(i32, &str)]| MatrixRow {
            key: ParamValue::from(a),
            cells: cells
                .iter()
                .map(|(b, address)| MatrixCell {
                    key: ParamValue::from(*b),
                    resource: ResourceDescriptor::image(*address),
                })
                .collect(),
        };
        ResultMatrix {
            axis1: "a".into(),
            axis2: "b".into(),
            rows: vec![
                row(1, &[(10, "first"), (20, "1_20")]),
                row(1, &[(10, "duplicate")]),
                row(2, &[(10, "2_10")]),
            ],
        }
    }

    #[test]
    fn test_get_returns_first_match() {
        let m = matrix();
        assert_eq!(m.get(&ParamValue::from(1), &ParamValue::from(10)).unwrap().address, "first");
        assert_eq!(m.get(&ParamValue::from("2"), &ParamValue::from(10)).unwrap().address, "2_10");
        assert!(m.get(&ParamValue::from(2), &ParamValue::from(20)).is_none());
        assert_eq!(m.cell_count(), 4);
        assert_eq!(m.row_keys().count(), 3);
        assert_eq!(m.column_keys().count(), 2);
    }

    #[test]
    fn test_descriptor_clones_share_image_slot() {
        let descriptor = ResourceDescriptor::image("a.png");
        let copy = descriptor.clone();
        copy.image.attach(std::sync::Arc::new(qv_core::DecodedImage::new(1, 1, vec![0u8; 4])));
        assert!(descriptor.image.is_loaded());
    }
}
