//! Matrix view - one viewport per cell of a matrix result

use std::sync::{Arc, Weak};
use parking_lot::RwLock;
use tokio::runtime::Handle;

use qv_core::ParamValue;
use qv_data::{ResourceDescriptor, ResultMatrix};
use qv_render::{LoadProgress, Renderer};

use crate::{Viewport, ViewportEvent, ViewTransform};

/// One cell of the matrix view
#[derive(Debug)]
pub struct MatrixCellView {
    pub row: ParamValue,
    pub column: ParamValue,
    pub viewport: Arc<Viewport>,
    resource: RwLock<ResourceDescriptor>,
}

impl MatrixCellView {
    pub fn resource(&self) -> ResourceDescriptor {
        self.resource.read().clone()
    }
}

/// Grid of viewports sharing one pan/zoom transform
#[derive(Debug)]
pub struct MatrixView {
    axis1: String,
    axis2: String,
    cells: Vec<MatrixCellView>,
    progress: Arc<LoadProgress>,
}

impl MatrixView {
    /// Build one viewport per cell of `matrix`, each surface `cell_size` pixels
    pub fn new(matrix: &ResultMatrix, cell_size: (u32, u32)) -> Self {
        let cells = matrix
            .iter()
            .map(|(row, column, resource)| MatrixCellView {
                row: row.clone(),
                column: column.clone(),
                viewport: Arc::new(
                    Viewport::canvas(cell_size.0, cell_size.1).with_caption(format!("({}, {})", row, column)),
                ),
                resource: RwLock::new(resource.clone()),
            })
            .collect();

        Self {
            axis1: matrix.axis1.clone(),
            axis2: matrix.axis2.clone(),
            cells,
            progress: Arc::new(LoadProgress::new()),
        }
    }

    /// Keep every cell's transform equal to the one last changed
    pub fn link_transforms(self: &Arc<Self>) {
        for cell in &self.cells {
            let view: Weak<MatrixView> = Arc::downgrade(self);
            cell.viewport.subscribe(move |event| {
                if let (ViewportEvent::Transformed(transform), Some(view)) = (event, view.upgrade()) {
                    view.apply_transform(*transform);
                }
            });
        }
    }

    pub fn axes(&self) -> (&str, &str) {
        (&self.axis1, &self.axis2)
    }

    pub fn cells(&self) -> &[MatrixCellView] {
        &self.cells
    }

    /// Cell at `(a, b)`; the first match wins when keys repeat
    pub fn cell(&self, a: &ParamValue, b: &ParamValue) -> Option<&MatrixCellView> {
        self.cells
            .iter()
            .find(|cell| cell.row.numerically_eq(a) && cell.column.numerically_eq(b))
    }

    pub fn progress(&self) -> &Arc<LoadProgress> {
        &self.progress
    }

    /// Whether `matrix` has exactly this view's axes and cell keys
    pub fn matches(&self, matrix: &ResultMatrix) -> bool {
        self.axis1 == matrix.axis1
            && self.axis2 == matrix.axis2
            && self.cells.len() == matrix.cell_count()
            && self
                .cells
                .iter()
                .zip(matrix.iter())
                .all(|(cell, (row, column, _))| &cell.row == row && &cell.column == column)
    }

    /// Swap in the descriptors of a matrix with the same shape.
    /// Returns false (and changes nothing) when the shape differs.
    pub fn update(&self, matrix: &ResultMatrix) -> bool {
        if !self.matches(matrix) {
            return false;
        }
        for (cell, (_, _, resource)) in self.cells.iter().zip(matrix.iter()) {
            *cell.resource.write() = resource.clone();
        }
        true
    }

    /// Copy `transform` to every cell that does not have it yet
    pub fn apply_transform(&self, transform: ViewTransform) {
        for cell in &self.cells {
            if cell.viewport.transform() != transform {
                cell.viewport.set_transform(transform);
            }
        }
    }

    /// Render every cell into its own viewport, superseding older loads
    pub fn render(&self, renderer: &dyn Renderer, runtime: &Handle) {
        let outcomes = self
            .cells
            .iter()
            .map(|cell| renderer.render(&cell.resource(), cell.viewport.target(), true))
            .collect();
        self.progress.track(outcomes, runtime);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use qv_core::DecodedImage;
    use qv_data::{MatrixCell, MatrixRow};
    use qv_render::{ImageRenderer, MemoryImageLoader};

    fn matrix(prefix: &str) -> ResultMatrix {
        let rows = [1, 2]
            .into_iter()
            .map(|a| MatrixRow {
                key: ParamValue::from(a),
                cells: [10, 20]
                    .into_iter()
                    .map(|b| MatrixCell {
                        key: ParamValue::from(b),
                        resource: ResourceDescriptor::image(format!("{}{}_{}.png", prefix, a, b)),
                    })
                    .collect(),
            })
            .collect();
        ResultMatrix {
            axis1: "a".into(),
            axis2: "b".into(),
            rows,
        }
    }

    #[test]
    fn test_captions_and_lookup() {
        let view = MatrixView::new(&matrix(""), (4, 4));
        let captions: Vec<&str> = view.cells().iter().filter_map(|c| c.viewport.caption()).collect();
        assert_eq!(captions, ["(1, 10)", "(1, 20)", "(2, 10)", "(2, 20)"]);

        let cell = view.cell(&ParamValue::from(2), &ParamValue::from(10)).unwrap();
        assert_eq!(cell.resource().address, "2_10.png");
    }

    #[test]
    fn test_transforms_stay_in_sync() {
        let view = Arc::new(MatrixView::new(&matrix(""), (4, 4)));
        view.link_transforms();

        view.cells()[1].viewport.pan(3.0, 1.0);

        for cell in view.cells() {
            assert_eq!(cell.viewport.transform(), ViewTransform { left: 3.0, top: 1.0, scale: 1.0 });
        }
    }

    #[test]
    fn test_update_requires_same_shape() {
        let view = MatrixView::new(&matrix(""), (4, 4));
        assert!(view.update(&matrix("next/")));
        assert_eq!(view.cells()[0].resource().address, "next/1_10.png");

        let mut smaller = matrix("");
        smaller.rows.pop();
        assert!(!view.update(&smaller));
    }

    #[tokio::test]
    async fn test_render_all_cells() {
        let loader = MemoryImageLoader::new();
        for (a, b) in [(1, 10), (1, 20), (2, 10), (2, 20)] {
            loader.insert(format!("{}_{}.png", a, b), DecodedImage::new(8, 6, vec![0u8; 192]));
        }
        let renderer = ImageRenderer::new(loader, Handle::current());
        let view = MatrixView::new(&matrix(""), (1, 1));

        view.render(&renderer, &Handle::current());
        view.progress().finished().await;

        assert_eq!(view.progress().completed(), 4);
        for cell in view.cells() {
            assert!(cell.resource().image.is_loaded());
            assert_eq!(cell.viewport.target().size(), (8, 6));
        }
    }
}
