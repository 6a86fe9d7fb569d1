//! Browser - wires a database, its query set and a renderer together

use std::sync::Arc;
use parking_lot::{Mutex, RwLock};
use serde::{Serialize, Deserialize};
use tokio::runtime::Handle;

use qv_core::{QueryEvent, QuerySet, QuerySubscriber, SubscriptionId};
use qv_data::{DataError, Database, ResultData, ResultSet};
use qv_render::{LoadProgress, Renderer};

use crate::{ControlsConfig, ControlsPhiTheta, EventResponse, InputEvent, MatrixView, Viewport};

/// Options of a [`Browser`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserOptions {
    /// Supersede pending loads of the single viewport on every refresh
    pub abort_previous: bool,
    /// Initial surface size of the single viewport and of matrix cells
    pub surface_size: (u32, u32),
    pub controls: ControlsConfig,
}

impl Default for BrowserOptions {
    fn default() -> Self {
        Self {
            abort_previous: true,
            surface_size: (512, 512),
            controls: ControlsConfig::default(),
        }
    }
}

/// Shows the resources selected by a query set.
///
/// In single mode one viewport shows one resource; in matrix mode a
/// [`MatrixView`] shows one resource per cell.
pub struct Browser {
    database: Arc<dyn Database>,
    query_set: Arc<QuerySet>,
    renderer: Arc<dyn Renderer>,
    runtime: Handle,
    options: BrowserOptions,
    viewport: Arc<Viewport>,
    controls: ControlsPhiTheta,
    matrix: RwLock<Option<Arc<MatrixView>>>,
    progress: Arc<LoadProgress>,
    last_result: RwLock<Option<ResultSet>>,
    subscription: Mutex<Option<SubscriptionId>>,
}

impl Browser {
    /// Create a browser over a fresh query set of `database`
    pub fn new(
        database: Arc<dyn Database>,
        renderer: Arc<dyn Renderer>,
        runtime: Handle,
        options: BrowserOptions,
    ) -> Result<Arc<Self>, DataError> {
        let query_set = Arc::new(database.query_set()?);
        let viewport = Arc::new(Viewport::canvas(options.surface_size.0, options.surface_size.1));
        let controls = ControlsPhiTheta::new(viewport.clone(), &query_set, options.controls);

        Ok(Arc::new(Self {
            database,
            query_set,
            renderer,
            runtime,
            options,
            viewport,
            controls,
            matrix: RwLock::new(None),
            progress: Arc::new(LoadProgress::new()),
            last_result: RwLock::new(None),
            subscription: Mutex::new(None),
        }))
    }

    pub fn query_set(&self) -> &Arc<QuerySet> {
        &self.query_set
    }

    /// Viewport used in single mode
    pub fn viewport(&self) -> &Arc<Viewport> {
        &self.viewport
    }

    pub fn controls(&self) -> &ControlsPhiTheta {
        &self.controls
    }

    /// Matrix view of the last matrix result, if the browser is in matrix mode
    pub fn matrix_view(&self) -> Option<Arc<MatrixView>> {
        self.matrix.read().clone()
    }

    /// Progress of the loads started by the last refresh
    pub fn progress(&self) -> Arc<LoadProgress> {
        match self.matrix_view() {
            Some(matrix) => matrix.progress().clone(),
            None => self.progress.clone(),
        }
    }

    pub fn last_result(&self) -> Option<ResultSet> {
        self.last_result.read().clone()
    }

    /// Forward viewport input to the controls
    pub fn handle_input(&self, event: InputEvent) -> EventResponse {
        self.controls.handle(event)
    }

    /// Refresh on every change of the query set. The browser is held weakly.
    pub fn attach(self: &Arc<Self>) {
        let mut subscription = self.subscription.lock();
        if subscription.is_none() {
            let subscriber: Arc<dyn QuerySubscriber> = self.clone();
            *subscription = Some(self.query_set.add_subscriber(subscriber));
        }
    }

    pub fn detach(&self) {
        if let Some(id) = self.subscription.lock().take() {
            self.query_set.unsubscribe(id);
        }
    }

    /// Resolve the query set and render the result
    pub fn refresh(&self) -> Result<(), DataError> {
        let result = self.database.resolve(&self.query_set)?;

        match &result.data {
            ResultData::Single(descriptor) => {
                *self.matrix.write() = None;
                let outcome = self
                    .renderer
                    .render(descriptor, self.viewport.target(), self.options.abort_previous);
                self.progress.track(vec![outcome], &self.runtime);
            }
            ResultData::Matrix(matrix) => {
                let current = self.matrix_view().filter(|view| view.update(matrix));
                let view = match current {
                    Some(view) => view,
                    None => {
                        tracing::debug!(cells = matrix.cell_count(), "building matrix view");
                        let view = Arc::new(MatrixView::new(matrix, self.options.surface_size));
                        view.link_transforms();
                        *self.matrix.write() = Some(view.clone());
                        view
                    }
                };
                view.render(self.renderer.as_ref(), &self.runtime);
            }
        }

        *self.last_result.write() = Some(result);
        Ok(())
    }
}

impl QuerySubscriber for Browser {
    fn on_query_event(&self, event: &QueryEvent) {
        match event {
            QueryEvent::ParameterChanged { .. } | QueryEvent::ModeChanged(_) => {
                if let Err(e) = self.refresh() {
                    tracing::error!("refresh failed: {}", e);
                }
            }
            QueryEvent::Processed(_) => {}
        }
    }
}

impl Drop for Browser {
    fn drop(&mut self) {
        self.detach();
    }
}

impl std::fmt::Debug for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("query_set", &self.query_set)
            .field("options", &self.options)
            .field("matrix", &self.matrix_view().is_some())
            .finish()
    }
}
