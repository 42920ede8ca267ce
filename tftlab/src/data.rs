//! The shared mask-generation context.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::component::Component;
use crate::error::{with_err_context, ErrorContext, Result};
use crate::generation::GeneratedCheck;
use crate::io::create_parent_dir;
use crate::layout::cell::{Cell, CellKey, Instance};
use crate::layout::context::{LayoutCtx, LayoutData};
use crate::layout::layers::LayerSet;
use crate::log;

pub(crate) struct MaskData {
    layers: Arc<LayerSet>,
    layouts: LayoutData,
}

/// The context shared by every component generated for one mask.
///
/// Owns the layer set and the cache of generated cells. Cloning the
/// context is cheap and all clones refer to the same data.
#[derive(Clone)]
pub struct MaskCtx {
    inner: Arc<RwLock<MaskData>>,
}

impl MaskData {
    fn new(layers: LayerSet) -> Self {
        Self {
            layers: Arc::new(layers),
            layouts: LayoutData::new(),
        }
    }

    #[inline]
    pub(crate) fn layouts(&self) -> &LayoutData {
        &self.layouts
    }

    #[inline]
    pub(crate) fn layouts_mut(&mut self) -> &mut LayoutData {
        &mut self.layouts
    }

    #[inline]
    pub(crate) fn layers(&self) -> Arc<LayerSet> {
        self.layers.clone()
    }
}

impl MaskCtx {
    #[inline]
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, MaskData> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    #[inline]
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, MaskData> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Creates a new context drawing on the given layers.
    pub fn new(layers: LayerSet) -> Self {
        Self {
            inner: Arc::new(RwLock::new(MaskData::new(layers))),
        }
    }

    pub fn layers(&self) -> Arc<LayerSet> {
        self.read().layers()
    }

    /// Instantiates component `T`, generating its layout unless a cell with
    /// identical parameters was generated before.
    pub fn instantiate_layout<T>(&self, params: &T::Params) -> Result<Instance>
    where
        T: Component,
    {
        let check = {
            let mut inner = self.write();
            inner.layouts.get_generated_cell::<T>(params)?
        };

        Ok(match check {
            GeneratedCheck::Exists(cell) => Instance::new(cell),
            GeneratedCheck::MustGenerate(id) => match self.generate_layout::<T>(params, id) {
                Ok(cell) => Instance::new(cell),
                Err(err) => {
                    self.write().layouts.abandon_cell(id);
                    return Err(err);
                }
            },
        })
    }

    /// Generates component `T` and writes it as the top cell of a GDS file.
    pub fn write_layout<T>(&self, params: &T::Params, path: impl AsRef<Path>) -> Result<()>
    where
        T: Component,
    {
        let path = path.as_ref();

        let inner = || -> Result<()> {
            let inst = self.instantiate_layout::<T>(params)?;
            let top = inst.cell().clone();
            create_parent_dir(path)?;
            self.to_gds_with_top(top, path)?;
            log::info!("wrote layout to {:?}", path);
            Ok(())
        };

        with_err_context(inner(), || {
            ErrorContext::Task(arcstr::format!("writing layout to file {:?}", path))
        })
    }

    fn init_component<T>(&self, params: &T::Params) -> Result<T>
    where
        T: Component,
    {
        let component = with_err_context(T::new(params, self), || ErrorContext::InitComponent {
            type_name: std::any::type_name::<T>().into(),
        })?;
        Ok(component)
    }

    pub(crate) fn generate_layout<T>(&self, params: &T::Params, id: CellKey) -> Result<Arc<Cell>>
    where
        T: Component,
    {
        let mut ctx = LayoutCtx {
            inner: self.clone(),
            cell: Cell::new(id),
        };
        let component = self.init_component::<T>(params)?;
        let name = component.name();
        ctx.cell.set_name(name.clone());
        with_err_context(component.layout(&mut ctx), || ErrorContext::GenComponent {
            name: name.clone(),
            type_name: std::any::type_name::<T>().into(),
        })?;
        ctx.cell.freeze();

        // Now that the cell is frozen, mark `ctx` as immutable
        // so we don't accidentally modify the cell in any way.
        let ctx = ctx;

        let cell = {
            let mut inner = self.write();
            inner.layouts.set_cell(ctx.cell)
        };
        log::debug!("generated cell {}", name);

        Ok(cell)
    }
}
