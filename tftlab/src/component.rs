//! APIs for creating layout components.

use std::any::Any;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::data::MaskCtx;
use crate::error::Result;
use crate::layout::context::LayoutCtx;

/// The trait that all mask components must implement.
pub trait Component: Any {
    /// The parameter type.
    type Params: Serialize;

    /// Creates a new instance of this component with the given paramters.
    fn new(params: &Self::Params, ctx: &MaskCtx) -> Result<Self>
    where
        Self: Sized;

    /// Returns the desired name of this component.
    ///
    /// The name should be a valid GDSII structure name. If two components share a name,
    /// one of them is renamed on export, so this name is only a suggestion.
    fn name(&self) -> ArcStr {
        arcstr::literal!("unnamed")
    }

    /// Creates the layout of this component.
    fn layout(&self, ctx: &mut LayoutCtx) -> Result<()>;
}

/// An empty type for components that are not parametrized.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub struct NoParams;

/// Uses [`flexbuffers`] to serialize component parameters.
///
/// For caching purposes.
pub(crate) fn serialize_params<T>(x: &T) -> Result<Vec<u8>>
where
    T: Serialize,
{
    let mut s = flexbuffers::FlexbufferSerializer::new();
    x.serialize(&mut s)?;
    Ok(s.take_buffer())
}
