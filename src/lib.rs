use pyo3::prelude::*;

use engine::PyRoutingEngine;
use errors::{DataSourceError, NoRouteError, OutOfBoundsError};

pub mod engine;
pub mod errors;

/// A Python module implemented in Rust.
#[pymodule]
fn litroutes(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pyo3_log::init();

    m.add_class::<PyRoutingEngine>()?;

    let py = m.py();
    m.add("OutOfBoundsError", py.get_type::<OutOfBoundsError>())?;
    m.add("NoRouteError", py.get_type::<NoRouteError>())?;
    m.add("DataSourceError", py.get_type::<DataSourceError>())?;
    Ok(())
}

#[cfg(feature = "stubgen")]
pyo3_stub_gen::define_stub_info_gatherer!(stub_info);
