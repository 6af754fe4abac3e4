use litroutes_core::Error;
use pyo3::{
    create_exception,
    exceptions::{PyConnectionError, PyLookupError, PyRuntimeError, PyValueError},
    prelude::*,
};

create_exception!(
    litroutes,
    OutOfBoundsError,
    PyValueError,
    "A coordinate lies outside the service area."
);
create_exception!(
    litroutes,
    NoRouteError,
    PyLookupError,
    "No route connects the two points."
);
create_exception!(
    litroutes,
    DataSourceError,
    PyConnectionError,
    "A street, light or land-use source failed."
);

/// Map an engine error onto the matching Python exception
pub(crate) fn to_py_err(err: Error) -> PyErr {
    let message = err.to_string();
    match err {
        Error::OutOfBounds(_) => OutOfBoundsError::new_err(message),
        Error::NoPath(_) => NoRouteError::new_err(message),
        Error::DataSource(_) => DataSourceError::new_err(message),
        Error::InvalidCoordinate { .. } | Error::InvalidData(_) | Error::Config(_) => {
            PyValueError::new_err(message)
        }
        _ => PyRuntimeError::new_err(message),
    }
}
