#[pyo3::pymodule]
mod nj_py {
    use ::nj::{nj as lib_nj, NJConfig};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;
    use serde_pyobject::from_pyobject;

    /// Takes a dict shaped like `NJConfig` and returns the Newick tree.
    #[pyfunction]
    fn nj(py_config: Bound<PyAny>) -> PyResult<String> {
        let config: NJConfig =
            from_pyobject(py_config).map_err(|e| PyValueError::new_err(e.to_string()))?;
        lib_nj(config).map_err(|e| PyValueError::new_err(e.to_string()))
    }
}
