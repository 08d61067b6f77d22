// In: src/ffi/python.rs

use arrow::array::{make_array, ArrayData};
use arrow::pyarrow::{FromPyArrow, ToPyArrow};
use log::LevelFilter;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyTuple};
use std::fs::OpenOptions;
use std::sync::Once;

use crate::bridge::{self, arrow_impl, ConversionOutput};
use crate::config::ConversionConfig;
use crate::error::TesseraError;
use crate::kernels;
use crate::types::{CsfRelations, CsrMatrix, Device, IndexArray, TesseraDataType};

//==================================================================================
// I. Marshalling Helpers
//==================================================================================

/// Accepts any pyarrow array. Objects that report a DLPack device are checked
/// first so accelerator tensors fail with a device error, not an Arrow one.
fn index_array_from_py(obj: &PyAny, name: &str) -> PyResult<IndexArray> {
    if obj.hasattr("__dlpack_device__")? {
        let (device_type, device_id): (i32, i32) = obj.call_method0("__dlpack_device__")?.extract()?;
        let device = Device::from_dlpack(device_type, device_id);
        if !device.is_host() {
            return Err(TesseraError::UnsupportedDevice(format!(
                "'{}' resides on {}; only host memory is supported",
                name, device
            ))
            .into());
        }
    }
    let array = make_array(ArrayData::from_pyarrow(obj)?);
    Ok(arrow_impl::index_array_from_arrow(array.as_ref())?)
}

/// Builds `{name: (pyarrow.Int32Array, shape)}` for every output array.
fn output_to_py(py: Python, output: &ConversionOutput) -> PyResult<PyObject> {
    let dict = PyDict::new(py);
    for named in arrow_impl::output_to_arrow(output) {
        let array = named.array.to_data().to_pyarrow(py)?;
        let shape = PyTuple::new(py, &named.shape);
        dict.set_item(named.name, (array, shape))?;
    }
    Ok(dict.into())
}

//==================================================================================
// II. Encoder Functions
//==================================================================================

macro_rules! csr_view {
    ($rows:expr, $cols:expr, $indptr:expr, $indices:expr) => {
        CsrMatrix::new(
            $rows,
            $cols,
            $indptr.as_i32("indptr")?,
            $indices.as_i32("indices")?,
        )
    };
}

#[pyfunction]
#[pyo3(name = "column_part_hyb")]
pub fn column_part_hyb_py(
    py: Python,
    num_rows: usize,
    num_cols: usize,
    indptr: &PyAny,
    indices: &PyAny,
    num_col_parts: usize,
    buckets: Vec<usize>,
) -> PyResult<PyObject> {
    let indptr = index_array_from_py(indptr, "indptr")?;
    let indices = index_array_from_py(indices, "indices")?;
    let hyb = py.allow_threads(|| -> Result<_, TesseraError> {
        let csr = csr_view!(num_rows, num_cols, indptr, indices)?;
        kernels::column_part_hyb(&csr, num_col_parts, &buckets)
    })?;
    output_to_py(py, &ConversionOutput::ColumnPartHyb(hyb))
}

#[pyfunction]
#[pyo3(name = "column_part_hyb_flat")]
pub fn column_part_hyb_flat_py(
    py: Python,
    num_rows: usize,
    num_cols: usize,
    indptr: &PyAny,
    indices: &PyAny,
    num_col_parts: usize,
    buckets: Vec<usize>,
) -> PyResult<PyObject> {
    let indptr = index_array_from_py(indptr, "indptr")?;
    let indices = index_array_from_py(indices, "indices")?;
    let flat = py.allow_threads(|| -> Result<_, TesseraError> {
        let csr = csr_view!(num_rows, num_cols, indptr, indices)?;
        kernels::column_part_hyb_flat(&csr, num_col_parts, &buckets)
    })?;
    output_to_py(py, &ConversionOutput::ColumnPartHybFlat(flat))
}

fn csf_inputs(
    indptr0: &PyAny,
    indices0: &PyAny,
    indptr1: &PyAny,
    indices1: &PyAny,
) -> PyResult<bridge::CsfInputs> {
    Ok(bridge::CsfInputs {
        indptr0: index_array_from_py(indptr0, "indptr0")?,
        indices0: index_array_from_py(indices0, "indices0")?,
        indptr1: index_array_from_py(indptr1, "indptr1")?,
        indices1: index_array_from_py(indices1, "indices1")?,
    })
}

#[pyfunction]
#[pyo3(name = "csf_to_ell3d")]
pub fn csf_to_ell3d_py(
    py: Python,
    indptr0: &PyAny,
    indices0: &PyAny,
    indptr1: &PyAny,
    indices1: &PyAny,
    row_buckets: Vec<usize>,
    col_buckets: Vec<usize>,
) -> PyResult<PyObject> {
    let inputs = csf_inputs(indptr0, indices0, indptr1, indices1)?;
    let ell = py.allow_threads(|| -> Result<_, TesseraError> {
        let csf: CsfRelations = inputs.view()?;
        kernels::csf_to_ell3d(&csf, &row_buckets, &col_buckets)
    })?;
    output_to_py(py, &ConversionOutput::Relational(ell))
}

#[pyfunction]
#[pyo3(name = "csf_to_ell3d_flat")]
pub fn csf_to_ell3d_flat_py(
    py: Python,
    indptr0: &PyAny,
    indices0: &PyAny,
    indptr1: &PyAny,
    indices1: &PyAny,
    row_buckets: Vec<usize>,
    col_buckets: Vec<usize>,
) -> PyResult<PyObject> {
    let inputs = csf_inputs(indptr0, indices0, indptr1, indices1)?;
    let ell = py.allow_threads(|| -> Result<_, TesseraError> {
        let csf = inputs.view()?;
        kernels::csf_to_ell3d_flat(&csf, &row_buckets, &col_buckets)
    })?;
    output_to_py(py, &ConversionOutput::RelationalFlat(ell))
}

#[pyfunction]
#[pyo3(name = "condense", signature = (indptr, indices, tile_size, group_size, threshold = None))]
pub fn condense_py(
    py: Python,
    indptr: &PyAny,
    indices: &PyAny,
    tile_size: usize,
    group_size: usize,
    threshold: Option<usize>,
) -> PyResult<PyObject> {
    let indptr = index_array_from_py(indptr, "indptr")?;
    let indices = index_array_from_py(indices, "indices")?;
    let tiles = py.allow_threads(|| -> Result<_, TesseraError> {
        let csr = CsrMatrix::from_indptr(indptr.as_i32("indptr")?, indices.as_i32("indices")?)?;
        kernels::condense(&csr, tile_size, group_size, threshold)
    })?;
    output_to_py(py, &ConversionOutput::Condensed(tiles))
}

#[pyfunction]
#[pyo3(name = "ell_row_reshape")]
pub fn ell_row_reshape_py(
    py: Python,
    nv: usize,
    ne: usize,
    col_size: usize,
    indptr: &PyAny,
    indices: &PyAny,
) -> PyResult<PyObject> {
    let indptr = index_array_from_py(indptr, "indptr")?;
    let indices = index_array_from_py(indices, "indices")?;
    let ell = py.allow_threads(|| -> Result<_, TesseraError> {
        kernels::ell_row_reshape(
            nv,
            ne,
            col_size,
            indptr.as_i32("indptr")?,
            indices.as_i32("indices")?,
        )
    })?;
    output_to_py(py, &ConversionOutput::Reshaped(ell))
}

/// Returns a list of pyarrow arrays of `dtype`, one per input value buffer.
#[pyfunction]
#[pyo3(name = "ell_value_repack")]
pub fn ell_value_repack_py(
    py: Python,
    row_num: usize,
    nnz_col: usize,
    dtype: &str,
    feature_widths: Vec<usize>,
    indptr: &PyAny,
    values: Vec<&PyAny>,
) -> PyResult<PyObject> {
    let dtype = TesseraDataType::from_name(dtype)?;
    let indptr = index_array_from_py(indptr, "indptr")?;
    let buffers = values
        .into_iter()
        .map(|obj| -> PyResult<_> {
            let array = make_array(ArrayData::from_pyarrow(obj)?);
            Ok(arrow_impl::value_buffer_from_arrow(array.as_ref())?)
        })
        .collect::<PyResult<Vec<_>>>()?;

    let packed = py.allow_threads(|| -> Result<_, TesseraError> {
        kernels::ell_value_repack(
            row_num,
            nnz_col,
            dtype,
            &feature_widths,
            indptr.as_i32("indptr")?,
            &buffers,
        )
    })?;

    let list = PyList::empty(py);
    for buf in packed {
        list.append(arrow_impl::value_buffer_to_arrow(buf)?.to_data().to_pyarrow(py)?)?;
    }
    Ok(list.into())
}

//==================================================================================
// III. Config-Driven API
//==================================================================================

fn required<'py>(arrays: &'py PyDict, name: &str) -> PyResult<&'py PyAny> {
    arrays.get_item(name)?.ok_or_else(|| {
        TesseraError::InvalidArgument(format!("missing input array '{}'", name)).into()
    })
}

/// Runs a JSON-configured conversion over CSR (`indptr`, `indices`) or CSF
/// (`indptr0`, `indices0`, `indptr1`, `indices1`) keyword arrays.
///
/// Returns `(arrays, stats_json)`, where `stats_json` is `None` unless the config
/// sets `collect_stats`.
#[pyfunction]
#[pyo3(name = "convert_json", signature = (config_json, **arrays))]
pub fn convert_json_py(
    py: Python,
    config_json: &str,
    arrays: Option<&PyDict>,
) -> PyResult<PyObject> {
    let config = ConversionConfig::from_json(config_json)?;
    let arrays = arrays.ok_or_else(|| {
        PyErr::from(TesseraError::InvalidArgument(
            "no input arrays were supplied".to_string(),
        ))
    })?;
    let get = |name: &str| required(arrays, name);

    let inputs = if config.format.expects_csf() {
        bridge::ConversionInputs::Csf(csf_inputs(
            get("indptr0")?,
            get("indices0")?,
            get("indptr1")?,
            get("indices1")?,
        )?)
    } else {
        let mut csr = bridge::CsrInputs::new(
            index_array_from_py(get("indptr")?, "indptr")?,
            index_array_from_py(get("indices")?, "indices")?,
        );
        if let Some(num_cols) = arrays.get_item("num_cols")? {
            csr.num_cols = Some(num_cols.extract()?);
        }
        bridge::ConversionInputs::Csr(csr)
    };

    let result = py.allow_threads(|| bridge::convert(&config, &inputs))?;
    let stats_json = result
        .stats
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(TesseraError::from)?;
    let arrays = output_to_py(py, &result.output)?;
    Ok((arrays, stats_json).into_py(py))
}

//==================================================================================
// IV. Logging
//==================================================================================

static INIT_LOGGER: Once = Once::new();

#[pyfunction]
#[pyo3(name = "enable_verbose_logging", signature = (log_file = None, debug = false))]
pub fn enable_verbose_logging_py(log_file: Option<String>, debug: bool) -> PyResult<()> {
    let file = log_file
        .map(|filename| OpenOptions::new().append(true).create(true).open(filename))
        .transpose()?;

    INIT_LOGGER.call_once(|| {
        let mut builder = env_logger::Builder::new();

        builder.is_test(false);
        builder.filter_level(if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        });

        builder.format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "[{}] {}", record.level(), record.args())?;
            buf.flush()?;
            Ok(())
        });

        if let Some(file) = file {
            builder.target(env_logger::Target::Pipe(Box::new(file)));
        }

        let _ = builder.try_init();
    });
    Ok(())
}
