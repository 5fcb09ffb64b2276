//! Translate and warp wrappers
//!
//! The safe gdal crate wraps `GDALBuildVRT` but not `GDALTranslate` or
//! `GDALWarp`, so these two go through gdal-sys directly. Option lists are
//! built with the same argv-style strings the command-line tools take,
//! which keeps the call sites readable next to their gdal_translate /
//! gdalwarp equivalents.

use std::ffi::CString;
use std::ptr;

use gdal::cpl::CslStringList;
use gdal::errors::{GdalError, Result};
use gdal::Dataset;

/// Runs the translate utility on an open dataset, producing a new dataset.
///
/// `args` is the gdal_translate argument vector, e.g.
/// `["-of", "MEM", "-expand", "rgb", "-srcwin", "0", "0", "100", "100"]`.
pub fn translate(src: &Dataset, args: &[String]) -> Result<Dataset> {
    let mut argv = CslStringList::new();
    for arg in args {
        argv.add_string(arg)?;
    }

    let options = unsafe { gdal_sys::GDALTranslateOptionsNew(argv.as_ptr(), ptr::null_mut()) };
    if options.is_null() {
        return Err(GdalError::NullPointer {
            method_name: "GDALTranslateOptionsNew",
            msg: format!("invalid translate options: {:?}", args),
        });
    }

    let dest = CString::new("").expect("static string");
    let mut usage_error = 0;
    let handle = unsafe {
        gdal_sys::GDALTranslate(
            dest.as_ptr(),
            src.c_dataset(),
            options,
            &mut usage_error,
        )
    };
    unsafe { gdal_sys::GDALTranslateOptionsFree(options) };

    if handle.is_null() || usage_error != 0 {
        return Err(GdalError::NullPointer {
            method_name: "GDALTranslate",
            msg: format!("translate failed (args: {:?})", args),
        });
    }
    Ok(unsafe { Dataset::from_c_dataset(handle) })
}

/// Runs the warp utility on an open dataset, producing a new dataset.
///
/// `args` is the gdalwarp argument vector, e.g.
/// `["-of", "MEM", "-t_srs", "EPSG:3857", "-tr", "76.4", "76.4"]`.
pub fn warp(src: &Dataset, args: &[String]) -> Result<Dataset> {
    let mut argv = CslStringList::new();
    for arg in args {
        argv.add_string(arg)?;
    }

    let options = unsafe { gdal_sys::GDALWarpAppOptionsNew(argv.as_ptr(), ptr::null_mut()) };
    if options.is_null() {
        return Err(GdalError::NullPointer {
            method_name: "GDALWarpAppOptionsNew",
            msg: format!("invalid warp options: {:?}", args),
        });
    }

    let dest = CString::new("").expect("static string");
    let mut usage_error = 0;
    let mut sources = [src.c_dataset()];
    let handle = unsafe {
        gdal_sys::GDALWarp(
            dest.as_ptr(),
            ptr::null_mut(),
            1,
            sources.as_mut_ptr(),
            options,
            &mut usage_error,
        )
    };
    unsafe { gdal_sys::GDALWarpAppOptionsFree(options) };

    if handle.is_null() || usage_error != 0 {
        return Err(GdalError::NullPointer {
            method_name: "GDALWarp",
            msg: format!("warp failed (args: {:?})", args),
        });
    }
    Ok(unsafe { Dataset::from_c_dataset(handle) })
}
