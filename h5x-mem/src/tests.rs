use std::ffi::{CStr, c_char, c_void};

use h5x_sys::*;

use crate::MemoryEngine;

fn file(engine: &MemoryEngine, name: &CStr) -> hid_t {
    let file = engine.file_create(name, H5F_ACC_TRUNC);
    assert!(file > 0);
    file
}

fn int_dataset(engine: &MemoryEngine, loc: hid_t, dims: &[hsize_t]) -> hid_t {
    let space = engine.space_create_simple(dims, None);
    let ty = engine.builtin_type(H5T_builtin::STD_I32BE);
    let dataset = engine.dataset_create(loc, c"data", ty, space);
    assert!(dataset > 0);
    assert_eq!(engine.space_close(space), 0);
    dataset
}

#[test]
fn write_then_read_converts_byte_order() {
    let engine = MemoryEngine::new();
    let f = file(&engine, c"convert.h5");
    let dataset = int_dataset(&engine, f, &[2, 3]);
    let native = engine.builtin_type(H5T_builtin::NATIVE_INT32);

    let input: Vec<i32> = (0..6).collect();
    let status = unsafe {
        engine.dataset_write(dataset, native, H5S_ALL, H5S_ALL, input.as_ptr().cast())
    };
    assert_eq!(status, 0);

    let mut output = vec![0i64; 6];
    let wide = engine.builtin_type(H5T_builtin::NATIVE_INT64);
    let status = unsafe {
        engine.dataset_read(dataset, wide, H5S_ALL, H5S_ALL, output.as_mut_ptr().cast())
    };
    assert_eq!(status, 0);
    assert_eq!(output, vec![0, 1, 2, 3, 4, 5]);

    assert_eq!(engine.dataset_close(dataset), 0);
    assert_eq!(engine.file_close(f), 0);
    assert_eq!(engine.open_handles(), 0);
}

#[test]
fn hyperslab_read_into_smaller_memory_space() {
    let engine = MemoryEngine::new();
    let f = file(&engine, c"slab.h5");
    let dataset = int_dataset(&engine, f, &[4, 4]);
    let native = engine.builtin_type(H5T_builtin::NATIVE_INT32);
    let input: Vec<i32> = (0..4).flat_map(|i| (0..4).map(move |j| i + j)).collect();
    unsafe { engine.dataset_write(dataset, native, H5S_ALL, H5S_ALL, input.as_ptr().cast()) };

    let file_space = engine.dataset_get_space(dataset);
    assert_eq!(
        engine.space_select_hyperslab(
            file_space,
            H5S_seloper_t::H5S_SELECT_SET,
            &[0, 1],
            None,
            &[4, 1],
            None
        ),
        0
    );
    let mem_space = engine.space_create_simple(&[4], None);
    let mut column = [0i32; 4];
    let status = unsafe {
        engine.dataset_read(
            dataset,
            native,
            mem_space,
            file_space,
            column.as_mut_ptr().cast(),
        )
    };
    assert_eq!(status, 0);
    assert_eq!(column, [1, 2, 3, 4]);

    // A memory space with a different number of points is refused.
    let wrong = engine.space_create_simple(&[3], None);
    let status = unsafe {
        engine.dataset_read(dataset, native, wrong, file_space, column.as_mut_ptr().cast())
    };
    assert!(status < 0);

    for space in [file_space, mem_space, wrong] {
        assert_eq!(engine.space_close(space), 0);
    }
    engine.dataset_close(dataset);
    engine.file_close(f);
    assert_eq!(engine.open_handles(), 0);
}

#[test]
fn predefined_types_are_immutable() {
    let engine = MemoryEngine::new();
    let c_s1 = engine.builtin_type(H5T_builtin::C_S1);
    assert!(engine.type_set_size(c_s1, 8) < 0);
    assert!(engine.type_close(c_s1) < 0);
    assert_eq!(engine.failed_closes(), 1);

    let copy = engine.type_copy(c_s1);
    assert_eq!(engine.type_set_size(copy, H5T_VARIABLE), 0);
    assert_eq!(engine.type_is_variable_str(copy), 1);
    assert_eq!(engine.type_is_variable_str(c_s1), 0);
    assert_eq!(engine.type_close(copy), 0);
    assert!(engine.type_close(copy) < 0);
    assert_eq!(engine.failed_closes(), 2);
}

#[test]
fn variable_length_reads_are_accounted() {
    let engine = MemoryEngine::new();
    let f = file(&engine, c"ragged.h5");
    let double = engine.builtin_type(H5T_builtin::NATIVE_DOUBLE);
    let vlen = engine.type_vlen_create(double);
    let space = engine.space_create_simple(&[3], None);
    let dataset = engine.dataset_create(f, c"ragged", vlen, space);

    let rows: [&[f64]; 3] = [&[1.0], &[], &[2.0, 3.0]];
    let input: Vec<hvl_t> = rows
        .iter()
        .map(|row| hvl_t {
            len: row.len(),
            p: row.as_ptr().cast_mut().cast(),
        })
        .collect();
    let status =
        unsafe { engine.dataset_write(dataset, vlen, H5S_ALL, H5S_ALL, input.as_ptr().cast()) };
    assert_eq!(status, 0);
    assert_eq!(engine.outstanding_allocations(), 0);

    let mut output = vec![hvl_t::default(); 3];
    let status = unsafe {
        engine.dataset_read(dataset, vlen, H5S_ALL, H5S_ALL, output.as_mut_ptr().cast())
    };
    assert_eq!(status, 0);
    assert_eq!(
        output.iter().map(|vl| vl.len).collect::<Vec<_>>(),
        vec![1, 0, 2]
    );
    assert!(output[1].p.is_null());
    assert_eq!(engine.outstanding_allocations(), 2);

    let last = unsafe { std::slice::from_raw_parts(output[2].p.cast::<f64>(), 2) };
    assert_eq!(last, &[2.0, 3.0]);

    let status = unsafe { engine.dataset_vlen_reclaim(vlen, space, output.as_mut_ptr().cast()) };
    assert_eq!(status, 0);
    assert_eq!(engine.outstanding_allocations(), 0);

    // The payloads are gone, so a second reclaim is refused.
    let status = unsafe { engine.dataset_vlen_reclaim(vlen, space, output.as_mut_ptr().cast()) };
    assert!(status < 0);
}

#[test]
fn variable_strings_round_trip() {
    let engine = MemoryEngine::new();
    let f = file(&engine, c"strings.h5");
    let ty = engine.type_copy(engine.builtin_type(H5T_builtin::C_S1));
    engine.type_set_size(ty, H5T_VARIABLE);
    let space = engine.space_create_simple(&[2], None);
    let dataset = engine.dataset_create(f, c"names", ty, space);

    let input: [*const c_char; 2] = [c"alpha".as_ptr(), std::ptr::null()];
    unsafe { engine.dataset_write(dataset, ty, H5S_ALL, H5S_ALL, input.as_ptr().cast()) };

    let mut output: [*mut c_char; 2] = [std::ptr::null_mut(); 2];
    unsafe { engine.dataset_read(dataset, ty, H5S_ALL, H5S_ALL, output.as_mut_ptr().cast()) };
    assert_eq!(unsafe { CStr::from_ptr(output[0]) }, c"alpha");
    assert!(output[1].is_null());
    assert_eq!(engine.outstanding_allocations(), 1);

    unsafe { engine.dataset_vlen_reclaim(ty, space, output.as_mut_ptr().cast()) };
    assert_eq!(engine.outstanding_allocations(), 0);
}

#[test]
fn files_persist_and_read_only_rejects_writes() {
    let engine = MemoryEngine::new();
    let f = file(&engine, c"persist.h5");
    let group = engine.group_create(f, c"a");
    let nested = engine.group_create(group, c"b");
    let dataset = int_dataset(&engine, nested, &[2]);
    for (close, id) in [
        (MemoryEngine::dataset_close as fn(&MemoryEngine, hid_t) -> herr_t, dataset),
        (MemoryEngine::group_close, nested),
        (MemoryEngine::group_close, group),
        (MemoryEngine::file_close, f),
    ] {
        assert_eq!(close(&engine, id), 0);
    }

    assert!(engine.file_create(c"persist.h5", H5F_ACC_EXCL) < 0);
    let f = engine.file_open(c"persist.h5", H5F_ACC_RDONLY);
    assert_eq!(engine.link_exists(f, c"/a/b/data"), 1);
    assert_eq!(engine.link_exists(f, c"a/c"), 0);

    let dataset = engine.dataset_open(f, c"a/b/data");
    assert!(dataset > 0);
    let native = engine.builtin_type(H5T_builtin::NATIVE_INT32);
    let input = [1i32, 2];
    let status = unsafe {
        engine.dataset_write(dataset, native, H5S_ALL, H5S_ALL, input.as_ptr().cast::<c_void>())
    };
    assert!(status < 0);
    assert!(engine.group_create(f, c"c") < 0);
}

#[test]
fn attributes_live_on_their_owner() {
    let engine = MemoryEngine::new();
    let f = file(&engine, c"attrs.h5");
    let space = engine.space_create_simple(&[1], None);
    let ty = engine.builtin_type(H5T_builtin::IEEE_F64LE);
    let attr = engine.attr_create(f, c"scale", ty, space);
    assert!(attr > 0);
    assert!(engine.attr_create(f, c"scale", ty, space) < 0);

    let native = engine.builtin_type(H5T_builtin::NATIVE_DOUBLE);
    unsafe { engine.attr_write(attr, native, [2.5f64].as_ptr().cast()) };
    engine.attr_close(attr);

    let attr = engine.attr_open(f, c"scale");
    let mut value = [0f64];
    unsafe { engine.attr_read(attr, native, value.as_mut_ptr().cast()) };
    assert_eq!(value, [2.5]);
    assert!(engine.attr_open(f, c"missing") < 0);
}

#[test]
fn compound_members() {
    let engine = MemoryEngine::new();
    let compound = engine.type_create(H5T_class_t::H5T_COMPOUND, 16);
    let int = engine.builtin_type(H5T_builtin::NATIVE_INT32);
    let double = engine.builtin_type(H5T_builtin::NATIVE_DOUBLE);
    assert_eq!(engine.type_insert(compound, c"i", 0, int), 0);
    assert_eq!(engine.type_insert(compound, c"j", 4, int), 0);
    assert_eq!(engine.type_insert(compound, c"v", 8, double), 0);
    assert!(engine.type_insert(compound, c"w", 12, int) < 0);
    assert_eq!(engine.type_get_nmembers(compound), 3);
    assert_eq!(engine.type_get_member_offset(compound, 2), 8);
    assert_eq!(engine.type_get_class(compound), H5T_class_t::H5T_COMPOUND);
    assert_eq!(engine.type_get_size(compound), 16);
    assert_eq!(engine.type_close(compound), 0);
    assert_eq!(engine.failed_closes(), 0);
}
