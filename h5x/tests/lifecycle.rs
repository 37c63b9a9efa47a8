use std::ffi::c_char;
use std::sync::Arc;

use h5x::error::{Direction, H5xError};
use h5x::sys::{H5S_ALL, NativeEngine};
use h5x::{Attribute, Dataset, Dataspace, File, H5Type, Library, Location, Object, SelectOp};
use h5x_mem::MemoryEngine;
use ndarray::{Array1, arr1, arr2};
use rstest::rstest;

fn library() -> (Arc<MemoryEngine>, Library) {
    let engine = Arc::new(MemoryEngine::new());
    (engine.clone(), Library::new(engine).unwrap())
}

fn ragged() -> Array1<Vec<f64>> {
    arr1(&[
        vec![0.0],
        vec![1.1, 2.2],
        vec![],
        vec![3.3, 4.4, 5.5],
        vec![6.6, 7.7, 8.8, 9.9],
    ])
}

#[test]
fn ragged_rows_round_trip() {
    let (engine, lib) = library();
    let file = File::create(&lib, "ragged.h5").unwrap();
    let data = ragged();
    let dataset = Dataset::create_with_data(&file, "rows", &data).unwrap();

    let read = dataset.read().unwrap();
    assert_eq!(
        read.iter().map(Vec::len).collect::<Vec<_>>(),
        vec![1, 2, 0, 3, 4]
    );
    assert_eq!(read, data.into_dyn());
    assert_eq!(dataset.get(&[2]).unwrap(), Vec::<f64>::new());
    assert_eq!(engine.outstanding_allocations(), 0);
}

#[rstest]
#[case::compact(&[3], None, vec![vec![1.1, 2.2], vec![], vec![3.3, 4.4, 5.5]])]
#[case::scattered(
    &[5],
    Some(1),
    vec![vec![], vec![1.1, 2.2], vec![], vec![3.3, 4.4, 5.5], vec![]]
)]
fn variable_length_reads_reclaim_against_the_memory_space(
    #[case] mem_dims: &[u64],
    #[case] mem_start: Option<u64>,
    #[case] expected: Vec<Vec<f64>>,
) {
    let (engine, lib) = library();
    let file = File::create(&lib, "reclaim.h5").unwrap();
    let dataset = Dataset::create_with_data(&file, "rows", &ragged()).unwrap();

    let mut file_space = dataset.space().unwrap();
    file_space
        .select_hyperslab(SelectOp::Set, &[1], None, &[3], None)
        .unwrap();
    let mut mem = Dataspace::new(&lib, mem_dims).unwrap();
    if let Some(start) = mem_start {
        mem.select_hyperslab(SelectOp::Set, &[start], None, &[3], None)
            .unwrap();
    }

    let read = dataset.read_with(&mem, &file_space).unwrap();
    assert_eq!(read, Array1::from_vec(expected).into_dyn());
    assert_eq!(engine.outstanding_allocations(), 0);

    // The same selection without a memory space reclaims against the compact buffer.
    let flat = dataset.read_with(Dataspace::all(), &file_space).unwrap();
    assert_eq!(flat.len(), 3);
    assert_eq!(engine.outstanding_allocations(), 0);
}

#[test]
fn variable_strings_reclaim_after_decoding() {
    let (engine, lib) = library();
    let file = File::create(&lib, "strings.h5").unwrap();
    let data = arr2(&[["alpha", "β"], ["", "gamma delta"]]).mapv(str::to_owned);
    let dataset = Dataset::create_with_data(&file, "words", &data).unwrap();
    assert!(dataset.datatype().is_variable_string().unwrap());
    assert_eq!(dataset.read().unwrap(), data.into_dyn());
    assert_eq!(engine.outstanding_allocations(), 0);
}

#[derive(H5Type, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
struct Sample {
    at: u32,
    level: f32,
}

#[test]
fn undecodable_strings_release_the_read_buffer() {
    let (engine, lib) = library();
    let file = File::create(&lib, "undecodable.h5").unwrap();
    let dataset = Dataset::<String>::create(&file, "words", &[3]).unwrap();

    let slots: [*const c_char; 3] = [
        c"ok".as_ptr(),
        b"\xff\xfe\0".as_ptr().cast(),
        c"also ok".as_ptr(),
    ];
    // SAFETY: three NUL-terminated strings cover the whole extent and outlive the call.
    let status = unsafe {
        engine.dataset_write(
            dataset.id(),
            dataset.datatype().id(),
            H5S_ALL,
            H5S_ALL,
            slots.as_ptr().cast(),
        )
    };
    assert!(status >= 0);

    assert!(matches!(dataset.read(), Err(H5xError::Utf8(_))));
    assert_eq!(engine.outstanding_allocations(), 0);
    assert!(matches!(dataset.get(&[1]), Err(H5xError::Utf8(_))));
    assert_eq!(engine.outstanding_allocations(), 0);
    assert_eq!(dataset.get(&[2]).unwrap(), "also ok");
    assert_eq!(engine.outstanding_allocations(), 0);
}

#[test]
fn unconvertible_sequences_release_the_read_buffer() {
    let (engine, lib) = library();
    let file = File::create(&lib, "sequences.h5").unwrap();
    let rows = arr1(&[
        vec![Sample { at: 1, level: 0.5 }],
        vec![],
        vec![Sample { at: 2, level: 1.5 }, Sample { at: 3, level: 2.5 }],
    ]);
    Dataset::create_with_data(&file, "samples", &rows).unwrap();

    // Both are sequences, but records don't convert to numbers.
    let numbers = Dataset::<Vec<f64>>::open(&file, "samples").unwrap();
    assert!(matches!(
        numbers.read(),
        Err(H5xError::TransferFailed {
            direction: Direction::Read,
            ..
        })
    ));
    assert_eq!(engine.outstanding_allocations(), 0);

    let samples = Dataset::<Vec<Sample>>::open(&file, "samples").unwrap();
    assert_eq!(samples.read().unwrap(), rows.into_dyn());
    assert_eq!(engine.outstanding_allocations(), 0);
}

#[test]
fn closing_twice_is_a_no_op() {
    let (engine, lib) = library();
    let mut file = File::create(&lib, "close.h5").unwrap();
    let mut dataset = Dataset::<u32>::create(&file, "d", &[4]).unwrap();
    let mut attr = Attribute::<u32>::create(&dataset, "a").unwrap();

    attr.close().unwrap();
    attr.close().unwrap();
    dataset.close().unwrap();
    dataset.close().unwrap();
    assert!(dataset.handle().is_closed());
    file.close().unwrap();
    file.close().unwrap();
    drop((attr, dataset, file));

    assert_eq!(engine.open_handles(), 0);
    assert_eq!(engine.failed_closes(), 0);
}

#[test]
fn predefined_descriptors_are_never_closed() {
    let (engine, lib) = library();
    {
        let file = File::create(&lib, "ownership.h5").unwrap();
        let group = file.create_group("g").unwrap();
        for name in ["a", "b", "c"] {
            let dataset = Dataset::create_with_data(&group, name, &arr1(&[1i16, 2, 3])).unwrap();
            dataset.set(&[0], 10).unwrap();
            assert_eq!(dataset.read().unwrap().sum(), 15);
            Attribute::<f32>::create(&dataset, "scale")
                .unwrap()
                .write(2.0)
                .unwrap();
        }
        let strings = Dataset::<String>::create(&group, "s", &[2]).unwrap();
        strings
            .write(&arr1(&["x".to_owned(), "y".to_owned()]))
            .unwrap();
        let rows = Dataset::<Vec<u8>>::create(&file, "v", &[1]).unwrap();
        rows.write_scalar(vec![1, 2, 3]).unwrap();
        assert_eq!(rows.read_scalar().unwrap(), vec![1, 2, 3]);
    }
    assert_eq!(engine.failed_closes(), 0);
    assert_eq!(engine.open_handles(), 0);
    assert_eq!(engine.outstanding_allocations(), 0);
    // Every table entry is still usable after all of the above.
    assert!(lib.resolve(&<i16 as h5x::H5Type>::type_descriptor().unwrap()).is_ok());
}

#[test]
fn files_persist_across_handles() {
    let (_, lib) = library();
    {
        let file = File::create(&lib, "persist.h5").unwrap();
        let group = file.create_group("run/1").unwrap_err();
        assert!(matches!(group, H5xError::Native { op: "H5Gcreate", .. }));
        let run = file.create_group("run").unwrap();
        run.create_group("1").unwrap();
        Dataset::create_with_data(&run, "1/values", &arr1(&[1.5f32, 2.5])).unwrap();
        Attribute::<String>::create(&file, "owner")
            .unwrap()
            .write("lab".to_owned())
            .unwrap();
    }

    let file = File::open(&lib, "persist.h5").unwrap();
    assert!(file.link_exists("run/1/values").unwrap());
    let values = file.dataset::<f32>("run/1/values").unwrap();
    assert_eq!(values.read().unwrap(), arr1(&[1.5f32, 2.5]).into_dyn());
    assert_eq!(file.attribute::<String>("owner").unwrap().read().unwrap(), "lab");

    // Opened read-only.
    assert!(matches!(
        values.write(&arr1(&[0.0f32, 0.0])),
        Err(H5xError::TransferFailed {
            direction: Direction::Write,
            ..
        })
    ));
    let writable = File::open_rw(&lib, "persist.h5").unwrap();
    let values = Dataset::<f32>::open(&writable.group("run").unwrap(), "1/values").unwrap();
    values.write(&arr1(&[0.0f32, 0.0])).unwrap();
    assert_eq!(values.read().unwrap().sum(), 0.0);
}
