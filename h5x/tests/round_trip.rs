use std::fmt::Debug;
use std::sync::Arc;

use h5x::dtype::{Bits8, Bits32, ByteOrder, TypeDescriptor};
use h5x::{Dataset, File, H5Element, H5Type, Library};
use h5x_mem::MemoryEngine;
use ndarray::{ArrayD, IxDyn};
use rstest::rstest;

#[derive(H5Type, Clone, Copy, Debug, PartialEq)]
#[repr(C)]
struct Triplet {
    i: i32,
    j: i32,
    v: f64,
}

fn file() -> (Arc<MemoryEngine>, File) {
    let engine = Arc::new(MemoryEngine::new());
    let lib = Library::new(engine.clone()).unwrap();
    (engine, File::create(&lib, "round_trip.h5").unwrap())
}

fn array<T>(shape: &[usize], f: impl Fn(usize) -> T) -> ArrayD<T> {
    let len = shape.iter().product();
    ArrayD::from_shape_vec(IxDyn(shape), (0..len).map(f).collect()).unwrap()
}

fn dims(shape: &[usize]) -> Vec<u64> {
    shape.iter().map(|d| *d as u64).collect()
}

fn round_trip<T: H5Element + PartialEq + Debug>(file: &File, name: &str, data: &ArrayD<T>) {
    let dataset = Dataset::create_with_data(file, name, data).unwrap();
    assert_eq!(&dataset.read().unwrap(), data, "{name}");
    drop(dataset);
    let reopened = Dataset::<T>::open(file, name).unwrap();
    assert_eq!(&reopened.read().unwrap(), data, "{name} after reopen");
}

#[rstest]
#[case::scalar(&[1])]
#[case::vector(&[7])]
#[case::matrix(&[3, 4])]
fn every_element_kind_round_trips(#[case] shape: &[usize]) {
    let (engine, file) = file();

    round_trip(&file, "i8", &array(shape, |i| i as i8 - 64));
    round_trip(&file, "i16", &array(shape, |i| -(i as i16) * 300));
    round_trip(&file, "i32", &array(shape, |i| i as i32 * -70_000));
    round_trip(&file, "i64", &array(shape, |i| i64::MIN + i as i64));
    round_trip(&file, "u8", &array(shape, |i| 255 - i as u8));
    round_trip(&file, "u16", &array(shape, |i| i as u16 * 1000));
    round_trip(&file, "u32", &array(shape, |i| u32::MAX - i as u32));
    round_trip(&file, "u64", &array(shape, |i| u64::MAX / (i as u64 + 1)));
    round_trip(&file, "f32", &array(shape, |i| i as f32 * 0.5));
    round_trip(&file, "f64", &array(shape, |i| i as f64 / 3.0));
    round_trip(&file, "bits8", &array(shape, |i| Bits8(1 << (i % 8))));
    round_trip(&file, "bits32", &array(shape, |i| Bits32(!(i as u32))));
    round_trip(
        &file,
        "vlen_string",
        &array(shape, |i| "é".repeat(i % 3) + &i.to_string()),
    );
    round_trip(
        &file,
        "record",
        &array(shape, |i| Triplet {
            i: i as i32,
            j: -(i as i32),
            v: i as f64 * 1.5,
        }),
    );
    round_trip(
        &file,
        "vlen_array",
        &array(shape, |i| (0..i).map(|x| x as f64 * 0.1).collect::<Vec<_>>()),
    );

    let fixed = array(shape, |i| format!("row{i}"));
    let dataset = Dataset::<String>::create_with_type(
        &file,
        "fixed_string",
        &TypeDescriptor::FixedString { size: 8 },
        &dims(shape),
    )
    .unwrap();
    dataset.write(&fixed).unwrap();
    assert_eq!(dataset.read().unwrap(), fixed);
    assert!(!dataset.datatype().is_variable_string().unwrap());

    drop((dataset, file));
    assert_eq!(engine.outstanding_allocations(), 0);
    assert_eq!(engine.open_handles(), 0);
    assert_eq!(engine.failed_closes(), 0);
}

#[rstest]
#[case(&[5])]
#[case(&[2, 3])]
#[case(&[2, 3, 4])]
fn shapes_are_preserved(#[case] shape: &[usize]) {
    let (_, file) = file();
    let data = array(shape, |i| i as u32);
    let dataset = Dataset::create_with_data(&file, "shaped", &data).unwrap();
    assert_eq!(dataset.dimensions().unwrap(), dims(shape));
    let read = dataset.read().unwrap();
    assert_eq!(read.shape(), shape);
    assert_eq!(read, data);
}

#[rstest]
#[case(ByteOrder::BigEndian)]
#[case(ByteOrder::LittleEndian)]
fn stored_byte_order_is_converted_on_transfer(#[case] order: ByteOrder) {
    let (_, file) = file();
    let data = array(&[4], |i| 0x0102_0304_i32 * i as i32);
    let dataset = Dataset::create_with_data_ordered(&file, "ordered", &data, order).unwrap();
    assert_eq!(dataset.datatype().byte_order().unwrap(), Some(order));
    assert_eq!(dataset.read().unwrap(), data);
}

#[test]
fn narrower_stored_integers_widen_on_read() {
    let (_, file) = file();
    let narrow = TypeDescriptor::Integer {
        signed: true,
        size: 2,
        order: ByteOrder::BigEndian,
    };
    let dataset = Dataset::<i64>::create_with_type(&file, "narrow", &narrow, &[3]).unwrap();
    let data = array(&[3], |i| i as i64 * -1000);
    dataset.write(&data).unwrap();
    assert_eq!(dataset.datatype().size().unwrap(), 2);
    assert_eq!(Dataset::<i64>::open(&file, "narrow").unwrap().read().unwrap(), data);
}

#[test]
fn unwritten_variable_strings_read_empty() {
    let (engine, file) = file();
    let dataset = Dataset::<String>::create(&file, "blank", &[3]).unwrap();
    assert_eq!(dataset.read().unwrap(), array(&[3], |_| String::new()));
    dataset.set(&[1], "middle".to_owned()).unwrap();
    assert_eq!(dataset.get(&[1]).unwrap(), "middle");
    assert_eq!(dataset.get(&[2]).unwrap(), "");
    drop(dataset);
    assert_eq!(engine.outstanding_allocations(), 0);
}
