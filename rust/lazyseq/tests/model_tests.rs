//! Random operator chains checked against the same edits applied to a `Vec`.

use lazyseq::{Materializer, Seq};
use lazyseq_testkit::data_gen::{
    clamp_bound, element_position, insert_position, random_items, random_position,
};

/// One step of a chain. `apply_model` returns `None` when the step must fail.
#[derive(Debug, Clone)]
enum Op {
    Insert(isize, i32),
    RemoveAt(isize),
    RemoveRange(isize, Option<isize>),
    ReplaceAt(isize, i32),
    ReplaceRange(isize, Option<isize>, Vec<i32>),
    Slice(isize, Option<isize>),
    Append(i32),
    Prepend(i32),
    Reverse,
    FilterEven,
    MapAddOne,
    Sorted,
    Distinct,
}

fn random_op(rng: &mut fastrand::Rng, len: usize) -> Op {
    let pos = random_position(rng, len);
    let end = rng.bool().then(|| random_position(rng, len));
    let item = rng.i32(0..50);
    match rng.u8(0..13) {
        0 => Op::Insert(pos, item),
        1 => Op::RemoveAt(pos),
        2 => Op::RemoveRange(pos, end),
        3 => Op::ReplaceAt(pos, item),
        4 => {
            let count = rng.usize(0..3);
            Op::ReplaceRange(pos, end, random_items(rng, count, 50))
        }
        5 => Op::Slice(pos, end),
        6 => Op::Append(item),
        7 => Op::Prepend(item),
        8 => Op::Reverse,
        9 => Op::FilterEven,
        10 => Op::MapAddOne,
        11 => Op::Sorted,
        _ => Op::Distinct,
    }
}

fn range_of(start: isize, end: Option<isize>, len: usize) -> std::ops::Range<usize> {
    let start = clamp_bound(start, len);
    let end = end.map_or(len, |end| clamp_bound(end, len)).max(start);
    start..end
}

impl Op {
    fn apply_seq(&self, seq: &Seq<i32>) -> Seq<i32> {
        match self {
            Op::Insert(pos, item) => seq.insert(*pos, *item),
            Op::RemoveAt(pos) => seq.remove_at(*pos),
            Op::RemoveRange(start, end) => seq.remove_range(*start, *end),
            Op::ReplaceAt(pos, item) => seq.replace_at(*pos, *item),
            Op::ReplaceRange(start, end, items) => {
                seq.replace_range(*start, *end, &Seq::from_vec(items.clone()))
            }
            Op::Slice(start, end) => seq.slice(*start, *end),
            Op::Append(item) => seq.append(*item),
            Op::Prepend(item) => seq.prepend(*item),
            Op::Reverse => seq.reverse(),
            Op::FilterEven => seq.filter(|x| x % 2 == 0),
            Op::MapAddOne => seq.map(|x| x + 1),
            Op::Sorted => seq.sorted(),
            Op::Distinct => seq.distinct(),
        }
    }

    fn apply_model(&self, mut items: Vec<i32>) -> Option<Vec<i32>> {
        let len = items.len();
        match self {
            Op::Insert(pos, item) => items.insert(insert_position(*pos, len)?, *item),
            Op::RemoveAt(pos) => {
                items.remove(element_position(*pos, len)?);
            }
            Op::RemoveRange(start, end) => {
                items.drain(range_of(*start, *end, len));
            }
            Op::ReplaceAt(pos, item) => items[element_position(*pos, len)?] = *item,
            Op::ReplaceRange(start, end, replacement) => {
                items.splice(range_of(*start, *end, len), replacement.iter().copied());
            }
            Op::Slice(start, end) => items = items[range_of(*start, *end, len)].to_vec(),
            Op::Append(item) => items.push(*item),
            Op::Prepend(item) => items.insert(0, *item),
            Op::Reverse => items.reverse(),
            Op::FilterEven => items.retain(|x| x % 2 == 0),
            Op::MapAddOne => items.iter_mut().for_each(|x| *x += 1),
            Op::Sorted => items.sort(),
            Op::Distinct => {
                let mut seen = std::collections::HashSet::new();
                items.retain(|x| seen.insert(*x));
            }
        }
        Some(items)
    }
}

fn check(seq: &Seq<i32>, expected: &[i32], ops: &[Op]) {
    assert_eq!(seq.to_vec().unwrap(), expected, "ops: {ops:?}");
    assert_eq!(seq.size().unwrap(), expected.len(), "ops: {ops:?}");
    for (index, item) in expected.iter().enumerate() {
        assert_eq!(seq.get(index).unwrap(), *item, "ops: {ops:?}");
    }
    assert!(!seq.can_produce(expected.len()).unwrap(), "ops: {ops:?}");
}

#[test]
fn test_random_chains_match_vec() {
    let mut rng = fastrand::Rng::with_seed(0x5eed_1a2b);
    for _ in 0..500 {
        let len = rng.usize(0..12);
        let mut model = random_items(&mut rng, len, 50);
        let mut seq = Seq::from_vec(model.clone());
        let mut ops = Vec::new();
        for _ in 0..rng.usize(1..6) {
            let op = random_op(&mut rng, model.len());
            ops.push(op.clone());
            seq = op.apply_seq(&seq);
            match op.apply_model(model) {
                Some(next) => model = next,
                None => {
                    assert!(seq.to_vec().is_err(), "ops: {ops:?}");
                    break;
                }
            }
            check(&seq, &model, &ops);
        }
    }
}

#[test]
fn test_random_queries_on_lazy_source() {
    // Sequential nodes over a one-pass iterator, queried in random order.
    let mut rng = fastrand::Rng::with_seed(42);
    for _ in 0..200 {
        let len = rng.usize(0..20);
        let model = random_items(&mut rng, len, 10);
        let seq = Seq::from_iter(model.clone())
            .filter(|x| x % 3 != 0)
            .map(|x| x * 2);
        let expected: Vec<i32> = model.iter().filter(|x| *x % 3 != 0).map(|x| x * 2).collect();
        for _ in 0..10 {
            let index = rng.usize(0..expected.len() + 2);
            match expected.get(index) {
                Some(item) => assert_eq!(seq.get(index).unwrap(), *item),
                None => assert!(seq.get(index).unwrap_err().is_out_of_range()),
            }
        }
        assert_eq!(seq.to_vec().unwrap(), expected);
    }
}
