/*!
 * Concurrent Collection Integration Tests
 * Bounded queue hand-off and ordered map consistency across threads
 */

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use sync_toolkit::{BoundedQueue, OrderedMap, SyncError};

#[test]
fn test_queue_producer_blocks_on_full_buffer() {
    let queue = Arc::new(BoundedQueue::new(2).unwrap());
    queue.enqueue("A").unwrap();
    queue.enqueue("B").unwrap();

    let finished = Arc::new(AtomicBool::new(false));
    let producer = {
        let queue = queue.clone();
        let finished = finished.clone();
        thread::spawn(move || {
            queue.enqueue("C").unwrap();
            finished.store(true, Ordering::SeqCst);
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!finished.load(Ordering::SeqCst));

    assert_eq!(queue.dequeue(), Some("A"));
    producer.join().unwrap();
    assert_eq!(queue.dequeue(), Some("B"));
    assert_eq!(queue.dequeue(), Some("C"));
}

#[test]
fn test_queue_many_producers_one_consumer() {
    const PRODUCERS: usize = 4;
    const PER_PRODUCER: usize = 1_000;

    let queue = Arc::new(BoundedQueue::new(8).unwrap());
    let consumer = {
        let queue = queue.clone();
        thread::spawn(move || queue.drain().collect::<Vec<_>>())
    };

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    queue.enqueue((p, i)).unwrap();
                }
            })
        })
        .collect();

    for producer in producers {
        producer.join().unwrap();
    }
    queue.close();

    let received = consumer.join().unwrap();
    assert_eq!(received.len(), PRODUCERS * PER_PRODUCER);

    // Each producer's items arrive in the order it sent them
    for p in 0..PRODUCERS {
        let sequence: Vec<usize> = received
            .iter()
            .filter(|(producer, _)| *producer == p)
            .map(|(_, i)| *i)
            .collect();
        assert_eq!(sequence, (0..PER_PRODUCER).collect::<Vec<_>>());
    }
}

#[test]
fn test_queue_close_with_blocked_parties() {
    let queue = Arc::new(BoundedQueue::<u32>::new(1).unwrap());
    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let queue = queue.clone();
            thread::spawn(move || queue.dequeue())
        })
        .collect();

    thread::sleep(Duration::from_millis(50));
    queue.close();

    for consumer in consumers {
        assert_eq!(consumer.join().unwrap(), None);
    }
    assert!(matches!(queue.enqueue(1), Err(SyncError::InvalidState(_))));
    assert_eq!(queue.capacity(), 1);
}

#[test]
fn test_ordered_map_concurrent_inserts() {
    const THREADS: i64 = 4;
    const PER_THREAD: i64 = 250;

    let map = Arc::new(OrderedMap::new());
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let map = map.clone();
            thread::spawn(move || {
                for i in 0..PER_THREAD {
                    let key = i * THREADS + t;
                    map.insert(key, key * 10);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(map.len(), (THREADS * PER_THREAD) as usize);
    assert_eq!(map.keys(), (0..THREADS * PER_THREAD).collect::<Vec<_>>());
    assert_eq!(map.find_min(), Some(0));
    assert_eq!(map.find_max(), Some((THREADS * PER_THREAD - 1) * 10));
}

#[test]
fn test_enumerator_detects_mutation_from_another_thread() {
    let map = Arc::new(OrderedMap::new());
    for key in [50, 30, 70, 20, 40] {
        map.insert(key, key);
    }

    let mut cursor = map.enumerate();
    assert_eq!(cursor.next().unwrap().unwrap(), 50);
    assert_eq!(cursor.next().unwrap().unwrap(), 30);

    {
        let map = map.clone();
        thread::spawn(move || map.insert(60, 60)).join().unwrap();
    }

    assert_eq!(cursor.next(), Some(Err(SyncError::ConcurrentModification)));
    assert_eq!(cursor.step(), Err(SyncError::ConcurrentModification));

    cursor.reset();
    let values: Result<Vec<_>, _> = cursor.collect();
    assert_eq!(values.unwrap(), vec![50, 30, 70, 20, 40, 60]);
}

#[test]
fn test_enumeration_terminates_while_writer_runs() {
    let map = Arc::new(OrderedMap::new());
    for key in 0..100 {
        map.insert(key, key);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let writer = {
        let (map, stop) = (map.clone(), stop.clone());
        thread::spawn(move || {
            let mut key = 100;
            while !stop.load(Ordering::SeqCst) {
                map.insert(key, key);
                key += 1;
                thread::yield_now();
            }
        })
    };

    for _ in 0..50 {
        let mut errors = 0;
        let mut values = 0;
        for item in map.enumerate() {
            match item {
                Ok(_) => values += 1,
                Err(err) => {
                    assert_eq!(err, SyncError::ConcurrentModification);
                    errors += 1;
                }
            }
        }
        assert!(errors <= 1);
        assert!(values <= map.len());
    }

    stop.store(true, Ordering::SeqCst);
    writer.join().unwrap();
}

#[test]
fn test_enumerator_unaffected_by_reads() {
    let map = OrderedMap::new();
    map.insert(2, 'b');
    map.insert(1, 'a');

    let mut cursor = map.enumerate();
    assert_eq!(cursor.step(), Ok(Some('b')));
    assert_eq!(map.find(&1), Some('a'));
    assert!(!map.delete(&9));
    assert_eq!(cursor.step(), Ok(Some('a')));
    assert_eq!(cursor.step(), Ok(None));
}

#[test]
fn test_ordered_map_custom_comparator() {
    let map = OrderedMap::with_comparator(|a: &i32, b: &i32| b.cmp(a));
    for key in [1, 5, 3] {
        map.insert(key, key.to_string());
    }

    assert_eq!(map.keys(), vec![5, 3, 1]);
    assert_eq!(map.find_min(), Some("5".to_string()));
    assert_eq!(map.find_max(), Some("1".to_string()));
}

#[derive(Debug, Clone)]
enum MapOp {
    Insert(u8),
    Delete(u8),
}

fn map_op() -> impl Strategy<Value = MapOp> {
    prop_oneof![
        3 => any::<u8>().prop_map(MapOp::Insert),
        1 => any::<u8>().prop_map(MapOp::Delete),
    ]
}

proptest! {
    #[test]
    fn prop_keys_stay_sorted_and_match_model(ops in prop::collection::vec(map_op(), 0..200)) {
        let map = OrderedMap::new();
        let mut model: BTreeMap<u8, usize> = BTreeMap::new();

        for op in &ops {
            match *op {
                MapOp::Insert(key) => {
                    map.insert(key, ());
                    *model.entry(key).or_default() += 1;
                }
                MapOp::Delete(key) => {
                    let expected = model.get(&key).copied().unwrap_or(0) > 0;
                    prop_assert_eq!(map.delete(&key), expected);
                    if let Some(count) = model.get_mut(&key) {
                        *count -= 1;
                        if *count == 0 {
                            model.remove(&key);
                        }
                    }
                }
            }
        }

        let keys = map.keys();
        prop_assert!(keys.windows(2).all(|w| w[0].cmp(&w[1]) != CmpOrdering::Greater));

        let expected: Vec<u8> = model
            .iter()
            .flat_map(|(key, count)| std::iter::repeat(*key).take(*count))
            .collect();
        prop_assert_eq!(keys, expected);
        prop_assert_eq!(map.len(), model.values().sum::<usize>());
    }

    #[test]
    fn prop_stack_is_lifo(values in prop::collection::vec(any::<i32>(), 0..100)) {
        let stack = sync_toolkit::LockFreeStack::new();
        for v in &values {
            stack.push(*v);
        }
        let popped: Vec<i32> = std::iter::from_fn(|| stack.pop()).collect();
        let mut reversed = values.clone();
        reversed.reverse();
        prop_assert_eq!(popped, reversed);
    }
}
