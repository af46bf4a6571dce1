//! Tests for serializers shared across threads.

#![allow(missing_docs)]

use std::{sync::Arc, thread};

use quill_integration_test::{Node, Order, create_serializer, object};
use quill_serialize::Object;

#[test]
fn threads_share_one_serializer() {
    let serializer = create_serializer().unwrap();

    thread::scope(|scope| {
        for worker in 0..8u64 {
            let serializer = &serializer;
            scope.spawn(move || {
                for round in 0..32u64 {
                    let id = worker * 1000 + round;
                    let bytes =
                        serializer.serialize(&object(Order::new(id, &["x"]))).unwrap();
                    let decoded = serializer.deserialize_as::<Order>(&bytes).unwrap();
                    assert_eq!(decoded.id, id);
                }
            });
        }
    });
}

#[test]
fn sessions_do_not_leak_between_threads() {
    let serializer = create_serializer().unwrap();
    let shared = object(Order::new(42, &["shared"]));

    let encoded: Vec<Vec<u8>> = thread::scope(|scope| {
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let serializer = serializer.clone();
                let shared = shared.clone();
                scope.spawn(move || {
                    let node = Node::new("holder");
                    node.push(shared.clone());
                    node.push(shared);
                    serializer.serialize(&(node as Object)).unwrap()
                })
            })
            .collect();

        handles.into_iter().map(|handle| handle.join().unwrap()).collect()
    });

    // every session numbers its references from scratch
    assert!(encoded.windows(2).all(|pair| pair[0] == pair[1]));

    for bytes in &encoded {
        let decoded = serializer.deserialize_as::<Node>(bytes).unwrap();
        let children = decoded.children();
        assert!(Arc::ptr_eq(&children[0], &children[1]));
    }
}
