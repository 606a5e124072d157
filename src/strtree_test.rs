use std::ffi::{CStr, CString};
use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread;

use simplelog::{Config, LevelFilter, TestLogger};

use crate::error::Error;
use crate::strtree::StrTree;
use crate::walk::Walk;

fn init_logger() {
    let _ = TestLogger::init(LevelFilter::Trace, Config::default());
}

fn cstr(s: &str) -> CString {
    CString::new(s).unwrap()
}

fn keys<V>(tree: &StrTree<V>) -> Vec<String> {
    let mut keys = vec![];
    let res = tree.walk(Walk::InOrder, |key, _| {
        keys.push(key.to_str().unwrap().to_string());
        ControlFlow::<()>::Continue(())
    });
    assert_eq!(res, Ok(None));
    keys
}

#[test]
fn test_add_delete() {
    init_logger();
    let tree: StrTree<u32> = StrTree::new("test-str");
    for (key, data) in ["m", "c", "g", "t", "a"].iter().zip(1..) {
        assert_eq!(tree.add(cstr(key), data), Ok(()));
    }
    assert_eq!(tree.len(), 5);
    assert_eq!(keys(&tree), vec!["a", "c", "g", "m", "t"]);
    assert!(tree.validate().is_ok());

    assert_eq!(tree.delete(&cstr("c")), Some(2));
    assert_eq!(tree.len(), 4);
    assert_eq!(keys(&tree), vec!["a", "g", "m", "t"]);
    assert_eq!(tree.get(&cstr("c")), None);
    assert!(tree.validate().is_ok());

    // deleting again is a no-op.
    assert_eq!(tree.delete(&cstr("c")), None);
    assert_eq!(tree.len(), 4);
}

#[test]
fn test_duplicate() {
    init_logger();
    let tree: StrTree<u32> = StrTree::new("test-str");
    assert_eq!(tree.add(cstr("x"), 7), Ok(()));
    assert_eq!(tree.add(cstr("x"), 9), Err((cstr("x"), 9)));
    assert_eq!(tree.get(&cstr("x")), Some(7));
    assert_eq!(tree.len(), 1);
}

#[test]
fn test_add_str() {
    let tree: StrTree<u32> = StrTree::default();
    assert_eq!(tree.add_str("oval:obj:1", 1), Ok(Ok(())));
    assert_eq!(tree.add_str("oval:obj:1", 2), Ok(Err((cstr("oval:obj:1"), 2))));
    match tree.add_str("bad\0key", 3) {
        Err(Error::InvalidKey(_)) => (),
        res => panic!("unexpected {:?}", res),
    }
    assert_eq!(tree.len(), 1);
    assert!(tree.contains_key(&cstr("oval:obj:1")));
}

#[test]
fn test_byte_order() {
    let tree: StrTree<()> = StrTree::new("test-str");
    let high = CString::new(vec![0xc3_u8, 0xa9]).unwrap();
    assert!(tree.add(high.clone(), ()).is_ok());
    for key in ["z", "Z", "ab", "a", ""].iter() {
        assert!(tree.add(cstr(key), ()).is_ok());
    }
    let mut got: Vec<Vec<u8>> = vec![];
    let res = tree.walk(Walk::InOrder, |key: &CStr, _| {
        got.push(key.to_bytes().to_vec());
        ControlFlow::<()>::Continue(())
    });
    assert_eq!(res, Ok(None));
    let expected: Vec<Vec<u8>> = vec![
        b"".to_vec(),
        b"Z".to_vec(),
        b"a".to_vec(),
        b"ab".to_vec(),
        b"z".to_vec(),
        high.as_bytes().to_vec(),
    ];
    assert_eq!(got, expected);
}

#[test]
fn test_walk_break() {
    let tree: StrTree<usize> = StrTree::new("test-str");
    for i in 0..26_u8 {
        let key = CString::new(vec![b'a' + i]).unwrap();
        assert!(tree.add(key, i as usize).is_ok());
    }
    let res = tree.walk(Walk::InOrder, |key, data| {
        if *data == 5 {
            ControlFlow::Break(key.to_owned())
        } else {
            ControlFlow::Continue(())
        }
    });
    assert_eq!(res, Ok(Some(cstr("f"))));

    let res = tree.walk(Walk::LevelOrder, |_, _| ControlFlow::<()>::Continue(()));
    assert_eq!(res, Err(Error::Unsupported(Walk::LevelOrder)));
}

#[test]
fn test_get_with() {
    let tree: StrTree<Vec<u8>> = StrTree::new("test-str");
    assert!(tree.add(cstr("key"), vec![1, 2, 3]).is_ok());
    assert_eq!(tree.get_with(&cstr("key"), |data| data.len()), Some(3));
    assert_eq!(tree.get_with(&cstr("nokey"), |data| data.len()), None);
}

#[test]
fn test_free_all() {
    init_logger();
    let tree: StrTree<Box<u64>> = StrTree::new("test-str");
    for i in (0..50_u64).rev() {
        assert!(tree.add(cstr(&format!("{:03}", i)), Box::new(i)).is_ok());
    }
    let mut released = vec![];
    tree.free_all(|key, data| {
        assert_eq!(key.to_str().unwrap(), format!("{:03}", data));
        released.push(*data);
    });
    assert_eq!(released, (0..50).collect::<Vec<u64>>());
}

#[test]
fn test_into_iter() {
    let tree: StrTree<u8> = StrTree::new("test-str");
    assert!(tree.add(cstr("b"), 2).is_ok());
    assert!(tree.add(cstr("a"), 1).is_ok());
    let items: Vec<(CString, u8)> = tree.into_iter().collect();
    assert_eq!(items, vec![(cstr("a"), 1), (cstr("b"), 2)]);
}

#[test]
fn test_concurrent_add() {
    init_logger();
    let tree: Arc<StrTree<usize>> = Arc::new(StrTree::new("test-str"));
    let writers: Vec<thread::JoinHandle<usize>> = (0..4)
        .map(|id| {
            let tree = Arc::clone(&tree);
            thread::spawn(move || {
                let mut added = 0;
                for i in 0..500 {
                    let key = cstr(&format!("probe-{}", i));
                    if tree.add(key, id).is_ok() {
                        added += 1;
                    }
                }
                added
            })
        })
        .collect();
    let added: usize = writers.into_iter().map(|w| w.join().unwrap()).sum();

    // each key is cached exactly once, whichever writer came first.
    assert_eq!(added, 500);
    assert_eq!(tree.len(), 500);
    assert!(tree.validate().is_ok());
    assert!(tree.get(&cstr("probe-42")).unwrap() < 4);
}
