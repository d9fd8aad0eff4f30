use ctxlocal::{Local, Mode};
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Operation {
    Set(u8, i32),
    Get(u8),
    Delete(u8),
}

fn operations() -> impl Strategy<Value = Vec<Operation>> {
    proptest::collection::vec(
        prop_oneof![
            (0..6_u8, any::<i32>()).prop_map(|(k, v)| Operation::Set(k, v)),
            (0..6_u8).prop_map(Operation::Get),
            (0..6_u8).prop_map(Operation::Delete),
        ],
        1..100,
    )
}

fn check_against_model(mode: Mode, ops: Vec<Operation>) {
    let local = Local::with_mode(mode);
    let mut model = HashMap::new();

    for op in ops {
        match op {
            Operation::Set(k, v) => {
                local.set(format!("k{k}"), v);
                model.insert(k, v);
            }
            Operation::Get(k) => {
                let expected = model.get(&k).copied();
                assert_eq!(local.get(&format!("k{k}")).ok(), expected, "get k{k} in {mode}");
            }
            Operation::Delete(k) => {
                let expected = model.remove(&k).is_some();
                assert_eq!(local.delete(&format!("k{k}")).is_ok(), expected, "delete k{k} in {mode}");
            }
        }
    }

    for k in 0..6_u8 {
        assert_eq!(local.contains(&format!("k{k}")), model.contains_key(&k));
    }
}

proptest! {
    #[test]
    fn test_thread_isolated_matches_map(ops in operations()) {
        check_against_model(Mode::ThreadIsolated, ops);
    }

    #[test]
    fn test_fork_propagated_matches_map(ops in operations()) {
        check_against_model(Mode::ForkPropagated, ops);
    }

    #[test]
    fn test_fork_sees_parent_snapshot(before in operations(), after in operations()) {
        let local = Local::new(false);
        let mut snapshot = HashMap::new();
        for op in before {
            match op {
                Operation::Set(k, v) => {
                    local.set(format!("k{k}"), v);
                    snapshot.insert(k, v);
                }
                Operation::Delete(k) => {
                    let _ = local.delete(&format!("k{k}"));
                    snapshot.remove(&k);
                }
                Operation::Get(_) => {}
            }
        }

        let mut child = ctxlocal::context::Context::current();
        for op in after {
            if let Operation::Set(k, v) = op {
                local.set(format!("k{k}"), v.wrapping_add(1));
            }
        }

        child.run(|| {
            for k in 0..6_u8 {
                prop_assert_eq!(local.get(&format!("k{k}")).ok(), snapshot.get(&k).copied());
            }
            Ok(())
        })?;
    }
}
