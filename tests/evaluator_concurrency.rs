//! Reloads must never expose a partially replaced flag set.

use flagsync::eval::{Evaluator, JsonEvaluator};
use flagsync::sources::FlagPayload;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

fn flag_set(prefix: &str, count: usize) -> FlagPayload {
    let flags: Vec<String> = (0..count)
        .map(|i| {
            format!(
                r#""{prefix}_{i}":{{"variants":{{"on":"{prefix}"}},"defaultVariant":"on"}}"#
            )
        })
        .collect();
    FlagPayload::from(format!(r#"{{"flags":{{{}}}}}"#, flags.join(",")))
}

#[test]
fn test_resolve_all_sees_one_whole_set() {
    let set_a = flag_set("a", 50);
    let set_b = flag_set("b", 30);

    let evaluator = JsonEvaluator::new();
    evaluator.load(&set_a).unwrap();
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        scope.spawn(|| {
            for i in 0..500 {
                let payload = if i % 2 == 0 { &set_b } else { &set_a };
                evaluator.load(payload).unwrap();
            }
            done.store(true, Ordering::Release);
        });

        for _ in 0..4 {
            scope.spawn(|| {
                while !done.load(Ordering::Acquire) {
                    let flags = evaluator.resolve_all();
                    let from_a = flags.iter().filter(|(key, _)| key.starts_with("a_")).count();
                    let from_b = flags.iter().filter(|(key, _)| key.starts_with("b_")).count();

                    assert!(
                        (from_a == 50 && from_b == 0) || (from_a == 0 && from_b == 30),
                        "mixed snapshot: {from_a} from A, {from_b} from B"
                    );
                }
            });
        }
    });
}

#[test]
fn test_rejected_load_keeps_previous_set() {
    let evaluator = JsonEvaluator::new();
    evaluator.load(&flag_set("a", 3)).unwrap();

    assert!(evaluator.load(&FlagPayload::from("{")).is_err());
    assert!(evaluator.load(&FlagPayload::from("")).is_err());

    assert_eq!(evaluator.flag_count(), 3);
    assert_eq!(evaluator.resolve_string("a_1"), Ok("a".to_string()));
}
