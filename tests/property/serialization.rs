//! Property-based tests for the store snapshot codec.
//!
//! Uses proptest to verify:
//! 1. Any task table survives encode → decode, order keys included.
//! 2. Random bytes never cause a panic in `decode` (returns `Err` gracefully).
//! 3. A snapshot stamped with any other version is refused.

use letsfocus_proto::snapshot::{self, SNAPSHOT_VERSION, SnapshotError, StoreSnapshot};
use letsfocus_proto::task::{OwnerId, Priority, Task, TaskId, TaskStatus};
use proptest::prelude::*;
use uuid::Uuid;

fn arb_status() -> impl Strategy<Value = TaskStatus> {
    prop_oneof![
        Just(TaskStatus::Todo),
        Just(TaskStatus::InProgress),
        Just(TaskStatus::Completed),
        Just(TaskStatus::Deleted),
    ]
}

fn arb_priority() -> impl Strategy<Value = Priority> {
    prop_oneof![
        Just(Priority::Low),
        Just(Priority::Medium),
        Just(Priority::High),
    ]
}

/// Any bit pattern, NaN and infinities included: the codec must not care.
fn arb_order() -> impl Strategy<Value = f64> {
    any::<u64>().prop_map(f64::from_bits)
}

fn arb_task() -> impl Strategy<Value = Task> {
    (
        any::<u128>(),
        "[a-z]{1,12}",
        "[^\x00]{1,64}",
        proptest::option::of("[^\x00]{0,128}"),
        (arb_status(), arb_priority(), any::<bool>()),
        prop::collection::vec("[a-z]{1,8}", 0..4),
        (
            proptest::option::of("[a-z0-9-]{1,16}"),
            proptest::option::of(any::<u64>()),
        ),
        arb_order(),
        (any::<u64>(), any::<u64>()),
    )
        .prop_map(
            |(
                id,
                owner,
                title,
                description,
                (status, priority, focus),
                tags,
                (group_id, due_date),
                order,
                (created_at, updated_at),
            )| Task {
                id: TaskId::from_uuid(Uuid::from_u128(id)),
                owner: OwnerId::new(owner),
                title,
                description,
                status,
                priority,
                focus,
                tags,
                group_id,
                due_date,
                order,
                created_at,
                updated_at,
            },
        )
}

proptest! {
    /// Every field survives, and order keys keep their exact bits.
    #[test]
    fn snapshot_round_trip(tasks in prop::collection::vec(arb_task(), 0..16)) {
        let bytes = snapshot::encode(&StoreSnapshot::new(tasks.clone())).expect("encode should succeed");
        let decoded = snapshot::decode(&bytes).expect("decode should succeed");

        prop_assert_eq!(decoded.tasks.len(), tasks.len());
        for (before, after) in tasks.iter().zip(&decoded.tasks) {
            prop_assert_eq!(before.order.to_bits(), after.order.to_bits());
            prop_assert_eq!(&before.id, &after.id);
            prop_assert_eq!(&before.title, &after.title);
            prop_assert_eq!(&before.tags, &after.tags);
            prop_assert_eq!(before.status, after.status);
        }
    }

    /// Random bytes never cause a panic when decoded; they return Err gracefully.
    #[test]
    fn random_bytes_decode_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let _ = snapshot::decode(&bytes);
    }

    #[test]
    fn foreign_version_refused(version in any::<u32>().prop_filter("other version", |v| *v != SNAPSHOT_VERSION)) {
        let foreign = StoreSnapshot { version, tasks: Vec::new() };
        let bytes = snapshot::encode(&foreign).expect("encode should succeed");
        let refused = matches!(
            snapshot::decode(&bytes),
            Err(SnapshotError::UnsupportedVersion { found }) if found == version
        );
        prop_assert!(refused);
    }
}
